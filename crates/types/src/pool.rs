// This file is part of Bindle.
//
// Bindle is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Bindle is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Bindle.
// If not, see https://www.gnu.org/licenses/.

use ethers::types::{Address, H256};

use crate::{now_millis, GasFees, MempoolUserOperation};

/// Contracts referenced during validation of a user operation, with a hash
/// over their code so later code changes can be detected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferencedCodeHashes {
    /// Addresses of all referenced contracts
    pub addresses: Vec<Address>,
    /// Hash over the code of every referenced contract
    pub hash: H256,
}

/// A user operation with the metadata the mempool tracks for it
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserOperationInfo {
    /// The operation itself
    pub uo: MempoolUserOperation,
    /// Hash of the operation, unique within the mempool
    pub hash: H256,
    /// Entry point the operation was submitted for
    pub entry_point: Address,
    /// When the operation was first admitted, in Unix milliseconds
    pub first_submitted: u64,
    /// When the operation was last replaced, in Unix milliseconds
    pub last_replaced: u64,
    /// Contracts referenced during validation, if validated
    pub referenced_contracts: Option<ReferencedCodeHashes>,
}

impl UserOperationInfo {
    /// Create a new entry for an operation admitted now
    pub fn new(uo: MempoolUserOperation, entry_point: Address, chain_id: u64) -> Self {
        let hash = uo.uo().hash(entry_point, chain_id);
        let now = now_millis();
        Self {
            uo,
            hash,
            entry_point,
            first_submitted: now,
            last_replaced: now,
            referenced_contracts: None,
        }
    }
}

/// The broadcast state of a bundle transaction carrying a user operation
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionInfo {
    /// Hash of the most recently broadcast transaction
    pub transaction_hash: H256,
    /// Hashes of earlier broadcasts replaced by the current one
    pub previous_transaction_hashes: Vec<H256>,
    /// Address of the executor account that signed the transaction
    pub executor: Address,
    /// Gas fees the transaction was broadcast with
    pub gas_fees: GasFees,
    /// When the transaction was first broadcast, in Unix milliseconds
    pub first_submitted: u64,
    /// When the transaction was last replaced, in Unix milliseconds
    pub last_replaced: u64,
    /// How many times the transaction was seen in a block whose finality is
    /// not yet confirmed
    pub times_potentially_included: u64,
}

/// A user operation that has been broadcast in a bundle transaction and is
/// awaiting inclusion or timeout
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmittedUserOperation {
    /// The mempool entry for the operation
    pub uo_info: UserOperationInfo,
    /// The transaction carrying it
    pub transaction: TransactionInfo,
}

impl SubmittedUserOperation {
    /// Hash of the wrapped user operation
    pub fn hash(&self) -> H256 {
        self.uo_info.hash
    }
}
