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

use ethers::{
    abi::{encode, Token},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};

/// An ERC-4337 user operation, as accepted by entry point v0.6.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Sender account address
    pub sender: Address,
    /// Packed 256-bit nonce: upper 192 bits key, lower 64 bits value
    pub nonce: U256,
    /// Factory address and calldata, empty for deployed accounts
    pub init_code: Bytes,
    /// Calldata executed on the sender account
    pub call_data: Bytes,
    /// Gas limit for the execution call
    pub call_gas_limit: U256,
    /// Gas limit for the validation call
    pub verification_gas_limit: U256,
    /// Gas paid to compensate the bundler for calldata and overhead
    pub pre_verification_gas: U256,
    /// EIP-1559 max fee per gas
    pub max_fee_per_gas: U256,
    /// EIP-1559 max priority fee per gas
    pub max_priority_fee_per_gas: U256,
    /// Paymaster address and data, empty when self-funded
    pub paymaster_and_data: Bytes,
    /// Account signature over the operation hash
    pub signature: Bytes,
}

impl UserOperation {
    /// Hash this user operation for the given entry point and chain ID.
    ///
    /// This is the hash the entry point uses to identify the operation;
    /// it does not cover the signature field.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> H256 {
        keccak256(encode(&[
            Token::FixedBytes(keccak256(self.pack_for_hash()).to_vec()),
            Token::Address(entry_point),
            Token::Uint(chain_id.into()),
        ]))
        .into()
    }

    /// The upper 192 bits of the nonce
    pub fn nonce_key(&self) -> U256 {
        self.nonce >> 64
    }

    /// The lower 64 bits of the nonce
    pub fn nonce_value(&self) -> u64 {
        self.nonce.low_u64()
    }

    /// The `(sender, nonce key)` pair identifying the nonce sequence this
    /// operation belongs to
    pub fn nonce_sequence(&self) -> NonceSequenceId {
        NonceSequenceId {
            sender: self.sender,
            key: self.nonce_key(),
        }
    }

    fn pack_for_hash(&self) -> Bytes {
        let hash_init_code = keccak256(self.init_code.clone());
        let hash_call_data = keccak256(self.call_data.clone());
        let hash_paymaster_and_data = keccak256(self.paymaster_and_data.clone());

        encode(&[
            Token::Address(self.sender),
            Token::Uint(self.nonce),
            Token::FixedBytes(hash_init_code.to_vec()),
            Token::FixedBytes(hash_call_data.to_vec()),
            Token::Uint(self.call_gas_limit),
            Token::Uint(self.verification_gas_limit),
            Token::Uint(self.pre_verification_gas),
            Token::Uint(self.max_fee_per_gas),
            Token::Uint(self.max_priority_fee_per_gas),
            Token::FixedBytes(hash_paymaster_and_data.to_vec()),
        ])
        .into()
    }
}

/// Pack a nonce key and value into a 256-bit nonce: `(key << 64) | value`
pub fn pack_nonce(key: U256, value: u64) -> U256 {
    (key << 64) | U256::from(value)
}

/// Split a 256-bit nonce into its 192-bit key and 64-bit value
pub fn split_nonce(nonce: U256) -> (U256, u64) {
    (nonce >> 64, nonce.low_u64())
}

/// Identifier of a nonce sequence: operations are totally ordered by nonce
/// value within one of these.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NonceSequenceId {
    /// Sender account address
    pub sender: Address,
    /// The 192-bit nonce key
    pub key: U256,
}

/// A user operation submitted in compressed form, to be inflated on chain by
/// an inflator contract before reaching the entry point.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedUserOperation {
    /// Address of the inflator contract
    pub inflator: Address,
    /// The compressed calldata passed to the inflator
    pub compressed_calldata: Bytes,
    /// The inflated user operation the calldata decompresses to
    pub inflated: UserOperation,
}

/// A user operation as held by the mempool: either a plain operation or a
/// compressed one wrapping its inflated form.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MempoolUserOperation {
    /// Plain user operation
    User(UserOperation),
    /// Compressed user operation
    Compressed(CompressedUserOperation),
}

impl MempoolUserOperation {
    /// The underlying user operation, regardless of representation
    pub fn uo(&self) -> &UserOperation {
        match self {
            MempoolUserOperation::User(uo) => uo,
            MempoolUserOperation::Compressed(cuo) => &cuo.inflated,
        }
    }
}

impl From<UserOperation> for MempoolUserOperation {
    fn from(uo: UserOperation) -> Self {
        MempoolUserOperation::User(uo)
    }
}

impl From<CompressedUserOperation> for MempoolUserOperation {
    fn from(cuo: CompressedUserOperation) -> Self {
        MempoolUserOperation::Compressed(cuo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_round_trip() {
        let key = U256::from(77) << 100;
        let value = 0xdead_beef_u64;
        let nonce = pack_nonce(key, value);
        assert_eq!(split_nonce(nonce), (key, value));
    }

    #[test]
    fn test_nonce_split() {
        let uo = UserOperation {
            nonce: (U256::from(3) << 64) | U256::from(5),
            ..UserOperation::default()
        };
        assert_eq!(uo.nonce_key(), U256::from(3));
        assert_eq!(uo.nonce_value(), 5);
    }

    #[test]
    fn test_zero_nonce_split() {
        let uo = UserOperation::default();
        assert_eq!(uo.nonce_key(), U256::zero());
        assert_eq!(uo.nonce_value(), 0);
    }

    #[test]
    fn test_hash_depends_on_context() {
        let uo = UserOperation::default();
        let ep0 = Address::repeat_byte(0x11);
        let ep1 = Address::repeat_byte(0x22);
        assert_ne!(uo.hash(ep0, 1), uo.hash(ep1, 1));
        assert_ne!(uo.hash(ep0, 1), uo.hash(ep0, 137));
    }

    #[test]
    fn test_hash_ignores_signature() {
        let base = UserOperation::default();
        let signed = UserOperation {
            signature: vec![1, 2, 3].into(),
            ..base.clone()
        };
        let ep = Address::repeat_byte(0x11);
        assert_eq!(base.hash(ep, 1), signed.hash(ep, 1));
    }

    #[test]
    fn test_compressed_projection() {
        let inner = UserOperation {
            nonce: U256::from(9),
            ..UserOperation::default()
        };
        let muo: MempoolUserOperation = CompressedUserOperation {
            inflator: Address::repeat_byte(0x42),
            compressed_calldata: vec![0xff].into(),
            inflated: inner.clone(),
        }
        .into();
        assert_eq!(*muo.uo(), inner);
    }
}
