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

//! Trait for interacting with chain data and contracts.

use std::sync::Arc;

use bindle_types::NonceSequenceId;
use ethers::types::{Address, Block, BlockId, BlockNumber, FeeHistory, H256, U256};
#[cfg(feature = "test-utils")]
use mockall::automock;

/// Fees suggested by the node's EIP-1559 estimator.
///
/// Either field may be absent on nodes that cannot derive it; callers are
/// expected to fill the gaps from other sources.
#[derive(Clone, Copy, Debug, Default)]
pub struct Eip1559FeeEstimate {
    /// Suggested max fee per gas
    pub max_fee_per_gas: Option<U256>,
    /// Suggested max priority fee per gas
    pub max_priority_fee_per_gas: Option<U256>,
}

/// Trait for interacting with chain data and contracts.
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait::async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Get a block by its hash or number
    async fn get_block(&self, block: BlockId) -> anyhow::Result<Option<Block<H256>>>;

    /// Get the gas price as reported by the node's RPC
    async fn get_gas_price(&self) -> anyhow::Result<U256>;

    /// Estimate EIP-1559 fees for the next block
    async fn estimate_eip1559_fees(&self) -> anyhow::Result<Eip1559FeeEstimate>;

    /// Estimate the gas price for a legacy transaction
    async fn estimate_legacy_fees(&self) -> anyhow::Result<U256>;

    /// Get the fee history for a number of blocks ending at the given block
    async fn fee_history(
        &self,
        block_count: u64,
        last_block: BlockNumber,
        reward_percentiles: &[f64],
    ) -> anyhow::Result<FeeHistory>;

    /// Read the entry point's current nonce for each `(sender, key)` pair in
    /// a single multicall.
    ///
    /// Returns one entry per pair in input order. A failed individual call
    /// yields `None` for its pair; a failure of the batch itself is an error.
    async fn get_entry_point_nonces(
        self: Arc<Self>,
        entry_point: Address,
        ids: Vec<NonceSequenceId>,
    ) -> anyhow::Result<Vec<Option<U256>>>;
}
