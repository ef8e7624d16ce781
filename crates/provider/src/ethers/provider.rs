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

use std::sync::Arc;

use anyhow::Context;
use bindle_types::{contracts::i_entry_point::IEntryPoint, NonceSequenceId};
use ethers::{
    contract::{Multicall, MulticallVersion},
    providers::{JsonRpcClient, Middleware, Provider as EthersProvider},
    types::{Address, Block, BlockId, BlockNumber, FeeHistory, H256, U256},
};

use crate::{Eip1559FeeEstimate, Provider};

#[async_trait::async_trait]
impl<C: JsonRpcClient + 'static> Provider for EthersProvider<C> {
    async fn get_block(&self, block: BlockId) -> anyhow::Result<Option<Block<H256>>> {
        Middleware::get_block(self, block)
            .await
            .context("should get block from provider")
    }

    async fn get_gas_price(&self) -> anyhow::Result<U256> {
        self.request("eth_gasPrice", ())
            .await
            .context("should get gas price from provider")
    }

    async fn estimate_eip1559_fees(&self) -> anyhow::Result<Eip1559FeeEstimate> {
        let (max_fee_per_gas, max_priority_fee_per_gas) =
            Middleware::estimate_eip1559_fees(self, None)
                .await
                .context("should estimate EIP-1559 fees")?;
        Ok(Eip1559FeeEstimate {
            max_fee_per_gas: Some(max_fee_per_gas),
            max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
        })
    }

    async fn estimate_legacy_fees(&self) -> anyhow::Result<U256> {
        Middleware::get_gas_price(self)
            .await
            .context("should estimate legacy gas price")
    }

    async fn fee_history(
        &self,
        block_count: u64,
        last_block: BlockNumber,
        reward_percentiles: &[f64],
    ) -> anyhow::Result<FeeHistory> {
        Middleware::fee_history(self, block_count, last_block, reward_percentiles)
            .await
            .context("should get fee history from provider")
    }

    async fn get_entry_point_nonces(
        self: Arc<Self>,
        entry_point: Address,
        ids: Vec<NonceSequenceId>,
    ) -> anyhow::Result<Vec<Option<U256>>> {
        let entry_point = IEntryPoint::new(entry_point, Arc::clone(&self));
        let mut multicall = Multicall::new(Arc::clone(&self), None)
            .await
            .context("should create multicall against known deployment")?;
        multicall = multicall.version(MulticallVersion::Multicall3);

        for id in &ids {
            multicall.add_call(entry_point.get_nonce(id.sender, id.key), true);
        }

        let results = multicall
            .call_raw()
            .await
            .context("should batch entry point nonce reads")?;

        Ok(results
            .into_iter()
            .map(|result| result.ok().and_then(|token| token.into_uint()))
            .collect())
    }
}
