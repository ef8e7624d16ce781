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

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use bindle_provider::Provider;
use bindle_types::{
    chain::{ARBITRUM_CHAIN_IDS, AVALANCHE_CHAIN_IDS, CELO_CHAIN_IDS, DFK_CHAIN_IDS},
    now_millis, GasFees,
};
use bindle_utils::{handle::SpawnGuard, math};
use ethers::types::{BlockNumber, Chain, U256};
use parking_lot::RwLock;
use tokio::time;
use tracing::error;

use crate::{
    arbitrum::ArbitrumFeeManager,
    error::{GasPriceError, GasPriceResult},
    history::FeeQueue,
    polygon::GasStation,
};

/// Minimum time between distinct entries in the fee queues
const FEE_QUEUE_SLICE_MILLIS: u64 = 1_000;

/// Blocks of history consulted when the node does not suggest a priority fee
const PRIORITY_FEE_HISTORY_BLOCKS: u64 = 10;
/// Reward percentile consulted when the node does not suggest a priority fee
const PRIORITY_FEE_PERCENTILE: f64 = 20.0;
/// Divisor deriving a nonzero priority fee from the max fee
const PRIORITY_FEE_DIVISOR: u64 = 200;

const GWEI: u64 = 1_000_000_000;
const POLYGON_MIN_PRIORITY_FEE: u64 = 31 * GWEI;
const MUMBAI_MIN_PRIORITY_FEE: u64 = GWEI;
const DFK_MIN_FEE: u64 = 5 * GWEI;
const AVALANCHE_MIN_FEE: u64 = 1_500_000_000; // 1.5 gwei

/// Fee conventions of the target chain beyond what its chain ID implies
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ChainType {
    /// Standard EVM fee reporting
    #[default]
    Default,
    /// Hedera, whose nodes report fees scaled by 10^9
    Hedera,
}

/// Settings for the gas price manager
#[derive(Clone, Debug)]
pub struct Settings {
    /// Chain ID the manager tracks fees for
    pub chain_id: u64,
    /// Percentage multiplier applied to every fetched fee pair, 100 = unchanged
    pub bump_percent: u64,
    /// Maximum number of entries per fee history queue
    pub queue_size: usize,
    /// Interval between background refreshes. Zero disables caching: every
    /// read recomputes from the chain.
    pub refresh_interval: Duration,
    /// Chain uses legacy transactions only
    pub legacy_transactions: bool,
    /// Fee conventions of the chain
    pub chain_type: ChainType,
}

#[derive(Debug)]
struct FeeHistories {
    base_fee: FeeQueue,
    max_fee: FeeQueue,
    max_priority_fee: FeeQueue,
}

/// Tracks observed gas fees and derives the fee parameters for the next
/// bundle transaction.
#[derive(Debug)]
pub struct GasPriceManager<P> {
    provider: Arc<P>,
    settings: Settings,
    histories: RwLock<FeeHistories>,
    gas_station: Option<GasStation>,
    arbitrum: Option<ArbitrumFeeManager>,
}

impl<P: Provider> GasPriceManager<P> {
    /// Create a new gas price manager
    pub fn new(provider: Arc<P>, settings: Settings) -> Self {
        let histories = FeeHistories {
            base_fee: FeeQueue::new(settings.queue_size, FEE_QUEUE_SLICE_MILLIS, false),
            max_fee: FeeQueue::new(settings.queue_size, FEE_QUEUE_SLICE_MILLIS, false),
            max_priority_fee: FeeQueue::new(settings.queue_size, FEE_QUEUE_SLICE_MILLIS, false),
        };
        let gas_station = GasStation::for_chain(settings.chain_id);
        let arbitrum = ARBITRUM_CHAIN_IDS
            .contains(&settings.chain_id)
            .then(|| ArbitrumFeeManager::new(settings.queue_size));
        Self {
            provider,
            settings,
            histories: RwLock::new(histories),
            gas_station,
            arbitrum,
        }
    }

    /// The Arbitrum fee sub-manager, present on Arbitrum chains
    pub fn arbitrum(&self) -> Option<&ArbitrumFeeManager> {
        self.arbitrum.as_ref()
    }

    /// Spawn the periodic refresh task, returning a guard that aborts it when
    /// dropped. No task is spawned when the refresh interval is zero.
    pub fn spawn_refresh_task(self: Arc<Self>) -> Option<SpawnGuard> {
        if self.settings.refresh_interval.is_zero() {
            return None;
        }
        Some(SpawnGuard::spawn_with_guard(async move {
            let mut interval = time::interval(self.settings.refresh_interval);
            loop {
                interval.tick().await;
                if let Err(e) = self.refresh_gas_price().await {
                    error!("failed to refresh gas price: {e:#}");
                }
                if !self.settings.legacy_transactions {
                    if let Err(e) = self.refresh_base_fee().await {
                        error!("failed to refresh base fee: {e:#}");
                    }
                }
            }
        }))
    }

    /// The fee pair to broadcast with right now.
    ///
    /// Recomputed from the chain when caching is disabled, otherwise the most
    /// recently stored pair.
    pub async fn get_gas_price(&self) -> GasPriceResult<GasFees> {
        if self.settings.refresh_interval.is_zero() {
            return self.refresh_gas_price().await;
        }
        {
            let histories = self.histories.read();
            if let (Some(max_fee), Some(max_priority_fee)) = (
                histories.max_fee.latest(),
                histories.max_priority_fee.latest(),
            ) {
                return Ok(GasFees {
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: max_priority_fee,
                });
            }
        }
        self.refresh_gas_price().await
    }

    /// The current base fee
    pub async fn get_base_fee(&self) -> GasPriceResult<U256> {
        if self.settings.legacy_transactions {
            return Err(GasPriceError::BaseFeeUnavailable);
        }
        if self.settings.refresh_interval.is_zero() {
            return self.refresh_base_fee().await;
        }
        if let Some(base_fee) = self.histories.read().base_fee.latest() {
            return Ok(base_fee);
        }
        self.refresh_base_fee().await
    }

    /// The largest base fee in the current window
    pub async fn get_max_base_fee_per_gas(&self) -> GasPriceResult<U256> {
        if let Some(base_fee) = self.histories.read().base_fee.max() {
            return Ok(base_fee);
        }
        self.refresh_base_fee().await?;
        self.histories
            .read()
            .base_fee
            .max()
            .ok_or(GasPriceError::BaseFeeUnavailable)
    }

    /// The smallest max fee in the current window
    pub async fn get_min_max_fee_per_gas(&self) -> GasPriceResult<U256> {
        if let Some(max_fee) = self.histories.read().max_fee.min() {
            return Ok(max_fee);
        }
        self.refresh_gas_price().await?;
        let max_fee = self
            .histories
            .read()
            .max_fee
            .min()
            .context("fee history should not be empty after refresh")?;
        Ok(max_fee)
    }

    /// The smallest max priority fee in the current window
    pub async fn get_min_max_priority_fee_per_gas(&self) -> GasPriceResult<U256> {
        if let Some(max_priority_fee) = self.histories.read().max_priority_fee.min() {
            return Ok(max_priority_fee);
        }
        self.refresh_gas_price().await?;
        let max_priority_fee = self
            .histories
            .read()
            .max_priority_fee
            .min()
            .context("fee history should not be empty after refresh")?;
        Ok(max_priority_fee)
    }

    /// Reject a proposed fee pair when either field falls below the minimum
    /// observed over the current window.
    pub async fn validate_gas_price(&self, proposed: GasFees) -> GasPriceResult<()> {
        let mut min_max_fee = self.get_min_max_fee_per_gas().await?;
        let mut min_priority_fee = self.get_min_max_priority_fee_per_gas().await?;
        if self.settings.chain_type == ChainType::Hedera {
            min_max_fee = min_max_fee / U256::exp10(9);
            min_priority_fee = min_priority_fee / U256::exp10(9);
        }
        if proposed.max_fee_per_gas < min_max_fee
            || proposed.max_priority_fee_per_gas < min_priority_fee
        {
            return Err(GasPriceError::GasPriceTooLow(GasFees {
                max_fee_per_gas: min_max_fee,
                max_priority_fee_per_gas: min_priority_fee,
            }));
        }
        Ok(())
    }

    async fn refresh_gas_price(&self) -> GasPriceResult<GasFees> {
        let fees = self.fetch_gas_price().await?;
        let now = now_millis();
        let mut histories = self.histories.write();
        histories.max_fee.record(fees.max_fee_per_gas, now);
        histories
            .max_priority_fee
            .record(fees.max_priority_fee_per_gas, now);
        Ok(fees)
    }

    async fn refresh_base_fee(&self) -> GasPriceResult<U256> {
        if self.settings.legacy_transactions {
            return Err(GasPriceError::BaseFeeUnavailable);
        }
        let block = self
            .provider
            .get_block(BlockNumber::Latest.into())
            .await?
            .context("latest block should exist")?;
        let base_fee = block
            .base_fee_per_gas
            .ok_or(GasPriceError::BaseFeeUnavailable)?;
        self.histories
            .write()
            .base_fee
            .record(base_fee, now_millis());
        Ok(base_fee)
    }

    /// Compute the next fee pair by source precedence: gas station where one
    /// serves the chain, the legacy estimator on legacy chains, the EIP-1559
    /// estimator otherwise. Missing EIP-1559 fields are filled from the fee
    /// history and the derived next base fee.
    async fn fetch_gas_price(&self) -> GasPriceResult<GasFees> {
        if let Some(station) = &self.gas_station {
            match station.fetch().await {
                Ok(fees) => return Ok(self.adjust_fees(fees)),
                Err(e) => error!("failed to fetch fees from gas station: {e:#}"),
            }
        }

        if self.settings.legacy_transactions {
            let gas_price = match self.provider.estimate_legacy_fees().await {
                Ok(gas_price) => gas_price,
                Err(e) => {
                    error!("failed to estimate legacy fees: {e:#}");
                    self.provider.get_gas_price().await?
                }
            };
            return Ok(self.adjust_fees(GasFees {
                max_fee_per_gas: gas_price,
                max_priority_fee_per_gas: gas_price,
            }));
        }

        let estimate = self.provider.estimate_eip1559_fees().await?;
        let max_priority_fee = match estimate.max_priority_fee_per_gas {
            Some(fee) => fee,
            None => {
                self.estimate_priority_fee_from_history(estimate.max_fee_per_gas)
                    .await?
            }
        };
        let max_fee = match estimate.max_fee_per_gas {
            Some(fee) => fee,
            None => self.next_block_base_fee().await? + max_priority_fee,
        };
        let max_priority_fee = if max_priority_fee.is_zero() {
            max_fee / U256::from(PRIORITY_FEE_DIVISOR)
        } else {
            max_priority_fee
        };

        Ok(self.adjust_fees(GasFees {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: max_priority_fee,
        }))
    }

    async fn estimate_priority_fee_from_history(
        &self,
        max_fee: Option<U256>,
    ) -> GasPriceResult<U256> {
        let fee_history = self
            .provider
            .fee_history(
                PRIORITY_FEE_HISTORY_BLOCKS,
                BlockNumber::Latest,
                &[PRIORITY_FEE_PERCENTILE],
            )
            .await?;
        let mut fee = average_reward(&fee_history.reward);
        if let Some(max_fee) = max_fee {
            fee = fee.min(max_fee);
        }
        Ok(fee)
    }

    async fn next_block_base_fee(&self) -> GasPriceResult<U256> {
        let block = self
            .provider
            .get_block(BlockNumber::Latest.into())
            .await?
            .context("latest block should exist")?;
        let base_fee = block
            .base_fee_per_gas
            .ok_or(GasPriceError::BaseFeeUnavailable)?;
        Ok(calc_next_base_fee(base_fee, block.gas_used, block.gas_limit))
    }

    fn adjust_fees(&self, fees: GasFees) -> GasFees {
        adjust_fees(self.settings.chain_id, self.settings.bump_percent, fees)
    }
}

/// Apply the configured bump to a fetched fee pair, then the chain-specific
/// floors and overrides.
fn adjust_fees(chain_id: u64, bump_percent: u64, fees: GasFees) -> GasFees {
    let mut max_fee = math::percent(fees.max_fee_per_gas, bump_percent);
    let mut max_priority_fee = math::percent(fees.max_priority_fee_per_gas, bump_percent);

    let priority_fee_floor = if chain_id == Chain::Polygon as u64 {
        U256::from(POLYGON_MIN_PRIORITY_FEE)
    } else if chain_id == Chain::PolygonMumbai as u64 {
        U256::from(MUMBAI_MIN_PRIORITY_FEE)
    } else {
        U256::zero()
    };
    max_priority_fee = max_priority_fee.max(priority_fee_floor);
    max_fee = max_fee.max(max_priority_fee);

    if CELO_CHAIN_IDS.contains(&chain_id) {
        let fee = max_fee.max(max_priority_fee);
        max_fee = fee;
        max_priority_fee = fee;
    } else if DFK_CHAIN_IDS.contains(&chain_id) {
        max_fee = max_fee.max(DFK_MIN_FEE.into());
        max_priority_fee = max_priority_fee.max(DFK_MIN_FEE.into());
    } else if AVALANCHE_CHAIN_IDS.contains(&chain_id) {
        max_fee = max_fee.max(AVALANCHE_MIN_FEE.into());
        max_priority_fee = max_priority_fee.max(AVALANCHE_MIN_FEE.into());
    }

    GasFees {
        max_fee_per_gas: max_fee,
        max_priority_fee_per_gas: max_priority_fee,
    }
}

/// Derive the base fee of the next block from the latest block's base fee
/// and fullness.
fn calc_next_base_fee(base_fee: U256, gas_used: U256, gas_limit: U256) -> U256 {
    let target = gas_limit / U256::from(2);
    if gas_used == target {
        base_fee
    } else if gas_used > target {
        let delta = base_fee * (gas_used - target) / target / U256::from(8);
        base_fee + delta.max(U256::one())
    } else {
        base_fee - base_fee * (target - gas_used) / target / U256::from(8)
    }
}

/// Mean of the sampled reward percentile, skipping empty blocks
fn average_reward(reward: &[Vec<U256>]) -> U256 {
    let values = reward
        .iter()
        .filter(|block| !block.is_empty() && !block[0].is_zero())
        .map(|block| block[0])
        .collect::<Vec<_>>();
    if values.is_empty() {
        return U256::zero();
    }
    let sum = values
        .iter()
        .fold(U256::zero(), |acc, value| acc.saturating_add(*value));
    sum / U256::from(values.len())
}
