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

use bindle_types::now_millis;
use ethers::types::U256;
use parking_lot::RwLock;

use crate::history::FeeQueue;

/// Minimum time between distinct entries in the Arbitrum queues
const ARBITRUM_QUEUE_SLICE_MILLIS: u64 = 15_000;

/// Tracks the L1 and L2 base fees observed on Arbitrum chains.
///
/// Zero observations are dropped. Aggregates over an empty window return
/// `2^128 - 1` for maxima (effectively unbounded) and `1` for the L1 minimum.
#[derive(Debug)]
pub struct ArbitrumFeeManager {
    l1_base_fee: RwLock<FeeQueue>,
    l2_base_fee: RwLock<FeeQueue>,
}

impl ArbitrumFeeManager {
    pub(crate) fn new(queue_size: usize) -> Self {
        Self {
            l1_base_fee: RwLock::new(FeeQueue::new(queue_size, ARBITRUM_QUEUE_SLICE_MILLIS, true)),
            l2_base_fee: RwLock::new(FeeQueue::new(queue_size, ARBITRUM_QUEUE_SLICE_MILLIS, true)),
        }
    }

    /// Record an observed L1 base fee
    pub fn save_l1_base_fee(&self, value: U256) {
        self.l1_base_fee.write().record(value, now_millis());
    }

    /// Record an observed L2 base fee
    pub fn save_l2_base_fee(&self, value: U256) {
        self.l2_base_fee.write().record(value, now_millis());
    }

    /// The smallest L1 base fee in the window
    pub fn get_min_l1_base_fee(&self) -> U256 {
        self.l1_base_fee.read().min().unwrap_or_else(U256::one)
    }

    /// The largest L1 base fee in the window
    pub fn get_max_l1_base_fee(&self) -> U256 {
        self.l1_base_fee
            .read()
            .max()
            .unwrap_or_else(|| U256::from(u128::MAX))
    }

    /// The largest L2 base fee in the window
    pub fn get_max_l2_base_fee(&self) -> U256 {
        self.l2_base_fee
            .read()
            .max()
            .unwrap_or_else(|| U256::from(u128::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_sentinels() {
        let manager = ArbitrumFeeManager::new(4);
        assert_eq!(manager.get_min_l1_base_fee(), U256::one());
        assert_eq!(manager.get_max_l1_base_fee(), U256::from(u128::MAX));
        assert_eq!(manager.get_max_l2_base_fee(), U256::from(u128::MAX));
    }

    #[test]
    fn test_saved_fees_are_aggregated() {
        let manager = ArbitrumFeeManager::new(4);
        manager.save_l1_base_fee(100.into());
        manager.save_l2_base_fee(7.into());
        assert_eq!(manager.get_min_l1_base_fee(), 100.into());
        assert_eq!(manager.get_max_l1_base_fee(), 100.into());
        assert_eq!(manager.get_max_l2_base_fee(), 7.into());
    }

    #[test]
    fn test_zero_fees_are_dropped() {
        let manager = ArbitrumFeeManager::new(4);
        manager.save_l1_base_fee(U256::zero());
        manager.save_l2_base_fee(U256::zero());
        assert_eq!(manager.get_min_l1_base_fee(), U256::one());
        assert_eq!(manager.get_max_l2_base_fee(), U256::from(u128::MAX));
    }
}
