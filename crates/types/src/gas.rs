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

use std::cmp;

use bindle_utils::math;
use ethers::types::U256;

/// Gas fees for a user operation or transaction
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GasFees {
    /// EIP-1559 max fee per gas
    pub max_fee_per_gas: U256,
    /// EIP-1559 max priority fee per gas
    pub max_priority_fee_per_gas: U256,
}

impl GasFees {
    /// Increase both fees by a percentage
    pub fn increase_by_percent(self, percent: u64) -> Self {
        Self {
            max_fee_per_gas: math::increase_by_percent(self.max_fee_per_gas, percent),
            max_priority_fee_per_gas: math::increase_by_percent(
                self.max_priority_fee_per_gas,
                percent,
            ),
        }
    }

    /// Get the effective gas price of these fees given a base fee
    pub fn gas_price(self, base_fee: U256) -> U256 {
        cmp::min(
            self.max_fee_per_gas,
            base_fee.saturating_add(self.max_priority_fee_per_gas),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increase_by_percent() {
        let fees = GasFees {
            max_fee_per_gas: 100.into(),
            max_priority_fee_per_gas: 10.into(),
        };
        let increased = fees.increase_by_percent(10);
        assert_eq!(increased.max_fee_per_gas, 110.into());
        assert_eq!(increased.max_priority_fee_per_gas, 11.into());
    }

    #[test]
    fn test_gas_price_capped_by_max_fee() {
        let fees = GasFees {
            max_fee_per_gas: 100.into(),
            max_priority_fee_per_gas: 10.into(),
        };
        assert_eq!(fees.gas_price(50.into()), 60.into());
        assert_eq!(fees.gas_price(95.into()), 100.into());
    }
}
