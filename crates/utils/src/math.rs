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

//! Math utilities

use std::ops::{Add, Div, Mul};

/// Increases a number by a percentage
pub fn increase_by_percent<T>(n: T, percent: u64) -> T
where
    T: Mul<Output = T> + Div<Output = T> + From<u64>,
{
    (n * T::from(100 + percent)) / T::from(100)
}

/// Increases a number by a percentage, rounding up
pub fn increase_by_percent_ceil<T>(n: T, percent: u64) -> T
where
    T: Add<Output = T> + Mul<Output = T> + Div<Output = T> + From<u64>,
{
    (n * T::from(100 + percent) + T::from(99)) / T::from(100)
}

/// Take a percentage of a number
pub fn percent<T>(n: T, percent: u64) -> T
where
    T: Mul<Output = T> + Div<Output = T> + From<u64>,
{
    (n * T::from(percent)) / T::from(100)
}

#[cfg(test)]
mod tests {
    use ethers::types::U256;

    use super::*;

    #[test]
    fn test_increase_by_percent() {
        assert_eq!(increase_by_percent(3123_u64, 10), 3435);
        assert_eq!(increase_by_percent(U256::from(3), 10), U256::from(3));
    }

    #[test]
    fn test_increase_by_percent_ceil() {
        assert_eq!(increase_by_percent_ceil(3123_u64, 10), 3436);
        assert_eq!(increase_by_percent_ceil(U256::from(3), 10), U256::from(4));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(3123_u64, 10), 312);
        assert_eq!(percent(U256::from(50), 120), U256::from(60));
    }
}
