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

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Bindle gas price tracking
//!
//! Maintains sliding-window histories of observed fees and derives the fee
//! parameters to broadcast bundles with, across EIP-1559, legacy, and
//! chain-specific fee regimes.

mod arbitrum;
pub use arbitrum::ArbitrumFeeManager;

mod error;
pub use error::{GasPriceError, GasPriceResult};

mod history;

mod manager;
pub use manager::{ChainType, GasPriceManager, Settings};

mod polygon;
