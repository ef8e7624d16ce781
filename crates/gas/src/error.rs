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

use bindle_types::GasFees;

/// Gas price result type.
pub type GasPriceResult<T> = std::result::Result<T, GasPriceError>;

/// Gas price error type.
#[derive(Debug, thiserror::Error)]
pub enum GasPriceError {
    /// The chain runs legacy transactions only and does not track a base fee
    #[error("chain does not track a base fee")]
    BaseFeeUnavailable,
    /// Proposed fees fall below the tracked window minimum
    #[error(
        "gas price too low: minimum max fee per gas {}, minimum max priority fee per gas {}",
        .0.max_fee_per_gas,
        .0.max_priority_fee_per_gas
    )]
    GasPriceTooLow(GasFees),
    /// Some other error occurred
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
