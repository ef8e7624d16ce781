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

/// Signer manager result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Signer manager error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A wallet permit was issued but no wallet was available to hand out
    #[error("wallet pool exhausted")]
    WalletPoolExhausted,
    /// Error from the shared queue backend
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    /// Some other error occurred
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
