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

//! Bindle executor wallet management
//!
//! Serializes access to the bounded pool of accounts that sign bundle
//! transactions, either within one process or across several through a
//! shared queue.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use ethers::{
    signers::{LocalWallet, Signer},
    types::Address,
};

mod error;
pub use error::{Error, Result};

mod local;
pub use local::LocalSignerManager;

mod shared;
pub use shared::SharedSignerManager;

/// Settings for the signer manager
#[derive(Clone, Debug)]
pub struct Settings {
    /// Chain ID the wallets sign for
    pub chain_id: u64,
    /// Hex-encoded private keys of the executor accounts, in pool order
    pub private_keys: Vec<String>,
    /// Cap on the number of wallets drawn from the keys
    pub max_wallets: Option<usize>,
    /// Connection string of the shared queue. Presence selects the
    /// cross-process backend.
    pub redis_uri: Option<String>,
}

/// Trait for a signer manager
///
/// Leases executor wallets from a bounded pool, blocking when none is free.
#[async_trait]
pub trait SignerManager: Send + Sync {
    /// Snapshot of every wallet in the pool
    fn wallets(&self) -> Vec<LocalWallet>;

    /// Addresses of every wallet in the pool
    fn addresses(&self) -> Vec<Address>;

    /// Number of wallets currently free to lease
    async fn available(&self) -> Result<usize>;

    /// Lease a wallet, waiting until one is free
    async fn lease_wallet(&self) -> Result<LocalWallet>;

    /// Return a leased wallet to the pool
    async fn return_wallet(&self, wallet: LocalWallet) -> Result<()>;
}

/// Build the signer manager selected by the settings
pub async fn new_signer_manager(settings: &Settings) -> Result<Arc<dyn SignerManager>> {
    let wallets = parse_wallets(settings)?;
    match &settings.redis_uri {
        Some(uri) => Ok(Arc::new(SharedSignerManager::connect(uri, wallets).await?)),
        None => Ok(Arc::new(LocalSignerManager::new(wallets))),
    }
}

fn parse_wallets(settings: &Settings) -> Result<Vec<LocalWallet>> {
    let mut wallets = settings
        .private_keys
        .iter()
        .map(|key| {
            key.parse::<LocalWallet>()
                .map(|wallet| wallet.with_chain_id(settings.chain_id))
                .context("should parse executor private key")
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    if let Some(max_wallets) = settings.max_wallets {
        wallets.truncate(max_wallets);
    }
    if wallets.is_empty() {
        return Err(anyhow::anyhow!("at least one executor private key is required").into());
    }
    Ok(wallets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(keys: usize, max_wallets: Option<usize>) -> Settings {
        Settings {
            chain_id: 1,
            private_keys: (1..=keys)
                .map(|i| format!("{i:064x}"))
                .collect(),
            max_wallets,
            redis_uri: None,
        }
    }

    #[test]
    fn test_parse_wallets() {
        let wallets = parse_wallets(&settings(3, None)).unwrap();
        assert_eq!(wallets.len(), 3);
    }

    #[test]
    fn test_pool_truncated_to_max() {
        let wallets = parse_wallets(&settings(3, Some(2))).unwrap();
        assert_eq!(wallets.len(), 2);
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(parse_wallets(&settings(0, None)).is_err());
        assert!(parse_wallets(&settings(2, Some(0))).is_err());
    }

    #[test]
    fn test_malformed_key_rejected() {
        let mut settings = settings(1, None);
        settings.private_keys[0] = "not a key".to_string();
        assert!(parse_wallets(&settings).is_err());
    }
}
