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

use std::collections::VecDeque;

use anyhow::Context;
use async_trait::async_trait;
use ethers::{
    signers::{LocalWallet, Signer},
    types::Address,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::{Error, Result, SignerManager};

/// Signer manager over an in-process wallet pool.
///
/// A counting semaphore sized to the pool guards a deque of free wallets, so
/// leases block until a wallet is returned.
#[derive(Debug)]
pub struct LocalSignerManager {
    wallets: Vec<LocalWallet>,
    free: Mutex<VecDeque<LocalWallet>>,
    permits: Semaphore,
}

impl LocalSignerManager {
    /// Create a manager over the given wallets, all initially free
    pub fn new(wallets: Vec<LocalWallet>) -> Self {
        let free: VecDeque<_> = wallets.iter().cloned().collect();
        let manager = Self {
            permits: Semaphore::new(free.len()),
            free: Mutex::new(free),
            wallets,
        };
        manager.update_metrics();
        manager
    }

    fn update_metrics(&self) {
        metrics::gauge!(
            "signer_available_wallets",
            self.permits.available_permits() as f64
        );
    }
}

#[async_trait]
impl SignerManager for LocalSignerManager {
    fn wallets(&self) -> Vec<LocalWallet> {
        self.wallets.clone()
    }

    fn addresses(&self) -> Vec<Address> {
        self.wallets.iter().map(|wallet| wallet.address()).collect()
    }

    async fn available(&self) -> Result<usize> {
        Ok(self.permits.available_permits())
    }

    async fn lease_wallet(&self) -> Result<LocalWallet> {
        let permit = self
            .permits
            .acquire()
            .await
            .context("wallet semaphore should not be closed")?;
        permit.forget();

        let wallet = self.free.lock().pop_front();
        match wallet {
            Some(wallet) => {
                self.update_metrics();
                Ok(wallet)
            }
            None => {
                self.permits.add_permits(1);
                Err(Error::WalletPoolExhausted)
            }
        }
    }

    async fn return_wallet(&self, wallet: LocalWallet) -> Result<()> {
        {
            let mut free = self.free.lock();
            if !free.iter().any(|held| held.address() == wallet.address()) {
                free.push_back(wallet);
            }
        }
        self.permits.add_permits(1);
        self.update_metrics();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, sync::Arc, time::Duration};

    use tokio::time::timeout;

    use super::*;

    fn create_wallets(count: usize) -> Vec<LocalWallet> {
        (1..=count)
            .map(|i| format!("{i:064x}").parse::<LocalWallet>().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_lease_and_return_round_trip() {
        let wallets = create_wallets(2);
        let manager = LocalSignerManager::new(wallets.clone());
        let addresses: BTreeSet<_> = wallets.iter().map(|w| w.address()).collect();

        let leased = manager.lease_wallet().await.unwrap();
        assert_eq!(manager.available().await.unwrap(), 1);
        manager.return_wallet(leased).await.unwrap();
        assert_eq!(manager.available().await.unwrap(), 2);

        // the pool holds the same accounts it started with
        let free: BTreeSet<_> = manager.free.lock().iter().map(|w| w.address()).collect();
        assert_eq!(free, addresses);
    }

    #[tokio::test]
    async fn test_third_leaser_blocks_until_return() {
        let manager = Arc::new(LocalSignerManager::new(create_wallets(2)));

        let first = manager.lease_wallet().await.unwrap();
        let _second = manager.lease_wallet().await.unwrap();
        assert_eq!(manager.available().await.unwrap(), 0);
        assert_ne!(first.address(), _second.address());

        let blocked = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.lease_wallet().await })
        };
        // no wallet is free, the third lease must still be pending
        assert!(timeout(Duration::from_millis(50), manager.lease_wallet())
            .await
            .is_err());

        let returned_address = first.address();
        manager.return_wallet(first).await.unwrap();
        let third = timeout(Duration::from_secs(1), blocked)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(third.address(), returned_address);
        assert_eq!(manager.available().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_returning_present_wallet_does_not_duplicate() {
        let wallets = create_wallets(1);
        let manager = LocalSignerManager::new(wallets.clone());

        manager.return_wallet(wallets[0].clone()).await.unwrap();
        assert_eq!(manager.free.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_stable() {
        let wallets = create_wallets(3);
        let manager = LocalSignerManager::new(wallets.clone());
        let _leased = manager.lease_wallet().await.unwrap();
        assert_eq!(manager.wallets().len(), 3);
        assert_eq!(manager.addresses().len(), 3);
    }
}
