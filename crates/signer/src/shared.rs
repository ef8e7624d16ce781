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

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use ethers::{
    signers::{LocalWallet, Signer},
    types::Address,
};
use redis::{aio::ConnectionManager, AsyncCommands};
use tokio::time;
use tracing::warn;

use crate::{Result, SignerManager};

/// Name of the shared wallet list
const WALLET_QUEUE_KEY: &str = "sender-manager";
/// How often an empty queue is re-polled
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Signer manager coordinating wallet leases across processes through a
/// shared Redis list.
///
/// The list holds the addresses of free wallets. Leasing pops from one end
/// and returning pushes to the other, so processes are served FIFO; an empty
/// list is re-polled every 100 ms.
#[derive(Clone)]
pub struct SharedSignerManager {
    wallets: Vec<LocalWallet>,
    by_address: HashMap<Address, LocalWallet>,
    conn: ConnectionManager,
}

impl SharedSignerManager {
    /// Connect to the shared queue, seeding it with every wallet address if
    /// it is empty.
    pub async fn connect(redis_uri: &str, wallets: Vec<LocalWallet>) -> Result<Self> {
        let client = redis::Client::open(redis_uri)?;
        let mut conn = ConnectionManager::new(client).await?;

        let len: u64 = conn.llen(WALLET_QUEUE_KEY).await?;
        if len == 0 {
            let addresses = wallets
                .iter()
                .map(|wallet| format_address(wallet.address()))
                .collect::<Vec<_>>();
            let _: () = conn.rpush(WALLET_QUEUE_KEY, addresses).await?;
        }

        let by_address = wallets
            .iter()
            .map(|wallet| (wallet.address(), wallet.clone()))
            .collect();
        Ok(Self {
            wallets,
            by_address,
            conn,
        })
    }

    async fn record_available(&self, conn: &mut ConnectionManager) {
        if let Ok(len) = conn.llen::<_, u64>(WALLET_QUEUE_KEY).await {
            metrics::gauge!("signer_available_wallets", len as f64);
        }
    }
}

#[async_trait]
impl SignerManager for SharedSignerManager {
    fn wallets(&self) -> Vec<LocalWallet> {
        self.wallets.clone()
    }

    fn addresses(&self) -> Vec<Address> {
        self.wallets.iter().map(|wallet| wallet.address()).collect()
    }

    async fn available(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(WALLET_QUEUE_KEY).await?;
        Ok(len as usize)
    }

    async fn lease_wallet(&self) -> Result<LocalWallet> {
        let mut conn = self.conn.clone();
        loop {
            let popped: Option<String> = conn.rpop(WALLET_QUEUE_KEY, None).await?;
            let Some(raw) = popped else {
                time::sleep(POLL_INTERVAL).await;
                continue;
            };
            match raw.parse::<Address>() {
                Ok(address) => {
                    if let Some(wallet) = self.by_address.get(&address) {
                        self.record_available(&mut conn).await;
                        return Ok(wallet.clone());
                    }
                    warn!("popped unknown wallet address {address:?} from shared queue");
                }
                Err(_) => warn!("popped malformed wallet address {raw} from shared queue"),
            }
        }
    }

    async fn return_wallet(&self, wallet: LocalWallet) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .lpush(WALLET_QUEUE_KEY, format_address(wallet.address()))
            .await?;
        self.record_available(&mut conn).await;
        Ok(())
    }
}

fn format_address(address: Address) -> String {
    format!("{address:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_round_trip() {
        let wallet = format!("{:064x}", 7).parse::<LocalWallet>().unwrap();
        let raw = format_address(wallet.address());
        assert_eq!(raw.parse::<Address>().unwrap(), wallet.address());
    }
}
