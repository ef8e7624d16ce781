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

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use bindle_provider::Provider;
use bindle_types::{split_nonce, NonceSequenceId, SubmittedUserOperation, UserOperationInfo};
use ethers::types::{Address, H256};
use parking_lot::RwLock;
use tracing::warn;

use super::{pool::PoolInner, Mempool, MempoolResult, PoolConfig, PoolSet};

/// User operation mempool
///
/// Wrapper around the pool sets that adds thread safety via a RwLock and
/// derives the available view from the entry point's on-chain nonces.
#[derive(Debug)]
pub struct UoPool<P> {
    config: PoolConfig,
    provider: Arc<P>,
    state: RwLock<PoolInner>,
}

impl<P: Provider> UoPool<P> {
    /// Create a new pool against the configured entry point
    pub fn new(config: PoolConfig, provider: Arc<P>) -> Self {
        Self {
            config,
            provider,
            state: RwLock::new(PoolInner::new()),
        }
    }

    fn update_metrics(&self) {
        let (outstanding, available, processing, submitted) = self.state.read().counts();
        PoolMetrics::set_pool_metrics(
            self.config.entry_point,
            outstanding,
            available,
            processing,
            submitted,
        );
    }
}

#[async_trait]
impl<P: Provider> Mempool for UoPool<P> {
    fn entry_point(&self) -> Address {
        self.config.entry_point
    }

    fn add_outstanding(&self, op: UserOperationInfo) {
        self.state.write().add_outstanding(op);
        self.update_metrics();
    }

    fn add_processing(&self, op: UserOperationInfo) {
        self.state.write().add_processing(op);
        self.update_metrics();
    }

    fn add_submitted(&self, op: SubmittedUserOperation) {
        self.state.write().add_submitted(op);
        self.update_metrics();
    }

    fn remove_outstanding(&self, hash: H256) {
        self.state.write().remove_outstanding(hash);
        self.update_metrics();
    }

    fn remove_processing(&self, hash: H256) {
        self.state.write().remove_processing(hash);
        self.update_metrics();
    }

    fn remove_submitted(&self, hash: H256) {
        self.state.write().remove_submitted(hash);
        self.update_metrics();
    }

    fn dump_outstanding(&self) -> Vec<UserOperationInfo> {
        self.state.read().dump_outstanding()
    }

    fn dump_available(&self) -> Vec<UserOperationInfo> {
        self.state.read().dump_available()
    }

    fn dump_processing(&self) -> Vec<UserOperationInfo> {
        self.state.read().dump_processing()
    }

    fn dump_submitted(&self) -> Vec<SubmittedUserOperation> {
        self.state.read().dump_submitted()
    }

    fn clear(&self, set: PoolSet) {
        self.state.write().clear(set);
        self.update_metrics();
    }

    async fn update_available_operations(&self) -> MempoolResult<()> {
        let snapshot = self.state.read().dump_outstanding();
        if snapshot.is_empty() {
            self.state.write().set_available(Vec::new());
            self.update_metrics();
            return Ok(());
        }

        // distinct nonce sequences in first-seen order
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for op in &snapshot {
            let id = op.uo.uo().nonce_sequence();
            if seen.insert(id) {
                ids.push(id);
            }
        }

        let results = Arc::clone(&self.provider)
            .get_entry_point_nonces(self.config.entry_point, ids.clone())
            .await?;
        if results.len() != ids.len() {
            return Err(anyhow::anyhow!(
                "expected {} nonce results, got {}",
                ids.len(),
                results.len()
            )
            .into());
        }

        let mut current_nonces: HashMap<NonceSequenceId, u64> = HashMap::new();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Some(nonce) => {
                    let (_, value) = split_nonce(nonce);
                    current_nonces.insert(id, value);
                }
                None => warn!(
                    "failed to read entry point nonce for sender {:?} key {}",
                    id.sender, id.key
                ),
            }
        }

        let available = snapshot
            .iter()
            .filter(|op| {
                let uo = op.uo.uo();
                current_nonces.get(&uo.nonce_sequence()) == Some(&uo.nonce_value())
            })
            .map(|op| op.hash)
            .collect();

        self.state.write().set_available(available);
        self.update_metrics();
        Ok(())
    }
}

struct PoolMetrics {}

impl PoolMetrics {
    fn set_pool_metrics(
        entry_point: Address,
        outstanding: usize,
        available: usize,
        processing: usize,
        submitted: usize,
    ) {
        metrics::gauge!("mempool_outstanding_ops", outstanding as f64, "entrypoint_addr" => entry_point.to_string());
        metrics::gauge!("mempool_available_ops", available as f64, "entrypoint_addr" => entry_point.to_string());
        metrics::gauge!("mempool_processing_ops", processing as f64, "entrypoint_addr" => entry_point.to_string());
        metrics::gauge!("mempool_submitted_ops", submitted as f64, "entrypoint_addr" => entry_point.to_string());
    }
}

#[cfg(test)]
mod tests {
    use bindle_provider::MockProvider;
    use bindle_types::{pack_nonce, MempoolUserOperation, UserOperation};
    use ethers::types::U256;

    use super::*;

    const ENTRY_POINT: Address = Address::repeat_byte(0xEE);

    fn create_op(sender: Address, key: u64, value: u64) -> UserOperationInfo {
        let uo = UserOperation {
            sender,
            nonce: pack_nonce(key.into(), value),
            ..UserOperation::default()
        };
        UserOperationInfo::new(MempoolUserOperation::User(uo), ENTRY_POINT, 1)
    }

    fn pool_with_nonces(
        nonces: Vec<Vec<Option<U256>>>,
    ) -> UoPool<MockProvider> {
        let mut provider = MockProvider::default();
        for batch in nonces {
            provider
                .expect_get_entry_point_nonces()
                .times(1)
                .returning(move |_, _| Ok(batch.clone()));
        }
        UoPool::new(
            PoolConfig {
                entry_point: ENTRY_POINT,
            },
            Arc::new(provider),
        )
    }

    #[tokio::test]
    async fn test_promotion_follows_chain_nonce() {
        let sender = Address::repeat_byte(0xAA);
        let pool = pool_with_nonces(vec![
            vec![Some(U256::from(5))],
            vec![Some(U256::from(6))],
        ]);

        let op = create_op(sender, 0, 5);
        pool.add_outstanding(op.clone());

        pool.update_available_operations().await.unwrap();
        assert_eq!(pool.dump_available(), vec![op.clone()]);

        // the chain nonce moved on, the op is no longer bundleable
        pool.update_available_operations().await.unwrap();
        assert!(pool.dump_available().is_empty());
        assert_eq!(pool.dump_outstanding(), vec![op]);
    }

    #[tokio::test]
    async fn test_removal_cascade() {
        let pool = pool_with_nonces(vec![vec![
            Some(U256::zero()),
            Some(U256::zero()),
        ]]);

        let op1 = create_op(Address::repeat_byte(0x01), 0, 0);
        let op2 = create_op(Address::repeat_byte(0x02), 0, 0);
        pool.add_outstanding(op1.clone());
        pool.add_outstanding(op2.clone());

        pool.update_available_operations().await.unwrap();
        assert_eq!(pool.dump_available().len(), 2);

        pool.remove_outstanding(op1.hash);
        assert_eq!(pool.dump_outstanding(), vec![op2.clone()]);
        assert_eq!(pool.dump_available(), vec![op2]);
    }

    #[tokio::test]
    async fn test_reconciliation_is_idempotent() {
        let sender = Address::repeat_byte(0xAA);
        let pool = pool_with_nonces(vec![
            vec![Some(U256::from(5))],
            vec![Some(U256::from(5))],
        ]);

        pool.add_outstanding(create_op(sender, 0, 5));
        pool.add_outstanding(create_op(sender, 0, 6));

        pool.update_available_operations().await.unwrap();
        let first = pool.dump_available();
        pool.update_available_operations().await.unwrap();
        assert_eq!(pool.dump_available(), first);
    }

    #[tokio::test]
    async fn test_per_entry_failure_skips_pair() {
        let pool = pool_with_nonces(vec![vec![None, Some(U256::zero())]]);

        let op1 = create_op(Address::repeat_byte(0x01), 0, 0);
        let op2 = create_op(Address::repeat_byte(0x02), 0, 0);
        pool.add_outstanding(op1.clone());
        pool.add_outstanding(op2.clone());

        pool.update_available_operations().await.unwrap();
        assert_eq!(pool.dump_available(), vec![op2]);
        assert_eq!(pool.dump_outstanding().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_failure_preserves_previous_view() {
        let mut provider = MockProvider::default();
        provider
            .expect_get_entry_point_nonces()
            .times(1)
            .returning(|_, _| Ok(vec![Some(U256::from(5))]));
        provider
            .expect_get_entry_point_nonces()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("multicall reverted")));
        let pool = UoPool::new(
            PoolConfig {
                entry_point: ENTRY_POINT,
            },
            Arc::new(provider),
        );

        let op = create_op(Address::repeat_byte(0xAA), 0, 5);
        pool.add_outstanding(op.clone());

        pool.update_available_operations().await.unwrap();
        assert_eq!(pool.dump_available(), vec![op.clone()]);

        assert!(pool.update_available_operations().await.is_err());
        assert_eq!(pool.dump_available(), vec![op]);
    }

    #[tokio::test]
    async fn test_packed_oracle_nonce_is_unpacked() {
        // the entry point returns (key << 64) | value
        let pool = pool_with_nonces(vec![vec![Some(pack_nonce(U256::from(7), 5))]]);

        let op = create_op(Address::repeat_byte(0xAA), 7, 5);
        pool.add_outstanding(op.clone());

        pool.update_available_operations().await.unwrap();
        assert_eq!(pool.dump_available(), vec![op]);
    }

    #[tokio::test]
    async fn test_future_nonce_stays_outstanding() {
        let pool = pool_with_nonces(vec![vec![Some(U256::from(5))]]);

        let current = create_op(Address::repeat_byte(0xAA), 0, 5);
        let future = create_op(Address::repeat_byte(0xAA), 0, 7);
        pool.add_outstanding(current.clone());
        pool.add_outstanding(future.clone());

        pool.update_available_operations().await.unwrap();
        assert_eq!(pool.dump_available(), vec![current]);
        assert_eq!(pool.dump_outstanding().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_outstanding_clears_available() {
        let pool = pool_with_nonces(vec![vec![Some(U256::from(5))]]);

        let op = create_op(Address::repeat_byte(0xAA), 0, 5);
        pool.add_outstanding(op.clone());
        pool.update_available_operations().await.unwrap();
        assert_eq!(pool.dump_available().len(), 1);

        pool.remove_outstanding(op.hash);
        pool.update_available_operations().await.unwrap();
        assert!(pool.dump_available().is_empty());
    }

    #[tokio::test]
    async fn test_compressed_ops_are_reconciled() {
        let pool = pool_with_nonces(vec![vec![Some(U256::from(3))]]);

        let inflated = UserOperation {
            sender: Address::repeat_byte(0xAA),
            nonce: pack_nonce(U256::zero(), 3),
            ..UserOperation::default()
        };
        let op = UserOperationInfo::new(
            MempoolUserOperation::Compressed(bindle_types::CompressedUserOperation {
                inflator: Address::repeat_byte(0x1F),
                compressed_calldata: vec![0x00].into(),
                inflated,
            }),
            ENTRY_POINT,
            1,
        );
        pool.add_outstanding(op.clone());

        pool.update_available_operations().await.unwrap();
        assert_eq!(pool.dump_available(), vec![op]);
    }
}
