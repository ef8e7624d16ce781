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

use std::collections::{BTreeSet, HashMap};

use bindle_types::{SubmittedUserOperation, UserOperationInfo};
use ethers::types::H256;
use tracing::warn;

use super::PoolSet;

/// Hash-indexed store of operations preserving admission order.
#[derive(Debug)]
struct OrderedOps<T> {
    by_hash: HashMap<H256, (u64, T)>,
    order: BTreeSet<(u64, H256)>,
}

impl<T: Clone> OrderedOps<T> {
    fn new() -> Self {
        Self {
            by_hash: HashMap::new(),
            order: BTreeSet::new(),
        }
    }

    /// Returns false if the hash was already present, leaving the existing
    /// entry untouched.
    fn insert(&mut self, hash: H256, op: T, submission_id: u64) -> bool {
        if self.by_hash.contains_key(&hash) {
            return false;
        }
        self.by_hash.insert(hash, (submission_id, op));
        self.order.insert((submission_id, hash));
        true
    }

    fn remove(&mut self, hash: H256) -> Option<T> {
        let (submission_id, op) = self.by_hash.remove(&hash)?;
        self.order.remove(&(submission_id, hash));
        Some(op)
    }

    fn get(&self, hash: H256) -> Option<&T> {
        self.by_hash.get(&hash).map(|(_, op)| op)
    }

    fn dump(&self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|(_, hash)| self.get(*hash).cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.by_hash.len()
    }

    fn clear(&mut self) {
        self.by_hash.clear();
        self.order.clear();
    }
}

/// The four lifecycle sets of the mempool.
///
/// Each user operation hash appears in at most one of outstanding,
/// processing, and submitted. The available view is a subset of outstanding
/// computed by reconciliation and replaced wholesale, never mutated
/// incrementally.
#[derive(Debug)]
pub(crate) struct PoolInner {
    outstanding: OrderedOps<UserOperationInfo>,
    processing: OrderedOps<UserOperationInfo>,
    submitted: OrderedOps<SubmittedUserOperation>,
    /// Hashes of outstanding operations whose nonce is current on chain, in
    /// admission order
    available: Vec<H256>,
    submission_id: u64,
}

impl PoolInner {
    pub(crate) fn new() -> Self {
        Self {
            outstanding: OrderedOps::new(),
            processing: OrderedOps::new(),
            submitted: OrderedOps::new(),
            available: Vec::new(),
            submission_id: 0,
        }
    }

    pub(crate) fn add_outstanding(&mut self, op: UserOperationInfo) {
        let hash = op.hash;
        let submission_id = self.next_submission_id();
        if !self.outstanding.insert(hash, op, submission_id) {
            warn!("user operation {hash:?} is already outstanding");
        }
    }

    pub(crate) fn add_processing(&mut self, op: UserOperationInfo) {
        let hash = op.hash;
        let submission_id = self.next_submission_id();
        if !self.processing.insert(hash, op, submission_id) {
            warn!("user operation {hash:?} is already processing");
        }
    }

    pub(crate) fn add_submitted(&mut self, op: SubmittedUserOperation) {
        let hash = op.hash();
        let submission_id = self.next_submission_id();
        if !self.submitted.insert(hash, op, submission_id) {
            warn!("user operation {hash:?} is already submitted");
        }
    }

    pub(crate) fn remove_outstanding(&mut self, hash: H256) {
        if self.outstanding.remove(hash).is_none() {
            warn!("cannot remove user operation {hash:?}: not outstanding");
            return;
        }
        self.available.retain(|available| *available != hash);
    }

    pub(crate) fn remove_processing(&mut self, hash: H256) {
        if self.processing.remove(hash).is_none() {
            warn!("cannot remove user operation {hash:?}: not processing");
        }
    }

    pub(crate) fn remove_submitted(&mut self, hash: H256) {
        if self.submitted.remove(hash).is_none() {
            warn!("cannot remove user operation {hash:?}: not submitted");
        }
    }

    pub(crate) fn dump_outstanding(&self) -> Vec<UserOperationInfo> {
        self.outstanding.dump()
    }

    /// The available view resolved against the outstanding store, so hashes
    /// whose operations have since left the pool yield nothing.
    pub(crate) fn dump_available(&self) -> Vec<UserOperationInfo> {
        self.available
            .iter()
            .filter_map(|hash| self.outstanding.get(*hash).cloned())
            .collect()
    }

    pub(crate) fn dump_processing(&self) -> Vec<UserOperationInfo> {
        self.processing.dump()
    }

    pub(crate) fn dump_submitted(&self) -> Vec<SubmittedUserOperation> {
        self.submitted.dump()
    }

    pub(crate) fn set_available(&mut self, hashes: Vec<H256>) {
        self.available = hashes;
    }

    pub(crate) fn clear(&mut self, set: PoolSet) {
        match set {
            PoolSet::Outstanding => self.outstanding.clear(),
            PoolSet::Processing => self.processing.clear(),
            PoolSet::Submitted => self.submitted.clear(),
        }
    }

    /// Counts of (outstanding, available, processing, submitted)
    pub(crate) fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.outstanding.len(),
            self.available.len(),
            self.processing.len(),
            self.submitted.len(),
        )
    }

    fn next_submission_id(&mut self) -> u64 {
        let id = self.submission_id;
        self.submission_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use bindle_types::{MempoolUserOperation, UserOperation};
    use ethers::types::{Address, U256};

    use super::*;

    fn create_op(sender: Address, nonce: u64) -> UserOperationInfo {
        let uo = UserOperation {
            sender,
            nonce: U256::from(nonce),
            ..UserOperation::default()
        };
        UserOperationInfo::new(
            MempoolUserOperation::User(uo),
            Address::repeat_byte(0xEE),
            1,
        )
    }

    #[test]
    fn test_dump_in_admission_order() {
        let mut pool = PoolInner::new();
        let ops = vec![
            create_op(Address::random(), 0),
            create_op(Address::random(), 0),
            create_op(Address::random(), 0),
        ];
        for op in &ops {
            pool.add_outstanding(op.clone());
        }
        assert_eq!(pool.dump_outstanding(), ops);
    }

    #[test]
    fn test_double_add_keeps_first() {
        let mut pool = PoolInner::new();
        let op = create_op(Address::random(), 0);
        pool.add_outstanding(op.clone());
        pool.add_outstanding(op.clone());
        assert_eq!(pool.dump_outstanding(), vec![op]);
    }

    #[test]
    fn test_remove_cascades_to_available() {
        let mut pool = PoolInner::new();
        let op1 = create_op(Address::random(), 0);
        let op2 = create_op(Address::random(), 0);
        pool.add_outstanding(op1.clone());
        pool.add_outstanding(op2.clone());
        pool.set_available(vec![op1.hash, op2.hash]);

        pool.remove_outstanding(op1.hash);
        assert_eq!(pool.dump_outstanding(), vec![op2.clone()]);
        assert_eq!(pool.dump_available(), vec![op2]);
    }

    #[test]
    fn test_remove_missing_is_not_fatal() {
        let mut pool = PoolInner::new();
        pool.remove_outstanding(H256::random());
        pool.remove_processing(H256::random());
        pool.remove_submitted(H256::random());
        assert_eq!(pool.counts(), (0, 0, 0, 0));
    }

    #[test]
    fn test_clear_outstanding_leaves_available_unresolvable() {
        let mut pool = PoolInner::new();
        let op = create_op(Address::random(), 0);
        pool.add_outstanding(op.clone());
        pool.set_available(vec![op.hash]);

        pool.clear(PoolSet::Outstanding);
        assert!(pool.dump_outstanding().is_empty());
        // the stale hash stays until the next reconciliation but resolves to
        // nothing
        assert!(pool.dump_available().is_empty());
    }

    #[test]
    fn test_sets_are_independent() {
        let mut pool = PoolInner::new();
        let op = create_op(Address::random(), 0);
        pool.add_processing(op.clone());
        pool.clear(PoolSet::Outstanding);
        pool.clear(PoolSet::Submitted);
        assert_eq!(pool.dump_processing(), vec![op]);
    }
}
