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

mod error;
pub use error::{MempoolError, MempoolResult};

mod pool;

mod uo_pool;
pub use uo_pool::UoPool;

use bindle_types::{SubmittedUserOperation, UserOperationInfo};
use ethers::types::{Address, H256};
use async_trait::async_trait;

/// In-memory user operation pool
#[async_trait]
pub trait Mempool: Send + Sync + 'static {
    /// Returns the entry point address this pool targets.
    fn entry_point(&self) -> Address;

    /// Admits a user operation. Callers are expected to have checked for
    /// duplicates; a second add of the same hash is logged and dropped.
    fn add_outstanding(&self, op: UserOperationInfo);

    /// Marks a user operation as chosen for a bundle.
    fn add_processing(&self, op: UserOperationInfo);

    /// Marks a user operation as broadcast in a transaction.
    fn add_submitted(&self, op: SubmittedUserOperation);

    /// Removes an operation from the outstanding set, and from the available
    /// view if present. A missing hash is logged, not an error.
    fn remove_outstanding(&self, hash: H256);

    /// Removes an operation from the processing set.
    fn remove_processing(&self, hash: H256);

    /// Removes an operation from the submitted set, matching on the wrapped
    /// user operation hash.
    fn remove_submitted(&self, hash: H256);

    /// Snapshot of the outstanding set in admission order.
    fn dump_outstanding(&self) -> Vec<UserOperationInfo>;

    /// Snapshot of the outstanding operations whose nonce is current on
    /// chain, in admission order.
    fn dump_available(&self) -> Vec<UserOperationInfo>;

    /// Snapshot of the processing set in admission order.
    fn dump_processing(&self) -> Vec<UserOperationInfo>;

    /// Snapshot of the submitted set in admission order.
    fn dump_submitted(&self) -> Vec<SubmittedUserOperation>;

    /// Drops every entry from the named set.
    fn clear(&self, set: PoolSet);

    /// Recomputes the available view by querying the entry point's current
    /// nonce for every pending `(sender, key)` pair.
    async fn update_available_operations(&self) -> MempoolResult<()>;
}

/// Config for the mempool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Address of the entry point this pool targets
    pub entry_point: Address,
}

/// The named operation sets of the mempool
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PoolSet {
    /// Admitted, not yet chosen for a bundle
    Outstanding,
    /// Chosen for a bundle, not yet broadcast
    Processing,
    /// Broadcast, awaiting inclusion or timeout
    Submitted,
}
