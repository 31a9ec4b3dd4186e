//! The storage capability the IBC module requires from its host chain: a namespaced
//! key-value store and a view of the current block height and time.

use crate::ics02_client::height::Height;
use crate::timestamp::Timestamp;

mod memory;

pub use memory::MemStore;

pub trait KvStore: Send + Sync {
    fn get(&self, namespace: &str, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&self, namespace: &str, key: Vec<u8>, value: Vec<u8>);

    fn delete(&self, namespace: &str, key: &[u8]);

    /// Height of the block currently being executed.
    fn current_height(&self) -> Height;

    /// Timestamp of the block currently being executed.
    fn current_timestamp(&self) -> Timestamp;
}
