#![forbid(unsafe_code)]

mod entry;
mod expiry;
mod sharded;
mod store;
mod text_store;

pub use sharded::ShardedTimedText;
pub use store::TimedText;
pub use text_store::TextStore;
pub use timedtext_common::{StoreError, StoreResult, Ttl};
