#![forbid(unsafe_code)]

mod error;
mod ttl;

pub use error::*;
pub use ttl::Ttl;

/// TTL usado pela CLI quando `--ttl` não é informado.
pub const DEFAULT_TTL: &str = "none";
/// Número de shards do `ShardedTimedText` (potência de 2, exigência do DashMap).
pub const DEFAULT_SHARD_AMOUNT: usize = 16;
