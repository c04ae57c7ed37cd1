use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tokio::runtime::Handle;
use tracing::trace;

use timedtext_common::{DEFAULT_SHARD_AMOUNT, StoreError, StoreResult, Ttl};

use crate::entry::Entry;
use crate::expiry::{ExpireTarget, Expirer};

struct SharedState {
    entries: DashMap<String, Entry>,
    expirer: Expirer,
}

impl ExpireTarget for SharedState {
    fn expire(&self, key: &str, epoch: u64) -> bool {
        self.entries
            .remove_if(key, |_, e| e.epoch() == epoch)
            .is_some()
    }
}

/// Variante do [`TimedText`](crate::TimedText) com o mapa particionado por
/// hash da chave (`DashMap`). Escritas em chaves de shards diferentes não
/// disputam o mesmo lock; a semântica de criação, append, replace e
/// expiração é a mesma.
#[derive(Clone)]
pub struct ShardedTimedText {
    shared: Arc<SharedState>,
}

impl ShardedTimedText {
    /// # Panics
    ///
    /// Com `Ttl::Fixed`, entra em pânico se chamado fora de um runtime Tokio.
    pub fn new(ttl: Ttl) -> Self {
        match Self::try_new(ttl) {
            Ok(store) => store,
            Err(e) => panic!("ShardedTimedText::new: {e}"),
        }
    }

    pub fn try_new(ttl: Ttl) -> StoreResult<Self> {
        let handle = Handle::try_current().ok();
        if ttl.is_fixed() && handle.is_none() {
            return Err(StoreError::NoRuntime);
        }
        Ok(Self::build(ttl, handle))
    }

    pub fn with_handle(ttl: Ttl, handle: Handle) -> Self {
        Self::build(ttl, Some(handle))
    }

    fn build(ttl: Ttl, handle: Option<Handle>) -> Self {
        ShardedTimedText {
            shared: Arc::new(SharedState {
                entries: DashMap::with_shard_amount(DEFAULT_SHARD_AMOUNT),
                expirer: Expirer::new(ttl, handle),
            }),
        }
    }

    pub fn create_or_append(&self, key: &str, text: &str) -> StoreResult<bool> {
        // Entry API do DashMap: o shard fica travado entre o teste e a escrita
        let epoch = match self.shared.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                occupied.get_mut().append(text)?;
                return Ok(false);
            }
            MapEntry::Vacant(vacant) => {
                let epoch = self.shared.expirer.next_epoch();
                vacant.insert(Entry::new(text.to_string(), epoch));
                epoch
            }
        };

        self.schedule_expiry(key, epoch);
        Ok(true)
    }

    pub fn create_or_replace(&self, key: &str, text: &str) -> bool {
        let buffer = text.to_string();
        let epoch = match self.shared.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                occupied.get_mut().replace(buffer);
                return false;
            }
            MapEntry::Vacant(vacant) => {
                let epoch = self.shared.expirer.next_epoch();
                vacant.insert(Entry::new(buffer, epoch));
                epoch
            }
        };

        self.schedule_expiry(key, epoch);
        true
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.shared
            .entries
            .get(key)
            .map(|e| e.text().to_string())
    }

    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.is_empty()
    }

    pub fn ttl(&self) -> Ttl {
        self.shared.expirer.ttl()
    }

    /// Inclui timers cancelados que ainda não saíram, como em `TimedText`.
    pub fn pending_expirations(&self) -> usize {
        self.shared.expirer.pending()
    }

    pub fn cancel_expirations(&self) {
        self.shared.expirer.cancel_all();
    }

    fn schedule_expiry(&self, key: &str, epoch: u64) {
        trace!("chave criada: {key} (epoch {epoch})");
        self.shared
            .expirer
            .schedule(Arc::downgrade(&self.shared), key.to_string(), epoch);
    }
}
