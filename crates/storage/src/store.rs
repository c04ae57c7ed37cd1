use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::trace;

use timedtext_common::{StoreError, StoreResult, Ttl};

use crate::entry::Entry;
use crate::expiry::{ExpireTarget, Expirer};

/// Estado compartilhado entre todos os handles do store.
struct SharedState {
    entries: RwLock<HashMap<String, Entry>>,
    expirer: Expirer,
}

impl ExpireTarget for SharedState {
    fn expire(&self, key: &str, epoch: u64) -> bool {
        let mut entries = self.entries.write();
        // Só remove se a entrada ainda é a da criação que agendou o timer
        if entries.get(key).is_some_and(|e| e.epoch() == epoch) {
            entries.remove(key);
            true
        } else {
            false
        }
    }
}

/// Store de texto com TTL, protegido por um único `RwLock`.
///
/// O TTL conta a partir da criação da chave: `create_or_append` e
/// `create_or_replace` em chave existente não renovam o prazo.
/// Clonar o handle compartilha o mesmo store; quando o último handle é
/// destruído, as expirações pendentes são canceladas.
#[derive(Clone)]
pub struct TimedText {
    shared: Arc<SharedState>,
}

impl TimedText {
    /// Cria um store vazio.
    ///
    /// # Panics
    ///
    /// Com `Ttl::Fixed`, entra em pânico se chamado fora de um runtime Tokio.
    /// Use [`TimedText::try_new`] ou [`TimedText::with_handle`] para evitar.
    pub fn new(ttl: Ttl) -> Self {
        match Self::try_new(ttl) {
            Ok(store) => store,
            Err(e) => panic!("TimedText::new: {e}"),
        }
    }

    /// Como [`TimedText::new`], mas retorna `StoreError::NoRuntime` em vez de
    /// entrar em pânico.
    pub fn try_new(ttl: Ttl) -> StoreResult<Self> {
        let handle = Handle::try_current().ok();
        if ttl.is_fixed() && handle.is_none() {
            return Err(StoreError::NoRuntime);
        }
        Ok(Self::build(ttl, handle))
    }

    /// Cria um store cujos timers rodam no runtime de `handle`. Permite
    /// escrever a partir de threads que não pertencem ao runtime.
    pub fn with_handle(ttl: Ttl, handle: Handle) -> Self {
        Self::build(ttl, Some(handle))
    }

    fn build(ttl: Ttl, handle: Option<Handle>) -> Self {
        TimedText {
            shared: Arc::new(SharedState {
                entries: RwLock::new(HashMap::new()),
                expirer: Expirer::new(ttl, handle),
            }),
        }
    }

    /// Cria a chave com `text` se não existir; senão concatena `text` ao
    /// valor atual. Retorna `true` se a chave foi criada.
    pub fn create_or_append(&self, key: &str, text: &str) -> StoreResult<bool> {
        let mut entries = self.shared.entries.write();

        if let Some(entry) = entries.get_mut(key) {
            entry.append(text)?;
            return Ok(false);
        }

        let epoch = self.shared.expirer.next_epoch();
        entries.insert(key.to_string(), Entry::new(text.to_string(), epoch));
        drop(entries);

        self.schedule_expiry(key, epoch);
        Ok(true)
    }

    /// Cria a chave com `text` se não existir; senão substitui o valor.
    /// Retorna `true` se a chave foi criada.
    pub fn create_or_replace(&self, key: &str, text: &str) -> bool {
        let buffer = text.to_string();
        let mut entries = self.shared.entries.write();

        if let Some(entry) = entries.get_mut(key) {
            entry.replace(buffer);
            return false;
        }

        let epoch = self.shared.expirer.next_epoch();
        entries.insert(key.to_string(), Entry::new(buffer, epoch));
        drop(entries);

        self.schedule_expiry(key, epoch);
        true
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.shared.entries.read();
        entries.get(key).map(|e| e.text().to_string())
    }

    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.read().is_empty()
    }

    pub fn ttl(&self) -> Ttl {
        self.shared.expirer.ttl()
    }

    /// Número de timers de expiração que ainda não terminaram. Logo após
    /// `cancel_expirations` pode incluir timers cancelados que ainda não saíram.
    pub fn pending_expirations(&self) -> usize {
        self.shared.expirer.pending()
    }

    /// Cancela todos os timers armados; as chaves atuais deixam de expirar.
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
