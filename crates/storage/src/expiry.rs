use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use timedtext_common::Ttl;

/// Store que sabe remover uma chave criada num epoch específico.
pub(crate) trait ExpireTarget: Send + Sync + 'static {
    /// Remove `key` se a entrada atual ainda for a do `epoch`.
    /// Retorna `true` se removeu.
    fn expire(&self, key: &str, epoch: u64) -> bool;
}

/// Registro das tasks de expiração de um store.
///
/// Cada criação de chave ganha um epoch novo e exatamente uma task, que dorme
/// pelo TTL e depois pede ao store para remover a chave daquele epoch.
/// As tasks ficam no `TaskTracker` e compartilham um `CancellationToken`,
/// cancelado em `cancel_all` e quando o `Expirer` é destruído.
pub(crate) struct Expirer {
    ttl: Ttl,
    handle: Option<Handle>,
    epoch: AtomicU64,
    tracker: TaskTracker,
    cancel: Mutex<CancellationToken>,
}

impl Expirer {
    /// `handle` só é usado com `Ttl::Fixed`; quem constrói garante que existe.
    pub fn new(ttl: Ttl, handle: Option<Handle>) -> Self {
        Self {
            ttl,
            handle,
            epoch: AtomicU64::new(0),
            tracker: TaskTracker::new(),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Próximo epoch de criação (começa em 1, estritamente crescente).
    pub fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Agenda a remoção de `key`/`epoch` após o TTL. Sem TTL, não faz nada.
    pub fn schedule<T: ExpireTarget>(&self, target: Weak<T>, key: String, epoch: u64) {
        let (Some(ttl), Some(handle)) = (self.ttl.duration(), self.handle.as_ref()) else {
            return;
        };

        // Prazo calculado no agendamento. `None` quando o TTL estoura o
        // relógio; nesse caso `sleep` limita ao "futuro distante" do Tokio.
        let deadline = Instant::now().checked_add(ttl);
        let cancel = self.cancel.lock().clone();

        self.tracker.spawn_on(
            async move {
                let sleep = match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline),
                    None => tokio::time::sleep(ttl),
                };
                tokio::select! {
                    _ = sleep => {}
                    _ = cancel.cancelled() => { return; }
                }

                let Some(target) = target.upgrade() else {
                    return;
                };
                if target.expire(&key, epoch) {
                    debug!("chave expirada removida: {key} (epoch {epoch})");
                } else {
                    debug!("timer obsoleto ignorado: {key} (epoch {epoch})");
                }
            },
            handle,
        );
    }

    /// Número de tasks de expiração que ainda não terminaram. Inclui tasks já
    /// canceladas que ainda não rodaram para sair.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Cancela todas as expirações pendentes. Criações futuras voltam a
    /// agendar normalmente.
    pub fn cancel_all(&self) {
        let old = std::mem::replace(&mut *self.cancel.lock(), CancellationToken::new());
        old.cancel();
        debug!("expirações pendentes canceladas: {}", self.tracker.len());
    }
}

impl Drop for Expirer {
    fn drop(&mut self) {
        self.cancel.get_mut().cancel();
        self.tracker.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Duration;

    #[derive(Default)]
    struct Recorder {
        expired: Mutex<Vec<(String, u64)>>,
    }

    impl ExpireTarget for Recorder {
        fn expire(&self, key: &str, epoch: u64) -> bool {
            self.expired.lock().push((key.to_string(), epoch));
            true
        }
    }

    fn expirer(ms: u64) -> Expirer {
        Expirer::new(Ttl::from_millis(ms), Some(Handle::current()))
    }

    #[tokio::test]
    async fn epochs_are_increasing() {
        let exp = Expirer::new(Ttl::None, None);
        let a = exp.next_epoch();
        let b = exp.next_epoch();
        assert_eq!(a, 1);
        assert!(b > a);
    }

    #[tokio::test]
    async fn fires_after_ttl() {
        let exp = expirer(30);
        let target = Arc::new(Recorder::default());
        exp.schedule(Arc::downgrade(&target), "key".into(), 1);
        assert_eq!(exp.pending(), 1);
        assert!(target.expired.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*target.expired.lock(), vec![("key".to_string(), 1)]);
        assert_eq!(exp.pending(), 0);
    }

    #[tokio::test]
    async fn no_ttl_schedules_nothing() {
        let exp = Expirer::new(Ttl::None, Some(Handle::current()));
        let target = Arc::new(Recorder::default());
        exp.schedule(Arc::downgrade(&target), "key".into(), 1);
        assert_eq!(exp.pending(), 0);
    }

    #[tokio::test]
    async fn cancel_all_stops_pending_tasks() {
        let exp = expirer(50);
        let target = Arc::new(Recorder::default());
        exp.schedule(Arc::downgrade(&target), "a".into(), 1);
        exp.schedule(Arc::downgrade(&target), "b".into(), 2);
        assert_eq!(exp.pending(), 2);

        exp.cancel_all();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(target.expired.lock().is_empty());
        assert_eq!(exp.pending(), 0);

        // Depois do cancelamento, novas criações expiram normalmente
        exp.schedule(Arc::downgrade(&target), "c".into(), 3);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(*target.expired.lock(), vec![("c".to_string(), 3)]);
    }

    #[tokio::test]
    async fn huge_ttl_does_not_overflow() {
        let exp = Expirer::new(
            Ttl::Fixed(Duration::from_secs(u64::MAX)),
            Some(Handle::current()),
        );
        let target = Arc::new(Recorder::default());
        exp.schedule(Arc::downgrade(&target), "key".into(), 1);
        assert_eq!(exp.pending(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(target.expired.lock().is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_fires_immediately() {
        let exp = Expirer::new(Ttl::Fixed(Duration::ZERO), Some(Handle::current()));
        let target = Arc::new(Recorder::default());
        exp.schedule(Arc::downgrade(&target), "key".into(), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(*target.expired.lock(), vec![("key".to_string(), 1)]);
    }

    #[tokio::test]
    async fn drop_cancels_pending_tasks() {
        let exp = expirer(30);
        let target = Arc::new(Recorder::default());
        exp.schedule(Arc::downgrade(&target), "key".into(), 1);
        drop(exp);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(target.expired.lock().is_empty());
    }

    #[tokio::test]
    async fn dropped_target_is_ignored() {
        let exp = expirer(20);
        let target = Arc::new(Recorder::default());
        exp.schedule(Arc::downgrade(&target), "key".into(), 1);
        drop(target);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(exp.pending(), 0);
    }
}
