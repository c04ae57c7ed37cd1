use timedtext_common::{StoreResult, Ttl};

use crate::{ShardedTimedText, TimedText};

/// Operações comuns às duas variantes do store.
pub trait TextStore: Send + Sync {
    fn create_or_append(&self, key: &str, text: &str) -> StoreResult<bool>;
    fn create_or_replace(&self, key: &str, text: &str) -> bool;
    fn get(&self, key: &str) -> Option<String>;
    fn len(&self) -> usize;
    fn ttl(&self) -> Ttl;
    fn pending_expirations(&self) -> usize;
    fn cancel_expirations(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! impl_text_store {
    ($ty:ty) => {
        impl TextStore for $ty {
            fn create_or_append(&self, key: &str, text: &str) -> StoreResult<bool> {
                <$ty>::create_or_append(self, key, text)
            }

            fn create_or_replace(&self, key: &str, text: &str) -> bool {
                <$ty>::create_or_replace(self, key, text)
            }

            fn get(&self, key: &str) -> Option<String> {
                <$ty>::get(self, key)
            }

            fn len(&self) -> usize {
                <$ty>::len(self)
            }

            fn ttl(&self) -> Ttl {
                <$ty>::ttl(self)
            }

            fn pending_expirations(&self) -> usize {
                <$ty>::pending_expirations(self)
            }

            fn cancel_expirations(&self) {
                <$ty>::cancel_expirations(self)
            }
        }
    };
}

impl_text_store!(TimedText);
impl_text_store!(ShardedTimedText);
