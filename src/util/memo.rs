//! A small concurrent memoizing map.
//!
//! The value constructor runs outside the lock, so two threads racing on the
//! same key may both construct; the first insert wins and later results for
//! that key are discarded. Callers that care (the price clients) deduplicate
//! keys before fanning out.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

pub(crate) struct Memo<K, V, F> {
    inner: RwLock<HashMap<K, V>>,
    create: F,
}

impl<K, V, F> Memo<K, V, F>
where
    K: Clone + Eq + Hash,
    V: Clone,
    F: Fn(&K) -> V,
{
    pub(crate) fn new(create: F) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            create,
        }
    }

    /// Get a value by key, constructing it on first access.
    pub(crate) fn get(&self, key: &K) -> V {
        if let Some(value) = self.inner.read().get(key) {
            return value.clone();
        }

        let value = (self.create)(key);

        self.inner
            .write()
            .entry(key.clone())
            .or_insert(value)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    #[test]
    fn test_constructor_runs_once_per_key() {
        let counter = AtomicU8::new(0);
        let memo = Memo::new(|key: &u8| {
            counter.fetch_add(1, Ordering::Relaxed);
            *key + 1
        });

        assert_eq!(memo.get(&3), 4);
        assert_eq!(memo.get(&3), 4);
        assert_eq!(counter.load(Ordering::Relaxed), 1);

        assert_eq!(memo.get(&12), 13);
        assert_eq!(memo.get(&3), 4);
        assert_eq!(counter.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_concurrent_gets_agree() {
        let memo = Memo::new(|key: &u32| key.to_string());

        rayon::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|_| {
                    assert_eq!(memo.get(&7), "7");
                });
            }
        });
    }
}
