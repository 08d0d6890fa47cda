// Memoization cache - Single-flight, keyed aggregate cache
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CachePolicy {
    /// Entries older than this are recomputed on the next request
    pub ttl: Option<Duration>,
    /// Oldest computed entry is evicted once this many keys are held
    pub max_entries: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    pub from_cache: bool,
}

struct Stored<V> {
    value: V,
    computed_at: Instant,
}

type Slot<V> = Arc<OnceCell<Stored<V>>>;

/// Values are computed at most once per key and handed out as clones, so a
/// caller mutating its copy never touches the stored value.
///
/// Concurrent requests for a key share one in-flight computation. A failed or
/// cancelled computation leaves the key empty and the next waiter retries.
pub struct AggregateCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    policy: CachePolicy,
}

impl<K, V> AggregateCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            policy,
        }
    }

    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<Cached<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(&key);
        let computed = AtomicBool::new(false);
        let flag = &computed;

        let stored = slot
            .get_or_try_init(move || async move {
                flag.store(true, Ordering::Relaxed);
                let value = compute().await?;
                Ok::<_, E>(Stored {
                    value,
                    computed_at: Instant::now(),
                })
            })
            .await?;

        let from_cache = !computed.load(Ordering::Relaxed);
        if from_cache {
            tracing::debug!("Cache hit for {:?}", key);
        } else {
            tracing::debug!("Cached {:?} ({} entries)", key, self.len());
        }

        Ok(Cached {
            value: stored.value.clone(),
            from_cache,
        })
    }

    /// Number of keys holding a computed value
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.initialized()).count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.lock();

        if let Some(slot) = slots.get(key) {
            let expired = match (self.policy.ttl, slot.get()) {
                (Some(ttl), Some(stored)) => stored.computed_at.elapsed() >= ttl,
                _ => false,
            };
            if !expired {
                return slot.clone();
            }
            tracing::debug!("Cache entry for {:?} expired", key);
            slots.remove(key);
        }

        if let Some(max_entries) = self.policy.max_entries {
            while slots.len() >= max_entries.max(1) {
                if !Self::evict_oldest(&mut slots) {
                    break;
                }
            }
        }

        let slot = Slot::default();
        slots.insert(key.clone(), slot.clone());
        slot
    }

    /// Drops the failed slot or the oldest computed entry. In-flight slots are kept.
    fn evict_oldest(slots: &mut HashMap<K, Slot<V>>) -> bool {
        let victim = slots
            .iter()
            .filter(|(_, slot)| Arc::strong_count(slot) == 1 && !slot.initialized())
            .map(|(key, _)| key.clone())
            .next()
            .or_else(|| {
                slots
                    .iter()
                    .filter_map(|(key, slot)| slot.get().map(|stored| (key, stored.computed_at)))
                    .min_by_key(|(_, computed_at)| *computed_at)
                    .map(|(key, _)| key.clone())
            });

        match victim {
            Some(key) => {
                tracing::debug!("Evicting cache entry for {:?}", key);
                slots.remove(&key);
                true
            }
            None => false,
        }
    }
}
