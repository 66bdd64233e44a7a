use std::{
    collections::{
        hash_map::Entry,
        HashMap,
        HashSet,
    },
    hash::Hash,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A slot holding the value for one key.
/// The slot lock is held while the value gets created, which serializes
/// concurrent allocations of the same key without blocking other keys.
struct IdentitySlot<V> {
    value: Mutex<Option<Arc<V>>>,
}

/// Cache mapping a key to exactly one long living value.
///
/// Values are created at most once per key. Concurrent callers requesting
/// the same key wait for the first allocation and receive the same instance.
/// A failed allocation leaves no entry behind.
pub struct IdentityCache<K, V> {
    slots: Mutex<HashMap<K, Arc<IdentitySlot<V>>>>,
    allocations: AtomicUsize,
}

impl<K: Hash + Eq + Clone, V> Default for IdentityCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone, V> IdentityCache<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
            allocations: AtomicUsize::new(0),
        }
    }

    /// Return the value for `key`, creating it with `factory` if not present.
    pub fn get_or_allocate<E>(
        &self,
        key: K,
        factory: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        let slot = {
            let mut slots = lock(&self.slots);
            match slots.entry(key.clone()) {
                Entry::Occupied(entry) => entry.get().clone(),
                Entry::Vacant(entry) => entry
                    .insert(Arc::new(IdentitySlot {
                        value: Mutex::new(None),
                    }))
                    .clone(),
            }
        };

        let mut value = lock(&slot.value);
        if let Some(value) = value.as_ref() {
            return Ok(value.clone());
        }

        match factory(&key) {
            Ok(instance) => {
                let instance = Arc::new(instance);
                *value = Some(instance.clone());
                self.allocations.fetch_add(1, Ordering::Relaxed);
                Ok(instance)
            }
            Err(err) => {
                drop(value);

                /* Only remove the slot if it has not been replaced (e.g. by a clear) */
                let mut slots = lock(&self.slots);
                if let Entry::Occupied(entry) = slots.entry(key) {
                    let unused = matches!(slot.value.try_lock(), Ok(value) if value.is_none());
                    if Arc::ptr_eq(entry.get(), &slot) && unused {
                        entry.remove();
                    }
                }

                Err(err)
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let slot = lock(&self.slots).get(key).cloned()?;
        let value = lock(&slot.value).clone();
        value
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Snapshot of all allocated values
    pub fn values(&self) -> Vec<Arc<V>> {
        let slots = lock(&self.slots)
            .values()
            .cloned()
            .collect::<Vec<_>>();

        slots
            .into_iter()
            .filter_map(|slot| lock(&slot.value).clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total amount of successful allocations since creation
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Drop all values.
    pub fn clear(&self) {
        let mut slots = lock(&self.slots);
        log::debug!("Clearing identity cache with {} entries", slots.len());
        slots.clear();
    }
}

/// A small set where every operation runs within one critical section.
#[derive(Debug)]
pub struct LockedSet<T> {
    inner: Mutex<HashSet<T>>,
}

impl<T: Hash + Eq + Clone> Default for LockedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> LockedSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Default::default(),
        }
    }

    /// Returns true if the value has not been present
    pub fn insert(&self, value: T) -> bool {
        lock(&self.inner).insert(value)
    }

    /// Returns true if the value has been present
    pub fn remove(&self, value: &T) -> bool {
        lock(&self.inner).remove(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        lock(&self.inner).contains(value)
    }

    /// Insert the value if absent, remove it otherwise.
    /// Returns whether the value is contained afterwards.
    pub fn toggle(&self, value: T) -> bool {
        let mut inner = lock(&self.inner);
        if inner.remove(&value) {
            false
        } else {
            inner.insert(value);
            true
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }

    pub fn snapshot(&self) -> Vec<T> {
        lock(&self.inner).iter().cloned().collect()
    }

    pub fn clear(&self) {
        lock(&self.inner).clear();
    }
}
