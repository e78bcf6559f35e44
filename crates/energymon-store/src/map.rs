//! Replicated per-key map contract and the in-memory backing.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Change notification from a [`ReplicatedMap`].
///
/// Delivered after the mutation has committed. Listeners receive only the
/// key; they read the value back through the map if they need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEvent<K> {
    /// A key was inserted or overwritten.
    Put { key: K },
    /// A key was removed.
    Remove { key: K },
}

impl<K> MapEvent<K> {
    /// Returns the key this event is about.
    pub fn key(&self) -> &K {
        match self {
            MapEvent::Put { key } | MapEvent::Remove { key } => key,
        }
    }
}

/// Callback invoked after each committed mutation.
pub type MapListener<K> = Arc<dyn Fn(&MapEvent<K>) + Send + Sync>;

/// Per-key replicated map contract.
///
/// Implementations may be eventually consistent; callers must not assume
/// consistency across distinct maps. `get` returns a clone of the stored
/// value so no lock outlives the call.
pub trait ReplicatedMap<K, V>: Send + Sync {
    /// Returns the value for a key, if present.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or overwrites a key. Listeners observe a `Put` after the
    /// write commits.
    fn put(&self, key: K, value: V);

    /// Removes a key, returning the previous value if any. Listeners
    /// observe a `Remove` only when an entry actually existed.
    fn remove(&self, key: &K) -> Option<V>;

    /// Returns a snapshot of all keys.
    fn keys(&self) -> Vec<K>;

    /// Returns a snapshot of all entries.
    fn entries(&self) -> Vec<(K, V)>;

    /// Registers a change listener.
    fn add_listener(&self, listener: MapListener<K>);
}

/// Process-local [`ReplicatedMap`] backing.
///
/// Listeners run on the mutating thread after the write guard is
/// released; no lock is held across a callback.
pub struct InMemoryMap<K, V> {
    entries: RwLock<HashMap<K, V>>,
    listeners: RwLock<Vec<MapListener<K>>>,
}

impl<K, V> InMemoryMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<K, V> Default for InMemoryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryMap<K, V>
where
    K: Clone,
{
    fn notify(&self, event: MapEvent<K>) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(&event);
        }
    }
}

impl<K, V> ReplicatedMap<K, V> for InMemoryMap<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: K, value: V) {
        self.entries.write().insert(key.clone(), value);
        self.notify(MapEvent::Put { key });
    }

    fn remove(&self, key: &K) -> Option<V> {
        let previous = self.entries.write().remove(key);
        if previous.is_some() {
            self.notify(MapEvent::Remove { key: key.clone() });
        }
        previous
    }

    fn keys(&self) -> Vec<K> {
        self.entries.read().keys().cloned().collect()
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn add_listener(&self, listener: MapListener<K>) {
        self.listeners.write().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_put_remove() {
        let map: InMemoryMap<String, u32> = InMemoryMap::new();

        assert_eq!(map.get(&"a".to_string()), None);
        map.put("a".to_string(), 1);
        assert_eq!(map.get(&"a".to_string()), Some(1));

        map.put("a".to_string(), 2);
        assert_eq!(map.get(&"a".to_string()), Some(2));

        assert_eq!(map.remove(&"a".to_string()), Some(2));
        assert_eq!(map.get(&"a".to_string()), None);
    }

    #[test]
    fn test_listener_sees_put_and_remove() {
        let map: InMemoryMap<String, u32> = InMemoryMap::new();
        let seen: Arc<Mutex<Vec<MapEvent<String>>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        map.add_listener(Arc::new(move |event| sink.lock().push(event.clone())));

        map.put("x".to_string(), 1);
        map.remove(&"x".to_string());
        // Removing a missing key is silent.
        map.remove(&"x".to_string());

        let events = seen.lock();
        assert_eq!(
            *events,
            vec![
                MapEvent::Put {
                    key: "x".to_string()
                },
                MapEvent::Remove {
                    key: "x".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_entries_snapshot() {
        let map: InMemoryMap<u32, u32> = InMemoryMap::new();
        map.put(1, 10);
        map.put(2, 20);

        let mut entries = map.entries();
        entries.sort();
        assert_eq!(entries, vec![(1, 10), (2, 20)]);
    }
}
