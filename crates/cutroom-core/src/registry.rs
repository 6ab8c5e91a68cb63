use std::{collections::HashMap, hash::Hash};

/// Insertion-ordered collection indexed by entity id.
///
/// Lookups go through the hash index; iteration follows insertion order so
/// selectors and snapshots are stable across runs.
#[derive(Debug, Clone)]
pub struct Registry<K, V> {
    order: Vec<K>,
    entries: HashMap<K, V>,
}

impl<K, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<K, V> Registry<K, V>
where
    K: Copy + Eq + Hash,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`. Replacing an existing key keeps its
    /// original position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self.entries.insert(key, value);
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    /// Inserts `value` only when `key` is free. Returns `false` and leaves
    /// the existing entry untouched otherwise.
    #[must_use]
    pub fn insert_new(&mut self, key: K, value: V) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, value);
        self.order.push(key);
        true
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.entries.remove(key)?;
        self.order.retain(|existing| existing != key);
        Some(value)
    }

    /// Removes every entry matching `remove`, returned in insertion order.
    pub fn drain_where(&mut self, mut remove: impl FnMut(&V) -> bool) -> Vec<(K, V)> {
        let doomed: Vec<K> = self
            .order
            .iter()
            .filter(|key| self.entries.get(*key).is_some_and(&mut remove))
            .copied()
            .collect();

        doomed
            .into_iter()
            .filter_map(|key| self.remove(&key).map(|value| (key, value)))
            .collect()
    }

    /// Moves `key` to position `to` in iteration order.
    pub fn move_to(&mut self, key: &K, to: usize) -> bool {
        let Some(from) = self.order.iter().position(|existing| existing == key) else {
            return false;
        };
        if to >= self.order.len() {
            return false;
        }
        let key = self.order.remove(from);
        self.order.insert(to, key);
        true
    }

    #[must_use]
    pub fn position(&self, key: &K) -> Option<usize> {
        self.order.iter().position(|existing| existing == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).map(|value| (key, value)))
    }
}
