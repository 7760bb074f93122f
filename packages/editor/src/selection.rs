//! # Selection
//!
//! Ordered, duplicate-free list of selected keys (item ids by default).
//!
//! Every mutating call raises at most one [`SelectionEvent::Changed`]
//! carrying the selection as it was before the call, and only when the
//! membership or order actually changed. Single-key and range methods are
//! separate so a collection can never be mistaken for one key.
//!
//! Events queue inside the selection until the owner drains them.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent<K> {
    Changed {
        old_selection: Vec<K>,
    },
    PropertyChanged {
        target: K,
        property: String,
        old_value: Value,
    },
}

#[derive(Debug, Clone)]
pub struct Selection<K = crate::ItemId> {
    members: Vec<K>,
    events: Vec<SelectionEvent<K>>,
}

impl<K: Clone + PartialEq> Selection<K> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Replace the selection with `key`
    pub fn set(&mut self, key: K) {
        self.set_range(std::iter::once(key));
    }

    /// Replace the selection with `keys`, dropping duplicates
    pub fn set_range(&mut self, keys: impl IntoIterator<Item = K>) {
        let mut next = Vec::new();
        for key in keys {
            if !next.contains(&key) {
                next.push(key);
            }
        }
        self.commit(next);
    }

    pub fn add(&mut self, key: K) {
        self.add_range(std::iter::once(key));
    }

    pub fn add_range(&mut self, keys: impl IntoIterator<Item = K>) {
        let mut next = self.members.clone();
        for key in keys {
            if !next.contains(&key) {
                next.push(key);
            }
        }
        self.commit(next);
    }

    pub fn remove(&mut self, key: &K) {
        self.remove_range(std::slice::from_ref(key));
    }

    pub fn remove_range<'a>(&mut self, keys: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        let mut next = self.members.clone();
        for key in keys {
            next.retain(|member| member != key);
        }
        self.commit(next);
    }

    pub fn clear(&mut self) {
        self.commit(Vec::new());
    }

    /// Keep only members matching `keep`, as one change
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        let next = self.members.iter().filter(|k| keep(k)).cloned().collect();
        self.commit(next);
    }

    fn commit(&mut self, next: Vec<K>) {
        if next == self.members {
            return;
        }
        let old_selection = std::mem::replace(&mut self.members, next);
        self.events.push(SelectionEvent::Changed { old_selection });
    }

    pub fn contains(&self, key: &K) -> bool {
        self.members.contains(key)
    }

    pub fn first(&self) -> Option<&K> {
        self.members.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.members.iter()
    }

    pub fn as_slice(&self) -> &[K] {
        &self.members
    }

    pub fn snapshot(&self) -> Vec<K> {
        self.members.clone()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Re-raise a property change of `key` while it is selected.
    /// Returns whether an event was queued.
    pub fn observe(&mut self, key: &K, property: &str, old_value: &Value) -> bool {
        if !self.contains(key) {
            return false;
        }
        self.events.push(SelectionEvent::PropertyChanged {
            target: key.clone(),
            property: property.to_string(),
            old_value: old_value.clone(),
        });
        true
    }

    pub fn drain_events(&mut self) -> Vec<SelectionEvent<K>> {
        std::mem::take(&mut self.events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }
}

impl<K: Clone + PartialEq> Default for Selection<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(old: &[&'static str]) -> SelectionEvent<&'static str> {
        SelectionEvent::Changed {
            old_selection: old.to_vec(),
        }
    }

    #[test]
    fn test_set_raises_one_event_per_call() {
        let mut selection = Selection::new();
        selection.set("a");
        selection.set("b");

        assert_eq!(selection.drain_events(), vec![changed(&[]), changed(&["a"])]);
        assert_eq!(selection.snapshot(), vec!["b"]);
    }

    #[test]
    fn test_unchanged_selection_is_silent() {
        let mut selection = Selection::new();
        selection.set_range(["a", "b"]);
        selection.drain_events();

        selection.set_range(["a", "b", "a"]);
        selection.add("b");
        selection.remove(&"z");
        assert!(selection.drain_events().is_empty());
    }

    #[test]
    fn test_reorder_counts_as_change() {
        let mut selection = Selection::new();
        selection.set_range(["a", "b"]);
        selection.drain_events();

        selection.set_range(["b", "a"]);
        assert_eq!(selection.drain_events(), vec![changed(&["a", "b"])]);
    }

    #[test]
    fn test_incremental_operations() {
        let mut selection = Selection::new();
        selection.add_range(["a", "b", "c"]);
        selection.remove_range(&["a", "c"]);
        selection.add("d");
        selection.clear();

        assert_eq!(
            selection.drain_events(),
            vec![changed(&[]), changed(&["a", "b", "c"]), changed(&["b"]), changed(&["b", "d"])]
        );
        assert!(selection.is_empty());
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let mut selection = Selection::new();
        selection.add_range(["a", "a", "b"]);
        selection.add("a");
        assert_eq!(selection.as_slice(), &["a", "b"]);
        assert_eq!(selection.first(), Some(&"a"));
    }

    #[test]
    fn test_observe_only_members() {
        let mut selection = Selection::new();
        selection.set("a");
        selection.drain_events();

        assert!(selection.observe(&"a", "name", &Value::from("Old")));
        assert!(!selection.observe(&"b", "name", &Value::from("Old")));
        assert_eq!(
            selection.drain_events(),
            vec![SelectionEvent::PropertyChanged {
                target: "a",
                property: "name".to_string(),
                old_value: Value::from("Old"),
            }]
        );
    }

    #[test]
    fn test_retain() {
        let mut selection = Selection::new();
        selection.set_range([1, 2, 3, 4]);
        selection.drain_events();
        selection.retain(|k| k % 2 == 0);
        assert_eq!(selection.snapshot(), vec![2, 4]);
        assert_eq!(selection.drain_events().len(), 1);
    }
}
