//! Read-only graph queries over `parent_id` chains.

use crate::document::{Document, Slot};
use crate::id::ItemId;
use crate::item::{ComponentItem, GroupItem, ItemRef};
use crate::policy::DocumentPolicy;
use std::collections::{HashMap, HashSet, VecDeque};

/// How two items relate in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    None,
    Sibling,
    /// The second item is an ancestor of the first
    Ascending,
    /// The second item is a descendant of the first
    Descending,
}

/// Parent constraint for [`Document::collect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    Any,
    Is(Option<ItemId>),
}

impl<P: DocumentPolicy> Document<P> {
    pub fn find(&self, id: ItemId) -> Option<ItemRef<'_>> {
        match self.slot(id)? {
            Slot::Component(index) => self.components.get(index).map(ItemRef::Component),
            Slot::Group(index) => self.groups.get(index).map(ItemRef::Group),
        }
    }

    pub fn find_component(&self, id: ItemId) -> Option<&ComponentItem> {
        match self.slot(id)? {
            Slot::Component(index) => self.components.get(index),
            Slot::Group(_) => None,
        }
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.find(id).is_some()
    }

    /// Every item the document surfaces: components, then groups
    pub fn items(&self) -> impl Iterator<Item = ItemRef<'_>> {
        let groups: &[GroupItem] = if P::surfaces_groups() { &self.groups } else { &[] };
        self.components
            .iter()
            .map(ItemRef::Component)
            .chain(groups.iter().map(ItemRef::Group))
    }

    pub fn collect<F>(&self, filter: ParentFilter, mut predicate: F) -> Vec<ItemRef<'_>>
    where
        F: FnMut(&ItemRef<'_>) -> bool,
    {
        self.items()
            .filter(|item| match filter {
                ParentFilter::Any => true,
                ParentFilter::Is(parent) => item.parent_id() == parent,
            })
            .filter(|item| predicate(item))
            .collect()
    }

    /// Direct children of `parent` (`None` for top-level items)
    pub fn children(&self, parent: Option<ItemId>) -> Vec<ItemRef<'_>> {
        self.collect(ParentFilter::Is(parent), |_| true)
    }

    pub(crate) fn child_ids(&self, parent: Option<ItemId>) -> Vec<ItemId> {
        self.children(parent).iter().map(|item| item.id()).collect()
    }

    /// Every item below `id`, breadth first
    pub fn descendants(&self, id: ItemId) -> Vec<ItemId> {
        // One pass over the arenas, then a walk over the adjacency
        let mut children: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
        for item in self.items() {
            if let Some(parent) = item.parent_id() {
                children.entry(parent).or_default().push(item.id());
            }
        }

        let mut found = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut frontier = VecDeque::from([id]);
        while let Some(current) = frontier.pop_front() {
            for child in children.get(&current).into_iter().flatten() {
                if seen.insert(*child) {
                    found.push(*child);
                    frontier.push_back(*child);
                }
            }
        }
        found
    }

    /// Parent chain of `id`, nearest first
    pub fn ancestors(&self, id: ItemId) -> Vec<ItemId> {
        let mut chain = Vec::new();
        let mut cursor = self.find(id).and_then(|item| item.parent_id());
        while let Some(parent) = cursor {
            // A cycle would otherwise never end
            if chain.contains(&parent) || parent == id {
                break;
            }
            chain.push(parent);
            cursor = self.find(parent).and_then(|item| item.parent_id());
        }
        chain
    }

    /// Whether `second` lies below `first`
    pub fn is_descending(&self, first: ItemId, second: ItemId) -> bool {
        self.ancestors(second).contains(&first)
    }

    pub fn are_siblings(&self, a: ItemId, b: ItemId) -> bool {
        match (self.find(a), self.find(b)) {
            (Some(a), Some(b)) => a.id() != b.id() && a.parent_id() == b.parent_id(),
            _ => false,
        }
    }

    pub fn relationship(&self, a: ItemId, b: ItemId) -> Relationship {
        if a == b || !self.contains(a) || !self.contains(b) {
            Relationship::None
        } else if self.are_siblings(a, b) {
            Relationship::Sibling
        } else if self.is_descending(a, b) {
            Relationship::Descending
        } else if self.is_descending(b, a) {
            Relationship::Ascending
        } else {
            Relationship::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Grouped;
    use crate::registry::TypeRegistry;
    use std::sync::Arc;

    struct Tree {
        doc: Document<Grouped>,
        root: ItemId,
        left: ItemId,
        right: ItemId,
        leaf: ItemId,
    }

    fn tree() -> Tree {
        let mut doc = Document::new(Arc::new(TypeRegistry::builtin()));
        let root = doc.create_component("Widget").unwrap();
        let left = doc.create_component_in("Widget", Some(root)).unwrap();
        let right = doc.create_component_in("Light", Some(root)).unwrap();
        let leaf = doc.create_component_in("Widget", Some(left)).unwrap();
        Tree {
            doc,
            root,
            left,
            right,
            leaf,
        }
    }

    #[test]
    fn test_children_and_descendants() {
        let t = tree();
        let children: Vec<_> = t.doc.children(Some(t.root)).iter().map(|i| i.id()).collect();
        assert_eq!(children, vec![t.left, t.right]);
        assert_eq!(t.doc.descendants(t.root), vec![t.left, t.right, t.leaf]);
        assert_eq!(t.doc.ancestors(t.leaf), vec![t.left, t.root]);
        assert_eq!(t.doc.children(None).len(), 1);
    }

    #[test]
    fn test_relationships() {
        let t = tree();
        assert_eq!(t.doc.relationship(t.left, t.right), Relationship::Sibling);
        assert_eq!(t.doc.relationship(t.root, t.leaf), Relationship::Descending);
        assert_eq!(t.doc.relationship(t.leaf, t.root), Relationship::Ascending);
        assert_eq!(t.doc.relationship(t.right, t.leaf), Relationship::None);
        assert_eq!(t.doc.relationship(t.root, t.root), Relationship::None);

        assert!(t.doc.is_descending(t.root, t.leaf));
        assert!(!t.doc.is_descending(t.leaf, t.root));
        assert!(t.doc.are_siblings(t.left, t.right));
        assert!(!t.doc.are_siblings(t.left, t.left));
    }

    #[test]
    fn test_collect_with_predicate() {
        let t = tree();
        let widgets = t.doc.collect(ParentFilter::Any, |item| item.item_type() == "Widget");
        assert_eq!(widgets.len(), 3);

        let lights = t
            .doc
            .collect(ParentFilter::Is(Some(t.root)), |item| item.item_type() == "Light");
        assert_eq!(lights.iter().map(|i| i.id()).collect::<Vec<_>>(), vec![t.right]);
    }
}
