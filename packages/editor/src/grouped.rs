//! Group operations, available on `Document<Grouped>` only.

use crate::document::{DeleteCheck, Document, Parentage, Slot};
use crate::errors::{DocumentError, DocumentResult};
use crate::id::ItemId;
use crate::item::{GroupItem, ItemRef};
use crate::policy::{CreationStyle, Grouped};
use tracing::debug;

impl Document<Grouped> {
    pub fn groups(&self) -> &[GroupItem] {
        &self.groups
    }

    pub fn find_group(&self, id: ItemId) -> Option<&GroupItem> {
        match self.slot(id)? {
            Slot::Group(index) => self.groups.get(index),
            Slot::Component(_) => None,
        }
    }

    /// Nearest group at or above `id`
    pub fn group_of(&self, id: ItemId) -> Option<ItemId> {
        if self.find_group(id).is_some() {
            return Some(id);
        }
        self.ancestors(id)
            .into_iter()
            .find(|ancestor| matches!(self.find(*ancestor), Some(ItemRef::Group(_))))
    }

    /// New group under the nearest group of the first selected item
    pub fn create_group(&mut self) -> DocumentResult<ItemId> {
        self.induct_group(GroupItem::new(), CreationStyle::Normal, Parentage::PolicyDefault, false)
    }

    pub fn create_group_in(&mut self, parent: Option<ItemId>) -> DocumentResult<ItemId> {
        self.induct_group(GroupItem::new(), CreationStyle::Normal, Parentage::Explicit(parent), false)
    }

    pub fn paste_group(&mut self, source: &GroupItem) -> DocumentResult<ItemId> {
        self.induct_group(source.duplicate(), CreationStyle::Paste, Parentage::PolicyDefault, false)
    }

    pub fn clone_group(&mut self, id: ItemId) -> DocumentResult<Option<ItemId>> {
        let source = self.find_group(id).ok_or(DocumentError::NotFound(id))?;
        let parent = source.parent_id();
        let copy = source.duplicate();
        self.induct_group(copy, CreationStyle::Clone, Parentage::Explicit(parent), false)
            .map(Some)
    }

    pub fn can_delete_group(&self, id: ItemId) -> DeleteCheck {
        if self.find_group(id).is_none() {
            return DeleteCheck::FailNotFound;
        }
        self.deletion_check(id)
    }

    pub fn delete_group(&mut self, id: ItemId) -> bool {
        self.delete_group_item(id)
    }

    pub fn undelete_group(&mut self, group: GroupItem, was_selected: bool) -> DocumentResult<ItemId> {
        let id = group.id();
        debug!(item = %id, was_selected, "Undeleting group");
        self.induct_group(group, CreationStyle::Undelete, Parentage::Preserve, was_selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Notification;
    use crate::registry::TypeRegistry;
    use std::sync::Arc;

    fn document() -> Document<Grouped> {
        Document::new(Arc::new(TypeRegistry::builtin()))
    }

    #[test]
    fn test_new_items_land_in_selected_group() {
        let mut doc = document();
        let outer = doc.create_group().unwrap();
        let inner = doc.create_group().unwrap();
        assert_eq!(doc.find(inner).unwrap().parent_id(), Some(outer));

        let widget = doc.create_component("Widget").unwrap();
        assert_eq!(doc.find(widget).unwrap().parent_id(), Some(inner));

        // A selected component resolves to its enclosing group
        let sibling = doc.create_component("Light").unwrap();
        assert_eq!(doc.find(sibling).unwrap().parent_id(), Some(inner));
        assert_eq!(doc.group_of(sibling), Some(inner));
    }

    #[test]
    fn test_top_level_without_selection() {
        let mut doc = document();
        let a = doc.create_component("Widget").unwrap();
        let b = doc.create_component("Widget").unwrap();
        assert_eq!(doc.find(b).unwrap().parent_id(), None);
        assert_eq!(doc.group_of(a), None);
    }

    #[test]
    fn test_group_deletion() {
        let mut doc = document();
        let group = doc.create_group().unwrap();
        let child = doc.create_component("Widget").unwrap();

        assert_eq!(doc.can_delete_group(group), DeleteCheck::FailHasChildren);
        assert!(!doc.delete_group(group));
        assert_eq!(doc.can_delete_group(child), DeleteCheck::FailNotFound);

        let snapshot = doc.find_group(group).unwrap().clone();
        assert!(doc.delete_component(child));
        assert!(doc.delete_group(group));
        assert!(doc.find(group).is_none());

        doc.undelete_group(snapshot, false).unwrap();
        assert!(doc.find_group(group).is_some());
        assert!(doc.selection().is_empty());
    }

    #[test]
    fn test_clone_and_paste_group() {
        let mut doc = document();
        let outer = doc.create_group().unwrap();
        let inner = doc.create_group().unwrap();
        doc.rename(inner, Some("Props")).unwrap();

        let clone = doc.clone_group(inner).unwrap().unwrap();
        assert_eq!(doc.find(clone).unwrap().parent_id(), Some(outer));
        assert_eq!(doc.find(clone).unwrap().name(), "Props");

        let source = doc.find_group(inner).unwrap().clone();
        doc.clear_selection();
        let pasted = doc.paste_group(&source).unwrap();
        assert_eq!(doc.find(pasted).unwrap().parent_id(), None);
        assert_eq!(doc.selection().as_slice(), &[pasted]);
        assert_eq!(doc.groups().len(), 4);
    }

    #[test]
    fn test_groups_surface_in_queries() {
        let mut doc = document();
        let group = doc.create_group().unwrap();
        doc.create_component("Widget").unwrap();

        let top: Vec<_> = doc.children(None).iter().map(|i| i.item_type()).collect();
        assert_eq!(top, vec!["Group"]);
        assert_eq!(doc.items().count(), 2);
        assert!(doc.find(group).unwrap().is_group());
    }

    #[test]
    fn test_group_rename_is_structural() {
        let mut doc = document();
        let group = doc.create_group().unwrap();
        doc.drain_notifications();

        doc.rename(group, Some("Lights")).unwrap();
        assert!(doc.drain_notifications().contains(&Notification::StructureChanged));
    }
}
