//! # Document Policies
//!
//! A document's hierarchy rules are chosen at the type level:
//! `Document<Grouped>` nests items under group nodes, `Document<Rooted>`
//! keeps exactly one parentless item. Both share the same
//! [`Document`](crate::Document) operations; the policy only answers the
//! questions those operations ask.
//!
//! [`CreationStyle`] records why an item is entering the document and
//! decides its selection effect and default parentage.

use crate::document::Document;
use crate::errors::DocumentError;
use crate::id::ItemId;
use crate::item::ComponentItem;
use crate::registry::ComponentShape;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an item is being inducted into a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationStyle {
    Normal,
    Paste,
    Clone,
    Undelete,
    Replacement,
    Load,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEffect {
    /// Becomes the sole selection
    Replace,
    /// Joins the current selection
    Add,
    Leave,
}

impl CreationStyle {
    pub fn selection_effect(self, was_selected: bool) -> SelectionEffect {
        match self {
            CreationStyle::Normal => SelectionEffect::Replace,
            CreationStyle::Paste | CreationStyle::Clone => SelectionEffect::Add,
            CreationStyle::Undelete | CreationStyle::Replacement if was_selected => SelectionEffect::Add,
            CreationStyle::Undelete | CreationStyle::Replacement => SelectionEffect::Leave,
            CreationStyle::Load | CreationStyle::External => SelectionEffect::Leave,
        }
    }

    /// Whether the document's type and parent policies apply
    pub fn is_checked(self) -> bool {
        matches!(
            self,
            CreationStyle::Normal | CreationStyle::Paste | CreationStyle::Clone | CreationStyle::External
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Grouped,
    Rooted,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Grouped => f.write_str("grouped"),
            DocumentKind::Rooted => f.write_str("rooted"),
        }
    }
}

/// Hierarchy rules of a document variant
pub trait DocumentPolicy: Sized + Default + fmt::Debug + 'static {
    const KIND: DocumentKind;

    /// Verification hook for new component types
    fn accepts_type(document: &Document<Self>, shape: &ComponentShape) -> bool {
        document.config().allows_type(&shape.type_name)
    }

    /// Clone-allowance hook
    fn allows_clone(_document: &Document<Self>, _source: &ComponentItem) -> bool {
        true
    }

    /// Parent for a new item when none is given
    fn default_parent(document: &Document<Self>) -> Option<ItemId>;

    /// Check a prospective parent assignment of `item`
    fn allows_parent(
        _document: &Document<Self>,
        _item: ItemId,
        _parent: Option<ItemId>,
    ) -> Result<(), DocumentError> {
        Ok(())
    }

    /// Whether group items take part in queries
    fn surfaces_groups() -> bool;
}

/// Arbitrary nesting through group items
#[derive(Debug, Clone, Copy, Default)]
pub struct Grouped;

/// Exactly one parentless item
#[derive(Debug, Clone, Copy, Default)]
pub struct Rooted;

impl DocumentPolicy for Grouped {
    const KIND: DocumentKind = DocumentKind::Grouped;

    fn default_parent(document: &Document<Self>) -> Option<ItemId> {
        let first = *document.selection().first()?;
        document.group_of(first)
    }

    fn surfaces_groups() -> bool {
        true
    }
}

impl DocumentPolicy for Rooted {
    const KIND: DocumentKind = DocumentKind::Rooted;

    fn accepts_type(document: &Document<Self>, shape: &ComponentShape) -> bool {
        let config = document.config();
        if !config.allows_type(&shape.type_name) {
            return false;
        }
        match &config.root_type {
            Some(root_type) if document.components().is_empty() => &shape.type_name == root_type,
            _ => true,
        }
    }

    fn allows_clone(_document: &Document<Self>, source: &ComponentItem) -> bool {
        source.parent_id().is_some()
    }

    fn default_parent(document: &Document<Self>) -> Option<ItemId> {
        match document.selection().first() {
            Some(first) => Some(*first),
            None => document.root().map(|root| root.id()),
        }
    }

    fn allows_parent(document: &Document<Self>, item: ItemId, parent: Option<ItemId>) -> Result<(), DocumentError> {
        if parent.is_some() {
            return Ok(());
        }
        let other_root = document
            .components()
            .iter()
            .any(|c| c.parent_id().is_none() && c.id() != item);
        if other_root {
            return Err(DocumentError::RootViolation(format!(
                "{} cannot become a second root",
                item
            )));
        }
        Ok(())
    }

    fn surfaces_groups() -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_effects() {
        assert_eq!(CreationStyle::Normal.selection_effect(false), SelectionEffect::Replace);
        assert_eq!(CreationStyle::Paste.selection_effect(false), SelectionEffect::Add);
        assert_eq!(CreationStyle::Clone.selection_effect(false), SelectionEffect::Add);
        assert_eq!(CreationStyle::Undelete.selection_effect(true), SelectionEffect::Add);
        assert_eq!(CreationStyle::Undelete.selection_effect(false), SelectionEffect::Leave);
        assert_eq!(CreationStyle::Replacement.selection_effect(true), SelectionEffect::Add);
        assert_eq!(CreationStyle::Load.selection_effect(true), SelectionEffect::Leave);
        assert_eq!(CreationStyle::External.selection_effect(false), SelectionEffect::Leave);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DocumentKind::Rooted).unwrap(), "\"rooted\"");
        let kind: DocumentKind = serde_json::from_str("\"grouped\"").unwrap();
        assert_eq!(kind, DocumentKind::Grouped);
        assert_eq!(kind.to_string(), "grouped");
    }
}
