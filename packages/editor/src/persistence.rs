//! # Persistence
//!
//! Documents save and load through a declarative token graph,
//! [`DocumentTokens`], serialized with `serde_json`:
//!
//! ```json
//! {
//!   "format": 1,
//!   "kind": "grouped",
//!   "components": [
//!     {
//!       "id": "…", "parentId": null, "name": "Door", "expanded": true,
//!       "itemType": "Widget", "scriptClass": "",
//!       "properties": { "label": { "kind": "text", "value": "Exit" } }
//!     }
//!   ],
//!   "groups": []
//! }
//! ```
//!
//! Loading validates the whole graph before any item is inducted and
//! leaves the document cleared on failure.

use crate::document::{Document, Parentage};
use crate::errors::{DocumentError, LoadDocumentError, SaveDocumentError};
use crate::id::ItemId;
use crate::item::{ComponentItem, GroupItem};
use crate::policy::{CreationStyle, DocumentKind, DocumentPolicy};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

/// Current token graph format
pub const DOCUMENT_FORMAT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentToken {
    pub id: ItemId,
    #[serde(default)]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_expanded")]
    pub expanded: bool,
    pub item_type: String,
    #[serde(default)]
    pub script_class: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupToken {
    pub id: ItemId,
    #[serde(default)]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_expanded")]
    pub expanded: bool,
}

fn default_expanded() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTokens {
    pub format: u32,
    pub kind: DocumentKind,
    #[serde(default)]
    pub components: Vec<ComponentToken>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupToken>,
    /// Rooted documents record their root for readers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<ItemId>,
}

impl DocumentTokens {
    /// Structural checks that need no registry
    pub fn validate(&self, expected: DocumentKind) -> Result<(), LoadDocumentError> {
        if self.format != DOCUMENT_FORMAT {
            return Err(LoadDocumentError::UnsupportedVersion(self.format));
        }
        if self.kind != expected {
            return Err(LoadDocumentError::KindMismatch {
                expected,
                found: self.kind,
            });
        }
        if expected == DocumentKind::Rooted && !self.groups.is_empty() {
            return Err(LoadDocumentError::Invalid("rooted documents cannot contain groups".into()));
        }

        let mut parents = HashMap::new();
        for (id, parent) in self
            .components
            .iter()
            .map(|c| (c.id, c.parent_id))
            .chain(self.groups.iter().map(|g| (g.id, g.parent_id)))
        {
            if parents.insert(id, parent).is_some() {
                return Err(DocumentError::DuplicateId(id).into());
            }
        }

        // Ids already known to reach a root; each chain is walked once
        let mut rooted = HashSet::new();
        for (id, parent) in &parents {
            if let Some(parent) = parent {
                if !parents.contains_key(parent) {
                    return Err(DocumentError::ParentNotFound(*parent).into());
                }
            }
            // Walk up; revisiting an id of this walk means a cycle
            let mut path = vec![*id];
            let mut on_path = HashSet::from([*id]);
            let mut cursor = *parent;
            while let Some(current) = cursor {
                if rooted.contains(&current) {
                    break;
                }
                if !on_path.insert(current) {
                    return Err(DocumentError::CycleDetected {
                        item: *id,
                        parent: current,
                    }
                    .into());
                }
                path.push(current);
                cursor = parents.get(&current).copied().flatten();
            }
            rooted.extend(path);
        }

        if expected == DocumentKind::Rooted {
            let roots = self.components.iter().filter(|c| c.parent_id.is_none()).count();
            if roots > 1 {
                return Err(LoadDocumentError::Invalid(format!(
                    "rooted document has {} parentless items",
                    roots
                )));
            }
        }
        Ok(())
    }
}

impl ComponentToken {
    fn from_item(item: &ComponentItem) -> Self {
        Self {
            id: item.id(),
            parent_id: item.parent_id(),
            name: item.name().to_string(),
            expanded: item.expanded(),
            item_type: item.item_type().to_string(),
            script_class: item.script_class().to_string(),
            properties: item
                .proxies()
                .iter()
                .map(|p| (p.name().to_string(), p.value().clone()))
                .collect(),
        }
    }
}

impl<P: DocumentPolicy> Document<P> {
    pub fn to_tokens(&self) -> DocumentTokens {
        let root = match P::KIND {
            DocumentKind::Rooted => self
                .components
                .iter()
                .find(|c| c.parent_id().is_none())
                .map(|c| c.id()),
            DocumentKind::Grouped => None,
        };
        DocumentTokens {
            format: DOCUMENT_FORMAT,
            kind: P::KIND,
            components: self.components.iter().map(ComponentToken::from_item).collect(),
            groups: self
                .groups
                .iter()
                .map(|g| GroupToken {
                    id: g.id(),
                    parent_id: g.parent_id(),
                    name: g.name().to_string(),
                    expanded: g.expanded(),
                })
                .collect(),
            root,
        }
    }

    /// Build the document from `tokens`, replacing the current content.
    /// On failure the document is left cleared.
    pub fn load_tokens(&mut self, tokens: DocumentTokens) -> Result<(), LoadDocumentError> {
        self.clear();
        let result = self.populate(tokens);
        if result.is_err() {
            self.clear();
        }
        result
    }

    fn populate(&mut self, tokens: DocumentTokens) -> Result<(), LoadDocumentError> {
        tokens.validate(P::KIND)?;

        let mut items = Vec::with_capacity(tokens.components.len());
        for token in tokens.components {
            let mut item = self
                .registry()
                .create_item(&token.item_type)
                .ok_or_else(|| DocumentError::InvalidType(token.item_type.clone()))?;
            item.core.id = token.id;
            item.core.parent_id = token.parent_id;
            item.core.name = token.name;
            item.core.expanded = token.expanded;
            item.set_script_class(token.script_class);
            for (property, value) in token.properties {
                if item.proxy(&property).is_none() {
                    warn!(item = %token.id, property = %property, "Skipping unknown property");
                    continue;
                }
                item.restore(&property, value).map_err(DocumentError::from)?;
            }
            items.push(item);
        }

        for token in tokens.groups {
            let mut group = GroupItem::new();
            group.core.id = token.id;
            group.core.parent_id = token.parent_id;
            group.core.name = token.name;
            group.core.expanded = token.expanded;
            self.induct_group(group, CreationStyle::Load, Parentage::Preserve, false)?;
        }
        for item in items {
            self.induct(item, CreationStyle::Load, Parentage::Preserve, false)?;
        }

        // Live parents can only be wired once every instance exists
        self.synchronize_to()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, SaveDocumentError> {
        Ok(serde_json::to_string_pretty(&self.to_tokens())?)
    }

    pub fn load_json(&mut self, json: &str) -> Result<(), LoadDocumentError> {
        let tokens = match serde_json::from_str::<DocumentTokens>(json) {
            Ok(tokens) => tokens,
            Err(err) => {
                self.clear();
                return Err(err.into());
            }
        };
        self.load_tokens(tokens)
    }

    pub fn save(&mut self, path: &Path) -> Result<(), SaveDocumentError> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), components = self.components.len(), groups = self.groups.len(), "Saved document");
        self.set_path(path.to_path_buf());
        Ok(())
    }

    pub fn load(&mut self, path: &Path) -> Result<(), LoadDocumentError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) => {
                self.clear();
                return Err(err.into());
            }
        };
        self.load_json(&json)?;
        info!(path = %path.display(), components = self.components.len(), groups = self.groups.len(), "Loaded document");
        self.set_path(path.to_path_buf());
        Ok(())
    }
}
