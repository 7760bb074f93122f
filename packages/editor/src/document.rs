//! # Document
//!
//! Owns the items of one editable document, binds component items to live
//! instances and queues notifications for its controller.
//!
//! Items live in flat arenas (components, and groups for grouped
//! documents); `parent_id` is an id lookup. Parentage invariants (no
//! cycles, resolvable parents, policy rules) are checked at the boundary of
//! every public mutation.
//!
//! ## Lifecycle of an item
//!
//! ```text
//! registry ──create──► induct ──► owned ──delete──► snapshot
//!                        ▲                              │
//!                        └────────── undelete ◄─────────┘
//! ```
//!
//! Induction binds a live instance (spawned, or adopted for `External`),
//! assigns parentage and selection per [`CreationStyle`], then raises
//! `StructureChanged`. Deletion unbinds and despawns.
//!
//! ## Notifications
//!
//! Nothing is dispatched from here. Events queue in an outbox that the
//! owner drains with [`Document::drain_notifications`], so no observer ever
//! runs while the document is borrowed.

use crate::config::EditorConfig;
use crate::errors::{DocumentError, DocumentResult, PropertyError};
use crate::id::ItemId;
use crate::item::{ComponentItem, GroupItem, Item, ItemRef};
use crate::notification::Notification;
use crate::policy::{CreationStyle, DocumentKind, DocumentPolicy, SelectionEffect};
use crate::registry::TypeRegistry;
use crate::runtime::{InstanceError, InstanceId, Runtime, SceneRuntime};
use crate::selection::{Selection, SelectionEvent};
use crate::value::{Value, ValueKind};
use atelier_history::PropertyHost;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a deletion check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCheck {
    Success,
    FailHasChildren,
    FailNotFound,
}

/// Position of an item in its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Component(usize),
    Group(usize),
}

/// Where an inducted item gets its parent from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Parentage {
    Explicit(Option<ItemId>),
    PolicyDefault,
    /// Keep the parent already stored on the item
    Preserve,
}

pub struct Document<P: DocumentPolicy> {
    registry: Arc<TypeRegistry>,
    runtime: Box<dyn Runtime>,
    config: EditorConfig,
    pub(crate) components: Vec<ComponentItem>,
    pub(crate) groups: Vec<GroupItem>,
    /// id → arena slot; rebuilt whenever an arena shifts
    index: HashMap<ItemId, Slot>,
    selection: Selection<ItemId>,
    outbox: Vec<Notification>,
    path: Option<PathBuf>,
    version: u64,
    _policy: PhantomData<P>,
}

impl<P: DocumentPolicy> fmt::Debug for Document<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("kind", &P::KIND)
            .field("components", &self.components.len())
            .field("groups", &self.groups.len())
            .field("selection", &self.selection.as_slice())
            .field("pending", &self.outbox.len())
            .field("path", &self.path)
            .field("version", &self.version)
            .finish()
    }
}

impl<P: DocumentPolicy> Document<P> {
    /// Empty document over an in-memory [`SceneRuntime`]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_runtime(registry, Box::new(SceneRuntime::new()))
    }

    pub fn with_runtime(registry: Arc<TypeRegistry>, runtime: Box<dyn Runtime>) -> Self {
        Self {
            registry,
            runtime,
            config: EditorConfig::default(),
            components: Vec::new(),
            groups: Vec::new(),
            index: HashMap::new(),
            selection: Selection::new(),
            outbox: Vec::new(),
            path: None,
            version: 0,
            _policy: PhantomData,
        }
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn kind(&self) -> DocumentKind {
        P::KIND
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    /// Live-object side. Writes made here reach the document through
    /// [`synchronize_from`](Self::synchronize_from).
    pub fn runtime_mut(&mut self) -> &mut dyn Runtime {
        self.runtime.as_mut()
    }

    pub fn components(&self) -> &[ComponentItem] {
        &self.components
    }

    pub fn selection(&self) -> &Selection<ItemId> {
        &self.selection
    }

    /// File this document was last saved to or loaded from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// Increments on every structural or property change
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.groups.is_empty()
    }

    // ── Notifications ────────────────────────────────────────────────────

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.pump_selection();
        std::mem::take(&mut self.outbox)
    }

    pub fn has_pending_notifications(&self) -> bool {
        !self.outbox.is_empty() || self.selection.has_pending_events()
    }

    fn structure_changed(&mut self) {
        self.version += 1;
        self.outbox.push(Notification::StructureChanged);
    }

    pub(crate) fn property_changed(&mut self, item: ItemId, property: &str, old_value: Value) {
        self.version += 1;
        self.selection.observe(&item, property, &old_value);
        self.outbox.push(Notification::PropertyChanged {
            item,
            property: property.to_string(),
            old_value,
        });
        self.pump_selection();
        if property == "name" || property == "parent_id" {
            self.structure_changed();
        }
    }

    /// Move queued selection events into the outbox
    fn pump_selection(&mut self) {
        for event in self.selection.drain_events() {
            self.outbox.push(match event {
                SelectionEvent::Changed { old_selection } => Notification::SelectionChanged { old_selection },
                SelectionEvent::PropertyChanged {
                    target,
                    property,
                    old_value,
                } => Notification::SelectionPropertyChanged {
                    target,
                    property,
                    old_value,
                },
            });
        }
    }

    // ── Creation ─────────────────────────────────────────────────────────

    /// Create a component of `type_name` with the policy's default parent.
    /// It becomes the sole selection.
    pub fn create_component(&mut self, type_name: &str) -> DocumentResult<ItemId> {
        let item = self.new_item(type_name)?;
        self.induct(item, CreationStyle::Normal, Parentage::PolicyDefault, false)
    }

    /// Create a component under an explicit parent (`None` for top level)
    pub fn create_component_in(&mut self, type_name: &str, parent: Option<ItemId>) -> DocumentResult<ItemId> {
        let item = self.new_item(type_name)?;
        self.induct(item, CreationStyle::Normal, Parentage::Explicit(parent), false)
    }

    /// Wrap a live instance created outside the document
    pub fn adopt_instance(&mut self, type_name: &str, instance: InstanceId) -> DocumentResult<ItemId> {
        if !self.runtime.contains(instance) {
            return Err(InstanceError::NotFound(instance).into());
        }
        if self.components.iter().any(|c| c.instance == Some(instance)) {
            return Err(DocumentError::InstanceAlreadyBound(instance));
        }
        let mut item = self.new_item(type_name)?;
        item.instance = Some(instance);
        self.induct(item, CreationStyle::External, Parentage::PolicyDefault, false)
    }

    /// Insert a duplicate of `source`, added to the selection
    pub fn paste_component(&mut self, source: &ComponentItem) -> DocumentResult<ItemId> {
        if !self.registry.contains(source.item_type()) {
            return Err(DocumentError::InvalidType(source.item_type().to_string()));
        }
        self.induct(source.duplicate(), CreationStyle::Paste, Parentage::PolicyDefault, false)
    }

    /// Duplicate `id` next to itself. `Ok(None)` when the policy refuses.
    pub fn clone_component(&mut self, id: ItemId) -> DocumentResult<Option<ItemId>> {
        let source = self.find_component(id).ok_or(DocumentError::NotFound(id))?;
        if !P::allows_clone(self, source) {
            debug!(item = %id, "Clone refused by document policy");
            return Ok(None);
        }
        let parent = source.parent_id();
        let copy = source.duplicate();
        self.induct(copy, CreationStyle::Clone, Parentage::Explicit(parent), false)
            .map(Some)
    }

    /// Reinstate a deleted component with its id
    pub fn undelete_component(&mut self, item: ComponentItem, was_selected: bool) -> DocumentResult<ItemId> {
        self.induct(item, CreationStyle::Undelete, Parentage::Preserve, was_selected)
    }

    /// Reinstate a deleted replacement component with its id
    pub fn undelete_replacement_component(
        &mut self,
        item: ComponentItem,
        was_selected: bool,
    ) -> DocumentResult<ItemId> {
        self.induct(item, CreationStyle::Replacement, Parentage::Preserve, was_selected)
    }

    /// Create an item of `type_name` impersonating `original`. The original
    /// stays in place; see [`replace_component`](Self::replace_component).
    pub fn create_replacement(&mut self, original: ItemId, type_name: &str) -> DocumentResult<ItemId> {
        let source = self.find_component(original).ok_or(DocumentError::NotFound(original))?;
        let mut item = self.new_item(type_name)?;
        item.impersonate(source);
        let was_selected = self.selection.contains(&original);
        self.induct(item, CreationStyle::Replacement, Parentage::Preserve, was_selected)
    }

    /// Change the type of `id`: the replacement takes over its state and
    /// children, then the original is deleted.
    pub fn replace_component(&mut self, id: ItemId, type_name: &str) -> DocumentResult<ItemId> {
        let replacement = self.create_replacement(id, type_name)?;
        for child in self.child_ids(Some(id)) {
            self.set_parent(child, Some(replacement))?;
        }
        if !self.delete_component(id) {
            return Err(DocumentError::InvalidArgument(format!("{} could not be removed", id)));
        }
        Ok(replacement)
    }

    fn new_item(&self, type_name: &str) -> DocumentResult<ComponentItem> {
        self.registry
            .create_item(type_name)
            .ok_or_else(|| DocumentError::InvalidType(type_name.to_string()))
    }

    fn resolve_parent(&self, parentage: Parentage, stored: Option<ItemId>) -> Option<ItemId> {
        match parentage {
            Parentage::Explicit(parent) => parent,
            Parentage::PolicyDefault => P::default_parent(self),
            Parentage::Preserve => stored,
        }
    }

    fn check_placement(
        &self,
        id: ItemId,
        parent: Option<ItemId>,
        style: CreationStyle,
    ) -> DocumentResult<()> {
        if self.contains(id) {
            return Err(DocumentError::DuplicateId(id));
        }
        if let Some(parent) = parent {
            if style != CreationStyle::Load && !self.contains(parent) {
                return Err(DocumentError::ParentNotFound(parent));
            }
        }
        if style.is_checked() {
            P::allows_parent(self, id, parent)?;
        }
        Ok(())
    }

    pub(crate) fn induct(
        &mut self,
        mut item: ComponentItem,
        style: CreationStyle,
        parentage: Parentage,
        was_selected: bool,
    ) -> DocumentResult<ItemId> {
        let verify = style.is_checked() || style == CreationStyle::Replacement;
        if verify && !P::accepts_type(self, item.shape()) {
            return Err(DocumentError::InvalidType(item.item_type().to_string()));
        }
        let parent = self.resolve_parent(parentage, item.parent_id());
        self.check_placement(item.id(), parent, style)?;
        item.core.parent_id = parent;

        self.bind(&mut item, style)?;

        let id = item.id();
        debug!(item = %id, item_type = %item.item_type(), ?style, parent = ?parent, "Inducted component");
        self.index.insert(id, Slot::Component(self.components.len()));
        self.components.push(item);
        if style != CreationStyle::Load {
            self.wire_component(id)?;
        }
        self.apply_selection(id, style.selection_effect(was_selected));
        self.structure_changed();
        Ok(id)
    }

    /// Spawn (or adopt) and initialize the live instance of `item`
    fn bind(&mut self, item: &mut ComponentItem, style: CreationStyle) -> DocumentResult<()> {
        if style == CreationStyle::External {
            // The live instance is the source of truth
            let instance = item.instance.ok_or(InstanceError::Unbound)?;
            if let Some(name) = self.runtime.name(instance) {
                if !name.is_empty() {
                    item.core.name = item.format_name(&name);
                }
            }
            item.synchronize_from(self.runtime.as_ref())?;
            return Ok(());
        }

        let instance = self.runtime.spawn(item.shape())?;
        item.instance = Some(instance);
        if let Err(err) = item.synchronize_to(self.runtime.as_mut()) {
            self.runtime.despawn(instance);
            item.instance = None;
            return Err(err.into());
        }
        Ok(())
    }

    fn apply_selection(&mut self, id: ItemId, effect: SelectionEffect) {
        match effect {
            SelectionEffect::Replace => self.selection.set(id),
            SelectionEffect::Add => self.selection.add(id),
            SelectionEffect::Leave => {}
        }
        self.pump_selection();
    }

    pub(crate) fn induct_group(
        &mut self,
        mut group: GroupItem,
        style: CreationStyle,
        parentage: Parentage,
        was_selected: bool,
    ) -> DocumentResult<ItemId> {
        if !P::surfaces_groups() {
            return Err(DocumentError::InvalidType(group.item_type().to_string()));
        }
        let parent = self.resolve_parent(parentage, group.parent_id());
        self.check_placement(group.id(), parent, style)?;
        group.core.parent_id = parent;

        let id = group.id();
        debug!(item = %id, ?style, parent = ?parent, "Inducted group");
        self.index.insert(id, Slot::Group(self.groups.len()));
        self.groups.push(group);
        self.apply_selection(id, style.selection_effect(was_selected));
        self.structure_changed();
        Ok(id)
    }

    /// Reinstate a removed item of either variant, at `position` in its
    /// arena when given (clamped), otherwise at the end
    pub(crate) fn reinstate(
        &mut self,
        item: Item,
        style: CreationStyle,
        was_selected: bool,
        position: Option<usize>,
    ) -> DocumentResult<ItemId> {
        let id = match item {
            Item::Component(mut component) => {
                component.instance = None;
                self.induct(component, style, Parentage::Preserve, was_selected)?
            }
            Item::Group(group) => self.induct_group(group, style, Parentage::Preserve, was_selected)?,
        };
        if let Some(position) = position {
            self.relocate(id, position);
        }
        Ok(id)
    }

    // ── Arena index ──────────────────────────────────────────────────────

    pub(crate) fn slot(&self, id: ItemId) -> Option<Slot> {
        self.index.get(&id).copied()
    }

    /// Index of `id` within its own arena
    pub fn position(&self, id: ItemId) -> Option<usize> {
        match self.slot(id)? {
            Slot::Component(index) | Slot::Group(index) => Some(index),
        }
    }

    /// Move `id` to `position` within its arena
    fn relocate(&mut self, id: ItemId, position: usize) {
        match self.slot(id) {
            Some(Slot::Component(from)) => {
                let item = self.components.remove(from);
                let to = position.min(self.components.len());
                self.components.insert(to, item);
            }
            Some(Slot::Group(from)) => {
                let group = self.groups.remove(from);
                let to = position.min(self.groups.len());
                self.groups.insert(to, group);
            }
            None => return,
        }
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (index, component) in self.components.iter().enumerate() {
            self.index.insert(component.id(), Slot::Component(index));
        }
        for (index, group) in self.groups.iter().enumerate() {
            self.index.insert(group.id(), Slot::Group(index));
        }
    }

    // ── Deletion ─────────────────────────────────────────────────────────

    pub fn can_delete_component(&self, id: ItemId) -> DeleteCheck {
        if self.find_component(id).is_none() {
            return DeleteCheck::FailNotFound;
        }
        self.deletion_check(id)
    }

    pub(crate) fn deletion_check(&self, id: ItemId) -> DeleteCheck {
        let has_children = self.components.iter().any(|c| c.parent_id() == Some(id))
            || self.groups.iter().any(|g| g.parent_id() == Some(id));
        if has_children {
            DeleteCheck::FailHasChildren
        } else {
            DeleteCheck::Success
        }
    }

    /// Remove `id` if [`can_delete_component`](Self::can_delete_component)
    /// succeeds. The live instance is despawned.
    pub fn delete_component(&mut self, id: ItemId) -> bool {
        if self.can_delete_component(id) != DeleteCheck::Success {
            return false;
        }
        self.selection.remove(&id);
        self.pump_selection();

        let Some(Slot::Component(index)) = self.slot(id) else {
            return false;
        };
        let mut item = self.components.remove(index);
        self.reindex();
        self.unbind(&mut item);
        debug!(item = %id, item_type = %item.item_type(), "Deleted component");
        self.structure_changed();
        true
    }

    pub(crate) fn delete_group_item(&mut self, id: ItemId) -> bool {
        let Some(Slot::Group(index)) = self.slot(id) else {
            return false;
        };
        if self.deletion_check(id) != DeleteCheck::Success {
            return false;
        }
        self.selection.remove(&id);
        self.pump_selection();
        self.groups.remove(index);
        self.reindex();
        debug!(item = %id, "Deleted group");
        self.structure_changed();
        true
    }

    /// Delete a component or group
    pub(crate) fn remove(&mut self, id: ItemId) -> bool {
        if self.find_component(id).is_some() {
            self.delete_component(id)
        } else {
            self.delete_group_item(id)
        }
    }

    fn unbind(&mut self, item: &mut ComponentItem) {
        if let Some(instance) = item.instance.take() {
            if !self.runtime.despawn(instance) {
                warn!(item = %item.id(), %instance, "Live instance was already gone");
            }
        }
    }

    /// Unbind and remove every item, components first
    pub fn clear(&mut self) {
        self.selection.clear();
        self.pump_selection();

        while let Some(mut item) = self.components.pop() {
            self.index.remove(&item.id());
            self.unbind(&mut item);
            self.structure_changed();
        }
        while let Some(group) = self.groups.pop() {
            self.index.remove(&group.id());
            self.structure_changed();
        }
        debug!("Cleared document");
    }

    // ── Properties ───────────────────────────────────────────────────────

    pub fn property(&self, id: ItemId, property: &str) -> Option<Value> {
        self.find(id)?.property(property)
    }

    /// Set a built-in or proxy property. `parent_id` moves the item.
    pub fn set_property(&mut self, id: ItemId, property: &str, value: Value) -> DocumentResult<()> {
        if property == "parent_id" {
            let parent = value.as_id().ok_or_else(|| PropertyError::KindMismatch {
                property: property.to_string(),
                expected: ValueKind::Id,
                found: value.kind(),
            })?;
            return self.set_parent(id, parent);
        }

        let old = match self.slot(id) {
            Some(Slot::Component(index)) => {
                self.components[index].set_property(self.runtime.as_mut(), property, value)?
            }
            Some(Slot::Group(index)) => self.groups[index].set_property(property, value)?,
            None => return Err(DocumentError::NotFound(id)),
        };

        if let Some(old) = old {
            self.property_changed(id, property, old);
        }
        Ok(())
    }

    /// Rename `id`. `None` is stored as the empty string.
    pub fn rename(&mut self, id: ItemId, name: Option<&str>) -> DocumentResult<()> {
        self.set_property(id, "name", name.map_or(Value::Null, Value::from))
    }

    pub fn set_expanded(&mut self, id: ItemId, expanded: bool) -> DocumentResult<()> {
        self.set_property(id, "expanded", Value::Bool(expanded))
    }

    /// Move `id` under `parent`, keeping live instances wired to match
    pub fn set_parent(&mut self, id: ItemId, parent: Option<ItemId>) -> DocumentResult<()> {
        let current = self.find(id).ok_or(DocumentError::NotFound(id))?.parent_id();
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(DocumentError::ParentNotFound(parent));
            }
            if parent == id || self.is_descending(id, parent) {
                return Err(DocumentError::CycleDetected { item: id, parent });
            }
        }
        P::allows_parent(self, id, parent)?;
        if current == parent {
            return Ok(());
        }

        match self.slot(id) {
            Some(Slot::Component(index)) => self.components[index].core.parent_id = parent,
            Some(Slot::Group(index)) => self.groups[index].core.parent_id = parent,
            None => return Err(DocumentError::NotFound(id)),
        }
        self.wire_live_parent(id)?;
        debug!(item = %id, from = ?current, to = ?parent, "Moved item");
        self.property_changed(id, "parent_id", Value::Id(current));
        Ok(())
    }

    /// Instance of the nearest component at or above `start`
    fn live_ancestor(&self, start: Option<ItemId>) -> Option<InstanceId> {
        let mut cursor = start;
        let mut steps = 0;
        while let Some(id) = cursor {
            if steps > self.components.len() + self.groups.len() {
                break;
            }
            steps += 1;
            match self.find(id)? {
                ItemRef::Component(component) => return component.instance(),
                ItemRef::Group(group) => cursor = group.parent_id(),
            }
        }
        None
    }

    /// Re-point the live parent of every component in the subtree of `id`
    fn wire_live_parent(&mut self, id: ItemId) -> Result<(), InstanceError> {
        self.wire_component(id)?;
        for member in self.descendants(id) {
            self.wire_component(member)?;
        }
        Ok(())
    }

    /// Re-point the live parent of `id` alone. Groups have no instance.
    fn wire_component(&mut self, id: ItemId) -> Result<(), InstanceError> {
        let Some(component) = self.find_component(id) else {
            return Ok(());
        };
        let Some(instance) = component.instance() else {
            return Ok(());
        };
        let live_parent = self.live_ancestor(component.parent_id());
        if self.runtime.parent(instance) != live_parent {
            self.runtime.set_parent(instance, live_parent)?;
        }
        Ok(())
    }

    // ── Selection ────────────────────────────────────────────────────────

    fn ensure_exists(&self, ids: &[ItemId]) -> DocumentResult<()> {
        match ids.iter().find(|id| !self.contains(**id)) {
            Some(missing) => Err(DocumentError::NotFound(*missing)),
            None => Ok(()),
        }
    }

    pub fn select(&mut self, id: ItemId) -> DocumentResult<()> {
        self.ensure_exists(&[id])?;
        self.selection.set(id);
        self.pump_selection();
        Ok(())
    }

    pub fn select_range(&mut self, ids: impl IntoIterator<Item = ItemId>) -> DocumentResult<()> {
        let ids: Vec<_> = ids.into_iter().collect();
        self.ensure_exists(&ids)?;
        self.selection.set_range(ids);
        self.pump_selection();
        Ok(())
    }

    pub fn add_to_selection(&mut self, id: ItemId) -> DocumentResult<()> {
        self.ensure_exists(&[id])?;
        self.selection.add(id);
        self.pump_selection();
        Ok(())
    }

    pub fn add_range_to_selection(&mut self, ids: impl IntoIterator<Item = ItemId>) -> DocumentResult<()> {
        let ids: Vec<_> = ids.into_iter().collect();
        self.ensure_exists(&ids)?;
        self.selection.add_range(ids);
        self.pump_selection();
        Ok(())
    }

    pub fn remove_from_selection(&mut self, id: ItemId) {
        self.selection.remove(&id);
        self.pump_selection();
    }

    pub fn remove_range_from_selection(&mut self, ids: &[ItemId]) {
        self.selection.remove_range(ids);
        self.pump_selection();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.pump_selection();
    }

    /// Replace the selection, skipping ids that no longer resolve
    pub(crate) fn restore_selection(&mut self, ids: &[ItemId]) {
        let known: Vec<_> = ids.iter().copied().filter(|id| self.contains(*id)).collect();
        self.selection.set_range(known);
        self.pump_selection();
    }

    // ── Live synchronization ─────────────────────────────────────────────

    /// Push every bound component (name, proxies, live parent) onto its instance
    pub fn synchronize_to(&mut self) -> DocumentResult<()> {
        for component in &self.components {
            if component.instance().is_some() {
                component.synchronize_to(self.runtime.as_mut())?;
            }
        }
        let ids: Vec<_> = self.components.iter().map(|c| c.id()).collect();
        for id in ids {
            self.wire_component(id)?;
        }
        Ok(())
    }

    /// Pull every bound component's proxies from its instance, raising a
    /// property change for each value that differed
    pub fn synchronize_from(&mut self) -> DocumentResult<()> {
        let mut changes = Vec::new();
        for component in &mut self.components {
            if component.instance().is_none() {
                continue;
            }
            for (property, old) in component.synchronize_from(self.runtime.as_ref())? {
                changes.push((component.id(), property, old));
            }
        }
        for (id, property, old) in changes {
            self.property_changed(id, &property, old);
        }
        Ok(())
    }
}

impl<P: DocumentPolicy> PropertyHost for Document<P> {
    type Key = ItemId;
    type Value = Value;

    fn read_property(&self, key: &ItemId, property: &str) -> Option<Value> {
        self.property(*key, property)
    }

    fn write_property(&mut self, key: &ItemId, property: &str, value: Value) -> bool {
        match self.set_property(*key, property, value) {
            Ok(()) => true,
            Err(err) => {
                warn!(item = %key, property, error = %err, "Property write failed");
                false
            }
        }
    }
}
