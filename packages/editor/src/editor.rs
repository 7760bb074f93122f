//! # Editor Controller
//!
//! Ties a [`Document`] to an [`OperationRecorder`] so every user-visible
//! mutation becomes one linear, groupable history.
//!
//! ## Design
//!
//! - Each mutation runs inside a history group (unless recording is paused)
//! - Structural changes record an explicit undo/redo pair around item snapshots
//! - Queued `SelectionChanged` and `PropertyChanged` notifications are turned
//!   into operations when the outbox is flushed
//! - Undo/redo replay through a detached [`Winding`](atelier_history::Winding),
//!   so notifications raised by the replay are dispatched while the recorder
//!   still refuses to record them
//!
//! ## Ordering
//!
//! Insertions record their structural operation before the selection change
//! they caused; removals record it after. Undo therefore reinstates an item
//! before selecting it and deselects an item before removing it.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut editor = Editor::new(Document::<Grouped>::new(registry));
//! let door = editor.create_component("Widget")?;
//! editor.rename(door, Some("Door"))?;
//! editor.undo()?; // name restored
//! editor.undo()?; // door removed
//! ```

use crate::document::{DeleteCheck, Document};
use crate::errors::{DocumentError, DocumentResult, EditorResult};
use crate::id::ItemId;
use crate::item::{ComponentItem, GroupItem, Item};
use crate::notification::Notification;
use crate::policy::{CreationStyle, DocumentPolicy, Grouped};
use crate::runtime::{InstanceId, Runtime};
use crate::value::Value;
use atelier_history::{Direction, GroupId, HistoryError, OperationHandle, OperationRecorder};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

type Listener = Box<dyn FnMut(&Notification)>;

pub struct Editor<P: DocumentPolicy> {
    document: Document<P>,
    history: OperationRecorder<Document<P>>,
    listeners: Vec<Listener>,
}

impl<P: DocumentPolicy> fmt::Debug for Editor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("document", &self.document)
            .field("history", &self.history)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<P: DocumentPolicy> Editor<P> {
    pub fn new(document: Document<P>) -> Self {
        let history = OperationRecorder::with_max_levels(document.config().max_history);
        Self {
            document,
            history,
            listeners: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document<P> {
        &self.document
    }

    pub fn history(&self) -> &OperationRecorder<Document<P>> {
        &self.history
    }

    /// Live-object side; pull its changes with [`synchronize_from`](Self::synchronize_from)
    pub fn runtime_mut(&mut self) -> &mut dyn Runtime {
        self.document.runtime_mut()
    }

    pub fn into_document(self) -> Document<P> {
        self.document
    }

    /// Receive every notification after it has been recorded
    pub fn subscribe(&mut self, listener: impl FnMut(&Notification) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ── Grouping and pausing ─────────────────────────────────────────────

    /// Open a history group spanning several editor calls
    pub fn push_group(&mut self) -> EditorResult<()> {
        self.history.push_group()?;
        Ok(())
    }

    pub fn pop_group(&mut self) -> EditorResult<()> {
        self.history.pop_group()?;
        Ok(())
    }

    /// Stop recording until the matching [`pop_pause`](Self::pop_pause)
    pub fn push_pause(&mut self) {
        self.history.push_pause();
    }

    pub fn pop_pause(&mut self) -> EditorResult<()> {
        self.history.pop_pause()?;
        Ok(())
    }

    fn transaction<R>(&mut self, f: impl FnOnce(&mut Self) -> EditorResult<R>) -> EditorResult<R> {
        let grouped = !self.history.is_paused();
        if grouped {
            self.history.push_group()?;
        }
        let result = f(self);
        self.flush();
        if grouped {
            self.history.pop_group()?;
        }
        result
    }

    // ── Notification flushing ────────────────────────────────────────────

    /// Record queued selection and property changes, then dispatch every
    /// queued notification
    fn flush(&mut self) {
        let notifications = self.document.drain_notifications();
        if notifications.is_empty() {
            return;
        }

        // Each selection change ends where the next one starts
        let mut boundaries: Vec<Vec<ItemId>> = notifications
            .iter()
            .filter_map(|n| match n {
                Notification::SelectionChanged { old_selection } => Some(old_selection.clone()),
                _ => None,
            })
            .skip(1)
            .collect();
        boundaries.push(self.document.selection().snapshot());
        let mut ends = boundaries.into_iter();

        for notification in &notifications {
            match notification {
                Notification::SelectionChanged { old_selection } => {
                    let new_selection = ends.next().unwrap_or_default();
                    self.record_selection(old_selection.clone(), new_selection);
                }
                Notification::PropertyChanged {
                    item,
                    property,
                    old_value,
                } => {
                    self.history.record_property(
                        &self.document,
                        format!("Set {}", property),
                        *item,
                        property,
                        old_value.clone(),
                    );
                }
                Notification::StructureChanged | Notification::SelectionPropertyChanged { .. } => {}
            }
        }

        for notification in &notifications {
            for listener in &mut self.listeners {
                listener(notification);
            }
        }
    }

    fn record_selection(&mut self, old: Vec<ItemId>, new: Vec<ItemId>) {
        self.history.record(
            "Select",
            move |doc: &mut Document<P>| doc.restore_selection(&old),
            move |doc: &mut Document<P>| doc.restore_selection(&new),
        );
    }

    /// Undo removes `item`, redo reinstates it with `style` at `position`
    fn record_insertion(&mut self, name: String, item: Item, style: CreationStyle, position: Option<usize>) {
        let id = item.id();
        self.history.record(
            name,
            move |doc: &mut Document<P>| {
                if !doc.remove(id) {
                    warn!(item = %id, "Undo could not remove item");
                }
            },
            move |doc: &mut Document<P>| {
                if let Err(err) = doc.reinstate(item.clone(), style, false, position) {
                    warn!(item = %id, error = %err, "Redo could not reinstate item");
                }
            },
        );
    }

    /// Undo reinstates `item` where it stood, redo removes it again
    fn record_removal(&mut self, name: String, item: Item, position: Option<usize>) {
        let id = item.id();
        self.history.record(
            name,
            move |doc: &mut Document<P>| {
                if let Err(err) = doc.reinstate(item.clone(), CreationStyle::Undelete, false, position) {
                    warn!(item = %id, error = %err, "Undo could not reinstate item");
                }
            },
            move |doc: &mut Document<P>| {
                if !doc.remove(id) {
                    warn!(item = %id, "Redo could not remove item");
                }
            },
        );
    }

    /// Run a creating document call and record the new item
    fn insert(
        &mut self,
        label: &str,
        redo_style: CreationStyle,
        create: impl FnOnce(&mut Document<P>) -> DocumentResult<Option<ItemId>>,
    ) -> EditorResult<Option<ItemId>> {
        self.transaction(|editor| {
            let Some(id) = create(&mut editor.document)? else {
                return Ok(None);
            };
            if let Some(item) = editor.document.find(id).map(|item| item.to_item()) {
                let name = format!("{} {}", label, item.view().item_type());
                let position = editor.document.position(id);
                editor.record_insertion(name, item, redo_style, position);
            }
            editor.flush();
            Ok(Some(id))
        })
    }

    fn inserted(id: Option<ItemId>) -> EditorResult<ItemId> {
        id.ok_or_else(|| DocumentError::InvalidArgument("nothing was created".to_string()).into())
    }

    /// Remove `id` (component or group) and record it
    fn delete(&mut self, id: ItemId, check: DeleteCheck) -> EditorResult<bool> {
        if check != DeleteCheck::Success {
            debug!(item = %id, ?check, "Delete refused");
            return Ok(false);
        }
        let Some(item) = self.document.find(id).map(|item| item.to_item()) else {
            return Ok(false);
        };
        let position = self.document.position(id);
        self.transaction(|editor| {
            let removed = editor.document.remove(id);
            editor.flush();
            if removed {
                let name = format!("Delete {}", item.view().name());
                editor.record_removal(name, item, position);
            }
            Ok(removed)
        })
    }

    // ── Components ───────────────────────────────────────────────────────

    pub fn create_component(&mut self, type_name: &str) -> EditorResult<ItemId> {
        let id = self.insert("Create", CreationStyle::Undelete, |doc| {
            doc.create_component(type_name).map(Some)
        })?;
        Self::inserted(id)
    }

    pub fn create_component_in(&mut self, type_name: &str, parent: Option<ItemId>) -> EditorResult<ItemId> {
        let id = self.insert("Create", CreationStyle::Undelete, |doc| {
            doc.create_component_in(type_name, parent).map(Some)
        })?;
        Self::inserted(id)
    }

    /// Wrap an external live instance. Redo after undo spawns a fresh instance.
    pub fn adopt_instance(&mut self, type_name: &str, instance: InstanceId) -> EditorResult<ItemId> {
        let id = self.insert("Adopt", CreationStyle::Undelete, |doc| {
            doc.adopt_instance(type_name, instance).map(Some)
        })?;
        Self::inserted(id)
    }

    pub fn paste_component(&mut self, source: &ComponentItem) -> EditorResult<ItemId> {
        let id = self.insert("Paste", CreationStyle::Undelete, |doc| doc.paste_component(source).map(Some))?;
        Self::inserted(id)
    }

    /// `Ok(None)` when the document refuses the clone
    pub fn clone_component(&mut self, id: ItemId) -> EditorResult<Option<ItemId>> {
        self.insert("Clone", CreationStyle::Undelete, |doc| doc.clone_component(id))
    }

    /// `Ok(false)` when the item has children or does not exist
    pub fn delete_component(&mut self, id: ItemId) -> EditorResult<bool> {
        let check = self.document.can_delete_component(id);
        self.delete(id, check)
    }

    /// Change the type of `id` as one undoable step
    pub fn replace_component(&mut self, id: ItemId, type_name: &str) -> EditorResult<ItemId> {
        self.transaction(|editor| {
            let replacement = editor.insert("Replace with", CreationStyle::Replacement, |doc| {
                doc.create_replacement(id, type_name).map(Some)
            })?;
            let replacement = Self::inserted(replacement)?;

            for child in editor.document.child_ids(Some(id)) {
                editor.document.set_parent(child, Some(replacement))?;
                editor.flush();
            }
            if !editor.delete_component(id)? {
                return Err(DocumentError::InvalidArgument(format!("{} could not be removed", id)).into());
            }
            info!(original = %id, %replacement, type_name, "Replaced component");
            Ok(replacement)
        })
    }

    // ── Properties ───────────────────────────────────────────────────────

    pub fn set_property(&mut self, id: ItemId, property: &str, value: Value) -> EditorResult<()> {
        self.transaction(|editor| Ok(editor.document.set_property(id, property, value)?))
    }

    pub fn rename(&mut self, id: ItemId, name: Option<&str>) -> EditorResult<()> {
        self.transaction(|editor| Ok(editor.document.rename(id, name)?))
    }

    pub fn set_expanded(&mut self, id: ItemId, expanded: bool) -> EditorResult<()> {
        self.transaction(|editor| Ok(editor.document.set_expanded(id, expanded)?))
    }

    pub fn set_parent(&mut self, id: ItemId, parent: Option<ItemId>) -> EditorResult<()> {
        self.transaction(|editor| Ok(editor.document.set_parent(id, parent)?))
    }

    // ── Selection ────────────────────────────────────────────────────────

    pub fn select(&mut self, id: ItemId) -> EditorResult<()> {
        self.transaction(|editor| Ok(editor.document.select(id)?))
    }

    pub fn select_range(&mut self, ids: impl IntoIterator<Item = ItemId>) -> EditorResult<()> {
        self.transaction(|editor| Ok(editor.document.select_range(ids)?))
    }

    pub fn add_to_selection(&mut self, id: ItemId) -> EditorResult<()> {
        self.transaction(|editor| Ok(editor.document.add_to_selection(id)?))
    }

    pub fn remove_from_selection(&mut self, id: ItemId) -> EditorResult<()> {
        self.transaction(|editor| {
            editor.document.remove_from_selection(id);
            Ok(())
        })
    }

    pub fn clear_selection(&mut self) -> EditorResult<()> {
        self.transaction(|editor| {
            editor.document.clear_selection();
            Ok(())
        })
    }

    // ── Live synchronization ─────────────────────────────────────────────

    /// Pull live changes without recording them
    pub fn synchronize_from(&mut self) -> EditorResult<()> {
        self.history.push_pause();
        let result = self.document.synchronize_from();
        self.flush();
        self.history.pop_pause()?;
        Ok(result?)
    }

    pub fn synchronize_to(&mut self) -> EditorResult<()> {
        self.document.synchronize_to()?;
        Ok(())
    }

    // ── Undo / redo ──────────────────────────────────────────────────────

    pub fn undo(&mut self) -> EditorResult<bool> {
        Ok(self.step(Direction::Undo)?.is_some())
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        Ok(self.step(Direction::Redo)?.is_some())
    }

    /// Undo until the group containing `handle` has been undone
    pub fn undo_to(&mut self, handle: OperationHandle) -> EditorResult<usize> {
        self.step_to(Direction::Undo, handle)
    }

    /// Redo until the group containing `handle` has been redone
    pub fn redo_to(&mut self, handle: OperationHandle) -> EditorResult<usize> {
        self.step_to(Direction::Redo, handle)
    }

    fn step(&mut self, direction: Direction) -> EditorResult<Option<GroupId>> {
        let winding = match direction {
            Direction::Undo => self.history.begin_undo()?,
            Direction::Redo => self.history.begin_redo()?,
        };
        let Some(mut winding) = winding else {
            return Ok(None);
        };

        winding.replay(&mut self.document);
        // Dispatched, never recorded: the recorder is still winding
        self.flush();

        let group = winding.group();
        let operations = winding.len();
        self.history.finish(winding)?;
        info!(?direction, %group, operations, "Replayed history group");
        Ok(Some(group))
    }

    fn step_to(&mut self, direction: Direction, handle: OperationHandle) -> EditorResult<usize> {
        let target = self
            .history
            .group_on(direction, handle)
            .ok_or(HistoryError::UnknownOperation(handle))?;

        let mut steps = 0;
        while let Some(group) = self.step(direction)? {
            steps += 1;
            if group == target {
                break;
            }
        }
        Ok(steps)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn collect_undoables(&self) -> Vec<OperationHandle> {
        self.history.collect_undoables()
    }

    pub fn collect_redoables(&self) -> Vec<OperationHandle> {
        self.history.collect_redoables()
    }

    pub fn describe(&self, handle: OperationHandle) -> Option<&str> {
        self.history.describe(handle)
    }

    // ── Document lifecycle ───────────────────────────────────────────────

    /// Whether the document changed since it was last saved or loaded
    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty()
    }

    pub fn save(&mut self, path: &Path) -> EditorResult<()> {
        self.document.save(path)?;
        self.history.mark_clean();
        Ok(())
    }

    /// Replace the document with the file at `path`. History starts over.
    pub fn load(&mut self, path: &Path) -> EditorResult<()> {
        self.history.push_pause();
        let result = self.document.load(path);
        self.flush();
        self.history.pop_pause()?;
        self.history.clear();
        result?;
        self.history.mark_clean();
        Ok(())
    }

    /// Empty the document and its history
    pub fn clear(&mut self) -> EditorResult<()> {
        self.history.push_pause();
        self.document.clear();
        self.flush();
        self.history.pop_pause()?;
        self.history.clear();
        self.history.mark_clean();
        Ok(())
    }
}

impl Editor<Grouped> {
    pub fn create_group(&mut self) -> EditorResult<ItemId> {
        let id = self.insert("Create", CreationStyle::Undelete, |doc| doc.create_group().map(Some))?;
        Self::inserted(id)
    }

    pub fn create_group_in(&mut self, parent: Option<ItemId>) -> EditorResult<ItemId> {
        let id = self.insert("Create", CreationStyle::Undelete, |doc| {
            doc.create_group_in(parent).map(Some)
        })?;
        Self::inserted(id)
    }

    pub fn paste_group(&mut self, source: &GroupItem) -> EditorResult<ItemId> {
        let id = self.insert("Paste", CreationStyle::Undelete, |doc| doc.paste_group(source).map(Some))?;
        Self::inserted(id)
    }

    pub fn clone_group(&mut self, id: ItemId) -> EditorResult<Option<ItemId>> {
        self.insert("Clone", CreationStyle::Undelete, |doc| doc.clone_group(id))
    }

    pub fn delete_group(&mut self, id: ItemId) -> EditorResult<bool> {
        let check = self.document.can_delete_group(id);
        self.delete(id, check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn editor() -> Editor<Grouped> {
        Editor::new(Document::new(Arc::new(TypeRegistry::builtin())))
    }

    #[test]
    fn test_create_is_one_undo_step() {
        let mut editor = editor();
        let a = editor.create_component("Widget").unwrap();
        assert_eq!(editor.history().undo_levels(), 1);

        assert!(editor.undo().unwrap());
        assert!(editor.document().find(a).is_none());
        assert!(editor.document().selection().is_empty());

        assert!(editor.redo().unwrap());
        assert!(editor.document().find(a).is_some());
        assert_eq!(editor.document().selection().as_slice(), &[a]);
    }

    #[test]
    fn test_failed_create_records_nothing() {
        let mut editor = editor();
        assert!(editor.create_component("Teapot").is_err());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_refused_delete_records_nothing() {
        let mut editor = editor();
        let a = editor.create_component("Widget").unwrap();
        editor.create_component_in("Widget", Some(a)).unwrap();

        assert!(!editor.delete_component(a).unwrap());
        assert_eq!(editor.history().undo_levels(), 2);
    }

    #[test]
    fn test_replay_is_dispatched_not_recorded() {
        let mut editor = editor();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        editor.subscribe(move |n| sink.borrow_mut().push(n.clone()));

        let a = editor.create_component("Widget").unwrap();
        editor.rename(a, Some("Door")).unwrap();
        seen.borrow_mut().clear();

        editor.undo().unwrap();
        assert!(seen.borrow().contains(&Notification::PropertyChanged {
            item: a,
            property: "name".to_string(),
            old_value: Value::from("Door"),
        }));
        assert_eq!(editor.history().undo_levels(), 1);
        assert_eq!(editor.history().redo_levels(), 1);
    }

    #[test]
    fn test_undo_refused_inside_group() {
        let mut editor = editor();
        editor.create_component("Widget").unwrap();
        editor.push_group().unwrap();
        assert!(matches!(
            editor.undo(),
            Err(crate::errors::EditorError::History(HistoryError::Grouped))
        ));
        editor.pop_group().unwrap();
        assert!(editor.undo().unwrap());
    }

    #[test]
    fn test_paused_edits_are_not_recorded() {
        let mut editor = editor();
        let a = editor.create_component("Widget").unwrap();
        editor.push_pause();
        editor.rename(a, Some("Quiet")).unwrap();
        editor.pop_pause().unwrap();

        assert_eq!(editor.history().undo_levels(), 1);
        assert_eq!(editor.document().find(a).unwrap().name(), "Quiet");
    }

    #[test]
    fn test_group_operations_undo() {
        let mut editor = editor();
        let group = editor.create_group().unwrap();
        let widget = editor.create_component("Widget").unwrap();
        assert_eq!(editor.document().find(widget).unwrap().parent_id(), Some(group));

        assert!(!editor.delete_group(group).unwrap());
        assert!(editor.delete_component(widget).unwrap());
        assert!(editor.delete_group(group).unwrap());
        assert!(editor.document().is_empty());

        editor.undo().unwrap();
        editor.undo().unwrap();
        assert!(editor.document().find_group(group).is_some());
        assert_eq!(editor.document().find(widget).unwrap().parent_id(), Some(group));
        assert_eq!(editor.document().selection().as_slice(), &[widget]);
    }

    #[test]
    fn test_synchronize_from_is_not_recorded() {
        let mut editor = editor();
        let a = editor.create_component("Light").unwrap();
        let instance = editor.document().find_component(a).unwrap().instance().unwrap();

        editor.runtime_mut().set(instance, "intensity", Value::Float(4.0)).unwrap();
        editor.synchronize_from().unwrap();
        assert_eq!(editor.document().property(a, "intensity"), Some(Value::Float(4.0)));
        assert_eq!(editor.history().undo_levels(), 1);
    }
}
