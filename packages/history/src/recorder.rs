//! # Operation Recorder
//!
//! Tracks operation history and replays it in strict LIFO order.
//!
//! ## Design
//!
//! - Each operation is recorded after its effect already happened
//! - Operations recorded while a group is open share that group's id
//! - Undo/redo always move a whole group between the two stacks
//! - New operations clear the redo stack
//! - Recording is suppressed while paused or while an undo/redo winds
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = OperationRecorder::new();
//!
//! history.push_group()?;
//! doc.rename(id, "Door");
//! history.record_property(&doc, "Rename", id, "name", old_name);
//! history.pop_group()?;
//!
//! history.undo(&mut doc)?;
//! history.redo(&mut doc)?;
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::operation::{DelegateAction, PropertyAction};
use crate::{Direction, GroupId, HistoryError, Operation, OperationHandle, PropertyHost, Reversible};
use tracing::{debug, trace};

/// Default number of history groups retained on the undo stack
pub const DEFAULT_MAX_LEVELS: usize = 100;

/// Undo/redo engine for one document or controller
pub struct OperationRecorder<T> {
    /// Applied operations (most recent last)
    undo_stack: Vec<Operation<T>>,

    /// Undone operations (next to redo last)
    redo_stack: Vec<Operation<T>>,

    pause_depth: usize,
    group_depth: usize,

    /// Valid while `group_depth > 0`
    current_group: Option<GroupId>,

    /// Set while an undo/redo traversal is in progress
    winding: bool,

    next_handle: u64,
    next_group: u64,

    /// Maximum number of groups on the undo stack (0 = unlimited)
    max_levels: usize,

    /// Group on top of the undo stack when last marked clean.
    /// `None` means the clean state is unreachable.
    clean_point: Option<Option<GroupId>>,
}

impl<T: 'static> OperationRecorder<T> {
    /// Create a recorder retaining [`DEFAULT_MAX_LEVELS`] groups
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_MAX_LEVELS)
    }

    /// Create a recorder with a custom group limit (0 = unlimited)
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pause_depth: 0,
            group_depth: 0,
            current_group: None,
            winding: false,
            next_handle: 0,
            next_group: 0,
            max_levels,
            clean_point: Some(None),
        }
    }

    // ── Pause ────────────────────────────────────────────────────────────

    /// Suppress recording until the matching [`pop_pause`](Self::pop_pause)
    pub fn push_pause(&mut self) {
        self.pause_depth += 1;
    }

    pub fn pop_pause(&mut self) -> Result<(), HistoryError> {
        if self.pause_depth == 0 {
            return Err(HistoryError::NotPaused);
        }
        self.pause_depth -= 1;
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.pause_depth > 0
    }

    // ── Group ────────────────────────────────────────────────────────────

    /// Open a history group. Nested calls join the outermost group.
    pub fn push_group(&mut self) -> Result<(), HistoryError> {
        if self.is_paused() {
            return Err(HistoryError::Paused);
        }
        if self.group_depth == 0 {
            self.current_group = Some(self.mint_group());
        }
        self.group_depth += 1;
        Ok(())
    }

    pub fn pop_group(&mut self) -> Result<(), HistoryError> {
        if self.group_depth == 0 {
            return Err(HistoryError::NotGrouped);
        }
        self.group_depth -= 1;
        if self.group_depth == 0 {
            self.current_group = None;
        }
        Ok(())
    }

    pub fn is_grouped(&self) -> bool {
        self.group_depth > 0
    }

    pub fn current_group(&self) -> Option<GroupId> {
        self.current_group
    }

    pub fn is_winding(&self) -> bool {
        self.winding
    }

    // ── Recording ────────────────────────────────────────────────────────

    /// Record an arbitrary undo/redo pair.
    ///
    /// Returns `None` when the record was dropped (paused or winding).
    pub fn record<U, R>(&mut self, name: impl Into<String>, undo: U, redo: R) -> Option<OperationHandle>
    where
        U: FnMut(&mut T) + 'static,
        R: FnMut(&mut T) + 'static,
    {
        self.record_action(name.into(), Box::new(DelegateAction::new(undo, redo)))
    }

    /// Record a property change. The current value is read from `host` now,
    /// so call this after the property was written.
    pub fn record_property(
        &mut self,
        host: &T,
        name: impl Into<String>,
        key: T::Key,
        property: &str,
        old_value: T::Value,
    ) -> Option<OperationHandle>
    where
        T: PropertyHost,
    {
        if !self.is_accepting() {
            return None;
        }
        let Some(current) = host.read_property(&key, property) else {
            tracing::warn!(key = ?key, property, "Cannot record change of unreadable property");
            return None;
        };
        let action = PropertyAction::<T>::new(key, property, old_value, current);
        self.record_action(name.into(), Box::new(action))
    }

    /// Record a prepared action
    pub fn record_action(&mut self, name: String, action: Box<dyn Reversible<T>>) -> Option<OperationHandle> {
        if !self.is_accepting() {
            trace!(name = %name, paused = self.is_paused(), winding = self.winding, "Record dropped");
            return None;
        }

        let handle = OperationHandle(self.next_handle);
        self.next_handle += 1;
        let group = match self.current_group {
            Some(group) => group,
            None => self.mint_group(),
        };

        debug!(%handle, %group, name = %name, "Recording operation");
        self.undo_stack.push(Operation::new(handle, group, name, action));

        // New action invalidates the redo branch
        if !self.redo_stack.is_empty() {
            self.redo_stack.clear();
            if matches!(self.clean_point, Some(Some(g)) if !self.undo_stack.iter().any(|op| op.group() == g)) {
                self.clean_point = None;
            }
        }

        self.trim();
        Some(handle)
    }

    fn is_accepting(&self) -> bool {
        !self.is_paused() && !self.winding
    }

    fn mint_group(&mut self) -> GroupId {
        let group = GroupId(self.next_group);
        self.next_group += 1;
        group
    }

    /// Drop the oldest groups beyond `max_levels`
    fn trim(&mut self) {
        if self.max_levels == 0 {
            return;
        }
        while self.undo_groups().len() > self.max_levels {
            let Some(oldest) = self.undo_stack.first().map(|op| op.group()) else {
                break;
            };
            self.undo_stack.retain(|op| op.group() != oldest);
            if self.clean_point == Some(Some(oldest)) {
                self.clean_point = None;
            }
        }
    }

    // ── Undo / redo ──────────────────────────────────────────────────────

    /// Undo the most recent group. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, target: &mut T) -> Result<bool, HistoryError> {
        Ok(self.step(Direction::Undo, target)?.is_some())
    }

    /// Redo the most recently undone group. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, target: &mut T) -> Result<bool, HistoryError> {
        Ok(self.step(Direction::Redo, target)?.is_some())
    }

    /// Undo groups until the group containing `handle` has been undone
    pub fn undo_to(&mut self, handle: OperationHandle, target: &mut T) -> Result<usize, HistoryError> {
        self.step_to(Direction::Undo, handle, target)
    }

    /// Redo groups until the group containing `handle` has been redone
    pub fn redo_to(&mut self, handle: OperationHandle, target: &mut T) -> Result<usize, HistoryError> {
        self.step_to(Direction::Redo, handle, target)
    }

    fn step(&mut self, direction: Direction, target: &mut T) -> Result<Option<GroupId>, HistoryError> {
        let Some(mut winding) = self.begin(direction)? else {
            return Ok(None);
        };
        winding.replay(target);
        let group = winding.group();
        self.finish(winding)?;
        Ok(Some(group))
    }

    fn step_to(&mut self, direction: Direction, handle: OperationHandle, target: &mut T) -> Result<usize, HistoryError> {
        let group = self
            .group_on(direction, handle)
            .ok_or(HistoryError::UnknownOperation(handle))?;
        self.ensure_can_wind()?;

        let mut steps = 0;
        while let Some(processed) = self.step(direction, target)? {
            steps += 1;
            if processed == group {
                break;
            }
        }
        Ok(steps)
    }

    /// Group of `handle` if it sits on the stack `direction` pops from
    pub fn group_on(&self, direction: Direction, handle: OperationHandle) -> Option<GroupId> {
        self.stack(direction)
            .iter()
            .find(|op| op.handle() == handle)
            .map(|op| op.group())
    }

    /// Detach the most recent undo group and start winding.
    ///
    /// The caller must [`replay`](Winding::replay) it and hand it back to
    /// [`finish`](Self::finish). Until then `record` is a no-op and further
    /// traversals are refused.
    pub fn begin_undo(&mut self) -> Result<Option<Winding<T>>, HistoryError> {
        self.begin(Direction::Undo)
    }

    /// Detach the most recent redo group and start winding
    pub fn begin_redo(&mut self) -> Result<Option<Winding<T>>, HistoryError> {
        self.begin(Direction::Redo)
    }

    fn begin(&mut self, direction: Direction) -> Result<Option<Winding<T>>, HistoryError> {
        self.ensure_can_wind()?;

        let stack = self.stack_mut(direction);
        let Some(group) = stack.last().map(|op| op.group()) else {
            return Ok(None);
        };

        // Newest first: undo reverts in LIFO order, and the redo stack holds
        // a group's oldest operation on top.
        let mut operations = Vec::new();
        let mut index = stack.len();
        while index > 0 {
            index -= 1;
            if stack[index].group() == group {
                operations.push(stack.remove(index));
            }
        }

        debug!(?direction, %group, operations = operations.len(), "Winding history");
        self.winding = true;
        Ok(Some(Winding {
            direction,
            group,
            operations,
        }))
    }

    /// Complete a traversal started with `begin_undo` / `begin_redo`
    pub fn finish(&mut self, winding: Winding<T>) -> Result<(), HistoryError> {
        if !self.winding {
            return Err(HistoryError::NotWinding);
        }
        let Winding {
            direction,
            operations,
            ..
        } = winding;
        match direction {
            Direction::Undo => self.redo_stack.extend(operations),
            Direction::Redo => self.undo_stack.extend(operations),
        }
        self.winding = false;
        Ok(())
    }

    fn ensure_can_wind(&self) -> Result<(), HistoryError> {
        if self.winding {
            return Err(HistoryError::Winding);
        }
        if self.is_grouped() {
            return Err(HistoryError::Grouped);
        }
        Ok(())
    }

    fn stack(&self, direction: Direction) -> &Vec<Operation<T>> {
        match direction {
            Direction::Undo => &self.undo_stack,
            Direction::Redo => &self.redo_stack,
        }
    }

    fn stack_mut(&mut self, direction: Direction) -> &mut Vec<Operation<T>> {
        match direction {
            Direction::Undo => &mut self.undo_stack,
            Direction::Redo => &mut self.redo_stack,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// One handle per undoable group, most recent group first. The handle
    /// is the earliest-recorded operation of its group.
    pub fn collect_undoables(&self) -> Vec<OperationHandle> {
        Self::representatives(&self.undo_stack)
    }

    /// One handle per redoable group, next-to-redo first
    pub fn collect_redoables(&self) -> Vec<OperationHandle> {
        Self::representatives(&self.redo_stack)
    }

    fn representatives(stack: &[Operation<T>]) -> Vec<OperationHandle> {
        let mut seen = HashSet::new();
        stack
            .iter()
            .rev()
            .filter(|op| seen.insert(op.group()))
            .filter_map(|op| {
                stack
                    .iter()
                    .filter(|other| other.group() == op.group())
                    .map(|other| other.handle())
                    .min()
            })
            .collect()
    }

    fn undo_groups(&self) -> HashSet<GroupId> {
        self.undo_stack.iter().map(|op| op.group()).collect()
    }

    /// Name of a recorded operation
    pub fn describe(&self, handle: OperationHandle) -> Option<&str> {
        self.find(handle).map(|op| op.name())
    }

    pub fn find(&self, handle: OperationHandle) -> Option<&Operation<T>> {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .find(|op| op.handle() == handle)
    }

    /// Name of the group the next `undo` would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.collect_undoables().first().and_then(|h| self.describe(*h))
    }

    /// Name of the group the next `redo` would reapply
    pub fn redo_description(&self) -> Option<&str> {
        self.collect_redoables().first().and_then(|h| self.describe(*h))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable groups
    pub fn undo_levels(&self) -> usize {
        self.undo_groups().len()
    }

    /// Number of redoable groups
    pub fn redo_levels(&self) -> usize {
        self.redo_stack
            .iter()
            .map(|op| op.group())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Drop all history. Pause and group state is left alone.
    pub fn clear(&mut self) {
        let was_clean = !self.is_dirty();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.clean_point = if was_clean { Some(None) } else { None };
    }

    // ── Clean point ──────────────────────────────────────────────────────

    /// Remember the current position as the saved state
    pub fn mark_clean(&mut self) {
        self.clean_point = Some(self.undo_stack.last().map(|op| op.group()));
    }

    /// Whether history moved away from the last clean point
    pub fn is_dirty(&self) -> bool {
        self.clean_point != Some(self.undo_stack.last().map(|op| op.group()))
    }
}

impl<T: 'static> Default for OperationRecorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for OperationRecorder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRecorder")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("pause_depth", &self.pause_depth)
            .field("group_depth", &self.group_depth)
            .field("winding", &self.winding)
            .field("max_levels", &self.max_levels)
            .finish()
    }
}

/// A history group detached from the recorder while it is replayed
#[must_use = "a winding must be handed back to OperationRecorder::finish"]
pub struct Winding<T> {
    direction: Direction,
    group: GroupId,
    operations: Vec<Operation<T>>,
}

impl<T> Winding<T> {
    /// Run every operation of the group in the winding direction
    pub fn replay(&mut self, target: &mut T) {
        for operation in &mut self.operations {
            operation.run(self.direction, target);
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn handles(&self) -> Vec<OperationHandle> {
        self.operations.iter().map(|op| op.handle()).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl<T> fmt::Debug for Winding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Winding")
            .field("direction", &self.direction)
            .field("group", &self.group)
            .field("operations", &self.operations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(history: &mut OperationRecorder<i32>, value: &mut i32, amount: i32) -> Option<OperationHandle> {
        *value += amount;
        history.record(
            format!("Add {}", amount),
            move |v: &mut i32| *v -= amount,
            move |v: &mut i32| *v += amount,
        )
    }

    #[test]
    fn test_recorder_creation() {
        let history = OperationRecorder::<i32>::new();
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(!history.is_dirty());
        assert_eq!(history.max_levels(), DEFAULT_MAX_LEVELS);
    }

    #[test]
    fn test_record_and_undo() {
        let mut value = 0;
        let mut history = OperationRecorder::new();
        add(&mut history, &mut value, 5);

        assert!(history.undo(&mut value).unwrap());
        assert_eq!(value, 0);
        assert_eq!(history.redo_levels(), 1);

        assert!(history.redo(&mut value).unwrap());
        assert_eq!(value, 5);
        assert_eq!(history.undo_levels(), 1);
    }

    #[test]
    fn test_nothing_to_undo() {
        let mut value = 0;
        let mut history = OperationRecorder::<i32>::new();
        assert!(!history.undo(&mut value).unwrap());
        assert!(!history.redo(&mut value).unwrap());
    }

    #[test]
    fn test_paused_records_are_dropped() {
        let mut value = 0;
        let mut history = OperationRecorder::new();

        history.push_pause();
        history.push_pause();
        assert!(add(&mut history, &mut value, 1).is_none());
        history.pop_pause().unwrap();
        assert!(add(&mut history, &mut value, 1).is_none());
        history.pop_pause().unwrap();

        assert!(!history.can_undo());
        assert_eq!(history.pop_pause(), Err(HistoryError::NotPaused));
    }

    #[test]
    fn test_group_cannot_open_while_paused() {
        let mut history = OperationRecorder::<i32>::new();
        history.push_pause();
        assert_eq!(history.push_group(), Err(HistoryError::Paused));
    }

    #[test]
    fn test_group_undoes_as_unit() {
        let mut value = 0;
        let mut history = OperationRecorder::new();

        history.push_group().unwrap();
        add(&mut history, &mut value, 1);
        history.push_group().unwrap();
        add(&mut history, &mut value, 10);
        history.pop_group().unwrap();
        add(&mut history, &mut value, 100);
        history.pop_group().unwrap();

        assert_eq!(history.undo_levels(), 1);
        history.undo(&mut value).unwrap();
        assert_eq!(value, 0);
        history.redo(&mut value).unwrap();
        assert_eq!(value, 111);
    }

    #[test]
    fn test_redo_replays_in_original_order() {
        let mut log: Vec<&'static str> = Vec::new();
        let mut history = OperationRecorder::<Vec<&'static str>>::new();

        history.push_group().unwrap();
        for name in ["a", "b", "c"] {
            log.push(name);
            history.record(
                name,
                move |l: &mut Vec<&'static str>| l.push("undo"),
                move |l: &mut Vec<&'static str>| l.push(name),
            );
        }
        history.pop_group().unwrap();

        log.clear();
        history.undo(&mut log).unwrap();
        log.clear();
        history.redo(&mut log).unwrap();
        assert_eq!(log, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_undo_refused_while_grouped() {
        let mut value = 0;
        let mut history = OperationRecorder::new();
        add(&mut history, &mut value, 1);

        history.push_group().unwrap();
        assert_eq!(history.undo(&mut value), Err(HistoryError::Grouped));
        assert_eq!(history.redo(&mut value), Err(HistoryError::Grouped));
        history.pop_group().unwrap();
        assert_eq!(history.pop_group(), Err(HistoryError::NotGrouped));
    }

    #[test]
    fn test_winding_blocks_record_and_traversal() {
        let mut value = 0;
        let mut history = OperationRecorder::new();
        add(&mut history, &mut value, 3);

        let mut winding = history.begin_undo().unwrap().unwrap();
        assert!(history.is_winding());
        assert!(add(&mut history, &mut value, 1).is_none());
        assert!(matches!(history.begin_redo(), Err(HistoryError::Winding)));
        assert_eq!(history.undo(&mut value), Err(HistoryError::Winding));

        winding.replay(&mut value);
        history.finish(winding).unwrap();
        assert!(!history.is_winding());
        assert_eq!(value, 1);
        assert_eq!(history.redo_levels(), 1);
    }

    #[test]
    fn test_finish_without_begin() {
        let mut value = 0;
        let mut history = OperationRecorder::new();
        add(&mut history, &mut value, 3);
        let winding = history.begin_undo().unwrap().unwrap();
        history.finish(winding).unwrap();

        let mut other = OperationRecorder::new();
        add(&mut other, &mut value, 1);
        let stray = other.begin_undo().unwrap().unwrap();
        assert_eq!(history.finish(stray), Err(HistoryError::NotWinding));
    }

    #[test]
    fn test_new_record_clears_redo() {
        let mut value = 0;
        let mut history = OperationRecorder::new();
        add(&mut history, &mut value, 1);
        history.undo(&mut value).unwrap();
        assert!(history.can_redo());

        add(&mut history, &mut value, 2);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_to_handle() {
        let mut value = 0;
        let mut history = OperationRecorder::new();
        add(&mut history, &mut value, 1);
        let second = add(&mut history, &mut value, 10).unwrap();
        add(&mut history, &mut value, 100);

        assert_eq!(history.undo_to(second, &mut value).unwrap(), 2);
        assert_eq!(value, 1);

        assert_eq!(history.redo_to(second, &mut value).unwrap(), 1);
        assert_eq!(value, 11);
    }

    #[test]
    fn test_undo_to_unknown_handle_fails_loudly() {
        let mut value = 0;
        let mut history = OperationRecorder::new();
        let first = add(&mut history, &mut value, 1).unwrap();
        add(&mut history, &mut value, 2);

        assert_eq!(
            history.redo_to(first, &mut value),
            Err(HistoryError::UnknownOperation(first))
        );
        // Nothing moved
        assert_eq!(value, 3);
        assert_eq!(history.undo_levels(), 2);
    }

    #[test]
    fn test_collect_representatives() {
        let mut value = 0;
        let mut history = OperationRecorder::new();

        let lone = add(&mut history, &mut value, 1).unwrap();
        history.push_group().unwrap();
        let first = add(&mut history, &mut value, 2).unwrap();
        add(&mut history, &mut value, 3);
        history.pop_group().unwrap();

        assert_eq!(history.collect_undoables(), vec![first, lone]);
        assert_eq!(history.undo_description(), Some("Add 2"));

        history.undo(&mut value).unwrap();
        assert_eq!(history.collect_undoables(), vec![lone]);
        assert_eq!(history.collect_redoables(), vec![first]);
        assert_eq!(history.redo_description(), Some("Add 2"));
    }

    #[test]
    fn test_max_levels_drop_oldest_group() {
        let mut value = 0;
        let mut history = OperationRecorder::with_max_levels(2);
        let first = add(&mut history, &mut value, 1).unwrap();
        add(&mut history, &mut value, 2);
        add(&mut history, &mut value, 3);

        assert_eq!(history.undo_levels(), 2);
        assert!(history.describe(first).is_none());
    }

    #[test]
    fn test_clean_point_tracking() {
        let mut value = 0;
        let mut history = OperationRecorder::new();
        add(&mut history, &mut value, 1);
        assert!(history.is_dirty());

        history.mark_clean();
        assert!(!history.is_dirty());

        add(&mut history, &mut value, 2);
        assert!(history.is_dirty());
        history.undo(&mut value).unwrap();
        assert!(!history.is_dirty());

        // Replacing the redo branch past the clean point makes it unreachable
        history.undo(&mut value).unwrap();
        add(&mut history, &mut value, 5);
        history.undo(&mut value).unwrap();
        assert!(history.is_dirty());
    }

    #[test]
    fn test_clear_resets_stacks() {
        let mut value = 0;
        let mut history = OperationRecorder::new();
        add(&mut history, &mut value, 1);
        history.undo(&mut value).unwrap();
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
