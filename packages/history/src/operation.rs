//! Recorded operations.
//!
//! An [`Operation`] wraps a [`Reversible`] action with the bookkeeping the
//! recorder needs: a handle, the history group it belongs to, a display
//! name and the `done` flag that makes undo/redo idempotent.

use std::fmt;

/// Identity of one recorded operation.
///
/// Handles are issued in recording order, so a smaller handle was recorded
/// earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationHandle(pub(crate) u64);

impl OperationHandle {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// Identity of a history group. Every operation in a group undoes and
/// redoes together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub(crate) u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// Which way a traversal moves through history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

/// The reversible half of an operation.
///
/// Implementations store whatever they need to move the target back and
/// forth. They are only invoked through [`Operation`], which guards them
/// with the `done` flag.
pub trait Reversible<T> {
    fn undo(&mut self, target: &mut T);
    fn redo(&mut self, target: &mut T);

    /// Property name for property-set actions, used by presentation layers
    fn property(&self) -> Option<&str> {
        None
    }
}

/// Arbitrary undo/redo closure pair
pub struct DelegateAction<T> {
    undo: Box<dyn FnMut(&mut T)>,
    redo: Box<dyn FnMut(&mut T)>,
}

impl<T> DelegateAction<T> {
    pub fn new<U, R>(undo: U, redo: R) -> Self
    where
        U: FnMut(&mut T) + 'static,
        R: FnMut(&mut T) + 'static,
    {
        Self {
            undo: Box::new(undo),
            redo: Box::new(redo),
        }
    }
}

impl<T> Reversible<T> for DelegateAction<T> {
    fn undo(&mut self, target: &mut T) {
        (self.undo)(target);
    }

    fn redo(&mut self, target: &mut T) {
        (self.redo)(target);
    }
}

/// A target whose properties can be read and written by name.
///
/// Property-set operations locate their value through this trait instead of
/// holding a reference into the target.
pub trait PropertyHost {
    /// Locator for the object that owns the property (an item id, say)
    type Key: Clone + fmt::Debug + 'static;
    type Value: Clone + fmt::Debug + PartialEq + 'static;

    fn read_property(&self, key: &Self::Key, property: &str) -> Option<Self::Value>;

    /// Returns `false` when the key or property no longer resolves
    fn write_property(&mut self, key: &Self::Key, property: &str, value: Self::Value) -> bool;
}

/// Property-set action: captures the old value and the value current at
/// construction time.
#[derive(Debug, Clone)]
pub struct PropertyAction<H: PropertyHost> {
    key: H::Key,
    property: String,
    old_value: H::Value,
    new_value: H::Value,
}

impl<H: PropertyHost> PropertyAction<H> {
    pub fn new(key: H::Key, property: impl Into<String>, old_value: H::Value, new_value: H::Value) -> Self {
        Self {
            key,
            property: property.into(),
            old_value,
            new_value,
        }
    }

    pub fn key(&self) -> &H::Key {
        &self.key
    }

    pub fn old_value(&self) -> &H::Value {
        &self.old_value
    }

    pub fn new_value(&self) -> &H::Value {
        &self.new_value
    }
}

impl<H: PropertyHost> Reversible<H> for PropertyAction<H> {
    fn undo(&mut self, target: &mut H) {
        if !target.write_property(&self.key, &self.property, self.old_value.clone()) {
            tracing::warn!(key = ?self.key, property = %self.property, "Property target vanished during undo");
        }
    }

    fn redo(&mut self, target: &mut H) {
        if !target.write_property(&self.key, &self.property, self.new_value.clone()) {
            tracing::warn!(key = ?self.key, property = %self.property, "Property target vanished during redo");
        }
    }

    fn property(&self) -> Option<&str> {
        Some(&self.property)
    }
}

/// One reversible, idempotent unit of recorded history
pub struct Operation<T> {
    handle: OperationHandle,
    group: GroupId,
    name: String,
    done: bool,
    action: Box<dyn Reversible<T>>,
}

impl<T> Operation<T> {
    /// Operations are recorded after their effect happened, so they start
    /// out `done`.
    pub(crate) fn new(
        handle: OperationHandle,
        group: GroupId,
        name: String,
        action: Box<dyn Reversible<T>>,
    ) -> Self {
        Self {
            handle,
            group,
            name,
            done: true,
            action,
        }
    }

    pub fn handle(&self) -> OperationHandle {
        self.handle
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn property(&self) -> Option<&str> {
        self.action.property()
    }

    /// Reverts the operation. No-op when already undone.
    pub fn undo(&mut self, target: &mut T) {
        if !self.done {
            return;
        }
        self.action.undo(target);
        self.done = false;
    }

    /// Reapplies the operation. No-op when already done.
    pub fn redo(&mut self, target: &mut T) {
        if self.done {
            return;
        }
        self.action.redo(target);
        self.done = true;
    }

    pub(crate) fn run(&mut self, direction: Direction, target: &mut T) {
        match direction {
            Direction::Undo => self.undo(target),
            Direction::Redo => self.redo(target),
        }
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("handle", &self.handle)
            .field("group", &self.group)
            .field("name", &self.name)
            .field("done", &self.done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Sheet {
        cells: HashMap<String, i64>,
    }

    impl PropertyHost for Sheet {
        type Key = String;
        type Value = i64;

        fn read_property(&self, key: &String, _property: &str) -> Option<i64> {
            self.cells.get(key).copied()
        }

        fn write_property(&mut self, key: &String, _property: &str, value: i64) -> bool {
            match self.cells.get_mut(key) {
                Some(cell) => {
                    *cell = value;
                    true
                }
                None => false,
            }
        }
    }

    fn delegate_op(handle: u64) -> Operation<i32> {
        Operation::new(
            OperationHandle(handle),
            GroupId(1),
            "Add".to_string(),
            Box::new(DelegateAction::new(|c: &mut i32| *c -= 1, |c: &mut i32| *c += 1)),
        )
    }

    #[test]
    fn test_operation_starts_done() {
        let op = delegate_op(1);
        assert!(op.is_done());
        assert_eq!(op.name(), "Add");
        assert_eq!(op.property(), None);
    }

    #[test]
    fn test_undo_is_idempotent() {
        let mut value = 1;
        let mut op = delegate_op(1);

        op.undo(&mut value);
        op.undo(&mut value);
        assert_eq!(value, 0);
        assert!(!op.is_done());
    }

    #[test]
    fn test_redo_is_idempotent() {
        let mut value = 1;
        let mut op = delegate_op(1);

        // Already done: redo does nothing
        op.redo(&mut value);
        assert_eq!(value, 1);

        op.undo(&mut value);
        op.redo(&mut value);
        op.redo(&mut value);
        assert_eq!(value, 1);
        assert!(op.is_done());
    }

    #[test]
    fn test_property_action_round_trip() {
        let mut sheet = Sheet::default();
        sheet.cells.insert("a1".to_string(), 7);

        let mut op = Operation::new(
            OperationHandle(1),
            GroupId(1),
            "Set a1".to_string(),
            Box::new(PropertyAction::<Sheet>::new("a1".to_string(), "value", 3, 7)),
        );
        assert_eq!(op.property(), Some("value"));

        op.undo(&mut sheet);
        assert_eq!(sheet.cells["a1"], 3);
        op.redo(&mut sheet);
        assert_eq!(sheet.cells["a1"], 7);
    }

    #[test]
    fn test_property_action_missing_target_is_harmless() {
        let mut sheet = Sheet::default();
        let mut action = PropertyAction::<Sheet>::new("zz".to_string(), "value", 1, 2);
        action.undo(&mut sheet);
        assert!(sheet.cells.is_empty());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(OperationHandle(4).to_string(), "op-4");
        assert_eq!(GroupId(2).to_string(), "group-2");
    }
}
