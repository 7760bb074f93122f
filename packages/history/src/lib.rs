//! # Atelier History
//!
//! Generic undo/redo engine for Atelier documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ caller mutates its target (document, etc.)  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ OperationRecorder::record / record_property │
//! │  - tagged with the open group id            │
//! │  - dropped while paused or winding          │
//! │  - clears the redo branch                   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ undo / redo: one whole group, LIFO          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The recorder never holds a reference to its target. Undo and redo take
//! the target by `&mut`, so an operation replay can't reach back into the
//! recorder. Controllers that need to observe side effects while the replay
//! is still "winding" use [`OperationRecorder::begin_undo`] /
//! [`OperationRecorder::begin_redo`] and [`OperationRecorder::finish`].
//!
//! ## Usage
//!
//! ```rust
//! use atelier_history::OperationRecorder;
//!
//! let mut counter = 0i32;
//! let mut history = OperationRecorder::<i32>::new();
//!
//! history.push_group().unwrap();
//! counter += 1;
//! history.record("Add one", |c: &mut i32| *c -= 1, |c: &mut i32| *c += 1);
//! counter += 2;
//! history.record("Add two", |c: &mut i32| *c -= 2, |c: &mut i32| *c += 2);
//! history.pop_group().unwrap();
//!
//! history.undo(&mut counter).unwrap();
//! assert_eq!(counter, 0);
//! history.redo(&mut counter).unwrap();
//! assert_eq!(counter, 3);
//! ```

mod errors;
mod operation;
mod recorder;

pub use errors::HistoryError;
pub use operation::{
    DelegateAction, Direction, GroupId, Operation, OperationHandle, PropertyAction, PropertyHost,
    Reversible,
};
pub use recorder::{OperationRecorder, Winding, DEFAULT_MAX_LEVELS};
