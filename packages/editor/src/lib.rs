//! # Atelier Editor
//!
//! Editable-document core: typed items mirrored onto live runtime objects,
//! selection tracking, and undoable editing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ registry: type name → component shape       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: items + selection + outbox        │
//! │  - Grouped or Rooted placement policy       │
//! │  - Each component bound to a live instance  │
//! │  - Proxies push/pull properties             │
//! │  - Load/save JSON tokens                    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: records notifications as history    │
//! │  - One group per user action                │
//! │  - Undo/redo replays a whole group          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Document is source of truth**: live objects are pushed to, and only
//!    pulled from on request
//! 2. **Notifications drive history**: the editor records what the document
//!    reports, so every mutation path is undoable
//! 3. **Policies are types**: group operations only exist on
//!    `Document<Grouped>`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atelier_editor::{Document, Editor, Grouped, TypeRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(TypeRegistry::builtin());
//! let mut editor = Editor::new(Document::<Grouped>::new(registry));
//!
//! let group = editor.create_group()?;
//! let lamp = editor.create_component("Light")?;
//! editor.rename(lamp, Some("Lamp"))?;
//!
//! editor.undo()?;
//! editor.save("scene.json".as_ref())?;
//! ```

mod config;
mod document;
mod editor;
mod errors;
mod grouped;
mod hierarchy;
mod id;
mod item;
mod notification;
mod persistence;
mod policy;
mod proxy;
mod registry;
mod rooted;
mod runtime;
mod selection;
mod value;

pub use config::EditorConfig;
pub use document::{DeleteCheck, Document};
pub use editor::Editor;
pub use errors::{
    DocumentError, DocumentResult, EditorError, EditorResult, LoadDocumentError, PropertyError, RegistryError,
    SaveDocumentError,
};
pub use hierarchy::{ParentFilter, Relationship};
pub use id::ItemId;
pub use item::{ComponentItem, GroupItem, Item, ItemRef, PropertyDescriptor, BUILTIN_PROPERTIES, GROUP_TYPE};
pub use notification::Notification;
pub use persistence::{ComponentToken, DocumentTokens, GroupToken, DOCUMENT_FORMAT};
pub use policy::{CreationStyle, DocumentKind, DocumentPolicy, Grouped, Rooted, SelectionEffect};
pub use proxy::{degrees_to_matrix, matrix_to_degrees, Accessor, CustomAccessor, CustomGetter, CustomSetter, Proxy};
pub use registry::{ComponentShape, NameFormat, ProxySpec, TypeRegistry};
pub use runtime::{InstanceError, InstanceId, LiveObject, Runtime, SceneRuntime};
pub use selection::{Selection, SelectionEvent};
pub use value::{Value, ValueKind, IDENTITY_MATRIX};

// Re-export history types the editor API exposes
pub use atelier_history::{Direction, GroupId, HistoryError, OperationHandle, OperationRecorder, DEFAULT_MAX_LEVELS};
