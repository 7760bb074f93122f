pub mod check;
pub mod init;
pub mod tree;
pub mod types;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use tree::{tree, TreeArgs};
pub use types::{types, TypesArgs};

use crate::config::Config;
use anyhow::{Context, Result};
use atelier_editor::{Document, DocumentPolicy};
use std::path::Path;
use std::sync::Arc;

/// Open `file` (relative to `cwd`) with the configured registry and history limit
pub(crate) fn open_document<P: DocumentPolicy>(config: &Config, cwd: &Path, file: &Path) -> Result<Document<P>> {
    let registry = config.load_registry(cwd)?;
    let mut document = Document::<P>::new(Arc::new(registry)).with_config(config.editor_config());
    let path = cwd.join(file);
    document
        .load(&path)
        .with_context(|| format!("cannot load {}", path.display()))?;
    Ok(document)
}
