use super::open_document;
use crate::config::Config;
use anyhow::Result;
use atelier_editor::{Document, DocumentKind, DocumentPolicy, Grouped, ItemRef, Rooted};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Document file to print
    pub file: PathBuf,

    /// Show item ids
    #[arg(short, long)]
    pub ids: bool,
}

pub fn tree(args: TreeArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let lines = match config.document {
        DocumentKind::Grouped => render(&open_document::<Grouped>(&config, cwd, &args.file)?, args.ids),
        DocumentKind::Rooted => render(&open_document::<Rooted>(&config, cwd, &args.file)?, args.ids),
    };

    println!("{} ({})", args.file.display().to_string().bold(), config.document);
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// One indented line per item, depth first
pub(crate) fn render<P: DocumentPolicy>(document: &Document<P>, ids: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for item in document.children(None) {
        render_item(document, item, 1, ids, &mut lines);
    }
    lines
}

fn render_item<P: DocumentPolicy>(
    document: &Document<P>,
    item: ItemRef<'_>,
    depth: usize,
    ids: bool,
    lines: &mut Vec<String>,
) {
    let indent = "  ".repeat(depth);
    let marker = if item.is_group() {
        if item.expanded() { "▾" } else { "▸" }
    } else {
        "•"
    };
    let kind = if item.is_group() {
        item.item_type().yellow().to_string()
    } else {
        item.item_type().cyan().to_string()
    };
    let mut line = format!("{}{} {} {}", indent, marker, item.name(), kind);
    if ids {
        line.push_str(&format!(" {}", item.id().short().dimmed()));
    }
    lines.push(line);

    for child in document.children(Some(item.id())) {
        render_item(document, child, depth + 1, ids, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_editor::TypeRegistry;
    use std::sync::Arc;

    #[test]
    fn test_render_nests_children() {
        colored::control::set_override(false);
        let mut doc = Document::<Grouped>::new(Arc::new(TypeRegistry::builtin()));
        let group = doc.create_group().unwrap();
        doc.rename(group, Some("Lights")).unwrap();
        let lamp = doc.create_component("Light").unwrap();
        doc.rename(lamp, Some("Lamp")).unwrap();

        let lines = render(&doc, false);
        assert_eq!(lines, vec!["  ▾ Lights Group", "    • Lamp Light"]);
    }
}
