use super::open_document;
use crate::config::Config;
use anyhow::{bail, Result};
use atelier_editor::{Document, DocumentKind, DocumentPolicy, Grouped, Rooted};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Document files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// What a loaded document contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Summary {
    pub components: usize,
    pub groups: usize,
    pub unbound: usize,
}

pub fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    println!("🔍 {} Atelier Check", "Starting".green().bold());
    println!();

    let config = Config::load(cwd)?;
    let mut failures = 0;

    for file in &args.files {
        let outcome = match config.document {
            DocumentKind::Grouped => open_document::<Grouped>(&config, cwd, file).map(|doc| summarize(&doc)),
            DocumentKind::Rooted => open_document::<Rooted>(&config, cwd, file).map(|doc| summarize(&doc)),
        };

        match outcome {
            Ok(summary) if summary.unbound == 0 => {
                println!(
                    "   {} {} ({} components, {} groups)",
                    "✓".green(),
                    file.display(),
                    summary.components,
                    summary.groups
                );
            }
            Ok(summary) => {
                failures += 1;
                println!(
                    "   {} {} ({} components without a live instance)",
                    "✗".red(),
                    file.display(),
                    summary.unbound
                );
            }
            Err(err) => {
                failures += 1;
                println!("   {} {}: {:#}", "✗".red(), file.display(), err);
            }
        }
    }

    println!();
    if failures > 0 {
        bail!("{} of {} documents failed", failures, args.files.len());
    }
    println!("✨ {} All documents are valid", "Done".green().bold());
    Ok(())
}

pub(crate) fn summarize<P: DocumentPolicy>(document: &Document<P>) -> Summary {
    let components = document.components().len();
    let groups = document.items().filter(|item| item.is_group()).count();
    let unbound = document
        .components()
        .iter()
        .filter(|c| c.instance().is_none())
        .count();
    tracing::debug!(components, groups, unbound, "Checked document");
    Summary {
        components,
        groups,
        unbound,
    }
}
