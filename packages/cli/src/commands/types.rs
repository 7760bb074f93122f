use crate::config::Config;
use anyhow::Result;
use atelier_editor::{Accessor, ComponentShape, Value};
use clap::Args;
use colored::Colorize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct TypesArgs {
    /// Show the proxies of every type
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn types(args: TypesArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let registry = config.load_registry(cwd)?;

    println!("{} {} registered types", "📦".bright_blue(), registry.len());
    for shape in registry.shapes() {
        println!("  {} {}", "•".green(), shape.type_name.bold());
        if args.verbose {
            for line in describe_proxies(shape) {
                println!("      {}", line);
            }
        }
    }
    Ok(())
}

pub(crate) fn describe_proxies(shape: &ComponentShape) -> Vec<String> {
    shape
        .proxies
        .iter()
        .map(|proxy| {
            let via = match &proxy.accessor {
                Accessor::Field { field } => format!("field {}", field),
                Accessor::Member { member, field } => format!("member {}.{}", member, field),
                Accessor::Trait { key } => format!("trait {}", key),
                Accessor::Orientation { field } => format!("orientation {}", field),
                Accessor::Custom(custom) => format!("custom {}", custom.label),
            };
            match &proxy.default {
                Some(value) => format!("{}: {} via {} = {}", proxy.name, proxy.kind, via, display_value(value)),
                None => format!("{}: {} via {}", proxy.name, proxy.kind, via),
            }
        })
        .collect()
}

fn display_value(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}
