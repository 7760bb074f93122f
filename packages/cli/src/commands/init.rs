use crate::config::{Config, HistoryOptions, DEFAULT_CONFIG_NAME};
use anyhow::{bail, Result};
use atelier_editor::{Document, DocumentKind, DocumentPolicy, Editor, Grouped, Rooted, TypeRegistry, Value};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const REGISTRY_FILE: &str = "registry.json";
const SAMPLE_FILE: &str = "scene.json";

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Document kind (grouped, rooted)
    #[arg(short, long, default_value = "grouped")]
    pub kind: String,

    /// Force overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let kind = match args.kind.as_str() {
        "grouped" => DocumentKind::Grouped,
        "rooted" => DocumentKind::Rooted,
        other => bail!("Invalid document kind: {}. Use: grouped or rooted", other),
    };

    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Atelier project...".bright_blue().bold());

    let registry = TypeRegistry::builtin();
    fs::write(cwd.join(REGISTRY_FILE), registry.to_json()?)?;
    println!("  {} Created {}", "✓".green(), REGISTRY_FILE);

    let config = Config {
        document: kind,
        registry: Some(REGISTRY_FILE.to_string()),
        history: HistoryOptions::default(),
    };

    let sample = cwd.join(SAMPLE_FILE);
    let registry = Arc::new(registry);
    match kind {
        DocumentKind::Grouped => write_grouped_sample(editor::<Grouped>(registry, &config), &sample)?,
        DocumentKind::Rooted => write_rooted_sample(editor::<Rooted>(registry, &config), &sample)?,
    }
    println!("  {} Created {}", "✓".green(), SAMPLE_FILE);

    // Write config file
    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: atelier tree {}", SAMPLE_FILE);
    println!("  2. Add types to {}", REGISTRY_FILE);
    println!("  3. Run: atelier check {}", SAMPLE_FILE);

    Ok(())
}

fn editor<P: DocumentPolicy>(registry: Arc<TypeRegistry>, config: &Config) -> Editor<P> {
    Editor::new(Document::new(registry).with_config(config.editor_config()))
}

fn write_grouped_sample(mut editor: Editor<Grouped>, path: &Path) -> Result<()> {
    let lights = editor.create_group()?;
    editor.rename(lights, Some("Lights"))?;
    editor.create_component("Light")?;

    editor.clear_selection()?;
    let door = editor.create_component("Widget")?;
    editor.rename(door, Some("Door"))?;
    editor.set_property(door, "label", Value::from("Open me"))?;

    editor.save(path)?;
    Ok(())
}

fn write_rooted_sample(mut editor: Editor<Rooted>, path: &Path) -> Result<()> {
    let root = editor.create_component("Scene")?;
    editor.create_component("Camera")?;

    editor.select(root)?;
    let door = editor.create_component("Widget")?;
    editor.rename(door, Some("Door"))?;
    editor.set_property(door, "position", Value::Vector([0.0, 0.0, -4.0]))?;

    editor.save(path)?;
    Ok(())
}
