//! Codec Generator CLI
//!
//! Registers every Avro schema found under a directory, then either
//! renders the generated codec source or just checks that every schema
//! compiles.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use avroc::codegen::{self, render};
use avroc::{CodecRegistry, SchemaNode, SchemaStore};

#[derive(Parser)]
#[command(name = "avroc-gen")]
#[command(about = "Compile Avro schemas into codecs")]
struct Cli {
    /// Directory to scan for .avsc / .json schema files
    #[arg(short, long, default_value = ".")]
    schemas: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render generated codec source for every schema
    Generate {
        /// Output directory
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,
    },

    /// Check that every schema registers and compiles
    Check,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let schemas = load_schemas(&cli.schemas)?;
    if schemas.is_empty() {
        bail!("no schema files under {}", cli.schemas.display());
    }

    match cli.command {
        Commands::Generate { output } => {
            let mut store = SchemaStore::new();
            for (identifier, raw) in &schemas {
                store
                    .register(identifier, raw)
                    .with_context(|| format!("registering {identifier}"))?;
            }
            fs::create_dir_all(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            for (identifier, _) in &schemas {
                let module = codegen::generate(&store, identifier)
                    .with_context(|| format!("generating {identifier}"))?;
                let source = render::render(&module);
                let file_name = format!("{}.rs", identifier.replace(['.', ':'], "_"));
                let path = output.join(file_name);
                fs::write(&path, source)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("✅ {identifier} -> {}", path.display());
            }
            Ok(())
        }

        Commands::Check => {
            let mut registry = CodecRegistry::new();
            for (identifier, raw) in &schemas {
                registry
                    .register(identifier, raw)
                    .with_context(|| format!("registering {identifier}"))?;
            }
            let mut failed = 0;
            for (identifier, _) in &schemas {
                match registry.compile(identifier) {
                    Ok(_) => println!("✅ {identifier}"),
                    Err(e) => {
                        println!("❌ {identifier}: {e}");
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} schema(s) failed to compile");
            }
            Ok(())
        }
    }
}

/// Collect `(identifier, schema)` pairs from every schema file under
/// `root`. Named schemas register under their full name, anything else
/// under the file stem.
fn load_schemas(root: &Path) -> anyhow::Result<Vec<(String, Value)>> {
    let mut schemas = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_schema = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "avsc" || ext == "json");
        if !entry.file_type().is_file() || !is_schema {
            continue;
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let raw: Value =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        let identifier = SchemaNode::parse(&raw)
            .ok()
            .and_then(|node| node.fullname())
            .or_else(|| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(String::from)
            })
            .with_context(|| format!("no identifier for {}", path.display()))?;
        schemas.push((identifier, raw));
    }
    schemas.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(schemas)
}
