use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use patchforge_builder::{BuilderConfig, BuilderEngine};

#[derive(Parser)]
#[command(name = "patchforge")]
#[command(about = "PatchForge — safe, revertible file patching")]
#[command(version)]
struct Cli {
    /// Workspace root every target path is contained to
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage a patch replacing FILE's content with the content of SOURCE
    Propose { file: String, source: PathBuf },
    /// Approve and apply a staged patch
    Apply { patch_id: String },
    /// Discard a staged patch
    Reject { patch_id: String },
    /// List staged patches
    Pending,
    /// Render a sandboxed preview of an HTML file
    Preview { source: PathBuf },
    /// List snapshots available for rollback
    Snapshots,
    /// Revert a file to a snapshotted state
    Rollback { snapshot_id: String },
    /// Print the build plan for an intent
    Blueprint { intent: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    patchforge_logging::init_logger(cli.root.join(".patchforge/logs"), "info");

    let engine = BuilderEngine::open(BuilderConfig::at_root(&cli.root)).await?;

    match cli.command {
        Commands::Propose { file, source } => {
            let new_content = tokio::fs::read_to_string(&source).await?;
            let outcome = engine.create_patch(&file, &new_content).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Apply { patch_id } => {
            let applied = engine.apply_patch(&patch_id).await?;
            println!("{}", serde_json::to_string_pretty(&applied)?);
        }
        Commands::Reject { patch_id } => {
            engine.reject_patch(&patch_id).await?;
            println!("rejected {patch_id}");
        }
        Commands::Pending => {
            for id in engine.pending_patches().await? {
                println!("{id}");
            }
        }
        Commands::Preview { source } => {
            let html = tokio::fs::read_to_string(&source).await?;
            let preview = engine.generate_preview(&html)?;
            eprintln!("{}", serde_json::to_string_pretty(&preview.report)?);
            println!("{}", preview.html);
        }
        Commands::Snapshots => {
            let snapshots = engine.list_snapshots().await?;
            println!("{}", serde_json::to_string_pretty(&snapshots)?);
        }
        Commands::Rollback { snapshot_id } => {
            let file = engine.rollback(&snapshot_id).await?;
            println!("restored {file}");
        }
        Commands::Blueprint { intent } => {
            let blueprint = engine.generate_blueprint(&intent);
            println!("{}", serde_json::to_string_pretty(&blueprint)?);
        }
    }

    Ok(())
}
