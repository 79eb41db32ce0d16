//! Generate config.toml and config.schema.json to the schemas/ directory.
//!
//! Run with: cargo run -p wecom-core --example generate_config
//! Pass `--check` to verify the committed files are up to date instead.

use std::path::PathBuf;

use anyhow::Context as _;
use wecom_core::schema::validate_generated_files;
use wecom_core::{APP_NAME, write_generated_files};

/// Repository URL for schema $id.
const REPO_URL: &str = "https://github.com/byteowlz/wecom";

fn main() -> anyhow::Result<()> {
    // Find workspace root (where schemas/ lives)
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")?;
    let crate_root = PathBuf::from(&manifest_dir);
    let workspace_root = crate_root
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .context("could not find workspace root")?;

    let schemas_dir = workspace_root.join("schemas");

    if std::env::args().any(|arg| arg == "--check") {
        validate_generated_files(&schemas_dir, APP_NAME, REPO_URL)?;
        println!("{} is up to date.", schemas_dir.display());
        return Ok(());
    }

    println!("Generating config files to {}...", schemas_dir.display());
    write_generated_files(&schemas_dir, APP_NAME, REPO_URL)?;
    println!("Done! Generated:");
    println!("  - {}/config.schema.json", schemas_dir.display());
    println!("  - {}/config.toml", schemas_dir.display());

    Ok(())
}
