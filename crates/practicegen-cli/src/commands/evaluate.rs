//! The `practicegen evaluate` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use practicegen_core::ItemRegistry;

pub(crate) fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

pub fn execute(item_path: PathBuf, submission_path: PathBuf) -> Result<()> {
    let registry = ItemRegistry::with_builtins();

    let raw = read_json(&item_path)?;
    let item = registry
        .create(&raw)
        .with_context(|| format!("invalid item: {}", item_path.display()))?;
    let submission = read_json(&submission_path)?;
    let result = registry
        .evaluate(&item, &submission)
        .with_context(|| format!("cannot evaluate {}", submission_path.display()))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
