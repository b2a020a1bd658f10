//! The `practicegen validate` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use practicegen_core::ItemRegistry;

use super::evaluate::read_json;

fn item_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        anyhow::ensure!(path.exists(), "path not found: {}", path.display());
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)
        .with_context(|| format!("failed to read directory: {}", path.display()))?
    {
        let entry_path = entry?.path();
        if entry_path.extension().is_some_and(|ext| ext == "json") {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn execute(items_path: PathBuf) -> Result<()> {
    let registry = ItemRegistry::with_builtins();
    let files = item_files(&items_path)?;
    anyhow::ensure!(!files.is_empty(), "no .json files in {}", items_path.display());

    let mut failures = 0;
    for file in &files {
        let name = file.display();
        match read_json(file).and_then(|raw| Ok(registry.create(&raw)?)) {
            Ok(item) => println!("  OK    {name} ({})", item.item_type()),
            Err(e) => {
                failures += 1;
                println!("  FAIL  {name}: {e:#}");
            }
        }
    }

    if failures == 0 {
        println!("All {} item(s) valid.", files.len());
        Ok(())
    } else {
        anyhow::bail!("{failures} of {} item(s) invalid", files.len())
    }
}
