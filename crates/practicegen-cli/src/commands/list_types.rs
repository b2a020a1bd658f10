//! The `practicegen list-types` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use practicegen_core::ItemRegistry;
use practicegen_providers::PromptSpecs;

pub fn execute() -> Result<()> {
    let registry = ItemRegistry::with_builtins();
    let specs = PromptSpecs::with_builtins();

    let mut table = Table::new();
    table.set_header(vec!["Item type", "Generation"]);
    for item_type in registry.supported_types() {
        let generation = if specs.contains(&item_type) {
            "prompt spec"
        } else {
            "evaluate only"
        };
        table.add_row(vec![Cell::new(&item_type), Cell::new(generation)]);
    }

    println!("{table}");
    Ok(())
}
