//! The `practicegen init` command.

use std::path::Path;

use anyhow::Result;

fn write_if_missing(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content)?;
        println!("Created {path}");
    }
    Ok(())
}

pub fn execute() -> Result<()> {
    write_if_missing("practicegen.toml", SAMPLE_CONFIG)?;

    std::fs::create_dir_all("contexts")?;
    write_if_missing("contexts/example.toml", EXAMPLE_CONTEXT)?;

    println!("\nNext steps:");
    println!("  1. Edit practicegen.toml with your API keys");
    println!("  2. Run: practicegen list-types");
    println!("  3. Run: practicegen generate --item-type mcq_v1.basic --context contexts/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# practicegen configuration

default_provider = "anthropic"
default_model = "claude-haiku-4-5-20251001"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

[generation]
max_attempts = 3
timeout_ms = 25000
max_tokens = 260
first_temperature = 0.4
repair_temperature = 0.2

[prefetch]
batch_size = 2
target_level = 4
low_watermark = 2
parallel = false
"#;

const EXAMPLE_CONTEXT: &str = r#"# Generation context for one learner and session

[learner]
user_id = "demo"
cefr = "A1"
native_language = "English"
target_language = "Russian"

[session]
mode = "reception"
skills = ["reading"]

[targets]
concept_ids = [101]
grammar_focus = ["prepositional case"]

[[targets.vocab]]
lemma = "банк"
mastery = 0.2

[[targets.vocab]]
lemma = "школа"
mastery = 0.8

[focus]
concept_id = 101
target = "банк"
resolved = "банке"
distractors = ["школе", "парке", "доме"]

[constraints]
max_prompt_words = 10
max_choice_words = 8
require_script = "cyrillic"
forbid_latin = true
"#;
