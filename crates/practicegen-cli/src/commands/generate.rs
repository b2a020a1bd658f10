//! The `practicegen generate` command.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use practicegen_core::model::{ExerciseType, GenerationContext};
use practicegen_core::{ItemRegistry, PrefetchBuffer, RefillOutcome};
use practicegen_providers::config::load_config_from;
use practicegen_providers::{create_provider, LlmGenerator, PromptSpecs};

pub struct GenerateArgs {
    pub item_type: String,
    pub context: PathBuf,
    pub count: usize,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

fn load_context(path: &Path) -> Result<GenerationContext> {
    tracing::debug!("loading context from {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read context: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse context: {}", path.display()))
}

fn report(outcome: RefillOutcome) {
    match outcome {
        RefillOutcome::Completed(stats) => eprintln!(
            "  Refill: {} appended, {} failed, {} dropped in {} batch(es){}",
            stats.appended,
            stats.failed,
            stats.dropped,
            stats.batches,
            if stats.stalled { " (stalled)" } else { "" },
        ),
        RefillOutcome::Aborted => eprintln!("  Refill aborted"),
        RefillOutcome::NotNeeded | RefillOutcome::AlreadyRunning => {}
    }
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    anyhow::ensure!(args.count >= 1, "count must be at least 1");

    let config = load_config_from(args.config.as_deref())?;
    let context = load_context(&args.context)?;

    let registry = Arc::new(ItemRegistry::with_builtins());
    let specs = Arc::new(PromptSpecs::with_builtins());
    anyhow::ensure!(
        registry.is_supported(&args.item_type),
        "unknown item type '{}' (supported: {})",
        args.item_type,
        registry.supported_types().join(", ")
    );
    anyhow::ensure!(
        specs.contains(&args.item_type),
        "no prompt spec for '{}' (available: {})",
        args.item_type,
        specs.item_types().join(", ")
    );

    let (provider_name, provider_config) = config.provider(args.provider.as_deref())?;
    let provider = create_provider(provider_name, provider_config)?;
    let settings = config.generator_settings(args.model.as_deref());
    eprintln!(
        "Generating {} x {} with {provider_name}/{}",
        args.count, args.item_type, settings.model
    );

    let generator = LlmGenerator::new(provider, registry.clone(), specs, settings);
    let buffer = PrefetchBuffer::builder(
        Arc::new(generator),
        ExerciseType::new(args.item_type.as_str()),
        context,
    )
    .config(config.prefetch_config())
    .registry(registry)
    .build()?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create output: {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };

    let start = Instant::now();
    report(buffer.prime().await);

    let mut written = 0;
    while written < args.count {
        let Some(entry) = buffer.pop() else {
            // An empty queue may still sit at or above a zero low watermark.
            report(buffer.prime().await);
            if buffer.is_empty() {
                break;
            }
            continue;
        };
        writeln!(out, "{}", serde_json::to_string(&entry.candidate)?)?;
        written += 1;
        if written < args.count {
            report(buffer.fill_if_needed().await);
        }
    }
    out.flush()?;

    eprintln!(
        "\nComplete: {written}/{} item(s) ({:.1}s)",
        args.count,
        start.elapsed().as_secs_f64()
    );
    anyhow::ensure!(written > 0, "generation produced no usable items");

    Ok(())
}
