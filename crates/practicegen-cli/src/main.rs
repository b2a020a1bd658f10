//! practicegen CLI: generate, validate, and evaluate practice items.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "practicegen", version, about = "Prefetching LLM practice-item generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate items through a prefetch buffer and print them as JSON lines
    Generate {
        /// Item type to generate (e.g. "mcq_v1.basic")
        #[arg(long)]
        item_type: String,

        /// Path to a generation context .toml file
        #[arg(long)]
        context: PathBuf,

        /// Number of items to emit
        #[arg(long, default_value = "1")]
        count: usize,

        /// Provider name from the config (default: default_provider)
        #[arg(long)]
        provider: Option<String>,

        /// Model override (default: default_model)
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write items to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a submission against an item
    Evaluate {
        /// Item JSON file
        #[arg(long)]
        item: PathBuf,

        /// Submission JSON file
        #[arg(long)]
        submission: PathBuf,
    },

    /// Construct item JSON files and report which are valid
    Validate {
        /// Item file or directory of .json files
        #[arg(long)]
        items: PathBuf,
    },

    /// List registered item types
    ListTypes,

    /// Create a starter config and example context
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("practicegen=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            item_type,
            context,
            count,
            provider,
            model,
            config,
            output,
        } => {
            commands::generate::execute(commands::generate::GenerateArgs {
                item_type,
                context,
                count,
                provider,
                model,
                config,
                output,
            })
            .await
        }
        Commands::Evaluate { item, submission } => commands::evaluate::execute(item, submission),
        Commands::Validate { items } => commands::validate::execute(items),
        Commands::ListTypes => commands::list_types::execute(),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
