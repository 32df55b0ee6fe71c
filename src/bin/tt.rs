use std::{
    fs::{read_to_string, write},
    io::{Write, stdout},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use temas::{
    config::TopicConfig,
    tem::{
        catalog::LabelCatalog,
        embeddings::{ComputeDevice, SentenceEmbeddingsModelType},
        model::parse_reviews,
        topics::TopicModeller,
    },
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// tt: A Topic Tagger
#[derive(Parser)]
#[command(name = "tt")]
#[command(about = "Groups annotated reviews into named topics", long_about = None)]
struct Cli {
    /// Configuration file. Defaults to temas.toml in the user config dir.
    #[arg(short, long, global = true, env = "TEMAS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign a topic to every review in a JSON array.
    Assign {
        /// JSON file holding an array of annotated reviews.
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the reviews with topics. Stdout if omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured embedding model.
        #[arg(short, long, value_enum)]
        model: Option<SentenceEmbeddingsModelType>,

        /// Override the configured compute device.
        #[arg(short, long, value_enum)]
        device: Option<ComputeDevice>,
    },

    /// Inspect or clear the persisted candidate labels.
    Labels {
        #[command(subcommand)]
        command: LabelsCommand,
    },

    /// Print the resolved configuration.
    Config,
}

#[derive(Subcommand)]
enum LabelsCommand {
    /// Print the candidate labels, one per line.
    Show,
    /// Delete the label file so the next batch derives a fresh set.
    Reset,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("temas=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = TopicConfig::load(cli.config.as_deref()).with_context(|| "loading configuration")?;

    match &cli.command {
        Commands::Assign {
            input,
            output,
            model,
            device,
        } => {
            let config = TopicConfig {
                model: model.unwrap_or(config.model),
                device: device.unwrap_or(config.device),
                ..config
            };
            handle_assign(&config, input, output.as_deref())
        }
        Commands::Labels { command } => handle_labels(&config, command),
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

/// Handle an assign command.
/// - `input`: JSON array of reviews with `annotation.tokens`
/// - `output`: destination for the annotated reviews, or stdout
fn handle_assign(config: &TopicConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let body = read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let mut reviews =
        parse_reviews(&body).with_context(|| format!("parsing {}", input.display()))?;

    let mut modeller = TopicModeller::from_config(config).with_context(|| "handle_assign()")?;
    modeller
        .determine_topics(&mut reviews)
        .with_context(|| format!("assigning topics to {} reviews", reviews.len()))?;

    let rendered = serde_json::to_string_pretty(&reviews)?;
    match output {
        Some(path) => {
            write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), reviews = reviews.len(), "Wrote reviews");
        }
        None => writeln!(stdout(), "{}", rendered)?,
    }
    Ok(())
}

fn handle_labels(config: &TopicConfig, command: &LabelsCommand) -> Result<()> {
    let mut catalog = LabelCatalog::open(config.labels_file()?, config.label_cap)
        .with_context(|| "handle_labels()")?;
    match command {
        LabelsCommand::Show => {
            let mut out = stdout().lock();
            for label in catalog.labels() {
                writeln!(out, "{}", label)?;
            }
        }
        LabelsCommand::Reset => {
            catalog.reset()?;
            info!(path = %catalog.path().display(), "Removed cluster labels");
        }
    }
    Ok(())
}
