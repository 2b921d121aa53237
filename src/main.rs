//! Veil - Reversible PII masking for LLM-backed personal assistants
//!
//! Command-line front end for inspecting what Veil detects and how text is
//! masked before it is sent to a model.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veil::{
    audit::{flush_once, TracingSink},
    masking::{scope, MaskingEngine, MaskingMode, RedactionContext, SharedContext},
    VeilConfig,
};

#[derive(Parser)]
#[command(name = "veil")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Reversible PII masking for LLM-backed personal assistants")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "VEIL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List detected PII categories and byte offsets
    Scan {
        /// Text to scan (reads stdin when omitted)
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Mask text as it would be sent to a model
    Mask {
        /// Text to mask (reads stdin when omitted)
        #[arg(short, long)]
        text: Option<String>,

        /// Masking mode: full or financial_only (defaults to configuration)
        #[arg(short, long)]
        mode: Option<MaskingMode>,

        /// Restore the masked text and check it matches the input
        #[arg(long)]
        roundtrip: bool,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("veil={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = VeilConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Scan { text } => {
            let text = read_input(text).await?;
            run_scan(&config, &text)?;
        }
        Commands::Mask {
            text,
            mode,
            roundtrip,
        } => {
            let text = read_input(text).await?;
            run_mask(&config, &text, mode, roundtrip).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn read_input(text: Option<String>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("failed to read stdin")?;
    Ok(buf)
}

fn run_scan(config: &VeilConfig, text: &str) -> Result<()> {
    let engine = MaskingEngine::from_config(config)?;
    let spans = engine.detect(text);
    if spans.is_empty() {
        println!("No PII detected");
        return Ok(());
    }
    for span in spans {
        println!("{:<8} {}..{}", span.category.as_str(), span.start, span.end);
    }
    Ok(())
}

async fn run_mask(
    config: &VeilConfig,
    text: &str,
    mode: Option<MaskingMode>,
    roundtrip: bool,
) -> Result<()> {
    let engine = MaskingEngine::from_config(config)?;
    let mode = mode.unwrap_or_else(|| engine.default_mode());
    let context = SharedContext::new(RedactionContext::new().endpoint("cli"));

    let (masked, restored) = scope::run(context.clone(), async {
        let masked = engine.mask_active(text, mode)?.unwrap_or_default();
        let restored = if roundtrip {
            engine.unmask_active(masked.as_str())?
        } else {
            None
        };
        Ok::<_, veil::Error>((masked, restored))
    })
    .await?;

    println!("{}", masked);

    if let Some(restored) = restored {
        if restored != text {
            bail!("round trip mismatch: restored text differs from input");
        }
        tracing::info!("Round trip restored the original text");
    }

    flush_once(engine.audit_queue(), &TracingSink).await?;
    context.clear()?;
    Ok(())
}

fn show_config(config: Option<&VeilConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}
