mod config;
mod logging;

use std::path::Path;

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::{error, info, info_span};

use herald_app::sns_decoder::{SnsDecoder, SnsEvent};
use herald_ports::context::Context;

use crate::config::{ProcessArgs, StoreArgs};
use crate::logging::LogArgs;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Alert fan-out to chat and paging services")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deliver every alert in one SNS event
    Process(ProcessArgs),

    /// Delete expired locks and delivery records
    Purge(StoreArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log)?;

    match cli.command {
        Commands::Process(args) => process(args).await,
        Commands::Purge(args) => purge(args).await,
    }
}

async fn process(args: ProcessArgs) -> anyhow::Result<()> {
    let processor = args.build_processor().await?;
    let decoder = SnsDecoder::new(processor);

    let raw = read_input(args.input.as_deref()).await?;
    let event: SnsEvent = serde_json::from_str(&raw).context("invalid SNS event")?;

    let ctx = Context::new(info_span!("invocation", records = event.records.len()));
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    decoder.process_event(&ctx, event).await.inspect_err(|err| {
        error!(parent: ctx.span(), error = %err, "failed to deliver some alerts");
    })?;

    info!(parent: ctx.span(), "event processed");
    Ok(())
}

async fn purge(args: StoreArgs) -> anyhow::Result<()> {
    let store = args.connect().await?;
    let purged = store.purge_expired(Utc::now()).await?;
    info!(purged, table = %args.table, "purged expired entries");
    Ok(())
}

async fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("failed to read stdin")?;
            Ok(raw)
        }
    }
}
