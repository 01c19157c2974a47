//! Create the Fauna objects the API depends on.
//! Run once per database, before the first deploy.
//!
//! Usage: provision-schema [--dry-run] [--endpoint URL]
//!   --dry-run  : Print the queries as wire JSON instead of sending them
//!   --endpoint : Fauna endpoint, defaults to FAUNA_ENDPOINT or the public cloud
//!
//! Objects that already exist are skipped, so re-running is harmless.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use shipping_windows_api::config::Secret;
use shipping_windows_api::db::{fauna::FaunaClient, schema, DbErrorKind, DocumentStore};

#[derive(Parser)]
#[command(
    name = "provision-schema",
    about = "Create the shipping collection, indexes and stored function in Fauna"
)]
struct Args {
    /// Print the queries instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Fauna endpoint (falls back to FAUNA_ENDPOINT, then the public cloud)
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let definitions = schema::definitions();

    if args.dry_run {
        for (name, definition) in &definitions {
            println!("-- {}", name);
            println!("{}", serde_json::to_string_pretty(&definition.to_wire())?);
        }
        return Ok(());
    }

    let endpoint = args
        .endpoint
        .or_else(|| std::env::var("FAUNA_ENDPOINT").ok())
        .unwrap_or_else(|| "https://db.fauna.com".to_string());
    let secret = std::env::var("FAUNA_SECRET")
        .map(Secret::new)
        .context("FAUNA_SECRET required")?;

    let client = FaunaClient::new(&endpoint, secret, Duration::from_secs(30))?;

    tracing::info!("Provisioning {} objects on {}", definitions.len(), endpoint);

    for (name, definition) in definitions {
        match client.query(&definition).await {
            Ok(_) => tracing::info!("Created {}", name),
            Err(e) if e.kind == DbErrorKind::Validation && e.code == "instance already exists" => {
                tracing::info!("{} already exists, skipping", name)
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", name));
            }
        }
    }

    tracing::info!("Schema provisioning completed");
    Ok(())
}
