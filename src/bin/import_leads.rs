//! Offline bulk import of historical leads into the data file.

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use rust_scoreapp_api::import::ImportOptions;
use rust_scoreapp_api::store::{JsonFilePersistence, LeadStore};

#[derive(Debug, Parser)]
#[command(name = "import_leads", about = "Import historical ScoreApp leads into the data file")]
struct Args {
    /// JSON file holding an array of leads, or an object with a `leads` array.
    #[arg(long)]
    file: PathBuf,

    /// Data file to import into.
    #[arg(long, env = "DATA_FILE", default_value = "data.json")]
    data_file: PathBuf,

    #[arg(long)]
    scorecard_id: Option<String>,

    #[arg(long)]
    scorecard_name: Option<String>,

    /// Remove the scorecard's existing leads before importing.
    #[arg(long)]
    overwrite: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let document: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;
    let leads = extract_leads(document)?;

    tracing::info!(
        "Importing {} lead(s) from {} into {}",
        leads.len(),
        args.file.display(),
        args.data_file.display()
    );

    let mut store = LeadStore::try_open(Arc::new(JsonFilePersistence::new(&args.data_file)))
        .with_context(|| {
            format!(
                "Refusing to import: existing data file {} could not be loaded",
                args.data_file.display()
            )
        })?;
    let options = ImportOptions {
        scorecard_id: args.scorecard_id,
        scorecard_name: args.scorecard_name,
        overwrite: args.overwrite,
    };
    let summary = store.import(&leads, &options);

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn extract_leads(document: Value) -> anyhow::Result<Vec<Value>> {
    match document {
        Value::Array(leads) => Ok(leads),
        Value::Object(mut map) => match map.remove("leads") {
            Some(Value::Array(leads)) => Ok(leads),
            _ => anyhow::bail!("leads must be an array"),
        },
        _ => anyhow::bail!("expected a JSON array of leads"),
    }
}
