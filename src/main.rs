use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use product_push::batch::BatchRunner;
use product_push::config::{parse_threshold, AppConfig};
use product_push::data::{self, DataPaths, Dataset, OutputFormat};
use product_push::llm::{AzureOpenAiClient, SharedGenerator};
use product_push::notify::NotificationFormatter;
use product_push::profile::build_profile;
use product_push::report;
use product_push::scoring::{LlmScorer, ScoringChain};

#[derive(Parser)]
#[command(name = "product-push")]
#[command(about = "Personalized product push notifications for bank clients", long_about = None)]
struct Cli {
    #[command(flatten)]
    data: DataArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Directory holding clients.csv, all_transactions.csv and all_transfers.csv
    #[arg(long, global = true, default_value = "processed")]
    data_dir: PathBuf,
    #[arg(long, global = true)]
    clients_csv: Option<PathBuf>,
    #[arg(long, global = true)]
    transactions_csv: Option<PathBuf>,
    #[arg(long, global = true)]
    transfers_csv: Option<PathBuf>,
}

impl DataArgs {
    fn paths(&self) -> DataPaths {
        let mut paths = DataPaths::in_dir(&self.data_dir);
        if let Some(path) = &self.clients_csv {
            paths.clients = path.clone();
        }
        if let Some(path) = &self.transactions_csv {
            paths.transactions = path.clone();
        }
        if let Some(path) = &self.transfers_csv {
            paths.transfers = path.clone();
        }
        paths
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the behavioural profile of one client as JSON
    Profile {
        #[arg(long)]
        client: i64,
    },
    /// Score and select a product for each client
    Classify {
        /// Restrict to these clients (repeatable); all clients by default
        #[arg(long = "client")]
        clients: Vec<i64>,
        #[arg(long, default_value = "product_classification.json")]
        out: PathBuf,
        #[arg(long, value_parser = threshold_arg)]
        threshold: Option<f64>,
        #[arg(long)]
        workers: Option<usize>,
        /// Skip text generation even when it is configured
        #[arg(long)]
        rules_only: bool,
    },
    /// Run the full pipeline and write one notification per client
    Notify {
        #[arg(long = "client")]
        clients: Vec<i64>,
        #[arg(long, default_value = "notifications.csv")]
        out: PathBuf,
        /// Output format; inferred from the extension when omitted
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        #[arg(long, value_parser = threshold_arg)]
        threshold: Option<f64>,
        #[arg(long)]
        workers: Option<usize>,
        /// Render notifications from templates instead of text generation
        #[arg(long)]
        templates_only: bool,
        /// Skip text generation for scoring even when it is configured
        #[arg(long)]
        rules_only: bool,
        /// Also write a markdown run report
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn threshold_arg(raw: &str) -> Result<f64, String> {
    parse_threshold(raw).map_err(|err| err.to_string())
}

fn init_tracing(log_level: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn build_generator(config: &AppConfig) -> anyhow::Result<Option<SharedGenerator>> {
    match &config.llm {
        Some(llm) => {
            let client = AzureOpenAiClient::new(llm, config.llm_timeout)
                .context("failed to build the Azure OpenAI client")?;
            Ok(Some(Arc::new(client)))
        }
        None => {
            tracing::warn!(
                "Azure OpenAI is not configured, using rule-based scoring and templates"
            );
            Ok(None)
        }
    }
}

fn scoring_chain(
    generator: Option<&SharedGenerator>,
    config: &AppConfig,
    rules_only: bool,
) -> ScoringChain {
    match generator {
        Some(generator) if !rules_only => {
            ScoringChain::new(Some(LlmScorer::new(generator.clone(), config.llm_timeout)))
        }
        _ => ScoringChain::rules_only(),
    }
}

fn selected_clients(dataset: &Dataset, requested: Vec<i64>) -> Vec<i64> {
    if requested.is_empty() {
        dataset.client_codes()
    } else {
        requested
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("invalid configuration in environment")?;
    init_tracing(&config.log_level);

    let paths = cli.data.paths();
    let dataset = Dataset::load(&paths).with_context(|| {
        format!(
            "failed to load input tables from {}",
            cli.data.data_dir.display()
        )
    })?;

    match cli.command {
        Commands::Profile { client } => {
            let profile = build_profile(&dataset, client)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Classify {
            clients,
            out,
            threshold,
            workers,
            rules_only,
        } => {
            let generator = build_generator(&config)?;
            let runner = BatchRunner::new(
                &dataset,
                scoring_chain(generator.as_ref(), &config, rules_only),
                NotificationFormatter::Template,
                threshold.unwrap_or(config.confidence_threshold),
                workers.unwrap_or(config.workers),
            );
            let codes = selected_clients(&dataset, clients);
            let records = runner.classify_all(&codes).await;
            data::save_classification(&out, &records)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Classified {} of {} clients into {}.",
                records.len(),
                codes.len(),
                out.display()
            );
        }
        Commands::Notify {
            clients,
            out,
            format,
            threshold,
            workers,
            templates_only,
            rules_only,
            report: report_path,
        } => {
            let generator = build_generator(&config)?;
            let formatter = match &generator {
                Some(generator) if !templates_only => {
                    NotificationFormatter::llm(generator.clone(), config.llm_timeout)
                }
                _ => NotificationFormatter::Template,
            };
            let runner = BatchRunner::new(
                &dataset,
                scoring_chain(generator.as_ref(), &config, rules_only),
                formatter,
                threshold.unwrap_or(config.confidence_threshold),
                workers.unwrap_or(config.workers),
            );
            let codes = selected_clients(&dataset, clients);
            let (results, summary) = runner.run(&codes).await;

            let records: Vec<_> = results.iter().map(|result| result.record.clone()).collect();
            let format = format.unwrap_or_else(|| OutputFormat::from_path(&out));
            data::save_records(&out, &records, format)
                .with_context(|| format!("failed to write {}", out.display()))?;

            if let Some(report_path) = report_path {
                let generated_at = chrono::Local::now().naive_local();
                let report = report::build_report(generated_at, &summary, &results);
                std::fs::write(&report_path, report)
                    .with_context(|| format!("failed to write {}", report_path.display()))?;
                println!("Report written to {}.", report_path.display());
            }

            println!(
                "Wrote {} notifications to {} ({} succeeded, {} scored by rules, {} failed).",
                records.len(),
                out.display(),
                summary.succeeded,
                summary.fallbacks,
                summary.failed
            );
        }
    }

    Ok(())
}
