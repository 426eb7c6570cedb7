use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use student_risk_report::config::AppConfig;
use student_risk_report::db;
use student_risk_report::enrich::EnrichedBatch;
use student_risk_report::output::{self, OutputFormat, ReportTable};
use student_risk_report::preprocess::{Preprocessor, RawTable};
use student_risk_report::report;
use student_risk_report::telemetry;

#[derive(Parser)]
#[command(name = "student-risk-report")]
#[command(about = "Enrich student risk predictions with grading guidance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a grading policy file and print the normalized policy
    ValidatePolicy {
        #[arg(long)]
        policy: PathBuf,
    },
    /// Build an enriched report from a CSV carrying risk_proba
    Enrich {
        #[arg(long)]
        input: PathBuf,
        /// Policy JSON file; falls back to POLICY_PATH, then the built-in default
        #[arg(long)]
        policy: Option<PathBuf>,
        /// Directory for the report file; defaults to REPORT_DIR
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
        /// Print the summary columns as JSON; the report file stays complete
        #[arg(long)]
        compact: bool,
        /// Also write a markdown summary to this path
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Store the enriched rows in Postgres
        #[arg(long)]
        store: bool,
    },
    /// Create or upgrade the database schema
    InitDb,
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.log_level)?;

    match cli.command {
        Commands::ValidatePolicy { policy } => {
            let policy = config.resolve_policy(Some(&policy))?;
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
        Commands::Enrich {
            input,
            policy,
            out_dir,
            format,
            compact,
            summary,
            store,
        } => {
            let policy = config.resolve_policy(policy.as_ref())?;
            let table = RawTable::from_path(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let prepared = Preprocessor::new(config.impute_strategy).prepare(&table)?;
            let enriched = EnrichedBatch::build(&prepared, &policy);

            let out_dir = out_dir.unwrap_or_else(|| config.report_dir.clone());
            let path = output::write_report(&ReportTable::full(&enriched), &out_dir, format)?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            if compact {
                let view = ReportTable::compact(&enriched).to_json(&filename);
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!(
                    "Report for {} students written to {}.",
                    enriched.rows.len(),
                    path.display()
                );
            }

            if let Some(summary_path) = summary {
                let label = input.display().to_string();
                std::fs::write(&summary_path, report::build_report(&label, &policy, &enriched.rows))?;
                println!("Summary written to {}.", summary_path.display());
            }

            if store {
                let pool = connect(&config).await?;
                let batch_id = db::store_batch(&pool, &filename, &policy, &enriched).await?;
                for (level, students) in db::fetch_level_counts(&pool, batch_id).await? {
                    info!(%batch_id, level = %level, students, "stored batch");
                }
                println!("Stored batch {batch_id}.");
            }
        }
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
    }

    Ok(())
}
