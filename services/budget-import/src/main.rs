use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ofitec_database::{initialize_database, BudgetRepository};
use ofitec_models::ImportResult;
use ofitec_utils::{init_logging, AppConfig, BudgetImporter, ImportOutcome};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

mod render;

use render::PersistedProject;

/// Exit status for a document that could not be imported.
const EXIT_IMPORT_FAILED: u8 = 1;
/// Exit status for configuration and database failures.
const EXIT_ENVIRONMENT: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Import a BC3 (FIEBDC-3) bill of quantities.
#[derive(Parser, Debug)]
#[command(name = "budget-import", version, about = "Import a BC3 budget document")]
struct Cli {
    /// Path to the .bc3 document
    file: PathBuf,

    /// Project name used when persisting (defaults to the file stem)
    #[arg(long)]
    project: Option<String>,

    /// Currency code for the project (defaults to import.default_currency)
    #[arg(long)]
    currency: Option<String>,

    /// Write the imported budget to PostgreSQL
    #[arg(long)]
    persist: bool,

    /// Output format (text or json)
    #[arg(long, default_value = "text", value_enum)]
    output: OutputFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_ENVIRONMENT)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.logging)?;
    info!(file = %cli.file.display(), "Starting budget import");

    let importer = BudgetImporter::new(&config.import);
    let outcome = ImportOutcome::from(importer.import_file_async(&cli.file).await);

    let result = match outcome {
        ImportOutcome::ParseFailed(error) => {
            match cli.output {
                OutputFormat::Json => println!("{}", render::render_error_json(&error)?),
                OutputFormat::Text => eprintln!("import failed [{}]: {}", error.error_code(), error),
            }
            return Ok(ExitCode::from(EXIT_IMPORT_FAILED));
        }
        ImportOutcome::WithDiagnostics(result) => {
            info!(diagnostics = result.diagnostics.len(), "Imported with diagnostics");
            result
        }
        ImportOutcome::Clean(result) => result,
    };

    let persisted = if cli.persist || config.import.persist {
        let project = cli.project.clone().unwrap_or_else(|| default_project_name(&cli.file));
        let currency = cli.currency.as_deref().unwrap_or(&config.import.default_currency);
        Some(persist(&config, &project, currency, &result).await?)
    } else {
        None
    };

    match cli.output {
        OutputFormat::Json => println!("{}", render::render_json(&result, persisted.as_ref())?),
        OutputFormat::Text => print!("{}", render::render_text(&result, persisted.as_ref())),
    }

    Ok(ExitCode::SUCCESS)
}

async fn persist(config: &AppConfig, project: &str, currency: &str, result: &ImportResult) -> Result<PersistedProject> {
    let db_config = ofitec_database::DatabaseConfig {
        postgres_url: config.database.postgres_url.clone(),
        max_connections: config.database.max_connections,
        connection_timeout: std::time::Duration::from_secs(config.database.connection_timeout_seconds),
    };
    let pool = initialize_database(&db_config).await?;
    info!("Database connection established");

    let repository = BudgetRepository::new(pool);
    let project_id = repository
        .save_import(project, currency, result)
        .await
        .with_context(|| format!("Failed to persist budget {}", result.source_name))?;
    info!(project_id, project, "Budget saved");

    let (stored_items, stored_total) = repository.project_totals(project_id).await?;
    let persisted = PersistedProject {
        project_id,
        stored_items,
        stored_total,
    };
    if !persisted.agrees_with(&result.summary()) {
        // Column scales (3 for quantity, 2 for price) can round finer inputs.
        warn!(project_id, stored_items, %stored_total, "Stored totals differ from the imported summary");
    }
    Ok(persisted)
}

fn default_project_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "budget".to_string())
}
