use crate::cli::{report_window, Cli, Command};
use anyhow::{bail, Context};
use billing_service::{
    open_repository, BillingConfig, BillingService, ExportFormat, InMemorySessionSource, SimulatedClearinghouse,
    StorageBackend,
};
use config_engine::ConfigLoader;
use events_bus::EventBus;
use logger_redacted::{init_logging, LoggerError};
use std::{path::Path, sync::Arc};
use tracing::{debug, info};

const ENV_PREFIX: &str = "AACBILL_";

/// Resolve configuration from defaults, the optional file and environment
pub fn load_config(cli: &Cli) -> anyhow::Result<BillingConfig> {
    let mut loader = ConfigLoader::new().with_env_prefix(ENV_PREFIX);
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut config: BillingConfig = loader.load().context("failed to load configuration")?;

    if let Some(database) = &cli.database {
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.sqlite_path = database.to_string_lossy().into_owned();
    }
    Ok(config)
}

/// Billing service over the configured store. The operator tooling has no
/// session feed and never submits claims, so those collaborators are inert.
pub async fn build_service(config: BillingConfig) -> anyhow::Result<BillingService> {
    let repository = open_repository(&config.storage)
        .await
        .context("failed to open billing store")?;
    let clearinghouse = Arc::new(SimulatedClearinghouse::new(&config.clearinghouse));
    let bus = EventBus::new(config.events.capacity);

    Ok(BillingService::new(
        config,
        repository,
        Arc::new(InMemorySessionSource::new()),
        clearinghouse,
        bus,
    ))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match init_logging(&config.logging) {
        Ok(()) | Err(LoggerError::AlreadyInitialized) => {}
        Err(e) => return Err(e.into()),
    }

    if config.storage.backend == StorageBackend::Memory {
        bail!("no billing database configured; pass --database or set storage.backend to sqlite");
    }
    debug!(backend = ?config.storage.backend, "Configuration loaded");

    let service = build_service(config).await?;
    execute(&service, cli.command).await
}

pub async fn execute(service: &BillingService, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Report { start, end, output } => {
            let (start, end) = report_window(start, end)?;
            let report = service.generate_billing_report(start, end).await?;
            emit(output.as_deref(), &serde_json::to_string_pretty(&report)?)?;
        }
        Command::Export { format, output } => {
            let data = service.export_billing_data(format).await?;
            emit(output.as_deref(), &data)?;
            if format == ExportFormat::Csv {
                info!("CSV export is a claim summary; use --format json for a full backup");
            }
        }
        Command::Import { file } => {
            let data = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let summary = service.import_billing_data(&data).await?;
            println!(
                "Imported {} profiles and {} claims",
                summary.profiles, summary.claims
            );
        }
        Command::AuthStatus { patient_id } => {
            let status = service.check_authorization_status(&patient_id).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}

fn emit(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = content.len(), "Output written");
        }
        None => println!("{}", content),
    }
    Ok(())
}
