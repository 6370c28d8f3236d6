use anyhow::Context;
use billing_service::ExportFormat;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aacbill")]
#[command(about = "Back-office tooling for AAC therapy billing data")]
#[command(version)]
pub struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(long, short, global = true, env = "AACBILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite billing database; overrides the configured storage
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Financial report over claims with a date of service in the window
    Report {
        /// First day of the window (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the window, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Export profiles and claims
    Export {
        /// json (full backup) or csv (claim summary)
        #[arg(long, short, default_value = "json", value_parser = parse_format)]
        format: ExportFormat,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Load a JSON backup produced by `export --format json`
    Import {
        file: PathBuf,
    },

    /// Authorization units and warnings for a patient
    AuthStatus {
        patient_id: String,
    },
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse().map_err(|e: billing_service::BillingError| e.to_string())
}

/// Window covering every instant of the `start` and `end` days, in UTC
pub fn report_window(start: NaiveDate, end: NaiveDate) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).context("invalid start of day")?;
    let last_instant = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).context("invalid end of day")?;
    Ok((
        Utc.from_utc_datetime(&start.and_time(midnight)),
        Utc.from_utc_datetime(&end.and_time(last_instant)),
    ))
}
