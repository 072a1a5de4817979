//! `rollcall` — membership reconciliation runner.
//!
//! Reads `rollcall.toml` (or the path given with `--config`, or `ROLLCALL_*`
//! environment variables), streams the campaign's recently modified person
//! records, and runs the reconciliation pipeline against them. Intended to
//! run from cron: by default it only does work on its scheduled day of the
//! month, and `--force` overrides the gate for manual runs.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use chrono::{Datelike, Duration as ChronoDuration, Utc};
use clap::Parser;
use rollcall_client::{ApiClient, ApiConfig};
use rollcall_core::filter::SearchCriteria;
use rollcall_sync::{ReportSink, SyncOptions, run_sync};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Membership reconciliation runner")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rollcall.toml")]
  config: PathBuf,

  /// Lower bound (exclusive) on modified_date, ISO-8601. Defaults to 24
  /// hours before now.
  #[arg(long, value_name = "TIMESTAMP")]
  modified_after: Option<String>,

  /// Run even when today is not the scheduled day of the month.
  #[arg(long)]
  force: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct Settings {
  /// Tenant base URL, e.g. `https://myorg.actionbuilder.org`.
  base_url:    String,
  campaign_id: String,
  api_token:   String,

  #[serde(default = "default_per_page")]
  per_page:   u32,
  #[serde(default = "default_workers")]
  workers:    usize,
  #[serde(default = "default_batch_size")]
  batch_size: usize,
  /// Milliseconds to pause after each API call.
  #[serde(default = "default_pace_ms")]
  pace_ms:    u64,

  /// Day of the month the scheduled run fires on.
  #[serde(default = "default_run_day")]
  run_day: u32,

  #[serde(default = "default_subject_prefix")]
  subject_prefix: String,
  /// Where the CSV report is written.
  #[serde(default = "default_report_path")]
  report_path:    PathBuf,
}

fn default_per_page() -> u32 {
  25
}
fn default_workers() -> usize {
  1
}
fn default_batch_size() -> usize {
  1
}
fn default_pace_ms() -> u64 {
  200
}
fn default_run_day() -> u32 {
  1
}
fn default_subject_prefix() -> String {
  "Membership sync".to_string()
}
fn default_report_path() -> PathBuf {
  PathBuf::from("membership-report.csv")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration. Missing credentials are fatal before any work runs.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ROLLCALL"))
    .build()
    .context("failed to read config")?;
  let settings: Settings = settings.try_deserialize().context(
    "invalid configuration (base_url, campaign_id and api_token are required)",
  )?;

  if !cli.force && !runs_today(settings.run_day) {
    tracing::info!(
      "not scheduled today (run_day = {}); use --force to run anyway",
      settings.run_day
    );
    return Ok(());
  }

  let modified_after = cli.modified_after.unwrap_or_else(|| {
    (Utc::now() - ChronoDuration::days(1))
      .format("%Y-%m-%dT%H:%M:%SZ")
      .to_string()
  });
  tracing::info!("reconciling records modified after {modified_after}");

  let mut api_config = ApiConfig::new(
    settings.base_url.clone(),
    settings.campaign_id.clone(),
    settings.api_token.clone(),
  );
  api_config.pace_delay = Duration::from_millis(settings.pace_ms);
  let client = ApiClient::new(api_config).context("failed to build API client")?;

  let criteria = SearchCriteria::modified_after(modified_after);
  let records = client.search_people(&criteria, settings.per_page);

  let sink = FileReportSink { path: settings.report_path.clone() };
  let options = SyncOptions {
    workers:        settings.workers,
    batch_size:     settings.batch_size,
    subject_prefix: settings.subject_prefix.clone(),
  };

  let outcome = run_sync(Arc::new(client), records, &sink, &options).await?;
  tracing::info!(
    "run complete: {} records processed, {} corrections, {}/{} stale tags deleted, {} report rows",
    outcome.processed,
    outcome.corrections,
    outcome.deletions_succeeded,
    outcome.deletions_attempted,
    outcome.report_rows,
  );

  Ok(())
}

/// Whether today (UTC) is the scheduled day of the month.
fn runs_today(run_day: u32) -> bool {
  Utc::now().day() == run_day
}

/// Report sink that writes the CSV to disk and logs the notification.
struct FileReportSink {
  path: PathBuf,
}

impl ReportSink for FileReportSink {
  type Error = std::io::Error;

  async fn deliver(
    &self,
    subject: &str,
    body: &str,
    csv: Option<&str>,
  ) -> Result<(), std::io::Error> {
    tracing::info!("{subject}");
    match csv {
      Some(data) => {
        tokio::fs::write(&self.path, data).await?;
        tracing::info!("report written to {}", self.path.display());
      }
      None => tracing::info!("{body}"),
    }
    Ok(())
  }
}
