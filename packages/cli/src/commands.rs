//! Subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use alerta_analytics_models::Period;
use alerta_config::{AppConfig, StorageBackend};
use alerta_database::sqlite::SqliteReportStore;
use alerta_database::{ReportStore, ScanFilter};
use alerta_lifecycle::{ClassificationSweep, LogPublisher};
use alerta_report_models::{Identity, Sector};
use chrono::Utc;
use serde::Serialize;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

async fn open_store(config: &AppConfig) -> Result<Arc<dyn ReportStore>, Box<dyn std::error::Error>> {
    if config.storage.backend == StorageBackend::Memory {
        return Err("the memory backend only lives inside a running server".into());
    }
    let store = SqliteReportStore::open(&config.storage.database_path).await?;
    Ok(Arc::new(store))
}

fn print_json(value: &impl Serialize) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs one sweep, or sweeps forever with `watch`.
pub async fn sweep(config: &AppConfig, watch: bool) -> CmdResult {
    let store = open_store(config).await?;
    let sweep = ClassificationSweep::new(store, Arc::new(LogPublisher))
        .with_batch_limit(config.sweep.batch_limit);

    if watch {
        sweep
            .run_every(Duration::from_secs(config.sweep.interval_secs.max(1)))
            .await;
        return Ok(());
    }

    let outcome = sweep.run_once().await?;
    print_json(&outcome)
}

pub async fn analytics(config: &AppConfig, period: Option<&str>, sector: Option<Sector>) -> CmdResult {
    let store = open_store(config).await?;
    let now = Utc::now();
    let period = Period::parse_or_default(period);

    let reports = store
        .scan(&ScanFilter {
            sector,
            created_since: Some(period.start(now)),
            ..ScanFilter::default()
        })
        .await?;
    log::info!("Aggregating {} reports", reports.len());

    print_json(&alerta_analytics::aggregate(&reports, period, sector, now))
}

/// The nightly job: counts of the last 24 hours.
pub async fn daily_report(config: &AppConfig) -> CmdResult {
    let store = open_store(config).await?;
    let now = Utc::now();
    let reports = store
        .scan(&ScanFilter {
            created_since: Some(now - chrono::Duration::days(1)),
            ..ScanFilter::default()
        })
        .await?;

    print_json(&alerta_analytics::stats::daily_report(&reports, now))
}

pub async fn stats(config: &AppConfig, identity: &Identity, period: Option<&str>) -> CmdResult {
    let store = open_store(config).await?;
    let reports = store.scan(&ScanFilter::default()).await?;
    let period = Period::parse_or_default(period);

    let stats = alerta_analytics::stats::role_stats(identity, &reports, period, Utc::now())
        .ok_or("authorities need --sector")?;
    print_json(&stats)
}
