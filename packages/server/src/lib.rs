#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for `AlertaUTEC`.
//!
//! Thin HTTP adapter over [`alerta_lifecycle`] and [`alerta_analytics`]:
//! handlers read the caller's identity from gateway headers, call into the
//! core, and map errors to status codes. Notifications are pushed to
//! connected clients over server-sent events.

mod error;
mod handlers;
pub mod identity;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use alerta_config::{AppConfig, StorageBackend};
use alerta_database::blob::{BlobStore, FsBlobStore, MemoryBlobStore};
use alerta_database::memory::MemoryReportStore;
use alerta_database::sqlite::SqliteReportStore;
use alerta_database::{ReportStore, StoreError};
use alerta_lifecycle::{BroadcastPublisher, ClassificationSweep, ReportService};

pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Report submission and transitions.
    pub reports: ReportService,
    /// Classification sweep, run on demand or in the background.
    pub sweep: ClassificationSweep,
    /// Event fan-out feeding `GET /api/events`.
    pub events: BroadcastPublisher,
}

impl AppState {
    /// Wires services around an existing store and blob store.
    #[must_use]
    pub fn new(
        store: Arc<dyn ReportStore>,
        blobs: Arc<dyn BlobStore>,
        config: &AppConfig,
    ) -> Self {
        let events = BroadcastPublisher::new(config.notifications.channel_capacity);
        let reports = ReportService::new(Arc::clone(&store), blobs, Arc::new(events.clone()));
        let sweep = ClassificationSweep::new(store, Arc::new(events.clone()))
            .with_batch_limit(config.sweep.batch_limit);

        Self {
            reports,
            sweep,
            events,
        }
    }

    /// Opens the configured storage backend and wires services around it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the `SQLite` database cannot be opened.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let (store, blobs): (Arc<dyn ReportStore>, Arc<dyn BlobStore>) =
            match config.storage.backend {
                StorageBackend::Sqlite => (
                    Arc::new(SqliteReportStore::open(&config.storage.database_path).await?),
                    Arc::new(FsBlobStore::new(&config.storage.blob_dir)),
                ),
                StorageBackend::Memory => {
                    log::warn!("Using in-memory storage; reports are lost on restart");
                    (
                        Arc::new(MemoryReportStore::new()),
                        Arc::new(MemoryBlobStore::new()),
                    )
                }
            };

        Ok(Self::new(store, blobs, config))
    }
}

/// Registers every `/api` route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/reports", web::post().to(handlers::create_report))
            .route("/reports/{id}", web::get().to(handlers::get_report))
            .route("/reports/{id}/take", web::post().to(handlers::take_report))
            .route("/reports/{id}/assign", web::post().to(handlers::assign_report))
            .route("/reports/{id}/status", web::post().to(handlers::update_status))
            .route(
                "/classification/sweep",
                web::post().to(handlers::run_sweep),
            )
            .route("/analytics", web::get().to(handlers::analytics))
            .route("/stats", web::get().to(handlers::stats))
            .route("/events", web::get().to(handlers::events)),
    );
}

/// Starts the API server.
///
/// With `background_sweep`, the classification sweep also runs every
/// `sweep.interval_secs` on the server's runtime.
///
/// # Errors
///
/// Returns an `std::io::Error` if storage cannot be opened, or the server
/// fails to bind or hits a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: AppConfig, background_sweep: bool) -> std::io::Result<()> {
    log::info!("Opening {} storage...", config.storage.backend);
    let state = AppState::from_config(&config)
        .await
        .map_err(std::io::Error::other)?;

    if background_sweep {
        let sweep = state.sweep.clone();
        let period = Duration::from_secs(config.sweep.interval_secs.max(1));
        log::info!("Running classification sweep every {period:?}");
        actix_rt::spawn(async move { sweep.run_every(period).await });
    }

    let state = web::Data::new(state);
    let bind_addr = config.server.bind_addr.clone();
    let port = config.server.port;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
