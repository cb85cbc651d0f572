//! `SQLite`-backed report store.
//!
//! Conditional updates are a single `UPDATE ... WHERE id = $1 AND <cond>`
//! statement; zero affected rows means either the report is missing or the
//! condition failed, which a follow-up read distinguishes. Timestamps are
//! stored as RFC 3339 text, booleans as `INTEGER` 0/1.

use std::path::Path;

use alerta_report_models::{Classification, PlaceSnapshot, Report, ReportStatus, Sector, Urgency};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use switchy_database_connection::init_sqlite_rusqlite;

use crate::{ReportPatch, ReportStore, ScanFilter, StoreError, WriteCondition};

const REPORT_COLUMNS: &str = "id, place_id, place_name, place_type, place_building, place_floor,
    description, declared_urgency, classified_urgency, classification_score,
    is_auto_classified, status, sector, assigned_to, author_id, image_ref,
    notification_sent_at, created_at, updated_at, resolved_at";

/// A [`ReportStore`] persisted in `SQLite` through `switchy_database`.
pub struct SqliteReportStore {
    db: Box<dyn Database>,
}

impl SqliteReportStore {
    /// Opens (or creates) the database at `path` and ensures the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or schema
    /// creation fails.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        let db = init_sqlite_rusqlite(Some(path)).map_err(|e| StoreError::Database {
            message: e.to_string(),
        })?;

        let store = Self { db };
        store.ensure_schema().await?;
        log::info!("Opened report database at {}", path.display());
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.db
            .exec_raw(
                "CREATE TABLE IF NOT EXISTS reports (
                    id                   TEXT PRIMARY KEY,
                    place_id             TEXT NOT NULL,
                    place_name           TEXT NOT NULL,
                    place_type           TEXT NOT NULL,
                    place_building       TEXT,
                    place_floor          INTEGER,
                    description          TEXT NOT NULL,
                    declared_urgency     TEXT NOT NULL,
                    classified_urgency   TEXT,
                    classification_score REAL,
                    is_auto_classified   INTEGER NOT NULL DEFAULT 0,
                    status               TEXT NOT NULL,
                    sector               TEXT NOT NULL,
                    assigned_to          TEXT,
                    author_id            TEXT NOT NULL,
                    image_ref            TEXT,
                    notification_sent_at TEXT,
                    created_at           TEXT NOT NULL,
                    updated_at           TEXT NOT NULL,
                    resolved_at          TEXT
                )",
            )
            .await?;

        self.db
            .exec_raw(
                "CREATE INDEX IF NOT EXISTS idx_reports_sweep
                 ON reports (is_auto_classified, status)",
            )
            .await?;

        self.db
            .exec_raw(
                "CREATE INDEX IF NOT EXISTS idx_reports_created
                 ON reports (created_at)",
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn get(&self, id: &str) -> Result<Option<Report>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"),
                &[DatabaseValue::String(id.to_string())],
            )
            .await?;

        rows.first().map(row_to_report).transpose()
    }

    async fn insert(&self, report: &Report) -> Result<(), StoreError> {
        if self.get(&report.id).await?.is_some() {
            return Err(StoreError::AlreadyExists {
                id: report.id.clone(),
            });
        }

        self.db
            .exec_raw_params(
                &format!(
                    "INSERT INTO reports ({REPORT_COLUMNS})
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                             $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"
                ),
                &[
                    DatabaseValue::String(report.id.clone()),
                    DatabaseValue::String(report.place.id.clone()),
                    DatabaseValue::String(report.place.name.clone()),
                    DatabaseValue::String(report.place.place_type.clone()),
                    opt_string(report.place.building.clone()),
                    report
                        .place
                        .floor
                        .map_or(DatabaseValue::Null, DatabaseValue::Int32),
                    DatabaseValue::String(report.description.clone()),
                    DatabaseValue::String(report.declared_urgency.to_string()),
                    opt_string(report.classified_urgency().map(|u| u.to_string())),
                    report
                        .classification_score()
                        .map_or(DatabaseValue::Null, DatabaseValue::Real64),
                    DatabaseValue::Int64(i64::from(report.is_auto_classified)),
                    DatabaseValue::String(report.status.to_string()),
                    DatabaseValue::String(report.sector.to_string()),
                    opt_string(report.assigned_to.clone()),
                    DatabaseValue::String(report.author_id.clone()),
                    opt_string(report.image_ref.clone()),
                    opt_timestamp(report.notification_sent_at),
                    DatabaseValue::String(report.created_at.to_rfc3339()),
                    DatabaseValue::String(report.updated_at.to_rfc3339()),
                    opt_timestamp(report.resolved_at),
                ],
            )
            .await?;

        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        patch: &ReportPatch,
        condition: Option<WriteCondition>,
    ) -> Result<Report, StoreError> {
        let (sql, params) = build_update(id, patch, condition);

        let Some(sql) = sql else {
            // Nothing to set, but the condition still has to be honored.
            let current = self
                .get(id)
                .await?
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
            return match condition {
                Some(condition) if !condition.holds(&current) => Err(StoreError::ConditionFailed {
                    id: id.to_string(),
                    condition,
                }),
                _ => Ok(current),
            };
        };

        let rows = self.db.query_raw_params(&sql, &params).await?;
        if let Some(row) = rows.first() {
            return row_to_report(row);
        }

        if self.get(id).await?.is_none() {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        let condition = condition.ok_or_else(|| StoreError::Database {
            message: format!("unconditional update of report {id} affected no rows"),
        })?;
        Err(StoreError::ConditionFailed {
            id: id.to_string(),
            condition,
        })
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<Report>, StoreError> {
        let (where_clause, params) = build_scan_filter(filter);
        let limit = filter
            .limit
            .map(|n| format!(" LIMIT {n}"))
            .unwrap_or_default();

        let rows = self
            .db
            .query_raw_params(
                &format!(
                    "SELECT {REPORT_COLUMNS} FROM reports{where_clause}
                     ORDER BY created_at, id{limit}"
                ),
                &params,
            )
            .await?;

        rows.iter().map(row_to_report).collect()
    }
}

/// Builds the `UPDATE` statement for a patch plus its condition.
///
/// Returns `None` for the SQL when the patch sets nothing.
fn build_update(
    id: &str,
    patch: &ReportPatch,
    condition: Option<WriteCondition>,
) -> (Option<String>, Vec<DatabaseValue>) {
    if patch.is_empty() {
        return (None, Vec::new());
    }

    let mut sets: Vec<String> = Vec::new();
    let mut params = vec![DatabaseValue::String(id.to_string())];
    let mut idx = 2u32;

    let mut push = |column: &str, value: DatabaseValue, sets: &mut Vec<String>| {
        sets.push(format!("{column} = ${idx}"));
        params.push(value);
        idx += 1;
    };

    if let Some(status) = patch.status {
        push("status", DatabaseValue::String(status.to_string()), &mut sets);
    }
    if let Some(assigned_to) = &patch.assigned_to {
        push(
            "assigned_to",
            DatabaseValue::String(assigned_to.clone()),
            &mut sets,
        );
    }
    if let Some(classification) = patch.classification {
        push(
            "classified_urgency",
            DatabaseValue::String(classification.urgency.to_string()),
            &mut sets,
        );
        push(
            "classification_score",
            DatabaseValue::Real64(classification.score),
            &mut sets,
        );
        push("is_auto_classified", DatabaseValue::Int64(1), &mut sets);
    }
    if let Some(sent_at) = patch.notification_sent_at {
        push(
            "notification_sent_at",
            DatabaseValue::String(sent_at.to_rfc3339()),
            &mut sets,
        );
    }
    if let Some(updated_at) = patch.updated_at {
        push(
            "updated_at",
            DatabaseValue::String(updated_at.to_rfc3339()),
            &mut sets,
        );
    }
    if let Some(resolved_at) = patch.resolved_at {
        push("resolved_at", opt_timestamp(resolved_at), &mut sets);
    }


    let mut sql = format!("UPDATE reports SET {} WHERE id = $1", sets.join(", "));
    match condition {
        Some(WriteCondition::StatusIs(status)) => {
            sql.push_str(&format!(" AND status = ${idx}"));
            params.push(DatabaseValue::String(status.to_string()));
        }
        Some(WriteCondition::AwaitingClassification) => {
            sql.push_str(&format!(
                " AND is_auto_classified = 0 AND status IN (${}, ${})",
                idx,
                idx + 1
            ));
            params.push(DatabaseValue::String(ReportStatus::Pending.to_string()));
            params.push(DatabaseValue::String(ReportStatus::InProgress.to_string()));
        }
        Some(WriteCondition::NotificationPending) => {
            sql.push_str(" AND notification_sent_at IS NULL");
        }
        None => {}
    }
    sql.push_str(&format!(" RETURNING {REPORT_COLUMNS}"));

    (Some(sql), params)
}

/// Builds the `WHERE` clause for a scan filter. `limit` is not included.
fn build_scan_filter(filter: &ScanFilter) -> (String, Vec<DatabaseValue>) {
    let mut frags = Vec::new();
    let mut params = Vec::new();
    let mut idx = 1u32;

    if !filter.statuses.is_empty() {
        let placeholders: Vec<String> = filter
            .statuses
            .iter()
            .map(|status| {
                params.push(DatabaseValue::String(status.to_string()));
                let placeholder = format!("${idx}");
                idx += 1;
                placeholder
            })
            .collect();
        frags.push(format!("status IN ({})", placeholders.join(", ")));
    }

    if let Some(flag) = filter.auto_classified {
        frags.push(format!("is_auto_classified = ${idx}"));
        params.push(DatabaseValue::Int64(i64::from(flag)));
        idx += 1;
    }

    if let Some(sector) = filter.sector {
        frags.push(format!("sector = ${idx}"));
        params.push(DatabaseValue::String(sector.to_string()));
        idx += 1;
    }

    if let Some(since) = filter.created_since {
        frags.push(format!("created_at >= ${idx}"));
        params.push(DatabaseValue::String(since.to_rfc3339()));
    }

    let where_clause = if frags.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", frags.join(" AND "))
    };

    (where_clause, params)
}

fn opt_string(value: Option<String>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, DatabaseValue::String)
}

fn opt_timestamp(value: Option<DateTime<Utc>>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |t| DatabaseValue::String(t.to_rfc3339()))
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Conversion {
            message: format!("Invalid {column} timestamp '{value}': {e}"),
        })
}

fn parse_column<T: std::str::FromStr>(column: &str, value: &str) -> Result<T, StoreError> {
    value.parse().map_err(|_| StoreError::Conversion {
        message: format!("Invalid {column} value '{value}'"),
    })
}

fn opt_timestamp_column(
    row: &switchy_database::Row,
    column: &str,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    row.to_value::<Option<String>>(column)
        .unwrap_or(None)
        .map(|s| parse_timestamp(column, &s))
        .transpose()
}

/// Converts a database row into a [`Report`].
fn row_to_report(row: &switchy_database::Row) -> Result<Report, StoreError> {
    let declared: String = row.to_value("declared_urgency").unwrap_or_default();
    let status: String = row.to_value("status").unwrap_or_default();
    let sector: String = row.to_value("sector").unwrap_or_default();
    let created_at: String = row.to_value("created_at").unwrap_or_default();
    let updated_at: String = row.to_value("updated_at").unwrap_or_default();

    let classified: Option<String> = row.to_value("classified_urgency").unwrap_or(None);
    let score: Option<f64> = row.to_value("classification_score").unwrap_or(None);
    let classification = match (classified, score) {
        (Some(urgency), Some(score)) => Some(Classification {
            urgency: parse_column::<Urgency>("classified_urgency", &urgency)?,
            score,
        }),
        _ => None,
    };

    Ok(Report {
        id: row.to_value("id").unwrap_or_default(),
        place: PlaceSnapshot {
            id: row.to_value("place_id").unwrap_or_default(),
            name: row.to_value("place_name").unwrap_or_default(),
            place_type: row.to_value("place_type").unwrap_or_default(),
            building: row.to_value("place_building").unwrap_or(None),
            floor: row.to_value("place_floor").unwrap_or(None),
        },
        description: row.to_value("description").unwrap_or_default(),
        declared_urgency: parse_column::<Urgency>("declared_urgency", &declared)?,
        classification,
        is_auto_classified: row.to_value::<i64>("is_auto_classified").unwrap_or(0) != 0,
        status: parse_column::<ReportStatus>("status", &status)?,
        sector: parse_column::<Sector>("sector", &sector)?,
        assigned_to: row.to_value("assigned_to").unwrap_or(None),
        author_id: row.to_value("author_id").unwrap_or_default(),
        image_ref: row.to_value("image_ref").unwrap_or(None),
        notification_sent_at: opt_timestamp_column(row, "notification_sent_at")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
        resolved_at: opt_timestamp_column(row, "resolved_at")?,
    })
}
