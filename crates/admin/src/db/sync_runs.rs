//! Sync run history.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use cobbler_core::{SyncRunId, SyncStatus};

use super::RepositoryError;
use crate::models::{SyncReport, SyncRun};

const SYNC_RUN_COLUMNS: &str = "id, status, triggered_by, started_at, finished_at, report, error";

#[derive(Debug, sqlx::FromRow)]
struct SyncRunRow {
    id: i32,
    status: SyncStatus,
    triggered_by: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    report: Option<Json<SyncReport>>,
    error: Option<String>,
}

impl From<SyncRunRow> for SyncRun {
    fn from(row: SyncRunRow) -> Self {
        Self {
            id: SyncRunId::new(row.id),
            status: row.status,
            triggered_by: row.triggered_by,
            started_at: row.started_at,
            finished_at: row.finished_at,
            report: row.report.map(|Json(r)| r),
            error: row.error,
        }
    }
}

pub struct SyncRunRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SyncRunRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record the start of a run.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn start(&self, triggered_by: &str) -> Result<SyncRunId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO admin.sync_run (status, triggered_by) VALUES ($1, $2) RETURNING id",
        )
        .bind(SyncStatus::Running)
        .bind(triggered_by)
        .fetch_one(self.pool)
        .await?;
        Ok(SyncRunId::new(id))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn finish(&self, id: SyncRunId, report: &SyncReport) -> Result<(), RepositoryError> {
        self.close(id, SyncStatus::Succeeded, report, None).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn fail(
        &self,
        id: SyncRunId,
        error: &str,
        report: &SyncReport,
    ) -> Result<(), RepositoryError> {
        self.close(id, SyncStatus::Failed, report, Some(error)).await
    }

    async fn close(
        &self,
        id: SyncRunId,
        status: SyncStatus,
        report: &SyncReport,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE admin.sync_run SET status = $2, finished_at = now(), report = $3, error = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(Json(report))
        .bind(error)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(&self) -> Result<Option<SyncRun>, RepositoryError> {
        let row = sqlx::query_as::<_, SyncRunRow>(&format!(
            "SELECT {SYNC_RUN_COLUMNS} FROM admin.sync_run ORDER BY started_at DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<SyncRun>, RepositoryError> {
        let rows = sqlx::query_as::<_, SyncRunRow>(&format!(
            "SELECT {SYNC_RUN_COLUMNS} FROM admin.sync_run \
             ORDER BY started_at DESC, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Mark runs left `running` by a crashed process as failed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn abandon_stale(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE admin.sync_run SET status = $1, finished_at = now(), \
             error = 'interrupted before completion' WHERE status = $2",
        )
        .bind(SyncStatus::Failed)
        .bind(SyncStatus::Running)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
