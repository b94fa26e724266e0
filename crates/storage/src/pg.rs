// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Postgres-backed `JobStore`.
//!
//! Every racing transition is a single conditional `UPDATE … RETURNING id`;
//! a zero-row result means the caller lost the compare-and-set.

use crate::error::StoreError;
use crate::store::JobStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dalston_core::{
    EngineId, Job, JobError, JobId, JobParams, JobStatus, PipelineWarning, Stage, Task, TaskId,
    TaskStatus,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

const TERMINAL_TASK_GUARD: &str = "status NOT IN ('completed', 'failed', 'skipped')";

/// `JobStore` over a Postgres connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::debug!("migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn job_from_row(row: &PgRow) -> Result<Job, StoreError> {
    let id: String = row.try_get("id")?;
    let status_raw: String = row.try_get("status")?;
    let status = JobStatus::parse(&status_raw).ok_or_else(|| StoreError::InvalidRow {
        kind: "job",
        id: id.clone(),
        message: format!("unknown status '{status_raw}'"),
    })?;
    let params: JobParams = serde_json::from_value(row.try_get("parameters")?)?;
    let error: Option<JobError> = row
        .try_get::<Option<serde_json::Value>, _>("error")?
        .map(serde_json::from_value)
        .transpose()?;
    let warnings: Vec<PipelineWarning> = serde_json::from_value(row.try_get("warnings")?)?;
    Ok(Job {
        id: JobId::new(id),
        tenant_id: row.try_get("tenant_id")?,
        status,
        audio_uri: row.try_get("audio_uri")?,
        params,
        error,
        warnings,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task, StoreError> {
    let id: String = row.try_get("id")?;
    let status_raw: String = row.try_get("status")?;
    let status = TaskStatus::parse(&status_raw).ok_or_else(|| StoreError::InvalidRow {
        kind: "task",
        id: id.clone(),
        message: format!("unknown status '{status_raw}'"),
    })?;
    let dependencies: Vec<String> = row.try_get("dependencies")?;
    Ok(Task {
        id: TaskId::new(id),
        job_id: JobId::new(row.try_get::<String, _>("job_id")?),
        stage: Stage::new(row.try_get::<String, _>("stage")?),
        engine_id: EngineId::new(row.try_get::<String, _>("engine_id")?),
        status,
        dependencies: dependencies.into_iter().map(TaskId::new).collect(),
        config: row.try_get("config")?,
        input_uri: row.try_get("input_uri")?,
        output_uri: row.try_get("output_uri")?,
        retries: row.try_get::<i32, _>("retries")?.max(0) as u32,
        max_retries: row.try_get::<i32, _>("max_retries")?.max(0) as u32,
        required: row.try_get("required")?,
        delivery_count: row.try_get::<i32, _>("delivery_count")?.max(0) as u32,
        reselections: row.try_get::<i32, _>("reselections")?.max(0) as u32,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO jobs \
             (id, tenant_id, status, audio_uri, parameters, error, warnings, \
              created_at, started_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(job.id.as_str())
        .bind(&job.tenant_id)
        .bind(job.status.as_str())
        .bind(&job.audio_uri)
        .bind(serde_json::to_value(&job.params)?)
        .bind(job.error.as_ref().map(serde_json::to_value).transpose()?)
        .bind(serde_json::to_value(&job.warnings)?)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn claim_job_running(
        &self,
        id: &JobId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "UPDATE jobs SET status = 'running', started_at = $2 \
             WHERE id = $1 AND status = 'pending' RETURNING id",
        )
        .bind(id.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn complete_job(&self, id: &JobId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "UPDATE jobs SET status = 'completed', completed_at = $2 \
             WHERE id = $1 AND status = 'running' RETURNING id",
        )
        .bind(id.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn fail_job(
        &self,
        id: &JobId,
        error: &JobError,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "UPDATE jobs SET status = 'failed', error = $2, completed_at = $3 \
             WHERE id = $1 AND status IN ('pending', 'running') RETURNING id",
        )
        .bind(id.as_str())
        .bind(serde_json::to_value(error)?)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn cancel_job(&self, id: &JobId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "UPDATE jobs SET status = 'cancelled', completed_at = $2 \
             WHERE id = $1 AND status IN ('pending', 'running') RETURNING id",
        )
        .bind(id.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn append_warning(
        &self,
        id: &JobId,
        warning: &PipelineWarning,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE jobs SET warnings = warnings || $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(serde_json::to_value(vec![warning])?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let Some(first) = tasks.first() else {
            return Ok(());
        };
        let job_id = first.job_id.clone();
        let mut tx = self.pool.begin().await?;
        for task in tasks {
            let dependencies: Vec<String> =
                task.dependencies.iter().map(|d| d.to_string()).collect();
            let result = sqlx::query(
                "INSERT INTO tasks \
                 (id, job_id, stage, engine_id, status, dependencies, config, \
                  input_uri, output_uri, retries, max_retries, required, \
                  delivery_count, reselections, error, created_at, started_at, \
                  completed_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
                         $13, $14, $15, $16, $17, $18)",
            )
            .bind(task.id.as_str())
            .bind(task.job_id.as_str())
            .bind(task.stage.as_str())
            .bind(task.engine_id.as_str())
            .bind(task.status.as_str())
            .bind(&dependencies)
            .bind(&task.config)
            .bind(&task.input_uri)
            .bind(&task.output_uri)
            .bind(task.retries as i32)
            .bind(task.max_retries as i32)
            .bind(task.required)
            .bind(task.delivery_count as i32)
            .bind(task.reselections as i32)
            .bind(&task.error)
            .bind(task.created_at)
            .bind(task.started_at)
            .bind(task.completed_at)
            .execute(&mut *tx)
            .await;
            if let Err(err) = result {
                if is_unique_violation(&err) {
                    tx.rollback().await?;
                    return Err(StoreError::UniqueViolation {
                        job_id: job_id.to_string(),
                    });
                }
                return Err(err.into());
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn get_tasks_for_job(&self, job_id: &JobId) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE job_id = $1 ORDER BY created_at, id")
            .bind(job_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn mark_task_ready(&self, id: &TaskId) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "UPDATE tasks SET status = 'ready' \
             WHERE id = $1 AND status = 'pending' RETURNING id",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn mark_task_running(
        &self,
        id: &TaskId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "UPDATE tasks SET status = 'running', \
             delivery_count = delivery_count + 1, \
             started_at = COALESCE(started_at, $2) \
             WHERE id = $1 AND status IN ('ready', 'running') RETURNING id",
        )
        .bind(id.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn complete_task(
        &self,
        id: &TaskId,
        output_uri: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE tasks SET status = 'completed', \
             output_uri = COALESCE($2, output_uri), completed_at = $3, error = NULL \
             WHERE id = $1 AND {TERMINAL_TASK_GUARD} RETURNING id"
        ))
        .bind(id.as_str())
        .bind(output_uri)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn fail_task(
        &self,
        id: &TaskId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE tasks SET status = 'failed', error = $2, completed_at = $3 \
             WHERE id = $1 AND {TERMINAL_TASK_GUARD} RETURNING id"
        ))
        .bind(id.as_str())
        .bind(error)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn skip_task(
        &self,
        id: &TaskId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE tasks SET status = 'skipped', error = $2, completed_at = $3 \
             WHERE id = $1 AND {TERMINAL_TASK_GUARD} RETURNING id"
        ))
        .bind(id.as_str())
        .bind(error)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn requeue_task(&self, id: &TaskId, error: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "UPDATE tasks SET status = 'ready', retries = retries + 1, error = $2 \
             WHERE id = $1 AND status IN ('ready', 'running') \
             AND retries < max_retries RETURNING id",
        )
        .bind(id.as_str())
        .bind(error)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn reassign_task(
        &self,
        id: &TaskId,
        engine_id: &EngineId,
        config: &serde_json::Value,
        max_reselections: u32,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "UPDATE tasks SET status = 'ready', engine_id = $2, config = $3, \
             reselections = reselections + 1 \
             WHERE id = $1 AND status IN ('ready', 'running') \
             AND reselections < $4 RETURNING id",
        )
        .bind(id.as_str())
        .bind(engine_id.as_str())
        .bind(config)
        .bind(max_reselections as i32)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}
