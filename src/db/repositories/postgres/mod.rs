//! Postgres repository implementation using Diesel.
//!
//! This module implements the repository traits against a Postgres database.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task;

use crate::db::repository::{
    AlertRepository, ErrorContext, FrameEventRepository, MissionRepository, RepositoryError,
    RepositoryResult,
};
use crate::models::{Alert, AlertStatus, FrameEvent, Mission, MissionStatus, ReviewDecision};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
    /// - `PG_POOL_MAX`: Maximum pool size (default: 10)
    /// - `PG_POOL_MIN`: Minimum pool size (default: 1)
    /// - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
    /// - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
    /// - `PG_MAX_RETRIES`: Maximum retry attempts (default: 3)
    /// - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let max_pool_size = std::env::var("PG_POOL_MAX")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let min_pool_size = std::env::var("PG_POOL_MIN")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        let connection_timeout_sec = std::env::var("PG_CONN_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_sec = std::env::var("PG_IDLE_TIMEOUT_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        let max_retries = std::env::var("PG_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("PG_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            max_pool_size,
            min_pool_size,
            connection_timeout_sec,
            idle_timeout_sec,
            max_retries,
            retry_delay_ms,
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
///
/// This repository implementation provides:
/// - Connection pooling with configurable limits
/// - Automatic retry for transient failures
/// - Health monitoring and statistics
/// - Automatic schema migrations
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: std::sync::Arc<AtomicU64>,
    failed_queries: std::sync::Arc<AtomicU64>,
    retried_operations: std::sync::Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Arguments
    /// * `config` - Database configuration
    ///
    /// # Returns
    /// * `Ok(PostgresRepository)` on success
    /// * `Err(RepositoryError)` if connection or migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: std::sync::Arc::new(AtomicU64::new(0)),
            failed_queries: std::sync::Arc::new(AtomicU64::new(0)),
            retried_operations: std::sync::Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// This method will retry the operation up to `max_retries` times if a
    /// retryable error occurs (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                // Get connection
                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                // Execute the operation
                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    ///
    /// Returns current pool state and query statistics for monitoring.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    ///
    /// Performs a simple query to verify connectivity.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    /// Get detailed health information.
    ///
    /// Returns a tuple of (is_healthy, latency_ms, error_message).
    pub async fn health_check_detailed(&self) -> (bool, Option<u64>, Option<String>) {
        let start = Instant::now();
        match self.health_check().await {
            Ok(true) => (true, Some(start.elapsed().as_millis() as u64), None),
            Ok(false) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some("Health check returned false".to_string()),
            ),
            Err(e) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some(e.to_string()),
            ),
        }
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn load_mission_row(
    conn: &mut PgConnection,
    id: &str,
) -> Result<Option<MissionRow>, diesel::result::Error> {
    missions::table
        .find(id)
        .select(MissionRow::as_select())
        .first::<MissionRow>(conn)
        .optional()
}

#[async_trait]
impl MissionRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn insert_mission(&self, mission: Mission) -> RepositoryResult<Mission> {
        let row = MissionRow::from_mission(&mission);
        self.with_conn(move |conn| {
            diesel::insert_into(missions::table)
                .values(&row)
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(())
        })
        .await?;
        Ok(mission)
    }

    async fn get_mission(&self, mission_id: &str) -> RepositoryResult<Mission> {
        let id = mission_id.to_string();
        self.with_conn(move |conn| {
            load_mission_row(conn, &id)
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::not_found(format!("Mission {} not found", id)))?
                .into_mission()
        })
        .await
    }

    async fn update_mission_status(
        &self,
        mission_id: &str,
        status: MissionStatus,
    ) -> RepositoryResult<Mission> {
        let id = mission_id.to_string();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let current = load_mission_row(tx, &id)
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| {
                        RepositoryError::not_found(format!("Mission {} not found", id))
                    })?
                    .into_mission()?;

                if !current.status.can_transition_to(status) {
                    return Err(RepositoryError::validation_with_context(
                        format!(
                            "Illegal mission transition {} -> {}",
                            current.status.as_str(),
                            status.as_str()
                        ),
                        ErrorContext::new("update_mission_status")
                            .with_entity("mission")
                            .with_entity_id(&id),
                    ));
                }

                let updated: MissionRow = diesel::update(missions::table.find(&id))
                    .set(missions::status.eq(status.as_str()))
                    .returning(MissionRow::as_returning())
                    .get_result(tx)
                    .map_err(map_diesel_error)?;
                updated.into_mission()
            })
        })
        .await
    }

    async fn list_missions(&self) -> RepositoryResult<Vec<Mission>> {
        self.with_conn(|conn| {
            let rows: Vec<MissionRow> = missions::table
                .order(missions::created_at.desc())
                .select(MissionRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(MissionRow::into_mission).collect()
        })
        .await
    }
}

#[async_trait]
impl FrameEventRepository for PostgresRepository {
    async fn insert_frame_event(&self, frame: FrameEvent) -> RepositoryResult<()> {
        let row = FrameEventRow::from_frame(&frame);
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                if load_mission_row(tx, &row.mission_id)
                    .map_err(map_diesel_error)?
                    .is_none()
                {
                    return Err(RepositoryError::not_found(format!(
                        "Mission {} not found",
                        row.mission_id
                    )));
                }

                // Duplicate (mission_id, frame_id) trips the primary key and
                // surfaces as a validation error.
                diesel::insert_into(frame_events::table)
                    .values(&row)
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                Ok(())
            })
        })
        .await
    }

    async fn frames_for_mission(&self, mission_id: &str) -> RepositoryResult<Vec<FrameEvent>> {
        let id = mission_id.to_string();
        self.with_conn(move |conn| {
            if load_mission_row(conn, &id)
                .map_err(map_diesel_error)?
                .is_none()
            {
                return Err(RepositoryError::not_found(format!(
                    "Mission {} not found",
                    id
                )));
            }

            let rows: Vec<FrameEventRow> = frame_events::table
                .filter(frame_events::mission_id.eq(&id))
                .order(frame_events::frame_id.asc())
                .select(FrameEventRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(FrameEventRow::into_frame).collect())
        })
        .await
    }
}

#[async_trait]
impl AlertRepository for PostgresRepository {
    async fn insert_alert(&self, alert: Alert) -> RepositoryResult<Alert> {
        let row = AlertRow::from_alert(&alert)?;
        self.with_conn(move |conn| {
            diesel::insert_into(alerts::table)
                .values(&row)
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(())
        })
        .await?;
        Ok(alert)
    }

    async fn get_alert(&self, alert_id: &str) -> RepositoryResult<Alert> {
        let id = alert_id.to_string();
        self.with_conn(move |conn| {
            alerts::table
                .find(&id)
                .select(AlertRow::as_select())
                .first::<AlertRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| RepositoryError::not_found(format!("Alert {} not found", id)))?
                .into_alert()
        })
        .await
    }

    async fn list_alerts(
        &self,
        mission_id: Option<&str>,
        status: Option<AlertStatus>,
    ) -> RepositoryResult<Vec<Alert>> {
        let mission_id = mission_id.map(|s| s.to_string());
        self.with_conn(move |conn| {
            let mut query = alerts::table.into_boxed();
            if let Some(ref mission) = mission_id {
                query = query.filter(alerts::mission_id.eq(mission.clone()));
            }
            if let Some(status) = status {
                query = query.filter(alerts::status.eq(status.as_str()));
            }
            let rows: Vec<AlertRow> = query
                .order((alerts::ts_sec.asc(), alerts::frame_id.asc()))
                .select(AlertRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows.into_iter().map(AlertRow::into_alert).collect()
        })
        .await
    }

    async fn review_alert(
        &self,
        alert_id: &str,
        decision: ReviewDecision,
    ) -> RepositoryResult<Alert> {
        let id = alert_id.to_string();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let current: AlertRow = alerts::table
                    .find(&id)
                    .select(AlertRow::as_select())
                    .first::<AlertRow>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| {
                        RepositoryError::not_found(format!("Alert {} not found", id))
                    })?;

                if current.status != AlertStatus::Queued.as_str() {
                    return Err(RepositoryError::conflict_with_context(
                        "Alert already reviewed",
                        ErrorContext::new("review_alert")
                            .with_entity("alert")
                            .with_entity_id(&id),
                    ));
                }

                let reviewed_at = decision.reviewed_at_sec.unwrap_or(current.ts_sec);
                let target: AlertStatus = decision.status.into();
                let updated: AlertRow = diesel::update(
                    alerts::table.find(&id).filter(
                        alerts::status.eq(AlertStatus::Queued.as_str()),
                    ),
                )
                .set((
                    alerts::status.eq(target.as_str()),
                    alerts::reviewed_by.eq(decision.reviewed_by.clone()),
                    alerts::reviewed_at_sec.eq(Some(reviewed_at)),
                    alerts::decision_reason.eq(decision.decision_reason.clone()),
                ))
                .returning(AlertRow::as_returning())
                .get_result(tx)
                .map_err(map_diesel_error)?;
                updated.into_alert()
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Live-database tests are ignored by default; point DATABASE_URL at a
    // scratch database and run with --ignored to exercise them.

    fn live_config() -> Option<PostgresConfig> {
        PostgresConfig::from_env().ok()
    }

    #[tokio::test]
    #[ignore]
    async fn live_mission_round_trip() {
        let Some(config) = live_config() else {
            return;
        };
        let repo = PostgresRepository::new(config).expect("connect");
        let mission = repo
            .insert_mission(Mission::new("pg-test", 0, 2.0))
            .await
            .expect("insert");
        let fetched = repo.get_mission(&mission.mission_id).await.expect("get");
        assert_eq!(fetched.mission_id, mission.mission_id);
        assert_eq!(fetched.status, MissionStatus::Created);
    }

    #[tokio::test]
    #[ignore]
    async fn live_health_check() {
        let Some(config) = live_config() else {
            return;
        };
        let repo = PostgresRepository::new(config).expect("connect");
        assert!(repo.health_check().await.expect("health"));
        let stats = repo.get_pool_stats();
        assert!(stats.total_queries >= 1);
    }
}
