//! High-level storage service layer.
//!
//! This module provides repository-agnostic operations that work with any
//! implementation of the repository traits. These functions carry the
//! business rules that must hold regardless of the storage backend:
//! lifecycle enforcement, review semantics, and derived mission views.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (REST API, replay runner)             │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs) - Business Logic            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                │
//! ┌───▼──────────────┐     ┌───────────▼─────────────┐
//! │ Postgres (Diesel)│     │ Local Repository        │
//! │                  │     │ (in-memory)             │
//! └──────────────────┘     └─────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use skywatch::db::{services, repositories::LocalRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!
//!     let mission = services::create_mission(&repo, "camera-a", 0, 2.0).await?;
//!     println!("Created mission {}", mission.mission_id);
//!
//!     Ok(())
//! }
//! ```

use log::info;

use super::repository::{FullRepository, RepositoryResult};
use crate::models::{
    Alert, AlertStatus, Episode, FrameEvent, Mission, MissionReport, MissionStatus, ReviewDecision,
};
use crate::services::episodes::reconstruct_episodes;
use crate::services::report::build_report;

// ==================== Health & Connection ====================

/// Check if the storage backend is healthy.
///
/// This is a simple pass-through to the repository's health check.
pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Mission Operations ====================

/// Create a new mission in `created` state.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `source_name` - Free-form origin label (camera id, replay directory, ...)
/// * `total_frames` - Expected frame count, 0 when unknown
/// * `fps` - Source frame rate, 0 when unknown
///
/// # Returns
/// * `Ok(Mission)` - The stored mission with its generated id
pub async fn create_mission<R: FullRepository + ?Sized>(
    repo: &R,
    source_name: impl Into<String>,
    total_frames: i64,
    fps: f64,
) -> RepositoryResult<Mission> {
    let mission = Mission::new(source_name, total_frames, fps);
    info!(
        "Service layer: creating mission {} (source '{}')",
        mission.mission_id, mission.source_name
    );
    repo.insert_mission(mission).await
}

/// Retrieve a mission by id.
pub async fn get_mission<R: FullRepository + ?Sized>(
    repo: &R,
    mission_id: &str,
) -> RepositoryResult<Mission> {
    repo.get_mission(mission_id).await
}

/// List all missions, newest first.
pub async fn list_missions<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<Vec<Mission>> {
    info!("Service layer: listing missions");
    repo.list_missions().await
}

/// Move a mission to `running`.
///
/// # Returns
/// * `Err(RepositoryError::ValidationError)` - If the mission already left `created`
pub async fn start_mission<R: FullRepository + ?Sized>(
    repo: &R,
    mission_id: &str,
) -> RepositoryResult<Mission> {
    info!("Service layer: starting mission {}", mission_id);
    repo.update_mission_status(mission_id, MissionStatus::Running)
        .await
}

/// Move a mission to `completed`.
pub async fn complete_mission<R: FullRepository + ?Sized>(
    repo: &R,
    mission_id: &str,
) -> RepositoryResult<Mission> {
    info!("Service layer: completing mission {}", mission_id);
    repo.update_mission_status(mission_id, MissionStatus::Completed)
        .await
}

// ==================== Frame Operations ====================

/// All frame events of a mission, sorted by `frame_id`.
pub async fn frames_for_mission<R: FullRepository + ?Sized>(
    repo: &R,
    mission_id: &str,
) -> RepositoryResult<Vec<FrameEvent>> {
    repo.frames_for_mission(mission_id).await
}

// ==================== Alert Operations ====================

/// List alerts, optionally filtered by mission and/or status.
pub async fn list_alerts<R: FullRepository + ?Sized>(
    repo: &R,
    mission_id: Option<&str>,
    status: Option<AlertStatus>,
) -> RepositoryResult<Vec<Alert>> {
    repo.list_alerts(mission_id, status).await
}

/// Retrieve an alert by id.
pub async fn get_alert<R: FullRepository + ?Sized>(
    repo: &R,
    alert_id: &str,
) -> RepositoryResult<Alert> {
    repo.get_alert(alert_id).await
}

/// Apply a review decision to a queued alert.
///
/// The repository performs the compare-and-swap; an alert that already
/// left `queued` comes back as a conflict with nothing modified.
pub async fn review_alert<R: FullRepository + ?Sized>(
    repo: &R,
    alert_id: &str,
    decision: ReviewDecision,
) -> RepositoryResult<Alert> {
    info!(
        "Service layer: reviewing alert {} -> {:?}",
        alert_id, decision.status
    );
    repo.review_alert(alert_id, decision).await
}

// ==================== Derived Views ====================

/// Reconstruct the ground-truth episodes of a mission.
///
/// # Returns
/// * `Err(RepositoryError::NotFound)` - If the mission doesn't exist
pub async fn mission_episodes<R: FullRepository + ?Sized>(
    repo: &R,
    mission_id: &str,
) -> RepositoryResult<Vec<Episode>> {
    let frames = repo.frames_for_mission(mission_id).await?;
    Ok(reconstruct_episodes(&frames))
}

/// Build the mission quality report from persisted frames and alerts.
///
/// Read-only: recomputing the report never changes stored data, so two
/// consecutive calls differ only in `generated_at`.
///
/// # Returns
/// * `Err(RepositoryError::NotFound)` - If the mission doesn't exist
pub async fn mission_report<R: FullRepository + ?Sized>(
    repo: &R,
    mission_id: &str,
) -> RepositoryResult<MissionReport> {
    let mission = repo.get_mission(mission_id).await?;
    let frames = repo.frames_for_mission(mission_id).await?;
    let alerts = repo.list_alerts(Some(mission_id), None).await?;
    info!(
        "Service layer: building report for mission {} ({} frames, {} alerts)",
        mission_id,
        frames.len(),
        alerts.len()
    );
    Ok(build_report(&mission.mission_id, &frames, &alerts))
}
