//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! existing service layer for business logic.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::str::FromStr;
use std::time::Duration;

use super::dto::{
    Alert, AlertListQuery, AlertListResponse, AlertStatus, CreateMissionRequest, EpisodesResponse,
    FrameEventInput, HealthResponse, IngestOutcome, Mission, MissionListResponse, MissionReport,
    ReadyResponse, ReplayOptions, ReplayState, ReplayStatus, ReviewDecision, VersionResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health & Build Info
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and the
/// repository backend is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

/// GET /ready
pub async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ready".to_string(),
    })
}

/// GET /version
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Mission Lifecycle
// =============================================================================

/// POST /v1/missions
///
/// Create a new mission. The body is optional; an empty body creates a
/// mission with default metadata.
pub async fn create_mission(
    State(state): State<AppState>,
    body: Option<Json<CreateMissionRequest>>,
) -> HandlerResult<Mission> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let mission = db_services::create_mission(
        state.repository.as_ref(),
        request.source_name,
        request.total_frames,
        request.fps,
    )
    .await?;

    Ok(Json(mission))
}

/// GET /v1/missions
///
/// List all missions.
pub async fn list_missions(State(state): State<AppState>) -> HandlerResult<MissionListResponse> {
    let missions = db_services::list_missions(state.repository.as_ref()).await?;
    let total = missions.len();

    Ok(Json(MissionListResponse { missions, total }))
}

/// GET /v1/missions/{mission_id}
pub async fn get_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> HandlerResult<Mission> {
    let mission = db_services::get_mission(state.repository.as_ref(), &mission_id).await?;
    Ok(Json(mission))
}

/// POST /v1/missions/{mission_id}/start
///
/// Move the mission to `running`. Backward transitions are rejected.
pub async fn start_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> HandlerResult<Mission> {
    let mission = db_services::start_mission(state.repository.as_ref(), &mission_id).await?;
    Ok(Json(mission))
}

/// POST /v1/missions/{mission_id}/complete
pub async fn complete_mission(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> HandlerResult<Mission> {
    let mission = db_services::complete_mission(state.repository.as_ref(), &mission_id).await?;
    Ok(Json(mission))
}

// =============================================================================
// Frame Ingestion
// =============================================================================

/// POST /v1/frames
///
/// Ingest one frame event: persist it, run the alert decision engine
/// over its detections and report which alerts, if any, were raised.
pub async fn ingest_frame(
    State(state): State<AppState>,
    Json(input): Json<FrameEventInput>,
) -> HandlerResult<IngestOutcome> {
    input.validate().map_err(AppError::Unprocessable)?;

    let outcome =
        crate::services::ingest_frame_event(state.repository.as_ref(), &state.engine, input)
            .await?;

    Ok(Json(outcome))
}

// =============================================================================
// Alerts & Review
// =============================================================================

/// GET /v1/alerts
///
/// List alerts sorted by (ts_sec, frame_id), optionally filtered by
/// mission and/or lifecycle status.
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertListQuery>,
) -> HandlerResult<AlertListResponse> {
    let status = query
        .status
        .as_deref()
        .map(AlertStatus::from_str)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let alerts =
        db_services::list_alerts(state.repository.as_ref(), query.mission_id.as_deref(), status)
            .await?;
    let total = alerts.len();

    Ok(Json(AlertListResponse { alerts, total }))
}

/// GET /v1/alerts/{alert_id}
pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> HandlerResult<Alert> {
    let alert = db_services::get_alert(state.repository.as_ref(), &alert_id).await?;
    Ok(Json(alert))
}

/// POST /v1/alerts/{alert_id}/review
///
/// Apply a pilot's verdict to a queued alert. The decision status only
/// parses to the two terminal states, so anything else is rejected at
/// the deserialization boundary. Reviewing an already-reviewed alert
/// returns 409 with nothing modified.
pub async fn review_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    Json(decision): Json<ReviewDecision>,
) -> HandlerResult<Alert> {
    let alert = db_services::review_alert(state.repository.as_ref(), &alert_id, decision).await?;
    Ok(Json(alert))
}

// =============================================================================
// Derived Views
// =============================================================================

/// GET /v1/missions/{mission_id}/episodes
///
/// Reconstruct the ground-truth episodes of a mission from its frames.
pub async fn get_episodes(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> HandlerResult<EpisodesResponse> {
    let episodes = db_services::mission_episodes(state.repository.as_ref(), &mission_id).await?;
    let episodes_total = episodes.len();

    Ok(Json(EpisodesResponse {
        mission_id,
        episodes_total,
        episodes,
    }))
}

/// GET /v1/missions/{mission_id}/report
///
/// Build the mission quality report. Read-only; repeated calls differ
/// only in `generated_at`.
pub async fn get_report(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> HandlerResult<MissionReport> {
    let report = db_services::mission_report(state.repository.as_ref(), &mission_id).await?;
    Ok(Json(report))
}

// =============================================================================
// Background Replay
// =============================================================================

/// POST /v1/missions/{mission_id}/replay
///
/// Start replaying a recorded frame directory into the mission. Returns
/// 202 with the initial replay state; progress is observed via the poll
/// or SSE endpoints.
pub async fn start_replay(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
    Json(options): Json<ReplayOptions>,
) -> Result<(StatusCode, Json<ReplayState>), AppError> {
    let replay_state = crate::services::start_replay(
        state.repository.clone(),
        state.engine.clone(),
        state.replay.clone(),
        &mission_id,
        &options,
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(replay_state)))
}

/// GET /v1/missions/{mission_id}/replay
///
/// Poll the state of the mission's most recent replay.
pub async fn get_replay_status(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> HandlerResult<ReplayState> {
    let replay_state = state
        .replay
        .get(&mission_id)
        .ok_or_else(|| AppError::NotFound(format!("No replay found for mission {}", mission_id)))?;

    Ok(Json(replay_state))
}

/// DELETE /v1/missions/{mission_id}/replay
///
/// Cancel a running replay. The background task stops at its next frame
/// boundary.
pub async fn cancel_replay(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> HandlerResult<ReplayState> {
    let replay_state = crate::services::cancel_replay(&state.replay, &mission_id)?;
    Ok(Json(replay_state))
}

/// GET /v1/missions/{mission_id}/replay/logs/stream
///
/// Stream replay logs via Server-Sent Events (SSE).
pub async fn stream_replay_logs(
    State(state): State<AppState>,
    Path(mission_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Verify a replay exists for the mission
    if state.replay.get(&mission_id).is_none() {
        return Err(AppError::NotFound(format!(
            "No replay found for mission {}",
            mission_id
        )));
    }

    let tracker = state.replay.clone();
    let stream = async_stream::stream! {
        let mut last_log_count = 0;
        loop {
            // Send new logs since last check
            let logs = tracker.get_logs(&mission_id);
            for log in logs.iter().skip(last_log_count) {
                let event_data = serde_json::to_string(log).unwrap_or_default();
                yield Ok(Event::default().data(event_data));
            }
            last_log_count = logs.len();

            // Check if the replay reached a terminal status
            if let Some(replay) = tracker.get(&mission_id) {
                if replay.status != ReplayStatus::Running {
                    // Serde serialization keeps the status values lowercase
                    // ("completed", "failed", "cancelled")
                    let final_event = serde_json::json!({
                        "status": replay.status,
                        "processed_frames": replay.processed_frames,
                        "error": replay.error,
                    });
                    yield Ok(Event::default()
                        .event("complete")
                        .data(serde_json::to_string(&final_event).unwrap_or_default()));
                    break;
                }
            } else {
                break;
            }

            // Wait before checking again
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}
