//! Data Transfer Objects for the HTTP API.
//!
//! These DTOs are used for request/response serialization in the REST API.
//! Most payloads are re-exported from the model and service modules since
//! they already derive Serialize/Deserialize.

use serde::{Deserialize, Serialize};

// Re-export existing DTOs that are already serializable
pub use crate::api::{
    // Alerts
    Alert,
    AlertStatus,
    // Frames
    Detection,
    // Reports
    Episode,
    FrameEvent,
    FrameEventInput,
    // Ingestion
    IngestOutcome,
    // Missions
    Mission,
    MissionReport,
    MissionStatus,
    // Replay
    ReplayOptions,
    ReplayState,
    ReplayStatus,
    // Review
    ReviewDecision,
    ReviewedStatus,
};

/// Request body for creating a new mission.
///
/// Every field is optional; `POST /v1/missions` with an empty body
/// creates a mission with the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMissionRequest {
    /// Label for the footage source (camera id, replay directory, ...)
    #[serde(default)]
    pub source_name: String,
    /// Expected number of frames, when known up front
    #[serde(default)]
    pub total_frames: i64,
    /// Capture rate in frames per second
    #[serde(default = "default_fps")]
    pub fps: f64,
}

fn default_fps() -> f64 {
    2.0
}

impl Default for CreateMissionRequest {
    fn default() -> Self {
        Self {
            source_name: String::new(),
            total_frames: 0,
            fps: default_fps(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
}

/// Build version response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Mission list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionListResponse {
    /// List of missions
    pub missions: Vec<Mission>,
    /// Total count
    pub total: usize,
}

/// Query parameters for the alert listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertListQuery {
    /// Restrict to one mission (optional)
    #[serde(default)]
    pub mission_id: Option<String>,
    /// Restrict to one lifecycle status (optional)
    #[serde(default)]
    pub status: Option<String>,
}

/// Alert list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertListResponse {
    /// Alerts sorted by (ts_sec, frame_id)
    pub alerts: Vec<Alert>,
    /// Total count
    pub total: usize,
}

/// Episode list response for one mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodesResponse {
    /// Mission the episodes belong to
    pub mission_id: String,
    /// Number of reconstructed episodes
    pub episodes_total: usize,
    /// Episodes in frame order
    pub episodes: Vec<Episode>,
}
