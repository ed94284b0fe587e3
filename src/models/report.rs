//! Derived reporting types.
//!
//! Episodes and mission reports are computed from persisted frames and
//! alerts on demand; neither is ever stored.

use chrono::{DateTime, Utc};

/// A contiguous ground-truth presence interval, in mission seconds.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Episode {
    pub start_sec: f64,
    pub end_sec: f64,
}

/// Mission-level detection and review quality summary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MissionReport {
    pub mission_id: String,
    pub episodes_total: usize,
    pub episodes_found: usize,
    pub recall_event: f64,
    pub ttfc_sec: Option<f64>,
    pub alerts_total: usize,
    pub alerts_confirmed: usize,
    pub alerts_rejected: usize,
    pub false_alerts_total: usize,
    pub fp_per_hour: f64,
    pub generated_at: DateTime<Utc>,
}
