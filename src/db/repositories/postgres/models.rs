use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use super::schema::{alerts, frame_events, missions};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{Alert, AlertLifecycle, AlertStatus, FrameEvent, Mission, MissionStatus};

// Primary keys are client-generated, so one row struct serves both
// queries and inserts for each table.

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = missions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MissionRow {
    pub mission_id: String,
    pub source_name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub total_frames: i64,
    pub fps: f64,
}

impl MissionRow {
    pub fn from_mission(mission: &Mission) -> Self {
        Self {
            mission_id: mission.mission_id.clone(),
            source_name: mission.source_name.clone(),
            status: mission.status.as_str().to_string(),
            created_at: mission.created_at,
            total_frames: mission.total_frames,
            fps: mission.fps,
        }
    }

    pub fn into_mission(self) -> RepositoryResult<Mission> {
        let status: MissionStatus = self.status.parse().map_err(|e: String| {
            RepositoryError::internal(format!("Corrupt mission row {}: {}", self.mission_id, e))
        })?;
        Ok(Mission {
            mission_id: self.mission_id,
            source_name: self.source_name,
            status,
            created_at: self.created_at,
            total_frames: self.total_frames,
            fps: self.fps,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = frame_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FrameEventRow {
    pub mission_id: String,
    pub frame_id: i64,
    pub ts_sec: f64,
    pub image_uri: String,
    pub gt_person_present: bool,
    pub gt_episode_id: Option<i64>,
}

impl FrameEventRow {
    pub fn from_frame(frame: &FrameEvent) -> Self {
        Self {
            mission_id: frame.mission_id.clone(),
            frame_id: frame.frame_id,
            ts_sec: frame.ts_sec,
            image_uri: frame.image_uri.clone(),
            gt_person_present: frame.gt_person_present,
            gt_episode_id: frame.gt_episode_id,
        }
    }

    pub fn into_frame(self) -> FrameEvent {
        FrameEvent {
            mission_id: self.mission_id,
            frame_id: self.frame_id,
            ts_sec: self.ts_sec,
            image_uri: self.image_uri,
            gt_person_present: self.gt_person_present,
            gt_episode_id: self.gt_episode_id,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = alerts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AlertRow {
    pub alert_id: String,
    pub mission_id: String,
    pub frame_id: i64,
    pub ts_sec: f64,
    pub image_uri: String,
    pub detection_json: Value,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at_sec: Option<f64>,
    pub decision_reason: Option<String>,
}

impl AlertRow {
    pub fn from_alert(alert: &Alert) -> RepositoryResult<Self> {
        let detection_json = serde_json::to_value(&alert.detection).map_err(|e| {
            RepositoryError::internal(format!("Failed to serialize detection: {}", e))
        })?;
        Ok(Self {
            alert_id: alert.alert_id.clone(),
            mission_id: alert.mission_id.clone(),
            frame_id: alert.frame_id,
            ts_sec: alert.ts_sec,
            image_uri: alert.image_uri.clone(),
            detection_json,
            status: alert.lifecycle.status.as_str().to_string(),
            reviewed_by: alert.lifecycle.reviewed_by.clone(),
            reviewed_at_sec: alert.lifecycle.reviewed_at_sec,
            decision_reason: alert.lifecycle.decision_reason.clone(),
        })
    }

    pub fn into_alert(self) -> RepositoryResult<Alert> {
        let status: AlertStatus = self.status.parse().map_err(|e: String| {
            RepositoryError::internal(format!("Corrupt alert row {}: {}", self.alert_id, e))
        })?;
        let detection = serde_json::from_value(self.detection_json).map_err(|e| {
            RepositoryError::internal(format!(
                "Failed to parse detection JSON for alert {}: {}",
                self.alert_id, e
            ))
        })?;
        Ok(Alert {
            alert_id: self.alert_id,
            mission_id: self.mission_id,
            frame_id: self.frame_id,
            ts_sec: self.ts_sec,
            image_uri: self.image_uri,
            detection,
            lifecycle: AlertLifecycle {
                status,
                reviewed_by: self.reviewed_by,
                reviewed_at_sec: self.reviewed_at_sec,
                decision_reason: self.decision_reason,
            },
        })
    }
}
