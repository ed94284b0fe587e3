//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory using HashMap and Vec structures, providing fast, deterministic,
//! and isolated execution.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::db::repository::*;
use crate::models::{Alert, AlertStatus, FrameEvent, Mission, MissionStatus, ReviewDecision};

/// In-memory local repository.
///
/// This implementation stores all data in memory using HashMaps and Vecs,
/// making it ideal for unit tests and local development that need isolation
/// and speed.
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    missions: HashMap<String, Mission>,
    // Frame events per mission, in insertion order
    frames: HashMap<String, Vec<FrameEvent>>,
    alerts: HashMap<String, Alert>,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            missions: HashMap::new(),
            frames: HashMap::new(),
            alerts: HashMap::new(),
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        let mut data = self.data.write().unwrap();
        data.is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write().unwrap();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of missions stored.
    pub fn mission_count(&self) -> usize {
        self.data.read().unwrap().missions.len()
    }

    /// Get the number of alerts stored.
    pub fn alert_count(&self) -> usize {
        self.data.read().unwrap().alerts.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        let data = self.data.read().unwrap();
        if !data.is_healthy {
            return Err(RepositoryError::connection("Repository is not healthy"));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MissionRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let data = self.data.read().unwrap();
        Ok(data.is_healthy)
    }

    async fn insert_mission(&self, mission: Mission) -> RepositoryResult<Mission> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if data.missions.contains_key(&mission.mission_id) {
            return Err(RepositoryError::validation_with_context(
                format!("Mission {} already exists", mission.mission_id),
                ErrorContext::new("insert_mission")
                    .with_entity("mission")
                    .with_entity_id(&mission.mission_id),
            ));
        }
        data.frames.insert(mission.mission_id.clone(), Vec::new());
        data.missions
            .insert(mission.mission_id.clone(), mission.clone());
        Ok(mission)
    }

    async fn get_mission(&self, mission_id: &str) -> RepositoryResult<Mission> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.missions
            .get(mission_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Mission {} not found", mission_id)))
    }

    async fn update_mission_status(
        &self,
        mission_id: &str,
        status: MissionStatus,
    ) -> RepositoryResult<Mission> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let mission = data.missions.get_mut(mission_id).ok_or_else(|| {
            RepositoryError::not_found(format!("Mission {} not found", mission_id))
        })?;
        if !mission.status.can_transition_to(status) {
            return Err(RepositoryError::validation_with_context(
                format!(
                    "Illegal mission transition {} -> {}",
                    mission.status.as_str(),
                    status.as_str()
                ),
                ErrorContext::new("update_mission_status")
                    .with_entity("mission")
                    .with_entity_id(mission_id),
            ));
        }
        mission.status = status;
        Ok(mission.clone())
    }

    async fn list_missions(&self) -> RepositoryResult<Vec<Mission>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut missions: Vec<Mission> = data.missions.values().cloned().collect();
        missions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(missions)
    }
}

#[async_trait]
impl FrameEventRepository for LocalRepository {
    async fn insert_frame_event(&self, frame: FrameEvent) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        if !data.missions.contains_key(&frame.mission_id) {
            return Err(RepositoryError::not_found(format!(
                "Mission {} not found",
                frame.mission_id
            )));
        }
        let frames = data.frames.entry(frame.mission_id.clone()).or_default();
        if frames.iter().any(|f| f.frame_id == frame.frame_id) {
            return Err(RepositoryError::validation_with_context(
                format!(
                    "Frame {} already recorded for mission {}",
                    frame.frame_id, frame.mission_id
                ),
                ErrorContext::new("insert_frame_event")
                    .with_entity("frame_event")
                    .with_entity_id(frame.frame_id),
            ));
        }
        frames.push(frame);
        Ok(())
    }

    async fn frames_for_mission(&self, mission_id: &str) -> RepositoryResult<Vec<FrameEvent>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        if !data.missions.contains_key(mission_id) {
            return Err(RepositoryError::not_found(format!(
                "Mission {} not found",
                mission_id
            )));
        }
        let mut frames = data.frames.get(mission_id).cloned().unwrap_or_default();
        frames.sort_by_key(|f| f.frame_id);
        Ok(frames)
    }
}

#[async_trait]
impl AlertRepository for LocalRepository {
    async fn insert_alert(&self, alert: Alert) -> RepositoryResult<Alert> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        data.alerts.insert(alert.alert_id.clone(), alert.clone());
        Ok(alert)
    }

    async fn get_alert(&self, alert_id: &str) -> RepositoryResult<Alert> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.alerts
            .get(alert_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Alert {} not found", alert_id)))
    }

    async fn list_alerts(
        &self,
        mission_id: Option<&str>,
        status: Option<AlertStatus>,
    ) -> RepositoryResult<Vec<Alert>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        let mut alerts: Vec<Alert> = data
            .alerts
            .values()
            .filter(|a| mission_id.map_or(true, |m| a.mission_id == m))
            .filter(|a| status.map_or(true, |s| a.lifecycle.status == s))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| {
            a.ts_sec
                .partial_cmp(&b.ts_sec)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.frame_id.cmp(&b.frame_id))
        });
        Ok(alerts)
    }

    async fn review_alert(
        &self,
        alert_id: &str,
        decision: ReviewDecision,
    ) -> RepositoryResult<Alert> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let alert = data
            .alerts
            .get_mut(alert_id)
            .ok_or_else(|| RepositoryError::not_found(format!("Alert {} not found", alert_id)))?;
        if alert.lifecycle.status != AlertStatus::Queued {
            return Err(RepositoryError::conflict_with_context(
                "Alert already reviewed",
                ErrorContext::new("review_alert")
                    .with_entity("alert")
                    .with_entity_id(alert_id),
            ));
        }
        alert.lifecycle.status = decision.status.into();
        alert.lifecycle.reviewed_by = decision.reviewed_by;
        alert.lifecycle.reviewed_at_sec = decision.reviewed_at_sec.or(Some(alert.ts_sec));
        alert.lifecycle.decision_reason = decision.decision_reason;
        Ok(alert.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Detection, ReviewedStatus};

    fn detection(score: f64) -> Detection {
        Detection {
            bbox: [15.0, 15.0, 60.0, 60.0],
            score,
            label: "person".to_string(),
            model_name: "yolo8n".to_string(),
            explanation: None,
        }
    }

    fn frame(mission_id: &str, frame_id: i64, ts_sec: f64) -> FrameEvent {
        FrameEvent {
            mission_id: mission_id.to_string(),
            frame_id,
            ts_sec,
            image_uri: String::new(),
            gt_person_present: false,
            gt_episode_id: None,
        }
    }

    #[tokio::test]
    async fn mission_round_trip() {
        let repo = LocalRepository::new();
        let mission = repo.insert_mission(Mission::new("cam", 0, 2.0)).await.unwrap();
        let fetched = repo.get_mission(&mission.mission_id).await.unwrap();
        assert_eq!(fetched.mission_id, mission.mission_id);
        assert_eq!(fetched.status, MissionStatus::Created);
    }

    #[tokio::test]
    async fn unknown_mission_is_not_found() {
        let repo = LocalRepository::new();
        let err = repo.get_mission("nope").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn duplicate_mission_id_rejected() {
        let repo = LocalRepository::new();
        let mission = repo.insert_mission(Mission::new("cam", 0, 2.0)).await.unwrap();
        let err = repo.insert_mission(mission).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn mission_status_only_moves_forward() {
        let repo = LocalRepository::new();
        let mission = repo.insert_mission(Mission::new("cam", 0, 2.0)).await.unwrap();

        let updated = repo
            .update_mission_status(&mission.mission_id, MissionStatus::Running)
            .await
            .unwrap();
        assert_eq!(updated.status, MissionStatus::Running);

        let err = repo
            .update_mission_status(&mission.mission_id, MissionStatus::Created)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));

        // The failed transition left the status untouched.
        let fetched = repo.get_mission(&mission.mission_id).await.unwrap();
        assert_eq!(fetched.status, MissionStatus::Running);
    }

    #[tokio::test]
    async fn frames_require_existing_mission() {
        let repo = LocalRepository::new();
        let err = repo.insert_frame_event(frame("ghost", 0, 0.0)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn duplicate_frame_id_rejected() {
        let repo = LocalRepository::new();
        let mission = repo.insert_mission(Mission::new("cam", 0, 2.0)).await.unwrap();
        repo.insert_frame_event(frame(&mission.mission_id, 0, 0.0))
            .await
            .unwrap();
        let err = repo
            .insert_frame_event(frame(&mission.mission_id, 0, 0.5))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn frames_come_back_sorted_by_frame_id() {
        let repo = LocalRepository::new();
        let mission = repo.insert_mission(Mission::new("cam", 0, 2.0)).await.unwrap();
        for frame_id in [2, 0, 1] {
            repo.insert_frame_event(frame(&mission.mission_id, frame_id, frame_id as f64 * 0.5))
                .await
                .unwrap();
        }
        let frames = repo.frames_for_mission(&mission.mission_id).await.unwrap();
        let ids: Vec<i64> = frames.iter().map(|f| f.frame_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn alerts_sorted_and_filtered() {
        let repo = LocalRepository::new();
        let a1 = repo
            .insert_alert(Alert::queued("m1", 5, 2.5, "", detection(0.9)))
            .await
            .unwrap();
        let a2 = repo
            .insert_alert(Alert::queued("m1", 1, 0.5, "", detection(0.8)))
            .await
            .unwrap();
        repo.insert_alert(Alert::queued("m2", 0, 0.0, "", detection(0.7)))
            .await
            .unwrap();

        let alerts = repo.list_alerts(Some("m1"), None).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].alert_id, a2.alert_id);
        assert_eq!(alerts[1].alert_id, a1.alert_id);

        repo.review_alert(
            &a1.alert_id,
            ReviewDecision {
                status: ReviewedStatus::ReviewedConfirmed,
                reviewed_by: None,
                reviewed_at_sec: None,
                decision_reason: None,
            },
        )
        .await
        .unwrap();

        let queued = repo
            .list_alerts(Some("m1"), Some(AlertStatus::Queued))
            .await
            .unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].alert_id, a2.alert_id);
    }

    #[tokio::test]
    async fn review_defaults_reviewed_at_to_alert_ts() {
        let repo = LocalRepository::new();
        let alert = repo
            .insert_alert(Alert::queued("m1", 3, 1.5, "", detection(0.9)))
            .await
            .unwrap();
        let reviewed = repo
            .review_alert(
                &alert.alert_id,
                ReviewDecision {
                    status: ReviewedStatus::ReviewedConfirmed,
                    reviewed_by: Some("pilot-a".to_string()),
                    reviewed_at_sec: None,
                    decision_reason: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(reviewed.lifecycle.status, AlertStatus::ReviewedConfirmed);
        assert_eq!(reviewed.lifecycle.reviewed_at_sec, Some(1.5));
        assert_eq!(reviewed.lifecycle.reviewed_by.as_deref(), Some("pilot-a"));
    }

    #[tokio::test]
    async fn second_review_conflicts_and_mutates_nothing() {
        let repo = LocalRepository::new();
        let alert = repo
            .insert_alert(Alert::queued("m1", 3, 1.5, "", detection(0.9)))
            .await
            .unwrap();
        repo.review_alert(
            &alert.alert_id,
            ReviewDecision {
                status: ReviewedStatus::ReviewedConfirmed,
                reviewed_by: Some("pilot-a".to_string()),
                reviewed_at_sec: Some(9.0),
                decision_reason: None,
            },
        )
        .await
        .unwrap();

        let err = repo
            .review_alert(
                &alert.alert_id,
                ReviewDecision {
                    status: ReviewedStatus::ReviewedRejected,
                    reviewed_by: Some("pilot-b".to_string()),
                    reviewed_at_sec: Some(11.0),
                    decision_reason: Some("double review".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        let fetched = repo.get_alert(&alert.alert_id).await.unwrap();
        assert_eq!(fetched.lifecycle.status, AlertStatus::ReviewedConfirmed);
        assert_eq!(fetched.lifecycle.reviewed_by.as_deref(), Some("pilot-a"));
        assert_eq!(fetched.lifecycle.reviewed_at_sec, Some(9.0));
        assert_eq!(fetched.lifecycle.decision_reason, None);
    }

    #[tokio::test]
    async fn unhealthy_repository_fails_operations() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        let err = repo.get_mission("m1").await.unwrap_err();
        assert!(matches!(err, RepositoryError::ConnectionError { .. }));
    }

    #[tokio::test]
    async fn clear_drops_data_but_keeps_health() {
        let repo = LocalRepository::new();
        repo.insert_mission(Mission::new("cam", 0, 2.0)).await.unwrap();
        assert_eq!(repo.mission_count(), 1);
        repo.clear();
        assert_eq!(repo.mission_count(), 0);
        assert!(repo.health_check().await.unwrap());
    }
}
