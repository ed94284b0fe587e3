//! Frame ingestion orchestration.
//!
//! One ingestion call persists the frame event, runs the alert decision
//! engine over the frame's detections and persists whatever alert the
//! engine raises. The mission must already exist; nothing is written
//! otherwise.

use log::info;

use crate::db::repository::{FullRepository, RepositoryResult};
use crate::models::{Alert, FrameEventInput};
use crate::services::alert_engine::AlertEngine;

/// Outcome of ingesting one frame event.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IngestOutcome {
    pub accepted: bool,
    pub alerts_created: usize,
    pub alert_ids: Vec<String>,
}

/// Ingest one frame event for an existing mission.
///
/// # Returns
/// * `Ok(IngestOutcome)` - Frame stored; outcome lists any alert raised
/// * `Err(RepositoryError::NotFound)` - Unknown mission, nothing written
/// * `Err(RepositoryError::ValidationError)` - Duplicate `frame_id` for
///   the mission
pub async fn ingest_frame_event<R: FullRepository + ?Sized>(
    repo: &R,
    engine: &AlertEngine,
    input: FrameEventInput,
) -> RepositoryResult<IngestOutcome> {
    // Unknown missions are rejected before any write happens.
    repo.get_mission(&input.mission_id).await?;

    repo.insert_frame_event(input.to_frame_event()).await?;

    let raised = engine.evaluate(&input.mission_id, input.ts_sec, &input.detections);

    let mut alert_ids = Vec::new();
    if let Some(detection) = raised {
        let alert = Alert::queued(
            input.mission_id.clone(),
            input.frame_id,
            input.ts_sec,
            input.image_uri.clone(),
            detection,
        );
        let stored = repo.insert_alert(alert).await?;
        info!(
            "Alert {} raised for mission {} at frame {} (ts {:.3})",
            stored.alert_id, stored.mission_id, stored.frame_id, stored.ts_sec
        );
        alert_ids.push(stored.alert_id);
    }

    Ok(IngestOutcome {
        accepted: true,
        alerts_created: alert_ids.len(),
        alert_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::services;
    use crate::models::Detection;

    fn person(score: f64) -> Detection {
        Detection {
            bbox: [15.0, 15.0, 60.0, 60.0],
            score,
            label: "person".to_string(),
            model_name: "yolo8n".to_string(),
            explanation: None,
        }
    }

    fn input(mission_id: &str, frame_id: i64, ts_sec: f64, detections: Vec<Detection>) -> FrameEventInput {
        FrameEventInput {
            mission_id: mission_id.to_string(),
            frame_id,
            ts_sec,
            image_uri: format!("frames/{:04}.png", frame_id),
            gt_person_present: !detections.is_empty(),
            gt_episode_id: None,
            detections,
        }
    }

    #[tokio::test]
    async fn ingest_rejects_unknown_missions_without_writing() {
        let repo = LocalRepository::new();
        let engine = AlertEngine::default();

        let result = ingest_frame_event(&repo, &engine, input("ghost", 0, 0.0, vec![])).await;

        assert!(result.is_err());
        assert_eq!(repo.alert_count(), 0);
    }

    #[tokio::test]
    async fn quorum_breach_creates_exactly_one_queued_alert() {
        let repo = LocalRepository::new();
        let engine = AlertEngine::default();
        let mission = services::create_mission(&repo, "cam", 0, 2.0).await.unwrap();

        let first = ingest_frame_event(
            &repo,
            &engine,
            input(&mission.mission_id, 0, 0.0, vec![person(0.95)]),
        )
        .await
        .unwrap();
        assert!(first.accepted);
        assert_eq!(first.alerts_created, 0);

        let second = ingest_frame_event(
            &repo,
            &engine,
            input(&mission.mission_id, 1, 0.5, vec![person(0.95)]),
        )
        .await
        .unwrap();
        assert_eq!(second.alerts_created, 1);
        assert_eq!(second.alert_ids.len(), 1);

        let alert = services::get_alert(&repo, &second.alert_ids[0]).await.unwrap();
        assert_eq!(alert.mission_id, mission.mission_id);
        assert_eq!(alert.frame_id, 1);
        assert_eq!(alert.image_uri, "frames/0001.png");
    }

    #[tokio::test]
    async fn frames_persist_even_when_no_alert_fires() {
        let repo = LocalRepository::new();
        let engine = AlertEngine::default();
        let mission = services::create_mission(&repo, "cam", 0, 2.0).await.unwrap();

        ingest_frame_event(&repo, &engine, input(&mission.mission_id, 0, 0.0, vec![]))
            .await
            .unwrap();

        let frames = services::frames_for_mission(&repo, &mission.mission_id)
            .await
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(repo.alert_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_frame_ids_are_rejected() {
        let repo = LocalRepository::new();
        let engine = AlertEngine::default();
        let mission = services::create_mission(&repo, "cam", 0, 2.0).await.unwrap();

        ingest_frame_event(&repo, &engine, input(&mission.mission_id, 0, 0.0, vec![]))
            .await
            .unwrap();
        let result =
            ingest_frame_event(&repo, &engine, input(&mission.mission_id, 0, 0.5, vec![])).await;

        assert!(result.is_err());
    }
}
