//! End-to-end acceptance flows for the alerting pipeline: frames go in
//! through ingestion, alerts come out of the engine, reviews land on the
//! alerts and the report aggregates the result.

use skywatch::db::repositories::LocalRepository;
use skywatch::db::services::{create_mission, mission_episodes, mission_report, review_alert};
use skywatch::models::{Detection, FrameEventInput, ReviewDecision, ReviewedStatus};
use skywatch::services::{ingest_frame_event, AlertEngine, AlertEngineConfig};

fn person(score: f64) -> Detection {
    Detection {
        bbox: [15.0, 15.0, 60.0, 60.0],
        score,
        label: "person".to_string(),
        model_name: "yolo8n".to_string(),
        explanation: None,
    }
}

fn frame(
    mission_id: &str,
    frame_id: i64,
    ts_sec: f64,
    gt_person_present: bool,
    detections: Vec<Detection>,
) -> FrameEventInput {
    FrameEventInput {
        mission_id: mission_id.to_string(),
        frame_id,
        ts_sec,
        image_uri: format!("frames/{:04}.png", frame_id),
        gt_person_present,
        gt_episode_id: None,
        detections,
    }
}

fn review(status: ReviewedStatus) -> ReviewDecision {
    ReviewDecision {
        status,
        reviewed_by: Some("pilot-1".to_string()),
        reviewed_at_sec: None,
        decision_reason: None,
    }
}

#[tokio::test]
async fn test_alert_fires_exactly_on_the_quorum_frame() {
    let repo = LocalRepository::new();
    let engine = AlertEngine::new(AlertEngineConfig {
        quorum_k: 3,
        window_sec: 10.0,
        ..Default::default()
    });
    let mission = create_mission(&repo, "cam", 0, 2.0).await.unwrap();
    let id = mission.mission_id.as_str();

    let mut created = Vec::new();
    for (frame_id, ts) in [(0, 0.0), (1, 0.2), (2, 0.4)] {
        let outcome = ingest_frame_event(&repo, &engine, frame(id, frame_id, ts, true, vec![person(0.9)]))
            .await
            .unwrap();
        created.push(outcome.alerts_created);
    }

    // Nothing before the K-th qualifying frame, exactly one on it.
    assert_eq!(created, vec![0, 0, 1]);
}

#[tokio::test]
async fn test_cooldown_suppresses_until_it_expires() {
    let repo = LocalRepository::new();
    let engine = AlertEngine::default();
    let mission = create_mission(&repo, "cam", 0, 2.0).await.unwrap();
    let id = mission.mission_id.as_str();

    // Qualifying hits every 0.5 s from ts 1.0 to 3.5.
    let mut alert_frames = Vec::new();
    for (frame_id, ts) in [(0, 1.0), (1, 1.5), (2, 2.0), (3, 2.5), (4, 3.0), (5, 3.5)] {
        let outcome = ingest_frame_event(&repo, &engine, frame(id, frame_id, ts, true, vec![person(0.9)]))
            .await
            .unwrap();
        if outcome.alerts_created > 0 {
            alert_frames.push(frame_id);
        }
    }

    // First alert on the quorum frame at ts 1.5; the next one only after
    // the 2.0 s cooldown, at ts 3.5.
    assert_eq!(alert_frames, vec![1, 5]);
}

#[tokio::test]
async fn test_gap_end_requires_a_fresh_quorum() {
    let repo = LocalRepository::new();
    // Window wide enough that eviction alone would never clear the buffer.
    let engine = AlertEngine::new(AlertEngineConfig {
        window_sec: 10.0,
        ..Default::default()
    });
    let mission = create_mission(&repo, "cam", 0, 2.0).await.unwrap();
    let id = mission.mission_id.as_str();

    let mut alert_frames = Vec::new();
    for (frame_id, ts) in [(0, 0.0), (1, 0.5), (2, 2.6), (3, 3.0)] {
        let outcome = ingest_frame_event(&repo, &engine, frame(id, frame_id, ts, true, vec![person(0.9)]))
            .await
            .unwrap();
        if outcome.alerts_created > 0 {
            alert_frames.push(frame_id);
        }
    }

    // The 2.1 s silence before ts 2.6 ends the streak: even though the
    // cooldown had expired, that frame alone cannot alert. The quorum has
    // to be rebuilt, so the second alert lands on frame 3.
    assert_eq!(alert_frames, vec![1, 3]);
}

#[tokio::test]
async fn test_report_is_idempotent_modulo_generated_at() {
    let repo = LocalRepository::new();
    let engine = AlertEngine::default();
    let mission = create_mission(&repo, "cam", 0, 2.0).await.unwrap();
    let id = mission.mission_id.as_str();

    ingest_frame_event(&repo, &engine, frame(id, 0, 0.0, true, vec![person(0.9)]))
        .await
        .unwrap();
    let outcome = ingest_frame_event(&repo, &engine, frame(id, 1, 0.5, true, vec![person(0.95)]))
        .await
        .unwrap();
    review_alert(&repo, &outcome.alert_ids[0], review(ReviewedStatus::ReviewedConfirmed))
        .await
        .unwrap();

    let first = mission_report(&repo, id).await.unwrap();
    let second = mission_report(&repo, id).await.unwrap();

    assert_eq!(first.episodes_total, second.episodes_total);
    assert_eq!(first.episodes_found, second.episodes_found);
    assert_eq!(first.recall_event, second.recall_event);
    assert_eq!(first.ttfc_sec, second.ttfc_sec);
    assert_eq!(first.alerts_total, second.alerts_total);
    assert_eq!(first.alerts_confirmed, second.alerts_confirmed);
    assert_eq!(first.alerts_rejected, second.alerts_rejected);
    assert_eq!(first.false_alerts_total, second.false_alerts_total);
    assert_eq!(first.fp_per_hour, second.fp_per_hour);
}

#[tokio::test]
async fn test_alternating_ground_truth_yields_two_episodes() {
    let repo = LocalRepository::new();
    let engine = AlertEngine::default();
    let mission = create_mission(&repo, "cam", 0, 2.0).await.unwrap();
    let id = mission.mission_id.as_str();

    let pattern = [false, true, true, false, true, false];
    for (idx, gt) in pattern.iter().enumerate() {
        let ts = idx as f64 * 0.5;
        ingest_frame_event(&repo, &engine, frame(id, idx as i64, ts, *gt, vec![]))
            .await
            .unwrap();
    }

    let episodes = mission_episodes(&repo, id).await.unwrap();
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].start_sec, 0.5);
    assert_eq!(episodes[0].end_sec, 1.0);
    assert_eq!(episodes[1].start_sec, 2.0);
    assert_eq!(episodes[1].end_sec, 2.0);
}

#[tokio::test]
async fn test_recall_counts_only_episodes_with_confirmed_alerts() {
    let repo = LocalRepository::new();
    let engine = AlertEngine::default();
    let mission = create_mission(&repo, "cam", 0, 2.0).await.unwrap();
    let id = mission.mission_id.as_str();

    // Episode one is detected and confirmed; episode two is missed by the
    // detector entirely.
    let frames = [
        (0, 0.0, true, vec![person(0.9)]),
        (1, 0.5, true, vec![person(0.9)]),
        (2, 1.0, false, vec![]),
        (3, 1.5, false, vec![]),
        (4, 2.0, true, vec![]),
        (5, 2.5, true, vec![]),
    ];
    let mut alert_ids = Vec::new();
    for (frame_id, ts, gt, detections) in frames {
        let outcome = ingest_frame_event(&repo, &engine, frame(id, frame_id, ts, gt, detections))
            .await
            .unwrap();
        alert_ids.extend(outcome.alert_ids);
    }
    assert_eq!(alert_ids.len(), 1);

    review_alert(&repo, &alert_ids[0], review(ReviewedStatus::ReviewedConfirmed))
        .await
        .unwrap();

    let report = mission_report(&repo, id).await.unwrap();
    assert_eq!(report.episodes_total, 2);
    assert_eq!(report.episodes_found, 1);
    assert_eq!(report.recall_event, 0.5);
    assert_eq!(report.ttfc_sec, Some(0.5));
}

#[tokio::test]
async fn test_rejected_alert_rate_is_normalized_per_hour() {
    let repo = LocalRepository::new();
    let engine = AlertEngine::default();
    let mission = create_mission(&repo, "cam", 0, 2.0).await.unwrap();
    let id = mission.mission_id.as_str();

    // A false detection streak with no ground truth behind it.
    ingest_frame_event(&repo, &engine, frame(id, 0, 0.0, false, vec![person(0.9)]))
        .await
        .unwrap();
    let outcome = ingest_frame_event(&repo, &engine, frame(id, 1, 0.5, false, vec![person(0.9)]))
        .await
        .unwrap();
    assert_eq!(outcome.alerts_created, 1);

    review_alert(&repo, &outcome.alert_ids[0], review(ReviewedStatus::ReviewedRejected))
        .await
        .unwrap();

    // Pad the mission out to half an hour of footage.
    ingest_frame_event(&repo, &engine, frame(id, 2, 1800.0, false, vec![]))
        .await
        .unwrap();

    let report = mission_report(&repo, id).await.unwrap();
    assert_eq!(report.episodes_total, 0);
    assert_eq!(report.recall_event, 0.0);
    assert_eq!(report.ttfc_sec, None);
    assert_eq!(report.alerts_rejected, 1);
    assert_eq!(report.false_alerts_total, 1);
    // One rejected alert over 1800 s of footage is two per hour.
    assert_eq!(report.fp_per_hour, 2.0);
}
