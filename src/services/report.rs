//! Mission report aggregation.
//!
//! Combines reconstructed ground-truth episodes with reviewed alert
//! outcomes into a point-in-time quality report: event recall,
//! time-to-first-confirmation and false-alarm rate. Pure function of the
//! stored frames and alerts; recomputing never mutates anything.

use chrono::Utc;

use crate::models::{Alert, AlertStatus, FrameEvent, MissionReport};
use crate::services::episodes::reconstruct_episodes;

const SECONDS_PER_HOUR: f64 = 3600.0;

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Build the quality report for one mission.
///
/// `frames` must be sorted ascending by `frame_id`; `alerts` may arrive in
/// any order. Alerts still `queued` count toward `alerts_total` but are
/// excluded from both the confirmed and the rejected partitions.
///
/// Metrics:
/// - `recall_event`: fraction of episodes containing at least one confirmed
///   alert (by the alert's `ts_sec`, interval endpoints inclusive). 0.0 when
///   no episodes exist.
/// - `ttfc_sec`: mission-wide minimum over `reviewed_at_sec - start_sec`
///   for every in-range confirmed alert carrying a review timestamp, or
///   `None` when no such alert exists.
/// - `fp_per_hour`: rejected alerts per hour of mission time, where mission
///   duration is the last frame's `ts_sec`. 0.0 when the duration is zero.
pub fn build_report(mission_id: &str, frames: &[FrameEvent], alerts: &[Alert]) -> MissionReport {
    let confirmed: Vec<&Alert> = alerts
        .iter()
        .filter(|a| a.lifecycle.status == AlertStatus::ReviewedConfirmed)
        .collect();
    let rejected_count = alerts
        .iter()
        .filter(|a| a.lifecycle.status == AlertStatus::ReviewedRejected)
        .count();

    let episodes = reconstruct_episodes(frames);

    let mut episodes_found = 0usize;
    let mut ttfc_sec: Option<f64> = None;
    for episode in &episodes {
        let in_range: Vec<&&Alert> = confirmed
            .iter()
            .filter(|a| a.ts_sec >= episode.start_sec && a.ts_sec <= episode.end_sec)
            .collect();
        if in_range.is_empty() {
            continue;
        }
        episodes_found += 1;

        for alert in in_range {
            if let Some(reviewed_at) = alert.lifecycle.reviewed_at_sec {
                let candidate = reviewed_at - episode.start_sec;
                ttfc_sec = Some(match ttfc_sec {
                    Some(best) if best <= candidate => best,
                    _ => candidate,
                });
            }
        }
    }

    let recall_event = if episodes.is_empty() {
        0.0
    } else {
        episodes_found as f64 / episodes.len() as f64
    };

    let mission_duration_sec = frames.last().map(|f| f.ts_sec).unwrap_or(0.0);
    let fp_per_hour = if mission_duration_sec > 0.0 {
        rejected_count as f64 / (mission_duration_sec / SECONDS_PER_HOUR)
    } else {
        0.0
    };

    MissionReport {
        mission_id: mission_id.to_string(),
        episodes_total: episodes.len(),
        episodes_found,
        recall_event: round4(recall_event),
        ttfc_sec: ttfc_sec.map(round4),
        alerts_total: alerts.len(),
        alerts_confirmed: confirmed.len(),
        alerts_rejected: rejected_count,
        false_alerts_total: rejected_count,
        fp_per_hour: round4(fp_per_hour),
        generated_at: Utc::now(),
    }
}
