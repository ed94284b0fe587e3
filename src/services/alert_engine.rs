//! Per-mission alert decision engine.
//!
//! Converts noisy per-frame detector output into debounced alerts. A
//! detection only counts as a hit when it clears the score threshold and
//! carries the target label; an alert fires once enough hits accumulate
//! inside the sliding window, subject to a cooldown between consecutive
//! alerts. A long enough silence ends the current streak and the hit
//! buffer starts over.
//!
//! Engine state is ephemeral: one record per mission, created lazily,
//! discarded on [`AlertEngine::reset`], never persisted.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::Detection;

/// Label a detection must carry to count toward an alert.
const TARGET_LABEL: &str = "person";

/// Tunables for the alert decision policy.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AlertEngineConfig {
    /// Minimum score for a detection to count as a hit.
    pub score_threshold: f64,
    /// Sliding window width for quorum counting, in seconds.
    pub window_sec: f64,
    /// Minimum number of hits inside the window before alerting.
    pub quorum_k: usize,
    /// Minimum spacing between two raised alerts, in seconds.
    pub cooldown_sec: f64,
    /// Silence after which the current streak is considered over.
    pub gap_end_sec: f64,
}

impl Default for AlertEngineConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.2,
            window_sec: 1.0,
            quorum_k: 2,
            cooldown_sec: 2.0,
            gap_end_sec: 1.0,
        }
    }
}

impl AlertEngineConfig {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `SKYWATCH_SCORE_THRESHOLD`
    /// - `SKYWATCH_ALERT_WINDOW_SEC`
    /// - `SKYWATCH_ALERT_QUORUM_K`
    /// - `SKYWATCH_ALERT_COOLDOWN_SEC`
    /// - `SKYWATCH_ALERT_GAP_END_SEC`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            score_threshold: env_f64("SKYWATCH_SCORE_THRESHOLD", defaults.score_threshold),
            window_sec: env_f64("SKYWATCH_ALERT_WINDOW_SEC", defaults.window_sec),
            quorum_k: env::var("SKYWATCH_ALERT_QUORUM_K")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.quorum_k),
            cooldown_sec: env_f64("SKYWATCH_ALERT_COOLDOWN_SEC", defaults.cooldown_sec),
            gap_end_sec: env_f64("SKYWATCH_ALERT_GAP_END_SEC", defaults.gap_end_sec),
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// One qualifying detection inside the sliding window.
#[derive(Debug, Clone)]
struct Hit {
    ts_sec: f64,
    detection: Detection,
}

/// Ephemeral per-mission working set.
#[derive(Debug, Default)]
struct MissionAlertState {
    hits: Vec<Hit>,
    last_alert_ts: Option<f64>,
    last_positive_ts: Option<f64>,
}

impl MissionAlertState {
    fn evict_window(&mut self, now: f64, window_sec: f64) {
        self.hits.retain(|h| h.ts_sec >= now - window_sec);
    }

    fn gap_expired(&self, now: f64, gap_end_sec: f64) -> bool {
        self.last_positive_ts
            .map_or(false, |last| now - last > gap_end_sec)
    }
}

/// Stateful alert decision engine, shared across the application.
///
/// Missions are fully independent: each holds its own lock, so frames for
/// different missions evaluate in parallel while frames for the same
/// mission serialize.
pub struct AlertEngine {
    config: AlertEngineConfig,
    states: Mutex<HashMap<String, Arc<Mutex<MissionAlertState>>>>,
}

impl AlertEngine {
    pub fn new(config: AlertEngineConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AlertEngineConfig {
        &self.config
    }

    /// Evaluate one frame's detections against the mission's streak state.
    ///
    /// Returns the representative detection (the frame's best qualifying
    /// hit) when an alert should be raised, `None` otherwise. The caller
    /// owns persisting the resulting alert.
    pub fn evaluate(
        &self,
        mission_id: &str,
        ts_sec: f64,
        detections: &[Detection],
    ) -> Option<Detection> {
        let state = self.state_for(mission_id);
        let mut state = state.lock();

        state.evict_window(ts_sec, self.config.window_sec);

        let representative = detections
            .iter()
            .filter(|d| d.score >= self.config.score_threshold && d.label == TARGET_LABEL)
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));

        let Some(representative) = representative else {
            // Streak over: drop accumulated hits, keep the cooldown clock.
            if state.gap_expired(ts_sec, self.config.gap_end_sec) {
                state.hits.clear();
            }
            return None;
        };

        if state.gap_expired(ts_sec, self.config.gap_end_sec) {
            state.hits.clear();
        }

        state.hits.push(Hit {
            ts_sec,
            detection: representative.clone(),
        });
        state.last_positive_ts = Some(ts_sec);
        state.evict_window(ts_sec, self.config.window_sec);

        let quorum_met = state.hits.len() >= self.config.quorum_k;
        let cooldown_clear = state
            .last_alert_ts
            .map_or(true, |last| ts_sec - last >= self.config.cooldown_sec);

        if quorum_met && cooldown_clear {
            state.last_alert_ts = Some(ts_sec);
            Some(representative.clone())
        } else {
            None
        }
    }

    /// Discard every mission's streak state at once.
    ///
    /// Persisted missions, frames and alerts are untouched. An evaluation
    /// already holding a state handle finishes against the detached state.
    pub fn reset(&self) {
        *self.states.lock() = HashMap::new();
    }

    fn state_for(&self, mission_id: &str) -> Arc<Mutex<MissionAlertState>> {
        let mut states = self.states.lock();
        states
            .entry(mission_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(MissionAlertState::default())))
            .clone()
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(AlertEngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(score: f64) -> Detection {
        Detection {
            bbox: [15.0, 15.0, 60.0, 60.0],
            score,
            label: "person".to_string(),
            model_name: "yolo8n".to_string(),
            explanation: None,
        }
    }

    fn labelled(score: f64, label: &str) -> Detection {
        Detection {
            label: label.to_string(),
            ..person(score)
        }
    }

    #[test]
    fn quorum_fires_on_the_second_qualifying_frame() {
        let engine = AlertEngine::default();

        assert!(engine.evaluate("m1", 0.0, &[person(0.95)]).is_none());
        let raised = engine.evaluate("m1", 0.5, &[person(0.95)]);

        assert!(raised.is_some());
    }

    #[test]
    fn a_single_hit_never_alerts() {
        let engine = AlertEngine::default();

        assert!(engine.evaluate("m1", 0.0, &[person(0.9)]).is_none());
    }

    #[test]
    fn cooldown_suppresses_alerts_until_it_expires() {
        let engine = AlertEngine::default();

        engine.evaluate("m1", 0.0, &[person(0.9)]);
        assert!(engine.evaluate("m1", 0.5, &[person(0.9)]).is_some());

        // Quorum stays satisfied but the cooldown (2.0s) has not elapsed.
        assert!(engine.evaluate("m1", 1.0, &[person(0.9)]).is_none());
        assert!(engine.evaluate("m1", 1.5, &[person(0.9)]).is_none());
        assert!(engine.evaluate("m1", 2.0, &[person(0.9)]).is_none());

        // 2.5 - 0.5 meets the cooldown exactly.
        assert!(engine.evaluate("m1", 2.5, &[person(0.9)]).is_some());
    }

    #[test]
    fn gap_end_forces_a_fresh_quorum() {
        let engine = AlertEngine::default();

        engine.evaluate("m1", 0.0, &[person(0.9)]);
        assert!(engine.evaluate("m1", 0.5, &[person(0.9)]).is_some());

        // 2.5s of silence ends the streak; cooldown has expired, but the
        // buffer restarts from one hit.
        assert!(engine.evaluate("m1", 3.0, &[person(0.9)]).is_none());
        assert!(engine.evaluate("m1", 3.4, &[person(0.9)]).is_some());
    }

    #[test]
    fn silence_frames_clear_the_buffer_after_the_gap() {
        // Window wide enough that only the gap rule can drop the first hit.
        let engine = AlertEngine::new(AlertEngineConfig {
            window_sec: 10.0,
            ..AlertEngineConfig::default()
        });

        engine.evaluate("m1", 0.0, &[person(0.9)]);
        // A frame with nothing qualifying, 1.5s after the last positive.
        engine.evaluate("m1", 1.5, &[]);

        // The old hit is gone, so this starts a new streak of one.
        assert!(engine.evaluate("m1", 1.6, &[person(0.9)]).is_none());
        assert!(engine.evaluate("m1", 1.8, &[person(0.9)]).is_some());
    }

    #[test]
    fn empty_frames_inside_the_gap_keep_the_streak_alive() {
        let engine = AlertEngine::default();

        engine.evaluate("m1", 0.0, &[person(0.9)]);
        engine.evaluate("m1", 0.3, &[]);

        assert!(engine.evaluate("m1", 0.6, &[person(0.9)]).is_some());
    }

    #[test]
    fn hits_older_than_the_window_do_not_count() {
        // Wide gap tolerance so only window eviction is in play.
        let engine = AlertEngine::new(AlertEngineConfig {
            gap_end_sec: 10.0,
            ..AlertEngineConfig::default()
        });

        engine.evaluate("m1", 0.0, &[person(0.9)]);

        // 2.0s later the first hit has left the 1.0s window.
        assert!(engine.evaluate("m1", 2.0, &[person(0.9)]).is_none());
    }

    #[test]
    fn below_threshold_and_wrong_label_never_contribute() {
        let engine = AlertEngine::default();

        assert!(engine
            .evaluate("m1", 0.0, &[person(0.1), labelled(0.99, "car")])
            .is_none());
        assert!(engine
            .evaluate("m1", 0.5, &[person(0.1), labelled(0.99, "car")])
            .is_none());
        // Nothing accumulated: a real hit now is the first of its streak.
        assert!(engine.evaluate("m1", 0.6, &[person(0.9)]).is_none());
    }

    #[test]
    fn representative_hit_is_the_frame_maximum() {
        let engine = AlertEngine::default();

        engine.evaluate("m1", 0.0, &[person(0.9)]);
        let raised = engine.evaluate("m1", 0.5, &[person(0.5), person(0.92), person(0.7)]);

        assert_eq!(raised.map(|d| d.score), Some(0.92));
    }

    #[test]
    fn missions_do_not_share_streak_state() {
        let engine = AlertEngine::default();

        engine.evaluate("a", 0.0, &[person(0.9)]);
        engine.evaluate("b", 0.0, &[person(0.9)]);

        assert!(engine.evaluate("a", 0.5, &[person(0.9)]).is_some());
        // Mission b only ever saw one hit.
        assert!(engine.evaluate("b", 2.0, &[person(0.9)]).is_none());
    }

    #[test]
    fn reset_discards_streaks_and_cooldowns() {
        let engine = AlertEngine::default();

        engine.evaluate("m1", 0.0, &[person(0.9)]);
        assert!(engine.evaluate("m1", 0.5, &[person(0.9)]).is_some());

        engine.reset();

        // Replaying the same timestamps alerts again: without the reset the
        // cooldown from ts 0.5 would suppress this.
        engine.evaluate("m1", 0.6, &[person(0.9)]);
        assert!(engine.evaluate("m1", 1.0, &[person(0.9)]).is_some());
    }

    #[test]
    fn custom_quorum_requires_more_hits() {
        let engine = AlertEngine::new(AlertEngineConfig {
            quorum_k: 3,
            window_sec: 5.0,
            ..AlertEngineConfig::default()
        });

        assert!(engine.evaluate("m1", 0.0, &[person(0.9)]).is_none());
        assert!(engine.evaluate("m1", 0.4, &[person(0.9)]).is_none());
        assert!(engine.evaluate("m1", 0.8, &[person(0.9)]).is_some());
    }
}
