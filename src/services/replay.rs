//! Background mission replay.
//!
//! Replays a directory of still frames into the ingestion path on a fixed
//! cadence, synthesizing one detection per frame from YOLO-style sidecar
//! labels: a high score when a ground-truth label exists, a low one
//! otherwise. Each mission gets at most one replay task at a time; its
//! progress, logs and outcome are tracked in memory and polled by the
//! caller. Errors end the replay and land in the tracked state, they never
//! take the process down.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::info;
use parking_lot::RwLock;

use crate::db::repository::{ErrorContext, FullRepository, RepositoryError, RepositoryResult};
use crate::models::{Detection, FrameEventInput};
use crate::services::alert_engine::AlertEngine;
use crate::services::ingest::ingest_frame_event;

const DEFAULT_FPS: f64 = 2.0;
const DEFAULT_HIGH_SCORE: f64 = 0.95;
const DEFAULT_LOW_SCORE: f64 = 0.05;
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A single log entry with timestamp and message.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Replay status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Replay progress and logs for one mission.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReplayState {
    pub mission_id: String,
    pub status: ReplayStatus,
    pub processed_frames: usize,
    pub total_frames: usize,
    pub last_frame: Option<String>,
    pub error: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub logs: Vec<LogEntry>,
}

struct ReplayEntry {
    state: ReplayState,
    cancel: Arc<AtomicBool>,
}

/// In-memory replay tracker, keyed by mission id.
#[derive(Clone)]
pub struct ReplayTracker {
    replays: Arc<RwLock<HashMap<String, ReplayEntry>>>,
}

impl ReplayTracker {
    pub fn new() -> Self {
        Self {
            replays: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a fresh running replay for a mission.
    ///
    /// Fails with a conflict while a previous replay for the same mission
    /// is still running; a finished one is replaced.
    pub fn begin(
        &self,
        mission_id: &str,
        total_frames: usize,
    ) -> RepositoryResult<(ReplayState, Arc<AtomicBool>)> {
        let mut replays = self.replays.write();
        if let Some(entry) = replays.get(mission_id) {
            if entry.state.status == ReplayStatus::Running {
                return Err(RepositoryError::conflict_with_context(
                    format!("Replay already running for mission {}", mission_id),
                    ErrorContext::new("begin_replay")
                        .with_entity("replay")
                        .with_entity_id(mission_id),
                ));
            }
        }

        let state = ReplayState {
            mission_id: mission_id.to_string(),
            status: ReplayStatus::Running,
            processed_frames: 0,
            total_frames,
            last_frame: None,
            error: None,
            started_at: chrono::Utc::now(),
            completed_at: None,
            logs: vec![LogEntry {
                timestamp: chrono::Utc::now(),
                level: LogLevel::Info,
                message: format!("Replay started ({} frames)", total_frames),
            }],
        };
        let cancel = Arc::new(AtomicBool::new(false));
        replays.insert(
            mission_id.to_string(),
            ReplayEntry {
                state: state.clone(),
                cancel: cancel.clone(),
            },
        );
        Ok((state, cancel))
    }

    /// Current state of a mission's replay, if one was ever started.
    pub fn get(&self, mission_id: &str) -> Option<ReplayState> {
        self.replays
            .read()
            .get(mission_id)
            .map(|entry| entry.state.clone())
    }

    /// All log entries of a mission's replay.
    pub fn get_logs(&self, mission_id: &str) -> Vec<LogEntry> {
        self.replays
            .read()
            .get(mission_id)
            .map(|entry| entry.state.logs.clone())
            .unwrap_or_default()
    }

    /// Add a log entry to a mission's replay.
    pub fn log(&self, mission_id: &str, level: LogLevel, message: impl Into<String>) {
        if let Some(entry) = self.replays.write().get_mut(mission_id) {
            entry.state.logs.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level,
                message: message.into(),
            });
        }
    }

    /// Record one more processed frame.
    pub fn frame_done(&self, mission_id: &str, processed_frames: usize, last_frame: &str) {
        if let Some(entry) = self.replays.write().get_mut(mission_id) {
            entry.state.processed_frames = processed_frames;
            entry.state.last_frame = Some(last_frame.to_string());
        }
    }

    /// Mark a running replay as completed.
    pub fn complete(&self, mission_id: &str) {
        if self.finish(mission_id, ReplayStatus::Completed, None) {
            self.log(mission_id, LogLevel::Success, "Replay completed");
        }
    }

    /// Mark a running replay as failed with an error message.
    pub fn fail(&self, mission_id: &str, error: &str) {
        if self.finish(mission_id, ReplayStatus::Failed, Some(error.to_string())) {
            self.log(mission_id, LogLevel::Error, error.to_string());
        }
    }

    /// Mark a running replay as cancelled.
    pub fn cancelled(&self, mission_id: &str) {
        if self.finish(mission_id, ReplayStatus::Cancelled, None) {
            self.log(mission_id, LogLevel::Warning, "Replay cancelled");
        }
    }

    // Terminal transitions apply only while the replay is still running,
    // so a cancel and a natural completion cannot overwrite each other.
    // Returns whether the transition happened.
    fn finish(&self, mission_id: &str, status: ReplayStatus, error: Option<String>) -> bool {
        if let Some(entry) = self.replays.write().get_mut(mission_id) {
            if entry.state.status != ReplayStatus::Running {
                return false;
            }
            entry.state.status = status;
            entry.state.error = error;
            entry.state.completed_at = Some(chrono::Utc::now());
            return true;
        }
        false
    }

    fn cancel_flag(&self, mission_id: &str) -> Option<Arc<AtomicBool>> {
        self.replays
            .read()
            .get(mission_id)
            .map(|entry| entry.cancel.clone())
    }
}

impl Default for ReplayTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-supplied replay parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReplayOptions {
    pub frames_dir: String,
    #[serde(default)]
    pub labels_dir: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub high_score: Option<f64>,
    #[serde(default)]
    pub low_score: Option<f64>,
}

/// Validated replay inputs: the frame list plus effective tunables.
#[derive(Debug, Clone)]
pub struct ReplayPlan {
    pub mission_id: String,
    pub frame_files: Vec<PathBuf>,
    pub labels_dir: Option<PathBuf>,
    pub fps: f64,
    pub high_score: f64,
    pub low_score: f64,
}

impl ReplayPlan {
    /// Validate directories and enumerate replayable frames.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ValidationError)` - Missing frames/labels
    ///   directory, or no frame files in the frames directory
    pub fn build(mission_id: &str, options: &ReplayOptions) -> RepositoryResult<Self> {
        let frames_dir = PathBuf::from(&options.frames_dir);
        if !frames_dir.exists() {
            return Err(RepositoryError::validation(format!(
                "frames dir not found: {}",
                frames_dir.display()
            )));
        }

        let labels_dir = options.labels_dir.as_ref().map(PathBuf::from);
        if let Some(dir) = &labels_dir {
            if !dir.exists() {
                return Err(RepositoryError::validation(format!(
                    "labels dir not found: {}",
                    dir.display()
                )));
            }
        }

        let mut frame_files: Vec<PathBuf> = fs::read_dir(&frames_dir)
            .map_err(|e| {
                RepositoryError::validation(format!(
                    "reading frames dir {}: {}",
                    frames_dir.display(),
                    e
                ))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame_file(path))
            .collect();
        frame_files.sort();

        if frame_files.is_empty() {
            return Err(RepositoryError::validation("no frames found"));
        }

        Ok(Self {
            mission_id: mission_id.to_string(),
            frame_files,
            labels_dir,
            fps: options.fps.unwrap_or(DEFAULT_FPS),
            high_score: options.high_score.unwrap_or(DEFAULT_HIGH_SCORE),
            low_score: options.low_score.unwrap_or(DEFAULT_LOW_SCORE),
        })
    }

    fn frame_interval(&self) -> f64 {
        if self.fps > 0.0 {
            1.0 / self.fps
        } else {
            0.5
        }
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// A frame counts as ground-truth positive when its sidecar label file
/// exists and contains anything beyond whitespace.
fn has_ground_truth(frame_path: &Path, labels_dir: Option<&Path>) -> std::io::Result<bool> {
    let label_path = match labels_dir {
        Some(dir) => {
            let stem = frame_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            dir.join(format!("{}.txt", stem))
        }
        None => frame_path.with_extension("txt"),
    };
    if !label_path.exists() {
        return Ok(false);
    }
    Ok(!fs::read_to_string(&label_path)?.trim().is_empty())
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Start replaying a frame directory into an existing mission.
///
/// Validates the request, registers the tracked state and spawns the
/// background task. Returns the initial state snapshot; progress is
/// observed through the tracker.
///
/// # Returns
/// * `Err(RepositoryError::NotFound)` - Unknown mission
/// * `Err(RepositoryError::ValidationError)` - Bad directories or no frames
/// * `Err(RepositoryError::Conflict)` - Replay already running for the mission
pub async fn start_replay(
    repo: Arc<dyn FullRepository>,
    engine: Arc<AlertEngine>,
    tracker: ReplayTracker,
    mission_id: &str,
    options: &ReplayOptions,
) -> RepositoryResult<ReplayState> {
    repo.get_mission(mission_id).await?;
    let plan = ReplayPlan::build(mission_id, options)?;
    let (state, cancel) = tracker.begin(mission_id, plan.frame_files.len())?;

    info!(
        "Starting replay for mission {} ({} frames at {} fps)",
        mission_id,
        plan.frame_files.len(),
        plan.fps
    );
    tokio::spawn(run_replay(repo, engine, tracker, plan, cancel));

    Ok(state)
}

/// Request cancellation of a running replay.
///
/// The tracked state flips to `cancelled` immediately; the background
/// task observes the flag at its next frame boundary and stops feeding
/// frames.
pub fn cancel_replay(tracker: &ReplayTracker, mission_id: &str) -> RepositoryResult<ReplayState> {
    let flag = tracker.cancel_flag(mission_id).ok_or_else(|| {
        RepositoryError::not_found(format!("No replay found for mission {}", mission_id))
    })?;

    let state = tracker.get(mission_id).ok_or_else(|| {
        RepositoryError::not_found(format!("No replay found for mission {}", mission_id))
    })?;
    if state.status != ReplayStatus::Running {
        return Err(RepositoryError::conflict_with_context(
            format!("Replay for mission {} is not running", mission_id),
            ErrorContext::new("cancel_replay")
                .with_entity("replay")
                .with_entity_id(mission_id),
        ));
    }

    flag.store(true, Ordering::Relaxed);
    tracker.cancelled(mission_id);

    tracker.get(mission_id).ok_or_else(|| {
        RepositoryError::not_found(format!("No replay found for mission {}", mission_id))
    })
}

async fn run_replay(
    repo: Arc<dyn FullRepository>,
    engine: Arc<AlertEngine>,
    tracker: ReplayTracker,
    plan: ReplayPlan,
    cancel: Arc<AtomicBool>,
) {
    let dt = plan.frame_interval();

    for (idx, frame_path) in plan.frame_files.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            tracker.cancelled(&plan.mission_id);
            return;
        }

        let gt_present = match has_ground_truth(frame_path, plan.labels_dir.as_deref()) {
            Ok(present) => present,
            Err(e) => {
                tracker.fail(
                    &plan.mission_id,
                    &format!("reading label for {}: {}", frame_path.display(), e),
                );
                return;
            }
        };

        let score = if gt_present {
            plan.high_score
        } else {
            plan.low_score
        };
        let input = FrameEventInput {
            mission_id: plan.mission_id.clone(),
            frame_id: idx as i64,
            ts_sec: round3(idx as f64 * dt),
            image_uri: frame_path.display().to_string(),
            gt_person_present: gt_present,
            gt_episode_id: None,
            detections: vec![Detection {
                bbox: [15.0, 15.0, 60.0, 60.0],
                score,
                label: "person".to_string(),
                model_name: "yolo8n".to_string(),
                explanation: Some("replay".to_string()),
            }],
        };

        match ingest_frame_event(repo.as_ref(), &engine, input).await {
            Ok(outcome) => {
                if outcome.alerts_created > 0 {
                    tracker.log(
                        &plan.mission_id,
                        LogLevel::Info,
                        format!("Alert raised at frame {}", idx),
                    );
                }
            }
            Err(e) => {
                tracker.fail(&plan.mission_id, &e.to_string());
                return;
            }
        }

        let frame_name = frame_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| frame_path.display().to_string());
        tracker.frame_done(&plan.mission_id, idx + 1, &frame_name);

        tokio::time::sleep(Duration::from_secs_f64(dt)).await;
    }

    tracker.complete(&plan.mission_id);
}
