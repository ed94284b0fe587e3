//! Frame events and detector output.
//!
//! A `FrameEvent` is one observed video frame of a mission, persisted
//! append-only together with its ground-truth annotation. The detector
//! output that arrives with a frame is transient: it drives the alert
//! engine and, when an alert fires, one detection is snapshotted onto
//! the alert. Detections are never stored on their own.

/// A single detector output for one frame.
///
/// The same shape is used on the ingestion wire and as the immutable
/// snapshot embedded in an alert.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Detection {
    /// Bounding box as `[x1, y1, x2, y2]` in pixels.
    pub bbox: [f64; 4],
    pub score: f64,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

fn default_label() -> String {
    "person".to_string()
}

fn default_model_name() -> String {
    "yolo8n".to_string()
}

/// One persisted frame observation of a mission.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FrameEvent {
    pub mission_id: String,
    pub frame_id: i64,
    pub ts_sec: f64,
    #[serde(default)]
    pub image_uri: String,
    pub gt_person_present: bool,
    #[serde(default)]
    pub gt_episode_id: Option<i64>,
}

/// Ingestion payload: a frame observation plus the detections seen on it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FrameEventInput {
    pub mission_id: String,
    pub frame_id: i64,
    pub ts_sec: f64,
    #[serde(default)]
    pub image_uri: String,
    pub gt_person_present: bool,
    #[serde(default)]
    pub gt_episode_id: Option<i64>,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl FrameEventInput {
    /// Field-level checks applied at the ingestion boundary.
    pub fn validate(&self) -> Result<(), String> {
        if self.mission_id.is_empty() {
            return Err("mission_id must not be empty".to_string());
        }
        if self.frame_id < 0 {
            return Err(format!("frame_id must be >= 0, got {}", self.frame_id));
        }
        if !self.ts_sec.is_finite() || self.ts_sec < 0.0 {
            return Err(format!("ts_sec must be >= 0, got {}", self.ts_sec));
        }
        for detection in &self.detections {
            if !(0.0..=1.0).contains(&detection.score) {
                return Err(format!(
                    "detection score must be within [0, 1], got {}",
                    detection.score
                ));
            }
        }
        Ok(())
    }

    /// The persisted portion of this payload.
    pub fn to_frame_event(&self) -> FrameEvent {
        FrameEvent {
            mission_id: self.mission_id.clone(),
            frame_id: self.frame_id,
            ts_sec: self.ts_sec,
            image_uri: self.image_uri.clone(),
            gt_person_present: self.gt_person_present,
            gt_episode_id: self.gt_episode_id,
        }
    }
}
