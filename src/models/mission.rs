//! Mission lifecycle model.
//!
//! A mission is one recorded drone flight. Its status only ever moves
//! forward: `created` -> `running` -> `completed`. Missions are never
//! deleted; reports and alert queries reference them long after the
//! flight ended.

use chrono::{DateTime, Utc};

/// Mission lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Created,
    Running,
    Completed,
}

impl MissionStatus {
    /// Position in the one-directional lifecycle.
    fn rank(self) -> u8 {
        match self {
            MissionStatus::Created => 0,
            MissionStatus::Running => 1,
            MissionStatus::Completed => 2,
        }
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    /// Only strictly forward moves are allowed.
    pub fn can_transition_to(self, next: MissionStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Status name as serialized on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            MissionStatus::Created => "created",
            MissionStatus::Running => "running",
            MissionStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for MissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(MissionStatus::Created),
            "running" => Ok(MissionStatus::Running),
            "completed" => Ok(MissionStatus::Completed),
            other => Err(format!("Unknown mission status: {}", other)),
        }
    }
}

/// A single drone mission.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Mission {
    pub mission_id: String,
    #[serde(default)]
    pub source_name: String,
    pub status: MissionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub total_frames: i64,
    #[serde(default)]
    pub fps: f64,
}

impl Mission {
    /// Build a fresh mission in `created` state with a v4 uuid.
    pub fn new(source_name: impl Into<String>, total_frames: i64, fps: f64) -> Self {
        Self {
            mission_id: uuid::Uuid::new_v4().to_string(),
            source_name: source_name.into(),
            status: MissionStatus::Created,
            created_at: Utc::now(),
            total_frames,
            fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_only_moves_forward() {
        assert!(MissionStatus::Created.can_transition_to(MissionStatus::Running));
        assert!(MissionStatus::Created.can_transition_to(MissionStatus::Completed));
        assert!(MissionStatus::Running.can_transition_to(MissionStatus::Completed));

        assert!(!MissionStatus::Running.can_transition_to(MissionStatus::Created));
        assert!(!MissionStatus::Completed.can_transition_to(MissionStatus::Running));
        assert!(!MissionStatus::Completed.can_transition_to(MissionStatus::Created));
        assert!(!MissionStatus::Created.can_transition_to(MissionStatus::Created));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&MissionStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let back: MissionStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(back, MissionStatus::Running);
    }

    #[test]
    fn new_mission_starts_created() {
        let mission = Mission::new("camera-a", 100, 2.0);
        assert_eq!(mission.status, MissionStatus::Created);
        assert_eq!(mission.total_frames, 100);
        assert!(!mission.mission_id.is_empty());
    }
}
