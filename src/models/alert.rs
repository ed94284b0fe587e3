//! Alerts and their review lifecycle.
//!
//! An alert is created exactly once in `queued` state when the decision
//! engine fires, and takes exactly one terminal transition when a pilot
//! reviews it. The detection snapshot captured at creation is immutable.

use super::frame::Detection;

/// Full alert status, including the pre-review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Queued,
    ReviewedConfirmed,
    ReviewedRejected,
}

impl AlertStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AlertStatus::Queued)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Queued => "queued",
            AlertStatus::ReviewedConfirmed => "reviewed_confirmed",
            AlertStatus::ReviewedRejected => "reviewed_rejected",
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(AlertStatus::Queued),
            "reviewed_confirmed" => Ok(AlertStatus::ReviewedConfirmed),
            "reviewed_rejected" => Ok(AlertStatus::ReviewedRejected),
            other => Err(format!("Unknown alert status: {}", other)),
        }
    }
}

/// The two statuses a review is allowed to set.
///
/// Deserialization is the validation boundary: a request naming any
/// other status fails to parse and never reaches the mutation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewedStatus {
    ReviewedConfirmed,
    ReviewedRejected,
}

impl From<ReviewedStatus> for AlertStatus {
    fn from(status: ReviewedStatus) -> Self {
        match status {
            ReviewedStatus::ReviewedConfirmed => AlertStatus::ReviewedConfirmed,
            ReviewedStatus::ReviewedRejected => AlertStatus::ReviewedRejected,
        }
    }
}

/// A pilot's verdict on one queued alert.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReviewDecision {
    pub status: ReviewedStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_at_sec: Option<f64>,
    #[serde(default)]
    pub decision_reason: Option<String>,
}

/// Mutable review portion of an alert.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AlertLifecycle {
    pub status: AlertStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_at_sec: Option<f64>,
    #[serde(default)]
    pub decision_reason: Option<String>,
}

impl AlertLifecycle {
    pub fn queued() -> Self {
        Self {
            status: AlertStatus::Queued,
            reviewed_by: None,
            reviewed_at_sec: None,
            decision_reason: None,
        }
    }
}

/// An alert raised by the decision engine for one frame.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub mission_id: String,
    pub frame_id: i64,
    pub ts_sec: f64,
    #[serde(default)]
    pub image_uri: String,
    pub detection: Detection,
    pub lifecycle: AlertLifecycle,
}

impl Alert {
    /// Build a queued alert with a v4 uuid around the winning detection.
    pub fn queued(
        mission_id: impl Into<String>,
        frame_id: i64,
        ts_sec: f64,
        image_uri: impl Into<String>,
        detection: Detection,
    ) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            mission_id: mission_id.into(),
            frame_id,
            ts_sec,
            image_uri: image_uri.into(),
            detection,
            lifecycle: AlertLifecycle::queued(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewed_status_round_trips() {
        let decision: ReviewDecision =
            serde_json::from_str(r#"{"status":"reviewed_confirmed"}"#).unwrap();
        assert_eq!(decision.status, ReviewedStatus::ReviewedConfirmed);
        assert_eq!(decision.reviewed_at_sec, None);
    }

    #[test]
    fn reviewed_status_rejects_queued() {
        // "queued" is not a legal review target and must fail to parse.
        let result = serde_json::from_str::<ReviewDecision>(r#"{"status":"queued"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn reviewed_status_rejects_unknown_values() {
        let result = serde_json::from_str::<ReviewDecision>(r#"{"status":"escalated"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn queued_alert_has_no_review_fields() {
        let alert = Alert::queued(
            "m1",
            7,
            3.5,
            "frames/0007.png",
            Detection {
                bbox: [15.0, 15.0, 60.0, 60.0],
                score: 0.95,
                label: "person".to_string(),
                model_name: "yolo8n".to_string(),
                explanation: None,
            },
        );
        assert_eq!(alert.lifecycle.status, AlertStatus::Queued);
        assert!(alert.lifecycle.reviewed_by.is_none());
        assert!(alert.lifecycle.reviewed_at_sec.is_none());
        assert!(alert.lifecycle.decision_reason.is_none());
    }
}
