//! Public API surface for the mission backend.
//!
//! This file consolidates the types exposed over the HTTP API.
//! All types derive Serialize/Deserialize for JSON serialization.

pub use crate::models::Alert;
pub use crate::models::AlertLifecycle;
pub use crate::models::AlertStatus;
pub use crate::models::Detection;
pub use crate::models::Episode;
pub use crate::models::FrameEvent;
pub use crate::models::FrameEventInput;
pub use crate::models::Mission;
pub use crate::models::MissionReport;
pub use crate::models::MissionStatus;
pub use crate::models::ReviewDecision;
pub use crate::models::ReviewedStatus;

pub use crate::services::AlertEngineConfig;
pub use crate::services::IngestOutcome;
pub use crate::services::ReplayOptions;
pub use crate::services::ReplayState;
pub use crate::services::ReplayStatus;
