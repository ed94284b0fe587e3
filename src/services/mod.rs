//! Service layer for business logic and orchestration.
//!
//! This module holds the stateful runtime pieces that sit between the
//! HTTP surface and the repositories: the alert decision engine, frame
//! ingestion, background replay, and the derived episode/report
//! computations.

pub mod alert_engine;

pub mod episodes;

pub mod ingest;

pub mod replay;

pub mod report;

pub use alert_engine::{AlertEngine, AlertEngineConfig};
pub use episodes::reconstruct_episodes;
pub use ingest::{ingest_frame_event, IngestOutcome};
pub use replay::{
    cancel_replay, start_replay, ReplayOptions, ReplayState, ReplayStatus, ReplayTracker,
};
pub use report::build_report;
