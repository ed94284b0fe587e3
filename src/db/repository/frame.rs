//! Frame event repository trait.
//!
//! Frame events are an append-only record of what each mission observed.
//! There is no update or delete surface.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::FrameEvent;

/// Repository trait for append-only frame event storage.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait FrameEventRepository: Send + Sync {
    /// Append one frame event to a mission's record.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the mission doesn't exist
    /// * `Err(RepositoryError::ValidationError)` - If `(mission_id, frame_id)` was
    ///   already recorded
    async fn insert_frame_event(&self, frame: FrameEvent) -> RepositoryResult<()>;

    /// All frame events of a mission, sorted by `frame_id`.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the mission doesn't exist
    async fn frames_for_mission(&self, mission_id: &str) -> RepositoryResult<Vec<FrameEvent>>;
}
