//! Mission repository trait for lifecycle and lookup operations.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Mission, MissionStatus};

/// Repository trait for mission storage and lifecycle transitions.
///
/// Missions are never deleted. Status updates must follow the
/// one-directional lifecycle `created -> running -> completed`;
/// implementations reject anything else as a validation error.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait MissionRepository: Send + Sync {
    /// Check if the backing store is reachable and healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if the store is healthy
    /// - `Ok(false)` if the store is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Store a new mission.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ValidationError)` - If the mission id is already taken
    async fn insert_mission(&self, mission: Mission) -> RepositoryResult<Mission>;

    /// Retrieve a mission by id.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the mission doesn't exist
    async fn get_mission(&self, mission_id: &str) -> RepositoryResult<Mission>;

    /// Move a mission to a new lifecycle status.
    ///
    /// # Returns
    /// * `Ok(Mission)` - The updated mission
    /// * `Err(RepositoryError::NotFound)` - If the mission doesn't exist
    /// * `Err(RepositoryError::ValidationError)` - If the transition is not a forward move
    async fn update_mission_status(
        &self,
        mission_id: &str,
        status: MissionStatus,
    ) -> RepositoryResult<Mission>;

    /// List all missions, newest first.
    async fn list_missions(&self) -> RepositoryResult<Vec<Mission>>;
}
