//! Alert repository trait for storage, queries and review.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Alert, AlertStatus, ReviewDecision};

/// Repository trait for alert storage and the review transition.
///
/// An alert enters the store in `queued` state and takes exactly one
/// terminal transition. `review_alert` is a compare-and-swap on the
/// `queued` status; a lost race surfaces as a conflict, never as a
/// silent overwrite.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Store a freshly raised alert.
    async fn insert_alert(&self, alert: Alert) -> RepositoryResult<Alert>;

    /// Retrieve an alert by id.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If the alert doesn't exist
    async fn get_alert(&self, alert_id: &str) -> RepositoryResult<Alert>;

    /// List alerts, optionally filtered by mission and/or status,
    /// sorted by `(ts_sec, frame_id)`.
    async fn list_alerts(
        &self,
        mission_id: Option<&str>,
        status: Option<AlertStatus>,
    ) -> RepositoryResult<Vec<Alert>>;

    /// Apply a review decision to a queued alert.
    ///
    /// When the decision's `reviewed_at_sec` is absent, the alert's own
    /// `ts_sec` is recorded instead.
    ///
    /// # Returns
    /// * `Ok(Alert)` - The alert after the terminal transition
    /// * `Err(RepositoryError::NotFound)` - If the alert doesn't exist
    /// * `Err(RepositoryError::Conflict)` - If the alert already left `queued`;
    ///   no field is modified in that case
    async fn review_alert(
        &self,
        alert_id: &str,
        decision: ReviewDecision,
    ) -> RepositoryResult<Alert>;
}
