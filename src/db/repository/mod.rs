//! Repository trait definitions for storage operations.
//!
//! This module provides a collection of focused repository traits that abstract
//! storage operations. By splitting responsibilities across multiple traits,
//! implementations can be more focused and testable.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`mission`]: Mission storage and lifecycle transitions
//! - [`frame`]: Append-only frame event storage
//! - [`alert`]: Alert storage, queries and the review transition
//!
//! # Trait Composition
//!
//! A complete repository implementation typically implements all traits:
//!
//! ```ignore
//! impl MissionRepository for MyRepo { ... }
//! impl FrameEventRepository for MyRepo { ... }
//! impl AlertRepository for MyRepo { ... }
//! ```
//!
//! # Convenience Trait Bound
//!
//! For functions that need all repository capabilities, use the [`FullRepository`] trait bound:
//!
//! ```ignore
//! async fn my_service<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<()> {
//!     let mission = repo.get_mission("m1").await?;
//!     let frames = repo.frames_for_mission(&mission.mission_id).await?;
//!     Ok(())
//! }
//! ```

pub mod alert;
pub mod error;
pub mod frame;
pub mod mission;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

// Re-export all traits
pub use alert::AlertRepository;
pub use frame::FrameEventRepository;
pub use mission::MissionRepository;

/// Composite trait bound for a complete repository implementation.
///
/// This trait is automatically implemented for any type that implements
/// all three repository traits. Use this as a convenient bound when you
/// need access to all repository operations.
pub trait FullRepository: MissionRepository + FrameEventRepository + AlertRepository {}

// Blanket implementation: any type implementing all three traits automatically implements FullRepository
impl<T> FullRepository for T where T: MissionRepository + FrameEventRepository + AlertRepository {}
