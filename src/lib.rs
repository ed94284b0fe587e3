//! # Skywatch Backend
//!
//! Drone mission alerting and review backend.
//!
//! This crate ingests per-frame detection events from drone missions, runs a
//! windowed quorum decision engine that raises person alerts, queues those
//! alerts for pilot review, and computes mission quality reports (recall,
//! time-to-first-confirmation, false-positive rate). The backend exposes a
//! REST API via Axum.
//!
//! ## Features
//!
//! - **Frame Ingestion**: Append-only per-frame detection events
//! - **Alert Engine**: Windowed quorum with cooldown and gap-based re-arm
//! - **Review Workflow**: One-shot confirm/reject lifecycle per alert
//! - **Reporting**: Episode reconstruction and mission quality metrics
//! - **Replay**: Supervised re-ingestion of recorded frame directories
//! - **HTTP API**: RESTful endpoints plus SSE replay log streaming
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Data Transfer Objects (DTOs) for API responses
//! - [`models`]: Mission, frame, alert and report domain types
//! - [`db`]: Database operations, repository pattern, and persistence layer
//! - [`services`]: Alert engine, ingestion, replay and report computation
//! - [`http`]: Axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
