//! Core data models for the video upload service.
//!
//! These entities map to database tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`.

pub mod video;
