//! Core data models for the video upload service.
//!
//! `Video` maps to the `videos` table via `sqlx::FromRow` and serializes as
//! the JSON body returned by every video endpoint.

pub mod aspect_ratio;
pub mod video;
