//! Upload API for a video-hosting backend.
//!
//! Owners attach a thumbnail (stored on local disk) and a video file (stored
//! in an S3 bucket under an aspect-ratio prefix) to their video records.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
