//! Collaborators the handlers are composed from: token auth, the video
//! database, local assets, remote object storage and the ffprobe wrapper.

pub mod assets;
pub mod auth;
pub mod object_storage;
pub mod probe;
pub mod video_store;
