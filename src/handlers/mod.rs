//! HTTP handlers. Storage and validation concerns live in `services`.

pub mod health_handlers;
pub mod upload_form;
pub mod video_handlers;
