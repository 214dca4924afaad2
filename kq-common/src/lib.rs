//! # Karaoke Queue Common Library
//!
//! Shared code for the karaoke queue binaries including:
//! - Queue entry model and media-id extraction
//! - Event types (QueueEvent enum) and EventBus
//! - API request/response types
//! - Configuration loading

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod model;

pub use error::{Error, Result};
pub use media::extract_media_id;
pub use model::QueueEntry;
