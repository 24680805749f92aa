//! Media library
//!
//! Captured photos and clips, their object URLs and their persistence.

pub mod media;
pub mod schema;
pub mod store;
pub mod urls;

pub use crate::config::DEFAULT_STORAGE_KEY;
pub use media::{LibraryEvent, MediaLibrary};
pub use schema::{MediaItem, MediaKind, StoredMediaItem, VIDEO_MIME_TYPE};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use urls::{ObjectUrlRegistry, OBJECT_URL_SCHEME};
