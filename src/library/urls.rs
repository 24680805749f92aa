//! Object URLs for in-memory media
//!
//! Clips live in process memory; the webview reaches them through revocable
//! `media://localhost/<id>` URLs served by the desktop shell. A URL stays
//! resolvable until it is revoked.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// URI scheme the desktop shell serves object URLs on
pub const OBJECT_URL_SCHEME: &str = "media";

#[derive(Debug, Clone)]
struct ObjectEntry {
    bytes: Bytes,
    mime_type: String,
}

/// Registry of live object URLs
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    entries: RwLock<HashMap<Uuid, ObjectEntry>>,
    revocations: AtomicUsize,
}

/// Extract the object id from a URL or request path
fn object_id(url_or_path: &str) -> Option<Uuid> {
    let last = url_or_path.trim_end_matches('/').rsplit('/').next()?;
    let decoded = urlencoding::decode(last).ok()?;
    Uuid::parse_str(&decoded).ok()
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new URL for the bytes
    pub fn create(&self, bytes: Bytes, mime_type: &str) -> String {
        let id = Uuid::new_v4();
        let size = bytes.len();
        self.entries.write().insert(
            id,
            ObjectEntry {
                bytes,
                mime_type: mime_type.to_string(),
            },
        );
        tracing::debug!("Created object URL {} ({} bytes, {})", id, size, mime_type);
        format!("{}://localhost/{}", OBJECT_URL_SCHEME, id)
    }

    /// Bytes and MIME type behind a URL (or a request path ending in the id)
    pub fn resolve(&self, url: &str) -> Option<(Bytes, String)> {
        let id = object_id(url)?;
        self.entries
            .read()
            .get(&id)
            .map(|entry| (entry.bytes.clone(), entry.mime_type.clone()))
    }

    pub fn contains(&self, url: &str) -> bool {
        object_id(url)
            .map(|id| self.entries.read().contains_key(&id))
            .unwrap_or(false)
    }

    /// Release the bytes behind a URL. Returns false if it was not live.
    pub fn revoke(&self, url: &str) -> bool {
        let removed = object_id(url)
            .and_then(|id| self.entries.write().remove(&id))
            .is_some();
        if removed {
            self.revocations.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Revoked object URL {}", url);
        } else {
            tracing::warn!("Revoke of unknown object URL {}", url);
        }
        removed
    }

    /// Release every URL, returning how many were live
    pub fn revoke_all(&self) -> usize {
        let count = {
            let mut entries = self.entries.write();
            let count = entries.len();
            entries.clear();
            count
        };
        self.revocations.fetch_add(count, Ordering::Relaxed);
        count
    }

    /// Number of live URLs
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total successful revocations so far
    pub fn revocations(&self) -> usize {
        self.revocations.load(Ordering::Relaxed)
    }
}
