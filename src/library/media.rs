//! The media library
//!
//! An ordered list of captured items; insertion order is display order.
//! Every mutation is applied to the list as it is at commit time, under one
//! write lock, and then saved to the store when the library is persistent.
//! Stored entries are encoded once per item and cached, and the store write
//! happens after the list lock is released.

use super::schema::{MediaItem, MediaKind, StoredMediaItem};
use super::store::KeyValueStore;
use super::urls::ObjectUrlRegistry;
use crate::utils::error::AppError;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted when the library changes
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryEvent {
    Appended { id: Uuid, index: usize },
    Removed { id: Uuid, index: usize },
}

struct Persistence {
    store: Arc<dyn KeyValueStore>,
    key: String,
    /// Encoded entries by id; holding this lock orders store writes
    encoded: Mutex<HashMap<Uuid, StoredMediaItem>>,
}

pub struct MediaLibrary {
    items: RwLock<Vec<MediaItem>>,
    urls: Arc<ObjectUrlRegistry>,
    persistence: Option<Persistence>,
    event_tx: broadcast::Sender<LibraryEvent>,
}

impl MediaLibrary {
    /// A library kept in memory only
    pub fn volatile(urls: Arc<ObjectUrlRegistry>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            items: RwLock::new(Vec::new()),
            urls,
            persistence: None,
            event_tx,
        }
    }

    /// A library saved under `key`, rehydrated from the store now.
    ///
    /// Unreadable contents give an empty library; entries that cannot be
    /// rebuilt are skipped.
    pub fn persistent(store: Arc<dyn KeyValueStore>, key: &str, urls: Arc<ObjectUrlRegistry>) -> Self {
        let (items, encoded) = Self::hydrate(store.as_ref(), key, &urls);
        tracing::info!("Loaded {} media item(s) from '{}'", items.len(), key);

        let (event_tx, _) = broadcast::channel(64);
        Self {
            items: RwLock::new(items),
            urls,
            persistence: Some(Persistence {
                store,
                key: key.to_string(),
                encoded: Mutex::new(encoded),
            }),
            event_tx,
        }
    }

    fn hydrate(
        store: &dyn KeyValueStore,
        key: &str,
        urls: &ObjectUrlRegistry,
    ) -> (Vec<MediaItem>, HashMap<Uuid, StoredMediaItem>) {
        let raw = match store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Default::default(),
            Err(e) => {
                tracing::warn!("Failed to read media library: {}", e);
                return Default::default();
            }
        };

        let stored: Vec<StoredMediaItem> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Discarding unreadable media library: {}", e);
                return Default::default();
            }
        };

        let mut encoded = HashMap::new();
        let items = stored
            .into_iter()
            .filter_map(|entry| {
                let id = entry.id;
                let cached = entry.clone();
                let item = match entry.kind {
                    MediaKind::Photo => entry.into_item(None, None),
                    MediaKind::Video => entry.decode_data().and_then(|blob| {
                        let url = urls.create(blob.clone(), &entry.mime_type);
                        entry.into_item(Some(url), Some(blob))
                    }),
                };
                match &item {
                    Some(_) => {
                        encoded.insert(id, cached);
                    }
                    None => {
                        tracing::warn!("Skipping stored media item {} without usable data", id);
                    }
                }
                item
            })
            .collect();

        (items, encoded)
    }

    /// Subscribe to library changes
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.event_tx.subscribe()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    pub fn url_registry(&self) -> &Arc<ObjectUrlRegistry> {
        &self.urls
    }

    /// Apply a mutation to the current list, then save it.
    ///
    /// Only items new since the last save are encoded. The list lock is
    /// released before the store is written.
    fn update<R>(&self, mutate: impl FnOnce(&mut Vec<MediaItem>) -> R) -> R {
        let mut items = self.items.write();
        let result = mutate(&mut items);

        let Some(persistence) = &self.persistence else {
            return result;
        };

        let mut encoded = persistence.encoded.lock();
        let order: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        for item in items.iter() {
            encoded
                .entry(item.id)
                .or_insert_with(|| StoredMediaItem::from_item(item));
        }
        drop(items);

        let live: HashSet<Uuid> = order.iter().copied().collect();
        encoded.retain(|id, _| live.contains(id));

        let stored: Vec<&StoredMediaItem> = order.iter().filter_map(|id| encoded.get(id)).collect();
        let written = serde_json::to_string(&stored)
            .map_err(AppError::from)
            .and_then(|json| persistence.store.set(&persistence.key, &json));

        // The in-memory list stays authoritative if the store refuses the write
        if let Err(e) = written {
            tracing::warn!("Failed to persist media library: {}", e);
        }
        result
    }

    /// Add an item at the end
    pub fn append(&self, item: MediaItem) {
        let id = item.id;
        let kind = item.kind;
        let index = self.update(|items| {
            items.push(item);
            items.len() - 1
        });

        tracing::info!("Added {:?} {} at position {}", kind, id, index);
        let _ = self.event_tx.send(LibraryEvent::Appended { id, index });
    }

    /// Remove the item at `index`, revoking a video's object URL.
    ///
    /// Returns `None` (and changes nothing) when the index is out of range.
    pub fn remove_at(&self, index: usize) -> Option<MediaItem> {
        let removed = self.remove_where(|items| (index < items.len()).then_some(index));
        if removed.is_none() {
            tracing::debug!("Ignoring delete of missing position {}", index);
        }
        removed
    }

    /// Remove an item by id; unknown ids change nothing
    pub fn remove(&self, id: Uuid) -> Option<MediaItem> {
        let removed = self.remove_where(|items| items.iter().position(|item| item.id == id));
        if removed.is_none() {
            tracing::debug!("Ignoring delete of unknown item {}", id);
        }
        removed
    }

    /// Locate and remove under one write lock
    fn remove_where(&self, find: impl FnOnce(&[MediaItem]) -> Option<usize>) -> Option<MediaItem> {
        let removed = self.update(|items| {
            let index = find(items)?;
            if items[index].is_video() {
                self.urls.revoke(&items[index].url);
            }
            Some((index, items.remove(index)))
        });

        let (index, item) = removed?;
        tracing::info!("Deleted {:?} {} from position {}", item.kind, item.id, index);
        let _ = self.event_tx.send(LibraryEvent::Removed { id: item.id, index });
        Some(item)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.items.read().iter().position(|item| item.id == id)
    }

    /// Snapshot of all items in display order
    pub fn items(&self) -> Vec<MediaItem> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}
