//! UI preferences kept next to the session: remembered login email and
//! navigation favorites/recent pages

use crate::errors::CoreResult;
use crate::storage::{KeyValueStore, keys};
use std::sync::Arc;
use tracing::warn;

/// Number of recently visited paths kept
pub const RECENT_LIMIT: usize = 5;

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn remembered_email(&self) -> CoreResult<Option<String>> {
        self.store.get(keys::REMEMBERED_EMAIL)
    }

    /// Store the email for the next login, or forget it with `None`
    pub fn remember_email(&self, email: Option<&str>) -> CoreResult<()> {
        match email {
            Some(email) => self.store.set(keys::REMEMBERED_EMAIL, email),
            None => self.store.remove(keys::REMEMBERED_EMAIL),
        }
    }

    /// Favorite navigation item ids, in the order they were added
    pub fn favorites(&self) -> CoreResult<Vec<String>> {
        self.read_list(keys::NAVIGATION_FAVORITES)
    }

    /// Add or remove a favorite; returns the updated list
    pub fn toggle_favorite(&self, item_id: &str) -> CoreResult<Vec<String>> {
        let mut favorites = self.favorites()?;
        if let Some(pos) = favorites.iter().position(|id| id == item_id) {
            favorites.remove(pos);
        } else {
            favorites.push(item_id.to_string());
        }
        self.write_list(keys::NAVIGATION_FAVORITES, &favorites)?;
        Ok(favorites)
    }

    /// Recently visited paths, newest first
    pub fn recent(&self) -> CoreResult<Vec<String>> {
        self.read_list(keys::NAVIGATION_RECENT)
    }

    /// Record a visit; paths already in the list keep their position
    pub fn record_visit(&self, path: &str) -> CoreResult<Vec<String>> {
        let mut recent = self.recent()?;
        if recent.iter().any(|p| p == path) {
            return Ok(recent);
        }
        recent.insert(0, path.to_string());
        recent.truncate(RECENT_LIMIT);
        self.write_list(keys::NAVIGATION_RECENT, &recent)?;
        Ok(recent)
    }

    fn read_list(&self, key: &str) -> CoreResult<Vec<String>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, "Ignoring malformed preference list: {e}");
            Vec::new()
        }))
    }

    fn write_list(&self, key: &str, values: &[String]) -> CoreResult<()> {
        self.store.set(key, &serde_json::to_string(values)?)
    }
}
