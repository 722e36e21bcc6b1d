use std::collections::HashMap;

use crate::model::{CityId, WatchlistEntry};

/// Insertion-ordered collection with at most one entry per id.
///
/// Entries are keyed by id so updates never depend on positions that may
/// shift while a fetch is outstanding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watchlist {
    entries: HashMap<CityId, WatchlistEntry>,
    order: Vec<CityId>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted rows. Later rows with a repeated id are dropped.
    pub fn from_entries(rows: Vec<WatchlistEntry>) -> Self {
        let mut list = Self::new();
        for row in rows {
            list.push(row);
        }
        list
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: CityId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: CityId) -> Option<&WatchlistEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: CityId) -> Option<&mut WatchlistEntry> {
        self.entries.get_mut(&id)
    }

    /// Append; returns false and leaves the list alone if the id is present.
    pub fn push(&mut self, entry: WatchlistEntry) -> bool {
        if self.entries.contains_key(&entry.id) {
            return false;
        }
        self.order.push(entry.id);
        self.entries.insert(entry.id, entry);
        true
    }

    pub fn remove(&mut self, id: CityId) -> Option<WatchlistEntry> {
        let removed = self.entries.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn ids(&self) -> &[CityId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchlistEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn to_vec(&self) -> Vec<WatchlistEntry> {
        self.iter().cloned().collect()
    }
}
