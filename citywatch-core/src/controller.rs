//! Watchlist orchestration: add, remove, refresh against the gateway and store.
//!
//! Each mutation computes the next watchlist, writes it to the store in full
//! and only then swaps it in, so memory never runs ahead of storage.
//! Mutations take the async `write_order` lock for compute, write and swap,
//! which keeps writes in mutation order. The write itself runs on the
//! blocking pool. The session lock is synchronous, held only for short
//! in-memory work and never across an `.await`, so readers are not stalled
//! by disk I/O.
//!
//! Add and refresh for the same city hold a per-id async lock for the whole
//! fetch round trip; the lock is dropped from the map once nobody holds or
//! waits on it. Remove does not wait on that lock; a fetch that lands after
//! its entry was removed is dropped.

use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::{
    sync::{Mutex as AsyncMutex, OwnedMutexGuard},
    task::JoinSet,
};

use crate::{
    error::WatchError,
    finder::{self, SearchOutcome},
    gateway::WeatherGateway,
    model::{CityDirectoryEntry, CityId, WatchlistEntry},
    store::PersistentWatchlistStore,
    watchlist::Watchlist,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(WatchlistEntry),
    /// The city was already tracked; the duplicate flag is now set.
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated(WatchlistEntry),
    /// The entry was not (or no longer) in the watchlist.
    Discarded,
}

/// Aggregate result of [`WatchlistController::refresh_all`], in watchlist order.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub updated: Vec<CityId>,
    pub discarded: Vec<CityId>,
    pub failed: Vec<(CityId, WatchError)>,
}

impl RefreshReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
struct Session {
    watchlist: Watchlist,
    pending_query: Option<String>,
    duplicate: bool,
}

#[derive(Debug)]
struct Inner {
    gateway: Arc<dyn WeatherGateway>,
    store: PersistentWatchlistStore,
    session: Mutex<Session>,
    write_order: AsyncMutex<()>,
    id_locks: Mutex<HashMap<CityId, Arc<AsyncMutex<()>>>>,
}

/// Per-id lock held for one fetch round trip.
struct IdLock {
    inner: Arc<Inner>,
    id: CityId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdLock {
    fn drop(&mut self) {
        self.guard.take();
        // Clones are only taken under the map lock, so a count of one means
        // no holder and no waiter.
        let mut locks = self.inner.id_locks.lock();
        if locks.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.id);
        }
    }
}

/// Owner of the in-memory watchlist. Clones share the same state.
#[derive(Debug, Clone)]
pub struct WatchlistController {
    inner: Arc<Inner>,
}

impl WatchlistController {
    /// Load the persisted watchlist; corrupt storage is an error.
    pub fn open(
        gateway: Arc<dyn WeatherGateway>,
        store: PersistentWatchlistStore,
    ) -> Result<Self, WatchError> {
        let rows = store.read()?;
        Ok(Self::with_watchlist(gateway, store, Watchlist::from_entries(rows)))
    }

    /// Like [`open`](Self::open), but starts empty on corrupt storage and
    /// hands the corruption error back alongside the controller.
    pub fn open_recovering(
        gateway: Arc<dyn WeatherGateway>,
        store: PersistentWatchlistStore,
    ) -> Result<(Self, Option<WatchError>), WatchError> {
        match store.read() {
            Ok(rows) => {
                Ok((Self::with_watchlist(gateway, store, Watchlist::from_entries(rows)), None))
            }
            Err(e) if e.is_corrupt() => {
                tracing::warn!(error = %e, "stored watchlist is unreadable, starting empty");
                Ok((Self::with_watchlist(gateway, store, Watchlist::new()), Some(e.into())))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn with_watchlist(
        gateway: Arc<dyn WeatherGateway>,
        store: PersistentWatchlistStore,
        watchlist: Watchlist,
    ) -> Self {
        tracing::debug!(entries = watchlist.len(), "watchlist loaded");
        Self {
            inner: Arc::new(Inner {
                gateway,
                store,
                session: Mutex::new(Session { watchlist, ..Session::default() }),
                write_order: AsyncMutex::new(()),
                id_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Snapshot of the watchlist in insertion order.
    pub fn entries(&self) -> Vec<WatchlistEntry> {
        self.inner.session.lock().watchlist.to_vec()
    }

    pub fn get(&self, id: CityId) -> Option<WatchlistEntry> {
        self.inner.session.lock().watchlist.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.session.lock().watchlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_query(&self) -> Option<String> {
        self.inner.session.lock().pending_query.clone()
    }

    /// Set when the last add targeted a city already in the watchlist.
    pub fn duplicate_flag(&self) -> bool {
        self.inner.session.lock().duplicate
    }

    pub fn clear_duplicate_flag(&self) {
        self.inner.session.lock().duplicate = false;
    }

    /// Validate `input`, record it as the pending query and search the directory.
    pub async fn begin_search(&self, input: &str) -> Result<SearchOutcome, WatchError> {
        let query = finder::validate_city_input(input)?;

        {
            let mut session = self.inner.session.lock();
            session.duplicate = false;
            session.pending_query = Some(query.to_string());
        }

        let directory = self.inner.gateway.fetch_directory().await?;
        Ok(finder::search(query, &directory))
    }

    pub async fn add(&self, candidate: &CityDirectoryEntry) -> Result<AddOutcome, WatchError> {
        let id = candidate.id;
        if self.flag_if_duplicate(id) {
            return Ok(AddOutcome::Duplicate);
        }

        let _guard = self.lock_id(id).await;
        // Another add for this id may have finished while we waited.
        if self.flag_if_duplicate(id) {
            return Ok(AddOutcome::Duplicate);
        }

        let reading = self.inner.gateway.fetch_current(id).await?;
        let entry = WatchlistEntry::from_reading(candidate, &reading);

        let _order = self.inner.write_order.lock().await;
        let mut next = self.inner.session.lock().watchlist.clone();
        next.push(entry.clone());
        self.inner.store.write_off_thread(next.to_vec()).await?;

        let mut session = self.inner.session.lock();
        session.watchlist = next;
        session.pending_query = None;
        tracing::info!(%id, city = %entry.city_name, "added city to watchlist");

        Ok(AddOutcome::Added(entry))
    }

    /// Fetch fresh conditions for one entry and reconcile it in place.
    pub async fn refresh(&self, id: CityId) -> Result<RefreshOutcome, WatchError> {
        if !self.contains(id) {
            tracing::debug!(%id, "refresh requested for untracked city");
            return Ok(RefreshOutcome::Discarded);
        }

        let _guard = self.lock_id(id).await;
        if !self.contains(id) {
            return Ok(RefreshOutcome::Discarded);
        }

        let reading = self.inner.gateway.fetch_current(id).await?;

        let _order = self.inner.write_order.lock().await;
        let mut next = self.inner.session.lock().watchlist.clone();
        let Some(entry) = next.get_mut(id) else {
            tracing::warn!(%id, "city removed while refreshing, dropping result");
            return Ok(RefreshOutcome::Discarded);
        };
        entry.apply_reading(&reading);
        let updated = entry.clone();

        self.inner.store.write_off_thread(next.to_vec()).await?;
        self.inner.session.lock().watchlist = next;
        tracing::info!(%id, updated = %updated.last_updated, "refreshed city");

        Ok(RefreshOutcome::Updated(updated))
    }

    /// Refresh every tracked city concurrently and wait for all of them.
    pub async fn refresh_all(&self) -> RefreshReport {
        let ids = self.inner.session.lock().watchlist.ids().to_vec();

        let mut tasks = JoinSet::new();
        for id in ids.iter().copied() {
            let controller = self.clone();
            tasks.spawn(async move { (id, controller.refresh(id).await) });
        }

        let mut results = HashMap::with_capacity(ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, result)) => {
                    results.insert(id, result);
                }
                Err(e) => tracing::error!(error = %e, "refresh task did not complete"),
            }
        }

        let mut report = RefreshReport::default();
        for id in ids {
            match results.remove(&id) {
                Some(Ok(RefreshOutcome::Updated(_))) => report.updated.push(id),
                Some(Ok(RefreshOutcome::Discarded)) => report.discarded.push(id),
                Some(Err(e)) => {
                    tracing::warn!(%id, error = %e, "refresh failed");
                    report.failed.push((id, e));
                }
                None => {}
            }
        }
        report
    }

    /// Returns false when the city was not tracked.
    pub async fn remove(&self, id: CityId) -> Result<bool, WatchError> {
        let _order = self.inner.write_order.lock().await;
        let mut next = self.inner.session.lock().watchlist.clone();
        if next.remove(id).is_none() {
            return Ok(false);
        }

        self.inner.store.write_off_thread(next.to_vec()).await?;
        self.inner.session.lock().watchlist = next;
        tracing::info!(%id, "removed city from watchlist");
        Ok(true)
    }

    pub async fn remove_all(&self) -> Result<(), WatchError> {
        let _order = self.inner.write_order.lock().await;
        self.inner.store.write_off_thread(Vec::new()).await?;
        self.inner.session.lock().watchlist.clear();
        tracing::info!("cleared watchlist");
        Ok(())
    }

    fn contains(&self, id: CityId) -> bool {
        self.inner.session.lock().watchlist.contains(id)
    }

    fn flag_if_duplicate(&self, id: CityId) -> bool {
        let mut session = self.inner.session.lock();
        if !session.watchlist.contains(id) {
            return false;
        }
        session.duplicate = true;
        session.pending_query = None;
        tracing::debug!(%id, "city already in watchlist");
        true
    }

    async fn lock_id(&self, id: CityId) -> IdLock {
        let lock = Arc::clone(self.inner.id_locks.lock().entry(id).or_default());
        let guard = lock.lock_owned().await;
        IdLock { inner: Arc::clone(&self.inner), id, guard: Some(guard) }
    }
}
