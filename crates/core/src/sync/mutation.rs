use crate::domain::normalize_symbol;
use crate::remote::error::is_conflict;
use crate::remote::MarketApi;
use crate::sync::search::SearchController;
use crate::sync::watchlist::WatchlistStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Already tracked, whether noticed locally or reported by the backend.
    Duplicate,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    Failed,
}

/// Watchlist edits. Adds act on the UI before the backend answers (search is cleared, a pending
/// marker is shown); removes only touch local state once the backend has confirmed.
pub struct MutationController {
    api: MarketApi,
    store: Arc<WatchlistStore>,
    search: Arc<SearchController>,
    pending_adds: Arc<Mutex<HashSet<String>>>,
}

impl MutationController {
    pub fn new(api: MarketApi, store: Arc<WatchlistStore>, search: Arc<SearchController>) -> Self {
        Self {
            api,
            store,
            search,
            pending_adds: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn add(&self, symbol: &str) -> AddOutcome {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            tracing::warn!("refusing to add an empty symbol");
            return AddOutcome::Failed;
        }

        if self.store.contains(&symbol).await {
            tracing::info!(%symbol, "already in watchlist");
            return AddOutcome::Duplicate;
        }

        let Some(_pending) = PendingAdd::mark(&self.pending_adds, &symbol) else {
            tracing::info!(%symbol, "add already in progress");
            return AddOutcome::Duplicate;
        };

        self.search.clear().await;

        match self.api.add_to_watchlist(&symbol).await {
            Ok(()) => {
                if let Err(err) = self.reload().await {
                    tracing::warn!(%symbol, error = %err, "watchlist reload after add failed");
                }
                tracing::info!(%symbol, "added to watchlist");
                AddOutcome::Added
            }
            Err(err) if is_conflict(&err) => {
                tracing::info!(%symbol, "backend reports symbol already in watchlist");
                AddOutcome::Duplicate
            }
            Err(err) => {
                tracing::warn!(%symbol, error = %err, "add to watchlist failed");
                AddOutcome::Failed
            }
        }
    }

    pub async fn remove(&self, symbol: &str) -> RemoveOutcome {
        let symbol = normalize_symbol(symbol);

        if let Err(err) = self.api.remove_from_watchlist(&symbol).await {
            tracing::warn!(%symbol, error = %err, "remove from watchlist failed");
            return RemoveOutcome::Failed;
        }

        // Confirmed: drop it locally (clearing the selection if it pointed here), then resync.
        self.store.remove(&symbol).await;
        if let Err(err) = self.reload().await {
            tracing::warn!(%symbol, error = %err, "watchlist reload after remove failed");
        }
        tracing::info!(%symbol, "removed from watchlist");
        RemoveOutcome::Removed
    }

    /// Replaces the local list with the backend's.
    pub async fn reload(&self) -> anyhow::Result<()> {
        let entries = self.api.watchlist().await?;
        self.store.replace_all(entries).await;
        Ok(())
    }

    pub fn is_pending(&self, symbol: &str) -> bool {
        self.pending_adds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&normalize_symbol(symbol))
    }

    pub fn pending(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .pending_adds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        out.sort();
        out
    }
}

/// Pending-add marker, released on every exit path including cancellation.
struct PendingAdd {
    set: Arc<Mutex<HashSet<String>>>,
    symbol: String,
}

impl PendingAdd {
    fn mark(set: &Arc<Mutex<HashSet<String>>>, symbol: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol.to_string());
        inserted.then(|| Self {
            set: set.clone(),
            symbol: symbol.to_string(),
        })
    }
}

impl Drop for PendingAdd {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.symbol);
    }
}
