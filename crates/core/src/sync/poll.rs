use crate::remote::MarketApi;
use crate::sync::watchlist::WatchlistStore;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Background refresh of live prices for whatever the watchlist holds at tick time.
///
/// Exactly one timer task exists while running; `start` cancels the previous one before arming a
/// new one, and the first tick of a fresh timer fires immediately.
pub struct PollScheduler {
    store: Arc<WatchlistStore>,
    api: MarketApi,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new(store: Arc<WatchlistStore>, api: MarketApi, interval: Duration) -> Self {
        Self {
            store,
            api,
            interval: interval.max(Duration::from_millis(1)),
            task: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = task.take() {
            prev.abort();
        }

        let store = self.store.clone();
        let api = self.api.clone();
        let interval = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match poll_once(&store, &api).await {
                    Ok(Some(merged)) => tracing::debug!(merged, "price poll merged updates"),
                    Ok(None) => tracing::debug!("watchlist empty; skipping price poll"),
                    Err(err) => tracing::warn!(error = %err, "price poll failed; retrying next tick"),
                }
            }
        }));
    }

    pub fn restart(&self) {
        self.start();
    }

    pub fn stop(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = task.take() {
            prev.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Restarts the poll every time the tracked symbol count changes. Price merges leave the
    /// count alone and so never restart the timer.
    pub fn follow_symbol_count(self: Arc<Self>, mut count: watch::Receiver<usize>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while count.changed().await.is_ok() {
                let symbols = *count.borrow_and_update();
                tracing::info!(symbols, "watchlist size changed; restarting price poll");
                self.restart();
            }
        })
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One refresh: returns `None` without touching the network when nothing is tracked.
pub async fn poll_once(store: &WatchlistStore, api: &MarketApi) -> anyhow::Result<Option<usize>> {
    let symbols = store.symbols().await;
    if symbols.is_empty() {
        return Ok(None);
    }
    let quotes = api.batch_quotes(&symbols).await?;
    Ok(Some(store.merge_updates(&quotes).await))
}
