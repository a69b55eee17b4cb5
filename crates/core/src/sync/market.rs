use crate::domain::{IndexEntry, Instrument};
use crate::remote::MarketApi;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    pub indices: Vec<IndexEntry>,
    pub trending: Vec<Instrument>,
}

/// Market-wide panels: major indices and the trending list. Refreshes are best effort; a failed
/// fetch keeps whatever was shown before.
pub struct MarketBoard {
    api: MarketApi,
    interval: Duration,
    snapshot: Arc<Mutex<MarketSnapshot>>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl MarketBoard {
    pub fn new(api: MarketApi, interval: Duration) -> Self {
        Self {
            api,
            interval: interval.max(Duration::from_millis(1)),
            snapshot: Arc::new(Mutex::new(MarketSnapshot::default())),
            task: StdMutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> MarketSnapshot {
        self.snapshot.lock().await.clone()
    }

    /// Fetches indices and trending independently. Returns how many of the two succeeded.
    pub async fn refresh(&self) -> usize {
        refresh_into(&self.api, &self.snapshot).await
    }

    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = task.take() {
            prev.abort();
        }

        let api = self.api.clone();
        let snapshot = self.snapshot.clone();
        let interval = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                refresh_into(&api, &snapshot).await;
            }
        }));
    }

    pub fn stop(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = task.take() {
            prev.abort();
        }
    }
}

impl Drop for MarketBoard {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn refresh_into(api: &MarketApi, snapshot: &Mutex<MarketSnapshot>) -> usize {
    let (indices, trending) = tokio::join!(api.indices(), api.trending());
    let mut ok = 0;
    let mut snap = snapshot.lock().await;
    match indices {
        Ok(indices) => {
            snap.indices = indices;
            ok += 1;
        }
        Err(err) => tracing::warn!(error = %err, "market indices refresh failed"),
    }
    match trending {
        Ok(trending) => {
            snap.trending = trending;
            ok += 1;
        }
        Err(err) => tracing::warn!(error = %err, "trending refresh failed"),
    }
    ok
}
