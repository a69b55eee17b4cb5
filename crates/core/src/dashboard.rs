use crate::config::{Settings, SyncOptions};
use crate::domain::Period;
use crate::remote::{HttpRemote, MarketApi, RemoteDataPort};
use crate::sync::{
    AddOutcome, ChartPeriodController, ChatSession, LoadOutcome, MarketBoard, MutationController,
    PollScheduler, RemoveOutcome, SearchController, WatchlistStore,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Everything the client keeps in sync with the backend, wired over one [`RemoteDataPort`].
pub struct Dashboard {
    api: MarketApi,
    store: Arc<WatchlistStore>,
    poller: Arc<PollScheduler>,
    search: Arc<SearchController>,
    mutations: MutationController,
    chart: ChartPeriodController,
    chat: ChatSession,
    market: MarketBoard,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl Dashboard {
    pub fn connect(settings: &Settings) -> anyhow::Result<Self> {
        let remote = HttpRemote::from_settings(settings)?;
        Ok(Self::new(Arc::new(remote), settings.sync))
    }

    pub fn new(port: Arc<dyn RemoteDataPort>, opts: SyncOptions) -> Self {
        let api = MarketApi::new(port);
        let store = Arc::new(WatchlistStore::new());
        let search = Arc::new(SearchController::new(api.clone(), opts.search_debounce));
        Self {
            poller: Arc::new(PollScheduler::new(
                store.clone(),
                api.clone(),
                opts.poll_interval,
            )),
            mutations: MutationController::new(api.clone(), store.clone(), search.clone()),
            chart: ChartPeriodController::new(api.clone(), store.clone()),
            chat: ChatSession::new(api.clone(), store.clone()),
            market: MarketBoard::new(api.clone(), opts.market_refresh),
            search,
            store,
            api,
            follower: Mutex::new(None),
        }
    }

    /// Loads the watchlist once, then starts the price poll (restarted on every change in the
    /// number of tracked symbols) and the market refresh.
    pub async fn start(&self) {
        match self.reload_watchlist().await {
            Ok(()) => tracing::info!(symbols = self.store.len().await, "watchlist loaded"),
            Err(err) => tracing::warn!(error = %err, "initial watchlist load failed; starting empty"),
        }

        // Subscribe after the initial load so it does not count as a change.
        let count = self.store.subscribe_count();
        self.poller.start();
        let follower = self.poller.clone().follow_symbol_count(count);
        if let Some(prev) = self
            .follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(follower)
        {
            prev.abort();
        }
        self.market.start();
    }

    pub fn shutdown(&self) {
        if let Some(follower) = self
            .follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            follower.abort();
        }
        self.poller.stop();
        self.market.stop();
        self.search.cancel_pending();
    }

    pub async fn health(&self) -> anyhow::Result<String> {
        self.api.health().await
    }

    pub async fn reload_watchlist(&self) -> anyhow::Result<()> {
        self.mutations.reload().await
    }

    pub async fn on_query_change(&self, text: &str) {
        self.search.on_query_change(text).await;
    }

    pub async fn add(&self, symbol: &str) -> AddOutcome {
        self.mutations.add(symbol).await
    }

    pub async fn remove(&self, symbol: &str) -> RemoveOutcome {
        self.mutations.remove(symbol).await
    }

    pub async fn select(&self, symbol: &str) -> LoadOutcome {
        self.search.clear().await;
        self.chart.select_instrument(symbol).await
    }

    pub async fn select_period(&self, period: Period) -> LoadOutcome {
        self.chart.select_period(period).await
    }

    pub fn store(&self) -> &Arc<WatchlistStore> {
        &self.store
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub fn mutations(&self) -> &MutationController {
        &self.mutations
    }

    pub fn chart(&self) -> &ChartPeriodController {
        &self.chart
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn market(&self) -> &MarketBoard {
        &self.market
    }

    pub fn poller(&self) -> &PollScheduler {
        &self.poller
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}
