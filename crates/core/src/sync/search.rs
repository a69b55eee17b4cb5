use crate::domain::SearchResult;
use crate::remote::MarketApi;
use crate::sync::debounce::Debouncer;
use crate::sync::token::RequestTokens;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Default)]
struct SearchState {
    query: String,
    results: Vec<SearchResult>,
}

/// Turns keystrokes into debounced lookups. Every keystroke supersedes the lookups before it,
/// so only the result for the latest text is ever applied.
pub struct SearchController {
    api: MarketApi,
    debouncer: Debouncer,
    tokens: Arc<RequestTokens>,
    state: Arc<Mutex<SearchState>>,
}

impl SearchController {
    pub fn new(api: MarketApi, quiet: Duration) -> Self {
        Self {
            api,
            debouncer: Debouncer::new(quiet),
            tokens: Arc::new(RequestTokens::new()),
            state: Arc::new(Mutex::new(SearchState::default())),
        }
    }

    pub async fn on_query_change(&self, text: &str) {
        let token = self.tokens.issue();
        let query = text.trim().to_string();
        {
            let mut state = self.state.lock().await;
            state.query = text.to_string();
            if query.chars().count() < MIN_QUERY_LEN {
                self.debouncer.cancel();
                state.results.clear();
                return;
            }
        }

        let api = self.api.clone();
        let tokens = self.tokens.clone();
        let state = self.state.clone();
        self.debouncer.trigger(async move {
            match api.search(&query).await {
                Ok(results) => {
                    let mut state = state.lock().await;
                    if tokens.is_current(token) {
                        tracing::debug!(%query, hits = results.len(), "search results applied");
                        state.results = results;
                    } else {
                        tracing::debug!(%query, "discarding superseded search results");
                    }
                }
                Err(err) => {
                    tracing::warn!(%query, error = %err, "search failed; keeping previous results");
                }
            }
        });
    }

    /// Drops the query, its results and any pending lookup.
    pub async fn clear(&self) {
        self.cancel_pending();
        let mut state = self.state.lock().await;
        state.query.clear();
        state.results.clear();
    }

    /// Cancels any scheduled or in-flight lookup, leaving the visible state alone.
    pub fn cancel_pending(&self) {
        self.tokens.issue();
        self.debouncer.cancel();
    }

    pub async fn query(&self) -> String {
        self.state.lock().await.query.clone()
    }

    pub async fn results(&self) -> Vec<SearchResult> {
        self.state.lock().await.results.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeRemote;
    use crate::remote::Method;
    use serde_json::json;

    fn controller(remote: &Arc<FakeRemote>) -> SearchController {
        SearchController::new(MarketApi::new(remote.clone()), Duration::from_millis(300))
    }

    fn hits(symbol: &str) -> serde_json::Value {
        json!({"results": [{"symbol": symbol, "name": format!("{symbol} Inc")}]})
    }

    #[tokio::test(start_paused = true)]
    async fn burst_issues_one_request_for_final_text() {
        let remote = FakeRemote::new();
        remote.reply(Method::Get, "/api/stocks/search/APP", hits("APP"));
        let search = controller(&remote);

        for text in ["A", "AP", "APP"] {
            search.on_query_change(text).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        let calls = remote.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, "/api/stocks/search/APP");
        assert_eq!(search.results().await[0].symbol, "APP");
        assert_eq!(search.query().await, "APP");
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_issues_nothing_and_clears_results() {
        let remote = FakeRemote::new();
        remote.reply(Method::Get, "/api/stocks/search/AM", hits("AMD"));
        let search = controller(&remote);

        search.on_query_change("AM").await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(search.results().await.len(), 1);

        search.on_query_change("A").await;
        assert!(search.results().await.is_empty());
        assert!(!search.is_pending());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(remote.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_cancels_pending_lookup() {
        let remote = FakeRemote::new();
        let search = controller(&remote);

        search.on_query_change("TS").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.on_query_change("T").await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(remote.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_results() {
        let remote = FakeRemote::new();
        remote.reply(Method::Get, "/api/stocks/search/MS", hits("MSFT"));
        remote.fail(Method::Get, "/api/stocks/search/MSX", 500);
        let search = controller(&remote);

        search.on_query_change("MS").await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        search.on_query_change("MSX").await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(remote.calls().len(), 2);
        assert_eq!(search.results().await[0].symbol, "MSFT");
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_in_flight_lookup_is_never_applied() {
        let remote = FakeRemote::new();
        remote.reply_after(
            Method::Get,
            "/api/stocks/search/NV",
            hits("NVAX"),
            Duration::from_millis(1000),
        );
        remote.reply(Method::Get, "/api/stocks/search/NVD", hits("NVDA"));
        let search = controller(&remote);

        search.on_query_change("NV").await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        // "NV" is in flight now.
        search.on_query_change("NVD").await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(remote.calls().len(), 2);
        let results = search.results().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "NVDA");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_discards_pending_lookup() {
        let remote = FakeRemote::new();
        let search = controller(&remote);

        search.on_query_change("GOOG").await;
        search.clear().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(remote.calls().is_empty());
        assert_eq!(search.query().await, "");
    }
}
