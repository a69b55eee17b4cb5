use crate::domain::{
    normalize_symbol, HistoryPoint, IndexEntry, Instrument, Period, SearchResult, WatchlistEntry,
};
use crate::remote::{Method, RemoteDataPort};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const BATCH_UPDATE_TYPE: &str = "stock_update";

/// Typed view over the backend endpoints, built on a [`RemoteDataPort`].
#[derive(Clone)]
pub struct MarketApi {
    port: Arc<dyn RemoteDataPort>,
}

impl MarketApi {
    pub fn new(port: Arc<dyn RemoteDataPort>) -> Self {
        Self { port }
    }

    pub async fn watchlist(&self) -> Result<Vec<WatchlistEntry>> {
        let raw = self.get("/api/watchlist").await?;
        let parsed: WatchlistResponse = decode(raw, "watchlist")?;
        Ok(parsed.stocks)
    }

    pub async fn add_to_watchlist(&self, symbol: &str) -> Result<()> {
        let body = serde_json::to_value(AddRequest {
            symbol: normalize_symbol(symbol),
        })?;
        self.port
            .request(Method::Post, "/api/watchlist", Some(body))
            .await
            .with_context(|| format!("add {symbol} to watchlist failed"))?;
        Ok(())
    }

    pub async fn remove_from_watchlist(&self, symbol: &str) -> Result<()> {
        let path = format!("/api/watchlist/{}", segment(symbol));
        self.port
            .request(Method::Delete, &path, None)
            .await
            .with_context(|| format!("remove {symbol} from watchlist failed"))?;
        Ok(())
    }

    pub async fn batch_quotes(&self, symbols: &[String]) -> Result<Vec<Instrument>> {
        anyhow::ensure!(!symbols.is_empty(), "batch quote request needs at least one symbol");

        let csv = symbols
            .iter()
            .map(|s| segment(s))
            .collect::<Vec<_>>()
            .join(",");
        let raw = self.get(&format!("/api/stocks/batch?symbols={csv}")).await?;
        let parsed: BatchResponse = decode(raw, "batch quotes")?;
        if let Some(kind) = parsed.kind.as_deref() {
            anyhow::ensure!(
                kind == BATCH_UPDATE_TYPE,
                "unexpected batch response type: {kind}"
            );
        }
        Ok(parsed.data)
    }

    pub async fn instrument(&self, symbol: &str) -> Result<Instrument> {
        let raw = self
            .get(&format!("/api/stocks/{}", segment(symbol)))
            .await?;
        decode(raw, "instrument detail")
    }

    pub async fn history(&self, symbol: &str, period: Period) -> Result<Vec<HistoryPoint>> {
        let path = format!(
            "/api/stocks/{}/history?period={}&interval={}",
            segment(symbol),
            period.range(),
            period.sample_interval()
        );
        let raw = self.get(&path).await?;
        let parsed: HistoryResponse = decode(raw, "history")?;
        let mut points = parsed.data;
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let raw = self
            .get(&format!("/api/stocks/search/{}", urlencoding::encode(query.trim())))
            .await?;
        let parsed: SearchResponse = decode(raw, "search")?;
        Ok(parsed.results)
    }

    pub async fn indices(&self) -> Result<Vec<IndexEntry>> {
        let raw = self.get("/api/market/indices").await?;
        let parsed: IndicesResponse = decode(raw, "market indices")?;
        Ok(parsed.indices)
    }

    pub async fn trending(&self) -> Result<Vec<Instrument>> {
        let raw = self.get("/api/market/trending").await?;
        let parsed: TrendingResponse = decode(raw, "trending")?;
        Ok(parsed.trending)
    }

    pub async fn chat(
        &self,
        message: &str,
        session_id: Uuid,
        stock_symbol: Option<&str>,
    ) -> Result<String> {
        let body = serde_json::to_value(ChatRequest {
            message,
            session_id: session_id.to_string(),
            stock_symbol: stock_symbol.map(normalize_symbol),
        })?;
        let raw = self
            .port
            .request(Method::Post, "/api/chat", Some(body))
            .await
            .context("chat request failed")?;
        let parsed: ChatResponse = decode(raw, "chat")?;
        Ok(parsed.response)
    }

    pub async fn health(&self) -> Result<String> {
        let raw = self.get("/health").await?;
        let parsed: HealthResponse = decode(raw, "health")?;
        Ok(parsed.status)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.port
            .request(Method::Get, path, None)
            .await
            .with_context(|| format!("GET {path} failed"))
    }
}

fn segment(symbol: &str) -> String {
    urlencoding::encode(&normalize_symbol(symbol)).into_owned()
}

fn decode<T: DeserializeOwned>(raw: Value, what: &str) -> Result<T> {
    serde_json::from_value::<T>(raw).with_context(|| format!("failed to decode {what} response"))
}

#[derive(Debug, Serialize)]
struct AddRequest {
    symbol: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stock_symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WatchlistResponse {
    #[serde(default)]
    stocks: Vec<WatchlistEntry>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    data: Vec<HistoryPoint>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct IndicesResponse {
    #[serde(default)]
    indices: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    trending: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeRemote;
    use serde_json::json;

    #[tokio::test]
    async fn batch_request_lists_symbols_as_csv() {
        let remote = FakeRemote::new();
        remote.reply(
            Method::Get,
            "/api/stocks/batch?symbols=AAPL,MSFT",
            json!({"type": "stock_update", "data": [{"symbol": "AAPL", "price": 150.0}]}),
        );
        let api = MarketApi::new(remote.clone());

        let quotes = api
            .batch_quotes(&["aapl".to_string(), "MSFT".to_string()])
            .await
            .unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].price, Some(150.0));
    }

    #[tokio::test]
    async fn batch_rejects_unexpected_message_type() {
        let remote = FakeRemote::new();
        remote.reply(
            Method::Get,
            "/api/stocks/batch?symbols=AAPL",
            json!({"type": "heartbeat", "data": []}),
        );
        let api = MarketApi::new(remote);
        assert!(api.batch_quotes(&["AAPL".to_string()]).await.is_err());
    }

    #[tokio::test]
    async fn history_uses_period_mapping_and_sorts_points() {
        let remote = FakeRemote::new();
        remote.reply(
            Method::Get,
            "/api/stocks/AAPL/history?period=1mo&interval=1d",
            json!({"symbol": "AAPL", "data": [
                {"timestamp": "2026-01-02T00:00:00", "close": 2.0},
                {"timestamp": "2026-01-01T00:00:00", "close": 1.0}
            ]}),
        );
        let api = MarketApi::new(remote);

        let points = api.history("aapl", Period::OneMonth).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].close, 1.0);
        assert_eq!(points[1].close, 2.0);
    }

    #[tokio::test]
    async fn chat_sends_snake_case_body_and_omits_missing_symbol() {
        let remote = FakeRemote::new();
        remote.always(Method::Post, "/api/chat", json!({"response": "hi", "timestamp": "x"}));
        let api = MarketApi::new(remote.clone());
        let session = Uuid::new_v4();

        assert_eq!(api.chat("hello", session, Some("tsla")).await.unwrap(), "hi");
        api.chat("again", session, None).await.unwrap();

        let calls = remote.calls();
        assert_eq!(
            calls[0].body,
            Some(json!({"message": "hello", "session_id": session.to_string(), "stock_symbol": "TSLA"}))
        );
        assert_eq!(
            calls[1].body,
            Some(json!({"message": "again", "session_id": session.to_string()}))
        );
    }

    #[tokio::test]
    async fn search_encodes_query_path_segment() {
        let remote = FakeRemote::new();
        remote.reply(
            Method::Get,
            "/api/stocks/search/apple%20inc",
            json!({"results": [{"symbol": "AAPL", "name": "Apple Inc."}]}),
        );
        let api = MarketApi::new(remote);
        let results = api.search(" apple inc ").await.unwrap();
        assert_eq!(results[0].symbol, "AAPL");
    }

    #[tokio::test]
    async fn index_symbols_are_percent_encoded() {
        let remote = FakeRemote::new();
        remote.reply(
            Method::Get,
            "/api/stocks/%5EGSPC",
            json!({"symbol": "^GSPC", "price": 5000.0}),
        );
        let api = MarketApi::new(remote);
        assert_eq!(api.instrument("^gspc").await.unwrap().price, Some(5000.0));
    }
}
