use crate::config::Settings;
use crate::remote::{Method, RemoteDataPort, RemoteFailure};
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

/// [`RemoteDataPort`] over the backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl HttpRemote {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_api_url()?;
        Self::new(base_url, settings.http_timeout, settings.http_retries)
    }

    pub fn new(base_url: &str, timeout: Duration, retries: u32) -> Result<Self> {
        anyhow::ensure!(!base_url.trim().is_empty(), "backend base url must be non-empty");

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build backend http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            retries: retries.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn request_once(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(path);
        let builder = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Delete => self.http.delete(&url),
        };
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let res = builder
            .send()
            .await
            .with_context(|| format!("backend request failed: {method} {path}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read backend response")?;

        if !status.is_success() {
            return Err(RemoteFailure {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str::<Value>(&text)
            .with_context(|| format!("backend response is not valid JSON: {text}"))
    }
}

#[async_trait::async_trait]
impl RemoteDataPort for HttpRemote {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        // Writes are not idempotent; a replayed POST would turn into a spurious conflict.
        let attempts = if method == Method::Get { self.retries } else { 1 };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.request_once(method, path, body.as_ref()).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let client_error = err
                        .downcast_ref::<RemoteFailure>()
                        .is_some_and(|f| (400..500).contains(&f.status));
                    if attempt >= attempts || client_error {
                        return Err(err);
                    }
                    let backoff = Duration::from_millis(250 << (attempt - 1).min(4));
                    tracing::warn!(attempt, ?backoff, %method, path, error = %err, "backend request failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::error::is_conflict;
    use axum::{
        extract::Path,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/api/watchlist",
                get(|| async { Json(json!({"stocks": [{"symbol": "AAPL"}]})) }).post(
                    |Json(body): Json<Value>| async move {
                        if body["symbol"] == "AAPL" {
                            (
                                StatusCode::BAD_REQUEST,
                                Json(json!({"detail": "Stock already in watchlist"})),
                            )
                        } else {
                            (StatusCode::OK, Json(json!({"message": "added"})))
                        }
                    },
                ),
            )
            .route(
                "/api/stocks/:symbol",
                get(|Path(symbol): Path<String>| async move {
                    Json(json!({"symbol": symbol, "price": 1.0}))
                }),
            )
            .route("/api/echo", post(|Json(body): Json<Value>| async move { Json(body) }))
    }

    #[tokio::test]
    async fn decodes_json_bodies() {
        let base = serve(app()).await;
        let remote = HttpRemote::new(&format!("{base}/"), Duration::from_secs(5), 1).unwrap();

        let v = remote
            .request(Method::Get, "/api/watchlist", None)
            .await
            .unwrap();
        assert_eq!(v["stocks"][0]["symbol"], "AAPL");

        let v = remote
            .request(Method::Post, "/api/echo", Some(json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(v, json!({"a": 1}));
    }

    #[tokio::test]
    async fn maps_non_success_status_to_remote_failure() {
        let base = serve(app()).await;
        let remote = HttpRemote::new(&base, Duration::from_secs(5), 3).unwrap();

        let err = remote
            .request(Method::Post, "/api/watchlist", Some(json!({"symbol": "AAPL"})))
            .await
            .unwrap_err();
        assert!(is_conflict(&err));

        let err = remote
            .request(Method::Get, "/api/nope", None)
            .await
            .unwrap_err();
        let failure = err.downcast_ref::<RemoteFailure>().unwrap();
        assert!(failure.is_not_found());
    }

    #[test]
    fn rejects_empty_base_url() {
        assert!(HttpRemote::new("  ", Duration::from_secs(1), 1).is_err());
    }
}
