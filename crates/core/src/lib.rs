pub mod dashboard;
pub mod domain;
pub mod remote;
pub mod sync;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_HTTP_RETRIES: u32 = 1;
    const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
    const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
    const DEFAULT_MARKET_REFRESH_SECS: u64 = 60;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub http_timeout: Duration,
        pub http_retries: u32,
        pub sync: SyncOptions,
    }

    /// Timing knobs for the background and debounced work the core performs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SyncOptions {
        pub poll_interval: Duration,
        pub search_debounce: Duration,
        pub market_refresh: Duration,
    }

    impl Default for SyncOptions {
        fn default() -> Self {
            Self {
                poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
                search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
                market_refresh: Duration::from_secs(DEFAULT_MARKET_REFRESH_SECS),
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                api_url: std::env::var("STOCKDESK_API_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                http_timeout: Duration::from_secs(
                    env_parse("STOCKDESK_HTTP_TIMEOUT_SECS").unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
                ),
                http_retries: env_parse("STOCKDESK_HTTP_RETRIES")
                    .unwrap_or(DEFAULT_HTTP_RETRIES)
                    .max(1),
                sync: SyncOptions {
                    poll_interval: Duration::from_secs(
                        env_parse("STOCKDESK_POLL_INTERVAL_SECS")
                            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
                    ),
                    search_debounce: Duration::from_millis(
                        env_parse("STOCKDESK_SEARCH_DEBOUNCE_MS")
                            .unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS),
                    ),
                    market_refresh: Duration::from_secs(
                        env_parse("STOCKDESK_MARKET_REFRESH_SECS")
                            .unwrap_or(DEFAULT_MARKET_REFRESH_SECS),
                    ),
                },
            })
        }

        pub fn require_api_url(&self) -> anyhow::Result<&str> {
            self.api_url
                .as_deref()
                .context("STOCKDESK_API_URL is required")
        }
    }

    fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
    }

}
