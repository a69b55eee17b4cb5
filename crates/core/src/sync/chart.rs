use crate::domain::Period;
use crate::remote::{error::is_not_found, MarketApi};
use crate::sync::watchlist::{ChartTicket, WatchlistStore};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// A newer selection or period took over before this load finished; its data was dropped.
    Superseded,
    Failed,
    NoSelection,
}

/// Loads detail and history for the selected instrument. Responses are matched against the
/// store's current `(symbol, period)` on arrival, so out-of-order replies never overwrite newer
/// state.
pub struct ChartPeriodController {
    api: MarketApi,
    store: Arc<WatchlistStore>,
}

impl ChartPeriodController {
    pub fn new(api: MarketApi, store: Arc<WatchlistStore>) -> Self {
        Self { api, store }
    }

    pub async fn select_instrument(&self, symbol: &str) -> LoadOutcome {
        let ticket = self.store.select(symbol).await;

        let detail = match self.api.instrument(&ticket.symbol).await {
            Ok(detail) => detail,
            Err(err) => {
                if is_not_found(&err) {
                    tracing::info!(symbol = %ticket.symbol, "no such instrument");
                } else {
                    tracing::warn!(symbol = %ticket.symbol, error = %err, "instrument detail fetch failed");
                }
                return if self.store.fail_detail(&ticket).await {
                    LoadOutcome::Failed
                } else {
                    LoadOutcome::Superseded
                };
            }
        };

        if !self.store.apply_detail(&ticket, detail).await {
            tracing::debug!(symbol = %ticket.symbol, "discarding superseded instrument detail");
            return LoadOutcome::Superseded;
        }

        // A period switch during the detail fetch already started its own history load.
        if !self.store.history_is_current(&ticket).await {
            return LoadOutcome::Superseded;
        }

        self.load_history(ticket).await
    }

    pub async fn select_period(&self, period: Period) -> LoadOutcome {
        match self.store.set_period(period).await {
            Some(ticket) => self.load_history(ticket).await,
            None => LoadOutcome::NoSelection,
        }
    }

    pub async fn period(&self) -> Period {
        self.store.period().await
    }

    pub async fn is_loading(&self) -> bool {
        self.store.chart_loading().await
    }

    async fn load_history(&self, ticket: ChartTicket) -> LoadOutcome {
        let outcome = match self.api.history(&ticket.symbol, ticket.period).await {
            Ok(points) => {
                let len = points.len();
                if self.store.apply_history(&ticket, points).await {
                    tracing::debug!(symbol = %ticket.symbol, period = %ticket.period, points = len, "history applied");
                    LoadOutcome::Loaded
                } else {
                    tracing::debug!(symbol = %ticket.symbol, period = %ticket.period, "discarding superseded history");
                    LoadOutcome::Superseded
                }
            }
            Err(err) => {
                tracing::warn!(symbol = %ticket.symbol, period = %ticket.period, error = %err, "history fetch failed");
                return self.settle_failure(&ticket).await;
            }
        };
        self.store.finish_loading(&ticket).await;
        outcome
    }

    async fn settle_failure(&self, ticket: &ChartTicket) -> LoadOutcome {
        if self.store.history_is_current(ticket).await {
            self.store.finish_loading(ticket).await;
            LoadOutcome::Failed
        } else {
            LoadOutcome::Superseded
        }
    }
}
