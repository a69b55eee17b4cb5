use crate::domain::{normalize_symbol, same_symbol, HistoryPoint, Instrument, Period, WatchlistEntry};
use tokio::sync::{watch, Mutex};

/// The currently selected instrument with whatever detail and history have arrived for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub symbol: String,
    pub detail: Option<Instrument>,
    pub history: Vec<HistoryPoint>,
}

/// Identifies one chart load. Results are applied only while the ticket is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartTicket {
    pub symbol: String,
    pub period: Period,
    selection_epoch: u64,
    history_epoch: u64,
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<WatchlistEntry>,
    selection: Option<Selection>,
    period: Period,
    // Bumped when the selected instrument changes or clears.
    selection_epoch: u64,
    // Bumped on every change of the (symbol, period) pair.
    history_epoch: u64,
    // The chart reads as loading while either fetch is outstanding.
    detail_pending: bool,
    history_pending: bool,
}

impl State {
    fn selection_current(&self, ticket: &ChartTicket) -> bool {
        self.selection_epoch == ticket.selection_epoch
            && self
                .selection
                .as_ref()
                .is_some_and(|s| s.symbol == ticket.symbol)
    }

    fn history_current(&self, ticket: &ChartTicket) -> bool {
        self.selection_current(ticket)
            && self.history_epoch == ticket.history_epoch
            && self.period == ticket.period
    }

    fn ticket(&self, symbol: &str) -> ChartTicket {
        ChartTicket {
            symbol: symbol.to_string(),
            period: self.period,
            selection_epoch: self.selection_epoch,
            history_epoch: self.history_epoch,
        }
    }

    fn clear_selection(&mut self) {
        self.selection = None;
        self.selection_epoch += 1;
        self.history_epoch += 1;
        self.detail_pending = false;
        self.history_pending = false;
    }

    fn chart_loading(&self) -> bool {
        self.detail_pending || self.history_pending
    }

    fn upsert_detail(&mut self, instrument: Instrument) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| same_symbol(&e.symbol, &instrument.symbol))
        {
            entry.merge_from(&instrument);
        }
        if let Some(sel) = self
            .selection
            .as_mut()
            .filter(|s| same_symbol(&s.symbol, &instrument.symbol))
        {
            match sel.detail.as_mut() {
                Some(detail) => detail.merge_from(&instrument),
                None => sel.detail = Some(instrument),
            }
        }
    }
}

/// Watchlist plus selected-instrument state. Every mutation goes through the methods here so
/// poll merges and mutation reloads never race on raw fields.
#[derive(Debug)]
pub struct WatchlistStore {
    state: Mutex<State>,
    count: watch::Sender<usize>,
}

impl Default for WatchlistStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchlistStore {
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            state: Mutex::new(State::default()),
            count,
        }
    }

    /// Fires whenever the number of tracked symbols changes.
    pub fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }

    /// Replaces the list wholesale. Symbols are normalised and the first occurrence of a
    /// duplicate wins.
    pub async fn replace_all(&self, entries: Vec<WatchlistEntry>) {
        let mut state = self.state.lock().await;
        let mut out: Vec<WatchlistEntry> = Vec::with_capacity(entries.len());
        for mut entry in entries {
            entry.symbol = normalize_symbol(&entry.symbol);
            if entry.symbol.is_empty() || out.iter().any(|e| e.symbol == entry.symbol) {
                tracing::debug!(symbol = %entry.symbol, "dropping duplicate or empty watchlist entry");
                continue;
            }
            out.push(entry);
        }
        state.entries = out;
        self.publish_count(state.entries.len());
    }

    /// Merges partial quotes into matching entries. Unknown symbols are ignored; order and any
    /// field absent from an update are preserved. Returns how many entries were touched.
    pub async fn merge_updates(&self, updates: &[Instrument]) -> usize {
        let mut state = self.state.lock().await;
        let mut merged = 0;
        for update in updates {
            if let Some(entry) = state
                .entries
                .iter_mut()
                .find(|e| same_symbol(&e.symbol, &update.symbol))
            {
                entry.merge_quote(update);
                merged += 1;
            }
            if let Some(detail) = state
                .selection
                .as_mut()
                .and_then(|s| s.detail.as_mut())
                .filter(|d| same_symbol(&d.symbol, &update.symbol))
            {
                detail.merge_quote(update);
            }
        }
        merged
    }

    /// Stores a freshly fetched full record: refreshes the list row and, if the instrument is
    /// selected, its detail.
    pub async fn upsert_full_detail(&self, instrument: Instrument) {
        self.state.lock().await.upsert_detail(instrument);
    }

    /// Drops `symbol` from the list, clearing the selection if it pointed at it.
    pub async fn remove(&self, symbol: &str) -> bool {
        let mut state = self.state.lock().await;
        let before = state.entries.len();
        state.entries.retain(|e| !same_symbol(&e.symbol, symbol));
        let removed = state.entries.len() != before;

        if state
            .selection
            .as_ref()
            .is_some_and(|s| same_symbol(&s.symbol, symbol))
        {
            state.clear_selection();
        }

        self.publish_count(state.entries.len());
        removed
    }

    pub async fn entries(&self) -> Vec<WatchlistEntry> {
        self.state.lock().await.entries.clone()
    }

    pub async fn symbols(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .map(|e| e.symbol.clone())
            .collect()
    }

    pub async fn contains(&self, symbol: &str) -> bool {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .any(|e| same_symbol(&e.symbol, symbol))
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn selection(&self) -> Option<Selection> {
        self.state.lock().await.selection.clone()
    }

    pub async fn selected_symbol(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .selection
            .as_ref()
            .map(|s| s.symbol.clone())
    }

    pub async fn period(&self) -> Period {
        self.state.lock().await.period
    }

    pub async fn chart_loading(&self) -> bool {
        self.state.lock().await.chart_loading()
    }

    /// Starts a new selection and returns the ticket its loads must present.
    pub async fn select(&self, symbol: &str) -> ChartTicket {
        let symbol = normalize_symbol(symbol);
        let mut state = self.state.lock().await;
        state.selection = Some(Selection {
            symbol: symbol.clone(),
            detail: None,
            history: Vec::new(),
        });
        state.selection_epoch += 1;
        state.history_epoch += 1;
        state.detail_pending = true;
        state.history_pending = true;
        state.ticket(&symbol)
    }

    /// Switches the period. Returns a history ticket when an instrument is selected.
    pub async fn set_period(&self, period: Period) -> Option<ChartTicket> {
        let mut state = self.state.lock().await;
        state.period = period;
        state.history_epoch += 1;
        let symbol = {
            let sel = state.selection.as_mut()?;
            sel.history.clear();
            sel.symbol.clone()
        };
        state.history_pending = true;
        Some(state.ticket(&symbol))
    }

    pub async fn clear_selection(&self) {
        self.state.lock().await.clear_selection();
    }

    pub async fn apply_detail(&self, ticket: &ChartTicket, instrument: Instrument) -> bool {
        let mut state = self.state.lock().await;
        if !state.selection_current(ticket) || !same_symbol(&instrument.symbol, &ticket.symbol) {
            return false;
        }
        state.upsert_detail(instrument);
        state.detail_pending = false;
        true
    }

    /// Settles a failed detail fetch. History that `ticket` would have loaded is skipped, so
    /// its share of the loading flag goes too. Returns whether the selection is still current.
    pub async fn fail_detail(&self, ticket: &ChartTicket) -> bool {
        let mut state = self.state.lock().await;
        if !state.selection_current(ticket) {
            return false;
        }
        state.detail_pending = false;
        if state.history_current(ticket) {
            state.history_pending = false;
        }
        true
    }

    pub async fn apply_history(&self, ticket: &ChartTicket, points: Vec<HistoryPoint>) -> bool {
        let mut state = self.state.lock().await;
        if !state.history_current(ticket) {
            return false;
        }
        if let Some(sel) = state.selection.as_mut() {
            sel.history = points;
        }
        true
    }

    pub async fn history_is_current(&self, ticket: &ChartTicket) -> bool {
        self.state.lock().await.history_current(ticket)
    }

    /// Settles the history load `ticket` owns. The chart stays loading while a detail fetch
    /// for the same selection is outstanding.
    pub async fn finish_loading(&self, ticket: &ChartTicket) {
        let mut state = self.state.lock().await;
        if state.history_current(ticket) {
            state.history_pending = false;
        }
    }

    fn publish_count(&self, len: usize) {
        self.count.send_if_modified(|current| {
            if *current == len {
                return false;
            }
            *current = len;
            true
        });
    }
}
