pub mod chat;
pub mod instrument;
pub mod period;

pub use chat::{ChatMessage, Role};
pub use instrument::{
    normalize_symbol, same_symbol, HistoryPoint, IndexEntry, Instrument, SearchResult,
    WatchlistEntry,
};
pub use period::Period;
