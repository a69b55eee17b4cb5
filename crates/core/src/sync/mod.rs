pub mod chart;
pub mod chat;
pub mod debounce;
pub mod market;
pub mod mutation;
pub mod poll;
pub mod search;
pub mod token;
pub mod watchlist;

pub use chart::{ChartPeriodController, LoadOutcome};
pub use chat::ChatSession;
pub use debounce::Debouncer;
pub use market::{MarketBoard, MarketSnapshot};
pub use mutation::{AddOutcome, MutationController, RemoveOutcome};
pub use poll::PollScheduler;
pub use search::SearchController;
pub use watchlist::{Selection, WatchlistStore};
