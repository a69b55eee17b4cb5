use crate::domain::ChatMessage;
use crate::remote::MarketApi;
use crate::sync::watchlist::WatchlistStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Conversation with the backend assistant. The session id is minted once and sent with every
/// message; the transcript only ever grows.
///
/// Sends are serialised: a message submitted while another exchange is in flight is queued, so
/// the transcript strictly alternates user and assistant entries.
pub struct ChatSession {
    api: MarketApi,
    store: Arc<WatchlistStore>,
    session_id: Uuid,
    transcript: Mutex<Vec<ChatMessage>>,
    draft: Mutex<String>,
    waiting: AtomicUsize,
    exchange: Mutex<()>,
}

impl ChatSession {
    pub fn new(api: MarketApi, store: Arc<WatchlistStore>) -> Self {
        Self {
            api,
            store,
            session_id: Uuid::new_v4(),
            transcript: Mutex::new(Vec::new()),
            draft: Mutex::new(String::new()),
            waiting: AtomicUsize::new(0),
            exchange: Mutex::new(()),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn set_draft(&self, text: &str) {
        *self.draft.lock().await = text.to_string();
    }

    pub async fn draft(&self) -> String {
        self.draft.lock().await.clone()
    }

    /// Sends whatever is in the input box.
    pub async fn submit(&self) -> Option<ChatMessage> {
        let text = self.draft().await;
        self.send(&text).await
    }

    /// Returns the assistant entry appended for this message, or `None` when `text` is blank.
    pub async fn send(&self, text: &str) -> Option<ChatMessage> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }

        self.draft.lock().await.clear();
        let _waiting = Waiting::enter(&self.waiting);

        let _turn = self.exchange.lock().await;
        self.transcript.lock().await.push(ChatMessage::user(message));

        let symbol = self.store.selected_symbol().await;
        let reply = match self
            .api
            .chat(message, self.session_id, symbol.as_deref())
            .await
        {
            Ok(content) => ChatMessage::assistant(content),
            Err(err) => {
                tracing::warn!(session_id = %self.session_id, error = %err, "chat request failed");
                ChatMessage::assistant(FALLBACK_REPLY)
            }
        };

        self.transcript.lock().await.push(reply.clone());
        Some(reply)
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::Acquire) > 0
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().await.clone()
    }
}

/// One outstanding send. Released on every exit path, including a dropped future.
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
