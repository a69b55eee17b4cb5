use std::sync::atomic::{AtomicU64, Ordering};

/// Issues monotonically increasing tokens for one logical operation. A response is only applied
/// while its token is still the latest one issued.
#[derive(Debug, Default)]
pub struct RequestTokens {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(u64);

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Token {
        Token(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, token: Token) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }
}
