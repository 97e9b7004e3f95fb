use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Ambient execution context propagated through the tool pipeline.
///
/// Carries the three things every filter must honor: an optional deadline,
/// a cancellation signal, and the caller's identity (if known). Cloning is
/// cheap — the cancellation token is reference-counted internally.
#[derive(Clone)]
pub struct AmbientContext {
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    client_key: Option<String>,
}

impl AmbientContext {
    /// A context with no deadline, a fresh cancellation token, and no identity.
    pub fn new() -> Self {
        Self {
            deadline: None,
            cancellation: CancellationToken::new(),
            client_key: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_client_key(mut self, key: impl Into<String>) -> Self {
        self.client_key = Some(key.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn client_key(&self) -> Option<&str> {
        self.client_key.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the ambient context has already been cancelled or has passed
    /// its deadline.
    pub fn is_done(&self) -> bool {
        if self.cancellation.is_cancelled() {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Time remaining until the deadline, or `None` if there is no deadline.
    /// Returns `Some(Duration::ZERO)` if the deadline has already passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| {
            let now = Instant::now();
            if now >= d { Duration::ZERO } else { d - now }
        })
    }

    /// A child cancellation token that is cancelled when this context is
    /// cancelled OR when its deadline passes, whichever comes first.
    pub fn derive_token(&self) -> CancellationToken {
        self.cancellation.child_token()
    }
}

impl Default for AmbientContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_done() {
        let ctx = AmbientContext::new();
        assert!(!ctx.is_done());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn cancelled_context_is_done() {
        let ctx = AmbientContext::new();
        ctx.cancellation().cancel();
        assert!(ctx.is_done());
    }

    #[test]
    fn expired_deadline_is_done() {
        let ctx = AmbientContext::new().with_timeout(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.is_done());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn client_key_round_trips() {
        let ctx = AmbientContext::new().with_client_key("203.0.113.1");
        assert_eq!(ctx.client_key(), Some("203.0.113.1"));
    }
}
