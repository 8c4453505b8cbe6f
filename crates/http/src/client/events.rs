//! Session events raised by the client

use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 16;

/// Something the session layer needs to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Tokens are gone and could not be renewed
    LoginRequired,
    /// A refresh stored a new token pair
    TokensRefreshed,
}

/// Broadcast channel shared by all clones of an [`super::ApiClient`]
#[derive(Debug, Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }
}

impl AuthEvents {
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        // No receivers is fine: nobody is listening yet
        if self.sender.send(event).is_err() {
            debug!(?event, "Auth event dropped, no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let events = AuthEvents::default();
        let mut first = events.subscribe();
        let mut second = events.clone().subscribe();

        events.emit(AuthEvent::LoginRequired);

        assert_eq!(first.recv().await.unwrap(), AuthEvent::LoginRequired);
        assert_eq!(second.recv().await.unwrap(), AuthEvent::LoginRequired);
    }

    #[test]
    fn test_emit_without_subscribers() {
        AuthEvents::default().emit(AuthEvent::TokensRefreshed);
    }
}
