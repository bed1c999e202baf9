//! Session capabilities the controller borrows from its host.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    RwLock,
};

use tracing::warn;

/// Access to the bearer token and the global sign-out hook.
///
/// `on_unauthorized` is invoked synchronously from the error path of any
/// request answered with 401; tearing the session down and sending the user
/// back to the sign-in boundary is up to the implementor.
pub trait SessionContext: Send + Sync {
    fn token(&self) -> Option<String>;
    fn on_unauthorized(&self);
}

/// Session without credentials, for services that do not check tokens.
pub struct AnonymousSession;

impl SessionContext for AnonymousSession {
    fn token(&self) -> Option<String> {
        None
    }

    fn on_unauthorized(&self) {}
}

/// Token held in memory and dropped when the service rejects it.
#[derive(Default)]
pub struct InMemorySession {
    token: RwLock<Option<String>>,
    teardowns: AtomicU64,
}

impl InMemorySession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
            teardowns: AtomicU64::new(0),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// How many times the service has invalidated this session.
    pub fn teardown_count(&self) -> u64 {
        self.teardowns.load(Ordering::SeqCst)
    }
}

impl SessionContext for InMemorySession {
    fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn on_unauthorized(&self) {
        warn!("session: server rejected credentials, clearing token");
        self.set_token(None);
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}
