//! Supersession and cancellation of in-flight route requests
//!
//! Each session key (chosen by the client, e.g. one per UI panel) has at
//! most one current request. Starting a new request for the same key cancels
//! the previous one, and a superseded request can tell it is stale before
//! publishing its result. RAII cleanup via `RequestTicket`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

struct SessionEntry {
    generation: u64,
    token: CancellationToken,
}

/// Thread-safe registry of current requests per session key.
#[derive(Clone, Default)]
pub struct RequestTracker {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    next_generation: Arc<AtomicU64>,
}

/// Handle of one tracked request. Removes its entry on drop unless a newer
/// request has already taken the key.
pub struct RequestTicket {
    key: String,
    generation: u64,
    token: CancellationToken,
    tracker: RequestTracker,
}

impl RequestTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// False once the request was cancelled or superseded.
    pub fn is_current(&self) -> bool {
        !self.token.is_cancelled() && self.tracker.current_generation(&self.key) == Some(self.generation)
    }
}

impl Drop for RequestTicket {
    fn drop(&mut self) {
        let mut sessions = self.tracker.sessions.lock();
        if sessions
            .get(&self.key)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            sessions.remove(&self.key);
        }
    }
}

impl RequestTracker {
    /// Register a new request for `key`, cancelling whichever request held it.
    pub fn begin(&self, key: &str) -> RequestTicket {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();

        let previous = self.sessions.lock().insert(
            key.to_string(),
            SessionEntry {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(
                "Request generation {} for '{}' superseded by {}",
                previous.generation, key, generation
            );
            previous.token.cancel();
        }

        RequestTicket {
            key: key.to_string(),
            generation,
            token,
            tracker: self.clone(),
        }
    }

    /// Cancel the current request for `key`.
    ///
    /// Returns `false` when nothing is in flight for that key.
    pub fn cancel(&self, key: &str) -> bool {
        match self.sessions.lock().remove(key) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    fn current_generation(&self, key: &str) -> Option<u64> {
        self.sessions.lock().get(key).map(|entry| entry.generation)
    }

    #[cfg(test)]
    fn contains(&self, key: &str) -> bool {
        self.sessions.lock().contains_key(key)
    }
}
