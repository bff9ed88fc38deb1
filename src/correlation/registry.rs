//! Correlation registry — routes inbound events to pending waiters.
//!
//! The one structure shared across concurrent sessions. Registration and
//! dispatch on disjoint keys never conflict; the map is guarded by a single
//! async mutex since every touch is a short insert/remove.

use std::collections::HashMap;

use tokio::sync::{Mutex, oneshot};

use crate::correlation::key::CorrelationKey;
use crate::error::RegistryError;
use crate::platform::event::{GatewayEvent, ResponsePayload};

/// Maps live correlation keys to the sender half of their waiters.
pub struct CorrelationRegistry {
    waiters: Mutex<HashMap<CorrelationKey, oneshot::Sender<ResponsePayload>>>,
}

impl CorrelationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Register a waiter under a key.
    ///
    /// A live entry under the same key is an invariant violation (sessions
    /// are serialized per user): the new registration is rejected and the
    /// existing waiter stays untouched.
    pub async fn register(
        &self,
        key: CorrelationKey,
        sender: oneshot::Sender<ResponsePayload>,
    ) -> Result<(), RegistryError> {
        let mut waiters = self.waiters.lock().await;
        if waiters.contains_key(&key) {
            tracing::warn!(key = %key, "Rejected waiter registration: key already live");
            return Err(RegistryError::DuplicateKey { key });
        }
        tracing::debug!(key = %key, "Registered waiter");
        waiters.insert(key, sender);
        Ok(())
    }

    /// Remove a key. Returns whether an entry was present.
    pub async fn remove(&self, key: &CorrelationKey) -> bool {
        self.waiters.lock().await.remove(key).is_some()
    }

    /// Route an event to its waiter, if one is pending.
    ///
    /// The entry is taken out of the map before the payload is sent, so a
    /// key resolves at most once; an event with no matching waiter (late,
    /// duplicate, or simply unsolicited) is dropped without error.
    pub async fn dispatch(&self, event: &GatewayEvent) -> bool {
        let Some((key, payload)) = event.correlation() else {
            return false;
        };
        let sender = self.waiters.lock().await.remove(&key);
        match sender {
            Some(sender) => {
                // Send can only fail if the waiter was dropped; the entry is
                // gone either way.
                let delivered = sender.send(payload).is_ok();
                tracing::debug!(key = %key, delivered, "Dispatched event to waiter");
                delivered
            }
            None => {
                tracing::debug!(key = %key, kind = event.kind(), "No waiter for event");
                false
            }
        }
    }

    /// Drop every live entry belonging to a user. Returns how many were
    /// removed. Used when a user restarts verification so entries from the
    /// superseded session cannot claim fresh events.
    pub async fn purge_user(&self, user: &str) -> usize {
        let mut waiters = self.waiters.lock().await;
        let before = waiters.len();
        waiters.retain(|key, _| key.user != user);
        let purged = before - waiters.len();
        if purged > 0 {
            tracing::debug!(user = %user, purged, "Purged stale waiters");
        }
        purged
    }

    /// Number of live entries.
    pub fn count(&self) -> usize {
        self.waiters.try_lock().map(|w| w.len()).unwrap_or(0)
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
