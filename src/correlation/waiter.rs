//! Response waiters — single-use sync points bridging events into steps.
//!
//! A step registers a waiter, triggers its prompt, then suspends on
//! [`ResponseWaiter::wait`]. The registry resolves the waiter when the
//! matching event arrives; a deadline or a cancellation resolves it instead
//! when the user never answers. Whichever way a waiter leaves the pending
//! state, its registry entry is gone afterwards: resolution removes it at
//! dispatch time, the timeout and cancel paths remove it here.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::correlation::key::CorrelationKey;
use crate::correlation::registry::CorrelationRegistry;
use crate::error::RegistryError;
use crate::platform::event::ResponsePayload;

/// How a wait ended.
#[derive(Debug)]
pub enum WaitOutcome {
    /// The matching event arrived.
    Resolved(ResponsePayload),
    /// The deadline elapsed first.
    TimedOut,
    /// The registry entry was withdrawn (cancelled or purged) before any
    /// event matched.
    Cancelled,
}

/// A pending wait for one correlated event.
pub struct ResponseWaiter {
    key: CorrelationKey,
    registry: Arc<CorrelationRegistry>,
    receiver: oneshot::Receiver<ResponsePayload>,
    deadline: Option<Duration>,
    created_at: DateTime<Utc>,
}

impl ResponseWaiter {
    /// Register a new waiter. `deadline` of `None` waits indefinitely.
    pub async fn create(
        registry: Arc<CorrelationRegistry>,
        key: CorrelationKey,
        deadline: Option<Duration>,
    ) -> Result<Self, RegistryError> {
        let (tx, rx) = oneshot::channel();
        registry.register(key.clone(), tx).await?;
        Ok(Self {
            key,
            registry,
            receiver: rx,
            deadline,
            created_at: Utc::now(),
        })
    }

    /// Suspend until the waiter is resolved, times out, or is cancelled.
    pub async fn wait(self) -> WaitOutcome {
        match self.deadline {
            Some(limit) => match tokio::time::timeout(limit, self.receiver).await {
                Ok(Ok(payload)) => WaitOutcome::Resolved(payload),
                Ok(Err(_)) => WaitOutcome::Cancelled,
                Err(_) => {
                    self.registry.remove(&self.key).await;
                    let waited = Utc::now() - self.created_at;
                    tracing::debug!(
                        key = %self.key,
                        waited_secs = waited.num_seconds(),
                        "Waiter timed out"
                    );
                    WaitOutcome::TimedOut
                }
            },
            None => match self.receiver.await {
                Ok(payload) => WaitOutcome::Resolved(payload),
                Err(_) => WaitOutcome::Cancelled,
            },
        }
    }

    /// Withdraw the waiter without consuming an event.
    pub async fn cancel(self) {
        self.registry.remove(&self.key).await;
        tracing::debug!(key = %self.key, "Waiter cancelled");
    }
}
