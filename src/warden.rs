//! Service loop — one event stream in, sessions and responses out.
//!
//! The warden owns the correlation registry and the gateway. Trigger events
//! spawn or restart verification sessions; response events are dispatched
//! into the registry, where the step that asked for them is waiting.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::WardenConfig;
use crate::correlation::CorrelationRegistry;
use crate::error::Error;
use crate::platform::event::GatewayEvent;
use crate::platform::gateway::Gateway;
use crate::verify::VerificationFlow;

/// The service: event loop plus per-user session bookkeeping.
pub struct Warden {
    config: Arc<WardenConfig>,
    gateway: Arc<dyn Gateway>,
    registry: Arc<CorrelationRegistry>,
    sessions: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Warden {
    pub fn new(config: WardenConfig, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
            registry: Arc::new(CorrelationRegistry::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Run the event loop until Ctrl+C or the stream ends.
    pub async fn run(self) -> Result<(), Error> {
        let mut events = self.gateway.start().await?;
        tracing::info!("Gatewarden ready, listening on {}", self.gateway.name());

        loop {
            let event = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                event = events.next() => {
                    match event {
                        Some(e) => e,
                        None => {
                            tracing::info!("Event stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            self.handle_event(event).await;
        }

        tracing::info!("Gatewarden shutting down...");
        let mut sessions = self.sessions.lock().await;
        for (user, handle) in sessions.drain() {
            if !handle.is_finished() {
                tracing::debug!(user = %user, "Aborting live verification session");
            }
            handle.abort();
        }

        Ok(())
    }

    async fn handle_event(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::VerifyRequested { user, context } => {
                self.start_session(&user, &context).await;
            }
            GatewayEvent::MemberJoined { user } => {
                self.welcome(&user).await;
            }
            response => {
                if !self.registry.dispatch(&response).await {
                    tracing::debug!(kind = response.kind(), "Response without a waiter dropped");
                }
            }
        }
    }

    /// Spawn a verification session, superseding any live one for the user.
    ///
    /// The old task is aborted and awaited before the purge, so nothing it
    /// registered can outlive it; the purge runs before the spawn, so the
    /// fresh session's waiters survive it.
    async fn start_session(&self, user: &str, context: &str) {
        let previous = self.sessions.lock().await.remove(user);
        if let Some(handle) = previous {
            if !handle.is_finished() {
                tracing::info!(user = %user, "Restarting verification, superseding active session");
            }
            handle.abort();
            // The abort lands at the task's next yield point; a task caught
            // mid-poll can still register a waiter until then.
            let _ = handle.await;
        }
        self.registry.purge_user(user).await;

        let flow = VerificationFlow::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.registry),
            Arc::clone(&self.config),
        );
        let user_owned = user.to_string();
        let context_owned = context.to_string();
        let handle = tokio::spawn(async move {
            flow.run(&user_owned, &context_owned).await;
        });
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, h| !h.is_finished());
        sessions.insert(user.to_string(), handle);
    }

    /// Greet a new member over DM and point them at the welcome channel.
    async fn welcome(&self, user: &str) {
        let channel = match self
            .gateway
            .resolve_channel(&self.config.welcome_channel)
            .await
        {
            Ok(channel) => channel,
            Err(e) => {
                tracing::debug!(
                    channel = %self.config.welcome_channel,
                    error = %e,
                    "Welcome channel not resolved, skipping greeting"
                );
                return;
            }
        };
        let text = format!(
            "👋 Welcome! Head over to #{} and run /verify to get started.",
            channel.name
        );
        if let Err(e) = self.gateway.send_direct(user, &text).await {
            tracing::info!(user = %user, error = %e, "Could not send a welcome DM");
        }
    }
}
