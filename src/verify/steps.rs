//! Step runners — prompt, wait, capture.
//!
//! Every step follows the same skeleton: register a waiter under a fresh
//! correlation key, render the prompt, suspend on the waiter. Registering
//! before rendering means there is no window in which a fast response could
//! arrive unclaimed. A prompt that cannot be rendered withdraws its waiter
//! and reports `Denied`; the coordinator carries on either way.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::catalog::OptionCatalog;
use crate::config::FreeTextQuestion;
use crate::correlation::{CorrelationKey, CorrelationRegistry, ResponseWaiter, WaitOutcome};
use crate::error::PlatformError;
use crate::platform::event::ResponsePayload;
use crate::platform::gateway::{FormField, FormSpec, Gateway, MenuSpec};

const NAME_FIELD: &str = "full_name";

/// Collaborators shared by every step of one session.
pub struct StepEnv<'a> {
    pub gateway: &'a dyn Gateway,
    pub registry: &'a Arc<CorrelationRegistry>,
    pub user: &'a str,
    pub context: &'a str,
}

/// How a step ended, with its captured value.
#[derive(Debug, PartialEq)]
pub enum StepOutcome<T> {
    Completed(T),
    TimedOut,
    /// The prompt could not be rendered or the wait could not be registered.
    Denied,
    /// The session was superseded while waiting.
    Cancelled,
}

/// Structured name capture.
///
/// After the submission arrives, the captured value is applied as the
/// member's visible display name. A permission failure there is reported to
/// the user but the raw value is still returned: capture and application are
/// decoupled, so a strict platform never costs us the data.
pub struct FormStep<'a> {
    pub title: &'a str,
    pub field_label: &'a str,
}

impl FormStep<'_> {
    pub async fn run(&self, env: &StepEnv<'_>) -> StepOutcome<String> {
        let form_id = Uuid::new_v4().to_string();
        let key = CorrelationKey::for_prompt(env.user, env.context, &form_id);
        let waiter = match ResponseWaiter::create(Arc::clone(env.registry), key, None).await {
            Ok(waiter) => waiter,
            Err(e) => {
                tracing::error!(error = %e, "Could not register form waiter");
                return StepOutcome::Denied;
            }
        };

        let form = FormSpec {
            form_id,
            title: self.title.to_string(),
            fields: vec![FormField {
                key: NAME_FIELD.to_string(),
                label: self.field_label.to_string(),
            }],
        };
        if let Err(e) = env.gateway.open_form(env.user, env.context, form).await {
            tracing::warn!(user = %env.user, error = %e, "Form could not be rendered");
            waiter.cancel().await;
            return StepOutcome::Denied;
        }

        match waiter.wait().await {
            WaitOutcome::Resolved(ResponsePayload::Form { fields }) => {
                let value = fields
                    .get(NAME_FIELD)
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default();
                if value.is_empty() {
                    return StepOutcome::Completed(value);
                }
                if let Err(e) = env.gateway.set_display_name(env.user, &value).await {
                    if matches!(e, PlatformError::PermissionDenied { .. }) {
                        let _ = env
                            .gateway
                            .send_notice(
                                env.user,
                                env.context,
                                "Missing permission to change your nickname.",
                            )
                            .await;
                    }
                    tracing::warn!(user = %env.user, error = %e, "Display name not applied");
                }
                StepOutcome::Completed(value)
            }
            WaitOutcome::Resolved(other) => {
                tracing::warn!(payload = ?other, "Form waiter resolved with a non-form payload");
                StepOutcome::Denied
            }
            WaitOutcome::TimedOut => StepOutcome::TimedOut,
            WaitOutcome::Cancelled => StepOutcome::Cancelled,
        }
    }
}

/// Bounded multi-select over one option catalog.
///
/// Returns the selected option ids; mapping to roles is the caller's move.
/// The wait carries no deadline: the menu stays open until the user answers.
pub struct ChoiceStep<'a> {
    pub catalog: &'a OptionCatalog,
}

impl ChoiceStep<'_> {
    pub async fn run(&self, env: &StepEnv<'_>) -> StepOutcome<Vec<String>> {
        let prompt_id = Uuid::new_v4().to_string();
        let key = CorrelationKey::for_prompt(env.user, env.context, &prompt_id);
        let waiter = match ResponseWaiter::create(Arc::clone(env.registry), key, None).await {
            Ok(waiter) => waiter,
            Err(e) => {
                tracing::error!(error = %e, "Could not register menu waiter");
                return StepOutcome::Denied;
            }
        };

        let menu = MenuSpec::from_catalog(prompt_id, self.catalog);
        if let Err(e) = env.gateway.send_menu(env.user, env.context, menu).await {
            tracing::warn!(
                category = %self.catalog.category,
                error = %e,
                "Menu could not be rendered"
            );
            waiter.cancel().await;
            return StepOutcome::Denied;
        }

        match waiter.wait().await {
            WaitOutcome::Resolved(ResponsePayload::Selection { values }) => {
                StepOutcome::Completed(values)
            }
            WaitOutcome::Resolved(other) => {
                tracing::warn!(payload = ?other, "Menu waiter resolved with a non-menu payload");
                StepOutcome::Denied
            }
            WaitOutcome::TimedOut => StepOutcome::TimedOut,
            WaitOutcome::Cancelled => StepOutcome::Cancelled,
        }
    }
}

/// Free-text capture bounded by a deadline.
///
/// Waits for the next plain message from the same user in the same context.
/// The captured message is cleared from the channel best-effort and its
/// trimmed text returned. A miss is `TimedOut`, never an error.
pub struct FreeTextStep<'a> {
    pub question: &'a FreeTextQuestion,
    pub timeout: Duration,
}

impl FreeTextStep<'_> {
    pub async fn run(&self, env: &StepEnv<'_>) -> StepOutcome<String> {
        let key = CorrelationKey::for_message(env.user, env.context);
        let waiter =
            match ResponseWaiter::create(Arc::clone(env.registry), key, Some(self.timeout)).await {
                Ok(waiter) => waiter,
                Err(e) => {
                    tracing::error!(error = %e, "Could not register message waiter");
                    return StepOutcome::Denied;
                }
            };

        if let Err(e) = env
            .gateway
            .send_notice(env.user, env.context, &self.question.prompt)
            .await
        {
            tracing::warn!(
                question = %self.question.key,
                error = %e,
                "Question could not be sent"
            );
            waiter.cancel().await;
            return StepOutcome::Denied;
        }

        match waiter.wait().await {
            WaitOutcome::Resolved(ResponsePayload::Message { message_id, text }) => {
                if let Err(e) = env.gateway.delete_message(env.context, &message_id).await {
                    tracing::debug!(
                        message_id = %message_id,
                        error = %e,
                        "Captured message not deleted"
                    );
                }
                StepOutcome::Completed(text.trim().to_string())
            }
            WaitOutcome::Resolved(other) => {
                tracing::warn!(
                    payload = ?other,
                    "Message waiter resolved with a non-message payload"
                );
                StepOutcome::Denied
            }
            WaitOutcome::TimedOut => {
                let skip = format!(
                    "⏱️ No response received, skipping {}.",
                    self.question.label
                );
                let _ = env.gateway.send_notice(env.user, env.context, &skip).await;
                StepOutcome::TimedOut
            }
            WaitOutcome::Cancelled => StepOutcome::Cancelled,
        }
    }
}
