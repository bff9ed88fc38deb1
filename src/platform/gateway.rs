//! The platform gateway trait — the narrow seam to the chat platform.
//!
//! Everything the verification flow needs from the platform goes through
//! this trait: rendering prompts, mutating roles and names, resolving named
//! channels/roles, and producing the inbound event stream. Every mutating
//! call may fail with [`PlatformError::PermissionDenied`] and every lookup
//! with [`PlatformError::NotFound`]; callers treat both as recoverable.

use async_trait::async_trait;

use crate::catalog::OptionCatalog;
use crate::error::PlatformError;
use crate::platform::event::EventStream;

/// A role as the platform addresses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub id: String,
    pub name: String,
}

/// A channel as the platform addresses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
}

/// One text input inside a form.
#[derive(Debug, Clone)]
pub struct FormField {
    /// Stable key the submission echoes back.
    pub key: String,
    pub label: String,
}

/// A structured input prompt.
///
/// `form_id` is generated by the caller before the form is rendered, so the
/// matching waiter can be registered with no window where a submission could
/// arrive unclaimed. The platform echoes it back in the submission event.
#[derive(Debug, Clone)]
pub struct FormSpec {
    pub form_id: String,
    pub title: String,
    pub fields: Vec<FormField>,
}

/// One selectable option, as rendered.
#[derive(Debug, Clone)]
pub struct MenuOption {
    pub value: String,
    pub label: String,
}

/// A bounded multi-select prompt. `prompt_id` works like [`FormSpec::form_id`].
#[derive(Debug, Clone)]
pub struct MenuSpec {
    pub prompt_id: String,
    pub title: String,
    pub options: Vec<MenuOption>,
    pub min_choices: usize,
    pub max_choices: usize,
}

impl MenuSpec {
    /// Build the rendered menu for a catalog. Target roles stay on our side
    /// of the seam; the platform only sees values and labels.
    pub fn from_catalog(prompt_id: impl Into<String>, catalog: &OptionCatalog) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            title: catalog.title.clone(),
            options: catalog
                .entries
                .iter()
                .map(|entry| MenuOption {
                    value: entry.value.clone(),
                    label: entry.label.clone(),
                })
                .collect(),
            min_choices: catalog.min_choices,
            max_choices: catalog.effective_max(),
        }
    }
}

/// Platform operations consumed by the verification flow.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Gateway name for logging.
    fn name(&self) -> &str;

    /// Start the gateway and return its event stream.
    async fn start(&self) -> Result<EventStream, PlatformError>;

    /// Send an addressee-only notice into the user's context.
    async fn send_notice(
        &self,
        user: &str,
        context: &str,
        text: &str,
    ) -> Result<(), PlatformError>;

    /// Render a structured input form for the user.
    async fn open_form(
        &self,
        user: &str,
        context: &str,
        form: FormSpec,
    ) -> Result<(), PlatformError>;

    /// Render a selection menu for the user.
    async fn send_menu(
        &self,
        user: &str,
        context: &str,
        menu: MenuSpec,
    ) -> Result<(), PlatformError>;

    /// Post a message to a channel; returns the new message id.
    async fn post_message(
        &self,
        channel: &ChannelRef,
        text: &str,
    ) -> Result<String, PlatformError>;

    /// Delete a message from a context.
    async fn delete_message(&self, context: &str, message_id: &str) -> Result<(), PlatformError>;

    /// Send a direct (private) message to a user.
    async fn send_direct(&self, user: &str, text: &str) -> Result<(), PlatformError>;

    /// Roles currently held by a user.
    async fn member_roles(&self, user: &str) -> Result<Vec<RoleRef>, PlatformError>;

    /// Grant a role to a user.
    async fn grant_role(&self, user: &str, role: &RoleRef) -> Result<(), PlatformError>;

    /// Remove a role from a user.
    async fn remove_role(&self, user: &str, role: &RoleRef) -> Result<(), PlatformError>;

    /// Update the user's visible display name.
    async fn set_display_name(&self, user: &str, name: &str) -> Result<(), PlatformError>;

    /// Resolve a channel by name.
    async fn resolve_channel(&self, name: &str) -> Result<ChannelRef, PlatformError>;

    /// Resolve a role by name.
    async fn resolve_role(&self, name: &str) -> Result<RoleRef, PlatformError>;
}
