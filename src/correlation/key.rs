//! Correlation keys — which external event belongs to which waiting step.

/// Composite key identifying at most one pending waiter.
///
/// Prompt-bound interactions (forms, menus) carry the id the prompt was
/// created with; plain-message capture keys on user + context alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub user: String,
    pub context: String,
    pub prompt: Option<String>,
}

impl CorrelationKey {
    /// Key for a form or menu response identified by its prompt id.
    pub fn for_prompt(user: &str, context: &str, prompt_id: &str) -> Self {
        Self {
            user: user.to_string(),
            context: context.to_string(),
            prompt: Some(prompt_id.to_string()),
        }
    }

    /// Key for the next plain message from a user in a context.
    pub fn for_message(user: &str, context: &str) -> Self {
        Self {
            user: user.to_string(),
            context: context.to_string(),
            prompt: None,
        }
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prompt {
            Some(prompt) => write!(f, "{}/{}/{}", self.user, self.context, prompt),
            None => write!(f, "{}/{}/<message>", self.user, self.context),
        }
    }
}
