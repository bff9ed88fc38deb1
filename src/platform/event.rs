//! Gateway event types — what the platform feeds into the service.

use std::collections::HashMap;
use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationKey;

/// Stream of events produced by a running gateway.
pub type EventStream = Pin<Box<dyn Stream<Item = GatewayEvent> + Send>>;

/// An inbound platform event.
///
/// Every variant carries the originating user id; response-bearing variants
/// also carry the context (channel) the interaction happened in and the
/// payload the submitting UI produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// The user invoked the verification command.
    VerifyRequested { user: String, context: String },
    /// A new member joined the guild/server.
    MemberJoined { user: String },
    /// A structured form was submitted.
    FormSubmitted {
        user: String,
        context: String,
        form_id: String,
        fields: HashMap<String, String>,
    },
    /// A selection menu was answered.
    SelectionSubmitted {
        user: String,
        context: String,
        prompt_id: String,
        values: Vec<String>,
    },
    /// A plain message was posted.
    MessagePosted {
        user: String,
        context: String,
        message_id: String,
        text: String,
    },
}

impl GatewayEvent {
    /// Short tag for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::VerifyRequested { .. } => "verify_requested",
            Self::MemberJoined { .. } => "member_joined",
            Self::FormSubmitted { .. } => "form_submitted",
            Self::SelectionSubmitted { .. } => "selection_submitted",
            Self::MessagePosted { .. } => "message_posted",
        }
    }

    /// The correlation key and payload for response-bearing events.
    ///
    /// `None` for events that can never resolve a waiting step.
    pub fn correlation(&self) -> Option<(CorrelationKey, ResponsePayload)> {
        match self {
            Self::FormSubmitted {
                user,
                context,
                form_id,
                fields,
            } => Some((
                CorrelationKey::for_prompt(user, context, form_id),
                ResponsePayload::Form {
                    fields: fields.clone(),
                },
            )),
            Self::SelectionSubmitted {
                user,
                context,
                prompt_id,
                values,
            } => Some((
                CorrelationKey::for_prompt(user, context, prompt_id),
                ResponsePayload::Selection {
                    values: values.clone(),
                },
            )),
            Self::MessagePosted {
                user,
                context,
                message_id,
                text,
            } => Some((
                CorrelationKey::for_message(user, context),
                ResponsePayload::Message {
                    message_id: message_id.clone(),
                    text: text.clone(),
                },
            )),
            Self::VerifyRequested { .. } | Self::MemberJoined { .. } => None,
        }
    }
}

/// What a resolved waiter receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    Form { fields: HashMap<String, String> },
    Selection { values: Vec<String> },
    Message { message_id: String, text: String },
}
