//! Console gateway — stdin/stdout adapter for running the flow locally.
//!
//! `/verify` starts verification, `/join` simulates a member joining and
//! `/quit` ends the stream. While a form or menu is open, the next typed
//! line answers it; any other line is delivered as a plain message. Role
//! and display-name mutations act on an in-memory member record so the
//! whole flow can be exercised end to end.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::error::PlatformError;
use crate::platform::event::{EventStream, GatewayEvent};
use crate::platform::gateway::{ChannelRef, FormSpec, Gateway, MenuSpec, RoleRef};

const CONSOLE_USER: &str = "local-user";
const CONSOLE_CONTEXT: &str = "console";

/// The prompt currently awaiting console input, if any.
enum PendingPrompt {
    Form {
        form_id: String,
        field_keys: Vec<String>,
    },
    Menu {
        prompt_id: String,
    },
}

/// In-memory stand-in for the platform's member record.
#[derive(Default)]
struct MemberState {
    display_name: Option<String>,
    roles: BTreeSet<String>,
}

pub struct ConsoleGateway {
    pending: Arc<Mutex<Option<PendingPrompt>>>,
    member: Mutex<MemberState>,
}

impl ConsoleGateway {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(None)),
            member: Mutex::new(MemberState::default()),
        }
    }

    fn set_pending(&self, prompt: PendingPrompt) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(prompt);
        }
    }
}

impl Default for ConsoleGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn one typed line into an event, honoring any open prompt.
fn event_for_line(pending: &Mutex<Option<PendingPrompt>>, line: &str) -> GatewayEvent {
    let taken = pending.lock().ok().and_then(|mut slot| slot.take());
    match taken {
        Some(PendingPrompt::Form {
            form_id,
            field_keys,
        }) => {
            // Single-field forms take the whole line as the answer.
            let mut fields = std::collections::HashMap::new();
            if let Some(key) = field_keys.first() {
                fields.insert(key.clone(), line.to_string());
            }
            GatewayEvent::FormSubmitted {
                user: CONSOLE_USER.to_string(),
                context: CONSOLE_CONTEXT.to_string(),
                form_id,
                fields,
            }
        }
        Some(PendingPrompt::Menu { prompt_id }) => {
            let values: Vec<String> = line
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            GatewayEvent::SelectionSubmitted {
                user: CONSOLE_USER.to_string(),
                context: CONSOLE_CONTEXT.to_string(),
                prompt_id,
                values,
            }
        }
        None => GatewayEvent::MessagePosted {
            user: CONSOLE_USER.to_string(),
            context: CONSOLE_CONTEXT.to_string(),
            message_id: Uuid::new_v4().to_string(),
            text: line.to_string(),
        },
    }
}

#[async_trait]
impl Gateway for ConsoleGateway {
    fn name(&self) -> &str {
        "console"
    }

    async fn start(&self) -> Result<EventStream, PlatformError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let pending = Arc::clone(&self.pending);

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let event = match line.as_str() {
                            "/quit" => break,
                            "/verify" => GatewayEvent::VerifyRequested {
                                user: CONSOLE_USER.to_string(),
                                context: CONSOLE_CONTEXT.to_string(),
                            },
                            "/join" => GatewayEvent::MemberJoined {
                                user: CONSOLE_USER.to_string(),
                            },
                            _ => event_for_line(&pending, &line),
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        tracing::info!("Console gateway started");
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn send_notice(
        &self,
        _user: &str,
        _context: &str,
        text: &str,
    ) -> Result<(), PlatformError> {
        println!("\n🔔 {}\n", text);
        eprint!("> ");
        Ok(())
    }

    async fn open_form(
        &self,
        _user: &str,
        _context: &str,
        form: FormSpec,
    ) -> Result<(), PlatformError> {
        println!("\n📝 {}", form.title);
        for field in &form.fields {
            println!("   {}:", field.label);
        }
        println!("   (type your answer and press Enter)\n");
        eprint!("> ");
        self.set_pending(PendingPrompt::Form {
            form_id: form.form_id,
            field_keys: form.fields.iter().map(|f| f.key.clone()).collect(),
        });
        Ok(())
    }

    async fn send_menu(
        &self,
        _user: &str,
        _context: &str,
        menu: MenuSpec,
    ) -> Result<(), PlatformError> {
        println!("\n📋 {}", menu.title);
        for option in &menu.options {
            println!("   {} — {}", option.value, option.label);
        }
        println!(
            "   (choose {}–{}, comma-separated values)\n",
            menu.min_choices, menu.max_choices
        );
        eprint!("> ");
        self.set_pending(PendingPrompt::Menu {
            prompt_id: menu.prompt_id,
        });
        Ok(())
    }

    async fn post_message(
        &self,
        channel: &ChannelRef,
        text: &str,
    ) -> Result<String, PlatformError> {
        println!("\n[#{}]\n{}\n", channel.name, text);
        eprint!("> ");
        Ok(Uuid::new_v4().to_string())
    }

    async fn delete_message(&self, _context: &str, message_id: &str) -> Result<(), PlatformError> {
        tracing::debug!(message_id = %message_id, "Console cannot unprint; delete is a no-op");
        Ok(())
    }

    async fn send_direct(&self, user: &str, text: &str) -> Result<(), PlatformError> {
        println!("\n📬 DM to {}:\n{}\n", user, text);
        eprint!("> ");
        Ok(())
    }

    async fn member_roles(&self, _user: &str) -> Result<Vec<RoleRef>, PlatformError> {
        let member = self.member.lock().map_err(|_| PlatformError::Unavailable {
            reason: "member state poisoned".to_string(),
        })?;
        Ok(member
            .roles
            .iter()
            .map(|name| RoleRef {
                id: name.clone(),
                name: name.clone(),
            })
            .collect())
    }

    async fn grant_role(&self, _user: &str, role: &RoleRef) -> Result<(), PlatformError> {
        if let Ok(mut member) = self.member.lock() {
            member.roles.insert(role.name.clone());
        }
        println!("   ➕ role granted: {}", role.name);
        Ok(())
    }

    async fn remove_role(&self, _user: &str, role: &RoleRef) -> Result<(), PlatformError> {
        if let Ok(mut member) = self.member.lock() {
            member.roles.remove(&role.name);
        }
        println!("   ➖ role removed: {}", role.name);
        Ok(())
    }

    async fn set_display_name(&self, _user: &str, name: &str) -> Result<(), PlatformError> {
        if let Ok(mut member) = self.member.lock() {
            member.display_name = Some(name.to_string());
        }
        println!("   ✏️ display name set to {}", name);
        Ok(())
    }

    async fn resolve_channel(&self, name: &str) -> Result<ChannelRef, PlatformError> {
        // Every named channel exists in the console world.
        Ok(ChannelRef {
            id: name.to_string(),
            name: name.to_string(),
        })
    }

    async fn resolve_role(&self, name: &str) -> Result<RoleRef, PlatformError> {
        Ok(RoleRef {
            id: name.to_string(),
            name: name.to_string(),
        })
    }
}
