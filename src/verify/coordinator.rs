//! Workflow coordinator — the fixed verification sequence for one session.

use std::sync::Arc;

use crate::catalog::OptionCatalog;
use crate::config::WardenConfig;
use crate::correlation::CorrelationRegistry;
use crate::error::PlatformError;
use crate::platform::gateway::Gateway;
use crate::verify::reset;
use crate::verify::session::{FieldAnswer, Session, StepStatus};
use crate::verify::steps::{ChoiceStep, FormStep, FreeTextStep, StepEnv, StepOutcome};
use crate::verify::summary;

const NAME_FORM_TITLE: &str = "Enter Your Full Name";
const NAME_FIELD_LABEL: &str = "Full Name";
const FINAL_CONFIRMATION: &str = "✅ All steps are complete! You will be verified once an admin \
                                  reviews and approves your information.";

/// Runs the whole verification sequence for one user.
///
/// Order: membership reset, name form, free-text questions, one selection
/// stage per category (roles applied immediately), the pending-review
/// grant, the shared summary, the final confirmation. Every stage contains
/// its own failures; the only early exit is the session being superseded
/// by a fresh run for the same user.
pub struct VerificationFlow {
    gateway: Arc<dyn Gateway>,
    registry: Arc<CorrelationRegistry>,
    config: Arc<WardenConfig>,
}

impl VerificationFlow {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        registry: Arc<CorrelationRegistry>,
        config: Arc<WardenConfig>,
    ) -> Self {
        Self {
            gateway,
            registry,
            config,
        }
    }

    /// Execute the sequence. Returns the finished session record.
    pub async fn run(&self, user: &str, context: &str) -> Session {
        let mut session = Session::new(user, context);
        tracing::info!(
            user = %user,
            context = %context,
            session = %session.id,
            "Verification started"
        );
        let env = StepEnv {
            gateway: self.gateway.as_ref(),
            registry: &self.registry,
            user,
            context,
        };

        // Clean slate, so the grants below are the whole story.
        reset::clear_memberships(env.gateway, user, &self.config.default_role).await;
        session.record("reset", StepStatus::Completed);

        let form = FormStep {
            title: NAME_FORM_TITLE,
            field_label: NAME_FIELD_LABEL,
        };
        match form.run(&env).await {
            StepOutcome::Completed(name) => {
                if !name.is_empty() {
                    session.profile.display_name = Some(name);
                }
                session.record("name", StepStatus::Completed);
            }
            StepOutcome::TimedOut => session.record("name", StepStatus::TimedOut),
            StepOutcome::Denied => session.record("name", StepStatus::PermissionDenied),
            StepOutcome::Cancelled => return self.superseded(session),
        }

        for question in &self.config.questions {
            let step = FreeTextStep {
                question,
                timeout: self.config.free_text_timeout,
            };
            let (status, text) = match step.run(&env).await {
                StepOutcome::Completed(text) => (StepStatus::Completed, text),
                StepOutcome::TimedOut => (StepStatus::TimedOut, String::new()),
                StepOutcome::Denied => (StepStatus::PermissionDenied, String::new()),
                StepOutcome::Cancelled => return self.superseded(session),
            };
            session.profile.answers.push(FieldAnswer {
                key: question.key.clone(),
                label: question.label.clone(),
                text,
            });
            session.record(&question.key, status);
        }

        for catalog in &self.config.catalogs {
            let step = ChoiceStep { catalog };
            match step.run(&env).await {
                StepOutcome::Completed(values) => {
                    self.apply_selection(&env, catalog, &values).await;
                    session
                        .profile
                        .selections
                        .push((catalog.category.clone(), values));
                    session.record(&catalog.category, StepStatus::Completed);
                }
                StepOutcome::TimedOut => session.record(&catalog.category, StepStatus::TimedOut),
                StepOutcome::Denied => {
                    session.record(&catalog.category, StepStatus::PermissionDenied)
                }
                StepOutcome::Cancelled => return self.superseded(session),
            }
        }

        let pending_status = self.grant_pending_role(&env).await;
        session.record("pending_role", pending_status);

        let summary_status = self.post_summary(&env, &session).await;
        session.record("summary", summary_status);

        if let Err(e) = env.gateway.send_notice(user, context, FINAL_CONFIRMATION).await {
            tracing::warn!(user = %user, error = %e, "Confirmation not delivered");
        }
        session.record("confirmation", StepStatus::Completed);

        tracing::info!(
            user = %user,
            session = %session.id,
            stages = session.step_index(),
            "Verification complete"
        );
        session
    }

    /// Map selected ids through the catalog and grant each resulting role.
    ///
    /// Unmapped ids already fell out at mapping time; a missing role or a
    /// refused grant costs only that one role.
    async fn apply_selection(&self, env: &StepEnv<'_>, catalog: &OptionCatalog, values: &[String]) {
        for role_name in catalog.roles_for(values) {
            match env.gateway.resolve_role(&role_name).await {
                Ok(role) => {
                    if let Err(e) = env.gateway.grant_role(env.user, &role).await {
                        tracing::warn!(
                            user = %env.user,
                            role = %role_name,
                            error = %e,
                            "Role not granted"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(role = %role_name, error = %e, "Selected role not resolved");
                }
            }
        }
    }

    /// The terminal "pending review" grant. A missing role is reported to
    /// the user and the flow keeps going.
    async fn grant_pending_role(&self, env: &StepEnv<'_>) -> StepStatus {
        let name = &self.config.pending_role;
        match env.gateway.resolve_role(name).await {
            Ok(role) => match env.gateway.grant_role(env.user, &role).await {
                Ok(()) => StepStatus::Completed,
                Err(e) => {
                    tracing::warn!(role = %name, error = %e, "Pending role not granted");
                    StepStatus::PermissionDenied
                }
            },
            Err(PlatformError::NotFound { .. }) => {
                let notice = format!("⚠️ {name} role not found.");
                let _ = env.gateway.send_notice(env.user, env.context, &notice).await;
                tracing::warn!(role = %name, "Pending role missing");
                StepStatus::Skipped
            }
            Err(e) => {
                tracing::warn!(role = %name, error = %e, "Pending role lookup failed");
                StepStatus::Skipped
            }
        }
    }

    /// Post the shared summary, if any descriptive field was captured.
    async fn post_summary(&self, env: &StepEnv<'_>, session: &Session) -> StepStatus {
        let Some(text) = summary::compose(&session.profile, env.user) else {
            tracing::debug!(user = %env.user, "No descriptive fields; summary skipped");
            return StepStatus::Skipped;
        };
        let channel_name = &self.config.summary_channel;
        match env.gateway.resolve_channel(channel_name).await {
            Ok(channel) => match env.gateway.post_message(&channel, &text).await {
                Ok(_) => StepStatus::Completed,
                Err(e) => {
                    tracing::warn!(channel = %channel_name, error = %e, "Summary not posted");
                    StepStatus::PermissionDenied
                }
            },
            Err(e) => {
                tracing::warn!(channel = %channel_name, error = %e, "Summary channel not resolved");
                StepStatus::Skipped
            }
        }
    }

    fn superseded(&self, session: Session) -> Session {
        tracing::info!(
            user = %session.user,
            session = %session.id,
            "Session superseded; stopping early"
        );
        session
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::platform::event::{EventStream, GatewayEvent};
    use crate::platform::gateway::{ChannelRef, FormSpec, MenuSpec, RoleRef};

    /// Scripted gateway: answers each prompt from a playbook by dispatching
    /// the matching event into the registry, and records every mutation.
    struct ScriptedGateway {
        registry: Arc<CorrelationRegistry>,
        form_reply: Option<String>,
        menu_replies: Mutex<VecDeque<Vec<String>>>,
        /// Replies keyed by the exact prompt text; unanswered prompts time out.
        message_replies: Mutex<HashMap<String, String>>,
        missing_roles: HashSet<String>,
        purge_on_form: bool,
        deny_menus: bool,
        granted: Mutex<Vec<String>>,
        removed: Mutex<Vec<String>>,
        initial_roles: Vec<String>,
        display_name: Mutex<Option<String>>,
        notices: Mutex<Vec<String>>,
        posted: Mutex<Vec<(String, String)>>,
        deleted: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn new(registry: Arc<CorrelationRegistry>) -> Self {
            Self {
                registry,
                form_reply: None,
                menu_replies: Mutex::new(VecDeque::new()),
                message_replies: Mutex::new(HashMap::new()),
                missing_roles: HashSet::new(),
                purge_on_form: false,
                deny_menus: false,
                granted: Mutex::new(Vec::new()),
                removed: Mutex::new(Vec::new()),
                initial_roles: Vec::new(),
                display_name: Mutex::new(None),
                notices: Mutex::new(Vec::new()),
                posted: Mutex::new(Vec::new()),
                deleted: Mutex::new(Vec::new()),
            }
        }

        fn script_menus(&self, replies: &[&[&str]]) {
            let mut queue = self.menu_replies.lock().unwrap();
            for reply in replies {
                queue.push_back(reply.iter().map(|v| v.to_string()).collect());
            }
        }

        fn answer_question(&self, prompt: &str, reply: &str) {
            self.message_replies
                .lock()
                .unwrap()
                .insert(prompt.to_string(), reply.to_string());
        }

        fn granted(&self) -> Vec<String> {
            self.granted.lock().unwrap().clone()
        }

        fn notices(&self) -> Vec<String> {
            self.notices.lock().unwrap().clone()
        }

        fn posted(&self) -> Vec<(String, String)> {
            self.posted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Gateway for ScriptedGateway {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn start(&self) -> Result<EventStream, PlatformError> {
            Ok(Box::pin(futures::stream::empty()))
        }

        async fn send_notice(
            &self,
            user: &str,
            context: &str,
            text: &str,
        ) -> Result<(), PlatformError> {
            self.notices.lock().unwrap().push(text.to_string());
            // Prompts with a scripted answer get a reply; everything else
            // (skip notices, the final confirmation) stays one-way.
            let reply = self.message_replies.lock().unwrap().remove(text);
            if let Some(reply) = reply {
                let count = self.notices.lock().unwrap().len();
                let event = GatewayEvent::MessagePosted {
                    user: user.to_string(),
                    context: context.to_string(),
                    message_id: format!("m-{count}"),
                    text: reply,
                };
                self.registry.dispatch(&event).await;
            }
            Ok(())
        }

        async fn open_form(
            &self,
            user: &str,
            context: &str,
            form: FormSpec,
        ) -> Result<(), PlatformError> {
            if self.purge_on_form {
                self.registry.purge_user(user).await;
                return Ok(());
            }
            if let Some(reply) = &self.form_reply {
                let mut fields = HashMap::new();
                fields.insert(form.fields[0].key.clone(), reply.clone());
                let event = GatewayEvent::FormSubmitted {
                    user: user.to_string(),
                    context: context.to_string(),
                    form_id: form.form_id.clone(),
                    fields,
                };
                self.registry.dispatch(&event).await;
            }
            Ok(())
        }

        async fn send_menu(
            &self,
            user: &str,
            context: &str,
            menu: MenuSpec,
        ) -> Result<(), PlatformError> {
            if self.deny_menus {
                return Err(PlatformError::PermissionDenied {
                    action: "send_menu".to_string(),
                    reason: "denied by test".to_string(),
                });
            }
            let reply = self.menu_replies.lock().unwrap().pop_front();
            if let Some(values) = reply {
                let event = GatewayEvent::SelectionSubmitted {
                    user: user.to_string(),
                    context: context.to_string(),
                    prompt_id: menu.prompt_id.clone(),
                    values,
                };
                self.registry.dispatch(&event).await;
            }
            Ok(())
        }

        async fn post_message(
            &self,
            channel: &ChannelRef,
            text: &str,
        ) -> Result<String, PlatformError> {
            self.posted
                .lock()
                .unwrap()
                .push((channel.name.clone(), text.to_string()));
            Ok("m-posted".to_string())
        }

        async fn delete_message(
            &self,
            _context: &str,
            message_id: &str,
        ) -> Result<(), PlatformError> {
            self.deleted.lock().unwrap().push(message_id.to_string());
            Ok(())
        }

        async fn send_direct(&self, _user: &str, _text: &str) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn member_roles(&self, _user: &str) -> Result<Vec<RoleRef>, PlatformError> {
            Ok(self
                .initial_roles
                .iter()
                .map(|n| RoleRef {
                    id: n.clone(),
                    name: n.clone(),
                })
                .collect())
        }

        async fn grant_role(&self, _user: &str, role: &RoleRef) -> Result<(), PlatformError> {
            self.granted.lock().unwrap().push(role.name.clone());
            Ok(())
        }

        async fn remove_role(&self, _user: &str, role: &RoleRef) -> Result<(), PlatformError> {
            self.removed.lock().unwrap().push(role.name.clone());
            Ok(())
        }

        async fn set_display_name(&self, _user: &str, name: &str) -> Result<(), PlatformError> {
            *self.display_name.lock().unwrap() = Some(name.to_string());
            Ok(())
        }

        async fn resolve_channel(&self, name: &str) -> Result<ChannelRef, PlatformError> {
            Ok(ChannelRef {
                id: name.to_string(),
                name: name.to_string(),
            })
        }

        async fn resolve_role(&self, name: &str) -> Result<RoleRef, PlatformError> {
            if self.missing_roles.contains(name) {
                return Err(PlatformError::NotFound {
                    entity: "role".to_string(),
                    name: name.to_string(),
                });
            }
            Ok(RoleRef {
                id: name.to_string(),
                name: name.to_string(),
            })
        }
    }

    fn test_config() -> Arc<WardenConfig> {
        Arc::new(WardenConfig {
            free_text_timeout: Duration::from_millis(20),
            ..WardenConfig::default()
        })
    }

    fn flow_with(gateway: Arc<ScriptedGateway>, config: Arc<WardenConfig>) -> VerificationFlow {
        let registry = Arc::clone(&gateway.registry);
        VerificationFlow::new(gateway, registry, config)
    }

    #[tokio::test]
    async fn full_run_with_skipped_questions_and_partial_selections() {
        let registry = Arc::new(CorrelationRegistry::new());
        let mut gateway = ScriptedGateway::new(Arc::clone(&registry));
        gateway.form_reply = Some("Jane Doe".to_string());
        gateway.initial_roles = vec!["@everyone".to_string(), "Old Role".to_string()];
        let gateway = Arc::new(gateway);
        // All five questions go unanswered; one location, two occupations,
        // nothing for majors and levels.
        gateway.script_menus(&[&["main"], &["student", "professional"], &[], &[]]);

        let flow = flow_with(Arc::clone(&gateway), test_config());
        let session = flow.run("u1", "c1").await;

        assert_eq!(
            gateway.display_name.lock().unwrap().as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(gateway.removed.lock().unwrap().as_slice(), ["Old Role"]);
        assert_eq!(
            gateway.granted(),
            vec!["Main Campus", "Student", "Professional", "Pending Verification"]
        );
        // Nothing captured, so nothing was posted.
        assert!(gateway.posted().is_empty());
        assert_eq!(
            gateway
                .notices()
                .iter()
                .filter(|n| n.contains("All steps are complete"))
                .count(),
            1
        );

        assert_eq!(session.status_of("name"), Some(StepStatus::Completed));
        assert_eq!(session.status_of("hobbies"), Some(StepStatus::TimedOut));
        assert_eq!(session.status_of("location"), Some(StepStatus::Completed));
        assert_eq!(session.status_of("summary"), Some(StepStatus::Skipped));
        assert_eq!(session.status_of("confirmation"), Some(StepStatus::Completed));
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn summary_contains_exactly_the_non_empty_fields() {
        let registry = Arc::new(CorrelationRegistry::new());
        let mut gateway = ScriptedGateway::new(Arc::clone(&registry));
        gateway.form_reply = Some("Jane Doe".to_string());
        let gateway = Arc::new(gateway);
        gateway.answer_question("What are your hobbies?", "chess");
        gateway.answer_question("Any achievements you are proud of?", "reading");
        gateway.answer_question("Leave a short greeting for the community!", "hi!");
        gateway.script_menus(&[&["online"], &[], &[], &[]]);

        let flow = flow_with(Arc::clone(&gateway), test_config());
        let session = flow.run("u1", "c1").await;

        let posted = gateway.posted();
        assert_eq!(posted.len(), 1);
        let (channel, text) = &posted[0];
        assert_eq!(channel, "introductions");
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("**Hobbies:** chess"));
        assert!(text.contains("**Achievements:** reading"));
        assert!(text.contains("**Greeting:** hi!"));
        assert!(!text.contains("Skills"));
        assert!(!text.contains("Social"));

        // Every captured answer was cleared from the channel.
        assert_eq!(gateway.deleted.lock().unwrap().len(), 3);
        assert_eq!(session.status_of("summary"), Some(StepStatus::Completed));
    }

    #[tokio::test]
    async fn missing_pending_role_is_reported_but_the_flow_finishes() {
        let registry = Arc::new(CorrelationRegistry::new());
        let mut gateway = ScriptedGateway::new(Arc::clone(&registry));
        gateway.form_reply = Some("Jane Doe".to_string());
        gateway
            .missing_roles
            .insert("Pending Verification".to_string());
        let gateway = Arc::new(gateway);
        gateway.answer_question("What are your hobbies?", "chess");
        gateway.script_menus(&[&["main"], &[], &[], &[]]);

        let flow = flow_with(Arc::clone(&gateway), test_config());
        let session = flow.run("u1", "c1").await;

        assert!(
            gateway
                .notices()
                .iter()
                .any(|n| n.contains("Pending Verification role not found"))
        );
        assert!(!gateway.granted().contains(&"Pending Verification".to_string()));
        // Later stages still ran.
        assert_eq!(session.status_of("pending_role"), Some(StepStatus::Skipped));
        assert_eq!(session.status_of("summary"), Some(StepStatus::Completed));
        assert_eq!(session.status_of("confirmation"), Some(StepStatus::Completed));
        assert!(
            gateway
                .notices()
                .iter()
                .any(|n| n.contains("All steps are complete"))
        );
    }

    #[tokio::test]
    async fn superseded_session_stops_without_confirmation() {
        let registry = Arc::new(CorrelationRegistry::new());
        let mut gateway = ScriptedGateway::new(Arc::clone(&registry));
        gateway.purge_on_form = true;
        let gateway = Arc::new(gateway);

        let flow = flow_with(Arc::clone(&gateway), test_config());
        let session = flow.run("u1", "c1").await;

        assert_eq!(session.status_of("reset"), Some(StepStatus::Completed));
        assert_eq!(session.status_of("confirmation"), None);
        assert!(
            !gateway
                .notices()
                .iter()
                .any(|n| n.contains("All steps are complete"))
        );
    }

    #[tokio::test]
    async fn denied_menus_grant_nothing_but_the_flow_finishes() {
        let registry = Arc::new(CorrelationRegistry::new());
        let mut gateway = ScriptedGateway::new(Arc::clone(&registry));
        gateway.form_reply = Some("Jane Doe".to_string());
        gateway.deny_menus = true;
        let gateway = Arc::new(gateway);
        gateway.answer_question("What are your hobbies?", "chess");

        let flow = flow_with(Arc::clone(&gateway), test_config());
        let session = flow.run("u1", "c1").await;

        assert_eq!(
            session.status_of("location"),
            Some(StepStatus::PermissionDenied)
        );
        assert_eq!(
            session.status_of("level"),
            Some(StepStatus::PermissionDenied)
        );
        assert!(session.profile.selections.is_empty());
        assert_eq!(gateway.granted(), vec!["Pending Verification"]);
        assert!(
            gateway
                .notices()
                .iter()
                .any(|n| n.contains("All steps are complete"))
        );
        // No refused menu left a waiter behind.
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn unmapped_selections_change_no_memberships() {
        let registry = Arc::new(CorrelationRegistry::new());
        let mut gateway = ScriptedGateway::new(Arc::clone(&registry));
        gateway.form_reply = Some("Jane Doe".to_string());
        let gateway = Arc::new(gateway);
        // "other" and "undecided" carry no role mapping.
        gateway.script_menus(&[&["other"], &[], &["undecided"], &[]]);

        let flow = flow_with(Arc::clone(&gateway), test_config());
        flow.run("u1", "c1").await;

        assert_eq!(gateway.granted(), vec!["Pending Verification"]);
    }
}
