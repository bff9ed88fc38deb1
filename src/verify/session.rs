//! Session state for one verification run.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Where a step stands.
///
/// Interactive steps progress Prompting → Waiting → {Completed | TimedOut |
/// PermissionDenied}; a refused prompt render jumps straight from Prompting
/// to PermissionDenied. `Skipped` is recorded for whole stages that never
/// ran (a missing named resource, or nothing to do), never by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Prompting,
    Waiting,
    Completed,
    TimedOut,
    PermissionDenied,
    Skipped,
}

impl StepStatus {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, target),
            (Prompting, Waiting)
                | (Prompting, PermissionDenied)
                | (Waiting, Completed)
                | (Waiting, TimedOut)
                | (Waiting, PermissionDenied)
        )
    }

    /// Whether this status ends a step or stage.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::TimedOut | Self::PermissionDenied | Self::Skipped
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Prompting => "prompting",
            Self::Waiting => "waiting",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::PermissionDenied => "permission_denied",
            Self::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// How one stage of a session ended.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: String,
    pub status: StepStatus,
    pub recorded_at: DateTime<Utc>,
}

/// One captured free-text answer.
#[derive(Debug, Clone)]
pub struct FieldAnswer {
    pub key: String,
    pub label: String,
    /// Trimmed answer text; empty when the step timed out or was skipped.
    pub text: String,
}

/// Everything collected over one run, consumed at summary time.
#[derive(Debug, Clone, Default)]
pub struct MemberProfile {
    pub display_name: Option<String>,
    pub answers: Vec<FieldAnswer>,
    /// Selected option ids per category, in stage order.
    pub selections: Vec<(String, Vec<String>)>,
}

impl MemberProfile {
    /// Whether at least one descriptive field was captured non-empty.
    pub fn has_details(&self) -> bool {
        self.answers.iter().any(|a| !a.text.is_empty())
    }
}

/// One user's run through the verification workflow.
///
/// Owned exclusively by its coordinator; never shared across users and
/// never persisted.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub user: String,
    pub context: String,
    pub started_at: DateTime<Utc>,
    pub records: Vec<StepRecord>,
    pub profile: MemberProfile,
}

impl Session {
    pub fn new(user: &str, context: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.to_string(),
            context: context.to_string(),
            started_at: Utc::now(),
            records: Vec::new(),
            profile: MemberProfile::default(),
        }
    }

    /// Record how a stage ended.
    pub fn record(&mut self, step: &str, status: StepStatus) {
        if !status.is_terminal() {
            tracing::warn!(step = %step, status = %status, "Recording a non-terminal step status");
        }
        self.records.push(StepRecord {
            step: step.to_string(),
            status,
            recorded_at: Utc::now(),
        });
    }

    /// Index of the next stage (stages recorded so far).
    pub fn step_index(&self) -> usize {
        self.records.len()
    }

    /// Terminal status of a recorded stage, if it ran.
    pub fn status_of(&self, step: &str) -> Option<StepStatus> {
        self.records
            .iter()
            .find(|r| r.step == step)
            .map(|r| r.status)
    }
}
