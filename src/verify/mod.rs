//! The verification flow: session state, step runners, and the coordinator
//! that strings them together.

pub mod coordinator;
pub mod reset;
pub mod session;
pub mod steps;
pub mod summary;

pub use coordinator::VerificationFlow;
pub use session::{FieldAnswer, MemberProfile, Session, StepRecord, StepStatus};
pub use steps::{ChoiceStep, FormStep, FreeTextStep, StepEnv, StepOutcome};
