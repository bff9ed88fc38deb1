//! Event-to-step correlation: keys, the shared registry, and waiters.

pub mod key;
pub mod registry;
pub mod waiter;

pub use key::CorrelationKey;
pub use registry::CorrelationRegistry;
pub use waiter::{ResponseWaiter, WaitOutcome};
