//! Stack convergence engine
//!
//! Decides create-vs-update for a named stack, classifies the provider's
//! immediate response, polls until a terminal status, and collects outputs.

pub mod converge;
pub mod outputs;
pub mod poller;

pub use converge::{build_tags, converge, derive_stack_name, ConvergenceOutcome, StackDescriptor};
pub use outputs::OutputCollector;
pub use poller::{CompletionPoller, PollPolicy};
