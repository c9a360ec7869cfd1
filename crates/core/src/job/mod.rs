//! Per-job state, progress publication and spawned-process tracking.
//!
//! Everything in here is scoped to a single job token. The [`JobStore`] is
//! the one place job records live; it is owned by the job manager and
//! handed to the worker pool and finalizer as an `Arc`.

mod broker;
mod processes;
mod store;
mod token;
mod types;

pub use broker::{ProgressBroker, Subscription};
pub use processes::{KillSwitch, ProcessRegistry};
pub use store::{JobRecord, JobStore};
pub use token::{JobToken, TokenError};
pub use types::{JobState, JobStatus, StateUpdate};
