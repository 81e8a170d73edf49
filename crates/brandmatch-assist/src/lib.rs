//! Per-campaign AI generation for recommended influencers.
//!
//! An [`Orchestrator`] owns the generation state of one campaign session:
//! one strategy and four insight tasks per influencer, each tracked under its
//! [`TaskKey`](brandmatch_core::TaskKey). Successful results are written
//! through to the [`ContentStore`](brandmatch_db::ContentStore).

pub mod error;
pub mod generate;
pub mod orchestrator;
pub mod state;

pub use error::{FailureKind, GenerationError};
pub use generate::{ensure_inputs, generate_for_task};
pub use orchestrator::{GenerationSummary, Orchestrator, TaskOutcome, DEFAULT_TASK_TIMEOUT};
pub use state::{TaskState, TaskUpdate};
