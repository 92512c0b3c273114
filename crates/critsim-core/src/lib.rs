//! Domain core: DAG construction, PERT sampling, single-trial execution,
//! running aggregation, and the parallel orchestrator tying them together.
//!
//! Downstream crates (`critsim-io`, `critsim-report`, `critsim-cli`) never
//! reach past this crate's public API into its internals.

pub mod aggregate;
pub mod dag;
pub mod orchestrate;
pub mod pert;
pub mod trial;

pub use aggregate::{CategoryStats, DurationStats, PriorityLevel, RiskLevel, Summary, TaskStats};
pub use dag::{Dag, DagError, Estimate, Task, TaskId, TaskRecord};
pub use orchestrate::{run, OrchestrateError, RunConfig, RunOutcome};
pub use pert::EstimationFamily;
pub use trial::{TrialError, TrialScratch};
