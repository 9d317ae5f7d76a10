//! Phase graph executor: the top-level driver of a query session.
//!
//! A session walks a validated phase DAG; each phase is handled by one of
//! three executors (language model, supervisor, agent coordination), with
//! conditional phases gated by a predicate over accumulated session state.
//! Progress streams over the event bus; terminal sessions are archived
//! after a retention window.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod graph;
pub mod phases;
pub mod session;

pub use config::{ExecutionMode, PhaseDescriptor, PipelineConfig};
pub use context::{ExecutorSettings, PipelineContext};
pub use error::{PipelineError, Result};
pub use executor::{AdvanceOutcome, PhaseGraphExecutor, SubmitQuery, SubmitReceipt};
pub use graph::PhaseGraph;
pub use session::{SessionOutputs, SessionState};
