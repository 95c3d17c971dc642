//! Candidate-evaluation pipeline: four inference stages driven by an orchestrator.
//!
//! extraction → analysis → scoring → recommendation
//!
//! Each stage reads the shared `AgentContext`, calls the injected
//! `InferenceBackend` once, and returns an `AgentResult`. The orchestrator owns the
//! context, commits successful results into it, and decides the next state from the
//! `PipelinePolicy` (fixed or adaptive).

pub mod analysis;
pub mod context;
pub mod extraction;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod recommendation;
pub mod scoring;
pub mod stage;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::AgentContext;
pub use orchestrator::{
    ExecutionMode, Orchestrator, PipelineOutcome, PipelinePolicy, PipelineState, StageSet,
};
pub use progress::TracingProgress;
pub use stage::{StageKind, StageSettings};
