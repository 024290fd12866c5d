//! The execution engine behind a run.
//!
//! An [`Engine`] receives the whole ordered step list in one call and either
//! returns the last step's output or a fault. How it sequences steps, talks
//! to a model or invokes lookup providers is its own business; this crate
//! only relies on the call/return/fault contract below.
//!
//! ```text
//! runner ──▶ Engine::execute(EngineRequest) ──▶ Ok(EngineOutput)
//!                                           └─▶ Err(EngineError)
//! ```
//!
//! [`LlmEngine`] is the default implementation. Tests and embedders can plug
//! in anything else through [`crate::NavigatorConfig::engine`].

pub mod llm;
pub mod postprocess;
pub mod toolbox;

pub use llm::LlmEngine;
pub use toolbox::{Capability, Toolbox};

use crate::pipeline::steps::StepDefinition;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The single unit of work submitted to an engine.
#[derive(Clone, Copy)]
pub struct EngineRequest<'a> {
    /// Steps to execute, strictly in this order.
    pub steps: &'a [StepDefinition],
    /// Capability handles shared by every step of the run.
    pub toolbox: &'a Toolbox,
    /// The stored source document, when the run started from a path.
    pub document_path: Option<&'a Path>,
    pub progress: Option<&'a ProgressCallback>,
}

/// What one step produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutput {
    pub name: String,
    pub output: String,
    /// Where the step's report was written, if anywhere.
    pub saved_to: Option<PathBuf>,
    /// Auxiliary files the step wrote besides its report.
    pub files: Vec<PathBuf>,
}

/// Successful result of [`Engine::execute`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOutput {
    /// The last step's output.
    pub final_output: String,
    pub step_outputs: Vec<StepOutput>,
    /// Every file the engine wrote during the run, in write order.
    pub artifacts: Vec<PathBuf>,
}

/// A fault raised by an engine. Aborts the run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A step failed and was not recovered; later steps did not run.
    #[error("step '{step}' failed: {detail}")]
    StepFailed { step: String, detail: String },

    /// The engine has no usable model backend.
    #[error("LLM provider '{provider}' is not configured: {hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Persisting a step output failed.
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request itself cannot be executed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// The opaque collaborator that executes a run's steps.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Execute every step in order, stopping at the first unrecoverable fault.
    async fn execute(&self, request: EngineRequest<'_>) -> Result<EngineOutput, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failed_names_the_step() {
        let e = EngineError::StepFailed {
            step: "dataset_discovery".into(),
            detail: "rate limited".into(),
        };
        assert_eq!(e.to_string(), "step 'dataset_discovery' failed: rate limited");
    }

    #[test]
    fn engine_output_defaults_to_empty() {
        let out = EngineOutput::default();
        assert!(out.final_output.is_empty());
        assert!(out.artifacts.is_empty());
    }
}
