//! Sequential pipeline runner.
//!
//! Hands the whole ordered step list to the engine in one call and records
//! the outcome on a [`PipelineRun`]. The runner adds no retries, parallelism
//! or timeouts of its own; those belong to the engine.
//!
//! ```text
//! Pending ──start──▶ Running ──Ok──▶ Completed  (final_output set)
//!                            └─Err─▶ Failed     (error set, verbatim)
//! ```

use crate::engine::{Engine, EngineRequest, StepOutput, Toolbox};
use crate::pipeline::steps::StepDefinition;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// One execution of the step list against one document.
///
/// Only the runner mutates it. In a terminal state exactly one of
/// `final_output` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    steps: Vec<StepDefinition>,
    status: RunStatus,
    final_output: Option<String>,
    error: Option<String>,
    step_outputs: Vec<StepOutput>,
    artifacts: Vec<PathBuf>,
    duration_ms: u64,
}

impl PipelineRun {
    pub fn new(steps: Vec<StepDefinition>) -> Self {
        Self {
            steps,
            status: RunStatus::Pending,
            final_output: None,
            error: None,
            step_outputs: Vec::new(),
            artifacts: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn final_output(&self) -> Option<&str> {
        self.final_output.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Per-step outputs of a completed run; empty after a failure.
    pub fn step_outputs(&self) -> &[StepOutput] {
        &self.step_outputs
    }

    /// Files the engine reported writing. Empty after a failure.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    fn start(&mut self) {
        self.status = RunStatus::Running;
    }

    fn complete(&mut self, final_output: String, step_outputs: Vec<StepOutput>, artifacts: Vec<PathBuf>) {
        self.status = RunStatus::Completed;
        self.final_output = Some(final_output);
        self.error = None;
        self.step_outputs = step_outputs;
        self.artifacts = artifacts;
    }

    fn fail(&mut self, error: String) {
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.final_output = None;
        self.step_outputs.clear();
        self.artifacts.clear();
    }
}

/// Run `steps` through `engine` and return the terminal [`PipelineRun`].
///
/// Never returns an error: an engine fault becomes `status = Failed` with the
/// fault's text in `error`.
pub async fn run_pipeline(
    steps: Vec<StepDefinition>,
    engine: &dyn Engine,
    toolbox: &Toolbox,
    document_path: Option<&Path>,
    progress: Option<&ProgressCallback>,
) -> PipelineRun {
    let mut run = PipelineRun::new(steps);
    let total = run.steps.len();
    let start = Instant::now();

    info!("Starting run: {} steps on engine '{}'", total, engine.name());
    if let Some(cb) = progress {
        cb.on_run_start(total);
    }
    run.start();

    let request = EngineRequest {
        steps: &run.steps,
        toolbox,
        document_path,
        progress,
    };
    let result = engine.execute(request).await;

    let completed = match result {
        Ok(out) => {
            let n = out.step_outputs.len();
            run.complete(out.final_output, out.step_outputs, out.artifacts);
            n
        }
        Err(e) => {
            warn!("Run failed: {}", e);
            run.fail(e.to_string());
            0
        }
    };
    run.duration_ms = start.elapsed().as_millis() as u64;

    if let Some(cb) = progress {
        cb.on_run_complete(total, completed);
    }
    info!("Run finished: {:?} in {}ms", run.status, run.duration_ms);
    run
}
