//! # knowledge-navigator
//!
//! Turn a project document (PDF) into a set of analysis, resource-discovery
//! and starter-code artifacts by running its text through a fixed, ordered
//! list of LLM-backed steps.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   per-page text layer via lopdf (spawn_blocking)
//!  ├─ 3. Steps     14 step definitions built from the document text
//!  ├─ 4. Engine    one call; steps run strictly in order, each writes a report
//!  └─ 5. Present   final output + re-scan of the three output directories
//! ```
//!
//! Steps are played by three roles: an analyst (goals, objectives,
//! feasibility, resources), a researcher (resources, datasets, repositories,
//! papers, trends) and a generator (architecture, starter template,
//! components, integrations, tests). Each role writes into its own directory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use knowledge_navigator::{analyze, NavigatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = NavigatorConfig::default();
//!     let output = analyze("proposal.pdf", &config).await?.into_result()?;
//!     println!("{}", output.final_output().unwrap_or_default());
//!     for artifact in output.artifacts.iter().flat_map(|a| a.iter()) {
//!         eprintln!("{}", artifact.path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | HTTP API (`axum`): upload, run, list and download artifacts |
//! | `cli`    | on      | Enables the `navigator` binary (clap + anyhow + tracing-subscriber); implies `server` |
//!
//! Disable both when using only the library:
//! ```toml
//! knowledge-navigator = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod navigator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod test_support;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{NavigatorConfig, NavigatorConfigBuilder, OutputLayout};
pub use engine::{
    Capability, Engine, EngineError, EngineOutput, EngineRequest, LlmEngine, StepOutput, Toolbox,
};
pub use error::{FileReadError, NavigatorError, PageError};
pub use navigator::{analyze, analyze_from_bytes, analyze_sync, inspect, list_artifacts, Navigator};
pub use output::{AnalysisOutput, DocumentInfo, Inspection, RunStats};
pub use pipeline::artifacts::{
    resolve_artifact_path, Artifact, ArtifactContent, ArtifactKind, ArtifactListing,
    DirectoryGroup,
};
pub use pipeline::extract::{ExtractedDocument, PageResult};
pub use pipeline::runner::{PipelineRun, RunStatus};
pub use pipeline::steps::{Role, StepDefinition};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
#[cfg(feature = "server")]
pub use server::{router, serve};
