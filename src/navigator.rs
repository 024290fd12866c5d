//! End-to-end entry points: document in, analysis run and artifact listing out.
//!
//! ```text
//! input ──▶ extract ──▶ steps ──▶ runner ──▶ engine ──▶ artifacts
//! (path/URL/bytes)                           (writes)   (re-scan)
//! ```
//!
//! [`Navigator`] resolves the engine and the capability handles once and
//! reuses them for every run. The free functions build a throw-away
//! `Navigator` per call.

use crate::config::NavigatorConfig;
use crate::engine::{Engine, LlmEngine, Toolbox};
use crate::error::NavigatorError;
use crate::output::{AnalysisOutput, DocumentInfo, Inspection, RunStats};
use crate::pipeline::artifacts::{scan_artifacts, ArtifactListing};
use crate::pipeline::extract::extract_document_async;
use crate::pipeline::input::{ensure_pdf_bytes, resolve_input};
use crate::pipeline::runner::run_pipeline;
use crate::pipeline::steps::build_steps;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// A configured analysis front door.
#[derive(Clone)]
pub struct Navigator {
    config: NavigatorConfig,
    engine: Arc<dyn Engine>,
    toolbox: Toolbox,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("engine", &self.engine.name())
            .field("toolbox", &self.toolbox)
            .field("layout", &self.config.layout)
            .finish()
    }
}

impl Navigator {
    /// Build a navigator, resolving the engine and toolbox.
    ///
    /// Uses `config.engine` when set, otherwise an [`LlmEngine`], which fails
    /// with [`NavigatorError::ProviderNotConfigured`] when no provider can be
    /// resolved. The toolbox comes from `config.toolbox` or the environment.
    pub fn new(config: NavigatorConfig) -> Result<Self, NavigatorError> {
        let engine: Arc<dyn Engine> = match &config.engine {
            Some(engine) => Arc::clone(engine),
            None => Arc::new(LlmEngine::from_config(&config)?),
        };
        let toolbox = config.toolbox.clone().unwrap_or_else(Toolbox::from_env);
        info!(
            "Navigator ready: engine '{}', capabilities [{}]",
            engine.name(),
            toolbox
                .available()
                .map(|c| c.label())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self {
            config,
            engine,
            toolbox,
        })
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Analyse a PDF given as a local path or an HTTP(S) URL.
    ///
    /// A local path is passed on to the engine as the document reference; a
    /// downloaded file is not, since it is deleted when this call returns.
    pub async fn analyze(&self, input: &str) -> Result<AnalysisOutput, NavigatorError> {
        let resolved = resolve_input(input, self.config.download_timeout_secs).await?;
        let path = resolved.path().to_path_buf();
        let bytes = read_pdf(&path).await?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let document_path = resolved.is_local().then_some(path.as_path());
        self.run_document(bytes, file_name, document_path).await
    }

    /// Analyse a PDF already stored on disk, e.g. an upload.
    pub async fn analyze_path(&self, path: &Path) -> Result<AnalysisOutput, NavigatorError> {
        self.analyze(&path.to_string_lossy()).await
    }

    /// Analyse PDF bytes held in memory.
    pub async fn analyze_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: Option<&str>,
    ) -> Result<AnalysisOutput, NavigatorError> {
        let label = PathBuf::from(file_name.unwrap_or("<memory>"));
        ensure_pdf_bytes(&label, &bytes)?;
        self.run_document(bytes, file_name.map(str::to_string), None).await
    }

    /// Re-scan the output directories. Nothing is marked as in-manifest.
    pub fn artifacts(&self) -> ArtifactListing {
        scan_artifacts(&self.config.layout, &[], self.config.max_read_bytes)
    }

    async fn run_document(
        &self,
        bytes: Vec<u8>,
        file_name: Option<String>,
        document_path: Option<&Path>,
    ) -> Result<AnalysisOutput, NavigatorError> {
        let total_start = Instant::now();
        let size_bytes = bytes.len() as u64;

        // ── Step 1: Extract text ─────────────────────────────────────────
        let extraction_start = Instant::now();
        let document = extract_document_async(bytes).await?;
        let extraction_ms = extraction_start.elapsed().as_millis() as u64;
        let info = DocumentInfo::new(file_name, size_bytes, &document);
        info!(
            "Extracted {} chars from {} pages in {}ms",
            info.text_chars, info.page_count, extraction_ms
        );

        let warnings = document.warnings();
        for w in &warnings {
            warn!("{}", w);
        }
        if let Some(cb) = &self.config.progress_callback {
            cb.on_document_ready(&info, &warnings);
        }

        // ── Step 2: Prepare output directories and steps ─────────────────
        self.config.layout.ensure()?;
        let steps = build_steps(
            document.full_text(),
            &self.config.layout,
            self.config.min_findings,
        );

        // ── Step 3: Run ──────────────────────────────────────────────────
        let run_start = Instant::now();
        let run = run_pipeline(
            steps,
            self.engine.as_ref(),
            &self.toolbox,
            document_path,
            self.config.progress_callback.as_ref(),
        )
        .await;
        let run_ms = run_start.elapsed().as_millis() as u64;

        // ── Step 4: List artifacts (completed runs only) ─────────────────
        let artifacts = if run.is_completed() {
            let layout = self.config.layout.clone();
            let manifest = run.artifacts().to_vec();
            let max = self.config.max_read_bytes;
            let listing = tokio::task::spawn_blocking(move || scan_artifacts(&layout, &manifest, max))
                .await
                .map_err(|e| NavigatorError::Internal(format!("artifact scan panicked: {e}")))?;
            Some(listing)
        } else {
            None
        };

        let stats = RunStats {
            total_steps: run.steps().len(),
            completed_steps: run.step_outputs().len(),
            manifest_files: run.artifacts().len(),
            listed_files: artifacts.as_ref().map_or(0, ArtifactListing::len),
            unreadable_files: artifacts.as_ref().map_or(0, |a| a.read_errors().count()),
            extraction_ms,
            run_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        };

        Ok(AnalysisOutput {
            info,
            document,
            run,
            artifacts,
            warnings,
            stats,
        })
    }
}

async fn read_pdf(path: &Path) -> Result<Vec<u8>, NavigatorError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => NavigatorError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => NavigatorError::FileNotFound {
            path: path.to_path_buf(),
        },
    })
}

/// Analyse a PDF file or URL.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(AnalysisOutput)` once the run reached a terminal state, including a
/// failed one (check [`AnalysisOutput::is_success`] or call
/// [`AnalysisOutput::into_result`]).
///
/// # Errors
/// Returns `Err(NavigatorError)` only when the run could not start:
/// - file not found / download failed / not a PDF
/// - unreadable PDF container
/// - no LLM provider configured
pub async fn analyze(
    input: impl AsRef<str>,
    config: &NavigatorConfig,
) -> Result<AnalysisOutput, NavigatorError> {
    Navigator::new(config.clone())?.analyze(input.as_ref()).await
}

/// Analyse PDF bytes in memory.
///
/// # Example
/// ```rust,no_run
/// use knowledge_navigator::{analyze_from_bytes, NavigatorConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("proposal.pdf")?;
/// let output = analyze_from_bytes(&bytes, &NavigatorConfig::default()).await?;
/// println!("{}", output.final_output().unwrap_or_default());
/// # Ok(())
/// # }
/// ```
pub async fn analyze_from_bytes(
    bytes: &[u8],
    config: &NavigatorConfig,
) -> Result<AnalysisOutput, NavigatorError> {
    Navigator::new(config.clone())?
        .analyze_bytes(bytes.to_vec(), None)
        .await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input: impl AsRef<str>,
    config: &NavigatorConfig,
) -> Result<AnalysisOutput, NavigatorError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| NavigatorError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input, config))
}

/// Extract a PDF's text without running any step.
///
/// Does not require an LLM provider or API key. Only the download timeout is
/// taken from `config`.
pub async fn inspect(
    input: impl AsRef<str>,
    config: &NavigatorConfig,
) -> Result<Inspection, NavigatorError> {
    let resolved = resolve_input(input.as_ref(), config.download_timeout_secs).await?;
    let path = resolved.path();
    let bytes = read_pdf(path).await?;
    let size = bytes.len() as u64;
    let document = extract_document_async(bytes).await?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    Ok(Inspection {
        info: DocumentInfo::new(file_name, size, &document),
        warnings: document.warnings(),
        document,
    })
}

/// Scan the configured output directories without running anything.
pub fn list_artifacts(config: &NavigatorConfig) -> ArtifactListing {
    scan_artifacts(&config.layout, &[], config.max_read_bytes)
}
