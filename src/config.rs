//! Configuration types for a navigator run.
//!
//! All behaviour is controlled through [`NavigatorConfig`], built via its
//! [`NavigatorConfigBuilder`]. The CLI, the HTTP server and the tests share it.

use crate::engine::{Engine, Toolbox};
use crate::error::NavigatorError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default directory for analysis-phase documents.
pub const DEFAULT_ANALYSIS_DIR: &str = "project_analysis_output";
/// Default directory for discovery-phase documents.
pub const DEFAULT_DISCOVERY_DIR: &str = "resource_output";
/// Default directory for generation-phase documents and generated files.
pub const DEFAULT_GENERATION_DIR: &str = "code_output";

/// The three output directories steps are told to write into.
///
/// Only the generation directory may contain nested subdirectories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    pub analysis_dir: PathBuf,
    pub discovery_dir: PathBuf,
    pub generation_dir: PathBuf,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            analysis_dir: PathBuf::from(DEFAULT_ANALYSIS_DIR),
            discovery_dir: PathBuf::from(DEFAULT_DISCOVERY_DIR),
            generation_dir: PathBuf::from(DEFAULT_GENERATION_DIR),
        }
    }
}

impl OutputLayout {
    /// Place all three default directories under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            analysis_dir: root.join(DEFAULT_ANALYSIS_DIR),
            discovery_dir: root.join(DEFAULT_DISCOVERY_DIR),
            generation_dir: root.join(DEFAULT_GENERATION_DIR),
        }
    }

    /// The directories in scan order: analysis, discovery, generation.
    pub fn dirs(&self) -> [&Path; 3] {
        [&self.analysis_dir, &self.discovery_dir, &self.generation_dir]
    }

    /// Create all three directories if missing.
    pub fn ensure(&self) -> Result<(), NavigatorError> {
        for dir in self.dirs() {
            std::fs::create_dir_all(dir).map_err(|e| NavigatorError::OutputWriteFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Whether `path` lies inside one of the three output directories.
    ///
    /// Purely lexical: `..` components are rejected outright rather than
    /// resolved, so the check does not depend on what exists on disk.
    pub fn contains(&self, path: &Path) -> bool {
        if path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return false;
        }
        self.dirs().iter().any(|dir| path.starts_with(dir))
    }
}

/// Configuration for a navigator run.
///
/// Built via [`NavigatorConfig::builder()`] or using
/// [`NavigatorConfig::default()`].
///
/// # Example
/// ```rust
/// use knowledge_navigator::NavigatorConfig;
///
/// let config = NavigatorConfig::builder()
///     .model("gpt-4.1-mini")
///     .min_findings(12)
///     .build()
///     .unwrap();
/// assert_eq!(config.min_findings, 12);
/// ```
#[derive(Clone)]
pub struct NavigatorConfig {
    /// Where steps are instructed to persist their outputs.
    pub layout: OutputLayout,

    /// Directory uploaded PDFs are stored in by the HTTP server. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Minimum number of distinct findings each discovery step must collect. Default: 10.
    pub min_findings: usize,

    /// LLM model identifier for the default engine. If None, uses `gpt-4.1-mini`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed engine. Takes precedence over every LLM setting.
    pub engine: Option<Arc<dyn Engine>>,

    /// Pre-constructed capability handles. If None, read from the environment once.
    pub toolbox: Option<Toolbox>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per step. Default: 8192.
    ///
    /// Generation steps emit whole source files; anything much lower truncates
    /// them mid-file.
    pub max_tokens: usize,

    /// Retries per step on a failed LLM call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 1000.
    pub retry_backoff_ms: u64,

    /// Per-LLM-call timeout in seconds. Default: 300.
    pub api_timeout_secs: u64,

    /// Characters of each referenced earlier output passed to a later step. Default: 6000.
    pub context_chars: usize,

    /// Artifacts larger than this are reported instead of read. Default: 10 MiB.
    pub max_read_bytes: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional step-progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            layout: OutputLayout::default(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 50 * 1024 * 1024,
            min_findings: 10,
            model: None,
            provider_name: None,
            provider: None,
            engine: None,
            toolbox: None,
            temperature: 0.2,
            max_tokens: 8192,
            max_retries: 2,
            retry_backoff_ms: 1000,
            api_timeout_secs: 300,
            context_chars: 6000,
            max_read_bytes: 10 * 1024 * 1024,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for NavigatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigatorConfig")
            .field("layout", &self.layout)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("min_findings", &self.min_findings)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field("toolbox", &self.toolbox)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("context_chars", &self.context_chars)
            .field("max_read_bytes", &self.max_read_bytes)
            .finish()
    }
}

impl NavigatorConfig {
    /// Create a new builder for `NavigatorConfig`.
    pub fn builder() -> NavigatorConfigBuilder {
        NavigatorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`NavigatorConfig`].
pub struct NavigatorConfigBuilder {
    config: NavigatorConfig,
}

impl fmt::Debug for NavigatorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigatorConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl NavigatorConfigBuilder {
    pub fn layout(mut self, layout: OutputLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn analysis_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.layout.analysis_dir = dir.into();
        self
    }

    pub fn discovery_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.layout.discovery_dir = dir.into();
        self
    }

    pub fn generation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.layout.generation_dir = dir.into();
        self
    }

    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn min_findings(mut self, n: usize) -> Self {
        self.config.min_findings = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn engine(mut self, engine: Arc<dyn Engine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn toolbox(mut self, toolbox: Toolbox) -> Self {
        self.config.toolbox = Some(toolbox);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn context_chars(mut self, n: usize) -> Self {
        self.config.context_chars = n;
        self
    }

    pub fn max_read_bytes(mut self, n: u64) -> Self {
        self.config.max_read_bytes = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NavigatorConfig, NavigatorError> {
        let c = &self.config;
        if c.min_findings == 0 {
            return Err(NavigatorError::InvalidConfig(
                "min_findings must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(NavigatorError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.max_upload_bytes == 0 {
            return Err(NavigatorError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        let [a, d, g] = c.layout.dirs();
        if a == d || a == g || d == g {
            return Err(NavigatorError::InvalidConfig(format!(
                "output directories must be distinct, got {}, {}, {}",
                a.display(),
                d.display(),
                g.display()
            )));
        }
        Ok(self.config)
    }
}
