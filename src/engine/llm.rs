//! Default engine: run each step as one chat completion.
//!
//! Steps run strictly in order. A step sees its role persona, the saved
//! reports of the earlier steps its instructions mention, and its own
//! instructions. The answer is cleaned, written to the step's output path and
//! handed on as context to later steps.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Each call is retried
//! with exponential backoff (`retry_backoff_ms * 2^attempt`) and bounded by
//! `api_timeout_secs`. A step that still fails after the last retry aborts the
//! run with [`EngineError::StepFailed`].

use crate::config::{NavigatorConfig, OutputLayout};
use crate::engine::postprocess::{clean_markdown, split_auxiliary_files};
use crate::engine::{Capability, Engine, EngineError, EngineOutput, EngineRequest, StepOutput};
use crate::error::NavigatorError;
use crate::pipeline::steps::{Role, StepDefinition};
use crate::prompts::{lookup_clause, prior_output_context, role_persona, OUTPUT_RULES};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Call and context knobs, copied out of [`NavigatorConfig`].
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub temperature: f32,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub api_timeout_secs: u64,
    pub context_chars: usize,
}

impl LlmSettings {
    pub fn from_config(config: &NavigatorConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
            context_chars: config.context_chars,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

/// LLM-backed [`Engine`] built on `edgequake-llm`.
pub struct LlmEngine {
    provider: Arc<dyn LLMProvider>,
    settings: LlmSettings,
    layout: OutputLayout,
}

impl LlmEngine {
    pub fn new(provider: Arc<dyn LLMProvider>, settings: LlmSettings, layout: OutputLayout) -> Self {
        Self {
            provider,
            settings,
            layout,
        }
    }

    /// Build the engine, resolving the provider from the config and environment.
    pub fn from_config(config: &NavigatorConfig) -> Result<Self, NavigatorError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(
            provider,
            LlmSettings::from_config(config),
            config.layout.clone(),
        ))
    }

    /// Send one step to the model, retrying transient failures.
    async fn complete(&self, step: &StepDefinition, messages: &[ChatMessage]) -> Result<String, String> {
        let options = self.settings.options();
        let limit = Duration::from_secs(self.settings.api_timeout_secs);
        let mut last_err: Option<String> = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = retry_backoff(self.settings.retry_backoff_ms, attempt);
                warn!(
                    "Step {}: retry {}/{} after {}ms",
                    step.name, attempt, self.settings.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(limit, self.provider.chat(messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Step {}: {} input tokens, {} output tokens",
                        step.name, response.prompt_tokens, response.completion_tokens
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    warn!("Step {}: attempt {} failed: {}", step.name, attempt + 1, e);
                    last_err = Some(e.to_string());
                }
                Err(_) => {
                    warn!(
                        "Step {}: attempt {} timed out after {}s",
                        step.name,
                        attempt + 1,
                        self.settings.api_timeout_secs
                    );
                    last_err = Some(format!("timed out after {}s", self.settings.api_timeout_secs));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| "Unknown error".to_string()))
    }
}

#[async_trait]
impl Engine for LlmEngine {
    fn name(&self) -> &str {
        "llm"
    }

    async fn execute(&self, request: EngineRequest<'_>) -> Result<EngineOutput, EngineError> {
        if request.steps.is_empty() {
            return Err(EngineError::InvalidRequest("no steps to execute".into()));
        }
        let total = request.steps.len();
        let mut output = EngineOutput::default();

        for (index, step) in request.steps.iter().enumerate() {
            if let Some(cb) = request.progress {
                cb.on_step_start(index + 1, total, &step.name);
            }
            let start = Instant::now();

            let granted = request.toolbox.for_role(step.role.capabilities());
            let messages = build_messages(
                step,
                &granted,
                &output.step_outputs,
                request.document_path,
                self.settings.context_chars,
            );

            let raw = match self.complete(step, &messages).await {
                Ok(raw) => raw,
                Err(detail) => {
                    if let Some(cb) = request.progress {
                        cb.on_step_error(index + 1, total, &step.name, &detail);
                    }
                    return Err(EngineError::StepFailed {
                        step: step.name.clone(),
                        detail,
                    });
                }
            };

            let saved = persist_step_output(step, &raw, &self.layout).await?;
            info!(
                "Step {}/{} {} done in {:?} ({} chars, {} files)",
                index + 1,
                total,
                step.name,
                start.elapsed(),
                saved.output.len(),
                saved.files.len()
            );
            if let Some(cb) = request.progress {
                cb.on_step_complete(index + 1, total, &step.name, saved.output.len());
            }

            output.artifacts.extend(saved.saved_to.iter().cloned());
            output.artifacts.extend(saved.files.iter().cloned());
            output.final_output = saved.output.clone();
            output.step_outputs.push(saved);
        }

        Ok(output)
    }
}

/// Assemble the chat for one step.
/// Delay before retry `attempt` (1-based): `base * 2^(attempt - 1)`, saturating.
fn retry_backoff(base_ms: u64, attempt: u32) -> u64 {
    2u64.checked_pow(attempt.saturating_sub(1))
        .map_or(u64::MAX, |factor| base_ms.saturating_mul(factor))
}

fn build_messages(
    step: &StepDefinition,
    granted: &[Capability],
    prior: &[StepOutput],
    document_path: Option<&Path>,
    context_chars: usize,
) -> Vec<ChatMessage> {
    let lookups: Vec<&str> = granted
        .iter()
        .filter(|c| **c != Capability::FileWriter)
        .map(|c| c.label())
        .collect();
    let system = format!(
        "{}\n\n{}\n\n{}",
        role_persona(step.role),
        OUTPUT_RULES,
        lookup_clause(&lookups)
    );
    let mut messages = vec![ChatMessage::system(system)];

    for earlier in referenced_outputs(step, prior) {
        let path = earlier
            .saved_to
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        messages.push(ChatMessage::system(prior_output_context(
            &earlier.name,
            &path,
            truncate_chars(&earlier.output, context_chars),
        )));
    }

    if let Some(path) = document_path {
        messages.push(ChatMessage::system(format!(
            "The source document is stored at '{}'.",
            path.display()
        )));
    }

    messages.push(ChatMessage::user(step.instructions.clone()));
    messages
}

/// Earlier outputs whose saved path the step's instructions mention.
fn referenced_outputs<'a>(step: &StepDefinition, prior: &'a [StepOutput]) -> Vec<&'a StepOutput> {
    prior
        .iter()
        .filter(|p| {
            p.saved_to
                .as_deref()
                .is_some_and(|path| step.instructions.contains(&path.display().to_string()))
        })
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Clean a raw answer and write it, plus any generated files, to disk.
async fn persist_step_output(
    step: &StepDefinition,
    raw: &str,
    layout: &OutputLayout,
) -> Result<StepOutput, EngineError> {
    let cleaned = clean_markdown(raw);
    let mut files = Vec::new();

    let report = if step.role == Role::Generator {
        let (summary, aux) = split_auxiliary_files(&cleaned);
        let base = layout.generation_dir.join(&step.name);
        for file in aux {
            let target = base.join(&file.path);
            write_file(&target, &file.content).await?;
            debug!("Step {}: wrote {}", step.name, target.display());
            files.push(target);
        }
        if files.is_empty() {
            cleaned
        } else {
            clean_markdown(&summary)
        }
    } else {
        cleaned
    };

    if let Some(path) = &step.output_path_hint {
        write_file(path, &report).await?;
    }

    Ok(StepOutput {
        name: step.name.clone(),
        output: report,
        saved_to: step.output_path_hint.clone(),
        files,
    })
}

async fn write_file(path: &Path, content: &str) -> Result<(), EngineError> {
    let io_err = |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, content).await.map_err(io_err)
}

// ── Provider resolution ──────────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, NavigatorError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        NavigatorError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** (`NAVIGATOR_LLM_PROVIDER` + `NAVIGATOR_MODEL`),
///    honoured only when both are set.
/// 4. **OpenAI** when `OPENAI_API_KEY` is present.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &NavigatorConfig) -> Result<Arc<dyn LLMProvider>, NavigatorError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("NAVIGATOR_LLM_PROVIDER"),
        std::env::var("NAVIGATOR_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| NavigatorError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
