//! CLI binary for knowledge-navigator.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `NavigatorConfig` and presents results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use knowledge_navigator::{
    inspect, list_artifacts, resolve_artifact_path, serve, AnalysisOutput, Artifact,
    ArtifactContent, ArtifactListing, DocumentInfo, Navigator, NavigatorConfig, OutputLayout,
    ProgressCallback, RunProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the step list plus a log line
/// per finished step.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Extracting document text…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} steps  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Analysing");
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_document_ready(&self, info: &DocumentInfo, warnings: &[String]) {
        self.bar.suspend(|| print_document_panel(info, warnings));
    }

    fn on_run_start(&self, total_steps: usize) {
        self.activate_bar(total_steps);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Running {total_steps} steps…"))
        ));
    }

    fn on_step_start(&self, index: usize, _total: usize, name: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_step_complete(&self, index: usize, total: usize, name: &str, output_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Step {:>2}/{:<2}  {:<28}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{output_len:>6} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_step_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let secs = self.elapsed_secs(index);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Step {:>2}/{:<2}  {:<28}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_run_complete(&self, total_steps: usize, completed_steps: usize) {
        self.bar.finish_and_clear();
        if completed_steps == total_steps {
            eprintln!(
                "{} {} steps completed",
                green("✔"),
                bold(&completed_steps.to_string())
            );
        } else {
            eprintln!("{} run failed, no results kept", red("✘"));
        }
    }
}

/// Prints the file-info panel only; used when the progress bar is off.
struct FileInfoCallback;

impl RunProgressCallback for FileInfoCallback {
    fn on_document_ready(&self, info: &DocumentInfo, warnings: &[String]) {
        print_document_panel(info, warnings);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a project document and print everything it produced
  navigator run proposal.pdf

  # Only the final answer and the list of generated files
  navigator run --present summary proposal.pdf

  # Machine-readable result
  navigator run --present json https://example.com/plan.pdf > run.json

  # Extract the text layer only (no API key needed)
  navigator inspect proposal.pdf

  # Re-scan the output directories after a run
  navigator files
  navigator files --show code_output/starter_template/app/main.py

  # HTTP API on port 8000
  navigator serve --bind 0.0.0.0:8000

STEPS (in order):
  analysis    goal_extraction, objective_breakdown, feasibility_assessment,
              resource_estimation
  discovery   resource_discovery, dataset_discovery, repository_discovery,
              academic_discovery, trend_discovery
  generation  architecture_design, starter_template, component_generation,
              integration_generation, test_generation

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY            OpenAI API key
  ANTHROPIC_API_KEY         Anthropic API key
  GEMINI_API_KEY            Google Gemini API key
  NAVIGATOR_LLM_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  NAVIGATOR_MODEL           Override model ID
  SERPER_API_KEY            Enables web search for the researcher steps
  GITHUB_TOKEN              Enables repository search
  LINKUP_API_KEY            Enables link discovery
  EXA_API_KEY               Enables science literature search

  A `.env` file in the working directory is loaded at start-up.
"#;

/// Turn a project PDF into analysis, resource and starter-code artifacts.
#[derive(Parser, Debug)]
#[command(
    name = "navigator",
    version,
    about = "Turn a project PDF into analysis, resource and starter-code artifacts",
    long_about = "Extract the text of a project document and run it through a fixed sequence \
of LLM-backed steps: project analysis, resource discovery and code generation. Each step \
writes a Markdown report; the generated files are listed afterwards.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NAVIGATOR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "NAVIGATOR_QUIET")]
    quiet: bool,

    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a PDF file or URL.
    Run(RunArgs),

    /// Print the extracted text and page report of a PDF, no LLM calls.
    Inspect {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Output the inspection as JSON.
        #[arg(long)]
        json: bool,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "NAVIGATOR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,
    },

    /// List the files in the output directories.
    Files {
        /// Output the listing as JSON.
        #[arg(long)]
        json: bool,

        /// Print the content of one listed file.
        #[arg(long, value_name = "PATH")]
        show: Option<String>,
    },

    /// Serve the HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "NAVIGATOR_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,

        /// Directory uploaded PDFs are stored in.
        #[arg(long, env = "NAVIGATOR_UPLOAD_DIR", default_value = "uploads")]
        upload_dir: PathBuf,

        /// Largest accepted upload in MiB.
        #[arg(long, env = "NAVIGATOR_MAX_UPLOAD_MB", default_value_t = 50)]
        max_upload_mb: usize,

        #[command(flatten)]
        llm: LlmArgs,
    },
}

#[derive(Args, Debug)]
struct LayoutArgs {
    /// Directory for project analysis reports.
    #[arg(long, global = true, env = "NAVIGATOR_ANALYSIS_DIR", default_value = "project_analysis_output")]
    analysis_dir: PathBuf,

    /// Directory for resource discovery reports.
    #[arg(long, global = true, env = "NAVIGATOR_DISCOVERY_DIR", default_value = "resource_output")]
    discovery_dir: PathBuf,

    /// Directory for generated code.
    #[arg(long, global = true, env = "NAVIGATOR_GENERATION_DIR", default_value = "code_output")]
    generation_dir: PathBuf,

    /// Files larger than this many MiB are listed without being read.
    #[arg(long, global = true, env = "NAVIGATOR_MAX_READ_MB", default_value_t = 10)]
    max_read_mb: u64,
}

impl LayoutArgs {
    fn layout(&self) -> OutputLayout {
        OutputLayout {
            analysis_dir: self.analysis_dir.clone(),
            discovery_dir: self.discovery_dir.clone(),
            generation_dir: self.generation_dir.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// How to present the result.
    #[arg(long, env = "NAVIGATOR_PRESENT", value_enum, default_value = "full")]
    present: Present,

    /// Disable progress bar.
    #[arg(long, env = "NAVIGATOR_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args, Debug)]
struct LlmArgs {
    /// LLM model ID (e.g. gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "NAVIGATOR_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "NAVIGATOR_LLM_PROVIDER")]
    provider: Option<String>,

    /// Minimum distinct findings per discovery step.
    #[arg(long, env = "NAVIGATOR_MIN_FINDINGS", default_value_t = 10)]
    min_findings: usize,

    /// Max LLM output tokens per step.
    #[arg(long, env = "NAVIGATOR_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "NAVIGATOR_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Retries per step on LLM failure.
    #[arg(long, env = "NAVIGATOR_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-step LLM call timeout in seconds.
    #[arg(long, env = "NAVIGATOR_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Characters of each earlier report passed to a later step.
    #[arg(long, env = "NAVIGATOR_CONTEXT_CHARS", default_value_t = 6000)]
    context_chars: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "NAVIGATOR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

/// Presentation mode for `run`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Present {
    /// Final output, every step report and every generated file.
    Full,
    /// Final output and the list of generated files.
    Summary,
    /// The whole result as JSON.
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the feedback that matters; keep library logs
    // out of its way unless asked for.
    let show_progress = match &cli.command {
        Command::Run(args) => !cli.quiet && !args.no_progress && args.present != Present::Json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let layout = cli.layout.layout();
    let max_read_bytes = cli.layout.max_read_mb.saturating_mul(1024 * 1024);

    match cli.command {
        Command::Run(ref args) => {
            let progress_cb: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new_dynamic() as Arc<dyn RunProgressCallback>)
            } else if !cli.quiet && args.present != Present::Json {
                Some(Arc::new(FileInfoCallback) as Arc<dyn RunProgressCallback>)
            } else {
                None
            };
            let config = build_config(&args.llm, layout, max_read_bytes, progress_cb)?
                .build()
                .context("Invalid configuration")?;
            run(args, config, cli.quiet).await
        }
        Command::Inspect {
            ref input,
            json,
            download_timeout,
        } => {
            let config = NavigatorConfig::builder()
                .layout(layout)
                .download_timeout_secs(download_timeout)
                .build()
                .context("Invalid configuration")?;
            let inspection = inspect(input, &config)
                .await
                .context("Failed to inspect PDF")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&inspection)
                        .context("Failed to serialise inspection")?
                );
                return Ok(());
            }
            print_document_panel(&inspection.info, &inspection.warnings);
            println!();
            println!("{}", inspection.document.full_text());
            Ok(())
        }
        Command::Files { json, ref show } => {
            let config = NavigatorConfig::builder()
                .layout(layout)
                .max_read_bytes(max_read_bytes)
                .build()
                .context("Invalid configuration")?;
            if let Some(requested) = show {
                return show_file(&config, requested);
            }
            let listing = list_artifacts(&config);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&listing).context("Failed to serialise listing")?
                );
            } else {
                print_listing(&listing, false);
            }
            Ok(())
        }
        Command::Serve {
            bind,
            ref upload_dir,
            max_upload_mb,
            ref llm,
        } => {
            let config = build_config(llm, layout, max_read_bytes, None)?
                .upload_dir(upload_dir.clone())
                .max_upload_bytes(max_upload_mb.saturating_mul(1024 * 1024))
                .build()
                .context("Invalid configuration")?;
            let navigator = Navigator::new(config).context("Failed to start the analysis engine")?;
            serve(navigator, bind).await.context("Server stopped")?;
            Ok(())
        }
    }
}

async fn run(args: &RunArgs, config: NavigatorConfig, quiet: bool) -> Result<()> {
    let navigator = Navigator::new(config).context("Failed to start the analysis engine")?;
    let output = navigator
        .analyze(&args.input)
        .await
        .context("Analysis could not start")?;

    if args.present == Present::Json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        output.into_result()?;
        return Ok(());
    }

    let output = output.into_result()?;
    present(&output, args.present).context("Failed to write to stdout")?;

    if !quiet {
        eprintln!(
            "   {} steps  /  {} files  in {}ms",
            dim(&output.stats.completed_steps.to_string()),
            dim(&output.stats.listed_files.to_string()),
            output.stats.total_ms,
        );
    }
    Ok(())
}

/// Map CLI args to a `NavigatorConfig` builder.
fn build_config(
    llm: &LlmArgs,
    layout: OutputLayout,
    max_read_bytes: u64,
    progress: Option<ProgressCallback>,
) -> Result<knowledge_navigator::NavigatorConfigBuilder> {
    let mut builder = NavigatorConfig::builder()
        .layout(layout)
        .max_read_bytes(max_read_bytes)
        .min_findings(llm.min_findings)
        .max_tokens(llm.max_tokens)
        .temperature(llm.temperature)
        .max_retries(llm.max_retries)
        .api_timeout_secs(llm.api_timeout)
        .context_chars(llm.context_chars)
        .download_timeout_secs(llm.download_timeout);

    if let Some(ref model) = llm.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = llm.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    Ok(builder)
}

/// File-info panel plus extraction warnings, on stderr.
fn print_document_panel(info: &DocumentInfo, warnings: &[String]) {
    print_file_info(info);
    for w in warnings {
        eprintln!("{} {}", cyan("⚠"), w);
    }
}

fn print_file_info(info: &DocumentInfo) {
    eprintln!(
        "{} {}  {}  {} pages",
        cyan("◆"),
        bold(info.file_name.as_deref().unwrap_or("<memory>")),
        dim(&format!("{:.2} KB", info.size_kib())),
        info.page_count,
    );
    if info.failed_pages > 0 {
        eprintln!("  {} pages could not be read", red(&info.failed_pages.to_string()));
    }
}

fn present(output: &AnalysisOutput, mode: Present) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let final_output = output.final_output().unwrap_or_default();
    writeln!(out, "{}", bold("Analysis Results"))?;
    out.write_all(final_output.as_bytes())?;
    if !final_output.ends_with('\n') {
        out.write_all(b"\n")?;
    }

    if mode == Present::Full {
        for step in output.run.step_outputs() {
            writeln!(out)?;
            writeln!(out, "{}", bold(&format!("── {} ──", step.name)))?;
            if let Some(ref saved) = step.saved_to {
                writeln!(out, "{}", dim(&saved.display().to_string()))?;
            }
            writeln!(out, "{}", step.output.trim_end())?;
        }
    }

    drop(out);
    if let Some(ref listing) = output.artifacts {
        println!();
        print_listing(listing, mode == Present::Full);
    }
    Ok(())
}

fn print_listing(listing: &ArtifactListing, with_content: bool) {
    if listing.is_empty() {
        println!("{}", dim("No files generated yet."));
        return;
    }
    for group in &listing.groups {
        println!("{} {}", cyan("▸"), bold(&group.label));
        for (title, files) in [
            ("Documents", &group.documents),
            ("Code", &group.code),
            ("Other", &group.other),
        ] {
            if files.is_empty() {
                continue;
            }
            println!("  {}", dim(title));
            for artifact in files {
                print_artifact(artifact, with_content);
            }
        }
    }
}

fn print_artifact(artifact: &Artifact, with_content: bool) {
    let marker = if artifact.in_manifest { "•" } else { " " };
    match &artifact.content {
        ArtifactContent::Text { text } => {
            println!(
                "   {marker} {}  {}",
                artifact.name,
                dim(&format!("{} bytes", artifact.size))
            );
            if with_content {
                println!();
                println!("{}", text.trim_end());
                println!();
            }
        }
        ArtifactContent::Unreadable { error } => {
            println!("   {marker} {}  {}", artifact.name, red(&error.to_string()));
        }
    }
}

fn show_file(config: &NavigatorConfig, requested: &str) -> Result<()> {
    let path = resolve_artifact_path(&config.layout, requested)
        .with_context(|| format!("'{requested}' is not a file in the output directories"))?;
    let listing = list_artifacts(config);
    let artifact = listing
        .iter()
        .find(|a| a.path == path)
        .with_context(|| format!("'{requested}' is not listed"))?;
    match &artifact.content {
        ArtifactContent::Text { text } => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            Ok(())
        }
        ArtifactContent::Unreadable { error } => Err(anyhow::anyhow!(error.clone())),
    }
}
