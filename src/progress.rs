//! Progress-callback trait for per-step run events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::NavigatorConfigBuilder::progress_callback`] to receive
//! events as the engine works through the ordered step list. Callers can
//! forward them to a terminal progress bar, a log, or a channel without the
//! library knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use knowledge_navigator::{NavigatorConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_step_complete(&self, index: usize, total: usize, name: &str, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("step {index}/{total} {name}: {output_len} bytes");
//!     }
//! }
//!
//! let config = NavigatorConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::DocumentInfo;
use std::sync::Arc;

/// Called by the engine as it executes each step.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Step indices are 1-based.
pub trait RunProgressCallback: Send + Sync {
    /// Called once the text has been extracted, before any step runs.
    ///
    /// `warnings` are the document's non-fatal extraction warnings.
    fn on_document_ready(&self, info: &DocumentInfo, warnings: &[String]) {
        let _ = (info, warnings);
    }

    /// Called once before the first step.
    fn on_run_start(&self, total_steps: usize) {
        let _ = total_steps;
    }

    /// Called just before a step is executed.
    fn on_step_start(&self, index: usize, total_steps: usize, name: &str) {
        let _ = (index, total_steps, name);
    }

    /// Called when a step produced output.
    ///
    /// `output_len` is the byte length of the step's cleaned output.
    fn on_step_complete(&self, index: usize, total_steps: usize, name: &str, output_len: usize) {
        let _ = (index, total_steps, name, output_len);
    }

    /// Called when a step failed after all retries. No further steps run.
    fn on_step_error(&self, index: usize, total_steps: usize, name: &str, error: &str) {
        let _ = (index, total_steps, name, error);
    }

    /// Called once after the run reached a terminal state.
    fn on_run_complete(&self, total_steps: usize, completed_steps: usize) {
        let _ = (total_steps, completed_steps);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::NavigatorConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;
