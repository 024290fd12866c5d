//! Result types returned by the navigator entry points.

use crate::error::NavigatorError;
use crate::pipeline::artifacts::ArtifactListing;
use crate::pipeline::extract::ExtractedDocument;
use crate::pipeline::runner::{PipelineRun, RunStatus};
use serde::{Deserialize, Serialize};

/// Facts about the uploaded document, shown before a run starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// File name as uploaded, when known.
    pub file_name: Option<String>,
    pub size_bytes: u64,
    pub page_count: usize,
    /// Pages whose text layer failed to extract.
    pub failed_pages: usize,
    /// Characters of extracted text.
    pub text_chars: usize,
}

impl DocumentInfo {
    pub fn new(file_name: Option<String>, size_bytes: u64, document: &ExtractedDocument) -> Self {
        Self {
            file_name,
            size_bytes,
            page_count: document.page_count(),
            failed_pages: document.failed_pages().count(),
            text_chars: document.full_text().chars().count(),
        }
    }

    /// Size in KiB, as shown in the file-info panel.
    pub fn size_kib(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}

/// Extraction-only result of [`crate::inspect`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub info: DocumentInfo,
    pub document: ExtractedDocument,
    pub warnings: Vec<String>,
}

/// Timing and volume figures for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_steps: usize,
    /// Steps that produced output; 0 for a failed run.
    pub completed_steps: usize,
    /// Files the engine reported writing.
    pub manifest_files: usize,
    /// Files found by the post-run directory scan.
    pub listed_files: usize,
    /// Listed files that could not be read back.
    pub unreadable_files: usize,
    pub extraction_ms: u64,
    pub run_ms: u64,
    pub total_ms: u64,
}

/// Everything produced by one end-to-end analysis.
///
/// A failed run is still returned as `Ok(AnalysisOutput)` so callers can show
/// the extraction warnings next to the error; use [`Self::into_result`] to
/// turn it into an `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub info: DocumentInfo,
    pub document: ExtractedDocument,
    pub run: PipelineRun,
    /// Directory listing after the run; `None` when the run failed.
    pub artifacts: Option<ArtifactListing>,
    /// Extraction warnings (failed pages, no usable text).
    pub warnings: Vec<String>,
    pub stats: RunStats,
}

impl AnalysisOutput {
    pub fn status(&self) -> RunStatus {
        self.run.status()
    }

    pub fn is_success(&self) -> bool {
        self.run.is_completed()
    }

    pub fn final_output(&self) -> Option<&str> {
        self.run.final_output()
    }

    /// `Err(NavigatorError::EngineFailed)` carrying the engine's fault when the
    /// run failed, otherwise `Ok(self)`.
    pub fn into_result(self) -> Result<Self, NavigatorError> {
        match self.run.error() {
            Some(message) => Err(NavigatorError::EngineFailed {
                message: message.to_string(),
            }),
            None => Ok(self),
        }
    }
}
