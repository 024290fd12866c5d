//! Error types for the knowledge-navigator library.
//!
//! Failures are split by the size of the unit that failed:
//!
//! * [`NavigatorError`]: **fatal**, the request cannot proceed at all
//!   (bad input file, not a PDF, unreadable document container, provider
//!   not configured). Returned as `Err(NavigatorError)` from the top-level
//!   entry points.
//!
//! * [`PageError`]: **non-fatal**, a single page's text layer could not be
//!   read. Stored inside [`crate::pipeline::extract::PageResult`]; the other
//!   pages are still extracted.
//!
//! * [`FileReadError`]: **non-fatal**, a single generated artifact could not
//!   be read back. Stored per artifact so the rest of the listing renders.
//!
//! Engine faults are their own type, [`crate::engine::EngineError`], because
//! they belong to the engine contract rather than to this crate's I/O.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the knowledge-navigator library.
#[derive(Debug, Error)]
pub enum NavigatorError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The upload was read, but it is not a PDF. Rejected before extraction.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The upload could not be stored in the upload directory.
    #[error("Failed to store upload '{name}': {reason}")]
    UploadFailed { name: String, reason: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The PDF container (header, xref, trailer) could not be parsed.
    ///
    /// Distinct from a document that parses but has no text layer; that case
    /// is reported through [`crate::pipeline::extract::ExtractedDocument::is_usable`].
    #[error("Error reading PDF: {detail}")]
    UnreadableDocument { detail: String },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The engine call failed; `message` is the engine's fault, unchanged.
    #[error("Error during analysis: {message}")]
    EngineFailed { message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create an output directory or write a file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page's text layer could not be decoded.
    #[error("Could not extract text from page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },
}

/// A non-fatal error for a single artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum FileReadError {
    /// Opening or reading the file failed.
    #[error("Error reading file {name}: {cause}")]
    Io { name: String, cause: String },

    /// The file exceeds the configured read limit.
    #[error("Error reading file {name}: {size} bytes exceeds the {limit}-byte read limit")]
    TooLarge { name: String, size: u64, limit: u64 },
}

impl FileReadError {
    /// File name the error refers to.
    pub fn file_name(&self) -> &str {
        match self {
            FileReadError::Io { name, .. } | FileReadError::TooLarge { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_error_display_is_one_indexed_page() {
        let e = PageError::ExtractionFailed {
            page: 2,
            detail: "bad content stream".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 2"), "got: {msg}");
        assert!(msg.contains("bad content stream"));
    }

    #[test]
    fn unreadable_document_is_distinct_message() {
        let e = NavigatorError::UnreadableDocument {
            detail: "invalid file header".into(),
        };
        assert!(e.to_string().starts_with("Error reading PDF"));
    }

    #[test]
    fn engine_failed_keeps_message_verbatim() {
        let e = NavigatorError::EngineFailed {
            message: "step 'trend_discovery' failed: 429".into(),
        };
        assert!(e.to_string().contains("step 'trend_discovery' failed: 429"));
    }

    #[test]
    fn file_read_error_carries_name() {
        let e = FileReadError::TooLarge {
            name: "huge.md".into(),
            size: 20,
            limit: 10,
        };
        assert_eq!(e.file_name(), "huge.md");
        assert!(e.to_string().contains("huge.md"));
    }
}
