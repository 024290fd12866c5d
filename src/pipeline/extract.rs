//! Document text extraction: PDF bytes → [`ExtractedDocument`].
//!
//! Pages are extracted independently. A page whose text layer cannot be
//! decoded is recorded with a [`PageError`] and the next page is tried, so one
//! bad content stream never costs the whole document. Only a container that
//! does not parse at all is fatal ([`NavigatorError::UnreadableDocument`]).
//!
//! A document that parses but yields no text (scanned images, empty pages) is
//! *not* an error: it comes back as an `ExtractedDocument` whose
//! [`ExtractedDocument::is_usable`] is `false`, so callers can warn and carry on.
//!
//! Extraction is CPU-bound and synchronous; async callers go through
//! [`extract_document_async`], which runs it on the blocking pool.

use crate::error::{NavigatorError, PageError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Warning surfaced when no page produced text.
pub const NO_TEXT_WARNING: &str =
    "No text could be extracted from the PDF. The file might be image-based or corrupted.";

/// Extraction outcome for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// 0-based page index.
    pub index: usize,
    /// Normalised page text; `None` when the page failed or had no text.
    pub text: Option<String>,
    /// Set when the page's text layer could not be extracted.
    pub extraction_error: Option<PageError>,
}

/// The text of one uploaded document, page by page.
///
/// Immutable once built: `full_text` is always the `"\n"`-joined texts of the
/// pages that have one, in page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pages: Vec<PageResult>,
    full_text: String,
}

impl ExtractedDocument {
    /// Assemble a document from per-page results (sorted by index).
    pub fn from_pages(mut pages: Vec<PageResult>) -> Self {
        pages.sort_by_key(|p| p.index);
        let full_text = pages
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        Self { pages, full_text }
    }

    pub fn pages(&self) -> &[PageResult] {
        &self.pages
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages whose extraction failed.
    pub fn failed_pages(&self) -> impl Iterator<Item = &PageResult> {
        self.pages.iter().filter(|p| p.extraction_error.is_some())
    }

    /// False when no page produced any non-whitespace text.
    pub fn is_usable(&self) -> bool {
        !self.full_text.trim().is_empty()
    }

    /// Human-readable warnings: one per failed page, plus the no-text warning.
    pub fn warnings(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .failed_pages()
            .filter_map(|p| p.extraction_error.as_ref())
            .map(|e| format!("Warning: {e}"))
            .collect();
        if !self.is_usable() {
            out.push(format!("Warning: {NO_TEXT_WARNING}"));
        }
        out
    }
}

/// Per-page access to a document's text layer.
///
/// The PDF backend implements this; tests substitute sources that fail on
/// chosen pages.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Raw text of the page at 0-based `index`.
    fn page_text(&self, index: usize) -> Result<String, String>;
}

/// [`PageSource`] backed by a parsed `lopdf` document.
pub struct LopdfSource {
    doc: lopdf::Document,
    page_numbers: Vec<u32>,
}

impl LopdfSource {
    /// Parse the PDF container. Fails only when the container itself is unreadable.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NavigatorError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| {
            NavigatorError::UnreadableDocument {
                detail: e.to_string(),
            }
        })?;
        // BTreeMap keys: ascending 1-based page numbers.
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        Ok(Self { doc, page_numbers })
    }
}

impl PageSource for LopdfSource {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Result<String, String> {
        let number = self
            .page_numbers
            .get(index)
            .copied()
            .ok_or_else(|| format!("page index {index} out of range"))?;
        self.doc.extract_text(&[number]).map_err(|e| e.to_string())
    }
}

/// Extract every page of a PDF held in memory.
pub fn extract_document(bytes: &[u8]) -> Result<ExtractedDocument, NavigatorError> {
    let source = LopdfSource::from_bytes(bytes)?;
    Ok(extract_pages(&source))
}

/// [`extract_document`] on the blocking thread pool.
pub async fn extract_document_async(bytes: Vec<u8>) -> Result<ExtractedDocument, NavigatorError> {
    tokio::task::spawn_blocking(move || extract_document(&bytes))
        .await
        .map_err(|e| NavigatorError::Internal(format!("extraction task panicked: {e}")))?
}

/// Extract all pages of `source`, isolating failures per page.
pub fn extract_pages(source: &dyn PageSource) -> ExtractedDocument {
    let total = source.page_count();
    let mut pages = Vec::with_capacity(total);

    for index in 0..total {
        let result = match source.page_text(index) {
            Ok(raw) => {
                let text = normalize_legacy_chars(&raw);
                let text = text.trim_end();
                debug!("Page {}: {} chars", index + 1, text.len());
                PageResult {
                    index,
                    text: (!text.trim().is_empty()).then(|| text.to_string()),
                    extraction_error: None,
                }
            }
            Err(detail) => {
                let error = PageError::ExtractionFailed {
                    page: index + 1,
                    detail,
                };
                warn!("{}", error);
                PageResult {
                    index,
                    text: None,
                    extraction_error: Some(error),
                }
            }
        };
        pages.push(result);
    }

    let doc = ExtractedDocument::from_pages(pages);
    if !doc.is_usable() {
        warn!("{}", NO_TEXT_WARNING);
    }
    doc
}

/// Map C1 control characters left behind by Windows-1252 text that was
/// decoded as Latin-1 to their plain-text equivalents.
pub fn normalize_legacy_chars(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{0096}' | '\u{0097}' => '-',
            '\u{0093}' | '\u{0094}' => '"',
            '\u{0091}' | '\u{0092}' => '\'',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::make_test_pdf;

    /// Scripted source: `Err` entries fail, `Ok` entries return their text.
    struct ScriptedSource(Vec<Result<&'static str, &'static str>>);

    impl PageSource for ScriptedSource {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_text(&self, index: usize) -> Result<String, String> {
            self.0[index].map(str::to_string).map_err(str::to_string)
        }
    }

    #[test]
    fn full_text_joins_pages_in_order() {
        let doc = extract_pages(&ScriptedSource(vec![
            Ok("first"),
            Ok("second"),
            Ok("third"),
        ]));
        assert_eq!(doc.full_text(), "first\nsecond\nthird");
        assert!(doc.is_usable());
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn failed_middle_page_is_isolated() {
        let doc = extract_pages(&ScriptedSource(vec![
            Ok("page one\n"),
            Err("broken content stream"),
            Ok("page three"),
        ]));
        assert_eq!(doc.full_text(), "page one\npage three");
        assert!(doc.is_usable());

        let failed: Vec<_> = doc.failed_pages().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].index, 1);
        assert!(failed[0].text.is_none());

        let warnings = doc.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("page 2"), "got: {warnings:?}");
    }

    #[test]
    fn all_pages_failing_is_unusable_not_fatal() {
        let doc = extract_pages(&ScriptedSource(vec![Err("a"), Err("b")]));
        assert!(!doc.is_usable());
        assert_eq!(doc.full_text(), "");
        assert_eq!(doc.failed_pages().count(), 2);
        assert!(doc
            .warnings()
            .last()
            .is_some_and(|w| w.contains(NO_TEXT_WARNING)));
    }

    #[test]
    fn whitespace_only_pages_are_absent() {
        let doc = extract_pages(&ScriptedSource(vec![Ok("   \n\t"), Ok("")]));
        assert!(!doc.is_usable());
        assert!(doc.pages().iter().all(|p| p.text.is_none()));
        assert_eq!(doc.failed_pages().count(), 0);
    }

    #[test]
    fn zero_pages_is_unusable() {
        let doc = extract_pages(&ScriptedSource(vec![]));
        assert!(!doc.is_usable());
        assert_eq!(doc.page_count(), 0);
    }

    #[test]
    fn legacy_chars_are_normalised() {
        let raw = "a\u{0096}b\u{0097}c \u{0093}q\u{0094} it\u{0092}s";
        assert_eq!(normalize_legacy_chars(raw), "a-b-c \"q\" it's");
    }

    #[test]
    fn from_pages_sorts_by_index() {
        let doc = ExtractedDocument::from_pages(vec![
            PageResult {
                index: 1,
                text: Some("b".into()),
                extraction_error: None,
            },
            PageResult {
                index: 0,
                text: Some("a".into()),
                extraction_error: None,
            },
        ]);
        assert_eq!(doc.full_text(), "a\nb");
    }

    #[test]
    fn garbage_bytes_are_unreadable_document() {
        let err = extract_document(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, NavigatorError::UnreadableDocument { .. }));
    }

    #[test]
    fn extracts_text_from_generated_pdf() {
        let bytes = make_test_pdf(&["Project Alpha goals", "Budget and timeline"]);
        let doc = extract_document(&bytes).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert!(doc.full_text().contains("Alpha"), "got: {:?}", doc.full_text());
        assert!(doc.full_text().contains("Budget"), "got: {:?}", doc.full_text());
        let alpha = doc.full_text().find("Alpha").unwrap();
        let budget = doc.full_text().find("Budget").unwrap();
        assert!(alpha < budget, "pages must stay in order");
    }

    #[tokio::test]
    async fn async_extraction_matches_sync() {
        let bytes = make_test_pdf(&["Hello World"]);
        let sync = extract_document(&bytes).unwrap();
        let async_doc = extract_document_async(bytes).await.unwrap();
        assert_eq!(sync, async_doc);
    }
}
