//! Upload boundary: turn a user-supplied path, URL or byte buffer into a
//! PDF this crate is willing to extract.
//!
//! Every entry point checks the PDF magic bytes (`%PDF`) before extraction is
//! attempted, so a non-document upload is rejected with
//! [`NavigatorError::NotAPdf`] instead of surfacing later as an unreadable
//! document.

use crate::error::NavigatorError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved input: either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// Whether the file outlives this value (i.e. was not downloaded).
    pub fn is_local(&self) -> bool {
        matches!(self, ResolvedInput::Local(_))
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Whether a file name carries a `.pdf` extension (case-insensitive).
pub fn has_pdf_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Reject `bytes` unless they start with the PDF magic number.
pub fn ensure_pdf_bytes(path: &Path, bytes: &[u8]) -> Result<(), NavigatorError> {
    if bytes.len() >= 4 && &bytes[..4] == b"%PDF" {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(NavigatorError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

/// Reduce an uploaded file name to a safe single path component.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]` becomes
/// `_`. Always ends in `.pdf`.
pub fn sanitize_upload_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.').to_string();
    cleaned = if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed
    };
    if !has_pdf_extension(&cleaned) {
        cleaned.push_str(".pdf");
    }
    cleaned
}

/// Resolve the input string to a local PDF file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, NavigatorError> {
    if input.trim().is_empty() {
        return Err(NavigatorError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, NavigatorError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(NavigatorError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            let n = f.read(&mut magic).unwrap_or(0);
            ensure_pdf_bytes(&path, &magic[..n])?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(NavigatorError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(NavigatorError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, NavigatorError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NavigatorError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            NavigatorError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            NavigatorError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(NavigatorError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = filename_from_url(url);

    let temp_dir = TempDir::new().map_err(|e| NavigatorError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| NavigatorError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    ensure_pdf_bytes(&file_path, &bytes)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| NavigatorError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Pick a file name from the last URL path segment.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return sanitize_upload_name(last);
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(has_pdf_extension("plan.PDF"));
        assert!(has_pdf_extension("plan.pdf"));
        assert!(!has_pdf_extension("plan.docx"));
        assert!(!has_pdf_extension("pdf"));
    }

    #[test]
    fn ensure_pdf_bytes_rejects_other_formats() {
        let path = Path::new("notes.pdf");
        assert!(ensure_pdf_bytes(path, b"%PDF-1.7\n").is_ok());
        match ensure_pdf_bytes(path, b"PK\x03\x04rest") {
            Err(NavigatorError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
        assert!(ensure_pdf_bytes(path, b"").is_err());
    }

    #[test]
    fn sanitize_upload_name_strips_directories() {
        assert_eq!(sanitize_upload_name("../../etc/passwd"), "passwd.pdf");
        assert_eq!(sanitize_upload_name("C:\\docs\\My Plan.pdf"), "My_Plan.pdf");
        assert_eq!(sanitize_upload_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_upload_name(""), "upload.pdf");
        assert_eq!(sanitize_upload_name("..."), "upload.pdf");
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://x.org/papers/plan.pdf"), "plan.pdf");
        assert_eq!(filename_from_url("https://x.org/papers/"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn resolve_local_rejects_missing_and_non_pdf() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.err().unwrap();
        assert!(matches!(err, NavigatorError::FileNotFound { .. }));

        let tmp = tempfile::tempdir().unwrap();
        let txt = tmp.path().join("notes.pdf");
        std::fs::write(&txt, "just text").unwrap();
        let err = resolve_input(txt.to_str().unwrap(), 5).await.err().unwrap();
        assert!(matches!(err, NavigatorError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn resolve_local_accepts_pdf_magic() {
        let tmp = tempfile::tempdir().unwrap();
        let pdf = tmp.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n%%EOF").unwrap();
        let resolved = resolve_input(pdf.to_str().unwrap(), 5).await.unwrap();
        assert!(resolved.is_local());
        assert_eq!(resolved.path(), pdf.as_path());
    }
}
