//! Encoding-safe reading of files the engine wrote.
//!
//! Engine output is mostly UTF-8, but generated files occasionally arrive in a
//! legacy single-byte encoding. Decoding goes:
//!
//! 1. strict UTF-8 (a leading BOM is dropped);
//! 2. statistical detection with `chardetng`, decoding strictly with the
//!    guessed encoding when the guess is conclusive;
//! 3. Windows-1252, which maps every byte and therefore cannot fail.
//!
//! Decoding never fails. I/O errors and the size guard come back as a
//! [`FileReadError`] value for the caller to show next to the file.

use crate::error::FileReadError;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Text decoded from raw bytes, with the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode bytes following the fallback chain described in the module docs.
pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(body) {
        return DecodedText {
            text: text.to_string(),
            encoding: UTF_8.name(),
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (guess, conclusive) = detector.guess_assess(None, false);
    if conclusive {
        if let Some(text) = decode_strict(guess, bytes) {
            return DecodedText {
                text,
                encoding: guess.name(),
            };
        }
        debug!("Detected {} but bytes do not decode cleanly", guess.name());
    }

    let (text, _, _) = WINDOWS_1252.decode(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding: WINDOWS_1252.name(),
    }
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|cow| cow.into_owned())
}

/// Read a file as text, detecting its encoding when it is not UTF-8.
pub fn safe_read(path: &Path) -> Result<String, FileReadError> {
    safe_read_limited(path, u64::MAX)
}

/// [`safe_read`] that refuses files larger than `max_bytes`.
pub fn safe_read_limited(path: &Path, max_bytes: u64) -> Result<String, FileReadError> {
    let name = display_name(path);
    let io_err = |e: std::io::Error| FileReadError::Io {
        name: name.clone(),
        cause: e.to_string(),
    };

    let file = std::fs::File::open(path).map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();
    if size > max_bytes {
        return Err(FileReadError::TooLarge {
            name,
            size,
            limit: max_bytes,
        });
    }

    let mut bytes = Vec::with_capacity(size as usize);
    // The file may grow between stat and read; never read past the limit.
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(io_err)?;
    if bytes.len() as u64 > max_bytes {
        return Err(FileReadError::TooLarge {
            name,
            size: bytes.len() as u64,
            limit: max_bytes,
        });
    }

    let decoded = decode_bytes(&bytes);
    debug!("Read {} as {}", path.display(), decoded.encoding);
    Ok(decoded.text)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_is_read_verbatim() {
        let d = decode_bytes("# Überblick — ok".as_bytes());
        assert_eq!(d.text, "# Überblick — ok");
        assert_eq!(d.encoding, "UTF-8");
    }

    #[test]
    fn utf8_bom_is_dropped() {
        let d = decode_bytes(b"\xEF\xBB\xBFhello");
        assert_eq!(d.text, "hello");
    }

    #[test]
    fn windows_1252_text_is_recovered() {
        // "Caf\xe9 \x93quoted\x94 na\xefve" in Windows-1252
        let bytes = b"Caf\xe9 \x93quoted\x94 na\xefve r\xe9sum\xe9 d\xe9j\xe0 vu";
        let d = decode_bytes(bytes);
        assert!(d.text.contains("Café"), "got: {}", d.text);
        assert!(d.text.contains("résumé"), "got: {}", d.text);
    }

    #[test]
    fn arbitrary_bytes_always_decode() {
        // Deterministic pseudo-random byte strings (xorshift), many lengths.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        for len in 0..256usize {
            let bytes: Vec<u8> = (0..len)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state & 0xFF) as u8
                })
                .collect();
            let d = decode_bytes(&bytes);
            if len > 0 {
                assert!(!d.text.is_empty(), "len {len} decoded to nothing");
            }
        }
    }

    #[test]
    fn every_single_byte_decodes() {
        for b in 0..=255u8 {
            let d = decode_bytes(&[b, b'a', b]);
            assert!(d.text.chars().count() >= 1);
        }
    }

    #[test]
    fn safe_read_reports_missing_file_by_name() {
        let err = safe_read(Path::new("/no/such/dir/report.md")).unwrap_err();
        assert_eq!(err.file_name(), "report.md");
        assert!(matches!(err, FileReadError::Io { .. }));
    }

    #[test]
    fn safe_read_limited_rejects_large_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("big.md");
        std::fs::write(&path, vec![b'x'; 64]).unwrap();
        let err = safe_read_limited(&path, 16).unwrap_err();
        assert!(matches!(err, FileReadError::TooLarge { size: 64, limit: 16, .. }));
        assert_eq!(safe_read_limited(&path, 64).unwrap().len(), 64);
    }

    #[test]
    fn safe_read_decodes_legacy_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("legacy.md");
        std::fs::write(&path, b"na\xefve caf\xe9 cr\xe8me br\xfbl\xe9e").unwrap();
        let text = safe_read(&path).unwrap();
        assert!(text.contains("café"), "got: {text}");
    }
}
