//! Post-processing: deterministic cleanup of model-generated step reports.
//!
//! Models occasionally wrap a whole answer in a ```` ```markdown ```` fence,
//! emit `\r\n` line endings or sprinkle zero-width characters into headings.
//! These rules fix such quirks without touching content, so every saved
//! report looks the same on disk regardless of the provider behind it.
//!
//! Generation steps additionally embed whole source files in their answer.
//! [`split_auxiliary_files`] pulls those out so the engine can write them as
//! real files next to the summary document.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Apply all cleanup rules to a raw step answer.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Ensure the file ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        // A fenced answer that contains further fences is a code listing, not a wrapper.
        Some(caps) if !caps[1].contains("\n```") => caps[1].to_string(),
        _ => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 6: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Auxiliary files ──────────────────────────────────────────────────────────

/// A generated file embedded in a generation step's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryFile {
    /// Relative path, already checked by [`safe_relative_path`].
    pub path: PathBuf,
    pub content: String,
}

static RE_FILE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*<!--\s*file:\s*(.+?)\s*-->\s*$").unwrap());

/// Split `<!-- file: path -->` + fenced block pairs out of `markdown`.
///
/// Returns the remaining summary and the extracted files. A marker with an
/// unsafe path, or one not followed by a fence, is left in the summary as is.
/// Each extracted block is replaced by a one-line pointer.
pub fn split_auxiliary_files(markdown: &str) -> (String, Vec<AuxiliaryFile>) {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut summary: Vec<String> = Vec::with_capacity(lines.len());
    let mut files = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let extracted = RE_FILE_MARKER
            .captures(lines[i])
            .and_then(|caps| safe_relative_path(&caps[1]))
            .and_then(|path| read_fenced_block(&lines, i + 1).map(|(body, end)| (path, body, end)));

        match extracted {
            Some((path, content, end)) => {
                summary.push(format!("Generated file: `{}`", path.display()));
                files.push(AuxiliaryFile { path, content });
                i = end + 1;
            }
            None => {
                summary.push(lines[i].to_string());
                i += 1;
            }
        }
    }

    (summary.join("\n"), files)
}

/// Read the fenced block opening at or just after `start` (blank lines are
/// skipped). Returns the body and the index of the closing fence.
///
/// Inner fences nest: a backtick line with an info string opens an inner
/// block and the next bare fence at least as long closes it. The outer block
/// ends at a bare fence at least as long as its opener once no inner block
/// is open.
fn read_fenced_block(lines: &[&str], start: usize) -> Option<(String, usize)> {
    let open = (start..lines.len()).find(|&j| !lines[j].trim().is_empty())?;
    let (ticks, _) = fence_of(lines[open])?;

    let mut inner: Vec<usize> = Vec::new();
    let mut close = None;
    for (j, line) in lines.iter().enumerate().skip(open + 1) {
        let Some((run, info)) = fence_of(line) else {
            continue;
        };
        match inner.last() {
            Some(&top) if info.is_empty() => {
                if run >= top {
                    inner.pop();
                }
            }
            _ if !info.is_empty() => inner.push(run),
            _ if run >= ticks => {
                close = Some(j);
                break;
            }
            _ => {}
        }
    }
    let close = close?;

    let mut body = lines[open + 1..close].join("\n");
    body.push('\n');
    Some((body, close))
}

/// Backtick count and info string of a fence line, `None` for other lines.
fn fence_of(line: &str) -> Option<(usize, &str)> {
    let t = line.trim();
    let run = t.chars().take_while(|c| *c == '`').count();
    (run >= 3).then(|| (run, t[run..].trim()))
}

/// Accept only plain relative paths: no root, no drive prefix, no `..`.
pub fn safe_relative_path(raw: &str) -> Option<PathBuf> {
    let normalised = raw.trim().trim_matches('`').replace('\\', "/");
    if normalised.is_empty() || normalised.starts_with('/') || normalised.contains(':') {
        return None;
    }
    let path = Path::new(&normalised);
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n# Hello\nWorld\n```";
        assert_eq!(strip_markdown_fences(input), "# Hello\nWorld");
    }

    #[test]
    fn test_fenced_code_listing_is_kept() {
        let input = "```\nfn main() {}\n```\n\n```\nmore\n```";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello"), "hello\n");
        assert_eq!(ensure_final_newline("hello\n\n\n"), "hello\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn test_clean_markdown_full_pipeline() {
        let input = "```markdown\n# Goals\r\n\r\nShip it   \n\n\n\n\n\n## Risks\u{200B}\n```";
        let result = clean_markdown(input);
        assert!(result.starts_with("# Goals"));
        assert!(result.ends_with("## Risks\n"));
        assert!(!result.contains("\n\n\n\n"));
    }

    #[test]
    fn test_split_extracts_marked_blocks() {
        let input = "# Starter\n\n<!-- file: app/main.py -->\n```python\nprint('hi')\n```\n\nDone.";
        let (summary, files) = split_auxiliary_files(input);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("app/main.py"));
        assert_eq!(files[0].content, "print('hi')\n");
        assert!(summary.contains("Generated file: `app/main.py`"));
        assert!(!summary.contains("print('hi')"));
        assert!(summary.ends_with("Done."));
    }

    #[test]
    fn test_split_leaves_unsafe_paths_inline() {
        let input = "<!-- file: ../../etc/passwd -->\n```\nroot\n```";
        let (summary, files) = split_auxiliary_files(input);
        assert!(files.is_empty());
        assert_eq!(summary, input);
    }

    #[test]
    fn test_split_requires_a_fence() {
        let input = "<!-- file: notes.txt -->\nplain text";
        let (summary, files) = split_auxiliary_files(input);
        assert!(files.is_empty());
        assert_eq!(summary, input);
    }

    #[test]
    fn test_split_handles_longer_fences() {
        let input = "<!-- file: README.md -->\n````markdown\n```sh\nmake\n```\n````";
        let (_, files) = split_auxiliary_files(input);
        assert_eq!(files[0].content, "```sh\nmake\n```\n");
    }

    #[test]
    fn test_split_keeps_nested_code_blocks_in_the_file() {
        let input = "# Starter\n\n<!-- file: README.md -->\n```markdown\n# App\n\nInstall:\n\n```bash\npip install app\n```\n\nRun it.\n```\n";
        let (summary, files) = split_auxiliary_files(input);
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0].content,
            "# App\n\nInstall:\n\n```bash\npip install app\n```\n\nRun it.\n"
        );
        assert_eq!(summary, "# Starter\n\nGenerated file: `README.md`");
    }

    #[test]
    fn test_split_bare_inner_fences_under_longer_opener() {
        let input = "<!-- file: docs/usage.md -->\n````\nExample:\n```\nmake run\n```\nEnd.\n````\nAfter.";
        let (summary, files) = split_auxiliary_files(input);
        assert_eq!(files[0].content, "Example:\n```\nmake run\n```\nEnd.\n");
        assert!(summary.ends_with("After."));
    }

    #[test]
    fn test_split_unclosed_block_stays_inline() {
        let input = "<!-- file: a.md -->\n```markdown\n```bash\nls\n```";
        let (summary, files) = split_auxiliary_files(input);
        assert!(files.is_empty());
        assert_eq!(summary, input);
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(safe_relative_path("src/lib.rs"), Some(PathBuf::from("src/lib.rs")));
        assert_eq!(safe_relative_path("./a\\b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(safe_relative_path("/etc/passwd"), None);
        assert_eq!(safe_relative_path("C:/x"), None);
        assert_eq!(safe_relative_path("a/../../b"), None);
        assert_eq!(safe_relative_path("  "), None);
        assert_eq!(safe_relative_path("."), None);
    }
}
