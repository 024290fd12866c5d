//! Result presentation: list, read and retrieve what the engine wrote.
//!
//! The three output directories are re-scanned from disk on every call, so a
//! later scan of the same run may show more files than an earlier one. Each
//! entry is marked with whether the engine reported writing it
//! ([`Artifact::in_manifest`]); files left over from earlier runs show up
//! too, unmarked.
//!
//! Reading is per file and never aborts the listing: a file that cannot be
//! read carries its [`FileReadError`] instead of content.

use crate::config::OutputLayout;
use crate::error::FileReadError;
use crate::pipeline::reader::safe_read_limited;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "rst", "adoc"];

const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "jsx", "ts", "tsx", "rs", "go", "java", "kt", "rb", "php", "c", "h", "cpp", "hpp",
    "cs", "swift", "scala", "sh", "bash", "ps1", "sql", "html", "css", "scss", "vue", "svelte",
    "json", "yaml", "yml", "toml", "ini", "cfg", "env", "xml", "dockerfile", "tf", "proto",
    "graphql", "ipynb",
];

/// What a discovered file is, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Document,
    Code,
    Other,
}

impl ArtifactKind {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if matches!(name.as_str(), "dockerfile" | "makefile" | ".gitignore" | ".env.example") {
            return ArtifactKind::Code;
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            ArtifactKind::Document
        } else if CODE_EXTENSIONS.contains(&ext.as_str()) {
            ArtifactKind::Code
        } else {
            ArtifactKind::Other
        }
    }
}

/// Content of a discovered file, or why it could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArtifactContent {
    Text { text: String },
    Unreadable { error: FileReadError },
}

impl ArtifactContent {
    pub fn text(&self) -> Option<&str> {
        match self {
            ArtifactContent::Text { text } => Some(text),
            ArtifactContent::Unreadable { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FileReadError> {
        match self {
            ArtifactContent::Text { .. } => None,
            ArtifactContent::Unreadable { error } => Some(error),
        }
    }
}

/// One file found in an output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    /// Path relative to its output directory, e.g. `starter_template/app/main.py`.
    pub name: String,
    pub kind: ArtifactKind,
    pub size: u64,
    pub content: ArtifactContent,
    /// Whether the engine reported writing this file during the run.
    pub in_manifest: bool,
}

/// The files of one output directory, split by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroup {
    /// Human label, e.g. "Project Analysis Output".
    pub label: String,
    pub path: PathBuf,
    pub documents: Vec<Artifact>,
    pub code: Vec<Artifact>,
    pub other: Vec<Artifact>,
}

impl DirectoryGroup {
    pub fn len(&self) -> usize {
        self.documents.len() + self.code.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.documents.iter().chain(&self.code).chain(&self.other)
    }
}

/// Everything found across the output directories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactListing {
    /// Non-empty groups only, in layout order.
    pub groups: Vec<DirectoryGroup>,
}

impl ArtifactListing {
    /// "Nothing generated yet": not an error.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(DirectoryGroup::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.groups.iter().flat_map(DirectoryGroup::iter)
    }

    /// Artifacts whose content could not be read.
    pub fn read_errors(&self) -> impl Iterator<Item = &FileReadError> {
        self.iter().filter_map(|a| a.content.error())
    }
}

/// `project_analysis_output` → `Project Analysis Output`.
pub fn group_label(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    name.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Scan the output directories and read every file found.
///
/// Missing directories are treated as empty. Only the generation directory
/// is scanned recursively.
pub fn scan_artifacts(layout: &OutputLayout, manifest: &[PathBuf], max_read_bytes: u64) -> ArtifactListing {
    let manifest: HashSet<&Path> = manifest.iter().map(PathBuf::as_path).collect();
    let mut groups = Vec::new();

    for dir in layout.dirs() {
        let max_depth = if dir == layout.generation_dir.as_path() {
            usize::MAX
        } else {
            1
        };
        let group = scan_directory(dir, max_depth, &manifest, max_read_bytes);
        if !group.is_empty() {
            groups.push(group);
        }
    }

    let listing = ArtifactListing { groups };
    debug!(
        "Scanned {} artifacts ({} unreadable)",
        listing.len(),
        listing.read_errors().count()
    );
    listing
}

fn scan_directory(
    dir: &Path,
    max_depth: usize,
    manifest: &HashSet<&Path>,
    max_read_bytes: u64,
) -> DirectoryGroup {
    let mut group = DirectoryGroup {
        label: group_label(dir),
        path: dir.to_path_buf(),
        documents: Vec::new(),
        code: Vec::new(),
        other: Vec::new(),
    };
    if !dir.is_dir() {
        return group;
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != std::ffi::OsStr::new(".git"));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path().to_path_buf();
        let name = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let content = match safe_read_limited(&path, max_read_bytes) {
            Ok(text) => ArtifactContent::Text { text },
            Err(error) => {
                warn!("{}", error);
                ArtifactContent::Unreadable { error }
            }
        };
        let artifact = Artifact {
            kind: ArtifactKind::from_path(&path),
            in_manifest: manifest.contains(path.as_path()),
            path,
            name,
            size,
            content,
        };
        match artifact.kind {
            ArtifactKind::Document => group.documents.push(artifact),
            ArtifactKind::Code => group.code.push(artifact),
            ArtifactKind::Other => group.other.push(artifact),
        }
    }

    group
}

/// Resolve a requested artifact path for retrieval.
///
/// Returns `None` unless `requested` names an existing file inside one of the
/// output directories.
pub fn resolve_artifact_path(layout: &OutputLayout, requested: &str) -> Option<PathBuf> {
    let path = PathBuf::from(requested);
    if layout.contains(&path) && path.is_file() {
        Some(path)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layout_in(tmp: &tempfile::TempDir) -> OutputLayout {
        let layout = OutputLayout::under(tmp.path());
        layout.ensure().unwrap();
        layout
    }

    #[test]
    fn empty_directories_mean_nothing_generated() {
        let tmp = tempfile::tempdir().unwrap();
        let listing = scan_artifacts(&layout_in(&tmp), &[], 1024);
        assert!(listing.is_empty());
        assert_eq!(listing.read_errors().count(), 0);
    }

    #[test]
    fn missing_directories_are_tolerated() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::under(tmp.path().join("never-created"));
        assert!(scan_artifacts(&layout, &[], 1024).is_empty());
    }

    #[test]
    fn unreadable_file_does_not_hide_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout_in(&tmp);
        fs::write(layout.analysis_dir.join("a_small.md"), "# fine").unwrap();
        fs::write(layout.analysis_dir.join("b_huge.md"), "x".repeat(500)).unwrap();
        fs::write(layout.analysis_dir.join("c_small.md"), "# also fine").unwrap();

        let listing = scan_artifacts(&layout, &[], 100);
        assert_eq!(listing.len(), 3);
        let errors: Vec<_> = listing.read_errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file_name(), "b_huge.md");
        let texts: Vec<_> = listing.iter().filter_map(|a| a.content.text()).collect();
        assert_eq!(texts, vec!["# fine", "# also fine"]);
    }

    #[test]
    fn only_generation_dir_is_recursive() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout_in(&tmp);
        fs::create_dir_all(layout.discovery_dir.join("nested")).unwrap();
        fs::write(layout.discovery_dir.join("nested/hidden.md"), "x").unwrap();
        fs::create_dir_all(layout.generation_dir.join("starter_template/app")).unwrap();
        fs::write(layout.generation_dir.join("starter_template/app/main.py"), "print()").unwrap();
        fs::write(layout.generation_dir.join("architecture_design.md"), "# Arch").unwrap();

        let listing = scan_artifacts(&layout, &[], 1024);
        assert_eq!(listing.groups.len(), 1);
        let group = &listing.groups[0];
        assert_eq!(group.label, "Code Output");
        assert_eq!(group.documents.len(), 1);
        assert_eq!(group.code.len(), 1);
        assert_eq!(group.code[0].name, "starter_template/app/main.py");
    }

    #[test]
    fn manifest_marks_reported_files() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout_in(&tmp);
        let fresh = layout.analysis_dir.join("project_goals.md");
        fs::write(&fresh, "new").unwrap();
        fs::write(layout.analysis_dir.join("stale.md"), "old").unwrap();

        let listing = scan_artifacts(&layout, &[fresh.clone()], 1024);
        for a in listing.iter() {
            assert_eq!(a.in_manifest, a.path == fresh, "{}", a.name);
        }
    }

    #[test]
    fn kinds_follow_extensions() {
        assert_eq!(ArtifactKind::from_path(Path::new("a/README.MD")), ArtifactKind::Document);
        assert_eq!(ArtifactKind::from_path(Path::new("src/app.tsx")), ArtifactKind::Code);
        assert_eq!(ArtifactKind::from_path(Path::new("Dockerfile")), ArtifactKind::Code);
        assert_eq!(ArtifactKind::from_path(Path::new("logo.png")), ArtifactKind::Other);
    }

    #[test]
    fn labels_are_title_cased() {
        assert_eq!(group_label(Path::new("out/project_analysis_output")), "Project Analysis Output");
        assert_eq!(group_label(Path::new("resource_output")), "Resource Output");
    }

    #[test]
    fn retrieval_is_confined_to_output_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = layout_in(&tmp);
        let report = layout.discovery_dir.join("datasets.md");
        fs::write(&report, "data").unwrap();
        fs::write(tmp.path().join("secret.txt"), "no").unwrap();

        assert_eq!(
            resolve_artifact_path(&layout, report.to_str().unwrap()),
            Some(report.clone())
        );
        let escape = layout.discovery_dir.join("../secret.txt");
        assert_eq!(resolve_artifact_path(&layout, escape.to_str().unwrap()), None);
        let missing = layout.discovery_dir.join("missing.md");
        assert_eq!(resolve_artifact_path(&layout, missing.to_str().unwrap()), None);
    }
}
