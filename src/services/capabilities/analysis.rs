//! Structure Analyzer
//!
//! `CodeAnalysisCapability` backed by the `ignore` walker, so `.gitignore`d
//! paths (build output, vendored deps) are skipped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ignore::WalkBuilder;
use tracing::debug;

use automation_hub_core::{CodeAnalysisCapability, CoreError, CoreResult, StructureReport};

/// File names recognized as build manifests.
pub const MANIFEST_FILES: &[&str] = &[
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "requirements.txt",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "Gemfile",
    "composer.json",
];

/// Files larger than this are counted but not line-counted.
const MAX_LINE_COUNT_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct StructureAnalyzer;

impl StructureAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CodeAnalysisCapability for StructureAnalyzer {
    async fn analyze_structure(&self, project_path: &Path) -> CoreResult<StructureReport> {
        if !project_path.is_dir() {
            return Err(CoreError::not_found(format!(
                "Project path is not a directory: {}",
                project_path.display()
            )));
        }
        let root = project_path.to_path_buf();
        tokio::task::spawn_blocking(move || walk(&root))
            .await
            .map_err(|e| CoreError::internal(format!("Analysis task failed: {e}")))
    }
}

fn walk(root: &Path) -> StructureReport {
    let mut report = StructureReport {
        project_path: root.to_path_buf(),
        ..Default::default()
    };

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .follow_links(false)
        .git_ignore(true)
        .git_exclude(true)
        .require_git(false);

    for entry in builder.build() {
        let Ok(entry) = entry else {
            continue;
        };
        if entry.depth() == 0 {
            continue;
        }
        let path = entry.path();
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            report.total_directories += 1;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        report.total_files += 1;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        *report.files_by_extension.entry(ext).or_insert(0) += 1;

        if is_manifest(path) {
            report.manifests.push(relative(root, path));
        }
        report.total_lines += count_lines(path);
    }

    report.manifests.sort();
    debug!(
        root = %root.display(),
        files = report.total_files,
        dirs = report.total_directories,
        "Structure analysis finished"
    );
    report
}

fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| MANIFEST_FILES.contains(&n))
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Line count of a UTF-8 text file; binary, unreadable or huge files count 0.
fn count_lines(path: &Path) -> usize {
    let too_big = std::fs::metadata(path)
        .map(|m| m.len() > MAX_LINE_COUNT_BYTES)
        .unwrap_or(true);
    if too_big {
        return 0;
    }
    std::fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}
