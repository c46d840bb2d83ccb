//! Driver for the `maptable` command: target discovery and the per-file run.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use maptable_core::tracer::{FileTracer, FileTransformationSummary};
use maptable_core::ConvertConfig;
use tracing::debug;
use walkdir::WalkDir;

/// Files to process for `target`.
///
/// A file is returned as-is whatever its name. A directory is walked
/// recursively in file-name order, keeping regular files ending in `suffix`.
pub fn collect_targets(target: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !target.exists() {
        bail!("Target does not exist: {}", target.display());
    }
    if target.is_file() {
        return Ok(vec![target.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(target).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", target.display()))?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(suffix) {
            files.push(entry.into_path());
        }
    }
    debug!("Found {} test file(s) under {}", files.len(), target.display());
    Ok(files)
}

/// Process every target file in order, stopping at the first failure
pub fn run(target: &Path, config: ConvertConfig) -> Result<FileTransformationSummary> {
    let files = collect_targets(target, &config.file_suffix)?;
    let mut tracer = FileTracer::new(config)?;

    let mut summary = FileTransformationSummary::new();
    for path in files {
        let report = tracer
            .process_file(&path)
            .with_context(|| format!("Error processing {}", path.display()))?;
        summary.record(&report);
    }

    for stats in tracer.stats().values() {
        debug!(
            "{}: {} applied, {} converted ({:.0}%), {} errors",
            stats.rule_name,
            stats.applications,
            stats.transformations,
            stats.success_rate() * 100.0,
            stats.errors
        );
    }
    Ok(summary)
}
