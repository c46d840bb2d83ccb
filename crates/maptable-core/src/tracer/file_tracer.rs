/*!
# FileTracer - File-based Transformation System

Reads Go test files, applies the registered rules to their test functions,
and replaces each changed file through a backup so a failed write never
loses the original.
*/

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::mem;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::ast::{SourceFile, Stmt};
use crate::parser::{GoParser, Parser};
use crate::{ConvertConfig, ConvertError, Result};

use super::loop_rewriter::LoopRewriter;
use super::patterns::AstWalker;
use super::rules::{RuleStats, TransformationRule};
use super::table_rules::SliceToMapConverter;
use super::{Rewrite, TransformResult, TransformationContext};

/// File-based transformation system
///
/// Runs the tree pass (rules over parsed test functions) and the textual loop
/// pass over one file at a time.
pub struct FileTracer {
    config: ConvertConfig,
    parser: GoParser,
    rules: Vec<Box<dyn TransformationRule>>,
    stats: HashMap<String, RuleStats>,
    loop_rewriter: LoopRewriter,
}

impl FileTracer {
    /// Create a tracer with the table-test converter registered
    pub fn new(config: ConvertConfig) -> Result<Self> {
        let mut tracer = Self {
            parser: GoParser::new()?,
            loop_rewriter: LoopRewriter::from_config(&config)?,
            rules: Vec::new(),
            stats: HashMap::new(),
            config,
        };
        let converter = SliceToMapConverter::from_config(&tracer.config);
        tracer.add_rule(Box::new(converter));
        Ok(tracer)
    }

    /// Add a transformation rule; rules run in descending priority
    pub fn add_rule(&mut self, rule: Box<dyn TransformationRule>) {
        let rule_name = rule.name().to_string();
        self.stats
            .insert(rule_name.clone(), RuleStats::new(rule_name));
        self.rules.push(rule);
        self.rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority()));
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Get transformation statistics
    pub fn stats(&self) -> &HashMap<String, RuleStats> {
        &self.stats
    }

    /// Parse `source` and run every rule over the test functions. Returns the
    /// rewritten tree and the number of statements that changed.
    pub fn convert_source(&mut self, path: &Path, source: &str) -> Result<(SourceFile, usize)> {
        let mut file = self.parser.parse(source).map_err(|source| ConvertError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let prefix = self.config.test_prefix.clone();
        let file_name = path.display().to_string();
        let mut changed = 0;
        for function in AstWalker::test_functions_mut(&mut file, &prefix) {
            let context = TransformationContext::new()
                .with_source_file(file_name.clone())
                .with_function_name(function.name.clone());

            let body = mem::take(&mut function.body);
            let mut rewritten = Vec::with_capacity(body.len());
            for stmt in body {
                let rewrite = self
                    .apply_rules(stmt, &context)
                    .map_err(|(rule, e)| ConvertError::Rule {
                        path: path.to_path_buf(),
                        rule,
                        message: format!("{e:#}"),
                    })?;
                if rewrite.is_changed() {
                    debug!("Rewrote table in {}", function.name);
                    changed += 1;
                }
                rewritten.push(rewrite.into_inner());
            }
            function.body = rewritten;
        }

        Ok((file, changed))
    }

    /// Offer one statement to each rule in priority order
    fn apply_rules(
        &mut self,
        stmt: Stmt,
        context: &TransformationContext,
    ) -> std::result::Result<Rewrite<Stmt>, (&'static str, anyhow::Error)> {
        let mut current = Rewrite::Unchanged(stmt);
        for rule in &self.rules {
            if !rule.matches(current_stmt(&current), context) {
                continue;
            }

            let stats = self
                .stats
                .entry(rule.name().to_string())
                .or_insert_with(|| RuleStats::new(rule.name().to_string()));
            stats.applications += 1;

            let was_changed = current.is_changed();
            let result: TransformResult<Rewrite<Stmt>> = rule.transform(current.into_inner(), context);
            match result {
                Ok(rewrite) => {
                    if rewrite.is_changed() {
                        stats.transformations += 1;
                    }
                    current = if was_changed {
                        Rewrite::Changed(rewrite.into_inner())
                    } else {
                        rewrite
                    };
                }
                Err(e) => {
                    stats.errors += 1;
                    return Err((rule.name(), e));
                }
            }
        }
        Ok(current)
    }

    /// Convert one file in place. Unchanged files are never written.
    pub fn convert_file(&mut self, path: &Path) -> Result<ConversionOutcome> {
        let source = fs::read_to_string(path).map_err(|source| ConvertError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let (file, tables) = self.convert_source(path, &source)?;
        if tables == 0 {
            info!("No slice-based table tests found in {}", path.display());
            return Ok(ConversionOutcome::Unchanged);
        }

        if self.config.dry_run {
            info!("Would convert {} table(s) in {}", tables, path.display());
            return Ok(ConversionOutcome::WouldConvert { tables });
        }

        replace_with(path, &self.config.backup_suffix, |out| file.write_to(out))?;
        info!("Successfully converted {} table(s) in {}", tables, path.display());
        Ok(ConversionOutcome::Converted { tables })
    }

    /// Tree pass followed by the loop pass on the same file
    pub fn process_file(&mut self, path: &Path) -> Result<FileReport> {
        info!("Processing file: {}", path.display());
        let outcome = self.convert_file(path)?;
        let loops_rewritten = self.loop_rewriter.rewrite_file(path)?;
        Ok(FileReport {
            path: path.to_path_buf(),
            outcome,
            loops_rewritten,
        })
    }
}

fn current_stmt(rewrite: &Rewrite<Stmt>) -> &Stmt {
    match rewrite {
        Rewrite::Changed(stmt) | Rewrite::Unchanged(stmt) => stmt,
    }
}

/// Replace `path` with whatever `write` produces.
///
/// The original is renamed to `<path><backup_suffix>` first. On success the
/// backup is deleted; on failure the partial file is removed and the backup
/// is moved back, so the original is intact either way.
pub fn replace_with<F>(path: &Path, backup_suffix: &str, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let backup = backup_path(path, backup_suffix);
    fs::rename(path, &backup).map_err(|source| ConvertError::Backup {
        path: path.to_path_buf(),
        source,
    })?;

    let written = File::create(path).and_then(|mut out| {
        write(&mut out)?;
        out.flush()?;
        out.sync_all()
    });

    match written {
        Ok(()) => {
            if let Err(e) = fs::remove_file(&backup) {
                warn!("Could not remove backup {}: {}", backup.display(), e);
            }
            Ok(())
        }
        Err(source) => {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Could not remove partial file {}: {}", path.display(), e);
                }
            }
            fs::rename(&backup, path).map_err(|restore| ConvertError::Restore {
                path: path.to_path_buf(),
                backup: backup.clone(),
                source: restore,
            })?;
            warn!("Write failed, restored {} from backup", path.display());
            Err(ConvertError::Write {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// What the tree pass did to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    Unchanged,
    Converted { tables: usize },
    /// Dry run: the file would have been rewritten
    WouldConvert { tables: usize },
}

impl ConversionOutcome {
    pub fn tables(&self) -> usize {
        match self {
            ConversionOutcome::Unchanged => 0,
            ConversionOutcome::Converted { tables } | ConversionOutcome::WouldConvert { tables } => {
                *tables
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: ConversionOutcome,
    pub loops_rewritten: bool,
}

/// Summary of file transformation results
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileTransformationSummary {
    pub files_processed: u64,
    pub files_converted: u64,
    pub tables_converted: u64,
    pub loops_rewritten: u64,
}

impl FileTransformationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: &FileReport) {
        self.files_processed += 1;
        if report.outcome != ConversionOutcome::Unchanged {
            self.files_converted += 1;
        }
        self.tables_converted += report.outcome.tables() as u64;
        if report.loops_rewritten {
            self.loops_rewritten += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("pkg/a_test.go"), ".backup"),
            PathBuf::from("pkg/a_test.go.backup")
        );
    }

    #[test]
    fn test_rules_sorted_by_priority() -> anyhow::Result<()> {
        let mut tracer = FileTracer::new(ConvertConfig::default())?;
        tracer.add_rule(Box::new(
            SliceToMapConverter::new("cases", "name").with_priority(300),
        ));
        let priorities: Vec<u32> = tracer.rules.iter().map(|rule| rule.priority()).collect();
        assert_eq!(priorities, vec![300, 100]);
        assert_eq!(tracer.config().table_ident, "tests");
        assert_eq!(tracer.stats().len(), 1);
        Ok(())
    }

    #[test]
    fn test_stats_count_applications() -> anyhow::Result<()> {
        let mut tracer = FileTracer::new(ConvertConfig::default())?;
        let source = "package demo\n\nfunc TestX(t *testing.T) {\n\ttests := []struct {\n\t\tname string\n\t}{\n\t\t{name: \"a\"},\n\t}\n\t_ = tests\n}\n";
        let (file, changed) = tracer.convert_source(Path::new("x_test.go"), source)?;
        assert_eq!(changed, 1);
        assert!(file.print().contains("\"a\": {},"));

        let stats = &tracer.stats()["SliceToMapConverter"];
        assert_eq!(stats.applications, 1);
        assert_eq!(stats.transformations, 1);
        assert_eq!(stats.errors, 0);
        Ok(())
    }

    #[test]
    fn test_non_test_functions_are_skipped() -> anyhow::Result<()> {
        let mut tracer = FileTracer::new(ConvertConfig::default())?;
        let source = "package demo\n\nfunc helper() {\n\ttests := []struct{ name string }{{name: \"a\"}}\n\t_ = tests\n}\n";
        let (file, changed) = tracer.convert_source(Path::new("x_test.go"), source)?;
        assert_eq!(changed, 0);
        assert_eq!(file.print(), source);
        Ok(())
    }

    #[test]
    fn test_summary_record() {
        let mut summary = FileTransformationSummary::new();
        summary.record(&FileReport {
            path: PathBuf::from("a_test.go"),
            outcome: ConversionOutcome::Converted { tables: 2 },
            loops_rewritten: true,
        });
        summary.record(&FileReport {
            path: PathBuf::from("b_test.go"),
            outcome: ConversionOutcome::Unchanged,
            loops_rewritten: false,
        });
        assert_eq!(
            summary,
            FileTransformationSummary {
                files_processed: 2,
                files_converted: 1,
                tables_converted: 2,
                loops_rewritten: 1,
            }
        );
    }
}
