//! # Maptable Core
//!
//! Conversion engine that rewrites slice-based Go table tests into
//! map-based table tests:
//! - A typed view of the Go constructs involved (`ast`)
//! - A tree-sitter backed Go frontend (`parser`)
//! - Statement rules, pattern matching and the file driver (`tracer`)
//! - A textual pass that updates the loops consuming the table
//!
//! ```rust,ignore
//! use maptable_core::{ConvertConfig, tracer::FileTracer};
//!
//! let mut tracer = FileTracer::new(ConvertConfig::default())?;
//! let report = tracer.process_file("pkg/parse_test.go")?;
//! ```

#![warn(clippy::all)]

use std::path::PathBuf;

pub mod ast;
pub mod parser;
pub mod tracer;

// Re-export commonly used types
pub use ast::{SourceFile, Span, ToSource};
pub use parser::{GoParser, ParseError};
pub use tracer::{FileTracer, LoopRewriter, Rewrite, TransformationContext};

/// Maptable version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for maptable components.
///
/// `RUST_LOG` wins when set; otherwise the conversion crates log at `info`
/// (or `debug` when requested).
pub fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "maptable_core={level},maptable_cli={level},maptable={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Conversion settings shared by the tree pass and the loop pass
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Variable the table literal must be bound to
    pub table_ident: String,
    /// Record field that becomes the map key
    pub key_field: String,
    /// Functions whose name starts with this are test functions
    pub test_prefix: String,
    /// Files whose name ends with this are visited in directory mode
    pub file_suffix: String,
    /// Appended to a file path while it is being replaced
    pub backup_suffix: String,
    /// Compute and report changes without writing them
    pub dry_run: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            table_ident: "tests".to_string(),
            key_field: "name".to_string(),
            test_prefix: "Test".to_string(),
            file_suffix: "_test.go".to_string(),
            backup_suffix: ".backup".to_string(),
            dry_run: false,
        }
    }
}

impl ConvertConfig {
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// Error types for conversion operations
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// Source file could not be read
    #[error("failed to read file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source file is not valid Go
    #[error("failed to parse file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Original could not be moved aside before rewriting
    #[error("failed to create backup of {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rewritten file could not be created or written; the original was restored
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Original could not be moved back after a failed write
    #[error("failed to restore {} from {}: {source}", path.display(), backup.display())]
    Restore {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Loop rewrite could not be written
    #[error("failed to update for loop in {}: {source}", path.display())]
    LoopRewrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A transformation rule failed
    #[error("rule {rule} failed on {}: {message}", path.display())]
    Rule {
        path: PathBuf,
        rule: &'static str,
        message: String,
    },

    /// Go grammar could not be loaded
    #[error("failed to load Go grammar: {0}")]
    Language(String),

    /// Loop patterns could not be compiled
    #[error("invalid loop pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
