// Parser module - Go source frontend
use std::path::Path;

use crate::ast::SourceFile;
use crate::{ConvertError, Result};

pub mod go;

pub use go::GoParser;

/// Syntax error reported against 1-based line and column numbers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Trait for source frontends feeding the converter
pub trait Parser: Send {
    /// Parse source text into the converter's tree
    fn parse(&mut self, source: &str) -> std::result::Result<SourceFile, ParseError>;

    /// Read and parse a file
    fn parse_file(&mut self, path: &Path) -> Result<SourceFile> {
        let source = std::fs::read_to_string(path).map_err(|source| ConvertError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&source).map_err(|source| ConvertError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get parser name for debugging
    fn name(&self) -> &'static str;
}
