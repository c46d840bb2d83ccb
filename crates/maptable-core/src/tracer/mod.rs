/*!
# Tracer - Table Test Transformation System

Rule-driven rewriting of Go test files. Two passes run over each file:

1. **Tree pass**: the file is parsed, every registered `TransformationRule`
   is offered the top-level statements of each test function, and the
   rewritten tree is printed back over the original file.
2. **Loop pass**: `LoopRewriter` updates the `for ... range` header and the
   `t.Run` call that consume the converted table.

## Architecture

- `TransformationRule`: Trait for statement rewriting rules
- `FileTracer`: Drives both passes over a file and replaces it safely
- `LoopRewriter`: Regex-based rewrite of loop headers and subtest names
- Pattern matching utilities for the Go tree
- Table-test rules (`table_rules`)

## Example Usage

```rust,ignore
use maptable_core::ConvertConfig;
use maptable_core::tracer::FileTracer;

let mut tracer = FileTracer::new(ConvertConfig::default())?;
let report = tracer.process_file("pkg/parse_test.go")?;
println!("{} tables converted", report.outcome.tables());
```
*/

pub mod file_tracer;
pub mod loop_rewriter;
pub mod patterns;
pub mod rules;
pub mod table_rules;

// Re-export main types
pub use file_tracer::{
    replace_with, ConversionOutcome, FileReport, FileTracer, FileTransformationSummary,
};
pub use loop_rewriter::LoopRewriter;
pub use patterns::{AstPattern, AstWalker, PatternMatcher};
pub use rules::{RuleStats, TransformationRule};
pub use table_rules::SliceToMapConverter;

// Common result type for transformations
pub type TransformResult<T> = anyhow::Result<T>;

#[derive(Debug, Clone, Default)]
pub struct TransformationContext {
    pub source_file: Option<String>,
    pub function_name: Option<String>,
}

impl TransformationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_file(mut self, file: String) -> Self {
        self.source_file = Some(file);
        self
    }

    pub fn with_function_name(mut self, name: String) -> Self {
        self.function_name = Some(name);
        self
    }
}

/// Result of offering a node to a rule: the node itself, flagged with
/// whether anything about it changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite<T> {
    Changed(T),
    Unchanged(T),
}

impl<T> Rewrite<T> {
    pub fn is_changed(&self) -> bool {
        matches!(self, Rewrite::Changed(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Rewrite::Changed(value) | Rewrite::Unchanged(value) => value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Rewrite<U> {
        match self {
            Rewrite::Changed(value) => Rewrite::Changed(f(value)),
            Rewrite::Unchanged(value) => Rewrite::Unchanged(f(value)),
        }
    }
}
