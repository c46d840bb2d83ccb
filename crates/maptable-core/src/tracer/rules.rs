/*!
# Transformation Rules

Core trait and statistics for statement rewriting rules.
*/

use super::{Rewrite, TransformResult, TransformationContext};
use crate::ast::Stmt;

/// Core trait for transformation rules
///
/// A rule is offered each top-level statement of a test function. Rules see
/// the statement only when `matches` accepted it.
pub trait TransformationRule: Send + Sync {
    /// Human-readable name for this rule
    fn name(&self) -> &'static str;

    /// Detailed description of what this rule does
    fn description(&self) -> &'static str;

    /// Priority for rule ordering (higher priority runs first)
    fn priority(&self) -> u32 {
        100
    }

    /// Check if this rule applies to the given statement
    fn matches(&self, stmt: &Stmt, context: &TransformationContext) -> bool;

    /// Apply the transformation, handing the statement back either way
    fn transform(&self, stmt: Stmt, context: &TransformationContext)
        -> TransformResult<Rewrite<Stmt>>;
}

/// Rule execution statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RuleStats {
    pub rule_name: String,
    pub applications: u64,
    pub transformations: u64,
    pub errors: u64,
}

impl RuleStats {
    pub fn new(rule_name: String) -> Self {
        Self {
            rule_name,
            ..Self::default()
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.applications == 0 {
            0.0
        } else {
            (self.transformations as f64) / (self.applications as f64)
        }
    }
}
