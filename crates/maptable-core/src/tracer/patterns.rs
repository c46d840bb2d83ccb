/*!
# AST Pattern Matching Utilities

Composable matchers over the Go tree, used by rules to decide whether a
statement has the shape they rewrite.
*/

use crate::ast::{Expr, FuncDecl, SourceFile, Stmt, TypeExpr};

/// Pattern matcher for tree nodes of type `N`
pub trait AstPattern<N: ?Sized> {
    /// Check if this pattern matches the given node
    fn matches(&self, node: &N) -> bool;
}

/// Pattern matcher utility
pub struct PatternMatcher;

impl PatternMatcher {
    /// Match any node satisfying a predicate
    pub fn node_type<N, F>(predicate: F) -> impl AstPattern<N>
    where
        F: Fn(&N) -> bool,
    {
        NodeTypeMatcher { predicate }
    }

    /// Match identifiers with a specific name
    pub fn identifier(name: &str) -> IdentifierMatcher {
        IdentifierMatcher {
            name: name.to_string(),
        }
    }

    /// Match `[]struct{...}{...}`, `[N]struct{...}{...}` and
    /// `[...]struct{...}{...}` literals
    pub fn sequence_of_records() -> impl AstPattern<Expr> {
        Self::node_type(|expr: &Expr| match expr {
            Expr::Composite(lit) => matches!(
                &lit.ty,
                Some(TypeExpr::Sequence { elem, .. }) if matches!(elem.as_ref(), TypeExpr::Struct(_))
            ),
            _ => false,
        })
    }

    /// Match `<ident> := <sequence of records>` with exactly one target and
    /// one value
    pub fn table_assignment(ident: &str) -> impl AstPattern<Stmt> {
        Self::all(
            TargetMatcher {
                target: Self::identifier(ident),
            },
            ValueMatcher {
                value: Self::sequence_of_records(),
            },
        )
    }

    /// Combine patterns with AND logic
    pub fn all<P1, P2>(p1: P1, p2: P2) -> AndPattern<P1, P2> {
        AndPattern { p1, p2 }
    }
}

/// Generic predicate matcher
struct NodeTypeMatcher<F> {
    predicate: F,
}

impl<N, F> AstPattern<N> for NodeTypeMatcher<F>
where
    F: Fn(&N) -> bool,
{
    fn matches(&self, node: &N) -> bool {
        (self.predicate)(node)
    }
}

/// Identifier name matcher
pub struct IdentifierMatcher {
    name: String,
}

impl AstPattern<Expr> for IdentifierMatcher {
    fn matches(&self, expr: &Expr) -> bool {
        expr.as_ident() == Some(self.name.as_str())
    }
}

/// Single-target short variable declaration whose target matches
struct TargetMatcher<P> {
    target: P,
}

impl<P: AstPattern<Expr>> AstPattern<Stmt> for TargetMatcher<P> {
    fn matches(&self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::ShortVarDecl(decl) => match decl.left.as_slice() {
                [target] => self.target.matches(target),
                _ => false,
            },
            Stmt::Other(_) => false,
        }
    }
}

/// Single-value short variable declaration whose value matches
struct ValueMatcher<P> {
    value: P,
}

impl<P: AstPattern<Expr>> AstPattern<Stmt> for ValueMatcher<P> {
    fn matches(&self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::ShortVarDecl(decl) => match decl.right.as_slice() {
                [value] => self.value.matches(value),
                _ => false,
            },
            Stmt::Other(_) => false,
        }
    }
}

/// AND pattern combinator
pub struct AndPattern<P1, P2> {
    p1: P1,
    p2: P2,
}

impl<N: ?Sized, P1: AstPattern<N>, P2: AstPattern<N>> AstPattern<N> for AndPattern<P1, P2> {
    fn matches(&self, node: &N) -> bool {
        self.p1.matches(node) && self.p2.matches(node)
    }
}

/// Traversal helpers over a parsed file
pub struct AstWalker;

impl AstWalker {
    /// Functions whose name starts with `prefix`
    pub fn test_functions_mut<'a>(
        file: &'a mut SourceFile,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a mut FuncDecl> + 'a {
        file.functions
            .iter_mut()
            .filter(move |function| function.name.starts_with(prefix))
    }
}
