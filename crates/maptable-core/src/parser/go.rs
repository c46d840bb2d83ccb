//! Go frontend built on tree-sitter.
//!
//! The concrete syntax tree is lowered into the small typed tree in
//! [`crate::ast`]. Lowering only looks at function bodies; declarations
//! outside functions stay in the untouched original text.

use tree_sitter::{Node, Tree};

use super::{ParseError, Parser};
use crate::ast::*;
use crate::{ConvertError, Result};

pub struct GoParser {
    parser: tree_sitter::Parser,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| ConvertError::Language(e.to_string()))?;
        Ok(Self { parser })
    }

    fn parse_tree(&mut self, source: &str) -> std::result::Result<Tree, ParseError> {
        let tree = self.parser.parse(source, None).ok_or_else(|| ParseError {
            line: 1,
            column: 1,
            message: "parser produced no tree".to_string(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let node = first_error(root).unwrap_or(root);
            let position = node.start_position();
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                let text = &source[node.byte_range()];
                let snippet = text.lines().next().unwrap_or_default().trim();
                format!("unexpected `{snippet}`")
            };
            return Err(ParseError {
                line: position.row + 1,
                column: position.column + 1,
                message,
            });
        }

        Ok(tree)
    }
}

impl Parser for GoParser {
    fn parse(&mut self, source: &str) -> std::result::Result<SourceFile, ParseError> {
        let tree = self.parse_tree(source)?;
        let functions = Lowering { src: source }.source_file(tree.root_node());
        Ok(SourceFile::new(source, functions))
    }

    fn name(&self) -> &'static str {
        "tree-sitter-go"
    }
}

/// Depth-first search for the first ERROR or MISSING node
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find_map(first_error);
    found
}

fn span(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

fn lit_kind(kind: &str) -> Option<LitKind> {
    match kind {
        "interpreted_string_literal" => Some(LitKind::InterpretedString),
        "raw_string_literal" => Some(LitKind::RawString),
        "int_literal" => Some(LitKind::Int),
        "float_literal" => Some(LitKind::Float),
        "imaginary_literal" => Some(LitKind::Imaginary),
        "rune_literal" => Some(LitKind::Rune),
        _ => None,
    }
}

/// Named children minus comments
fn significant_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    children
}

struct Lowering<'s> {
    src: &'s str,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        &self.src[node.byte_range()]
    }

    fn source_file(&self, root: Node<'_>) -> Vec<FuncDecl> {
        significant_children(root)
            .into_iter()
            .filter(|node| matches!(node.kind(), "function_declaration" | "method_declaration"))
            .filter_map(|node| self.function(node))
            .collect()
    }

    fn function(&self, node: Node<'_>) -> Option<FuncDecl> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let body = node
            .child_by_field_name("body")
            .map(|block| self.block(block))
            .unwrap_or_default();
        Some(FuncDecl {
            name,
            body,
            span: span(node),
        })
    }

    fn block(&self, node: Node<'_>) -> Vec<Stmt> {
        let children = significant_children(node);
        if let Some(list) = children.iter().find(|child| child.kind() == "statement_list") {
            return self.block(*list);
        }
        children.into_iter().map(|child| self.statement(child)).collect()
    }

    fn statement(&self, node: Node<'_>) -> Stmt {
        if node.kind() == "short_var_declaration" {
            if let Some(decl) = self.short_var_decl(node) {
                return Stmt::ShortVarDecl(decl);
            }
        }
        Stmt::Other(span(node))
    }

    fn short_var_decl(&self, node: Node<'_>) -> Option<ShortVarDecl> {
        let left = node.child_by_field_name("left")?;
        let right = node.child_by_field_name("right")?;
        Some(ShortVarDecl {
            left: self.expression_list(left),
            right: self.expression_list(right),
            span: span(node),
            rhs_span: span(right),
            indent: self.indent_at(node.start_byte()),
        })
    }

    fn expression_list(&self, node: Node<'_>) -> Vec<Expr> {
        if node.kind() != "expression_list" {
            return vec![self.expr(node)];
        }
        significant_children(node)
            .into_iter()
            .map(|child| self.expr(child))
            .collect()
    }

    fn indent_at(&self, pos: usize) -> String {
        let line_start = self.src[..pos].rfind('\n').map_or(0, |i| i + 1);
        self.src[line_start..pos]
            .chars()
            .take_while(|c| matches!(c, ' ' | '\t'))
            .collect()
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        if let Some(kind) = lit_kind(node.kind()) {
            return Expr::BasicLit(BasicLit {
                kind,
                value: self.text(node).to_string(),
                span: span(node),
            });
        }

        match node.kind() {
            "identifier" | "field_identifier" => Expr::Ident(Ident {
                name: self.text(node).to_string(),
                span: span(node),
            }),
            "composite_literal" => match node.child_by_field_name("body") {
                Some(body) => {
                    let ty = node.child_by_field_name("type").map(|ty| self.type_expr(ty));
                    Expr::Composite(
                        CompositeLit::new(ty, self.elements(body), span(node), span(body))
                            .with_comments(self.comments(body)),
                    )
                }
                None => Expr::Opaque(span(node)),
            },
            "literal_value" => Expr::Composite(
                CompositeLit::new(None, self.elements(node), span(node), span(node))
                    .with_comments(self.comments(node)),
            ),
            "literal_element" => match significant_children(node).first() {
                Some(inner) => self.expr(*inner),
                None => Expr::Opaque(span(node)),
            },
            _ => Expr::Opaque(span(node)),
        }
    }

    fn elements(&self, body: Node<'_>) -> Vec<Element> {
        significant_children(body)
            .into_iter()
            .map(|child| match child.kind() {
                "keyed_element" => self.keyed_element(child),
                _ => Element::Value(self.expr(child)),
            })
            .collect()
    }

    /// Comments between the braces of a literal. One is trailing when no
    /// line break separates it from the element before it.
    fn comments(&self, body: Node<'_>) -> Vec<Comment> {
        let mut cursor = body.walk();
        let mut previous_end = None;
        let mut comments = Vec::new();
        for child in body.named_children(&mut cursor) {
            if child.kind() == "comment" {
                let trailing = previous_end
                    .is_some_and(|end| !self.src[end..child.start_byte()].contains('\n'));
                comments.push(Comment {
                    span: span(child),
                    trailing,
                });
            } else {
                previous_end = Some(child.end_byte());
            }
        }
        comments
    }

    fn keyed_element(&self, node: Node<'_>) -> Element {
        let parts = significant_children(node);
        let key = node
            .child_by_field_name("key")
            .or_else(|| parts.first().copied());
        let value = node
            .child_by_field_name("value")
            .or_else(|| parts.last().copied());

        match (key, value) {
            (Some(key), Some(value)) if key != value => Element::Keyed(KeyedElement {
                key: self.expr(key),
                value: self.expr(value),
                span: span(node),
            }),
            _ => Element::Value(Expr::Opaque(span(node))),
        }
    }

    fn type_expr(&self, node: Node<'_>) -> TypeExpr {
        let sequence = match node.kind() {
            "slice_type" => Some(SequenceKind::Slice),
            "array_type" => Some(SequenceKind::Array),
            "implicit_length_array_type" => Some(SequenceKind::ImplicitArray),
            _ => None,
        };

        if let Some(kind) = sequence {
            return match node.child_by_field_name("element") {
                Some(elem) => TypeExpr::Sequence {
                    kind,
                    elem: Box::new(self.type_expr(elem)),
                    span: span(node),
                },
                None => TypeExpr::Opaque(span(node)),
            };
        }

        match node.kind() {
            "map_type" => {
                match (
                    node.child_by_field_name("key"),
                    node.child_by_field_name("value"),
                ) {
                    (Some(key), Some(value)) => TypeExpr::Map {
                        key: Box::new(self.type_expr(key)),
                        value: Box::new(self.type_expr(value)),
                        span: span(node),
                    },
                    _ => TypeExpr::Opaque(span(node)),
                }
            }
            "struct_type" => TypeExpr::Struct(self.struct_type(node)),
            _ => TypeExpr::Opaque(span(node)),
        }
    }

    fn struct_type(&self, node: Node<'_>) -> StructType {
        let fields = significant_children(node)
            .into_iter()
            .filter(|child| child.kind() == "field_declaration_list")
            .flat_map(significant_children)
            .filter(|child| child.kind() == "field_declaration")
            .map(|decl| self.field_decl(decl))
            .collect();
        StructType::new(fields, span(node))
    }

    fn field_decl(&self, node: Node<'_>) -> FieldDecl {
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .map(|name| Ident {
                name: self.text(name).to_string(),
                span: span(name),
            })
            .collect();
        let ty = node
            .child_by_field_name("type")
            .map(span)
            .unwrap_or_else(|| span(node));
        FieldDecl::new(names, ty, span(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE_TEST: &str = r#"package demo

import "testing"

func TestAdd(t *testing.T) {
	tests := []struct {
		name string
		val  int
	}{
		{name: "b", val: 2},
		{name: "a", val: 1},
	}
	for _, tt := range tests {
		t.Run(tt.name, func(t *testing.T) {})
	}
}
"#;

    fn parse(source: &str) -> SourceFile {
        let mut parser = GoParser::new().expect("grammar loads");
        parser.parse(source).expect("valid Go")
    }

    fn table_decl(file: &SourceFile) -> &ShortVarDecl {
        file.functions[0]
            .body
            .iter()
            .find_map(|stmt| match stmt {
                Stmt::ShortVarDecl(decl) => Some(decl),
                Stmt::Other(_) => None,
            })
            .expect("short var decl in body")
    }

    #[test]
    fn test_lowers_table_declaration() {
        let file = parse(TABLE_TEST);
        assert_eq!(file.functions.len(), 1);
        assert_eq!(file.functions[0].name, "TestAdd");
        assert_eq!(file.functions[0].body.len(), 2);

        let decl = table_decl(&file);
        assert_eq!(decl.left[0].as_ident(), Some("tests"));
        assert_eq!(decl.indent, "\t");

        let Expr::Composite(lit) = &decl.right[0] else {
            panic!("expected composite literal, got {:?}", decl.right[0]);
        };
        let Some(TypeExpr::Sequence { kind, elem, .. }) = &lit.ty else {
            panic!("expected sequence type, got {:?}", lit.ty);
        };
        assert_eq!(*kind, SequenceKind::Slice);
        let TypeExpr::Struct(st) = elem.as_ref() else {
            panic!("expected struct element type");
        };
        let names: Vec<_> = st.fields.iter().map(|f| f.names[0].name.as_str()).collect();
        assert_eq!(names, vec!["name", "val"]);

        assert_eq!(lit.elements.len(), 2);
        let record = lit.elements[0].as_record().expect("record element");
        let (index, value) = record.field("name").expect("name field");
        assert_eq!(index, 0);
        let Expr::BasicLit(key) = value else {
            panic!("expected literal key");
        };
        assert_eq!(key.unquoted(), Some("b"));
    }

    #[test]
    fn test_unmodified_file_prints_identically() {
        let file = parse(TABLE_TEST);
        assert_eq!(file.print(), TABLE_TEST);
    }

    #[test]
    fn test_methods_are_functions() {
        let file = parse("package demo\n\ntype S struct{}\n\nfunc (s S) TestM() {\n\tx := 1\n}\n");
        assert_eq!(file.functions.len(), 1);
        assert_eq!(file.functions[0].name, "TestM");
        assert!(matches!(file.functions[0].body[0], Stmt::ShortVarDecl(_)));
    }

    #[test]
    fn test_array_and_implicit_array_types() {
        let file = parse(
            "package demo\n\nfunc TestA() {\n\ta := [2]struct{ v int }{}\n\tb := [...]struct{ v int }{}\n}\n",
        );
        let kinds: Vec<_> = file.functions[0]
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::ShortVarDecl(decl) => match &decl.right[0] {
                    Expr::Composite(CompositeLit {
                        ty: Some(TypeExpr::Sequence { kind, .. }),
                        ..
                    }) => Some(*kind),
                    _ => None,
                },
                Stmt::Other(_) => None,
            })
            .collect();
        assert_eq!(kinds, vec![SequenceKind::Array, SequenceKind::ImplicitArray]);
    }

    #[test]
    fn test_grouped_field_names() {
        let file = parse(
            "package demo\n\nfunc TestG() {\n\ttests := []struct{ name, desc string }{}\n}\n",
        );
        let decl = table_decl(&file);
        let Expr::Composite(lit) = &decl.right[0] else {
            panic!("expected composite literal");
        };
        let Some(TypeExpr::Sequence { elem, .. }) = &lit.ty else {
            panic!("expected sequence type");
        };
        let TypeExpr::Struct(st) = elem.as_ref() else {
            panic!("expected struct");
        };
        let names: Vec<_> = st.fields[0].names.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["name", "desc"]);
    }

    #[test]
    fn test_parse_file_reports_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let good = dir.path().join("good_test.go");
        let bad = dir.path().join("bad_test.go");
        std::fs::write(&good, TABLE_TEST)?;
        std::fs::write(&bad, "package demo\n\nfunc (\n")?;

        let mut parser = GoParser::new()?;
        assert_eq!(parser.name(), "tree-sitter-go");
        assert_eq!(parser.parse_file(&good)?.print(), TABLE_TEST);

        let err = parser.parse_file(&bad).expect_err("invalid Go");
        assert!(matches!(err, ConvertError::Parse { ref path, .. } if path == &bad));

        let missing = parser.parse_file(&dir.path().join("missing_test.go"));
        assert!(matches!(missing, Err(ConvertError::Read { .. })));
        Ok(())
    }

    #[test]
    fn test_literal_comments_are_kept() {
        let source = "package demo\n\nfunc TestC() {\n\ttests := []struct{ name string }{\n\t\t// first\n\t\t{name: \"a\"}, // after a\n\t\t{name: \"b\"},\n\t\t/* last */\n\t}\n}\n";
        let file = parse(source);
        let decl = table_decl(&file);
        let Expr::Composite(lit) = &decl.right[0] else {
            panic!("expected composite literal");
        };
        let comments: Vec<_> = lit
            .comments()
            .iter()
            .map(|comment| (comment.span.text(source), comment.trailing))
            .collect();
        assert_eq!(
            comments,
            vec![("// first", false), ("// after a", true), ("/* last */", false)]
        );
        assert_eq!(lit.elements.len(), 2);
    }

    #[test]
    fn test_syntax_error_location() {
        let mut parser = GoParser::new().expect("grammar loads");
        let err = parser
            .parse("package demo\n\nfunc TestBroken() {\n\tx := \n")
            .expect_err("invalid Go");
        assert!(err.line >= 3, "line {} should point into the function", err.line);
        assert!(err.column >= 1);
        assert!(err.to_string().starts_with("syntax error at line"));
    }
}
