//! Typed view of the Go constructs the converter branches on.
//!
//! Only shapes that matter for table tests are modelled: function bodies,
//! short variable declarations, composite literals and struct types.
//! Everything else is kept as an opaque span into the original text so an
//! untouched tree prints back byte-for-byte.

pub mod source_gen;

pub use source_gen::ToSource;

/// A byte range in the original source, `start` inclusive, `end` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// The original text covered by this span
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

/// A parsed Go file. Owns the original text that every span points into.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    source: String,
    pub functions: Vec<FuncDecl>,
}

impl SourceFile {
    pub fn new(source: impl Into<String>, functions: Vec<FuncDecl>) -> Self {
        Self {
            source: source.into(),
            functions,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A function or method declaration with its top-level statements
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `left := right`
    ShortVarDecl(ShortVarDecl),
    /// Any statement the converter never rewrites
    Other(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShortVarDecl {
    pub left: Vec<Expr>,
    pub right: Vec<Expr>,
    pub span: Span,
    /// Span of the whole right-hand expression list
    pub rhs_span: Span,
    /// Leading whitespace of the line the statement starts on
    pub indent: String,
}

impl ShortVarDecl {
    pub fn is_modified(&self) -> bool {
        self.right.iter().any(Expr::is_modified)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    BasicLit(BasicLit),
    Composite(CompositeLit),
    /// Map literal built by the converter; it has no original text
    MapLit(MapLit),
    Opaque(Span),
}

impl Expr {
    pub fn span(&self) -> Option<Span> {
        match self {
            Expr::Ident(ident) => Some(ident.span),
            Expr::BasicLit(lit) => Some(lit.span),
            Expr::Composite(lit) => Some(lit.span),
            Expr::MapLit(_) => None,
            Expr::Opaque(span) => Some(*span),
        }
    }

    pub fn is_modified(&self) -> bool {
        match self {
            Expr::Composite(lit) => lit.is_modified(),
            Expr::MapLit(_) => true,
            Expr::Ident(_) | Expr::BasicLit(_) | Expr::Opaque(_) => false,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(ident) => Some(&ident.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    /// `"..."`
    InterpretedString,
    /// `` `...` ``
    RawString,
    Int,
    Float,
    Imaginary,
    Rune,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicLit {
    pub kind: LitKind,
    /// Literal text exactly as written, quotes included
    pub value: String,
    pub span: Span,
}

impl BasicLit {
    /// Contents of a double-quoted string literal, escapes left as written
    pub fn unquoted(&self) -> Option<&str> {
        if self.kind != LitKind::InterpretedString {
            return None;
        }
        self.value
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
    }
}

/// `Type{...}`, or `{...}` when the element type is elided
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeLit {
    pub ty: Option<TypeExpr>,
    pub elements: Vec<Element>,
    pub span: Span,
    /// Span of the braces and everything between them
    pub body_span: Span,
    comments: Vec<Comment>,
    elided: Vec<Span>,
}

impl CompositeLit {
    pub fn new(ty: Option<TypeExpr>, elements: Vec<Element>, span: Span, body_span: Span) -> Self {
        Self {
            ty,
            elements,
            span,
            body_span,
            comments: Vec::new(),
            elided: Vec::new(),
        }
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = comments;
        self
    }

    /// Comments sitting directly between the braces, in source order
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Removes an element, remembering where it was so printing can cut it
    pub fn remove_element(&mut self, index: usize) -> Element {
        let element = self.elements.remove(index);
        self.elided.push(element.span());
        element
    }

    /// Spans of elements removed since parsing
    pub fn elided(&self) -> &[Span] {
        &self.elided
    }

    pub fn is_modified(&self) -> bool {
        !self.elided.is_empty()
            || self.ty.as_ref().is_some_and(TypeExpr::is_modified)
            || self.elements.iter().any(Element::is_modified)
    }

    /// Value of the first `key: value` element whose key is `field`
    pub fn field(&self, field: &str) -> Option<(usize, &Expr)> {
        self.elements
            .iter()
            .enumerate()
            .find_map(|(index, element)| match element {
                Element::Keyed(keyed) if keyed.key.as_ident() == Some(field) => {
                    Some((index, &keyed.value))
                }
                _ => None,
            })
    }
}

/// A `//` or `/* */` comment between the elements of a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub span: Span,
    /// Starts on the line where the previous element ends
    pub trailing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// `key: value`
    Keyed(KeyedElement),
    Value(Expr),
}

impl Element {
    pub fn span(&self) -> Span {
        match self {
            Element::Keyed(keyed) => keyed.span,
            Element::Value(expr) => expr.span().unwrap_or_default(),
        }
    }

    pub fn is_modified(&self) -> bool {
        match self {
            Element::Keyed(keyed) => keyed.key.is_modified() || keyed.value.is_modified(),
            Element::Value(expr) => expr.is_modified(),
        }
    }

    /// The record literal held by a plain (unkeyed) element
    pub fn as_record(&self) -> Option<&CompositeLit> {
        match self {
            Element::Value(Expr::Composite(lit)) => Some(lit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyedElement {
    pub key: Expr,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    /// `[]T`
    Slice,
    /// `[N]T`
    Array,
    /// `[...]T`
    ImplicitArray,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Sequence {
        kind: SequenceKind,
        elem: Box<TypeExpr>,
        span: Span,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
        span: Span,
    },
    Struct(StructType),
    /// Named, qualified, pointer and every other type
    Opaque(Span),
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Sequence { span, .. } | TypeExpr::Map { span, .. } => *span,
            TypeExpr::Struct(st) => st.span,
            TypeExpr::Opaque(span) => *span,
        }
    }

    pub fn is_modified(&self) -> bool {
        match self {
            TypeExpr::Sequence { elem, .. } => elem.is_modified(),
            TypeExpr::Map { key, value, .. } => key.is_modified() || value.is_modified(),
            TypeExpr::Struct(st) => st.is_modified(),
            TypeExpr::Opaque(_) => false,
        }
    }
}

/// `struct { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub fields: Vec<FieldDecl>,
    pub span: Span,
    elided: Vec<Span>,
}

impl StructType {
    pub fn new(fields: Vec<FieldDecl>, span: Span) -> Self {
        Self {
            fields,
            span,
            elided: Vec::new(),
        }
    }

    pub fn remove_field(&mut self, index: usize) -> FieldDecl {
        let field = self.fields.remove(index);
        self.elided.push(field.span);
        field
    }

    /// Drops the declaration of `name` once. In a grouped declaration such
    /// as `name, desc string` only `name` goes; the rest stays declared.
    pub fn remove_field_named(&mut self, name: &str) -> bool {
        let found = self.fields.iter().enumerate().find_map(|(index, field)| {
            field
                .names
                .iter()
                .position(|ident| ident.name == name)
                .map(|position| (index, position))
        });

        match found {
            Some((index, _)) if self.fields[index].names.len() == 1 => {
                self.remove_field(index);
                true
            }
            Some((index, position)) => {
                self.fields[index].remove_name(position);
                true
            }
            None => false,
        }
    }

    pub fn elided(&self) -> &[Span] {
        &self.elided
    }

    pub fn is_modified(&self) -> bool {
        !self.elided.is_empty() || self.fields.iter().any(FieldDecl::is_modified)
    }
}

/// One line of a struct body: `a, b int`, or an embedded type with no names
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub names: Vec<Ident>,
    pub ty: Span,
    pub span: Span,
    elided: Vec<Span>,
}

impl FieldDecl {
    pub fn new(names: Vec<Ident>, ty: Span, span: Span) -> Self {
        Self {
            names,
            ty,
            span,
            elided: Vec::new(),
        }
    }

    pub fn remove_name(&mut self, index: usize) -> Ident {
        let ident = self.names.remove(index);
        self.elided.push(ident.span);
        ident
    }

    pub fn elided(&self) -> &[Span] {
        &self.elided
    }

    pub fn is_modified(&self) -> bool {
        !self.elided.is_empty()
    }
}

/// `map[string]struct{...}{ "key": {...}, ... }` produced by conversion
#[derive(Debug, Clone, PartialEq)]
pub struct MapLit {
    pub key_type: String,
    pub value_type: StructType,
    /// Entries in emission order
    pub entries: Vec<MapEntry>,
    /// Indentation of the statement holding the literal
    pub indent: String,
    /// Comments printed on their own lines before the closing brace
    pub closing_comments: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    /// Key text as written between the quotes
    pub key: String,
    pub value: CompositeLit,
    /// Comments printed on their own lines above the entry
    pub leading_comments: Vec<Span>,
    /// Comments printed after the entry's comma
    pub trailing_comments: Vec<Span>,
}

impl MapEntry {
    pub fn new(key: String, value: CompositeLit) -> Self {
        Self {
            key,
            value,
            leading_comments: Vec::new(),
            trailing_comments: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str, start: usize) -> Ident {
        Ident {
            name: name.to_string(),
            span: Span::new(start, start + name.len()),
        }
    }

    #[test]
    fn test_span_text_and_len() {
        let span = Span::new(3, 8);
        assert_eq!(span.text("tests := x"), "ts :=");
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert!(Span::new(4, 4).is_empty());
    }

    #[test]
    fn test_unquoted_interpreted_string() {
        let lit = BasicLit {
            kind: LitKind::InterpretedString,
            value: r#""with \"escape\"""#.to_string(),
            span: Span::default(),
        };
        assert_eq!(lit.unquoted(), Some(r#"with \"escape\""#));
    }

    #[test]
    fn test_unquoted_rejects_raw_strings_and_numbers() {
        let raw = BasicLit {
            kind: LitKind::RawString,
            value: "`a`".to_string(),
            span: Span::default(),
        };
        let int = BasicLit {
            kind: LitKind::Int,
            value: "1".to_string(),
            span: Span::default(),
        };
        assert_eq!(raw.unquoted(), None);
        assert_eq!(int.unquoted(), None);
    }

    #[test]
    fn test_remove_element_records_elision() {
        let keyed = |name: &str, start: usize| {
            Element::Keyed(KeyedElement {
                key: Expr::Ident(ident(name, start)),
                value: Expr::Opaque(Span::new(start + 3, start + 4)),
                span: Span::new(start, start + 4),
            })
        };
        let mut lit = CompositeLit::new(
            None,
            vec![keyed("a", 1), keyed("b", 7)],
            Span::new(0, 12),
            Span::new(0, 12),
        );
        assert!(!lit.is_modified());

        let removed = lit.remove_element(0);
        assert_eq!(removed.span(), Span::new(1, 5));
        assert_eq!(lit.elided(), &[Span::new(1, 5)]);
        assert_eq!(lit.elements.len(), 1);
        assert!(lit.is_modified());
        assert_eq!(lit.field("b").map(|(index, _)| index), Some(0));
        assert!(lit.field("a").is_none());
    }

    #[test]
    fn test_remove_field_named_single_declaration() {
        let mut st = StructType::new(
            vec![
                FieldDecl::new(vec![ident("name", 10)], Span::new(15, 21), Span::new(10, 21)),
                FieldDecl::new(vec![ident("val", 24)], Span::new(28, 31), Span::new(24, 31)),
            ],
            Span::new(0, 34),
        );
        assert!(st.remove_field_named("name"));
        assert_eq!(st.fields.len(), 1);
        assert_eq!(st.elided(), &[Span::new(10, 21)]);
        assert!(!st.remove_field_named("name"));
    }

    #[test]
    fn test_remove_field_named_grouped_declaration() {
        let mut st = StructType::new(
            vec![FieldDecl::new(
                vec![ident("name", 10), ident("desc", 16)],
                Span::new(21, 27),
                Span::new(10, 27),
            )],
            Span::new(0, 30),
        );
        assert!(st.remove_field_named("name"));
        assert_eq!(st.fields.len(), 1);
        assert_eq!(st.fields[0].names.len(), 1);
        assert_eq!(st.fields[0].names[0].name, "desc");
        assert_eq!(st.fields[0].elided(), &[Span::new(10, 14)]);
        assert!(st.is_modified());
    }
}
