// Source code generation from the AST.
// Untouched nodes are copied from the original text; only nodes that were
// rewritten are rendered, so comments and formatting elsewhere survive.

use std::io;

use super::*;

/// Trait for nodes that can render their source representation
pub trait ToSource {
    /// Render the node; `original` is the text the node's spans point into.
    fn to_source(&self, original: &str) -> String;
}

impl SourceFile {
    /// Print the whole file, splicing rewritten right-hand sides into the
    /// original text. An unmodified file prints back byte-for-byte.
    pub fn print(&self) -> String {
        let source = self.source();
        let edits = self
            .functions
            .iter()
            .flat_map(|function| function.body.iter())
            .filter_map(|stmt| match stmt {
                Stmt::ShortVarDecl(decl) if decl.is_modified() => {
                    let rhs = decl
                        .right
                        .iter()
                        .map(|expr| expr.to_source(source))
                        .collect::<Vec<_>>()
                        .join(", ");
                    Some((decl.rhs_span, rhs))
                }
                _ => None,
            })
            .collect();

        splice(source, Span::new(0, source.len()), edits)
    }

    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.print().as_bytes())
    }
}

impl ToSource for Expr {
    fn to_source(&self, original: &str) -> String {
        match self {
            Expr::Ident(ident) => ident.span.text(original).to_string(),
            Expr::BasicLit(lit) => lit.span.text(original).to_string(),
            Expr::Composite(lit) => lit.to_source(original),
            Expr::MapLit(map) => map.to_source(original),
            Expr::Opaque(span) => span.text(original).to_string(),
        }
    }
}

impl ToSource for CompositeLit {
    fn to_source(&self, original: &str) -> String {
        if !self.is_modified() {
            return self.span.text(original).to_string();
        }

        let mut edits = Vec::new();
        if let Some(ty) = self.ty.as_ref().filter(|ty| ty.is_modified()) {
            edits.push((ty.span(), ty.to_source(original)));
        }
        for element in self.elements.iter().filter(|e| e.is_modified()) {
            edits.push((element.span(), element.to_source(original)));
        }

        let items: Vec<Span> = self
            .elements
            .iter()
            .map(Element::span)
            .chain(self.elided().iter().copied())
            .collect();
        cut_edits(original, self.body_span, &items, self.elided(), b',', &mut edits);

        splice(original, self.span, edits)
    }
}

impl ToSource for Element {
    fn to_source(&self, original: &str) -> String {
        match self {
            Element::Keyed(keyed) if self.is_modified() => {
                let edits = [&keyed.key, &keyed.value]
                    .into_iter()
                    .filter(|expr| expr.is_modified())
                    .filter_map(|expr| Some((expr.span()?, expr.to_source(original))))
                    .collect();
                splice(original, keyed.span, edits)
            }
            Element::Keyed(keyed) => keyed.span.text(original).to_string(),
            Element::Value(expr) => expr.to_source(original),
        }
    }
}

impl ToSource for TypeExpr {
    fn to_source(&self, original: &str) -> String {
        if !self.is_modified() {
            return self.span().text(original).to_string();
        }

        match self {
            TypeExpr::Sequence { elem, span, .. } => {
                splice(original, *span, vec![(elem.span(), elem.to_source(original))])
            }
            TypeExpr::Map { key, value, span } => {
                let edits = [key, value]
                    .into_iter()
                    .filter(|ty| ty.is_modified())
                    .map(|ty| (ty.span(), ty.to_source(original)))
                    .collect();
                splice(original, *span, edits)
            }
            TypeExpr::Struct(st) => st.to_source(original),
            TypeExpr::Opaque(span) => span.text(original).to_string(),
        }
    }
}

impl ToSource for StructType {
    fn to_source(&self, original: &str) -> String {
        if !self.is_modified() {
            return self.span.text(original).to_string();
        }

        let mut edits: Vec<(Span, String)> = self
            .fields
            .iter()
            .filter(|field| field.is_modified())
            .map(|field| (field.span, field.to_source(original)))
            .collect();

        let items: Vec<Span> = self
            .fields
            .iter()
            .map(|field| field.span)
            .chain(self.elided().iter().copied())
            .collect();
        cut_edits(original, self.span, &items, self.elided(), b';', &mut edits);

        splice(original, self.span, edits)
    }
}

impl ToSource for FieldDecl {
    fn to_source(&self, original: &str) -> String {
        if !self.is_modified() {
            return self.span.text(original).to_string();
        }

        let items: Vec<Span> = self
            .names
            .iter()
            .map(|ident| ident.span)
            .chain(self.elided().iter().copied())
            .collect();
        let mut edits = Vec::new();
        cut_edits(original, self.span, &items, self.elided(), b',', &mut edits);

        splice(original, self.span, edits)
    }
}

impl ToSource for MapLit {
    fn to_source(&self, original: &str) -> String {
        let newline = line_ending(original);
        let comment = |span: &Span| span.text(original).trim_end().to_string();

        let mut result = format!(
            "map[{}]{}{{{}",
            self.key_type,
            self.value_type.to_source(original),
            newline
        );
        for entry in &self.entries {
            for leading in &entry.leading_comments {
                result.push_str(&format!("{}\t{}{}", self.indent, comment(leading), newline));
            }
            result.push_str(&format!(
                "{}\t\"{}\": {},",
                self.indent,
                entry.key,
                entry.value.to_source(original)
            ));
            for trailing in &entry.trailing_comments {
                result.push(' ');
                result.push_str(&comment(trailing));
            }
            result.push_str(newline);
        }
        for closing in &self.closing_comments {
            result.push_str(&format!("{}\t{}{}", self.indent, comment(closing), newline));
        }
        result.push_str(&self.indent);
        result.push('}');
        result
    }
}

/// `\r\n` when the file already uses it, `\n` otherwise
fn line_ending(original: &str) -> &'static str {
    if original.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Copy `region` of `original`, replacing each edited span with its text.
/// Edits must not overlap; an edit starting inside an earlier one is ignored.
pub(crate) fn splice(original: &str, region: Span, mut edits: Vec<(Span, String)>) -> String {
    edits.sort_by_key(|(span, _)| span.start);

    let mut result = String::with_capacity(region.len());
    let mut cursor = region.start;
    for (span, text) in edits {
        if span.start < cursor || span.end > region.end {
            continue;
        }
        result.push_str(&original[cursor..span.start]);
        result.push_str(&text);
        cursor = span.end;
    }
    result.push_str(&original[cursor..region.end]);
    result
}

/// Push empty-text edits that cut the `removed` items out of a separated
/// list. `items` holds the original spans of every item, kept or removed.
fn cut_edits(
    original: &str,
    region: Span,
    items: &[Span],
    removed: &[Span],
    separator: u8,
    edits: &mut Vec<(Span, String)>,
) {
    let cuts = removal_cuts(original, region, items, removed, separator);
    edits.extend(cuts.into_iter().map(|cut| (cut, String::new())));
}

/// Compute the byte ranges to delete so each removed item disappears along
/// with its separator. An item alone on its line takes the line with it.
pub(crate) fn removal_cuts(
    original: &str,
    region: Span,
    items: &[Span],
    removed: &[Span],
    separator: u8,
) -> Vec<Span> {
    let mut items = items.to_vec();
    items.sort();
    let is_removed = |span: &Span| removed.contains(span);

    let mut cuts = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if !is_removed(item) {
            continue;
        }

        if let Some(line) = whole_line(original, region, *item, separator) {
            cuts.push(line);
            continue;
        }

        let next_kept = items[index + 1..].iter().find(|span| !is_removed(span));
        let prev_kept = items[..index].iter().rev().find(|span| !is_removed(span));
        let cut = match (next_kept, prev_kept) {
            (Some(next), _) => Span::new(item.start, next.start),
            (None, Some(prev)) => Span::new(prev.end, item.end),
            // Nothing is left, so the blanks around the item go too
            (None, None) => {
                let bytes = original.as_bytes();
                let end = skip_separator(bytes, item.end, region.end, separator);
                Span::new(
                    skip_blanks_back(bytes, item.start, region.start),
                    skip_blanks(bytes, end, region.end),
                )
            }
        };
        cuts.push(cut);
    }

    merge_spans(cuts)
}

/// The full line holding `item` when nothing but blanks, the separator and
/// a trailing line comment share it.
fn whole_line(original: &str, region: Span, item: Span, separator: u8) -> Option<Span> {
    let bytes = original.as_bytes();
    let line_start = original[..item.start].rfind('\n').map_or(0, |i| i + 1);
    if line_start < region.start
        || !bytes[line_start..item.start]
            .iter()
            .all(|b| matches!(b, b' ' | b'\t'))
    {
        return None;
    }

    let mut pos = skip_separator(bytes, item.end, region.end, separator);
    pos = skip_blanks(bytes, pos, region.end);
    let rest = &original[pos..region.end];
    if rest.starts_with("//") {
        pos += rest.find('\n').unwrap_or(rest.len());
    }

    let rest = &original[pos..region.end];
    if rest.starts_with("\r\n") {
        Some(Span::new(line_start, pos + 2))
    } else if rest.starts_with('\n') {
        Some(Span::new(line_start, pos + 1))
    } else {
        None
    }
}

fn skip_blanks(bytes: &[u8], mut pos: usize, limit: usize) -> usize {
    while pos < limit && matches!(bytes[pos], b' ' | b'\t') {
        pos += 1;
    }
    pos
}

fn skip_blanks_back(bytes: &[u8], mut pos: usize, limit: usize) -> usize {
    while pos > limit && matches!(bytes[pos - 1], b' ' | b'\t') {
        pos -= 1;
    }
    pos
}

fn skip_separator(bytes: &[u8], from: usize, limit: usize, separator: u8) -> usize {
    let pos = skip_blanks(bytes, from, limit);
    if pos < limit && bytes[pos] == separator {
        pos + 1
    } else {
        from
    }
}

fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort();
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}
