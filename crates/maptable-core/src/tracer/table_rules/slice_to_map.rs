/*!
# Slice To Map Converter

Rewrites a slice of anonymous test-case records into a map keyed by each
record's name:

```go
tests := []struct{ name string; val int }{{name: "a", val: 1}}
```

becomes

```go
tests := map[string]struct{ val int }{
	"a": {val: 1},
}
```
*/

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{CompositeLit, Expr, MapEntry, MapLit, ShortVarDecl, Stmt, TypeExpr};
use crate::tracer::patterns::{AstPattern, PatternMatcher};
use crate::tracer::rules::TransformationRule;
use crate::tracer::{Rewrite, TransformResult, TransformationContext};
use crate::ConvertConfig;

/// Converts `tests := []struct{...}{...}` into a name-keyed map literal.
///
/// Records without a usable name are left out of the map, and records that
/// share a name collapse into the last one written.
pub struct SliceToMapConverter {
    table_ident: String,
    key_field: String,
    priority: u32,
}

impl SliceToMapConverter {
    pub fn new(table_ident: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            table_ident: table_ident.into(),
            key_field: key_field.into(),
            priority: 100,
        }
    }

    pub fn from_config(config: &ConvertConfig) -> Self {
        Self::new(config.table_ident.clone(), config.key_field.clone())
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Index and text of the record's key: the first `name:` element, which
    /// must be a non-empty double-quoted string.
    pub fn extract_key(&self, record: &CompositeLit) -> Option<(usize, String)> {
        let (index, value) = record.field(&self.key_field)?;
        match value {
            Expr::BasicLit(lit) => lit
                .unquoted()
                .filter(|key| !key.is_empty())
                .map(|key| (index, key.to_string())),
            _ => None,
        }
    }

    /// Convert the declaration, or hand it back untouched when no record
    /// yields a key.
    pub fn convert(&self, mut decl: ShortVarDecl) -> Rewrite<ShortVarDecl> {
        match self.build_map(&decl) {
            Some(map) => {
                decl.right[0] = Expr::MapLit(map);
                Rewrite::Changed(decl)
            }
            None => Rewrite::Unchanged(decl),
        }
    }

    fn build_map(&self, decl: &ShortVarDecl) -> Option<MapLit> {
        let Some(Expr::Composite(lit)) = decl.right.first() else {
            return None;
        };
        let Some(TypeExpr::Sequence { elem, .. }) = &lit.ty else {
            return None;
        };
        let TypeExpr::Struct(record_type) = elem.as_ref() else {
            return None;
        };

        let comments = lit.comments();
        let mut next_comment = 0;
        let mut entries: BTreeMap<String, MapEntry> = BTreeMap::new();
        // Key of the previous element when it was kept
        let mut previous: Option<String> = None;
        // Comments of dropped records, waiting for the next kept entry
        let mut carried = Vec::new();
        let mut dropped = 0;
        for element in &lit.elements {
            let start = element.span().start;
            let mut leading = std::mem::take(&mut carried);
            while let Some(comment) = comments.get(next_comment).filter(|c| c.span.start < start) {
                match previous.as_ref().and_then(|key| entries.get_mut(key)) {
                    Some(entry) if comment.trailing => entry.trailing_comments.push(comment.span),
                    _ => leading.push(comment.span),
                }
                next_comment += 1;
            }

            let Some((record, (index, key))) = element
                .as_record()
                .and_then(|record| Some((record, self.extract_key(record)?)))
            else {
                dropped += 1;
                carried = leading;
                previous = None;
                continue;
            };

            let mut value = record.clone();
            value.remove_element(index);
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| MapEntry::new(key.clone(), value.clone()));
            entry.value = value;
            entry.leading_comments.extend(leading);
            previous = Some(key);
        }

        let mut closing_comments = carried;
        for comment in &comments[next_comment..] {
            match previous.as_ref().and_then(|key| entries.get_mut(key)) {
                Some(entry) if comment.trailing => entry.trailing_comments.push(comment.span),
                _ => closing_comments.push(comment.span),
            }
        }

        if entries.is_empty() {
            debug!(
                "No keyed records in {} ({} elements), leaving it as a slice",
                self.table_ident,
                lit.elements.len()
            );
            return None;
        }

        let collapsed = lit.elements.len() - dropped - entries.len();
        debug!(
            "Converting {}: {} entries, {} records without a key dropped, {} duplicates collapsed",
            self.table_ident,
            entries.len(),
            dropped,
            collapsed
        );

        let mut value_type = record_type.clone();
        value_type.remove_field_named(&self.key_field);

        Some(MapLit {
            key_type: "string".to_string(),
            value_type,
            entries: entries.into_values().collect(),
            indent: decl.indent.clone(),
            closing_comments,
        })
    }
}

impl Default for SliceToMapConverter {
    fn default() -> Self {
        Self::from_config(&ConvertConfig::default())
    }
}

impl TransformationRule for SliceToMapConverter {
    fn name(&self) -> &'static str {
        "SliceToMapConverter"
    }

    fn description(&self) -> &'static str {
        "Converts slice-based table tests into map-based table tests keyed by test name"
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn matches(&self, stmt: &Stmt, _context: &TransformationContext) -> bool {
        PatternMatcher::table_assignment(&self.table_ident).matches(stmt)
    }

    fn transform(
        &self,
        stmt: Stmt,
        context: &TransformationContext,
    ) -> TransformResult<Rewrite<Stmt>> {
        match stmt {
            Stmt::ShortVarDecl(decl) => {
                if let Some(function) = &context.function_name {
                    debug!(
                        "Inspecting {} in {} ({})",
                        self.table_ident,
                        function,
                        context.source_file.as_deref().unwrap_or("<source>")
                    );
                }
                Ok(self.convert(decl).map(Stmt::ShortVarDecl))
            }
            other => Ok(Rewrite::Unchanged(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{GoParser, Parser};
    use pretty_assertions::assert_eq;

    fn wrap(body: &str) -> String {
        format!("package demo\n\nfunc TestX(t *testing.T) {{\n{body}\n}}\n")
    }

    /// Runs the converter over every short var decl and prints the result
    fn convert_source(source: &str) -> (String, bool) {
        let mut file = GoParser::new()
            .expect("grammar loads")
            .parse(source)
            .expect("valid Go");
        let converter = SliceToMapConverter::default();
        let mut changed = false;
        for stmt in file.functions.iter_mut().flat_map(|f| f.body.iter_mut()) {
            if let Stmt::ShortVarDecl(decl) = stmt {
                let rewrite = converter.convert(decl.clone());
                changed |= rewrite.is_changed();
                *decl = rewrite.into_inner();
            }
        }
        (file.print(), changed)
    }

    #[test]
    fn test_converts_and_sorts_entries() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname string\n\t\tval  int\n\t}{\n\t\t{name: \"b\", val: 2},\n\t\t{name: \"a\", val: 1},\n\t}",
        );
        let expected = wrap(
            "\ttests := map[string]struct {\n\t\tval  int\n\t}{\n\t\t\"a\": {val: 1},\n\t\t\"b\": {val: 2},\n\t}",
        );

        let (output, changed) = convert_source(&source);
        assert!(changed);
        assert_eq!(output, expected);
    }

    #[test]
    fn test_records_without_string_name_are_dropped() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname string\n\t\tval  int\n\t}{\n\t\t{name: \"a\", val: 1},\n\t\t{val: 2},\n\t\t{name: label, val: 3},\n\t}",
        );
        let expected = wrap(
            "\ttests := map[string]struct {\n\t\tval  int\n\t}{\n\t\t\"a\": {val: 1},\n\t}",
        );

        assert_eq!(convert_source(&source).0, expected);
    }

    #[test]
    fn test_raw_and_empty_names_are_dropped() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname string\n\t\tval  int\n\t}{\n\t\t{name: `raw`, val: 1},\n\t\t{name: \"\", val: 2},\n\t\t{name: \"k\", val: 3},\n\t}",
        );
        let expected = wrap(
            "\ttests := map[string]struct {\n\t\tval  int\n\t}{\n\t\t\"k\": {val: 3},\n\t}",
        );

        assert_eq!(convert_source(&source).0, expected);
    }

    #[test]
    fn test_duplicate_names_keep_last() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname string\n\t\tval  int\n\t}{\n\t\t{name: \"a\", val: 1},\n\t\t{name: \"a\", val: 2},\n\t}",
        );
        let expected = wrap(
            "\ttests := map[string]struct {\n\t\tval  int\n\t}{\n\t\t\"a\": {val: 2},\n\t}",
        );

        assert_eq!(convert_source(&source).0, expected);
    }

    #[test]
    fn test_no_keyed_records_leaves_slice() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname string\n\t\tval  int\n\t}{\n\t\t{val: 1},\n\t}",
        );

        let (output, changed) = convert_source(&source);
        assert!(!changed);
        assert_eq!(output, source);
    }

    #[test]
    fn test_grouped_name_declaration_keeps_siblings() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname, desc string\n\t}{\n\t\t{name: \"a\", desc: \"first\"},\n\t}",
        );
        let expected = wrap(
            "\ttests := map[string]struct {\n\t\tdesc string\n\t}{\n\t\t\"a\": {desc: \"first\"},\n\t}",
        );

        assert_eq!(convert_source(&source).0, expected);
    }

    #[test]
    fn test_multi_line_records() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname string\n\t\tin   string\n\t}{\n\t\t{\n\t\t\tname: \"upper\",\n\t\t\tin:   \"A\",\n\t\t},\n\t}",
        );
        let expected = wrap(
            "\ttests := map[string]struct {\n\t\tin   string\n\t}{\n\t\t\"upper\": {\n\t\t\tin:   \"A\",\n\t\t},\n\t}",
        );

        assert_eq!(convert_source(&source).0, expected);
    }

    #[test]
    fn test_comments_follow_their_records() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname string\n\t\tval  int\n\t}{\n\t\t// second in the map\n\t\t{name: \"b\", val: 2}, // trailing b\n\t\t// first in the map\n\t\t{name: \"a\", val: 1},\n\t\t// closes the table\n\t}",
        );
        let expected = wrap(
            "\ttests := map[string]struct {\n\t\tval  int\n\t}{\n\t\t// first in the map\n\t\t\"a\": {val: 1},\n\t\t// second in the map\n\t\t\"b\": {val: 2}, // trailing b\n\t\t// closes the table\n\t}",
        );

        assert_eq!(convert_source(&source).0, expected);
    }

    #[test]
    fn test_comments_of_dropped_records_move_to_next_entry() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname string\n\t\tval  int\n\t}{\n\t\t// no name here\n\t\t{val: 1}, // unnamed\n\t\t{name: \"a\", val: 2},\n\t}",
        );
        let expected = wrap(
            "\ttests := map[string]struct {\n\t\tval  int\n\t}{\n\t\t// no name here\n\t\t// unnamed\n\t\t\"a\": {val: 2},\n\t}",
        );

        assert_eq!(convert_source(&source).0, expected);
    }

    #[test]
    fn test_crlf_source_keeps_crlf() {
        let source = wrap(
            "\ttests := []struct {\n\t\tname string\n\t\tval  int\n\t}{\n\t\t{name: \"b\", val: 2},\n\t\t{name: \"a\", val: 1},\n\t}",
        )
        .replace('\n', "\r\n");
        let expected = wrap(
            "\ttests := map[string]struct {\n\t\tval  int\n\t}{\n\t\t\"a\": {val: 1},\n\t\t\"b\": {val: 2},\n\t}",
        )
        .replace('\n', "\r\n");

        let output = convert_source(&source).0;
        assert_eq!(output, expected);
        assert_eq!(output.matches('\n').count(), output.matches("\r\n").count());
    }

    #[test]
    fn test_single_name_field_leaves_empty_struct() {
        let source = wrap("\ttests := []struct{ name string }{{name: \"x\"}}");
        let expected = wrap("\ttests := map[string]struct{}{\n\t\t\"x\": {},\n\t}");

        assert_eq!(convert_source(&source).0, expected);
    }

    #[test]
    fn test_matches_only_configured_table() {
        let converter = SliceToMapConverter::new("cases", "name");
        let file = GoParser::new()
            .expect("grammar loads")
            .parse(&wrap("\ttests := []struct{ name string }{}\n\tcases := []struct{ name string }{}"))
            .expect("valid Go");
        let context = TransformationContext::new();
        let matched: Vec<bool> = file.functions[0]
            .body
            .iter()
            .map(|stmt| converter.matches(stmt, &context))
            .collect();
        assert_eq!(matched, vec![false, true]);
    }
}
