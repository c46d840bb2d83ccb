/*!
# Loop Rewriter

Textual pass over a test file that switches the table loop to the map key:

- `for _, tt := range tests {` becomes `for name, tt := range tests {`
- `t.Run(tt.name,` becomes `t.Run(name,`

It runs on the raw file text and does not depend on the tree pass having
converted anything.
*/

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use regex::{NoExpand, Regex};
use tracing::info;

use crate::{ConvertConfig, ConvertError, Result};

#[derive(Debug, Clone)]
pub struct LoopRewriter {
    range_header: Regex,
    header_replacement: String,
    run_name: Regex,
    run_replacement: String,
    dry_run: bool,
}

impl LoopRewriter {
    pub fn new(table_ident: &str, key_field: &str) -> Result<Self> {
        let range_header = Regex::new(&format!(
            r"for\s+_,\s+(\w+)\s+:=\s+range\s+{}\s+\{{",
            regex::escape(table_ident)
        ))?;
        let run_name = Regex::new(&format!(
            r"t\.Run\(\s*\w+\.{}\s*,",
            regex::escape(key_field)
        ))?;

        Ok(Self {
            range_header,
            header_replacement: format!("for {key_field}, ${{1}} := range {table_ident} {{"),
            run_name,
            run_replacement: format!("t.Run({key_field},"),
            dry_run: false,
        })
    }

    pub fn from_config(config: &ConvertConfig) -> Result<Self> {
        Ok(Self::new(&config.table_ident, &config.key_field)?.dry_run(config.dry_run))
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Apply both rewrites. A borrowed result means nothing matched.
    pub fn rewrite<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let headers = self
            .range_header
            .replace_all(text, self.header_replacement.as_str());
        match headers {
            Cow::Borrowed(text) => self.run_name.replace_all(text, NoExpand(&self.run_replacement)),
            Cow::Owned(text) => Cow::Owned(
                self.run_name
                    .replace_all(&text, NoExpand(&self.run_replacement))
                    .into_owned(),
            ),
        }
    }

    /// Rewrite the file in place. Returns whether the text changed; the file
    /// is only written when it did (and never in dry-run mode).
    pub fn rewrite_file(&self, path: &Path) -> Result<bool> {
        self.rewrite_file_with(path, |path, text| fs::write(path, text))
    }

    /// Like [`LoopRewriter::rewrite_file`], storing the new text with `write`
    pub fn rewrite_file_with<W>(&self, path: &Path, write: W) -> Result<bool>
    where
        W: FnOnce(&Path, &str) -> io::Result<()>,
    {
        let text = fs::read_to_string(path).map_err(|source| ConvertError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let rewritten = match self.rewrite(&text) {
            Cow::Borrowed(_) => return Ok(false),
            Cow::Owned(rewritten) => rewritten,
        };

        if self.dry_run {
            info!("Would update for loop in {}", path.display());
            return Ok(true);
        }

        write(path, &rewritten).map_err(|source| ConvertError::LoopRewrite {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Updated for loop in {}", path.display());
        Ok(true)
    }
}
