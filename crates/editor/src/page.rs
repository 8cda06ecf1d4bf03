use html::{Document, ParseOptions, parse_document_with};
use std::path::Path;

use crate::error::SessionError;

/// A page being edited: its URL path and the live DOM the host mutates.
#[derive(Clone, Debug)]
pub struct LivePage {
    path: String,
    doc: Document,
}

impl LivePage {
    pub fn parse(path: impl Into<String>, markup: &str, options: &ParseOptions) -> Self {
        Self {
            path: path.into(),
            doc: parse_document_with(markup, options),
        }
    }

    /// Read and parse a page from disk. `path` is the page's URL path, not the disk location.
    pub fn open(
        file: &Path,
        path: impl Into<String>,
        options: &ParseOptions,
    ) -> Result<(Self, String), SessionError> {
        let markup = std::fs::read_to_string(file).map_err(|source| SessionError::Io {
            path: file.display().to_string(),
            source,
        })?;
        Ok((Self::parse(path, &markup, options), markup))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// The file this page was served from: the last path segment, ignoring query and
    /// fragment, or `default_page` when the path ends in `/`.
    pub fn page_file(&self, default_page: &str) -> String {
        let path = self
            .path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        match path.rsplit('/').next() {
            Some(last) if !last.is_empty() => last.to_string(),
            _ => default_page.to_string(),
        }
    }
}
