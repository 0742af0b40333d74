//! Program-wide offsets for every loaded file.

use std::fmt;

use crate::LineIndex;

/// One file registered with a [`SourceMap`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as given to the loader.
    pub name: String,
    /// Offset of the first byte of this file within the map.
    pub base: u32,
    pub text: String,
    index: LineIndex,
}

impl SourceFile {
    /// Position of a file-local byte offset.
    pub fn position(&self, local: u32) -> Position<'_> {
        let (line, column) = self.index.line_col(&self.text, local);
        Position {
            file: &self.name,
            line,
            column,
        }
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }
}

/// A resolved `file:line:col`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Position<'a> {
    pub file: &'a str,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Assigns each file a disjoint range of offsets.
///
/// Files are laid out back to back with a one-byte gap, so an end-of-file
/// offset still belongs to its own file.
#[derive(Clone, Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
    next_base: u32,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its base offset.
    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) -> u32 {
        let text = text.into();
        let base = self.next_base;
        self.next_base = base.saturating_add(text.len() as u32).saturating_add(1);
        self.files.push(SourceFile {
            name: name.into(),
            base,
            index: LineIndex::new(&text),
            text,
        });
        base
    }

    /// File containing a map offset.
    pub fn file(&self, offset: u32) -> Option<&SourceFile> {
        let idx = match self.files.binary_search_by_key(&offset, |f| f.base) {
            Ok(exact) => exact,
            Err(0) => return None,
            Err(insert) => insert - 1,
        };
        self.files.get(idx)
    }

    /// Resolve a map offset to a position.
    pub fn position(&self, offset: u32) -> Option<Position<'_>> {
        let file = self.file(offset)?;
        Some(file.position(offset - file.base))
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }
}

#[cfg(test)]
mod tests;
