//! Byte offset to line/column conversion.

/// Pre-computed line starts for one source text.
///
/// Lookups binary-search the table, so repeated conversions for a file with
/// many diagnostics stay cheap.
///
/// ```
/// use gossa_diagnostic::LineIndex;
///
/// let source = "package main\n\nfunc main() {}\n";
/// let index = LineIndex::new(source);
/// assert_eq!(index.line_col(source, 0), (1, 1));
/// assert_eq!(index.line_col(source, 14), (3, 1));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineIndex {
    /// `starts[i]` is the byte offset where line `i + 1` begins.
    starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                starts.push((i + 1) as u32);
            }
        }
        LineIndex { starts }
    }

    /// 1-based line containing `offset`.
    pub fn line(&self, offset: u32) -> u32 {
        let idx = match self.starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        (idx as u32) + 1
    }

    /// 1-based (line, column). Columns count bytes, as `go/token` does.
    pub fn line_col(&self, source: &str, offset: u32) -> (u32, u32) {
        let line = self.line(offset);
        let start = self.starts.get((line - 1) as usize).copied().unwrap_or(0);
        let offset = offset.min(source.len() as u32);
        (line, offset.saturating_sub(start) + 1)
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Text of a 1-based line without its newline.
    pub fn line_text<'a>(&self, source: &'a str, line: u32) -> Option<&'a str> {
        let idx = line.checked_sub(1)? as usize;
        let start = *self.starts.get(idx)? as usize;
        let end = self
            .starts
            .get(idx + 1)
            .map_or(source.len(), |next| (*next as usize).saturating_sub(1));
        source.get(start..end)
    }
}

#[cfg(test)]
mod tests;
