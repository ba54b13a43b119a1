/// Maps byte offsets within source text to 1-based line/column positions.
///
/// Built once per source buffer; diagnostics renderers use it to turn a
/// node span into a printable location.
pub struct SourceMap {
    starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        SourceMap { starts }
    }

    /// 1-based (line, column) for a byte offset.
    pub fn location(&self, offset: usize) -> (usize, usize) {
        let line = self
            .starts
            .partition_point(|&s| s <= offset)
            .saturating_sub(1);
        (line + 1, offset - self.starts[line] + 1)
    }

    /// 1-based line number for a byte offset.
    pub fn line(&self, offset: usize) -> usize {
        self.location(offset).0
    }

    /// The text of a 1-based line, without its trailing newline. Out of
    /// range lines yield the empty string.
    pub fn snippet<'a>(&self, source: &'a str, line: usize) -> &'a str {
        if line == 0 || line > self.starts.len() {
            return "";
        }
        let start = self.starts[line - 1];
        let end = self.starts.get(line).copied().unwrap_or(source.len());
        source[start..end].trim_end_matches(['\n', '\r'])
    }
}
