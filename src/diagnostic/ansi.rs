use super::{Diagnostic, Severity};
use crate::ast::SourceMap;

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[2m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error[BRL-B003]: message"
        let severity = match d.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let header = match d.code {
            Some(code) => format!("{severity}[{code}]"),
            None => severity.to_string(),
        };
        let header = match d.severity {
            Severity::Error => self.bold_red(&header),
            Severity::Warning => self.bold(&self.cyan(&header)),
        };
        out.push_str(&format!("{}: {}\n", header, self.bold(&d.message)));

        let primary = d.labels.iter().find(|l| l.is_primary);
        match (primary, &d.source) {
            // Full snippet when the source text is attached.
            (Some(label), Some(source)) => {
                let map = SourceMap::new(source);
                let (line, col) = map.location(label.span.start);
                let line_text = map.snippet(source, line);

                let location = match &d.file {
                    Some(file) => format!("{file}:{line}:{col}"),
                    None => format!("{line}:{col}"),
                };
                out.push_str(&format!("  {} {location}\n", self.cyan("-->")));

                let gutter = line.to_string().len();
                let pipe = self.cyan("|");
                let pad = " ".repeat(gutter);

                out.push_str(&format!("{pad} {pipe}\n"));

                let line_num = self.cyan(&format!("{line:>gutter$}"));
                out.push_str(&format!("{line_num} {pipe} {line_text}\n"));

                let span_start_in_line = col.saturating_sub(1);
                let span_len = (label.span.end.saturating_sub(label.span.start)).max(1);
                let carets = self.bold_red(&"^".repeat(span_len));
                let indent = " ".repeat(span_start_in_line);
                if label.message.is_empty() {
                    out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
                } else {
                    out.push_str(&format!(
                        "{pad} {pipe} {indent}{carets} {}\n",
                        self.bold_red(&label.message)
                    ));
                }

                out.push_str(&format!("{pad} {pipe}\n"));
            }
            // No source text: still name the file and byte range.
            (Some(label), None) => {
                let location = match &d.file {
                    Some(file) => format!("{file}:{}..{}", label.span.start, label.span.end),
                    None => format!("{}..{}", label.span.start, label.span.end),
                };
                out.push_str(&format!("  {} {location}\n", self.cyan("-->")));
            }
            (None, _) => {
                if let Some(file) = &d.file {
                    out.push_str(&format!("  {} {file}\n", self.cyan("-->")));
                }
            }
        }

        for label in d.labels.iter().filter(|l| !l.is_primary) {
            if !label.message.is_empty() {
                out.push_str(&format!("  {} {}\n", self.dim("="), label.message));
            }
        }

        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }

        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} suggestion: {}\n", self.dim("="), suggestion));
        }

        out
    }
}
