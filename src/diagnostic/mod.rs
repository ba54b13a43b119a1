pub mod ansi;
pub mod json;
pub mod registry;

use crate::ast::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    #[allow(dead_code)] // forward infrastructure for future warning diagnostics
    Warning,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub file: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            file: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: true });
        self
    }

    #[allow(dead_code)] // forward infrastructure for multi-label diagnostics
    pub fn with_secondary_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: false });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attach the source text so renderers can show snippets and resolve
    /// spans to line/column positions.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for existing error types ----

impl From<&crate::bind::BindError> for Diagnostic {
    fn from(e: &crate::bind::BindError) -> Self {
        let mut d = Diagnostic::error(e.to_string())
            .with_code(e.code())
            .with_file(e.file());
        if e.span() != Span::UNKNOWN {
            d = d.with_span(e.span(), "here");
        }
        if let crate::bind::BindError::CircularDefault { name, .. } = e {
            d = d.with_suggestion(format!(
                "give '{name}' a default that does not read '{name}' itself"
            ));
        }
        d
    }
}

impl From<&crate::machine::MachineError> for Diagnostic {
    fn from(e: &crate::machine::MachineError) -> Self {
        let mut d = Diagnostic::error(e.to_string());
        if let Some(code) = e.code() {
            d = d.with_code(code);
        }
        d
    }
}
