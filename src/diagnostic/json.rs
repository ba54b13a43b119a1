use super::{Diagnostic, Severity};
use crate::ast::SourceMap;

pub fn render(d: &Diagnostic) -> String {
    let severity = match d.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };

    // One SourceMap for all labels.
    let source_map = d.source.as_deref().map(SourceMap::new);

    let labels: Vec<serde_json::Value> = d
        .labels
        .iter()
        .map(|l| {
            let mut obj = serde_json::json!({
                "start": l.span.start,
                "end": l.span.end,
                "message": l.message,
                "primary": l.is_primary,
            });
            if let Some(map) = &source_map {
                let (line, col) = map.location(l.span.start);
                obj["line"] = serde_json::Value::from(line);
                obj["col"] = serde_json::Value::from(col);
            }
            obj
        })
        .collect();

    let mut obj = serde_json::json!({
        "severity": severity,
        "message": d.message,
        "labels": labels,
        "notes": d.notes,
    });

    if let Some(code) = d.code {
        obj["code"] = serde_json::Value::String(code.to_string());
    }

    if let Some(file) = &d.file {
        obj["file"] = serde_json::Value::String(file.clone());
    }

    if let Some(s) = &d.suggestion {
        obj["suggestion"] = serde_json::Value::String(s.clone());
    }

    serde_json::to_string(&obj).unwrap_or_else(|_| {
        r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string()
    })
}
