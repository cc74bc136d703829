//! Utilities to render `tracing` events into concise logfmt records.
//!
//! Events in this workspace are named by their `message` (e.g.
//! `keybind_registered`) and carry context as fields. [`render_event`] keeps
//! both: the name, and the fields as ordered `key=value` pairs.

use std::fmt::{self, Debug, Write};

use tracing::{
    Event, Metadata,
    field::{Field, Visit},
};

/// Rendered fields extracted from a tracing Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLog {
    /// Severity level (e.g., INFO, WARN) for the event.
    pub level: String,
    /// Event target (typically the module path).
    pub target: String,
    /// Event name: the `message` field, or empty if there was none.
    pub message: String,
    /// Remaining fields in recording order, values rendered as text.
    pub fields: Vec<(String, String)>,
}

impl RenderedLog {
    /// Value of the field called `name`, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for RenderedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = self.message.clone();
        for (k, v) in &self.fields {
            if !line.is_empty() {
                line.push(' ');
            }
            if v.contains(char::is_whitespace) || v.contains('"') {
                let _ignored = write!(&mut line, "{k}={v:?}");
            } else {
                let _ignored = write!(&mut line, "{k}={v}");
            }
        }
        f.write_str(&line)
    }
}

/// Extract level, target, name and fields from a tracing Event.
///
/// String fields are recorded verbatim; everything else through its `Debug`
/// (or, for `%` fields, `Display`) rendering.
pub fn render_event(event: &Event<'_>) -> RenderedLog {
    struct FieldVisitor {
        /// Captured `message` field, if present.
        msg: Option<String>,
        /// Non-message fields in recording order.
        fields: Vec<(String, String)>,
    }
    impl Visit for FieldVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "message" {
                self.msg = Some(value.to_string());
            } else {
                self.fields
                    .push((field.name().to_string(), value.to_string()));
            }
        }
        fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
            if field.name() == "message" {
                self.msg = Some(format!("{value:?}"));
            } else {
                self.fields
                    .push((field.name().to_string(), format!("{value:?}")));
            }
        }
    }
    let meta: &Metadata<'_> = event.metadata();
    let mut vis = FieldVisitor {
        msg: None,
        fields: Vec::new(),
    };
    event.record(&mut vis);
    RenderedLog {
        level: meta.level().to_string(),
        target: meta.target().to_string(),
        message: vis.msg.unwrap_or_default(),
        fields: vis.fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(message: &str, fields: &[(&str, &str)]) -> RenderedLog {
        RenderedLog {
            level: "WARN".into(),
            target: "keybinds::runtime".into(),
            message: message.into(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn display_quotes_only_when_needed() {
        let r = log(
            "keybind_callback_script_error",
            &[("key", "F1"), ("error", "script error: boom now")],
        );
        assert_eq!(
            r.to_string(),
            "keybind_callback_script_error key=F1 error=\"script error: boom now\""
        );
        assert_eq!(r.field("key"), Some("F1"));
        assert_eq!(r.field("missing"), None);
    }

    #[test]
    fn fields_without_message() {
        let r = log("", &[("count", "3")]);
        assert_eq!(r.to_string(), "count=3");
    }
}
