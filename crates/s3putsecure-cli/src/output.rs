//! Console output
//!
//! Human output prints marked lines (`✓`, `✗`, `⚠`) with indented detail.
//! JSON output prints one object per line on stdout: an event for every
//! decision and upload, then a final `summary` event. Warnings and errors
//! go to stderr in both modes.

use serde_json::{Map, Value};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// Structured record of something that happened; JSON output only
    fn event(&self, kind: &str, fields: Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter {
    quiet: bool,
}

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        if !self.quiet {
            println!("\u{2713} {message}");
        }
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {message}");
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {message}");
    }
    fn info(&self, message: &str) {
        if !self.quiet {
            println!("  {message}");
        }
    }
    fn event(&self, _kind: &str, _fields: Value) {}
}

/// Newline-delimited JSON formatter
pub struct JsonFormatter;

/// Builds `{"event": kind, ...fields}`; non-object `fields` land under `data`
pub fn event_object(kind: &str, fields: Value) -> Value {
    let mut map = Map::new();
    map.insert("event".to_string(), Value::from(kind));
    match fields {
        Value::Object(extra) => map.extend(extra),
        Value::Null => {}
        other => {
            map.insert("data".to_string(), other);
        }
    }
    Value::Object(map)
}

impl OutputFormatter for JsonFormatter {
    fn success(&self, _message: &str) {}
    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"level": "error", "message": message}));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"level": "warning", "message": message}));
    }
    fn info(&self, _message: &str) {}
    fn event(&self, kind: &str, fields: Value) {
        println!("{}", event_object(kind, fields));
    }
}

pub fn get_formatter(format: OutputFormat, quiet: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter { quiet }),
    }
}
