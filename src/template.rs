//! Named placeholder formatting
//!
//! Templates reference values by name: `{Name}` or `{Name:spec}`. Literal braces
//! are written as `{{` and `}}`. Formatting never fails on a missing value;
//! instead the result reports which referenced names were null and which were
//! not known at all, and the caller decides whether that is acceptable.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

/// A value that can be substituted into a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Null,
    Text(String),
    Integer(u64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl TemplateValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TemplateValue::Null)
    }

    fn render(&self, spec: Option<&str>) -> String {
        match self {
            TemplateValue::Null => String::new(),
            TemplateValue::Text(text) => text.clone(),
            TemplateValue::Bool(value) => value.to_string(),
            TemplateValue::Integer(value) => match spec.and_then(zero_pad_width) {
                Some(width) => format!("{:0width$}", value, width = width),
                None => value.to_string(),
            },
            TemplateValue::Timestamp(timestamp) => match spec {
                Some(spec) => timestamp.format(&to_strftime(spec)).to_string(),
                None => timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Text(value)
    }
}

impl From<Option<String>> for TemplateValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(TemplateValue::Null, TemplateValue::Text)
    }
}

impl From<Option<&str>> for TemplateValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(TemplateValue::Null, TemplateValue::from)
    }
}

impl From<u64> for TemplateValue {
    fn from(value: u64) -> Self {
        TemplateValue::Integer(value)
    }
}

impl From<Option<u64>> for TemplateValue {
    fn from(value: Option<u64>) -> Self {
        value.map_or(TemplateValue::Null, TemplateValue::Integer)
    }
}

impl From<bool> for TemplateValue {
    fn from(value: bool) -> Self {
        TemplateValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for TemplateValue {
    fn from(value: DateTime<Utc>) -> Self {
        TemplateValue::Timestamp(value)
    }
}

/// Ordered set of named values available to a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedArguments {
    values: IndexMap<String, TemplateValue>,
}

impl NamedArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a value, builder style
    pub fn with(mut self, name: &str, value: impl Into<TemplateValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<TemplateValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Adds a value only if the name is not taken yet
    pub fn insert_if_absent(&mut self, name: &str, value: impl Into<TemplateValue>) -> bool {
        if self.values.contains_key(name) {
            return false;
        }
        self.values.insert(name.to_string(), value.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Error type for template formatting
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Malformed template '{template}': {reason}")]
    Malformed { template: String, reason: String },

    #[error("Unknown names: {}", .0.join(", "))]
    UnknownNames(Vec<String>),

    #[error("Null values: {}", .0.join(", "))]
    NullValues(Vec<String>),
}

/// Result of formatting a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    /// Rendered text; null and unknown names render as empty
    pub text: String,
    /// Referenced names whose value was null, in order of first reference
    pub null_names: Vec<String>,
    /// Referenced names not present in the arguments, in order of first reference
    pub unknown_names: Vec<String>,
}

impl Formatted {
    /// Rejects the result if any referenced name was unknown or null
    pub fn into_strict(self) -> Result<String, TemplateError> {
        if !self.unknown_names.is_empty() {
            return Err(TemplateError::UnknownNames(self.unknown_names));
        }
        if !self.null_names.is_empty() {
            return Err(TemplateError::NullValues(self.null_names));
        }
        Ok(self.text)
    }

    /// Rejects the result only for unknown names; nulls render as empty
    pub fn into_lenient(self) -> Result<String, TemplateError> {
        if !self.unknown_names.is_empty() {
            return Err(TemplateError::UnknownNames(self.unknown_names));
        }
        Ok(self.text)
    }
}

/// Formats a template against the given arguments
pub fn format(template: &str, args: &NamedArguments) -> Result<Formatted, TemplateError> {
    let malformed = |reason: &str| TemplateError::Malformed {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut text = String::with_capacity(template.len());
    let mut null_names: Vec<String> = Vec::new();
    let mut unknown_names: Vec<String> = Vec::new();
    let mut chars = template.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|(_, next)| *next) == Some('{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek().map(|(_, next)| *next) == Some('}') => {
                chars.next();
                text.push('}');
            }
            '}' => return Err(malformed(&format!("unexpected '}}' at {}", index))),
            '{' => {
                let mut placeholder = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    placeholder.push(inner);
                }
                if !closed {
                    return Err(malformed(&format!("unterminated placeholder at {}", index)));
                }

                let (name, spec) = match placeholder.split_once(':') {
                    Some((name, spec)) => (name.trim(), Some(spec)),
                    None => (placeholder.trim(), None),
                };
                if name.is_empty() {
                    return Err(malformed(&format!("empty placeholder at {}", index)));
                }

                match args.get(name) {
                    Some(value) if value.is_null() => {
                        if !null_names.iter().any(|n| n == name) {
                            null_names.push(name.to_string());
                        }
                    }
                    Some(value) => text.push_str(&value.render(spec)),
                    None => {
                        if !unknown_names.iter().any(|n| n == name) {
                            unknown_names.push(name.to_string());
                        }
                    }
                }
            }
            other => text.push(other),
        }
    }

    Ok(Formatted {
        text,
        null_names,
        unknown_names,
    })
}

/// Parses integer format specs of the form `D<width>`
fn zero_pad_width(spec: &str) -> Option<usize> {
    spec.strip_prefix(['D', 'd'])?.parse().ok()
}

/// Converts a `yyyyMMdd-HHmmss` style date pattern to a strftime pattern
fn to_strftime(spec: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("yyyy", "%Y"),
        ("fff", "%3f"),
        ("yy", "%y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut out = String::with_capacity(spec.len() * 2);
    let mut rest = spec;
    'outer: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}
