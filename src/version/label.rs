//! Prerelease label and metadata templating
//!
//! Placeholders: `Stage`, `DateTime`, `DateTimeValue`, `Prefix`, `Postfix`,
//! `Metadata`, `Parameter`. The rendered text is normalized into a legal
//! version suffix.

use chrono::{DateTime, Utc};

use crate::template::{NamedArguments, format};
use crate::version::error::VersionError;

/// Date pattern of the `DateTime` placeholder
const DATE_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Values available to label and metadata templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelContext<'a> {
    pub version_stage: &'a str,
    pub timestamp: DateTime<Utc>,
    pub prefix: &'a str,
    pub postfix: &'a str,
    pub metadata: Option<&'a str>,
    pub parameter: Option<&'a str>,
}

impl LabelContext<'_> {
    fn arguments(&self) -> NamedArguments {
        NamedArguments::new()
            .with("Stage", self.version_stage)
            .with(
                "DateTime",
                self.timestamp.format(DATE_TIME_FORMAT).to_string(),
            )
            .with("DateTimeValue", self.timestamp)
            .with("Prefix", self.prefix)
            .with("Postfix", self.postfix)
            .with("Metadata", self.metadata)
            .with("Parameter", self.parameter)
    }
}

/// Template used when a stage does not declare its own prerelease format
///
/// `[{Prefix}-]u{DateTimeValue:yyyyMMdd-HHmmss}[-{Stage}][-{Postfix}]`, with
/// the optional parts present only when their value is non-empty.
pub fn default_prerelease_format(context: &LabelContext<'_>) -> String {
    let mut template = String::new();
    if !context.prefix.is_empty() {
        template.push_str("{Prefix}-");
    }
    template.push_str("u{DateTimeValue:yyyyMMdd-HHmmss}");
    if !context.version_stage.is_empty() {
        template.push_str("-{Stage}");
    }
    if !context.postfix.is_empty() {
        template.push_str("-{Postfix}");
    }
    template
}

/// Render a prerelease label from the given or the default template
pub fn render_prerelease(
    format_template: Option<&str>,
    context: &LabelContext<'_>,
) -> Result<String, VersionError> {
    let template = match format_template {
        Some(template) => template.to_string(),
        None => default_prerelease_format(context),
    };
    Ok(normalize_prerelease(&render(&template, context)?))
}

/// Render a metadata segment from a template
pub fn render_metadata(
    format_template: &str,
    context: &LabelContext<'_>,
) -> Result<String, VersionError> {
    Ok(normalize_label(&render(format_template, context)?))
}

fn render(template: &str, context: &LabelContext<'_>) -> Result<String, VersionError> {
    Ok(format(template, &context.arguments())?.into_lenient()?)
}

/// Turn arbitrary text into a legal version suffix
///
/// Characters outside `[0-9A-Za-z.-]` become `-`, runs of `.`/`-` collapse to
/// their first character, and leading/trailing separators are trimmed.
pub fn normalize_label(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut previous_was_separator = false;

    for c in text.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            c
        } else {
            '-'
        };
        let is_separator = c == '.' || c == '-';
        if is_separator && previous_was_separator {
            continue;
        }
        normalized.push(c);
        previous_was_separator = is_separator;
    }

    normalized.trim_matches(['-', '.']).to_string()
}

/// Normalize text into a prerelease label
///
/// On top of [`normalize_label`], numeric identifiers lose their leading
/// zeros (`05` becomes `5`, `0` stays `0`).
pub fn normalize_prerelease(text: &str) -> String {
    normalize_label(text)
        .split('.')
        .map(|identifier| {
            if identifier.is_empty() || !identifier.bytes().all(|b| b.is_ascii_digit()) {
                return identifier;
            }
            match identifier.trim_start_matches('0') {
                "" => "0",
                trimmed => trimmed,
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
