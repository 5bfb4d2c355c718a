//! Result formatting
//!
//! Output templates render the facts of a resolution into lines for the build
//! system. Several templates can share one string separated by `|`, with `||`
//! standing for a literal pipe. A `>path` template redirects the line rendered
//! by the template that follows it into a file.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::publish::PublishInfo;
use crate::template::{NamedArguments, format};
use crate::version::SemanticVersion;

/// One rendered output template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    /// Printed to standard output
    Emit(String),
    /// Appended to a file
    File { path: PathBuf, text: String },
    /// The template was rejected; the message replaces its text
    Diagnostic(String),
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to write output to {path:?}: {source}")]
    File { path: PathBuf, source: io::Error },

    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Names available to output templates
///
/// Stage properties are added after the built-in facts and never replace one.
pub fn output_facts(
    info: &PublishInfo,
    version: &SemanticVersion,
    parameter: Option<&str>,
    properties: &IndexMap<String, String>,
) -> NamedArguments {
    let mut facts = NamedArguments::new()
        .with("PackageId", info.package_id.as_str())
        .with("Version", info.version.as_str())
        .with("FullVersion", info.full_version.as_str())
        .with("Stage", info.stage.as_str())
        .with("VersionStage", info.version_stage.as_str())
        .with("IsPromotion", info.is_promotion)
        .with("IsEnabled", info.is_enabled)
        .with("PushSource", info.push_source.as_str())
        .with("ApiKey", info.api_key.as_deref())
        .with("FeedSource", info.feed_source.as_str())
        .with("SymbolsSource", info.symbols_source.as_deref())
        .with("SymbolsApiKey", info.symbols_api_key.as_deref())
        .with("Metadata", info.metadata.as_deref())
        .with("Parameter", parameter)
        .with("Major", version.major)
        .with("Minor", version.minor)
        .with("Patch", version.patch)
        .with("Revision", version.revision.unwrap_or(0));

    for (name, value) in properties {
        if !facts.insert_if_absent(name, value.as_str()) {
            debug!("Stage property {} shadowed by built-in fact", name);
        }
    }
    facts
}

/// Split a template string on `|`, treating `||` as a literal pipe
pub fn split_templates(text: &str) -> Vec<String> {
    let mut templates = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '|' {
            current.push(c);
        } else if chars.peek() == Some(&'|') {
            chars.next();
            current.push('|');
        } else {
            templates.push(std::mem::take(&mut current));
        }
    }
    templates.push(current);

    templates.retain(|template| !template.trim().is_empty());
    templates
}

fn render_one(template: &str, facts: &NamedArguments) -> Result<String, String> {
    format(template, facts)
        .and_then(|formatted| formatted.into_strict())
        .map_err(|e| format!("Output template '{}' rejected: {}", template, e))
}

/// Render every template of every template string
pub fn render_outputs(templates: &[String], facts: &NamedArguments) -> Vec<OutputLine> {
    let mut lines = Vec::new();

    for text in templates {
        let mut parts = split_templates(text).into_iter();
        while let Some(part) = parts.next() {
            let line = match part.strip_prefix('>') {
                Some(path) => {
                    let path = PathBuf::from(path.trim());
                    match parts.next() {
                        Some(template) => match render_one(&template, facts) {
                            Ok(text) => OutputLine::File { path, text },
                            Err(message) => OutputLine::Diagnostic(message),
                        },
                        None => OutputLine::Diagnostic(format!(
                            "Output redirection to {:?} has no template",
                            path
                        )),
                    }
                }
                None => match render_one(&part, facts) {
                    Ok(text) => OutputLine::Emit(text),
                    Err(message) => OutputLine::Diagnostic(message),
                },
            };
            lines.push(line);
        }
    }
    lines
}

fn append_line(path: &Path, text: &str) -> Result<(), OutputError> {
    let to_error = |source| OutputError::File {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_error)?;
    writeln!(file, "{}", text).map_err(to_error)
}

/// Print emitted lines, append redirected lines and log diagnostics
pub fn deliver(lines: &[OutputLine], out: &mut impl Write) -> Result<(), OutputError> {
    for line in lines {
        match line {
            OutputLine::Emit(text) => writeln!(out, "{}", text)?,
            OutputLine::File { path, text } => {
                append_line(path, text)?;
                debug!("Wrote output line to {:?}", path);
            }
            OutputLine::Diagnostic(message) => warn!("{}", message),
        }
    }
    Ok(())
}
