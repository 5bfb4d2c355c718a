//! Property lists and the fallback stage mini-syntax
//!
//! Format: `[#name|]key=value|key=value...`
//!
//! A bare `#name` without properties is accepted. Entries without `=` are skipped.

use indexmap::IndexMap;

/// Parsed fallback stage specification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackSpec {
    pub name: Option<String>,
    pub properties: IndexMap<String, String>,
}

/// Parse the fallback specification; absent or empty input yields the default
pub fn parse_fallback(spec: Option<&str>) -> FallbackSpec {
    let Some(spec) = spec.map(str::trim).filter(|s| !s.is_empty()) else {
        return FallbackSpec::default();
    };

    let (name, rest) = match spec.strip_prefix('#') {
        Some(named) => match named.split_once('|') {
            Some((name, rest)) => (Some(name), rest),
            None => (Some(named), ""),
        },
        None => (None, spec),
    };

    FallbackSpec {
        name: name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        properties: parse_properties(rest.split('|')),
    }
}

/// Collect `key=value` entries in declaration order; later keys win
pub fn parse_properties<'a>(entries: impl IntoIterator<Item = &'a str>) -> IndexMap<String, String> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}
