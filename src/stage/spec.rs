//! Stage specification parser
//!
//! Grammar:
//!
//! ```text
//! trigger-regex => [#version-stage] [&prerelease-format] [api-key@]push-uri[{feed-uri}]
//!                  [|[symbols-api-key@]symbols-uri] (||name=value)*
//! ```
//!
//! Example: `^refs/heads/main$ => #ci &{Stage}-{DateTime} KEY@https://feed.example{https://mirror.example}|https://symbols.example||Channel=nightly`
//!
//! Absent, empty and malformed specifications all parse to "no stage".

use regex::{Captures, Regex};
use tracing::debug;

use crate::stage::properties::parse_properties;
use crate::stage::types::Stage;

/// Values used for everything a specification leaves out
#[derive(Debug, Clone, Default)]
pub struct StageDefaults<'a> {
    pub name: &'a str,
    pub version_stage: &'a str,
    pub is_stable: bool,
    pub api_key: Option<&'a str>,
    pub symbols_api_key: Option<&'a str>,
    pub prerelease_format: Option<&'a str>,
    pub additional_feed_sources: Vec<String>,
}

/// Parser for stage specifications
pub struct StageSpecParser {
    grammar_re: Regex,
}

impl StageSpecParser {
    pub fn new() -> Self {
        Self {
            grammar_re: Regex::new(concat!(
                r"^\s*(?P<Trigger>.+?)\s*=>\s*",
                r"(?:#(?P<VersionStage>[^\s|]*)\s+)?",
                r"(?:&(?P<PrereleaseFormat>\S*)\s+)?",
                r"(?:(?P<ApiKey>[^\s@|{}]*)@)?",
                r"(?P<PushSource>[^\s|{}]+)",
                r"\s*(?:\{\s*(?P<FeedSource>[^}]*?)\s*\})?",
                r"\s*(?:\|\s*(?:(?P<SymbolsApiKey>[^\s@|]*)@)?(?P<SymbolsSource>[^\s|]+))?",
                r"(?P<Properties>(?:\s*\|\|[^|]*)*)",
                r"\s*$",
            ))
            .expect("stage grammar pattern is valid"),
        }
    }

    /// Parse a stage specification
    ///
    /// Returns `None` when the input is absent, empty, does not follow the
    /// grammar, or carries an invalid trigger pattern.
    pub fn parse(&self, spec: Option<&str>, defaults: &StageDefaults<'_>) -> Option<Stage> {
        let spec = spec.map(str::trim).filter(|s| !s.is_empty())?;

        let Some(caps) = self.grammar_re.captures(spec) else {
            debug!("Stage specification does not match grammar: {}", spec);
            return None;
        };

        let trigger_text = caps.name("Trigger")?.as_str();
        let trigger = Regex::new(trigger_text)
            .inspect_err(|e| debug!("Invalid trigger pattern '{}': {}", trigger_text, e))
            .ok()?;
        let push_source = caps.name("PushSource")?.as_str();

        let api_key = match caps.name("ApiKey") {
            Some(key) if key.as_str().is_empty() => None,
            Some(key) => Some(key.as_str().to_string()),
            None => defaults.api_key.map(str::to_string),
        };

        let symbols_source = non_empty(&caps, "SymbolsSource");
        let symbols_api_key = symbols_source.as_ref().and_then(|_| {
            non_empty(&caps, "SymbolsApiKey")
                .or_else(|| defaults.symbols_api_key.map(str::to_string))
                .or_else(|| api_key.clone())
                .or_else(|| defaults.api_key.map(str::to_string))
        });

        let version_stage = non_empty(&caps, "VersionStage")
            .unwrap_or_else(|| defaults.version_stage.to_string());

        let mut stage = Stage::new(
            defaults.name,
            &version_stage,
            defaults.is_stable,
            trigger,
            push_source,
        );
        stage.api_key = api_key;
        stage.symbols_source = symbols_source;
        stage.symbols_api_key = symbols_api_key;
        stage.prerelease_format = non_empty(&caps, "PrereleaseFormat")
            .or_else(|| defaults.prerelease_format.map(str::to_string));
        if let Some(feed_source) = non_empty(&caps, "FeedSource") {
            stage.feed_source = feed_source;
        }
        stage.additional_feed_sources = defaults.additional_feed_sources.clone();
        if let Some(properties) = caps.name("Properties") {
            stage.properties = parse_properties(properties.as_str().split("||"));
        }

        Some(stage)
    }
}

impl Default for StageSpecParser {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn defaults() -> StageDefaults<'static> {
        StageDefaults {
            name: "integration",
            version_stage: "ci",
            is_stable: false,
            ..Default::default()
        }
    }

    fn parse(spec: &str, defaults: &StageDefaults<'_>) -> Option<Stage> {
        StageSpecParser::new().parse(Some(spec), defaults)
    }

    #[test]
    fn parse_reads_keys_sources_and_version_stage() {
        let stage = parse(
            ".+ => #int 1A-K@https://uri.com|https://uri.com/symbols",
            &defaults(),
        )
        .unwrap();

        assert!(stage.trigger.is_match("refs/heads/release/branch"));
        assert_eq!(stage.push_source, "https://uri.com");
        assert_eq!(stage.feed_source, "https://uri.com");
        assert_eq!(stage.symbols_source.as_deref(), Some("https://uri.com/symbols"));
        assert_eq!(stage.api_key.as_deref(), Some("1A-K"));
        assert_eq!(stage.symbols_api_key.as_deref(), Some("1A-K"));
        assert_eq!(stage.version_stage, "int");
        assert_eq!(stage.name, "integration");
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("  "))]
    #[case(Some("no arrow here"))]
    #[case(Some("=> https://uri.com"))]
    #[case(Some("^main$ =>"))]
    #[case(Some("(unclosed => https://uri.com"))]
    fn parse_returns_none_for_absent_or_malformed_input(#[case] spec: Option<&str>) {
        assert!(StageSpecParser::new().parse(spec, &defaults()).is_none());
    }

    #[test]
    fn parse_uses_defaults_for_missing_parts() {
        let defaults = StageDefaults {
            api_key: Some("DEFAULT"),
            prerelease_format: Some("{Stage}"),
            additional_feed_sources: vec!["https://prod.example".to_string()],
            ..defaults()
        };

        let stage = parse("^main$ => https://uri.com", &defaults).unwrap();

        assert_eq!(stage.api_key.as_deref(), Some("DEFAULT"));
        assert_eq!(stage.version_stage, "ci");
        assert_eq!(stage.prerelease_format.as_deref(), Some("{Stage}"));
        assert_eq!(stage.additional_feed_sources, vec!["https://prod.example"]);
        assert_eq!(stage.symbols_source, None);
        assert_eq!(stage.symbols_api_key, None);
    }

    #[test]
    fn parse_normalizes_empty_api_key_to_none() {
        let defaults = StageDefaults {
            api_key: Some("DEFAULT"),
            ..defaults()
        };

        let stage = parse("^main$ => @https://uri.com", &defaults).unwrap();

        assert_eq!(stage.api_key, None);
    }

    #[rstest]
    // own key wins
    #[case("^x$ => K@https://a|S@https://s", Some("FS"), Some("FK"), Some("S"))]
    // caller symbols fallback next
    #[case("^x$ => K@https://a|https://s", Some("FS"), Some("FK"), Some("FS"))]
    // then the resolved api key
    #[case("^x$ => K@https://a|https://s", None, Some("FK"), Some("K"))]
    // then the caller fallback key, even when the api key was explicitly empty
    #[case("^x$ => @https://a|https://s", None, Some("FK"), Some("FK"))]
    #[case("^x$ => @https://a|https://s", None, None, None)]
    fn parse_resolves_symbols_key_through_fallbacks(
        #[case] spec: &str,
        #[case] fallback_symbols_key: Option<&'static str>,
        #[case] fallback_key: Option<&'static str>,
        #[case] expected: Option<&str>,
    ) {
        let defaults = StageDefaults {
            api_key: fallback_key,
            symbols_api_key: fallback_symbols_key,
            ..defaults()
        };

        let stage = parse(spec, &defaults).unwrap();

        assert_eq!(stage.symbols_api_key.as_deref(), expected);
    }

    #[test]
    fn parse_reads_feed_source_and_prerelease_format() {
        let stage = parse(
            r"^refs/heads/(?<Postfix>.+)$ => #dev &{Postfix}.{Stage} KEY@https://push.example { https://mirror.example }",
            &defaults(),
        )
        .unwrap();

        assert_eq!(stage.push_source, "https://push.example");
        assert_eq!(stage.feed_source, "https://mirror.example");
        assert_eq!(stage.prerelease_format.as_deref(), Some("{Postfix}.{Stage}"));
        assert_eq!(stage.version_stage, "dev");
        assert_eq!(stage.api_key.as_deref(), Some("KEY"));
    }

    #[test]
    fn parse_reads_properties_in_declaration_order() {
        let stage = parse(
            "^main$ => https://uri.com|https://uri.com/symbols||Channel=stable||Owner=team a",
            &defaults(),
        )
        .unwrap();

        assert_eq!(stage.symbols_source.as_deref(), Some("https://uri.com/symbols"));
        assert_eq!(
            stage.properties.into_iter().collect::<Vec<_>>(),
            vec![
                ("Channel".to_string(), "stable".to_string()),
                ("Owner".to_string(), "team a".to_string()),
            ]
        );
    }

    #[test]
    fn parse_reads_properties_without_symbols_source() {
        let stage = parse("^main$ => https://uri.com||Channel=stable", &defaults()).unwrap();

        assert_eq!(stage.symbols_source, None);
        assert_eq!(
            stage.properties.get("Channel").map(String::as_str),
            Some("stable")
        );
    }

    #[test]
    fn parse_accepts_local_paths() {
        let stage = parse(r"^local$ => C:\packages", &defaults()).unwrap();
        assert_eq!(stage.push_source, r"C:\packages");
    }
}
