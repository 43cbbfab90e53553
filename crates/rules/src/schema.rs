use {
    regex::Regex,
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// Validated rules payload for one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRules {
    /// Channel name the file claims to configure. Informational only.
    #[serde(default)]
    pub channel: Option<String>,

    /// External repository holding the canonical copy of this file, linked in
    /// the update confirmation message when present.
    #[serde(default)]
    pub remote_repository: Option<String>,

    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// A single reaction rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(default)]
    pub description: Option<String>,

    /// Substring matcher against the message text.
    #[serde(default)]
    pub contains: Option<String>,

    /// Regex matcher against the message text.
    #[serde(default)]
    pub pattern: Option<String>,

    /// Emoji reaction to add when the rule matches.
    #[serde(default)]
    pub emoji: Option<String>,

    /// Comment to post in the message thread when the rule matches.
    #[serde(default)]
    pub comment: Option<String>,
}

impl ChannelRules {
    /// Parse and schema-validate a raw YAML document.
    pub fn parse(raw: &str) -> Result<Self> {
        let rules: Self = serde_yaml::from_str(raw)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Number of rule entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules whose matcher hits the given message text.
    pub fn matching<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a RuleEntry> {
        self.rules.iter().filter(move |rule| rule.matches(text))
    }

    fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(Error::schema("rules", "at least one rule entry is required"));
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            rule.validate(idx)?;
        }
        Ok(())
    }
}

impl RuleEntry {
    fn validate(&self, idx: usize) -> Result<()> {
        if self.contains.is_none() && self.pattern.is_none() {
            return Err(Error::schema(
                format!("rules[{idx}]"),
                "a rule needs a `contains` or `pattern` matcher",
            ));
        }
        if self.emoji.is_none() && self.comment.is_none() {
            return Err(Error::schema(
                format!("rules[{idx}]"),
                "a rule needs an `emoji` or `comment` action",
            ));
        }
        if let Some(pattern) = &self.pattern
            && let Err(e) = Regex::new(pattern)
        {
            return Err(Error::schema(
                format!("rules[{idx}].pattern"),
                format!("invalid pattern: {e}"),
            ));
        }
        Ok(())
    }

    /// Whether this rule's matcher hits the given text.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        if let Some(needle) = &self.contains
            && text.contains(needle.as_str())
        {
            return true;
        }
        // Patterns are compiled during validation; a pattern that no longer
        // compiles here simply never matches.
        if let Some(pattern) = &self.pattern
            && Regex::new(pattern).is_ok_and(|re| re.is_match(text))
        {
            return true;
        }
        false
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r"
channel: ci-alerts
remote_repository: https://github.com/acme/ci-configs
rules:
  - description: compile failures
    contains: 'error[E'
    emoji: hammer
  - description: infra flake
    pattern: 'timed out waiting for .*'
    comment: Known infra flake, see the status page.
";

    #[test]
    fn parse_valid_document() {
        let rules = ChannelRules::parse(VALID).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.channel.as_deref(), Some("ci-alerts"));
        assert_eq!(
            rules.remote_repository.as_deref(),
            Some("https://github.com/acme/ci-configs")
        );
    }

    #[test]
    fn syntax_error_is_syntax() {
        let err = ChannelRules::parse("rules:\n  - description: [unterminated").unwrap_err();
        assert!(matches!(err, Error::Syntax(_)), "got {err:?}");
        assert!(err.is_validation());
        assert_eq!(err.class_name(), "SyntaxError");
    }

    #[test]
    fn empty_rules_is_schema_error() {
        let err = ChannelRules::parse("channel: ci-alerts\nrules: []\n").unwrap_err();
        assert!(matches!(err, Error::Schema { .. }), "got {err:?}");
        assert!(err.is_validation());
        assert_eq!(err.class_name(), "SchemaError");
    }

    #[test]
    fn rule_without_matcher_rejected() {
        let err = ChannelRules::parse("rules:\n  - emoji: hammer\n").unwrap_err();
        assert!(matches!(err, Error::Schema { ref path, .. } if path == "rules[0]"));
    }

    #[test]
    fn rule_without_action_rejected() {
        let err = ChannelRules::parse("rules:\n  - contains: boom\n").unwrap_err();
        assert!(matches!(err, Error::Schema { ref path, .. } if path == "rules[0]"));
    }

    #[test]
    fn bad_pattern_rejected_with_path() {
        let err = ChannelRules::parse("rules:\n  - pattern: '['\n    emoji: x\n").unwrap_err();
        assert!(
            matches!(err, Error::Schema { ref path, .. } if path == "rules[0].pattern"),
            "got {err:?}"
        );
    }

    #[test]
    fn matching_by_contains_and_pattern() {
        let rules = ChannelRules::parse(VALID).unwrap();
        let hits: Vec<_> = rules.matching("step timed out waiting for node").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description.as_deref(), Some("infra flake"));

        let hits: Vec<_> = rules.matching("build: error[E0308] mismatched types").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].emoji.as_deref(), Some("hammer"));

        assert_eq!(rules.matching("all green").count(), 0);
    }
}
