//! Automated-traffic classification over user-agent strings

use tracing::debug;

/// Versioned, configurable rule set for flagging automated traffic.
/// Classification is a pure substring match and never fails.
#[derive(Debug, Clone)]
pub struct BotClassifier {
    version: String,
    patterns: Vec<String>,
}

impl BotClassifier {
    /// Patterns are matched case-insensitively as substrings of the
    /// user agent. Empty patterns are dropped.
    pub fn new(version: impl Into<String>, patterns: &[String]) -> Self {
        let version = version.into();
        let patterns: Vec<String> = patterns
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| p.to_ascii_lowercase())
            .collect();
        debug!(version, rules = patterns.len(), "bot classifier loaded");
        Self { version, patterns }
    }

    pub fn is_bot(&self, user_agent: &str) -> bool {
        let ua = user_agent.to_ascii_lowercase();
        self.patterns.iter().any(|p| ua.contains(p))
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for BotClassifier {
    fn default() -> Self {
        Self::new(
            "builtin-1",
            &[
                "bot".to_string(),
                "crawler".to_string(),
                "spider".to_string(),
                "googlebot".to_string(),
                "python-urllib".to_string(),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns() {
        let classifier = BotClassifier::default();
        assert!(classifier.is_bot("Googlebot/2.1 (+http://www.google.com/bot.html)"));
        assert!(classifier.is_bot("Python-urllib/3.11"));
        assert!(classifier.is_bot("ExampleCrawler/1.0"));
        assert!(!classifier.is_bot("Mozilla/5.0 (X11; Linux x86_64)"));
    }

    #[test]
    fn test_case_insensitive() {
        let classifier = BotClassifier::new("v1", &["SpIdEr".to_string()]);
        assert!(classifier.is_bot("some SPIDER agent"));
    }

    #[test]
    fn test_empty_patterns_dropped() {
        let classifier = BotClassifier::new("v1", &["".to_string(), "  ".to_string()]);
        assert!(!classifier.is_bot("anything"));
        assert_eq!(classifier.version(), "v1");
    }
}
