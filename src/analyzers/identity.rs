//! Identity analysis: who the session claims to be.
//!
//! A priority-ordered pattern table maps self-identifying user-agents to a
//! confidence and a category tier. When nothing in the table matches, weaker
//! structural heuristics (length, token consistency, version plausibility,
//! character entropy) compete via max.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::{Analyzer, AnalyzerInput};
use crate::config::{IdentityConfig, PatternCategory, SecondaryHeuristics};
use crate::verdict::AnalyzerVerdict;

/// One compiled pattern table entry.
struct CompiledPattern {
    regex: Regex,
    weight: f32,
    category: PatternCategory,
}

/// Identity verdict plus the strongest matched category. The aggregator
/// needs the category for the crawler pin and the authoritative-deny rule;
/// plain `analyze` callers only see the verdict.
#[derive(Debug, Clone)]
pub struct IdentityMatch {
    pub verdict: AnalyzerVerdict,
    /// Category of the highest-weight primary match, `None` when only
    /// secondary heuristics applied
    pub category: Option<PatternCategory>,
}

/// Analyzes the claimed identity of the session.
pub struct IdentityAnalyzer {
    patterns: Vec<CompiledPattern>,
    secondary: SecondaryHeuristics,
}

impl IdentityAnalyzer {
    /// Compile the pattern table. Invalid entries are skipped with a
    /// warning so one bad config line cannot take the analyzer down.
    pub fn new(config: &IdentityConfig) -> Self {
        let mut patterns = Vec::with_capacity(config.patterns.len());
        for entry in &config.patterns {
            match RegexBuilder::new(&entry.pattern)
                .case_insensitive(true)
                .build()
            {
                Ok(regex) => patterns.push(CompiledPattern {
                    regex,
                    weight: entry.weight,
                    category: entry.category,
                }),
                Err(e) => {
                    warn!(pattern = %entry.pattern, error = %e, "Skipping invalid user-agent pattern");
                }
            }
        }

        Self {
            patterns,
            secondary: config.secondary.clone(),
        }
    }

    /// Classify a user-agent. Every matching table entry is recorded as a
    /// reason; the confidence and category come from the strongest match.
    /// Secondary heuristics apply only when the table is silent.
    pub fn classify(&self, user_agent: Option<&str>) -> IdentityMatch {
        let ua = match user_agent {
            Some(ua) if !ua.trim().is_empty() => ua,
            Some(_) => {
                return IdentityMatch {
                    verdict: AnalyzerVerdict::new(self.secondary.missing_ua)
                        .with_reason("empty_user_agent"),
                    category: None,
                }
            }
            None => {
                return IdentityMatch {
                    verdict: AnalyzerVerdict::new(self.secondary.missing_ua)
                        .with_reason("missing_user_agent"),
                    category: None,
                }
            }
        };

        let mut verdict = AnalyzerVerdict::clean();
        let mut best: Option<(f32, PatternCategory)> = None;

        for entry in &self.patterns {
            if entry.regex.is_match(ua) {
                let tag = format!("ua_pattern_{}", entry.category.as_str());
                if !verdict.reasons.contains(&tag) {
                    verdict.reasons.push(tag);
                }
                if best.map_or(true, |(weight, _)| entry.weight > weight) {
                    best = Some((entry.weight, entry.category));
                }
            }
        }

        if let Some((weight, category)) = best {
            verdict.confidence = weight.clamp(0.0, 1.0);
            verdict.is_known_crawler = category.is_known_crawler();
            return IdentityMatch {
                verdict,
                category: Some(category),
            };
        }

        self.apply_secondary(ua, &mut verdict);
        IdentityMatch {
            verdict,
            category: None,
        }
    }

    fn apply_secondary(&self, ua: &str, verdict: &mut AnalyzerVerdict) {
        let s = &self.secondary;

        if ua.len() < s.short_ua_len {
            verdict.raise(s.short_ua, "short_user_agent");
        } else if ua.len() > s.long_ua_len {
            verdict.raise(s.long_ua, "oversized_user_agent");
        }

        let lower = ua.to_ascii_lowercase();

        // Real Chrome always carries Safari/WebKit tokens, real Firefox
        // always carries Gecko.
        if lower.contains("chrome") && !lower.contains("safari") && !lower.contains("webkit") {
            verdict.raise(s.token_mismatch, "chrome_without_webkit_tokens");
        }
        if lower.contains("firefox") && !lower.contains("gecko") {
            verdict.raise(s.token_mismatch, "firefox_without_gecko_token");
        }

        // "like Mac OS X" appears in genuine iOS strings, so the Apple
        // desktop check keys on "macintosh" alone.
        let os_families = [
            lower.contains("windows"),
            lower.contains("macintosh"),
            lower.contains("linux") && !lower.contains("android"),
            lower.contains("android"),
            lower.contains("iphone") || lower.contains("ipad"),
        ];
        if os_families.iter().filter(|&&present| present).count() > 1 {
            verdict.raise(s.token_mismatch, "conflicting_os_tokens");
        }

        if let Some(major) = extract_version(&lower, "chrome/") {
            if major < s.min_chrome_major || major > s.max_chrome_major {
                verdict.raise(s.implausible_version, "implausible_chrome_version");
            }
        } else if lower.contains("mozilla/") && !has_version_token(&lower) {
            verdict.raise(s.missing_version, "missing_version_token");
        }

        if char_entropy(ua) < s.entropy_floor {
            verdict.raise(s.low_entropy, "low_entropy_user_agent");
        }
    }
}

impl Analyzer for IdentityAnalyzer {
    fn analyze(&self, input: &AnalyzerInput<'_>) -> AnalyzerVerdict {
        self.classify(input.user_agent()).verdict
    }

    fn name(&self) -> &'static str {
        "identity_analyzer"
    }
}

/// Extract the major version following `prefix`, e.g. 120 from
/// "chrome/120.0.0.0" with prefix "chrome/".
fn extract_version(ua: &str, prefix: &str) -> Option<u32> {
    let start = ua.find(prefix)? + prefix.len();
    let rest = &ua[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    rest[..end].parse().ok()
}

/// Whether the string carries any recognizable engine version token.
fn has_version_token(ua: &str) -> bool {
    ["chrome/", "firefox/", "version/", "edg/", "applewebkit/", "gecko/"]
        .iter()
        .any(|prefix| extract_version(ua, prefix).is_some())
}

/// Shannon entropy over the byte distribution, in bits.
fn char_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts = [0u32; 256];
    for &b in s.as_bytes() {
        counts[b as usize] += 1;
    }
    let len = s.len() as f64;
    counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UaPattern;

    const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    fn analyzer() -> IdentityAnalyzer {
        IdentityAnalyzer::new(&IdentityConfig::default())
    }

    #[test]
    fn test_clean_browser_ua() {
        let m = analyzer().classify(Some(CHROME_UA));
        assert_eq!(m.verdict.confidence, 0.0);
        assert!(m.verdict.reasons.is_empty());
        assert!(!m.verdict.is_known_crawler);
        assert!(m.category.is_none());
    }

    #[test]
    fn test_search_crawler_is_known() {
        let m = analyzer().classify(Some(
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
        ));
        assert_eq!(m.verdict.confidence, 0.92);
        assert!(m.verdict.is_known_crawler);
        assert_eq!(m.category, Some(PatternCategory::SearchEngine));
        // The generic bot token matches too, but only as a reason
        assert!(m
            .verdict
            .reasons
            .contains(&"ua_pattern_search_engine".to_string()));
        assert!(m.verdict.reasons.contains(&"ua_pattern_generic".to_string()));
    }

    #[test]
    fn test_automation_framework() {
        let m = analyzer().classify(Some(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
             HeadlessChrome/120.0.0.0 Safari/537.36",
        ));
        assert_eq!(m.verdict.confidence, 0.96);
        assert!(!m.verdict.is_known_crawler);
        assert_eq!(m.category, Some(PatternCategory::Automation));
    }

    #[test]
    fn test_scripted_client() {
        let m = analyzer().classify(Some("curl/8.4.0"));
        assert_eq!(m.verdict.confidence, 0.95);
        assert_eq!(m.category, Some(PatternCategory::ScriptedClient));
    }

    #[test]
    fn test_missing_and_empty_ua_are_weak_signals() {
        let missing = analyzer().classify(None);
        assert_eq!(missing.verdict.confidence, 0.35);
        assert_eq!(missing.verdict.reasons, vec!["missing_user_agent".to_string()]);
        assert!(missing.category.is_none());

        let empty = analyzer().classify(Some("   "));
        assert_eq!(empty.verdict.confidence, 0.35);
        assert_eq!(empty.verdict.reasons, vec!["empty_user_agent".to_string()]);
    }

    #[test]
    fn test_short_ua() {
        let m = analyzer().classify(Some("Mozilla/5.0"));
        assert_eq!(m.verdict.confidence, 0.5);
        assert!(m.verdict.reasons.contains(&"short_user_agent".to_string()));
    }

    #[test]
    fn test_chrome_without_webkit_tokens() {
        let m = analyzer().classify(Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0"));
        assert_eq!(m.verdict.confidence, 0.4);
        assert!(m
            .verdict
            .reasons
            .contains(&"chrome_without_webkit_tokens".to_string()));
    }

    #[test]
    fn test_implausible_chrome_version() {
        let m = analyzer().classify(Some(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/42.0.2311.90 Safari/537.36",
        ));
        assert_eq!(m.verdict.confidence, 0.5);
        assert!(m
            .verdict
            .reasons
            .contains(&"implausible_chrome_version".to_string()));
    }

    #[test]
    fn test_conflicting_os_tokens() {
        let m = analyzer().classify(Some(
            "Mozilla/5.0 (Windows NT 10.0; Android 13) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ));
        assert_eq!(m.verdict.confidence, 0.4);
        assert!(m
            .verdict
            .reasons
            .contains(&"conflicting_os_tokens".to_string()));
    }

    #[test]
    fn test_ios_ua_is_not_conflicting() {
        let m = analyzer().classify(Some(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        ));
        assert_eq!(m.verdict.confidence, 0.0);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let config = IdentityConfig {
            patterns: vec![
                UaPattern::new("(unclosed", 0.9, PatternCategory::Generic),
                UaPattern::new("scrapy", 0.96, PatternCategory::ScriptedClient),
            ],
            ..IdentityConfig::default()
        };
        let m = IdentityAnalyzer::new(&config).classify(Some("Scrapy/2.11 (+https://scrapy.org)"));
        assert_eq!(m.verdict.confidence, 0.96);
    }

    #[test]
    fn test_extract_version() {
        assert_eq!(extract_version("chrome/120.0.0.0 safari", "chrome/"), Some(120));
        assert_eq!(extract_version("chrome/", "chrome/"), None);
        assert_eq!(extract_version("no version here", "chrome/"), None);
    }

    #[test]
    fn test_char_entropy() {
        assert_eq!(char_entropy(""), 0.0);
        assert_eq!(char_entropy("aaaa"), 0.0);
        assert!(char_entropy(CHROME_UA) > 4.0);
    }
}
