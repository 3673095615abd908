//! Configuration types for the classification engine.
//!
//! Every weight, threshold, and pattern the pipeline consults lives here as
//! a declarative value with a serde default, so variants are tuned by
//! configuration rather than forked code paths.

use serde::{Deserialize, Serialize};

/// Main configuration for the classification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Analyzer weights for confidence aggregation
    pub weights: AggregationWeights,

    /// Confidence thresholds for decisions
    pub thresholds: ThresholdConfig,

    /// Identity (user-agent) analysis settings
    pub identity: IdentityConfig,

    /// Environment tell-tale deltas
    pub environment: EnvironmentConfig,

    /// Behavior analysis settings
    pub behavior: BehaviorConfig,

    /// Routing state machine timing
    pub routing: RoutingConfig,

    /// Remote verification settings
    pub verifier: VerifierConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: AggregationWeights::default(),
            thresholds: ThresholdConfig::default(),
            identity: IdentityConfig::default(),
            environment: EnvironmentConfig::default(),
            behavior: BehaviorConfig::default(),
            routing: RoutingConfig::default(),
            verifier: VerifierConfig::default(),
        }
    }
}

/// Per-analyzer weights applied before taking the maximum.
///
/// Identity is weighted highest and behavior lowest: behavioral evidence is
/// the most prone to false positives on slow or idle genuine users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationWeights {
    pub identity: f32,
    pub environment: f32,
    pub behavior: f32,
}

impl Default for AggregationWeights {
    fn default() -> Self {
        Self {
            identity: 1.0,
            environment: 0.95,
            behavior: 0.75,
        }
    }
}

/// Confidence thresholds for decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Confidence at or above which the verdict is `is_bot` (0.0-1.0)
    pub bot: f32,

    /// Confidence at or above which routing blocks (0.0-1.0)
    pub high_confidence: f32,

    /// Confidence below which routing may release a human (0.0-1.0)
    pub low_confidence: f32,

    /// Identity confidence at or above which an automation-category match
    /// is an authoritative deny on its own (0.0-1.0)
    pub authoritative_deny: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            bot: 0.5,
            high_confidence: 0.8,
            low_confidence: 0.3,
            authoritative_deny: 0.95,
        }
    }
}

/// User-agent pattern categories, tiered by what the match implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    /// Social-media link-preview fetcher (Facebook, Twitter, etc.)
    SocialPreview,
    /// Search engine crawler (Google, Bing, etc.)
    SearchEngine,
    /// Automation framework (Selenium, Puppeteer, headless browsers)
    Automation,
    /// Scripted HTTP client (curl, python-requests, etc.)
    ScriptedClient,
    /// Generic bot token
    Generic,
    /// Monitoring service (Pingdom, UptimeRobot, etc.)
    Monitoring,
    /// Feed reader
    Feed,
}

impl PatternCategory {
    /// Recognized benign crawlers that should receive the crawler variant,
    /// never the blocked variant.
    pub fn is_known_crawler(&self) -> bool {
        matches!(
            self,
            PatternCategory::SocialPreview | PatternCategory::SearchEngine
        )
    }

    /// Categories whose high-weight matches count as known automation for
    /// the local authoritative-deny rule.
    pub fn is_automation(&self) -> bool {
        matches!(
            self,
            PatternCategory::Automation | PatternCategory::ScriptedClient
        )
    }

    /// Returns the category as a string for reasons and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::SocialPreview => "social_preview",
            PatternCategory::SearchEngine => "search_engine",
            PatternCategory::Automation => "automation",
            PatternCategory::ScriptedClient => "scripted_client",
            PatternCategory::Generic => "generic",
            PatternCategory::Monitoring => "monitoring",
            PatternCategory::Feed => "feed",
        }
    }
}

/// A user-agent pattern table entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UaPattern {
    /// Case-insensitive regex matched against the user-agent
    pub pattern: String,

    /// Confidence assigned on match (0.0-1.0)
    pub weight: f32,

    /// What the match implies
    pub category: PatternCategory,
}

impl UaPattern {
    pub fn new(pattern: impl Into<String>, weight: f32, category: PatternCategory) -> Self {
        Self {
            pattern: pattern.into(),
            weight,
            category,
        }
    }
}

/// Identity (user-agent) analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Priority-ordered pattern table; invalid entries are skipped with a
    /// warning at startup
    pub patterns: Vec<UaPattern>,

    /// Secondary heuristics, consulted only when no pattern matched
    pub secondary: SecondaryHeuristics,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            secondary: SecondaryHeuristics::default(),
        }
    }
}

/// Secondary user-agent heuristics. All contribute via max, never addition,
/// and only when no primary pattern matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryHeuristics {
    /// Missing or empty user-agent. A weak signal: privacy-hardened
    /// browsers send none.
    pub missing_ua: f32,

    /// User-agent shorter than `short_ua_len`
    pub short_ua: f32,
    pub short_ua_len: usize,

    /// User-agent longer than `long_ua_len`
    pub long_ua: f32,
    pub long_ua_len: usize,

    /// Browser token present but no version token where one is expected
    pub missing_version: f32,

    /// Inconsistent token combinations (Chrome without Safari/WebKit,
    /// Firefox without Gecko, multiple OS families)
    pub token_mismatch: f32,

    /// Chrome major version outside [min_chrome_major, max_chrome_major]
    pub implausible_version: f32,
    pub min_chrome_major: u32,
    pub max_chrome_major: u32,

    /// Character entropy below `entropy_floor` bits
    pub low_entropy: f32,
    pub entropy_floor: f64,
}

impl Default for SecondaryHeuristics {
    fn default() -> Self {
        Self {
            missing_ua: 0.35,
            short_ua: 0.5,
            short_ua_len: 20,
            long_ua: 0.5,
            long_ua_len: 1000,
            missing_version: 0.45,
            token_mismatch: 0.4,
            implausible_version: 0.5,
            min_chrome_major: 70,
            max_chrome_major: 150,
            low_entropy: 0.35,
            entropy_floor: 3.0,
        }
    }
}

/// Environment tell-tale deltas. Additive, clamped to `cap`: each tell-tale
/// is individually near-conclusive, so no pattern table is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// `navigator.webdriver` set true
    pub automation_flag: f32,

    /// Known automation-framework globals present on the page
    pub automation_globals: f32,

    /// Viewport with a zero dimension
    pub zero_viewport: f32,

    /// Language list present but empty
    pub empty_languages: f32,

    /// Zero plugins reported on a desktop-shaped user-agent
    pub no_plugins_desktop: f32,

    /// WebGL unavailable
    pub missing_webgl: f32,

    /// Screen dimension beyond plausible hardware
    pub impossible_screen: f32,

    /// Desktop screen smaller than 800x600
    pub tiny_screen: f32,

    /// Perfectly square screen
    pub square_screen: f32,

    /// Color depth other than 16/24/32
    pub unusual_color_depth: f32,

    /// Cap on the summed deltas
    pub cap: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            automation_flag: 0.95,
            automation_globals: 0.9,
            zero_viewport: 0.6,
            empty_languages: 0.5,
            no_plugins_desktop: 0.3,
            missing_webgl: 0.3,
            impossible_screen: 0.4,
            tiny_screen: 0.2,
            square_screen: 0.2,
            unusual_color_depth: 0.2,
            cap: 1.0,
        }
    }
}

/// Behavior analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Sliding window capacity for click-interval and velocity samples
    pub window_capacity: usize,

    /// Minimum click-interval samples before timing statistics apply
    pub min_click_samples: usize,

    /// Minimum velocity samples before velocity statistics apply
    pub min_velocity_samples: usize,

    /// Dwell in ms after which zero interaction counts against the session
    pub idle_dwell_ms: u64,

    /// Dwell in ms after which missing device motion counts on mobile
    pub motionless_dwell_ms: u64,

    /// Delta for zero pointer movement after `idle_dwell_ms`
    pub idle_pointer: f32,

    /// Delta for zero key events after `idle_dwell_ms`
    pub idle_keyboard: f32,

    /// Delta for zero scroll events after `idle_dwell_ms`
    pub idle_scroll: f32,

    /// Delta for robotically regular click timing
    pub regular_clicks: f32,

    /// Delta for a sub-minimum mean click interval
    pub rapid_clicks: f32,

    /// Coefficient of variation below which click timing is robotic
    pub regularity_cv_floor: f64,

    /// Mean click interval in ms below which clicking is implausibly fast
    pub min_mean_click_interval_ms: f64,

    /// Delta for implausible pointer velocity statistics
    pub implausible_velocity: f32,

    /// Average velocity in px/s above which movement is implausible
    pub velocity_ceiling: f64,

    /// Average velocity in px/s below which movement is implausibly slow
    pub velocity_floor: f64,

    /// Velocity standard deviation below which movement is too consistent
    pub velocity_stdev_floor: f64,

    /// Delta for no device motion/orientation after `motionless_dwell_ms`
    /// on a mobile-shaped user-agent
    pub missing_motion: f32,

    /// Cap on the summed deltas
    pub cap: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            window_capacity: 50,
            min_click_samples: 3,
            min_velocity_samples: 10,
            idle_dwell_ms: 5000,
            motionless_dwell_ms: 10_000,
            idle_pointer: 0.4,
            idle_keyboard: 0.25,
            idle_scroll: 0.2,
            regular_clicks: 0.45,
            rapid_clicks: 0.6,
            regularity_cv_floor: 0.1,
            min_mean_click_interval_ms: 50.0,
            implausible_velocity: 0.3,
            velocity_ceiling: 2000.0,
            velocity_floor: 1.0,
            velocity_stdev_floor: 10.0,
            missing_motion: 0.25,
            cap: 1.0,
        }
    }
}

/// Routing state machine timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Minimum dwell in ms before low confidence alone releases a human
    pub min_dwell_ms: u64,

    /// Dwell in ms past which an inconclusive session is assumed human
    pub hard_ceiling_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_dwell_ms: 3000,
            hard_ceiling_ms: 15_000,
        }
    }
}

/// Remote verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Whether to consult the verifier at all
    pub enabled: bool,

    /// Verifier detect endpoint
    pub endpoint: String,

    /// Hard deadline for the round trip in ms
    pub timeout_ms: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:8000/detect".to_string(),
            timeout_ms: 2000,
        }
    }
}

/// The built-in user-agent pattern table, highest-priority tiers first.
pub fn default_patterns() -> Vec<UaPattern> {
    use PatternCategory::*;

    vec![
        // Social-media link-preview fetchers
        UaPattern::new("facebookexternalhit|facebot|facebookcatalog", 0.98, SocialPreview),
        UaPattern::new("twitterbot", 0.95, SocialPreview),
        UaPattern::new("linkedinbot", 0.95, SocialPreview),
        UaPattern::new("instagrambot|pinterestbot", 0.93, SocialPreview),
        UaPattern::new("whatsapp", 0.93, SocialPreview),
        UaPattern::new("discordbot|telegrambot|slackbot", 0.92, SocialPreview),
        // Search engine crawlers
        UaPattern::new("googlebot", 0.92, SearchEngine),
        UaPattern::new("bingbot|slurp|baiduspider|yandexbot", 0.9, SearchEngine),
        UaPattern::new("duckduckbot|applebot", 0.88, SearchEngine),
        // Automation frameworks
        UaPattern::new("selenium|webdriver", 0.99, Automation),
        UaPattern::new("puppeteer|playwright", 0.98, Automation),
        UaPattern::new("phantomjs", 0.97, Automation),
        UaPattern::new("headless", 0.96, Automation),
        // Scripted HTTP clients
        UaPattern::new("scrapy", 0.96, ScriptedClient),
        UaPattern::new("curl|wget|httpie", 0.95, ScriptedClient),
        UaPattern::new("python-requests|python-urllib|aiohttp", 0.94, ScriptedClient),
        UaPattern::new("ruby", 0.93, ScriptedClient),
        UaPattern::new("node-fetch|axios", 0.92, ScriptedClient),
        UaPattern::new("java/|okhttp", 0.91, ScriptedClient),
        UaPattern::new("go-http-client", 0.9, ScriptedClient),
        // Generic and low-tier tokens
        // `bot\b` rather than `\bbot\b`: most self-identifying crawlers
        // suffix the token ("SomeVendorBot/1.0")
        UaPattern::new(r"bot\b|crawler|spider|scraper", 0.85, Generic),
        UaPattern::new("monitor|uptime|pingdom|statuscake", 0.8, Monitoring),
        UaPattern::new("feedfetcher|feedparser|rss", 0.75, Feed),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.thresholds.high_confidence, 0.8);
        assert_eq!(config.thresholds.low_confidence, 0.3);
        assert_eq!(config.weights.identity, 1.0);
        assert!(config.weights.behavior < config.weights.environment);
        assert!(!config.verifier.enabled);
        assert!(!config.identity.patterns.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.thresholds.bot, config.thresholds.bot);
        assert_eq!(parsed.identity.patterns.len(), config.identity.patterns.len());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: EngineConfig =
            serde_json::from_str(r#"{"routing": {"hard_ceiling_ms": 20000}}"#).unwrap();
        assert_eq!(parsed.routing.hard_ceiling_ms, 20_000);
        assert_eq!(parsed.routing.min_dwell_ms, 3000);
        assert_eq!(parsed.verifier.timeout_ms, 2000);
    }

    #[test]
    fn test_pattern_category_tiers() {
        assert!(PatternCategory::SocialPreview.is_known_crawler());
        assert!(PatternCategory::SearchEngine.is_known_crawler());
        assert!(!PatternCategory::Automation.is_known_crawler());
        assert!(PatternCategory::Automation.is_automation());
        assert!(PatternCategory::ScriptedClient.is_automation());
        assert!(!PatternCategory::Generic.is_automation());
    }

    #[test]
    fn test_default_table_weights_are_tiered() {
        for entry in default_patterns() {
            match entry.category {
                PatternCategory::SocialPreview | PatternCategory::SearchEngine => {
                    assert!(entry.weight >= 0.85, "{} below crawler tier", entry.pattern)
                }
                PatternCategory::Automation => {
                    assert!(entry.weight >= 0.9, "{} below automation tier", entry.pattern)
                }
                _ => assert!(entry.weight >= 0.7),
            }
        }
    }
}
