//! Verdict types and risk classification.

use serde::{Deserialize, Serialize};

/// Coarse risk bucket derived from a confidence value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Confidence below 0.3
    #[default]
    Minimal,
    /// Confidence in [0.3, 0.5)
    Low,
    /// Confidence in [0.5, 0.7)
    Medium,
    /// Confidence in [0.7, 0.9)
    High,
    /// Confidence at or above 0.9
    Critical,
}

impl RiskLevel {
    /// Derive the risk level from a confidence value via the fixed
    /// 0.3 / 0.5 / 0.7 / 0.9 breakpoints.
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= 0.9 {
            RiskLevel::Critical
        } else if confidence >= 0.7 {
            RiskLevel::High
        } else if confidence >= 0.5 {
            RiskLevel::Medium
        } else if confidence >= 0.3 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    /// Returns the level as a string for summaries and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "minimal",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Suggested handling for the presentation layer. Purely advisory:
/// routing never consults it, and `ChallengeRequired` has no flow
/// behind it here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Confidence at or above 0.85
    BlockImmediately,
    /// Confidence in [0.7, 0.85)
    ChallengeRequired,
    /// Confidence in [0.5, 0.7)
    MonitorClosely,
    /// Confidence in [0.3, 0.5)
    LogForAnalysis,
    /// Confidence below 0.3
    #[default]
    AllowWithTracking,
}

impl RecommendedAction {
    /// Derive the action from a confidence value.
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= 0.85 {
            RecommendedAction::BlockImmediately
        } else if confidence >= 0.7 {
            RecommendedAction::ChallengeRequired
        } else if confidence >= 0.5 {
            RecommendedAction::MonitorClosely
        } else if confidence >= 0.3 {
            RecommendedAction::LogForAnalysis
        } else {
            RecommendedAction::AllowWithTracking
        }
    }

    /// Returns the action as a string for summaries and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::BlockImmediately => "block_immediately",
            RecommendedAction::ChallengeRequired => "challenge_required",
            RecommendedAction::MonitorClosely => "monitor_closely",
            RecommendedAction::LogForAnalysis => "log_for_analysis",
            RecommendedAction::AllowWithTracking => "allow_with_tracking",
        }
    }
}

/// Partial verdict emitted by a single analyzer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerVerdict {
    /// Local confidence in [0.0, 1.0]
    pub confidence: f32,

    /// Named reason tags, in detection order
    pub reasons: Vec<String>,

    /// True only for recognized benign crawlers
    pub is_known_crawler: bool,
}

impl AnalyzerVerdict {
    /// Create a verdict with the given confidence and no reasons.
    pub fn new(confidence: f32) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
            reasons: Vec::new(),
            is_known_crawler: false,
        }
    }

    /// Create a human-leaning verdict (confidence 0, no reasons).
    pub fn clean() -> Self {
        Self::default()
    }

    /// Add a reason tag.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    /// Flag this verdict as a recognized benign crawler.
    pub fn with_known_crawler(mut self) -> Self {
        self.is_known_crawler = true;
        self
    }

    /// Raise the confidence to `candidate` if it is higher, recording
    /// `reason` only when it actually raised.
    pub fn raise(&mut self, candidate: f32, reason: impl Into<String>) {
        if candidate > self.confidence {
            self.confidence = candidate.clamp(0.0, 1.0);
            self.reasons.push(reason.into());
        }
    }

    /// Add `delta` to the confidence, clamped to [0.0, 1.0], recording
    /// `reason`.
    pub fn add(&mut self, delta: f32, reason: impl Into<String>) {
        self.confidence = (self.confidence + delta).clamp(0.0, 1.0);
        self.reasons.push(reason.into());
    }
}

/// Immutable classification result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the session is classified as automated
    pub is_bot: bool,

    /// Aggregate confidence in [0.0, 1.0]
    pub confidence: f32,

    /// Risk bucket, a pure function of `confidence`
    pub risk_level: RiskLevel,

    /// Reason tags in analyzer order
    pub reasons: Vec<String>,

    /// True only for recognized benign crawlers
    pub is_known_crawler: bool,

    /// Authoritative-deny bit: a verifier deny, or a local
    /// automation-pattern match at the deny threshold. High confidence
    /// alone does not set it.
    pub should_block: bool,
}

impl Default for Verdict {
    fn default() -> Self {
        Self {
            is_bot: false,
            confidence: 0.0,
            risk_level: RiskLevel::Minimal,
            reasons: Vec::new(),
            is_known_crawler: false,
            should_block: false,
        }
    }
}

impl Verdict {
    /// Suggested handling derived from the confidence.
    pub fn recommended_action(&self) -> RecommendedAction {
        RecommendedAction::from_confidence(self.confidence)
    }
}
