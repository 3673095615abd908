//! Routing state machine.
//!
//! Consumes the reconciled verdict plus dwell and interaction evidence and
//! selects exactly one output state for the presentation layer. Transitions
//! are evaluated in strict priority order, first match wins, and every state
//! except `Pending` is terminal for the session.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{RoutingConfig, ThresholdConfig};
use crate::verdict::Verdict;

/// Output state for the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingState {
    /// No conclusive signal yet
    #[default]
    Pending,
    /// Treated as a genuine visitor
    RedirectHuman,
    /// Recognized benign crawler; gets the crawler-optimized variant,
    /// never the blocked one
    ShowCrawlerVariant,
    /// Denied; gets the blocked variant
    ShowBlockedVariant,
}

impl RoutingState {
    /// Every state but `Pending` is terminal for the session.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RoutingState::Pending)
    }

    /// Returns the state as a string for summaries and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingState::Pending => "pending",
            RoutingState::RedirectHuman => "redirect_human",
            RoutingState::ShowCrawlerVariant => "show_crawler_variant",
            RoutingState::ShowBlockedVariant => "show_blocked_variant",
        }
    }
}

/// The transition function with its thresholds and timing bound in.
pub struct Router {
    thresholds: ThresholdConfig,
    timing: RoutingConfig,
}

impl Router {
    pub fn new(thresholds: &ThresholdConfig, timing: &RoutingConfig) -> Self {
        Self {
            thresholds: thresholds.clone(),
            timing: timing.clone(),
        }
    }

    /// Evaluate one transition. Idempotent on terminal states: once the
    /// session has routed, nothing moves it again.
    pub fn next_state(
        &self,
        current: RoutingState,
        verdict: &Verdict,
        dwell: Duration,
        interactions: u32,
    ) -> RoutingState {
        if current.is_terminal() {
            return current;
        }

        // 1. Authoritative deny beats everything, including the crawler
        //    variant.
        if verdict.should_block {
            return RoutingState::ShowBlockedVariant;
        }

        // 2. Recognized crawlers are served, not blocked, no matter how
        //    high the confidence.
        if verdict.is_known_crawler {
            return RoutingState::ShowCrawlerVariant;
        }

        // 3. High confidence without a crawler match blocks.
        if verdict.confidence >= self.thresholds.high_confidence {
            return RoutingState::ShowBlockedVariant;
        }

        // 4. Low confidence plus evidence of life releases the visitor.
        let dwell_ms = dwell.as_millis() as u64;
        if verdict.confidence < self.thresholds.low_confidence
            && (dwell_ms >= self.timing.min_dwell_ms || interactions > 0)
        {
            return RoutingState::RedirectHuman;
        }

        // 5. Past the hard ceiling with nothing conclusive, assume human
        //    rather than leave a real visitor stuck.
        if dwell_ms > self.timing.hard_ceiling_ms {
            return RoutingState::RedirectHuman;
        }

        RoutingState::Pending
    }
}
