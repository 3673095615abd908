//! Heuristic analyzers.
//!
//! Each analyzer inspects one aspect of the session and emits a partial
//! verdict. Analyzers are pure given their inputs and total: they always
//! return a verdict and never fail.

pub mod behavior;
pub mod environment;
pub mod identity;

pub use behavior::BehaviorAnalyzer;
pub use environment::EnvironmentAnalyzer;
pub use identity::IdentityAnalyzer;

use std::time::Duration;

use crate::metrics::BehaviorMetrics;
use crate::signals::SignalBag;
use crate::verdict::AnalyzerVerdict;

/// Everything an analyzer may look at for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerInput<'a> {
    /// Current signal snapshot
    pub signals: &'a SignalBag,
    /// Accumulated behavior metrics, read-only here
    pub metrics: &'a BehaviorMetrics,
    /// Time since the session began
    pub dwell: Duration,
}

impl AnalyzerInput<'_> {
    /// The observed user-agent, if any.
    pub fn user_agent(&self) -> Option<&str> {
        self.signals.user_agent()
    }
}

/// Trait for heuristic analyzers.
pub trait Analyzer: Send + Sync {
    /// Analyze the session and return a partial verdict.
    fn analyze(&self, input: &AnalyzerInput<'_>) -> AnalyzerVerdict;

    /// Get the analyzer name.
    fn name(&self) -> &'static str;
}
