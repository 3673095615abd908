//! Behavior analysis: what the session does over time.
//!
//! Works off the accumulated metrics only. Absence of evidence stays cheap
//! until enough dwell has passed for absence to mean something, and the
//! statistical checks stay silent below their sample minimums.

use super::{Analyzer, AnalyzerInput};
use crate::config::BehaviorConfig;
use crate::signals::is_mobile_shaped;
use crate::verdict::AnalyzerVerdict;

/// Analyzes accumulated interaction behavior.
pub struct BehaviorAnalyzer {
    config: BehaviorConfig,
}

impl BehaviorAnalyzer {
    pub fn new(config: &BehaviorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Analyzer for BehaviorAnalyzer {
    fn analyze(&self, input: &AnalyzerInput<'_>) -> AnalyzerVerdict {
        let mut verdict = AnalyzerVerdict::clean();
        let metrics = input.metrics;
        let dwell_ms = input.dwell.as_millis() as u64;

        // Idle checks only fire once a human has had time to act.
        if dwell_ms >= self.config.idle_dwell_ms {
            if metrics.pointer_moves == 0 && metrics.touch_events == 0 {
                verdict.add(self.config.idle_pointer, "no_pointer_activity");
            }
            if metrics.key_events == 0 {
                verdict.add(self.config.idle_keyboard, "no_keyboard_activity");
            }
            if metrics.scroll_events == 0 {
                verdict.add(self.config.idle_scroll, "no_scroll_activity");
            }
        }

        if let Some(stats) = metrics.click_interval_stats(self.config.min_click_samples) {
            if stats.mean < self.config.min_mean_click_interval_ms {
                verdict.add(self.config.rapid_clicks, "implausibly_fast_clicks");
            }
            if stats.cv < self.config.regularity_cv_floor {
                verdict.add(self.config.regular_clicks, "robotic_click_timing");
            }
        }

        if let Some(stats) = metrics.velocity_stats(self.config.min_velocity_samples) {
            if stats.mean > self.config.velocity_ceiling {
                verdict.add(self.config.implausible_velocity, "impossible_pointer_speed");
            } else if stats.mean > 0.0 && stats.mean < self.config.velocity_floor {
                verdict.add(self.config.implausible_velocity, "implausibly_slow_pointer");
            } else if stats.std_dev < self.config.velocity_stdev_floor && stats.mean > 10.0 {
                verdict.add(
                    self.config.implausible_velocity,
                    "too_consistent_pointer_speed",
                );
            }
        }

        // Phones report motion events ambiently; a mobile session that
        // never produces one after a long dwell is suspicious.
        if dwell_ms >= self.config.motionless_dwell_ms
            && !metrics.device_motion_seen
            && !metrics.device_orientation_seen
        {
            if let Some(ua) = input.user_agent() {
                if is_mobile_shaped(ua) {
                    verdict.add(self.config.missing_motion, "no_device_motion_on_mobile");
                }
            }
        }

        verdict.confidence = verdict.confidence.min(self.config.cap);
        verdict
    }

    fn name(&self) -> &'static str {
        "behavior_analyzer"
    }
}
