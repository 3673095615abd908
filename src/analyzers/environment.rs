//! Environment analysis: what the session runs in.
//!
//! Each tell-tale is individually near-conclusive, so deltas are summed and
//! clamped rather than run through a pattern table. A clean environment
//! contributes nothing.

use super::{Analyzer, AnalyzerInput};
use crate::config::EnvironmentConfig;
use crate::signals::{is_desktop_shaped, SignalBag};
use crate::verdict::AnalyzerVerdict;

/// No consumer hardware exceeds this many pixels on a side.
const MAX_PLAUSIBLE_DIM: u32 = 8000;

/// Smallest believable desktop screen.
const MIN_DESKTOP_WIDTH: u32 = 800;
const MIN_DESKTOP_HEIGHT: u32 = 600;

/// Analyzes the execution environment reported by the signal bag.
pub struct EnvironmentAnalyzer {
    config: EnvironmentConfig,
}

impl EnvironmentAnalyzer {
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn check_screen(&self, signals: &SignalBag, desktop: bool, verdict: &mut AnalyzerVerdict) {
        let Some(screen) = &signals.screen else {
            return;
        };

        if screen.width > MAX_PLAUSIBLE_DIM || screen.height > MAX_PLAUSIBLE_DIM {
            verdict.add(self.config.impossible_screen, "impossible_screen_size");
        } else if desktop && screen.width < MIN_DESKTOP_WIDTH && screen.height < MIN_DESKTOP_HEIGHT
        {
            verdict.add(self.config.tiny_screen, "tiny_desktop_screen");
        }

        if screen.width == screen.height && screen.width > 0 {
            verdict.add(self.config.square_screen, "square_screen");
        }

        if !matches!(screen.color_depth, 16 | 24 | 32) {
            verdict.add(self.config.unusual_color_depth, "unusual_color_depth");
        }
    }
}

impl Analyzer for EnvironmentAnalyzer {
    fn analyze(&self, input: &AnalyzerInput<'_>) -> AnalyzerVerdict {
        let mut verdict = AnalyzerVerdict::clean();
        let signals = input.signals;
        let desktop = input.user_agent().map(is_desktop_shaped).unwrap_or(false);

        if signals.webdriver == Some(true) {
            verdict.add(self.config.automation_flag, "webdriver_flag");
        }

        if !signals.automation_globals.is_empty() {
            verdict.add(self.config.automation_globals, "automation_globals_present");
        }

        if let Some(viewport) = &signals.viewport {
            if viewport.width == 0 || viewport.height == 0 {
                verdict.add(self.config.zero_viewport, "zero_viewport");
            }
        }

        // Some(vec![]) is an answered-but-empty list; None means the
        // provider never reported languages at all.
        if signals.languages.as_ref().is_some_and(|l| l.is_empty()) {
            verdict.add(self.config.empty_languages, "empty_language_list");
        }

        if desktop && signals.plugin_count == Some(0) {
            verdict.add(self.config.no_plugins_desktop, "no_plugins_on_desktop");
        }

        // Only counts against sessions that claim to be a browser; an
        // empty bag stays clean.
        if signals.user_agent.is_some() && signals.webgl.is_none() {
            verdict.add(self.config.missing_webgl, "missing_webgl");
        }

        self.check_screen(signals, desktop, &mut verdict);

        verdict.confidence = verdict.confidence.min(self.config.cap);
        verdict
    }

    fn name(&self) -> &'static str {
        "environment_analyzer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BehaviorMetrics;
    use crate::signals::{ScreenSignal, ViewportSignal, WebGlSignal};
    use std::time::Duration;

    const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    fn analyze(signals: &SignalBag) -> AnalyzerVerdict {
        let metrics = BehaviorMetrics::default();
        let input = AnalyzerInput {
            signals,
            metrics: &metrics,
            dwell: Duration::from_secs(1),
        };
        EnvironmentAnalyzer::new(&EnvironmentConfig::default()).analyze(&input)
    }

    fn webgl() -> Option<WebGlSignal> {
        Some(WebGlSignal {
            vendor: "Google Inc.".to_string(),
            renderer: "ANGLE (NVIDIA)".to_string(),
        })
    }

    #[test]
    fn test_empty_bag_is_clean() {
        let verdict = analyze(&SignalBag::default());
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn test_webdriver_flag() {
        let signals = SignalBag {
            user_agent: Some(DESKTOP_UA.to_string()),
            webdriver: Some(true),
            webgl: webgl(),
            ..SignalBag::default()
        };
        let verdict = analyze(&signals);
        assert_eq!(verdict.confidence, 0.95);
        assert_eq!(verdict.reasons, vec!["webdriver_flag".to_string()]);
    }

    #[test]
    fn test_automation_globals_stack_to_cap() {
        let signals = SignalBag {
            webdriver: Some(true),
            automation_globals: vec!["__selenium_unwrapped".to_string()],
            ..SignalBag::default()
        };
        let verdict = analyze(&signals);
        assert_eq!(verdict.confidence, 1.0);
        assert_eq!(verdict.reasons.len(), 2);
    }

    #[test]
    fn test_zero_viewport() {
        let signals = SignalBag {
            viewport: Some(ViewportSignal {
                width: 0,
                height: 768,
            }),
            ..SignalBag::default()
        };
        let verdict = analyze(&signals);
        assert_eq!(verdict.confidence, 0.6);
    }

    #[test]
    fn test_empty_languages_answered_vs_absent() {
        let answered = SignalBag {
            languages: Some(vec![]),
            ..SignalBag::default()
        };
        assert_eq!(analyze(&answered).confidence, 0.5);

        let absent = SignalBag {
            languages: None,
            ..SignalBag::default()
        };
        assert_eq!(analyze(&absent).confidence, 0.0);
    }

    #[test]
    fn test_no_plugins_only_counts_on_desktop() {
        let desktop = SignalBag {
            user_agent: Some(DESKTOP_UA.to_string()),
            plugin_count: Some(0),
            webgl: webgl(),
            ..SignalBag::default()
        };
        assert_eq!(analyze(&desktop).confidence, 0.3);

        let mobile = SignalBag {
            user_agent: Some(
                "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36"
                    .to_string(),
            ),
            plugin_count: Some(0),
            webgl: webgl(),
            ..SignalBag::default()
        };
        assert_eq!(analyze(&mobile).confidence, 0.0);
    }

    #[test]
    fn test_missing_webgl_requires_claimed_browser() {
        let claimed = SignalBag {
            user_agent: Some(DESKTOP_UA.to_string()),
            ..SignalBag::default()
        };
        let verdict = analyze(&claimed);
        assert!(verdict.reasons.contains(&"missing_webgl".to_string()));
        assert_eq!(verdict.confidence, 0.3);
    }

    #[test]
    fn test_screen_checks() {
        let impossible = SignalBag {
            screen: Some(ScreenSignal {
                width: 10_000,
                height: 1440,
                color_depth: 24,
            }),
            ..SignalBag::default()
        };
        assert_eq!(analyze(&impossible).confidence, 0.4);

        let square = SignalBag {
            screen: Some(ScreenSignal {
                width: 1000,
                height: 1000,
                color_depth: 24,
            }),
            ..SignalBag::default()
        };
        assert_eq!(analyze(&square).confidence, 0.2);

        let odd_depth = SignalBag {
            screen: Some(ScreenSignal {
                width: 1920,
                height: 1080,
                color_depth: 8,
            }),
            ..SignalBag::default()
        };
        assert_eq!(analyze(&odd_depth).confidence, 0.2);
    }

    #[test]
    fn test_tiny_screen_desktop_only() {
        let tiny = SignalBag {
            user_agent: Some(DESKTOP_UA.to_string()),
            screen: Some(ScreenSignal {
                width: 640,
                height: 480,
                color_depth: 24,
            }),
            webgl: webgl(),
            ..SignalBag::default()
        };
        let verdict = analyze(&tiny);
        assert!(verdict.reasons.contains(&"tiny_desktop_screen".to_string()));
        assert!((verdict.confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_clean_full_bag() {
        let signals = SignalBag {
            user_agent: Some(DESKTOP_UA.to_string()),
            screen: Some(ScreenSignal {
                width: 1920,
                height: 1080,
                color_depth: 24,
            }),
            viewport: Some(ViewportSignal {
                width: 1903,
                height: 927,
            }),
            languages: Some(vec!["en-US".to_string(), "en".to_string()]),
            plugin_count: Some(5),
            webgl: webgl(),
            ..SignalBag::default()
        };
        let verdict = analyze(&signals);
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.reasons.is_empty());
    }
}
