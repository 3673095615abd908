//! Per-session behavior accumulation.
//!
//! Input events land here and nowhere else: the tracker is the single
//! writer for a session's [`BehaviorMetrics`], analyzers only read it.
//! Counts are monotonically non-decreasing within a session and the sample
//! windows never exceed their capacity (oldest evicted first).

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// One observed input event, as reported by the signal provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionEvent {
    /// Pointer moved; velocity in px/s as measured by the provider
    PointerMove { velocity: f64 },
    Click,
    Key,
    Scroll,
    Touch,
    Focus,
    DeviceMotion,
    DeviceOrientation,
}

/// Mean / standard deviation / coefficient of variation over a sample
/// window. Low CV = regular spacing = more bot-like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
    pub cv: f64,
}

/// Accumulated behavior for one session.
#[derive(Debug, Clone, Default)]
pub struct BehaviorMetrics {
    /// Pointer-move event count
    pub pointer_moves: u32,
    /// Click event count
    pub clicks: u32,
    /// Key event count
    pub key_events: u32,
    /// Scroll event count
    pub scroll_events: u32,
    /// Touch event count
    pub touch_events: u32,
    /// Focus event count
    pub focus_events: u32,
    /// Recent intervals between clicks in ms (bounded)
    pub click_intervals_ms: VecDeque<f64>,
    /// Recent pointer velocities in px/s (bounded)
    pub pointer_velocities: VecDeque<f64>,
    /// Whether any device-motion event was observed
    pub device_motion_seen: bool,
    /// Whether any device-orientation event was observed
    pub device_orientation_seen: bool,
}

impl BehaviorMetrics {
    /// Count of deliberate interactions. Focus is excluded: it fires
    /// programmatically without user intent.
    pub fn interaction_count(&self) -> u32 {
        self.pointer_moves
            .saturating_add(self.clicks)
            .saturating_add(self.key_events)
            .saturating_add(self.scroll_events)
            .saturating_add(self.touch_events)
    }

    /// Click-interval statistics, once at least `min_samples` intervals
    /// have been observed.
    pub fn click_interval_stats(&self, min_samples: usize) -> Option<WindowStats> {
        window_stats(&self.click_intervals_ms, min_samples)
    }

    /// Pointer-velocity statistics, once at least `min_samples` samples
    /// have been observed.
    pub fn velocity_stats(&self, min_samples: usize) -> Option<WindowStats> {
        window_stats(&self.pointer_velocities, min_samples)
    }
}

fn window_stats(window: &VecDeque<f64>, min_samples: usize) -> Option<WindowStats> {
    if window.is_empty() || window.len() < min_samples {
        return None;
    }

    let mean = window.iter().sum::<f64>() / window.len() as f64;
    if mean == 0.0 {
        // All samples identical at zero = perfectly regular.
        return Some(WindowStats {
            mean: 0.0,
            std_dev: 0.0,
            cv: 0.0,
        });
    }

    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / window.len() as f64;
    let std_dev = variance.sqrt();

    Some(WindowStats {
        mean,
        std_dev,
        cv: std_dev / mean,
    })
}

/// Single writer for a session's behavior metrics.
#[derive(Debug)]
pub struct BehaviorTracker {
    metrics: BehaviorMetrics,
    last_click: Option<Instant>,
    window_capacity: usize,
}

impl BehaviorTracker {
    /// Create a tracker whose sample windows hold at most
    /// `window_capacity` entries.
    pub fn new(window_capacity: usize) -> Self {
        Self {
            metrics: BehaviorMetrics {
                click_intervals_ms: VecDeque::with_capacity(window_capacity),
                pointer_velocities: VecDeque::with_capacity(window_capacity),
                ..Default::default()
            },
            last_click: None,
            window_capacity,
        }
    }

    /// Read-only view of the accumulated metrics.
    pub fn metrics(&self) -> &BehaviorMetrics {
        &self.metrics
    }

    /// Apply one input event observed at `now`.
    pub fn record(&mut self, event: InteractionEvent, now: Instant) {
        match event {
            InteractionEvent::PointerMove { velocity } => {
                self.metrics.pointer_moves += 1;
                push_bounded(
                    &mut self.metrics.pointer_velocities,
                    velocity,
                    self.window_capacity,
                );
            }
            InteractionEvent::Click => {
                self.metrics.clicks += 1;
                if let Some(last) = self.last_click {
                    let interval_ms = now.duration_since(last).as_secs_f64() * 1000.0;
                    push_bounded(
                        &mut self.metrics.click_intervals_ms,
                        interval_ms,
                        self.window_capacity,
                    );
                }
                self.last_click = Some(now);
            }
            InteractionEvent::Key => self.metrics.key_events += 1,
            InteractionEvent::Scroll => self.metrics.scroll_events += 1,
            InteractionEvent::Touch => self.metrics.touch_events += 1,
            InteractionEvent::Focus => self.metrics.focus_events += 1,
            InteractionEvent::DeviceMotion => self.metrics.device_motion_seen = true,
            InteractionEvent::DeviceOrientation => self.metrics.device_orientation_seen = true,
        }
    }
}

fn push_bounded(window: &mut VecDeque<f64>, sample: f64, capacity: usize) {
    if capacity == 0 {
        return;
    }
    if window.len() >= capacity {
        window.pop_front();
    }
    window.push_back(sample);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_counts_grow() {
        let mut tracker = BehaviorTracker::new(10);
        let now = Instant::now();

        tracker.record(InteractionEvent::Key, now);
        tracker.record(InteractionEvent::Key, now);
        tracker.record(InteractionEvent::Scroll, now);
        tracker.record(InteractionEvent::Focus, now);

        let m = tracker.metrics();
        assert_eq!(m.key_events, 2);
        assert_eq!(m.scroll_events, 1);
        assert_eq!(m.focus_events, 1);
        // Focus is not a deliberate interaction.
        assert_eq!(m.interaction_count(), 3);
    }

    #[test]
    fn test_click_intervals_from_clock() {
        let mut tracker = BehaviorTracker::new(10);
        let start = Instant::now();

        tracker.record(InteractionEvent::Click, start);
        tracker.record(InteractionEvent::Click, start + Duration::from_millis(100));
        tracker.record(InteractionEvent::Click, start + Duration::from_millis(300));

        let m = tracker.metrics();
        assert_eq!(m.clicks, 3);
        // Two intervals from three clicks.
        assert_eq!(m.click_intervals_ms.len(), 2);
        assert!((m.click_intervals_ms[0] - 100.0).abs() < 1e-6);
        assert!((m.click_intervals_ms[1] - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_windows_stay_bounded() {
        let mut tracker = BehaviorTracker::new(3);
        let now = Instant::now();

        for i in 0..10 {
            tracker.record(
                InteractionEvent::PointerMove {
                    velocity: i as f64,
                },
                now,
            );
        }

        let m = tracker.metrics();
        assert_eq!(m.pointer_moves, 10);
        assert_eq!(m.pointer_velocities.len(), 3);
        // Oldest evicted first.
        assert_eq!(m.pointer_velocities[0], 7.0);
    }

    #[test]
    fn test_stats_need_min_samples() {
        let mut tracker = BehaviorTracker::new(10);
        let start = Instant::now();
        tracker.record(InteractionEvent::Click, start);
        tracker.record(InteractionEvent::Click, start + Duration::from_millis(50));

        assert!(tracker.metrics().click_interval_stats(3).is_none());
        assert!(tracker.metrics().click_interval_stats(1).is_some());
    }

    #[test]
    fn test_regular_intervals_have_low_cv() {
        let mut tracker = BehaviorTracker::new(10);
        let start = Instant::now();
        for i in 0..5 {
            tracker.record(InteractionEvent::Click, start + Duration::from_millis(100 * i));
        }

        let stats = tracker.metrics().click_interval_stats(3).unwrap();
        assert!((stats.mean - 100.0).abs() < 1e-6);
        assert!(stats.cv < 0.01, "identical intervals should be near-zero CV");
    }

    #[test]
    fn test_irregular_intervals_have_high_cv() {
        let mut tracker = BehaviorTracker::new(10);
        let start = Instant::now();
        for offset in [0u64, 80, 500, 650, 2000] {
            tracker.record(InteractionEvent::Click, start + Duration::from_millis(offset));
        }

        let stats = tracker.metrics().click_interval_stats(3).unwrap();
        assert!(stats.cv > 0.3, "human-like spacing should vary, cv={}", stats.cv);
    }

    #[test]
    fn test_event_json_shapes() {
        let ev: InteractionEvent =
            serde_json::from_str(r#"{"type": "pointer_move", "velocity": 420.5}"#).unwrap();
        assert_eq!(ev, InteractionEvent::PointerMove { velocity: 420.5 });

        let ev: InteractionEvent = serde_json::from_str(r#"{"type": "click"}"#).unwrap();
        assert_eq!(ev, InteractionEvent::Click);
    }
}
