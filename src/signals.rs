//! Browser signal snapshot types.
//!
//! The signal provider is opaque: it hands the engine a bag of primitive
//! per-session facts. Every field is optional because any browser API can
//! be denied or unsupported; absent fields degrade to sentinels downstream,
//! they never fail the pipeline.

use serde::{Deserialize, Serialize};

/// Physical screen descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSignal {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
}

/// Layout viewport descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSignal {
    pub width: u32,
    pub height: u32,
}

/// WebGL adapter descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebGlSignal {
    pub vendor: String,
    pub renderer: String,
}

/// A read-only snapshot of everything the signal provider knows about the
/// session at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalBag {
    /// Raw user-agent string
    pub user_agent: Option<String>,

    /// Physical screen dimensions and color depth
    pub screen: Option<ScreenSignal>,

    /// Layout viewport dimensions
    pub viewport: Option<ViewportSignal>,

    /// Timezone offset in minutes west of UTC
    pub timezone_offset_minutes: Option<i32>,

    /// Preferred languages. `Some(vec![])` means the API answered with an
    /// empty list, which is itself a tell-tale; `None` means unsupported.
    pub languages: Option<Vec<String>>,

    /// Navigator platform string
    pub platform: Option<String>,

    /// Logical CPU count
    pub hardware_concurrency: Option<u32>,

    /// Approximate device memory in GiB
    pub device_memory_gb: Option<f32>,

    /// Digest of an offscreen canvas rendering
    pub canvas_digest: Option<String>,

    /// WebGL vendor/renderer, absent when WebGL is unavailable
    pub webgl: Option<WebGlSignal>,

    /// Maximum simultaneous touch points
    pub max_touch_points: Option<u32>,

    /// The `navigator.webdriver` automation flag
    pub webdriver: Option<bool>,

    /// Names of automation-framework globals found on the page
    pub automation_globals: Vec<String>,

    /// Number of browser plugins reported
    pub plugin_count: Option<u32>,

    /// Path of the page under classification
    pub url_path: Option<String>,

    /// Document referrer
    pub referrer: Option<String>,
}

impl SignalBag {
    /// The user-agent, if one was observed.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Fold a later snapshot into this one. The bag is append-only: facts
    /// already established are kept, absent fields are filled, and newly
    /// observed automation globals are appended.
    pub fn merge(&mut self, later: SignalBag) {
        merge_field(&mut self.user_agent, later.user_agent);
        merge_field(&mut self.screen, later.screen);
        merge_field(&mut self.viewport, later.viewport);
        merge_field(&mut self.timezone_offset_minutes, later.timezone_offset_minutes);
        merge_field(&mut self.languages, later.languages);
        merge_field(&mut self.platform, later.platform);
        merge_field(&mut self.hardware_concurrency, later.hardware_concurrency);
        merge_field(&mut self.device_memory_gb, later.device_memory_gb);
        merge_field(&mut self.canvas_digest, later.canvas_digest);
        merge_field(&mut self.webgl, later.webgl);
        merge_field(&mut self.max_touch_points, later.max_touch_points);
        merge_field(&mut self.webdriver, later.webdriver);
        merge_field(&mut self.plugin_count, later.plugin_count);
        merge_field(&mut self.url_path, later.url_path);
        merge_field(&mut self.referrer, later.referrer);

        for global in later.automation_globals {
            if !self.automation_globals.contains(&global) {
                self.automation_globals.push(global);
            }
        }
    }
}

fn merge_field<T>(current: &mut Option<T>, later: Option<T>) {
    if current.is_none() {
        *current = later;
    }
}

/// Whether a user-agent claims a desktop operating system.
pub fn is_desktop_shaped(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    if is_mobile_shaped(&ua) {
        return false;
    }
    ua.contains("windows") || ua.contains("macintosh") || ua.contains("x11")
}

/// Whether a user-agent claims a mobile device.
pub fn is_mobile_shaped(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    ua.contains("android")
        || ua.contains("iphone")
        || ua.contains("ipad")
        || ua.contains("mobile")
}
