//! Deterministic session fingerprint.
//!
//! Reduces a signal bag to a compact, stable identifier: each signal is
//! normalized to a short labeled token, tokens are concatenated in a fixed
//! declared order, and the join is digested. Absent signals become an
//! explicit `-` sentinel rather than being omitted, so the canonical join
//! never shifts and identical bags always produce identical fingerprints.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::signals::SignalBag;

/// Length of the hex fingerprint.
pub const FINGERPRINT_LEN: usize = 32;

const ABSENT: &str = "-";

/// Opaque session identifier derived from the signal bag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the fingerprint for a signal bag. Total: unsupported signals
/// degrade to sentinels, never fail.
pub fn build(signals: &SignalBag) -> Fingerprint {
    let joined = canonical_join(signals);
    let digest = Sha256::digest(joined.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    Fingerprint(hex)
}

/// Canonical token join, in the declared order: ua, screen, viewport, tz,
/// lang, platform, cores, mem, canvas, webgl, touch, plugins.
fn canonical_join(signals: &SignalBag) -> String {
    let mut tokens = Vec::with_capacity(12);

    tokens.push(format!(
        "ua:{}",
        signals.user_agent.as_deref().unwrap_or(ABSENT)
    ));
    tokens.push(match &signals.screen {
        Some(s) => format!("screen:{}x{}x{}", s.width, s.height, s.color_depth),
        None => format!("screen:{ABSENT}"),
    });
    tokens.push(match &signals.viewport {
        Some(v) => format!("viewport:{}x{}", v.width, v.height),
        None => format!("viewport:{ABSENT}"),
    });
    tokens.push(match signals.timezone_offset_minutes {
        Some(tz) => format!("tz:{tz}"),
        None => format!("tz:{ABSENT}"),
    });
    // An empty language list is a real (and suspicious) observation, so it
    // canonicalizes differently from an unsupported API.
    tokens.push(match &signals.languages {
        Some(langs) => format!("lang:{}", langs.join(",")),
        None => format!("lang:{ABSENT}"),
    });
    tokens.push(format!(
        "platform:{}",
        signals.platform.as_deref().unwrap_or(ABSENT)
    ));
    tokens.push(match signals.hardware_concurrency {
        Some(cores) => format!("cores:{cores}"),
        None => format!("cores:{ABSENT}"),
    });
    tokens.push(match signals.device_memory_gb {
        Some(mem) => format!("mem:{mem}"),
        None => format!("mem:{ABSENT}"),
    });
    tokens.push(format!(
        "canvas:{}",
        signals.canvas_digest.as_deref().unwrap_or(ABSENT)
    ));
    tokens.push(match &signals.webgl {
        Some(gl) => format!("webgl:{}/{}", gl.vendor, gl.renderer),
        None => format!("webgl:{ABSENT}"),
    });
    tokens.push(match signals.max_touch_points {
        Some(points) => format!("touch:{points}"),
        None => format!("touch:{ABSENT}"),
    });
    tokens.push(match signals.plugin_count {
        Some(count) => format!("plugins:{count}"),
        None => format!("plugins:{ABSENT}"),
    });

    tokens.join("|")
}
