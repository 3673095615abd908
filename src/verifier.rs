//! Remote verification client.
//!
//! Posts the local view of a session to the verifier's detect endpoint and
//! maps whatever comes back into a [`VerifyOutcome`]. The verifier is
//! advisory except for an HTTP 403, which is an authoritative deny; every
//! failure mode (timeout, transport error, malformed answer) fails open.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::VerifierConfig;
use crate::metrics::BehaviorMetrics;
use crate::verdict::{RiskLevel, Verdict};

/// Interaction counters and windows in the verifier's wire shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BehavioralSnapshot {
    pub mouse_movements: u32,
    pub keyboard_events: u32,
    pub scroll_events: u32,
    pub touch_events: u32,
    pub focus_events: u32,
    pub click_intervals_ms: Vec<f64>,
    pub pointer_velocities: Vec<f64>,
    /// Dwell in milliseconds
    pub time_spent: u64,
    pub device_motion: bool,
    pub device_orientation: bool,
}

impl BehavioralSnapshot {
    pub fn from_metrics(metrics: &BehaviorMetrics, dwell: Duration) -> Self {
        Self {
            mouse_movements: metrics.pointer_moves,
            keyboard_events: metrics.key_events,
            scroll_events: metrics.scroll_events,
            touch_events: metrics.touch_events,
            focus_events: metrics.focus_events,
            click_intervals_ms: metrics.click_intervals_ms.iter().copied().collect(),
            pointer_velocities: metrics.pointer_velocities.iter().copied().collect(),
            time_spent: dwell.as_millis() as u64,
            device_motion: metrics.device_motion_seen,
            device_orientation: metrics.device_orientation_seen,
        }
    }
}

/// Payload posted to the detect endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub fingerprint: String,
    pub is_bot: bool,
    pub confidence: f32,
    pub methods: Vec<String>,
    pub behavioral: BehavioralSnapshot,
    /// Wall-clock milliseconds since the Unix epoch
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// Milliseconds since the Unix epoch, for the wire timestamp.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A 200 answer from the detect endpoint. Everything beyond `status` is
/// optional so schema drift on the verifier side degrades instead of
/// breaking the parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectResponse {
    pub status: String,
    pub is_bot: Option<bool>,
    pub confidence: Option<f32>,
    pub blocked: Option<bool>,
    pub is_known_crawler: Option<bool>,
    pub methods: Option<Vec<String>>,
    pub risk_level: Option<String>,
    pub warning: Option<String>,
    pub session_id: Option<String>,
    pub message: Option<String>,
}

/// Body of a 403 deny. Parsed best-effort: the status code alone already
/// carries the decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DenyDetails {
    pub error: String,
    pub reason: Option<String>,
    pub confidence: Option<f32>,
    pub methods: Option<Vec<String>>,
}

/// What one verification attempt produced.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// HTTP 403: the verifier denies the session outright
    Deny(DenyDetails),
    /// HTTP 200 with a parseable body
    Answer(DetectResponse),
    /// Timeout, transport failure, unexpected status, or malformed answer
    Unavailable,
}

/// Per-session verification latch. One attempt per session: once settled,
/// no re-send and no late resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyPhase {
    #[default]
    Idle,
    InFlight,
    Resolved,
    TimedOut,
}

impl VerifyPhase {
    /// Settled means the attempt ended, one way or the other.
    pub fn is_settled(&self) -> bool {
        matches!(self, VerifyPhase::Resolved | VerifyPhase::TimedOut)
    }
}

/// Raw reply classification, before deadline handling.
#[derive(Debug, Clone)]
pub enum TransportReply {
    Answer(DetectResponse),
    Deny(DenyDetails),
}

/// Seam between the client and the actual HTTP stack.
#[async_trait]
pub trait VerifierTransport: Send + Sync {
    async fn detect(&self, request: &DetectRequest) -> anyhow::Result<TransportReply>;
}

/// Transport over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &VerifierConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("building verifier HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl VerifierTransport for HttpTransport {
    async fn detect(&self, request: &DetectRequest) -> anyhow::Result<TransportReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .context("posting to verifier")?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            // The code is the decision; a body is a bonus.
            let details = response.json::<DenyDetails>().await.unwrap_or_default();
            return Ok(TransportReply::Deny(details));
        }
        if !status.is_success() {
            anyhow::bail!("verifier returned {status}");
        }

        let body = response
            .json::<DetectResponse>()
            .await
            .context("decoding verifier answer")?;
        Ok(TransportReply::Answer(body))
    }
}

/// Drives one verification attempt against a hard deadline.
pub struct VerificationClient {
    transport: Arc<dyn VerifierTransport>,
    deadline: Duration,
}

impl VerificationClient {
    pub fn new(transport: Arc<dyn VerifierTransport>, config: &VerifierConfig) -> Self {
        Self {
            transport,
            deadline: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Build a client over the HTTP transport from config.
    pub fn from_config(config: &VerifierConfig) -> anyhow::Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Ok(Self::new(transport, config))
    }

    /// Run one attempt. Never errors: everything that is not an answer or
    /// a deny becomes [`VerifyOutcome::Unavailable`].
    pub async fn verify(&self, request: &DetectRequest) -> VerifyOutcome {
        match tokio::time::timeout(self.deadline, self.transport.detect(request)).await {
            Ok(Ok(TransportReply::Deny(details))) => {
                warn!(reason = ?details.reason, "Verifier denied the session");
                VerifyOutcome::Deny(details)
            }
            Ok(Ok(TransportReply::Answer(answer))) => {
                debug!(status = %answer.status, "Verifier answered");
                VerifyOutcome::Answer(answer)
            }
            Ok(Err(e)) => {
                warn!(error = ?e, "Verifier unavailable, failing open");
                VerifyOutcome::Unavailable
            }
            Err(_) => {
                warn!(deadline_ms = self.deadline.as_millis() as u64, "Verifier deadline elapsed, failing open");
                VerifyOutcome::Unavailable
            }
        }
    }
}

/// Merge a verification outcome into the local verdict. Pure: the inputs
/// are untouched and the same pair always reconciles the same way.
pub fn reconcile(local: &Verdict, outcome: &VerifyOutcome) -> Verdict {
    let mut verdict = local.clone();

    match outcome {
        VerifyOutcome::Unavailable => {
            // Fail open: the local view stands, annotated.
            push_unique(&mut verdict.reasons, "backend_unavailable");
        }
        VerifyOutcome::Deny(details) => {
            verdict.is_bot = true;
            verdict.should_block = true;
            if let Some(remote) = details.confidence {
                verdict.confidence = verdict.confidence.max(remote.clamp(0.0, 1.0));
            }
            verdict.risk_level = RiskLevel::from_confidence(verdict.confidence);
            push_unique(&mut verdict.reasons, "verifier_denied");
            if let Some(reason) = &details.reason {
                push_unique(&mut verdict.reasons, reason.clone());
            }
            for method in details.methods.iter().flatten() {
                push_unique(&mut verdict.reasons, method.clone());
            }
        }
        VerifyOutcome::Answer(answer) => {
            if let Some(remote) = answer.confidence {
                verdict.confidence = verdict.confidence.max(remote.clamp(0.0, 1.0));
            }
            verdict.is_bot = verdict.is_bot || answer.is_bot.unwrap_or(false);
            verdict.is_known_crawler =
                verdict.is_known_crawler || answer.is_known_crawler.unwrap_or(false);
            verdict.should_block = verdict.should_block || answer.blocked.unwrap_or(false);
            // Recomputed, never taken from the wire
            verdict.risk_level = RiskLevel::from_confidence(verdict.confidence);
            for method in answer.methods.iter().flatten() {
                push_unique(&mut verdict.reasons, method.clone());
            }
            if let Some(warning) = &answer.warning {
                push_unique(&mut verdict.reasons, warning.clone());
            }
        }
    }

    verdict
}

fn push_unique(reasons: &mut Vec<String>, reason: impl Into<String>) {
    let reason = reason.into();
    if !reasons.contains(&reason) {
        reasons.push(reason);
    }
}
