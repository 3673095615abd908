//! Session lifecycle and the classification engine.
//!
//! A [`Session`] owns everything about one page view: the growing signal
//! bag, the behavior tracker, the verification latch, and the routing
//! state. It reacts to three events (a signal snapshot, an input event, a
//! timer tick) plus the verification outcome, re-running the pipeline after
//! each one. The pipeline itself lives in [`ClassificationEngine`], which is
//! immutable after construction and shared across sessions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::ConfidenceAggregator;
use crate::analyzers::{
    Analyzer, AnalyzerInput, BehaviorAnalyzer, EnvironmentAnalyzer, IdentityAnalyzer,
};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::fingerprint::{self, Fingerprint};
use crate::metrics::{BehaviorMetrics, BehaviorTracker, InteractionEvent};
use crate::routing::{Router, RoutingState};
use crate::signals::SignalBag;
use crate::verdict::{RecommendedAction, Verdict};
use crate::verifier::{
    reconcile, unix_millis, BehavioralSnapshot, DetectRequest, VerifyOutcome, VerifyPhase,
};

/// The analyzer pipeline with its aggregator. Pattern tables are compiled
/// once here; sessions hold a shared handle.
pub struct ClassificationEngine {
    identity: IdentityAnalyzer,
    environment: EnvironmentAnalyzer,
    behavior: BehaviorAnalyzer,
    aggregator: ConfidenceAggregator,
}

impl ClassificationEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            identity: IdentityAnalyzer::new(&config.identity),
            environment: EnvironmentAnalyzer::new(&config.environment),
            behavior: BehaviorAnalyzer::new(&config.behavior),
            aggregator: ConfidenceAggregator::new(&config.weights, &config.thresholds),
        }
    }

    /// Run every analyzer over one snapshot and aggregate the verdicts.
    pub fn classify(&self, input: &AnalyzerInput<'_>) -> Verdict {
        let identity = self.identity.classify(input.user_agent());
        debug!(
            analyzer = self.identity.name(),
            confidence = identity.verdict.confidence,
            "Analyzer verdict"
        );

        let environment = self.environment.analyze(input);
        debug!(
            analyzer = self.environment.name(),
            confidence = environment.confidence,
            "Analyzer verdict"
        );

        let behavior = self.behavior.analyze(input);
        debug!(
            analyzer = self.behavior.name(),
            confidence = behavior.confidence,
            "Analyzer verdict"
        );

        self.aggregator.aggregate(&identity, &environment, &behavior)
    }
}

/// One page view being classified. Created when the view begins, discarded
/// on navigation away; nothing persists across sessions.
pub struct Session {
    started_at: Instant,
    clock: Arc<dyn Clock>,
    engine: Arc<ClassificationEngine>,
    router: Router,
    signals: SignalBag,
    tracker: BehaviorTracker,
    fingerprint: Fingerprint,
    local_verdict: Verdict,
    final_verdict: Verdict,
    routing: RoutingState,
    verify_phase: VerifyPhase,
    verify_started_at: Option<Instant>,
    verify_deadline: Duration,
    outcome: Option<VerifyOutcome>,
    verifier_session_id: Option<String>,
    verifier_message: Option<String>,
}

impl Session {
    pub fn new(
        engine: Arc<ClassificationEngine>,
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let started_at = clock.now();
        let signals = SignalBag::default();
        let fingerprint = fingerprint::build(&signals);

        let mut session = Self {
            started_at,
            clock,
            engine,
            router: Router::new(&config.thresholds, &config.routing),
            signals,
            tracker: BehaviorTracker::new(config.behavior.window_capacity),
            fingerprint,
            local_verdict: Verdict::default(),
            final_verdict: Verdict::default(),
            routing: RoutingState::Pending,
            verify_phase: VerifyPhase::Idle,
            verify_started_at: None,
            verify_deadline: Duration::from_millis(config.verifier.timeout_ms),
            outcome: None,
            verifier_session_id: None,
            verifier_message: None,
        };
        session.evaluate();
        session
    }

    /// Time since the session began, per the injected clock.
    pub fn dwell(&self) -> Duration {
        self.clock.now().duration_since(self.started_at)
    }

    pub fn routing_state(&self) -> RoutingState {
        self.routing
    }

    /// The reconciled verdict: local when no verification outcome exists.
    pub fn final_verdict(&self) -> &Verdict {
        &self.final_verdict
    }

    pub fn local_verdict(&self) -> &Verdict {
        &self.local_verdict
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn signals(&self) -> &SignalBag {
        &self.signals
    }

    pub fn metrics(&self) -> &BehaviorMetrics {
        self.tracker.metrics()
    }

    pub fn verify_phase(&self) -> VerifyPhase {
        self.verify_phase
    }

    /// Fold a fresh snapshot into the signal bag. Append-only: fields
    /// already observed never change, so the fingerprint can only gain
    /// components.
    pub fn signals_updated(&mut self, snapshot: SignalBag) {
        self.signals.merge(snapshot);
        self.fingerprint = fingerprint::build(&self.signals);
        self.evaluate();
    }

    /// Record one input event.
    pub fn interaction(&mut self, event: InteractionEvent) {
        self.tracker.record(event, self.clock.now());
        self.evaluate();
    }

    /// Periodic tick. Re-evaluates dwell-gated heuristics and notices an
    /// overdue verification attempt.
    pub fn timer_elapsed(&mut self) {
        if self.verify_phase == VerifyPhase::InFlight {
            let overdue = self
                .verify_started_at
                .is_some_and(|started| self.clock.now().duration_since(started) >= self.verify_deadline);
            if overdue {
                debug!("Verification deadline elapsed without an answer");
                self.verify_phase = VerifyPhase::TimedOut;
                self.outcome = Some(VerifyOutcome::Unavailable);
            }
        }
        self.evaluate();
    }

    /// Arm the verification latch and build the request to send. Returns
    /// `None` when an attempt is already in flight or settled: one attempt
    /// per session, suppressed rather than queued.
    pub fn begin_verification(&mut self) -> Option<DetectRequest> {
        if self.verify_phase != VerifyPhase::Idle {
            debug!(phase = ?self.verify_phase, "Verification already attempted, suppressing");
            return None;
        }
        self.verify_phase = VerifyPhase::InFlight;
        self.verify_started_at = Some(self.clock.now());

        Some(DetectRequest {
            user_agent: self.signals.user_agent.clone(),
            fingerprint: self.fingerprint.as_str().to_string(),
            is_bot: self.local_verdict.is_bot,
            confidence: self.local_verdict.confidence,
            methods: self.local_verdict.reasons.clone(),
            behavioral: BehavioralSnapshot::from_metrics(self.tracker.metrics(), self.dwell()),
            timestamp: unix_millis(),
            url_path: self.signals.url_path.clone(),
            referrer: self.signals.referrer.clone(),
        })
    }

    /// Fold the verification outcome in. Dropped unless an attempt is in
    /// flight: a late answer after the deadline already settled changes
    /// nothing.
    pub fn verifier_resolved(&mut self, outcome: VerifyOutcome) {
        if self.verify_phase != VerifyPhase::InFlight {
            warn!(phase = ?self.verify_phase, "Dropping verifier outcome");
            return;
        }
        self.verify_phase = VerifyPhase::Resolved;
        if let VerifyOutcome::Answer(answer) = &outcome {
            self.verifier_session_id = answer.session_id.clone();
            self.verifier_message = answer.message.clone();
        }
        self.outcome = Some(outcome);
        self.evaluate();
    }

    /// Snapshot for the presentation layer.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            fingerprint: self.fingerprint.as_str().to_string(),
            routing_state: self.routing,
            verdict: self.final_verdict.clone(),
            recommended_action: self.final_verdict.recommended_action(),
            dwell_ms: self.dwell().as_millis() as u64,
            interactions: self.tracker.metrics().interaction_count(),
            verify_phase: self.verify_phase,
            verifier_session_id: self.verifier_session_id.clone(),
            verifier_message: self.verifier_message.clone(),
        }
    }

    /// One pass of the whole pipeline: classify, reconcile, route.
    fn evaluate(&mut self) {
        let dwell = self.dwell();
        let input = AnalyzerInput {
            signals: &self.signals,
            metrics: self.tracker.metrics(),
            dwell,
        };
        self.local_verdict = self.engine.classify(&input);

        self.final_verdict = match &self.outcome {
            Some(outcome) => reconcile(&self.local_verdict, outcome),
            None => self.local_verdict.clone(),
        };

        let next = self.router.next_state(
            self.routing,
            &self.final_verdict,
            dwell,
            self.tracker.metrics().interaction_count(),
        );
        if next != self.routing {
            info!(
                from = self.routing.as_str(),
                to = next.as_str(),
                confidence = self.final_verdict.confidence,
                is_bot = self.final_verdict.is_bot,
                "Routing state changed"
            );
            self.routing = next;
        }
    }
}

/// Serializable view of a session for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub fingerprint: String,
    pub routing_state: RoutingState,
    pub verdict: Verdict,
    pub recommended_action: RecommendedAction,
    pub dwell_ms: u64,
    pub interactions: u32,
    pub verify_phase: VerifyPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_message: Option<String>,
}
