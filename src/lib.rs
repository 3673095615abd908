//! Visitor session classification engine.
//!
//! Classifies one page-view session as human, crawler, or automation and
//! routes it to exactly one presentation variant.
//!
//! # Features
//!
//! - Canonical fingerprinting of the session's signal bag
//! - Identity, environment, and behavior analyzers feeding a max-not-sum
//!   confidence aggregator with a known-crawler pin
//! - Optional remote verification over HTTP with a hard deadline and a
//!   fail-open policy
//! - A four-state routing machine driven by an injected clock, never wall
//!   time
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use visitor_gate::{ClassificationEngine, EngineConfig, Session, SystemClock};
//!
//! let config = EngineConfig::default();
//! let engine = Arc::new(ClassificationEngine::new(&config));
//! let mut session = Session::new(engine, &config, Arc::new(SystemClock));
//! session.signals_updated(snapshot);
//! println!("{}", session.routing_state().as_str());
//! ```

pub mod aggregate;
pub mod analyzers;
pub mod clock;
pub mod config;
pub mod fingerprint;
pub mod metrics;
pub mod routing;
pub mod session;
pub mod signals;
pub mod verdict;
pub mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use fingerprint::Fingerprint;
pub use metrics::{BehaviorMetrics, InteractionEvent};
pub use routing::RoutingState;
pub use session::{ClassificationEngine, Session, SessionSummary};
pub use signals::SignalBag;
pub use verdict::{RiskLevel, Verdict};
pub use verifier::{VerificationClient, VerifyOutcome, VerifyPhase};
