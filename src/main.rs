//! Visitor session classifier.
//!
//! Replays a captured session (one signal snapshot plus a timeline of input
//! events) through the engine and prints the resulting summary.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use visitor_gate::{
    ClassificationEngine, EngineConfig, InteractionEvent, ManualClock, Session, SignalBag,
    VerificationClient,
};

#[derive(Parser, Debug)]
#[command(name = "visitor-gate")]
#[command(author, version, about = "Classify a visitor session from captured signals and events")]
struct Args {
    /// Input document (JSON with `signals` and `events`); stdin when
    /// absent or "-"
    input: Option<PathBuf>,

    /// Path to configuration file (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Consult the verifier even if the config leaves it disabled
    #[arg(long)]
    verify: bool,

    /// Verifier detect endpoint (implies --verify)
    #[arg(long)]
    verifier_url: Option<String>,

    /// Total session dwell to simulate, in milliseconds
    #[arg(long)]
    dwell_ms: Option<u64>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Replay document: the signal snapshot plus a timeline of input events.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InputDocument {
    signals: SignalBag,
    events: Vec<TimedEvent>,
}

/// One input event stamped with its offset from session start.
#[derive(Debug, Deserialize)]
struct TimedEvent {
    at_ms: u64,
    #[serde(flatten)]
    event: InteractionEvent,
}

fn init_logging(json: bool, level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<InputDocument> {
    let raw = match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("parsing input document")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, &args.log_level);

    // Load configuration
    let mut config: EngineConfig = if let Some(config_path) = &args.config {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        if config_path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        }
    } else {
        EngineConfig::default()
    };

    if let Some(url) = args.verifier_url {
        config.verifier.endpoint = url;
        config.verifier.enabled = true;
    }
    if args.verify {
        config.verifier.enabled = true;
    }

    let doc = read_input(args.input.as_ref())?;

    // Replay against a manual clock so identical documents classify
    // identically regardless of host speed.
    let clock = Arc::new(ManualClock::new());
    let engine = Arc::new(ClassificationEngine::new(&config));
    let mut session = Session::new(engine, &config, clock.clone());

    session.signals_updated(doc.signals);

    let mut elapsed_ms = 0u64;
    for timed in &doc.events {
        if timed.at_ms > elapsed_ms {
            clock.advance(Duration::from_millis(timed.at_ms - elapsed_ms));
            elapsed_ms = timed.at_ms;
        }
        session.interaction(timed.event);
    }

    let final_dwell = args.dwell_ms.unwrap_or(0).max(elapsed_ms);
    if final_dwell > elapsed_ms {
        clock.advance(Duration::from_millis(final_dwell - elapsed_ms));
    }
    session.timer_elapsed();

    if config.verifier.enabled {
        if let Some(request) = session.begin_verification() {
            info!(endpoint = %config.verifier.endpoint, "Consulting verifier");
            let client = VerificationClient::from_config(&config.verifier)?;
            let outcome = client.verify(&request).await;
            session.verifier_resolved(outcome);
        }
    }

    let summary = session.summary();
    info!(
        state = summary.routing_state.as_str(),
        confidence = summary.verdict.confidence,
        is_bot = summary.verdict.is_bot,
        fingerprint = %summary.fingerprint,
        "Session classified"
    );

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
