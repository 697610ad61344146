//! Job orchestrator
//!
//! Turns one job request into N isolated sessions over a bounded worker
//! pool, then reassembles per-session reports in request order. One
//! session panicking or failing never disturbs its siblings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::driver::{BrowserDriver, DriverGuard};
use crate::error::EngineError;
use crate::sequence::SequenceSpec;
use crate::session::{
    next_meeple_name, run_session, Behavior, SessionConfig, SessionReport, SessionStatus,
};
use crate::stats::GlobalStats;
use crate::EngineConfig;

/// Hard caps; requests above these are clamped, not rejected
pub const MAX_USERS: usize = 25;
pub const MAX_CONCURRENCY: usize = 10;

fn default_users() -> usize {
    1
}
fn default_concurrency() -> usize {
    3
}
fn default_headless() -> bool {
    true
}

/// A batch of sessions against one URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub url: String,
    #[serde(default = "default_users")]
    pub users: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Enable request interception with the engine's blocked patterns
    #[serde(default)]
    pub inject: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_actions: Option<usize>,
    /// Named scripted sequences; when present, each session runs one of
    /// them instead of a persona
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequences: Option<HashMap<String, SequenceSpec>>,
    /// Fixed seed for reproducible jobs; absent means a random one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl JobRequest {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            users: default_users(),
            concurrency: default_concurrency(),
            headless: default_headless(),
            inject: false,
            max_actions: None,
            sequences: None,
            seed: None,
        }
    }
}

/// Launch parameters handed to the driver factory
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
}

/// Produces one fresh driver per session. Adapters over real automation
/// backends implement this outside the engine.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn BrowserDriver>, EngineError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub requested: usize,
    pub completed: usize,
    pub timed_out: usize,
    pub circuit_broken: usize,
    pub crashed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub summary: JobSummary,
    /// One report per requested session, in request order
    pub reports: Vec<SessionReport>,
}

/// Validate a request without touching a browser. Returns every problem
/// found; a non-empty list blocks the whole job.
pub fn validate_job(request: &JobRequest) -> Vec<String> {
    let mut errors = Vec::new();

    match url::Url::parse(&request.url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(format!("unsupported scheme '{}'", parsed.scheme())),
        Err(e) => errors.push(format!("invalid url '{}': {}", request.url, e)),
    }

    if request.users == 0 {
        errors.push("users must be at least 1".to_string());
    }

    if let Some(sequences) = &request.sequences {
        if sequences.is_empty() {
            errors.push("sequences map is empty".to_string());
        }
        for (name, spec) in sequences {
            if let Err(spec_errors) = spec.validate() {
                for e in spec_errors {
                    errors.push(format!("sequence '{}': {}", name, e));
                }
            }
        }
    }

    errors
}

/// Run a job to completion. Rejects up front on validation failure;
/// afterwards every requested session resolves to a report.
pub async fn run_job(
    factory: Arc<dyn DriverFactory>,
    clock: Arc<dyn Clock>,
    engine: EngineConfig,
    stats: Arc<GlobalStats>,
    request: JobRequest,
) -> Result<JobOutcome, EngineError> {
    let errors = validate_job(&request);
    if !errors.is_empty() {
        warn!("Job rejected: {}", errors.join("; "));
        return Err(EngineError::JobRejected(errors.join("; ")));
    }

    let users = request.users.min(MAX_USERS);
    let concurrency = request.concurrency.clamp(1, MAX_CONCURRENCY).min(users);
    if users < request.users {
        info!("Clamped users {} -> {}", request.users, users);
    }

    let job_seed = request.seed.unwrap_or_else(rand::random);
    info!(
        "Starting job: {} session(s) against {} (concurrency {}, seed {})",
        users, request.url, concurrency, job_seed
    );

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let options = LaunchOptions {
        headless: request.headless,
    };

    let mut handles = Vec::with_capacity(users);
    let mut names = Vec::with_capacity(users);

    for i in 0..users {
        let user_name = next_meeple_name();
        names.push(user_name.clone());

        // Golden-ratio stride keeps per-session streams well separated
        let seed = job_seed.wrapping_add((i as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));

        let factory = factory.clone();
        let clock = clock.clone();
        let engine = engine.clone();
        let stats = stats.clone();
        let semaphore = semaphore.clone();
        let options = options.clone();
        let url = request.url.clone();
        let sequences = request.sequences.clone();
        let max_actions = request.max_actions;
        let inject = request.inject;

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    return SessionReport::crashed(user_name, "worker pool closed".to_string())
                }
            };

            stats.add_session();
            // The guard escapes into this slot so a panicking session
            // still gets its browser torn down
            let guard_slot: Arc<Mutex<Option<Arc<DriverGuard>>>> = Arc::new(Mutex::new(None));
            let crash_name = user_name.clone();

            let outcome = std::panic::AssertUnwindSafe(run_one(
                factory,
                clock,
                engine,
                options,
                url,
                sequences,
                max_actions,
                inject,
                seed,
                user_name,
                guard_slot.clone(),
            ))
            .catch_unwind()
            .await;

            let report = match outcome {
                Ok(report) => report,
                Err(_) => {
                    error!("Session {} panicked", crash_name);
                    let guard = guard_slot
                        .lock()
                        .unwrap_or_else(|p| p.into_inner())
                        .take();
                    if let Some(guard) = guard {
                        guard.release().await;
                    }
                    SessionReport::crashed(crash_name, "session task panicked".to_string())
                }
            };
            stats.record_report(&report);
            stats.remove_session();
            report
        }));
    }

    let mut reports = Vec::with_capacity(users);
    for (handle, name) in handles.into_iter().zip(names) {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(e) => reports.push(SessionReport::crashed(name, format!("task failed: {}", e))),
        }
    }

    let mut summary = JobSummary {
        requested: users,
        ..Default::default()
    };
    for report in &reports {
        match report.status {
            SessionStatus::Completed => summary.completed += 1,
            SessionStatus::TimedOut => summary.timed_out += 1,
            SessionStatus::CircuitBroken => summary.circuit_broken += 1,
            SessionStatus::Crashed => summary.crashed += 1,
        }
    }
    info!(
        "Job finished: {}/{} completed, {} timed out, {} circuit-broken, {} crashed",
        summary.completed, users, summary.timed_out, summary.circuit_broken, summary.crashed
    );

    Ok(JobOutcome { summary, reports })
}

#[allow(clippy::too_many_arguments)]
async fn run_one(
    factory: Arc<dyn DriverFactory>,
    clock: Arc<dyn Clock>,
    engine: EngineConfig,
    options: LaunchOptions,
    url: String,
    sequences: Option<HashMap<String, SequenceSpec>>,
    max_actions: Option<usize>,
    inject: bool,
    seed: u64,
    user_name: String,
    guard_slot: Arc<Mutex<Option<Arc<DriverGuard>>>>,
) -> SessionReport {
    let driver = match factory.launch(&options).await {
        Ok(driver) => driver,
        Err(e) => {
            error!("Launch failed for {}: {}", user_name, e);
            return SessionReport::crashed(user_name, format!("launch failed: {}", e));
        }
    };
    let guard = DriverGuard::new(driver);
    *guard_slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(guard.clone());

    let behavior = pick_behavior(sequences, seed);
    let mut config = SessionConfig::new(&url, user_name, behavior, seed);
    config.max_actions = max_actions;
    config.action_timeout = Duration::from_millis(engine.action_timeout_ms);
    config.session_timeout = Duration::from_millis(engine.session_timeout_ms);
    config.max_consecutive_failures = engine.max_consecutive_failures;
    if inject {
        config.blocked_url_patterns = engine.blocked_url_patterns.clone();
    }

    run_session(guard, clock, engine.executor, config).await
}

/// Uniform pick over named sequences when any were supplied
fn pick_behavior(sequences: Option<HashMap<String, SequenceSpec>>, seed: u64) -> Behavior {
    let Some(sequences) = sequences.filter(|s| !s.is_empty()) else {
        return Behavior::Persona;
    };
    let mut names: Vec<&String> = sequences.keys().collect();
    names.sort();
    let mut rng = StdRng::seed_from_u64(seed);
    let name = names[rng.gen_range(0..names.len())].clone();
    let spec = sequences[&name].clone();
    Behavior::Sequence { name, spec }
}
