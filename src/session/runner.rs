//! Session runner state machine.
//!
//! NotStarted -> Navigating -> Running -> terminal. One driver per
//! session, one seeded RNG stream per session, and a progress mirror so
//! the outer timeout can still hand back a partial result.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use url::Url;

use super::{NavigationMonitor, SessionReport, SessionStatus};
use crate::actions::{ActionExecutor, ExecutorConfig};
use crate::clock::Clock;
use crate::driver::DriverGuard;
use crate::error::EngineError;
use crate::hotzone::{HotZoneAnalyzer, ZoneSnapshot};
use crate::persona::pick_persona;
use crate::sequence::{generate_sequence, SequenceInterpreter, SequenceSpec};

const NAVIGATE_ATTEMPTS: usize = 3;
const NAVIGATE_BACKOFF: Duration = Duration::from_secs(1);

/// What drives the session's actions
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Pick a persona from the catalog and generate a sequence
    Persona,
    /// Interpret a named, pre-validated scripted sequence
    Sequence { name: String, spec: SequenceSpec },
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub url: String,
    pub user_name: String,
    pub behavior: Behavior,
    pub max_actions: Option<usize>,
    pub seed: u64,
    /// Bound on any single action
    pub action_timeout: Duration,
    /// Bound on the whole session
    pub session_timeout: Duration,
    /// Consecutive action failures before the circuit breaks
    pub max_consecutive_failures: usize,
    /// Request URL substrings to block (trackers the pipeline under test
    /// does not own, heavy third-party media)
    pub blocked_url_patterns: Vec<String>,
    /// Permissions granted to the origin up front so prompts never block
    pub permissions: Vec<String>,
}

impl SessionConfig {
    pub fn new(url: &str, user_name: String, behavior: Behavior, seed: u64) -> Self {
        Self {
            url: url.to_string(),
            user_name,
            behavior,
            max_actions: None,
            seed,
            action_timeout: Duration::from_secs(30),
            session_timeout: Duration::from_secs(600),
            max_consecutive_failures: 5,
            blocked_url_patterns: Vec::new(),
            permissions: vec!["geolocation".to_string(), "notifications".to_string()],
        }
    }
}

/// Drive one session to a terminal state. Never panics outward and never
/// errors: every outcome is a [`SessionReport`], and the driver is
/// released exactly once on every path.
pub async fn run_session(
    guard: Arc<DriverGuard>,
    clock: Arc<dyn Clock>,
    executor_config: ExecutorConfig,
    config: SessionConfig,
) -> SessionReport {
    let progress = Arc::new(Mutex::new(SessionReport::new(config.user_name.clone())));
    let session_timeout = config.session_timeout;
    let user_name = config.user_name.clone();

    let inner = run_inner(
        guard.clone(),
        clock,
        executor_config,
        config,
        progress.clone(),
    );

    let report = match tokio::time::timeout(session_timeout, inner).await {
        Ok(report) => report,
        Err(_) => {
            warn!("Session {} hit the outer timeout", user_name);
            let mut partial = progress.lock().unwrap_or_else(|p| p.into_inner()).clone();
            partial.status = SessionStatus::TimedOut;
            partial.timed_out = true;
            partial
        }
    };

    guard.release().await;
    report
}

async fn run_inner(
    guard: Arc<DriverGuard>,
    clock: Arc<dyn Clock>,
    executor_config: ExecutorConfig,
    config: SessionConfig,
    progress: Arc<Mutex<SessionReport>>,
) -> SessionReport {
    let fail = |error: EngineError| {
        let mut report = progress.lock().unwrap_or_else(|p| p.into_inner()).clone();
        report.status = SessionStatus::Crashed;
        report.crashed = true;
        report.error = Some(error.to_string());
        report
    };

    let monitor = match NavigationMonitor::new(&config.url) {
        Ok(m) => m,
        Err(e) => return fail(e),
    };

    let driver = guard.driver_arc();
    let mut rng = StdRng::seed_from_u64(config.seed);

    if let Err(e) = setup_page(driver.as_ref(), &config).await {
        warn!("Page setup incomplete for {}: {}", config.user_name, e);
    }
    if let Err(e) = navigate_with_retry(driver.as_ref(), clock.as_ref(), &config.url).await {
        return fail(e);
    }

    info!("{} running against {}", config.user_name, config.url);

    // The executor draws from its own stream so persona/sequence draws
    // stay stable if executor internals change
    let executor_rng = StdRng::seed_from_u64(config.seed.rotate_left(17));

    match config.behavior.clone() {
        Behavior::Persona => {
            let persona = pick_persona(&mut rng);
            let planned = generate_sequence(persona, config.max_actions, &mut rng);
            {
                let mut p = progress.lock().unwrap_or_else(|p| p.into_inner());
                p.persona = Some(persona.id.to_string());
                p.action_sequence = Some(planned.clone());
            }
            let mut executor = ActionExecutor::new(
                driver.clone(),
                clock.clone(),
                executor_config,
                persona.engagement,
                executor_rng,
            );

            let mut snapshot = snapshot_zones(&driver).await;
            executor.set_viewport(snapshot.viewport);
            let mut last_url = driver.current_url().await.unwrap_or_default();
            let mut consecutive_failures = 0usize;
            let mut attempted = 0usize;
            let mut broke = false;

            for kind in &planned {
                match monitor.check(driver.as_ref()).await {
                    Ok(true) => {
                        snapshot = snapshot_zones(&driver).await;
                        executor.set_viewport(snapshot.viewport);
                    }
                    Ok(false) => {}
                    Err(e) => warn!("Navigation check failed: {}", e),
                }

                let success = match tokio::time::timeout(
                    config.action_timeout,
                    executor.execute(*kind, &snapshot.zones),
                )
                .await
                {
                    Ok(ok) => ok,
                    Err(_) => {
                        warn!("Action {} timed out", kind);
                        false
                    }
                };

                attempted += 1;
                progress
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .actions_completed = attempted;

                if success {
                    consecutive_failures = 0;
                } else {
                    consecutive_failures += 1;
                    if consecutive_failures >= config.max_consecutive_failures {
                        warn!(
                            "{} circuit broke after {} consecutive failures",
                            config.user_name, consecutive_failures
                        );
                        broke = true;
                        break;
                    }
                }

                if let Ok(url) = driver.current_url().await {
                    if url != last_url {
                        snapshot = snapshot_zones(&driver).await;
                        executor.set_viewport(snapshot.viewport);
                        last_url = url;
                    }
                }
            }

            let mut report = progress.lock().unwrap_or_else(|p| p.into_inner()).clone();
            report.status = if broke {
                SessionStatus::CircuitBroken
            } else {
                SessionStatus::Completed
            };
            report
        }

        Behavior::Sequence { name, spec } => {
            let planned_steps = spec.actions.len();
            progress
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .sequence = Some(name.clone());

            let interpreter = SequenceInterpreter::new(spec, &mut rng);
            let mut executor = ActionExecutor::new(
                driver.clone(),
                clock.clone(),
                executor_config,
                1.0,
                executor_rng,
            );

            let results = interpreter
                .run(
                    &driver,
                    &mut executor,
                    &monitor,
                    config.action_timeout,
                    &clock,
                    &mut rng,
                )
                .await;

            let mut report = progress.lock().unwrap_or_else(|p| p.into_inner()).clone();
            report.actions_completed = results.len();
            report.status = if results.len() < planned_steps {
                SessionStatus::CircuitBroken
            } else {
                SessionStatus::Completed
            };
            report.action_results = Some(results);
            report
        }
    }
}

async fn setup_page(
    driver: &dyn crate::driver::BrowserDriver,
    config: &SessionConfig,
) -> Result<(), EngineError> {
    if !config.blocked_url_patterns.is_empty() {
        driver
            .set_request_interception(&config.blocked_url_patterns)
            .await?;
    }
    if !config.permissions.is_empty() {
        if let Ok(parsed) = Url::parse(&config.url) {
            driver
                .override_permissions(&parsed.origin().ascii_serialization(), &config.permissions)
                .await?;
        }
    }
    Ok(())
}

async fn navigate_with_retry(
    driver: &dyn crate::driver::BrowserDriver,
    clock: &dyn Clock,
    url: &str,
) -> Result<(), EngineError> {
    let mut last = None;
    for attempt in 1..=NAVIGATE_ATTEMPTS {
        match driver.navigate(url).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!("Navigate attempt {}/{} failed: {}", attempt, NAVIGATE_ATTEMPTS, e);
                last = Some(e);
                if attempt < NAVIGATE_ATTEMPTS {
                    clock.sleep(NAVIGATE_BACKOFF).await;
                }
            }
        }
    }
    Err(last.unwrap_or_else(|| EngineError::NavigationFailed(url.to_string())))
}

async fn snapshot_zones(driver: &Arc<dyn crate::driver::BrowserDriver>) -> ZoneSnapshot {
    match HotZoneAnalyzer::snapshot(driver.as_ref()).await {
        Ok(snap) => snap,
        Err(e) => {
            warn!("Zone snapshot failed: {}", e);
            ZoneSnapshot::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{NullClock, TokioClock};
    use crate::driver::mock::MockDriver;
    use crate::driver::BrowserDriver;

    fn persona_config(seed: u64) -> SessionConfig {
        SessionConfig::new(
            "https://example.com",
            "Meeple-test".to_string(),
            Behavior::Persona,
            seed,
        )
    }

    #[tokio::test]
    async fn completed_session_covers_the_planned_sequence() {
        let mock = Arc::new(MockDriver::new("https://example.com"));
        let guard = DriverGuard::new(mock.clone());
        let mut config = persona_config(11);
        config.max_actions = Some(12);

        let report = run_session(
            guard.clone(),
            Arc::new(NullClock),
            ExecutorConfig::default(),
            config,
        )
        .await;

        assert_eq!(report.status, SessionStatus::Completed);
        assert_eq!(report.actions_completed, 12);
        assert_eq!(report.action_sequence.as_ref().unwrap().len(), 12);
        assert!(report.persona.is_some());
        assert!(mock.was_closed());
        assert_eq!(mock.close_count(), 1);
    }

    #[tokio::test]
    async fn circuit_breaks_after_exactly_five_failures() {
        let mock = Arc::new(MockDriver::new("https://example.com"));
        // Navigation and URL checks keep working; every action op fails
        mock.fail_actions_except(&["navigate", "url"]);
        let guard = DriverGuard::new(mock.clone());

        let report = run_session(
            guard,
            Arc::new(NullClock),
            ExecutorConfig::default(),
            persona_config(23),
        )
        .await;

        assert_eq!(report.status, SessionStatus::CircuitBroken);
        assert_eq!(report.actions_completed, 5);
        assert!(report.actions_completed < report.action_sequence.unwrap().len());
        assert!(mock.was_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn outer_timeout_returns_partial_progress() {
        let mock = Arc::new(MockDriver::new("https://example.com"));
        let guard = DriverGuard::new(mock.clone());
        let mut config = persona_config(5);
        config.session_timeout = Duration::from_secs(3);

        let report = run_session(
            guard,
            Arc::new(TokioClock),
            ExecutorConfig::default(),
            config,
        )
        .await;

        assert_eq!(report.status, SessionStatus::TimedOut);
        assert!(report.timed_out);
        let planned = report.action_sequence.as_ref().unwrap().len();
        assert!(report.actions_completed < planned);
        assert!(mock.was_closed());
    }

    #[tokio::test]
    async fn scripted_session_reports_step_results() {
        let mock = Arc::new(MockDriver::new("https://example.com"));
        let guard = DriverGuard::new(mock.clone());
        let spec = SequenceSpec {
            description: "poke around".to_string(),
            temperature: 0.0,
            chaos_range: [0.0, 0.0],
            actions: (0..3)
                .map(|i| crate::sequence::ScriptedAction {
                    kind: "click".to_string(),
                    selector: Some(format!("#b{}", i)),
                    text: None,
                    value: None,
                })
                .collect(),
        };
        let config = SessionConfig::new(
            "https://example.com",
            "Meeple-script".to_string(),
            Behavior::Sequence {
                name: "poke".to_string(),
                spec,
            },
            9,
        );

        let report = run_session(guard, Arc::new(NullClock), ExecutorConfig::default(), config)
            .await;

        assert_eq!(report.sequence.as_deref(), Some("poke"));
        assert_eq!(report.action_results.unwrap().len(), 3);
        assert_eq!(report.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn scripted_session_closes_extra_tabs() {
        let mock = Arc::new(MockDriver::new("https://example.com"));
        mock.set_tab_count(3);
        mock.stage_eval("!!document.querySelector", serde_json::json!(true));
        mock.stage_eval(
            "scrollIntoView",
            serde_json::json!({ "found": true, "x": 40.0, "y": 60.0, "width": 120.0, "height": 40.0 }),
        );
        let guard = DriverGuard::new(mock.clone());
        let spec = SequenceSpec {
            description: "tab spawner".to_string(),
            temperature: 10.0,
            chaos_range: [10.0, 10.0],
            actions: vec![crate::sequence::ScriptedAction {
                kind: "click".to_string(),
                selector: Some("#open".to_string()),
                text: None,
                value: None,
            }],
        };
        let config = SessionConfig::new(
            "https://example.com",
            "Meeple-tabs".to_string(),
            Behavior::Sequence {
                name: "tabs".to_string(),
                spec,
            },
            6,
        );

        let report = run_session(guard, Arc::new(NullClock), ExecutorConfig::default(), config)
            .await;

        assert_eq!(report.status, SessionStatus::Completed);
        assert_eq!(mock.open_tab_count().await.unwrap(), 1);
        assert!(mock.call_count("close_tabs") >= 1);
    }

    #[tokio::test]
    async fn unreachable_page_is_reported_not_panicked() {
        let mock = Arc::new(MockDriver::new("https://example.com"));
        mock.fail_actions(true);
        let guard = DriverGuard::new(mock.clone());

        let report = run_session(
            guard,
            Arc::new(NullClock),
            ExecutorConfig::default(),
            persona_config(2),
        )
        .await;

        assert_eq!(report.status, SessionStatus::Crashed);
        assert!(report.error.is_some());
        assert!(mock.was_closed());
        // All three navigation attempts were made
        assert_eq!(mock.call_count("navigate"), 3);
    }
}
