//! Scripted sequence interpreter.
//!
//! Walks a validated [`SequenceSpec`] step by step, following the script
//! or improvising a random action depending on the effective temperature
//! drawn for this session.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::spec::{ScriptedAction, ScriptedKind, SequenceSpec};
use crate::actions::ActionExecutor;
use crate::clock::Clock;
use crate::driver::BrowserDriver;
use crate::error::EngineError;
use crate::hotzone::{HotZone, HotZoneAnalyzer};
use crate::persona::ActionKind;
use crate::session::NavigationMonitor;

/// Consecutive step failures before the rest of the script is abandoned
const MAX_CONSECUTIVE_STEP_FAILURES: usize = 3;
/// Selector wait: total window and poll interval, with one retry
const SELECTOR_WAIT_MS: u64 = 5_000;
const SELECTOR_POLL_MS: u64 = 250;

/// Outcome of one interpreted step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub index: usize,
    pub kind: String,
    /// Whether the script was followed or a random action ran instead
    pub scripted: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub struct SequenceInterpreter {
    spec: SequenceSpec,
    effective_temperature: f64,
}

impl SequenceInterpreter {
    /// Bind a spec to this session, drawing its chaos multiplier once.
    pub fn new(spec: SequenceSpec, rng: &mut StdRng) -> Self {
        let chaos = rng.gen_range(spec.chaos_range[0]..=spec.chaos_range[1]);
        let effective_temperature = (spec.temperature * chaos / 10.0).clamp(0.0, 10.0);
        Self {
            spec,
            effective_temperature,
        }
    }

    /// 0 = every step improvises, 10 = every step follows the script
    pub fn effective_temperature(&self) -> f64 {
        self.effective_temperature
    }

    /// Execute the whole script. Never errors; every step resolves to a
    /// [`StepResult`] and a failure streak cuts the run short. The
    /// monitor runs before each step and every step is bounded by the
    /// session's per-action timeout.
    pub async fn run(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        executor: &mut ActionExecutor,
        monitor: &NavigationMonitor,
        action_timeout: Duration,
        clock: &Arc<dyn Clock>,
        rng: &mut StdRng,
    ) -> Vec<StepResult> {
        let mut results = Vec::with_capacity(self.spec.actions.len());
        let mut consecutive_failures = 0usize;

        let mut zones = Self::snapshot_zones(driver.as_ref()).await;
        let mut last_url = driver.as_ref().current_url().await.unwrap_or_default();

        for (index, action) in self.spec.actions.iter().enumerate() {
            match monitor.check(driver.as_ref()).await {
                Ok(true) => zones = Self::snapshot_zones(driver.as_ref()).await,
                Ok(false) => {}
                Err(e) => warn!("Navigation check failed: {}", e),
            }

            let roll = rng.gen_range(0.0..10.0);
            let scripted = roll < self.effective_temperature;
            let improvised = if scripted {
                None
            } else {
                Some(ActionKind::random(rng))
            };
            let kind_label = improvised
                .map(|k| k.as_str().to_string())
                .unwrap_or_else(|| action.kind.clone());

            let step = async {
                if let Some(kind) = improvised {
                    let success = executor.execute(kind, &zones).await;
                    StepResult {
                        index,
                        kind: kind.as_str().to_string(),
                        scripted: false,
                        success,
                        detail: None,
                    }
                } else {
                    match self.run_scripted(action, driver, executor, clock).await {
                        Ok(()) => StepResult {
                            index,
                            kind: action.kind.clone(),
                            scripted: true,
                            success: true,
                            detail: None,
                        },
                        Err(e) => StepResult {
                            index,
                            kind: action.kind.clone(),
                            scripted: true,
                            success: false,
                            detail: Some(e.to_string()),
                        },
                    }
                }
            };
            let result = match tokio::time::timeout(action_timeout, step).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Step {} ({}) timed out", index, kind_label);
                    StepResult {
                        index,
                        kind: kind_label,
                        scripted,
                        success: false,
                        detail: Some("timed out".to_string()),
                    }
                }
            };

            if result.success {
                consecutive_failures = 0;
            } else {
                consecutive_failures += 1;
            }
            results.push(result);

            if consecutive_failures >= MAX_CONSECUTIVE_STEP_FAILURES {
                warn!(
                    "Abandoning script after {} consecutive step failures",
                    consecutive_failures
                );
                break;
            }

            // Navigation invalidates the zone snapshot
            if let Ok(url) = driver.as_ref().current_url().await {
                if url != last_url {
                    debug!("URL changed to {}, re-ranking zones", url);
                    zones = Self::snapshot_zones(driver.as_ref()).await;
                    last_url = url;
                }
            }

            // Pacing between steps, with an occasional idle flourish
            clock
                .sleep(std::time::Duration::from_millis(rng.gen_range(500..2000)))
                .await;
            if rng.gen_bool(0.3) {
                let filler = if rng.gen_bool(0.5) {
                    ActionKind::Hover
                } else {
                    ActionKind::Mouse
                };
                let _ =
                    tokio::time::timeout(action_timeout, executor.execute(filler, &zones)).await;
            }
        }

        info!(
            "Script '{}' finished: {}/{} steps succeeded",
            self.spec.description,
            results.iter().filter(|r| r.success).count(),
            results.len()
        );
        results
    }

    async fn snapshot_zones(driver: &dyn BrowserDriver) -> Vec<HotZone> {
        match HotZoneAnalyzer::snapshot(driver).await {
            Ok(snap) => snap.zones,
            Err(e) => {
                warn!("Zone snapshot failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn run_scripted(
        &self,
        action: &ScriptedAction,
        driver: &Arc<dyn BrowserDriver>,
        executor: &mut ActionExecutor,
        clock: &Arc<dyn Clock>,
    ) -> Result<(), EngineError> {
        // Kind validity was established at admission
        let kind: ScriptedKind = action
            .kind
            .parse()
            .map_err(|_| EngineError::InvalidSequence(format!("kind '{}'", action.kind)))?;

        if kind == ScriptedKind::Wait {
            clock.sleep(std::time::Duration::from_millis(1_500)).await;
            return Ok(());
        }

        let selector = action
            .selector
            .as_deref()
            .ok_or_else(|| EngineError::InvalidSequence("missing selector".to_string()))?;

        if !wait_for_selector(driver.as_ref(), clock.as_ref(), selector).await? {
            return Err(EngineError::ElementNotFound(selector.to_string()));
        }

        match kind {
            ScriptedKind::Click => executor.scripted_click(selector).await,
            ScriptedKind::Type => {
                let text = action
                    .text
                    .as_deref()
                    .ok_or_else(|| EngineError::InvalidSequence("missing text".to_string()))?;
                executor.scripted_type(selector, text).await
            }
            ScriptedKind::Select => {
                let value = action
                    .value
                    .as_deref()
                    .ok_or_else(|| EngineError::InvalidSequence("missing value".to_string()))?;
                executor.scripted_select(selector, value).await
            }
            ScriptedKind::Hover => executor.scripted_hover(selector).await,
            ScriptedKind::Scroll => executor.scripted_scroll(selector).await,
            ScriptedKind::Wait => unreachable!("handled above"),
        }
    }
}

/// Poll for a selector within a bounded window; one full retry before
/// giving up. Driver errors propagate, absence does not.
async fn wait_for_selector(
    driver: &dyn BrowserDriver,
    clock: &dyn Clock,
    selector: &str,
) -> Result<bool, EngineError> {
    let script = format!(
        "(() => !!document.querySelector(atob('{}')))()",
        BASE64.encode(selector)
    );
    for attempt in 0..2 {
        let mut waited = 0;
        while waited < SELECTOR_WAIT_MS {
            if driver.evaluate(&script).await?.as_bool() == Some(true) {
                return Ok(true);
            }
            clock
                .sleep(std::time::Duration::from_millis(SELECTOR_POLL_MS))
                .await;
            waited += SELECTOR_POLL_MS;
        }
        if attempt == 0 {
            debug!("Selector '{}' not found, retrying once", selector);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ExecutorConfig;
    use crate::clock::{NullClock, TokioClock};
    use crate::driver::mock::MockDriver;
    use rand::SeedableRng;
    use serde_json::json;

    const TEST_TIMEOUT: Duration = Duration::from_secs(30);

    fn monitor() -> NavigationMonitor {
        NavigationMonitor::new("https://example.com").unwrap()
    }

    fn spec(temperature: f64, chaos: [f64; 2], steps: usize) -> SequenceSpec {
        SequenceSpec {
            description: "signup flow".to_string(),
            temperature,
            chaos_range: chaos,
            actions: (0..steps)
                .map(|i| ScriptedAction {
                    kind: "click".to_string(),
                    selector: Some(format!("#step-{}", i)),
                    text: None,
                    value: None,
                })
                .collect(),
        }
    }

    fn executor(driver: Arc<MockDriver>) -> ActionExecutor {
        ActionExecutor::new(
            driver,
            Arc::new(NullClock),
            ExecutorConfig {
                double_click_chance: 0.0,
                ..Default::default()
            },
            1.0,
            StdRng::seed_from_u64(3),
        )
    }

    #[test]
    fn temperature_extremes_pin_effective_temperature() {
        let mut rng = StdRng::seed_from_u64(1);
        let hot = SequenceInterpreter::new(spec(10.0, [10.0, 10.0], 1), &mut rng);
        assert_eq!(hot.effective_temperature(), 10.0);

        let cold = SequenceInterpreter::new(spec(0.0, [0.0, 10.0], 1), &mut rng);
        assert_eq!(cold.effective_temperature(), 0.0);
    }

    #[tokio::test]
    async fn max_temperature_always_follows_script() {
        let mock = Arc::new(MockDriver::new("https://example.com"));
        mock.stage_eval("!!document.querySelector", json!(true));
        mock.stage_eval(
            "scrollIntoView",
            json!({ "found": true, "x": 10.0, "y": 20.0, "width": 100.0, "height": 30.0 }),
        );
        let driver: Arc<dyn BrowserDriver> = mock.clone();
        let clock: Arc<dyn Clock> = Arc::new(NullClock);

        let mut rng = StdRng::seed_from_u64(8);
        let interp = SequenceInterpreter::new(spec(10.0, [10.0, 10.0], 4), &mut rng);
        let mut ex = executor(mock.clone());
        let results = interp
            .run(&driver, &mut ex, &monitor(), TEST_TIMEOUT, &clock, &mut rng)
            .await;

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.scripted && r.success));
    }

    #[tokio::test]
    async fn zero_temperature_never_follows_script() {
        let mock = Arc::new(MockDriver::new("https://example.com"));
        let driver: Arc<dyn BrowserDriver> = mock.clone();
        let clock: Arc<dyn Clock> = Arc::new(NullClock);

        let mut rng = StdRng::seed_from_u64(13);
        let interp = SequenceInterpreter::new(spec(0.0, [5.0, 5.0], 5), &mut rng);
        let mut ex = executor(mock.clone());
        let results = interp
            .run(&driver, &mut ex, &monitor(), TEST_TIMEOUT, &clock, &mut rng)
            .await;

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| !r.scripted));
    }

    #[tokio::test]
    async fn three_consecutive_failures_abandon_the_script() {
        // No selector ever resolves, so every scripted step fails
        let mock = Arc::new(MockDriver::new("https://example.com"));
        let driver: Arc<dyn BrowserDriver> = mock.clone();
        let clock: Arc<dyn Clock> = Arc::new(NullClock);

        let mut rng = StdRng::seed_from_u64(4);
        let interp = SequenceInterpreter::new(spec(10.0, [10.0, 10.0], 8), &mut rng);
        let mut ex = executor(mock.clone());
        let results = interp
            .run(&driver, &mut ex, &monitor(), TEST_TIMEOUT, &clock, &mut rng)
            .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.success));
        assert!(results
            .iter()
            .all(|r| r.detail.as_deref().is_some_and(|d| d.contains("#step"))));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_step_is_cut_off_by_the_action_timeout() {
        // The selector never appears, so the scripted click would poll
        // for ~10s of virtual time; the per-action bound fires first.
        let mock = Arc::new(MockDriver::new("https://example.com"));
        let driver: Arc<dyn BrowserDriver> = mock.clone();
        let clock: Arc<dyn Clock> = Arc::new(TokioClock);

        let mut rng = StdRng::seed_from_u64(2);
        let interp = SequenceInterpreter::new(spec(10.0, [10.0, 10.0], 1), &mut rng);
        let mut ex = executor(mock.clone());
        let results = interp
            .run(
                &driver,
                &mut ex,
                &monitor(),
                Duration::from_secs(2),
                &clock,
                &mut rng,
            )
            .await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].detail.as_deref(), Some("timed out"));
    }
}
