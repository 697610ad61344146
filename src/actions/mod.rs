//! Action executor
//!
//! Turns abstract action kinds into concrete driver calls: planned mouse
//! motion, fuzzed clicks, smooth scrolls, hover dwells, humanized typing.
//! One executor per session; it owns the session's cursor position and
//! its share of the seeded RNG stream.

use std::collections::VecDeque;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::driver::{BrowserDriver, ClickOptions, ElementInfo};
use crate::error::EngineError;
use crate::hotzone::{HotZone, Viewport};
use crate::motion::plan_motion;
use crate::persona::ActionKind;

/// Tunable behavior knobs, all probabilities unless noted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutorConfig {
    /// Click lands within this fraction of the target's dimensions
    pub click_fuzz: f64,
    /// Chance a click targets a ranked hot zone instead of a raw query
    pub hotzone_click_bias: f64,
    /// Chance a scroll aims at real off-screen content
    pub scroll_target_bias: f64,
    /// Chance a scroll goes down rather than up
    pub scroll_down_bias: f64,
    /// Per-character typo probability while typing
    pub typo_rate: f64,
    /// Chance a filled form gets submitted
    pub submit_chance: f64,
    /// Chance back/forward actually navigates when history allows it
    pub history_nav_chance: f64,
    /// Chance a click is followed by 1-2 quick repeat clicks
    pub double_click_chance: f64,
    /// Chance a hover returns to a previously visited spot
    pub hover_revisit_chance: f64,
    /// Chance a hover targets a ranked hot zone instead of open page area
    pub hotzone_hover_bias: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            click_fuzz: 0.25,
            hotzone_click_bias: 0.8,
            scroll_target_bias: 0.7,
            scroll_down_bias: 0.8,
            typo_rate: 0.05,
            submit_chance: 0.3,
            history_nav_chance: 0.7,
            double_click_chance: 0.25,
            hover_revisit_chance: 0.25,
            hotzone_hover_bias: 0.75,
        }
    }
}

// Ordered fallback groups for click targeting when no zones are ranked
const CLICK_FALLBACK_SELECTORS: &[&str] = &[
    "[class*='cta'], [class*='btn'], button[type='submit']",
    "button, [role='button'], input[type='submit']",
    "nav a, header a",
    "a[href]",
    "h1, h2, h3",
];

/// Finds real content below (or above) the fold and reports how far to
/// scroll to bring it into view.
const SCROLL_TARGET_SCRIPT: &str = r#"
(() => {
  const vh = window.innerHeight;
  const down = __DOWN__;
  const els = document.querySelectorAll('p, h2, h3, img, section, article, li');
  for (const el of els) {
    const r = el.getBoundingClientRect();
    if (r.height < 20) continue;
    if (down && r.top > vh && r.top < vh * 3) {
      return { found: true, delta: r.top - vh * 0.3 };
    }
    if (!down && r.bottom < 0 && r.bottom > -vh * 3) {
      return { found: true, delta: r.bottom - vh * 0.7 };
    }
  }
  return { found: false, delta: 0 };
})()
"#;

const FORM_CONTROLS_SCRIPT: &str = r#"
(() => {
  const out = [];
  const els = document.querySelectorAll('input, textarea, select');
  for (const el of els) {
    const r = el.getBoundingClientRect();
    if (r.width <= 0 || r.height <= 0) continue;
    if (r.bottom < 0 || r.top > window.innerHeight) continue;
    const type = el.tagName === 'SELECT' ? 'select'
      : el.tagName === 'TEXTAREA' ? 'text'
      : (el.type || 'text');
    if (['hidden', 'file', 'image'].includes(type)) continue;
    out.push({ x: r.left, y: r.top, width: r.width, height: r.height, kind: type });
    if (out.length >= 12) break;
  }
  return out;
})()
"#;

/// Resolves a selector to a viewport rect, scrolling it into view first.
/// The selector arrives base64-encoded so arbitrary quoting survives
/// embedding in the script source.
const RESOLVE_SELECTOR_SCRIPT: &str = r#"
(() => {
  const el = document.querySelector(atob('__SEL__'));
  if (!el) return { found: false };
  el.scrollIntoView({ block: 'center', behavior: 'instant' });
  const r = el.getBoundingClientRect();
  return { found: true, x: r.left, y: r.top, width: r.width, height: r.height };
})()
"#;

const SET_SELECT_VALUE_SCRIPT: &str = r#"
(() => {
  const el = document.querySelector(atob('__SEL__'));
  if (!el) return { found: false };
  el.value = atob('__VAL__');
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return { found: true };
})()
"#;

#[derive(Debug, Deserialize)]
struct ScrollTarget {
    found: bool,
    #[serde(default)]
    delta: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct FormControl {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ResolvedRect {
    found: bool,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}

const SAMPLE_WORDS: &[&str] = &[
    "hello", "thanks", "info", "question", "test", "please", "update", "check", "review", "note",
];

pub struct ActionExecutor {
    driver: Arc<dyn BrowserDriver>,
    clock: Arc<dyn Clock>,
    config: ExecutorConfig,
    rng: StdRng,
    /// Persona dwell multiplier
    engagement: f64,
    viewport: Viewport,
    cursor: (f64, f64),
    hover_history: VecDeque<(f64, f64)>,
}

impl ActionExecutor {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        clock: Arc<dyn Clock>,
        config: ExecutorConfig,
        engagement: f64,
        rng: StdRng,
    ) -> Self {
        Self {
            driver,
            clock,
            config,
            rng,
            engagement,
            viewport: Viewport::default(),
            cursor: (40.0, 40.0),
            hover_history: VecDeque::with_capacity(10),
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn cursor(&self) -> (f64, f64) {
        self.cursor
    }

    /// Run one action against the page. Failures are logged and reported
    /// as `false`; the session's circuit breaker decides what to do with
    /// a streak of them.
    pub async fn execute(&mut self, kind: ActionKind, zones: &[HotZone]) -> bool {
        let result = match kind {
            ActionKind::Click => self.do_click(zones).await,
            ActionKind::Scroll => self.do_scroll().await,
            ActionKind::Mouse => self.do_mouse_drift().await,
            ActionKind::Hover => self.do_hover(zones).await,
            ActionKind::Wait => self.do_wait().await,
            ActionKind::Form => self.do_form().await,
            ActionKind::Back => self.do_history(kind).await,
            ActionKind::Forward => self.do_history(kind).await,
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Action {} failed: {}", kind, e);
                false
            }
        }
    }

    // ========== Mouse movement ==========

    async fn walk_to(&mut self, target: (f64, f64), target_size: f64) -> Result<(), EngineError> {
        let path = plan_motion(self.cursor, target, target_size, &mut self.rng);
        let mut last_offset = 0.0;
        for point in &path {
            self.driver.move_mouse_to(point.x, point.y).await?;
            let dt = (point.timing_offset_ms - last_offset).max(0.0);
            last_offset = point.timing_offset_ms;
            self.clock
                .sleep(std::time::Duration::from_millis(dt as u64))
                .await;
        }
        if let Some(last) = path.last() {
            self.cursor = (last.x, last.y);
        }
        Ok(())
    }

    /// Fuzzed point inside a rect, biased toward the center
    fn fuzzed_point(&mut self, x: f64, y: f64, w: f64, h: f64) -> (f64, f64) {
        let fx = w * self.config.click_fuzz;
        let fy = h * self.config.click_fuzz;
        (
            x + w / 2.0 + self.rng.gen_range(-fx..=fx.max(0.001)),
            y + h / 2.0 + self.rng.gen_range(-fy..=fy.max(0.001)),
        )
    }

    async fn move_and_click(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<(), EngineError> {
        let point = self.fuzzed_point(x, y, w, h);
        self.walk_to(point, w.min(h).max(4.0)).await?;
        let delay = self.rng.gen_range(40..110);
        self.driver
            .click(
                point.0,
                point.1,
                ClickOptions {
                    delay_ms: delay,
                    ..Default::default()
                },
            )
            .await?;

        if self.rng.gen_bool(self.config.double_click_chance) {
            let extra = self.rng.gen_range(1..=2);
            for _ in 0..extra {
                let pause = self.rng.gen_range(120..400);
                self.sleep_ms(pause).await;
                self.driver
                    .click(point.0, point.1, ClickOptions::default())
                    .await?;
            }
        }
        Ok(())
    }

    // ========== Click ==========

    async fn do_click(&mut self, zones: &[HotZone]) -> Result<(), EngineError> {
        if !zones.is_empty() && self.rng.gen_bool(self.config.hotzone_click_bias) {
            let zone = self.pick_zone(zones).clone();
            debug!("Clicking hot zone <{}> '{}'", zone.tag, zone.text);
            return self
                .move_and_click(zone.x, zone.y, zone.width, zone.height)
                .await;
        }

        for selectors in CLICK_FALLBACK_SELECTORS {
            let elements = self.driver.query_visible_elements(selectors).await?;
            if let Some(el) = self.pick_element(&elements) {
                let r = el.rect;
                return self.move_and_click(r.x, r.y, r.width, r.height).await;
            }
        }
        Err(EngineError::ElementNotFound(
            "no clickable element on page".to_string(),
        ))
    }

    /// Priority-score weighted draw over the zone list
    fn pick_zone<'a>(&mut self, zones: &'a [HotZone]) -> &'a HotZone {
        let total: f64 = zones.iter().map(|z| z.priority_score.max(0.1)).sum();
        let mut roll = self.rng.gen_range(0.0..total);
        for zone in zones {
            let w = zone.priority_score.max(0.1);
            if roll < w {
                return zone;
            }
            roll -= w;
        }
        &zones[zones.len() - 1]
    }

    fn pick_element<'a>(&mut self, elements: &'a [ElementInfo]) -> Option<&'a ElementInfo> {
        if elements.is_empty() {
            return None;
        }
        Some(&elements[self.rng.gen_range(0..elements.len())])
    }

    // ========== Scroll ==========

    async fn do_scroll(&mut self) -> Result<(), EngineError> {
        let down = self.rng.gen_bool(self.config.scroll_down_bias);
        let mut delta = None;

        if self.rng.gen_bool(self.config.scroll_target_bias) {
            let script = SCROLL_TARGET_SCRIPT.replace("__DOWN__", if down { "true" } else { "false" });
            let raw = self.driver.evaluate(&script).await?;
            if let Ok(target) = serde_json::from_value::<ScrollTarget>(raw) {
                if target.found {
                    delta = Some(target.delta);
                }
            }
        }

        let delta = delta.unwrap_or_else(|| {
            let magnitude = self.viewport.height * self.rng.gen_range(0.3..1.0);
            if down {
                magnitude
            } else {
                -magnitude
            }
        });
        // Clamp so one scroll never jumps more than two screens
        let delta = delta.clamp(-self.viewport.height * 2.0, self.viewport.height * 2.0);

        self.driver
            .evaluate(&format!(
                "window.scrollBy({{ top: {:.0}, behavior: 'smooth' }})",
                delta
            ))
            .await?;
        let settle = self.rng.gen_range(400..1100);
        self.sleep_ms(settle).await;
        Ok(())
    }

    // ========== Hover ==========

    async fn do_hover(&mut self, zones: &[HotZone]) -> Result<(), EngineError> {
        let revisit = !self.hover_history.is_empty()
            && self.rng.gen_bool(self.config.hover_revisit_chance);

        let (point, size) = if revisit {
            let idx = self.rng.gen_range(0..self.hover_history.len());
            (self.hover_history[idx], 30.0)
        } else if !zones.is_empty() && self.rng.gen_bool(self.config.hotzone_hover_bias) {
            let zone = self.pick_zone(zones).clone();
            (
                (zone.center_x, zone.center_y),
                zone.width.min(zone.height).max(10.0),
            )
        } else {
            (
                (
                    self.rng.gen_range(0.15..0.85) * self.viewport.width,
                    self.rng.gen_range(0.15..0.75) * self.viewport.height,
                ),
                40.0,
            )
        };

        self.walk_to(point, size).await?;

        // Dwell scales with the persona's engagement; micro-movements
        // imitate reading around the spot
        let dwell = (self.rng.gen_range(500.0..1800.0) * self.engagement) as u64;
        let wiggles = self.rng.gen_range(1..=3);
        let slice = dwell / (wiggles + 1);
        for _ in 0..wiggles {
            self.sleep_ms(slice).await;
            let jx = self.cursor.0 + self.rng.gen_range(-12.0..12.0);
            let jy = self.cursor.1 + self.rng.gen_range(-8.0..8.0);
            self.driver.move_mouse_to(jx, jy).await?;
            self.cursor = (jx, jy);
        }
        self.sleep_ms(slice).await;

        if self.hover_history.len() == 10 {
            self.hover_history.pop_front();
        }
        self.hover_history.push_back(self.cursor);
        Ok(())
    }

    // ========== Idle mouse drift ==========

    async fn do_mouse_drift(&mut self) -> Result<(), EngineError> {
        let target = (
            self.rng.gen_range(0.05..0.95) * self.viewport.width,
            self.rng.gen_range(0.05..0.95) * self.viewport.height,
        );
        self.walk_to(target, 60.0).await
    }

    // ========== Wait ==========

    async fn do_wait(&mut self) -> Result<(), EngineError> {
        // Ping the page first so an idle step still notices a dead driver
        self.driver.evaluate("document.readyState").await?;
        let ms = self.rng.gen_range(800..2600);
        self.sleep_ms(ms).await;
        Ok(())
    }

    // ========== Form interaction ==========

    async fn do_form(&mut self) -> Result<(), EngineError> {
        let raw = self.driver.evaluate(FORM_CONTROLS_SCRIPT).await?;
        let controls: Vec<FormControl> = serde_json::from_value(raw).unwrap_or_default();
        if controls.is_empty() {
            // No form on screen; degrade to a short idle
            return self.do_wait().await;
        }

        let control = controls[self.rng.gen_range(0..controls.len())].clone();
        match control.kind.as_str() {
            "radio" => {
                // Flip between the group's options before settling on one
                let radios: Vec<FormControl> = controls
                    .into_iter()
                    .filter(|c| c.kind == "radio")
                    .collect();
                let picks = self.rng.gen_range(1..=3);
                for _ in 0..picks {
                    let r = radios[self.rng.gen_range(0..radios.len())].clone();
                    self.move_and_click(r.x, r.y, r.width, r.height).await?;
                    let pause = self.rng.gen_range(250..700);
                    self.sleep_ms(pause).await;
                }
            }
            "checkbox" => {
                self.move_and_click(control.x, control.y, control.width, control.height)
                    .await?;
            }
            "select" => {
                self.move_and_click(control.x, control.y, control.width, control.height)
                    .await?;
                self.driver.press_key("ArrowDown").await?;
                let pause = self.rng.gen_range(150..400);
                self.sleep_ms(pause).await;
                self.driver.press_key("Enter").await?;
            }
            _ => {
                self.move_and_click(control.x, control.y, control.width, control.height)
                    .await?;
                let words = self.rng.gen_range(1..=3);
                let text = (0..words)
                    .map(|_| SAMPLE_WORDS[self.rng.gen_range(0..SAMPLE_WORDS.len())])
                    .collect::<Vec<_>>()
                    .join(" ");
                self.type_humanized(&text).await?;
            }
        }

        if self.rng.gen_bool(self.config.submit_chance) {
            self.driver.press_key("Enter").await?;
        }
        Ok(())
    }

    /// Type text one character at a time with variable cadence and
    /// occasional typo-plus-backspace corrections.
    pub async fn type_humanized(&mut self, text: &str) -> Result<(), EngineError> {
        for ch in text.chars() {
            if ch.is_ascii_alphabetic() && self.rng.gen_bool(self.config.typo_rate) {
                let wrong = (b'a' + self.rng.gen_range(0..26u8)) as char;
                self.driver
                    .type_text(&wrong.to_string(), self.rng.gen_range(40..120))
                    .await?;
                let pause = self.rng.gen_range(120..350);
                self.sleep_ms(pause).await;
                self.driver.press_key("Backspace").await?;
            }
            self.driver
                .type_text(&ch.to_string(), self.rng.gen_range(40..140))
                .await?;
        }
        Ok(())
    }

    // ========== History navigation ==========

    async fn do_history(&mut self, kind: ActionKind) -> Result<(), EngineError> {
        if self.driver.history_length().await? <= 1 {
            return Ok(());
        }
        if !self.rng.gen_bool(self.config.history_nav_chance) {
            return Ok(());
        }
        match kind {
            ActionKind::Back => self.driver.go_back().await?,
            _ => self.driver.go_forward().await?,
        }
        let settle = self.rng.gen_range(600..1500);
        self.sleep_ms(settle).await;
        Ok(())
    }

    // ========== Scripted steps ==========

    async fn resolve_selector(&mut self, selector: &str) -> Result<ResolvedRect, EngineError> {
        let script = RESOLVE_SELECTOR_SCRIPT.replace("__SEL__", &BASE64.encode(selector));
        let raw = self.driver.evaluate(&script).await?;
        let rect: ResolvedRect = serde_json::from_value(raw)
            .map_err(|e| EngineError::EvaluateFailed(format!("resolve {}: {}", selector, e)))?;
        if !rect.found {
            return Err(EngineError::ElementNotFound(selector.to_string()));
        }
        Ok(rect)
    }

    pub async fn scripted_click(&mut self, selector: &str) -> Result<(), EngineError> {
        let r = self.resolve_selector(selector).await?;
        self.move_and_click(r.x, r.y, r.width, r.height).await
    }

    pub async fn scripted_type(&mut self, selector: &str, text: &str) -> Result<(), EngineError> {
        let r = self.resolve_selector(selector).await?;
        self.move_and_click(r.x, r.y, r.width, r.height).await?;
        self.type_humanized(text).await
    }

    pub async fn scripted_select(&mut self, selector: &str, value: &str) -> Result<(), EngineError> {
        let r = self.resolve_selector(selector).await?;
        self.move_and_click(r.x, r.y, r.width, r.height).await?;
        let script = SET_SELECT_VALUE_SCRIPT
            .replace("__SEL__", &BASE64.encode(selector))
            .replace("__VAL__", &BASE64.encode(value));
        let raw = self.driver.evaluate(&script).await?;
        let done: ResolvedRect = serde_json::from_value(raw).unwrap_or(ResolvedRect {
            found: false,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        });
        if !done.found {
            return Err(EngineError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    pub async fn scripted_hover(&mut self, selector: &str) -> Result<(), EngineError> {
        let r = self.resolve_selector(selector).await?;
        let center = (r.x + r.width / 2.0, r.y + r.height / 2.0);
        self.walk_to(center, r.width.min(r.height).max(10.0)).await?;
        let dwell = self.rng.gen_range(400..1200);
        self.sleep_ms(dwell).await;
        Ok(())
    }

    pub async fn scripted_scroll(&mut self, selector: &str) -> Result<(), EngineError> {
        // Resolution already scrolls the element into view
        self.resolve_selector(selector).await?;
        let settle = self.rng.gen_range(300..800);
        self.sleep_ms(settle).await;
        Ok(())
    }

    async fn sleep_ms(&self, ms: u64) {
        self.clock
            .sleep(std::time::Duration::from_millis(ms))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::NullClock;
    use crate::driver::mock::MockDriver;
    use crate::driver::ElementRect;
    use rand::SeedableRng;
    use serde_json::json;

    fn executor(driver: Arc<MockDriver>, config: ExecutorConfig) -> ActionExecutor {
        ActionExecutor::new(
            driver,
            Arc::new(NullClock),
            config,
            1.0,
            StdRng::seed_from_u64(77),
        )
    }

    fn one_zone() -> Vec<HotZone> {
        vec![HotZone {
            x: 100.0,
            y: 100.0,
            width: 160.0,
            height: 48.0,
            center_x: 180.0,
            center_y: 124.0,
            tag: "button".to_string(),
            text: "Sign up".to_string(),
            aria_role: String::new(),
            aria_label: String::new(),
            href: None,
            priority_score: 14.0,
        }]
    }

    #[tokio::test]
    async fn click_prefers_zones_when_biased() {
        let driver = Arc::new(MockDriver::new("https://example.com"));
        let config = ExecutorConfig {
            hotzone_click_bias: 1.0,
            double_click_chance: 0.0,
            ..Default::default()
        };
        let mut ex = executor(driver.clone(), config);
        assert!(ex.execute(ActionKind::Click, &one_zone()).await);
        assert_eq!(driver.call_count("query"), 0);
        assert_eq!(driver.call_count("click"), 1);
        assert!(driver.call_count("move") > 1, "expected a walked path");
    }

    #[tokio::test]
    async fn click_falls_back_to_selector_query() {
        let driver = Arc::new(MockDriver::new("https://example.com"));
        driver.set_visible_elements(vec![ElementInfo {
            rect: ElementRect {
                x: 50.0,
                y: 60.0,
                width: 120.0,
                height: 40.0,
            },
            tag: "button".to_string(),
            ..Default::default()
        }]);
        let config = ExecutorConfig {
            double_click_chance: 0.0,
            ..Default::default()
        };
        let mut ex = executor(driver.clone(), config);
        assert!(ex.execute(ActionKind::Click, &[]).await);
        assert!(driver.call_count("query") >= 1);
        assert_eq!(driver.call_count("click"), 1);
    }

    #[tokio::test]
    async fn failed_driver_reports_action_failure() {
        let driver = Arc::new(MockDriver::new("https://example.com"));
        driver.fail_actions(true);
        let mut ex = executor(driver.clone(), ExecutorConfig::default());
        assert!(!ex.execute(ActionKind::Click, &one_zone()).await);
    }

    #[tokio::test]
    async fn typos_are_corrected_with_backspace() {
        let driver = Arc::new(MockDriver::new("https://example.com"));
        let config = ExecutorConfig {
            typo_rate: 1.0,
            ..Default::default()
        };
        let mut ex = executor(driver.clone(), config);
        ex.type_humanized("abc").await.unwrap();
        assert_eq!(driver.call_count("key Backspace"), 3);
        // 3 typos + 3 real characters
        assert_eq!(driver.call_count("type"), 6);
    }

    #[tokio::test]
    async fn back_is_skipped_with_empty_history() {
        let driver = Arc::new(MockDriver::new("https://example.com"));
        let config = ExecutorConfig {
            history_nav_chance: 1.0,
            ..Default::default()
        };
        let mut ex = executor(driver.clone(), config);
        assert!(ex.execute(ActionKind::Back, &[]).await);
        assert_eq!(driver.call_count("back"), 0);
    }

    #[tokio::test]
    async fn hover_sometimes_ignores_zones() {
        // Zone sits at the far right edge; the open-area fallback can
        // never reach that far, so the final cursor position tells which
        // branch ran.
        let zone = vec![HotZone {
            x: 1180.0,
            y: 600.0,
            width: 60.0,
            height: 40.0,
            center_x: 1210.0,
            center_y: 620.0,
            tag: "a".to_string(),
            text: "Careers".to_string(),
            aria_role: String::new(),
            aria_label: String::new(),
            href: None,
            priority_score: 9.0,
        }];

        let driver = Arc::new(MockDriver::new("https://example.com"));
        let config = ExecutorConfig {
            hover_revisit_chance: 0.0,
            hotzone_hover_bias: 1.0,
            ..Default::default()
        };
        let mut ex = executor(driver.clone(), config);
        assert!(ex.execute(ActionKind::Hover, &zone).await);
        assert!(ex.cursor().0 > 1150.0, "full bias should land on the zone");

        let driver = Arc::new(MockDriver::new("https://example.com"));
        let config = ExecutorConfig {
            hover_revisit_chance: 0.0,
            hotzone_hover_bias: 0.0,
            ..Default::default()
        };
        let mut ex = executor(driver.clone(), config);
        assert!(ex.execute(ActionKind::Hover, &zone).await);
        assert!(
            ex.cursor().0 < 1150.0,
            "zero bias should hover open page area"
        );
    }

    #[tokio::test]
    async fn form_fill_touches_one_control() {
        let driver = Arc::new(MockDriver::new("https://example.com"));
        driver.stage_eval(
            "input, textarea, select",
            json!([
                { "x": 100.0, "y": 100.0, "width": 200.0, "height": 32.0, "kind": "text" },
                { "x": 100.0, "y": 150.0, "width": 200.0, "height": 32.0, "kind": "text" },
                { "x": 100.0, "y": 200.0, "width": 200.0, "height": 32.0, "kind": "text" }
            ]),
        );
        let config = ExecutorConfig {
            typo_rate: 0.0,
            submit_chance: 0.0,
            double_click_chance: 0.0,
            ..Default::default()
        };
        let mut ex = executor(driver.clone(), config);
        assert!(ex.execute(ActionKind::Form, &[]).await);
        assert_eq!(driver.call_count("click"), 1);
        assert!(driver.call_count("type") >= 1);
    }

    #[tokio::test]
    async fn radio_groups_are_reconsidered_not_typed() {
        let driver = Arc::new(MockDriver::new("https://example.com"));
        driver.stage_eval(
            "input, textarea, select",
            json!([
                { "x": 100.0, "y": 100.0, "width": 20.0, "height": 20.0, "kind": "radio" },
                { "x": 100.0, "y": 130.0, "width": 20.0, "height": 20.0, "kind": "radio" },
                { "x": 100.0, "y": 160.0, "width": 20.0, "height": 20.0, "kind": "radio" }
            ]),
        );
        let config = ExecutorConfig {
            submit_chance: 0.0,
            double_click_chance: 0.0,
            ..Default::default()
        };
        let mut ex = executor(driver.clone(), config);
        assert!(ex.execute(ActionKind::Form, &[]).await);
        let clicks = driver.call_count("click");
        assert!((1..=3).contains(&clicks), "got {} radio clicks", clicks);
        assert_eq!(driver.call_count("type"), 0);
        assert_eq!(driver.call_count("key"), 0);
    }

    #[tokio::test]
    async fn scripted_click_errors_on_missing_element() {
        let driver = Arc::new(MockDriver::new("https://example.com"));
        driver.stage_eval("querySelector", json!({ "found": false }));
        let mut ex = executor(driver.clone(), ExecutorConfig::default());
        let err = ex.scripted_click("#missing").await.unwrap_err();
        assert!(matches!(err, EngineError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn scripted_type_clicks_then_types() {
        let driver = Arc::new(MockDriver::new("https://example.com"));
        driver.stage_eval(
            "querySelector",
            json!({ "found": true, "x": 10.0, "y": 20.0, "width": 200.0, "height": 32.0 }),
        );
        let config = ExecutorConfig {
            typo_rate: 0.0,
            double_click_chance: 0.0,
            ..Default::default()
        };
        let mut ex = executor(driver.clone(), config);
        ex.scripted_type("#email", "hi").await.unwrap();
        assert_eq!(driver.call_count("click"), 1);
        assert_eq!(driver.call_count("type"), 2);
    }
}
