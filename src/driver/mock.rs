//! Scriptable in-memory driver used by the test suite.
//!
//! Records every call, lets tests stage element lists and evaluate
//! results, and can be switched into a failing mode to exercise the
//! circuit-breaker and recovery paths.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{BrowserDriver, ClickOptions, ElementInfo};
use crate::error::EngineError;

type CloseHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct MockState {
    history: Vec<String>,
    history_index: usize,
    visible: Vec<ElementInfo>,
    /// (substring pattern, canned result) checked in order
    eval_rules: Vec<(String, Value)>,
    /// one-shot results consumed before rules
    eval_queue: VecDeque<Value>,
    calls: Vec<String>,
    tabs: usize,
}

pub struct MockDriver {
    state: Mutex<MockState>,
    fail_actions: AtomicBool,
    fail_exempt: Mutex<Vec<String>>,
    closed: AtomicBool,
    close_count: AtomicUsize,
    on_close: Mutex<Option<CloseHook>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

impl MockDriver {
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(MockState {
                history: vec![url.to_string()],
                history_index: 0,
                tabs: 1,
                ..Default::default()
            }),
            fail_actions: AtomicBool::new(false),
            fail_exempt: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
            on_close: Mutex::new(None),
        }
    }

    /// Stage the element list returned by `query_visible_elements`
    pub fn set_visible_elements(&self, elements: Vec<ElementInfo>) {
        self.state.lock().unwrap().visible = elements;
    }

    /// Stage a canned evaluate result for scripts containing `pattern`
    pub fn stage_eval(&self, pattern: &str, result: Value) {
        self.state
            .lock()
            .unwrap()
            .eval_rules
            .push((pattern.to_string(), result));
    }

    /// Queue a one-shot evaluate result (consumed before pattern rules)
    pub fn push_eval_result(&self, result: Value) {
        self.state.lock().unwrap().eval_queue.push_back(result);
    }

    /// Make every subsequent driver operation fail
    pub fn fail_actions(&self, fail: bool) {
        self.fail_actions.store(fail, Ordering::SeqCst);
    }

    /// Fail everything except the named operations (e.g. "navigate", "url")
    pub fn fail_actions_except(&self, exempt: &[&str]) {
        *self.fail_exempt.lock().unwrap() = exempt.iter().map(|s| s.to_string()).collect();
        self.fail_actions.store(true, Ordering::SeqCst);
    }

    /// Pretend the page opened extra tabs
    pub fn set_tab_count(&self, tabs: usize) {
        self.state.lock().unwrap().tabs = tabs;
    }

    /// Force the reported URL without touching history
    pub fn set_url(&self, url: &str) {
        let mut s = self.state.lock().unwrap();
        let idx = s.history_index;
        s.history[idx] = url.to_string();
    }

    /// Hook invoked once on close; used for concurrency accounting in tests
    pub fn set_on_close(&self, hook: CloseHook) {
        *self.on_close.lock().unwrap() = Some(hook);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn check_failure(&self, what: &str) -> Result<(), EngineError> {
        if self.fail_actions.load(Ordering::SeqCst)
            && !self.fail_exempt.lock().unwrap().iter().any(|e| e == what)
        {
            Err(EngineError::ConnectionLost(format!(
                "mock failure: {}",
                what
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<(), EngineError> {
        self.record(format!("navigate {}", url));
        self.check_failure("navigate")?;
        let mut s = self.state.lock().unwrap();
        let idx = s.history_index;
        s.history.truncate(idx + 1);
        s.history.push(url.to_string());
        s.history_index += 1;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, EngineError> {
        self.record("evaluate".to_string());
        self.check_failure("evaluate")?;
        let mut s = self.state.lock().unwrap();
        if let Some(v) = s.eval_queue.pop_front() {
            return Ok(v);
        }
        for (pattern, result) in &s.eval_rules {
            if script.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(Value::Null)
    }

    async fn query_visible_elements(
        &self,
        selectors: &str,
    ) -> Result<Vec<ElementInfo>, EngineError> {
        self.record(format!("query {}", selectors));
        self.check_failure("query")?;
        Ok(self.state.lock().unwrap().visible.clone())
    }

    async fn move_mouse_to(&self, x: f64, y: f64) -> Result<(), EngineError> {
        self.record(format!("move {:.0},{:.0}", x, y));
        self.check_failure("move")
    }

    async fn click(&self, x: f64, y: f64, _opts: ClickOptions) -> Result<(), EngineError> {
        self.record(format!("click {:.0},{:.0}", x, y));
        self.check_failure("click")
    }

    async fn type_text(&self, text: &str, _delay_per_char_ms: u64) -> Result<(), EngineError> {
        self.record(format!("type {}", text));
        self.check_failure("type")
    }

    async fn press_key(&self, key: &str) -> Result<(), EngineError> {
        self.record(format!("key {}", key));
        self.check_failure("key")
    }

    async fn go_back(&self) -> Result<(), EngineError> {
        self.record("back".to_string());
        self.check_failure("back")?;
        let mut s = self.state.lock().unwrap();
        if s.history_index > 0 {
            s.history_index -= 1;
        }
        Ok(())
    }

    async fn go_forward(&self) -> Result<(), EngineError> {
        self.record("forward".to_string());
        self.check_failure("forward")?;
        let mut s = self.state.lock().unwrap();
        if s.history_index + 1 < s.history.len() {
            s.history_index += 1;
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, EngineError> {
        self.check_failure("url")?;
        let s = self.state.lock().unwrap();
        Ok(s.history[s.history_index].clone())
    }

    async fn history_length(&self) -> Result<u32, EngineError> {
        self.check_failure("history")?;
        Ok(self.state.lock().unwrap().history.len() as u32)
    }

    async fn set_request_interception(
        &self,
        blocked_patterns: &[String],
    ) -> Result<(), EngineError> {
        self.record(format!("intercept {}", blocked_patterns.len()));
        Ok(())
    }

    async fn override_permissions(
        &self,
        origin: &str,
        _permissions: &[String],
    ) -> Result<(), EngineError> {
        self.record(format!("permissions {}", origin));
        Ok(())
    }

    async fn open_tab_count(&self) -> Result<usize, EngineError> {
        Ok(self.state.lock().unwrap().tabs)
    }

    async fn close_extra_tabs(&self) -> Result<usize, EngineError> {
        let mut s = self.state.lock().unwrap();
        let extra = s.tabs.saturating_sub(1);
        s.tabs = 1;
        if extra > 0 {
            s.calls.push(format!("close_tabs {}", extra));
        }
        Ok(extra)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.closed.store(true, Ordering::SeqCst);
        self.close_count.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_close.lock().unwrap().as_ref() {
            hook();
        }
        Ok(())
    }
}
