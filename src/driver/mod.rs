//! Browser driver abstraction
//!
//! The engine never talks to a concrete automation library. Everything it
//! needs from the browser is expressed here as an object-safe async trait;
//! adapters (CDP, WebDriver, ...) live outside the engine. Each session
//! owns exactly one driver instance for its whole lifetime.

mod guard;
pub mod mock;

pub use guard::DriverGuard;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Bounding rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    /// Center point of the rectangle
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A visible element as reported by the driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub rect: ElementRect,
    pub tag: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attrs: HashMap<String, String>,
}

/// Mouse button for click dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Options for a single click
#[derive(Debug, Clone, Copy)]
pub struct ClickOptions {
    /// Hold time between press and release, in milliseconds
    pub delay_ms: u64,
    pub button: MouseButton,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            delay_ms: 60,
            button: MouseButton::Left,
        }
    }
}

/// The capability surface the engine consumes.
///
/// All methods are suspension points; no call blocks the scheduler.
/// Errors are returned, never panicked, so the executor can convert
/// them into action failures.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate the single page to `url`
    async fn navigate(&self, url: &str) -> Result<(), EngineError>;

    /// Evaluate a script in the page, returning its JSON value
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, EngineError>;

    /// Query currently visible elements matching a selector list
    async fn query_visible_elements(
        &self,
        selectors: &str,
    ) -> Result<Vec<ElementInfo>, EngineError>;

    /// Dispatch a mouse-move to viewport coordinates
    async fn move_mouse_to(&self, x: f64, y: f64) -> Result<(), EngineError>;

    /// Dispatch press+release at viewport coordinates
    async fn click(&self, x: f64, y: f64, opts: ClickOptions) -> Result<(), EngineError>;

    /// Type text into the focused element with a per-character delay
    async fn type_text(&self, text: &str, delay_per_char_ms: u64) -> Result<(), EngineError>;

    /// Press a named key (e.g. "Enter", "Backspace")
    async fn press_key(&self, key: &str) -> Result<(), EngineError>;

    async fn go_back(&self) -> Result<(), EngineError>;

    async fn go_forward(&self) -> Result<(), EngineError>;

    /// Current top-level URL
    async fn current_url(&self) -> Result<String, EngineError>;

    /// Length of the session history (window.history.length)
    async fn history_length(&self) -> Result<u32, EngineError>;

    /// Enable request interception, dropping requests whose URL contains
    /// any of the given patterns
    async fn set_request_interception(&self, blocked_patterns: &[String])
        -> Result<(), EngineError>;

    /// Grant a set of permissions to an origin (geolocation, notifications, ...)
    async fn override_permissions(
        &self,
        origin: &str,
        permissions: &[String],
    ) -> Result<(), EngineError>;

    /// Number of currently open tabs
    async fn open_tab_count(&self) -> Result<usize, EngineError>;

    /// Close every tab except the first; returns how many were closed.
    /// Polled by the navigation monitor to keep the single-tab invariant.
    async fn close_extra_tabs(&self) -> Result<usize, EngineError>;

    /// Tear the browser down. Must be idempotent-safe at the adapter level.
    async fn close(&self) -> Result<(), EngineError>;
}
