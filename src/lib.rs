//! Meeple Engine
//!
//! Drives batches of human-like synthetic browser sessions ("meeples")
//! against a target URL to populate web-analytics pipelines with
//! believable traffic. Sessions follow either a randomized behavioral
//! persona or a scripted-but-randomized sequence, rendered through
//! planned mouse motion, fuzzed clicks, and humanized typing.

pub mod actions;
pub mod clock;
pub mod driver;
pub mod error;
pub mod hotzone;
pub mod motion;
pub mod orchestrator;
pub mod persona;
pub mod sequence;
pub mod session;
pub mod stats;

use std::path::PathBuf;

use tracing::{error, info, warn};

pub use actions::ExecutorConfig;
pub use clock::{Clock, NullClock, TokioClock};
pub use driver::{BrowserDriver, DriverGuard};
pub use error::EngineError;
pub use orchestrator::{
    run_job, validate_job, DriverFactory, JobOutcome, JobRequest, JobSummary, LaunchOptions,
};
pub use persona::{ActionKind, Persona, PERSONAS};
pub use sequence::{SequenceSpec, StepResult};
pub use session::{SessionReport, SessionStatus};
pub use stats::GlobalStats;

fn default_action_timeout_ms() -> u64 {
    30_000
}
fn default_session_timeout_ms() -> u64 {
    600_000
}
fn default_max_consecutive_failures() -> usize {
    5
}

/// Engine configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Behavior knobs shared by every session's executor
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Bound on any single action
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
    /// Bound on a whole session
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    /// Consecutive action failures before a session circuit-breaks
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: usize,

    /// Request URL substrings blocked when a job asks for interception
    /// (heavy media and ad exchanges that slow sessions down without
    /// feeding the analytics under test)
    #[serde(default)]
    pub blocked_url_patterns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorConfig::default(),
            action_timeout_ms: default_action_timeout_ms(),
            session_timeout_ms: default_session_timeout_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
            blocked_url_patterns: vec![
                ".mp4".to_string(),
                ".webm".to_string(),
                "doubleclick.net".to_string(),
                "googlesyndication".to_string(),
            ],
        }
    }
}

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("meeple-engine").join("logs"))
}

impl EngineConfig {
    /// Get config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("meeple-engine").join("config.json"))
    }

    /// Load config from file
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(content) => match serde_json::from_str(&content) {
                        Ok(config) => {
                            info!("Loaded config from {:?}", path);
                            return config;
                        }
                        Err(e) => {
                            warn!("Failed to parse config file: {}", e);
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read config file: {}", e);
                    }
                }
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    error!("Failed to create config directory: {}", e);
                    return;
                }
            }

            match serde_json::to_string_pretty(self) {
                Ok(content) => {
                    if let Err(e) = std::fs::write(&path, content) {
                        error!("Failed to save config: {}", e);
                    } else {
                        info!("Config saved to {:?}", path);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize config: {}", e);
                }
            }
        }
    }
}

/// Initialize logging: console plus a daily-rolling file when a config
/// directory is available.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "meeple-engine.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.action_timeout_ms, config.action_timeout_ms);
        assert_eq!(back.blocked_url_patterns, config.blocked_url_patterns);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"sessionTimeoutMs": 1000}"#).unwrap();
        assert_eq!(config.session_timeout_ms, 1_000);
        assert_eq!(config.action_timeout_ms, 30_000);
        assert_eq!(config.max_consecutive_failures, 5);
    }
}
