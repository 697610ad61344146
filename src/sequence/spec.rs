//! Scripted sequence definitions supplied with a job.
//!
//! A sequence is a named list of concrete steps plus a temperature that
//! controls how often the interpreter follows the script instead of
//! improvising. Validation happens once, at job admission.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Step kinds a script may use. Smaller than the persona vocabulary on
/// purpose: scripts target specific elements, so only element-directed
/// steps (plus wait) are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptedKind {
    Click,
    Type,
    Select,
    Hover,
    Scroll,
    Wait,
}

impl ScriptedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptedKind::Click => "click",
            ScriptedKind::Type => "type",
            ScriptedKind::Select => "select",
            ScriptedKind::Hover => "hover",
            ScriptedKind::Scroll => "scroll",
            ScriptedKind::Wait => "wait",
        }
    }
}

impl fmt::Display for ScriptedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptedKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "click" => Ok(ScriptedKind::Click),
            "type" => Ok(ScriptedKind::Type),
            "select" => Ok(ScriptedKind::Select),
            "hover" => Ok(ScriptedKind::Hover),
            "scroll" => Ok(ScriptedKind::Scroll),
            "wait" => Ok(ScriptedKind::Wait),
            _ => Err(()),
        }
    }
}

/// One concrete step of a scripted sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedAction {
    /// Step kind as a string; validated against [`ScriptedKind`]
    pub kind: String,
    /// CSS selector of the target element (optional only for `wait`)
    #[serde(default)]
    pub selector: Option<String>,
    /// Text payload for `type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Option value for `select`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A named scripted sequence as submitted with a job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceSpec {
    #[serde(default)]
    pub description: String,
    /// 0 = never follow the script, 10 = always follow it
    pub temperature: f64,
    /// Per-session chaos multiplier is drawn uniformly from this range
    pub chaos_range: [f64; 2],
    pub actions: Vec<ScriptedAction>,
}

impl SequenceSpec {
    /// Validate the whole spec, collecting every problem instead of
    /// stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(0.0..=10.0).contains(&self.temperature) {
            errors.push(format!(
                "temperature {} outside [0, 10]",
                self.temperature
            ));
        }
        if self.chaos_range[0] > self.chaos_range[1] {
            errors.push(format!(
                "chaos range [{}, {}] has min above max",
                self.chaos_range[0], self.chaos_range[1]
            ));
        }
        if self.actions.is_empty() {
            errors.push("sequence has no actions".to_string());
        }

        for (i, action) in self.actions.iter().enumerate() {
            let Ok(kind) = action.kind.parse::<ScriptedKind>() else {
                errors.push(format!("action {}: unsupported kind '{}'", i, action.kind));
                continue;
            };
            let has_selector = action
                .selector
                .as_deref()
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false);
            if kind != ScriptedKind::Wait && !has_selector {
                errors.push(format!("action {}: '{}' requires a selector", i, kind));
            }
            if kind == ScriptedKind::Type && action.text.is_none() {
                errors.push(format!("action {}: 'type' requires text", i));
            }
            if kind == ScriptedKind::Select && action.value.is_none() {
                errors.push(format!("action {}: 'select' requires a value", i));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
