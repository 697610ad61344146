//! Hot-zone analysis
//!
//! Extracts candidate elements from the live page, scores their visual
//! prominence, and produces the ranked list of click targets the action
//! executor steers toward.

mod score;

pub use score::{
    rank_candidates, score_candidate, ZoneSnapshot, MAX_ZONES, OVERLAP_EXEMPT_SCORE, OVERLAP_X,
    OVERLAP_Y, SCORE_THRESHOLD,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::driver::BrowserDriver;
use crate::error::EngineError;

/// Viewport dimensions at extraction time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// Raw candidate as extracted in the page. Every field defaults so a
/// partially filled payload still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneCandidate {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub tag: String,
    pub text: String,
    pub aria_role: String,
    pub aria_label: String,
    pub href: Option<String>,
    /// Discretized stacking order (0 = auto, then buckets of z-index)
    pub z_tier: u32,
    pub has_click_handler: bool,
    pub cursor_pointer: bool,
    pub box_shadow: bool,
    pub gradient: bool,
    pub transform: bool,
    pub high_contrast: bool,
    pub rounded: bool,
    pub font_size: f64,
    pub font_weight: u32,
    /// True when another element covers this one's center point
    pub obstructed: bool,
}

/// A ranked click target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotZone {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub tag: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aria_role: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aria_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub priority_score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionPayload {
    #[serde(default)]
    viewport: Viewport,
    #[serde(default)]
    candidates: Vec<ZoneCandidate>,
}

/// In-page extraction script. Walks visible elements, reads layout and
/// computed style, and reports one flat candidate record per element.
const EXTRACT_SCRIPT: &str = r#"
(() => {
  const vw = window.innerWidth, vh = window.innerHeight;
  const candidates = [];
  const seen = new Set();
  const els = document.querySelectorAll(
    'a, button, input, select, textarea, summary, [role], [onclick], h1, h2, h3, [class*="btn"], [class*="card"], [class*="cta"]'
  );
  for (const el of els) {
    if (seen.has(el)) continue;
    seen.add(el);
    const r = el.getBoundingClientRect();
    if (r.width <= 0 || r.height <= 0) continue;
    if (r.bottom < 0 || r.top > vh || r.right < 0 || r.left > vw) continue;
    const cs = getComputedStyle(el);
    if (cs.visibility === 'hidden' || cs.display === 'none' || parseFloat(cs.opacity) < 0.1) continue;
    const z = parseInt(cs.zIndex, 10);
    const top = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2);
    candidates.push({
      x: r.left, y: r.top, width: r.width, height: r.height,
      tag: el.tagName.toLowerCase(),
      text: (el.innerText || el.value || '').trim().slice(0, 120),
      ariaRole: el.getAttribute('role') || '',
      ariaLabel: el.getAttribute('aria-label') || '',
      href: el.href || null,
      zTier: isNaN(z) || z <= 0 ? 0 : Math.min(Math.ceil(z / 100), 10),
      hasClickHandler: !!(el.onclick || el.getAttribute('onclick')),
      cursorPointer: cs.cursor === 'pointer',
      boxShadow: cs.boxShadow !== 'none',
      gradient: cs.backgroundImage.includes('gradient'),
      transform: cs.transform !== 'none',
      highContrast: (() => {
        const m = cs.backgroundColor.match(/\d+/g);
        if (!m) return false;
        const [rr, gg, bb] = m.map(Number);
        const lum = 0.299 * rr + 0.587 * gg + 0.114 * bb;
        return lum < 80 || lum > 230;
      })(),
      rounded: parseFloat(cs.borderRadius) >= 4,
      fontSize: parseFloat(cs.fontSize) || 0,
      fontWeight: parseInt(cs.fontWeight, 10) || 400,
      obstructed: top !== null && top !== el && !el.contains(top) && !top.contains(el)
    });
    if (candidates.length >= 200) break;
  }
  return { viewport: { width: vw, height: vh }, candidates };
})()
"#;

/// Stateless analyzer over a driver handle
pub struct HotZoneAnalyzer;

impl HotZoneAnalyzer {
    /// Extract, score and rank the current page's click targets.
    ///
    /// A page where extraction yields nothing is not an error; the caller
    /// falls back to selector-based targeting.
    pub async fn snapshot(driver: &dyn BrowserDriver) -> Result<ZoneSnapshot, EngineError> {
        let raw = driver.evaluate(EXTRACT_SCRIPT).await?;
        let payload: ExtractionPayload = match serde_json::from_value(raw) {
            Ok(p) => p,
            Err(e) => {
                warn!("Hot-zone extraction returned malformed payload: {}", e);
                return Ok(ZoneSnapshot::default());
            }
        };
        let viewport = payload.viewport;
        let zones = rank_candidates(payload.candidates, &viewport);
        debug!("Ranked {} hot zones", zones.len());
        Ok(ZoneSnapshot { viewport, zones })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockDriver;
    use serde_json::json;

    #[tokio::test]
    async fn snapshot_ranks_extracted_candidates() {
        let driver = MockDriver::new("https://example.com");
        driver.stage_eval(
            "candidates",
            json!({
                "viewport": {"width": 1280.0, "height": 800.0},
                "candidates": [
                    {
                        "x": 100.0, "y": 100.0, "width": 160.0, "height": 48.0,
                        "tag": "button", "text": "Sign up",
                        "cursorPointer": true, "highContrast": true, "rounded": true,
                        "fontSize": 18.0, "fontWeight": 700
                    },
                    {
                        "x": 900.0, "y": 700.0, "width": 6.0, "height": 6.0,
                        "tag": "span", "text": ""
                    }
                ]
            }),
        );
        let snap = HotZoneAnalyzer::snapshot(&driver).await.unwrap();
        assert_eq!(snap.zones.len(), 1);
        assert_eq!(snap.zones[0].tag, "button");
        assert!(snap.zones[0].priority_score >= SCORE_THRESHOLD);
    }

    #[tokio::test]
    async fn malformed_payload_yields_empty_snapshot() {
        let driver = MockDriver::new("https://example.com");
        driver.push_eval_result(json!("not an object"));
        let snap = HotZoneAnalyzer::snapshot(&driver).await.unwrap();
        assert!(snap.zones.is_empty());
    }
}
