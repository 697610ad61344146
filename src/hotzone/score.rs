//! Visual-prominence scoring and ranking.
//!
//! Pure functions over extracted candidates; no driver access here, so
//! the whole heuristic is unit-testable without a page.

use serde::{Deserialize, Serialize};

use super::{HotZone, Viewport, ZoneCandidate};

/// Candidates scoring below this never become zones
pub const SCORE_THRESHOLD: f64 = 4.0;
/// Two zones closer than this on both axes are considered duplicates
pub const OVERLAP_X: f64 = 80.0;
pub const OVERLAP_Y: f64 = 40.0;
/// Duplicates are still kept when both sides score at least this
pub const OVERLAP_EXEMPT_SCORE: f64 = 12.0;
/// Hard cap on zones per snapshot
pub const MAX_ZONES: usize = 25;

const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "summary"];
const INTERACTIVE_ROLES: &[&str] = &["button", "link", "tab", "menuitem", "checkbox", "switch"];
const ACTION_WORDS: &[&str] = &[
    "buy", "shop", "add", "cart", "sign", "login", "register", "subscribe", "download", "get",
    "start", "try", "join", "order", "book", "apply", "continue", "next", "submit", "learn",
];

/// Zones plus the viewport they were extracted from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSnapshot {
    pub viewport: Viewport,
    pub zones: Vec<HotZone>,
}

fn contains_action_word(text: &str) -> bool {
    let lower = text.to_lowercase();
    ACTION_WORDS.iter().any(|w| lower.contains(w))
}

/// Score one candidate's visual prominence.
///
/// The heuristic favors elements a human eye lands on first: sensible
/// size, F-pattern placement, elevation, styling that signals
/// clickability, and call-to-action text.
pub fn score_candidate(c: &ZoneCandidate, viewport: &Viewport) -> f64 {
    let mut score = 0.0;

    // Size: tiny targets are noise, comfortably clickable ones stand out
    if c.width < 24.0 || c.height < 12.0 {
        score -= 3.0;
    } else if (40.0..=600.0).contains(&c.width) && (20.0..=200.0).contains(&c.height) {
        score += 2.0;
    }

    // F-pattern reading bias: top third, then left third
    if c.y < viewport.height * 0.33 {
        score += 2.0;
    }
    if c.x < viewport.width * 0.33 {
        score += 1.0;
    }

    // Stacking context elevation, capped so banners don't dominate
    score += (c.z_tier as f64).min(3.0);

    // Styling that advertises clickability
    if c.box_shadow {
        score += 1.0;
    }
    if c.gradient {
        score += 1.0;
    }
    if c.transform {
        score += 0.5;
    }
    if c.high_contrast {
        score += 1.5;
    }
    if c.rounded {
        score += 1.0;
    }
    if c.cursor_pointer {
        score += 1.5;
    }

    // Typography prominence
    if c.font_size >= 24.0 {
        score += 1.5;
    } else if c.font_size >= 18.0 {
        score += 1.0;
    }
    if c.font_weight >= 600 {
        score += 1.0;
    }

    // Semantics
    let tag = c.tag.to_lowercase();
    let role = c.aria_role.to_lowercase();
    if INTERACTIVE_TAGS.contains(&tag.as_str()) || INTERACTIVE_ROLES.contains(&role.as_str()) {
        score += 2.0;
    }
    if c.has_click_handler {
        score += 1.0;
    }

    // Call-to-action text in the label or the accessible name
    if contains_action_word(&c.text) || contains_action_word(&c.aria_label) {
        score += 2.5;
    }
    let trimmed = c.text.trim();
    if !trimmed.is_empty() && trimmed.chars().count() <= 20 {
        score += 1.0;
    }

    score
}

/// Score, filter and deduplicate candidates into the final zone list.
pub fn rank_candidates(candidates: Vec<ZoneCandidate>, viewport: &Viewport) -> Vec<HotZone> {
    let mut scored: Vec<(f64, ZoneCandidate)> = candidates
        .into_iter()
        .filter(|c| !c.obstructed)
        .map(|c| (score_candidate(&c, viewport), c))
        .filter(|(s, _)| *s >= SCORE_THRESHOLD)
        .collect();

    // Highest score first; ties break on document position for stability
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                (a.1.y, a.1.x)
                    .partial_cmp(&(b.1.y, b.1.x))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    let mut zones: Vec<HotZone> = Vec::new();
    for (score, c) in scored {
        if zones.len() >= MAX_ZONES {
            break;
        }
        let cx = c.x + c.width / 2.0;
        let cy = c.y + c.height / 2.0;
        let duplicate = zones.iter().any(|z| {
            (z.center_x - cx).abs() < OVERLAP_X
                && (z.center_y - cy).abs() < OVERLAP_Y
                && !(z.priority_score >= OVERLAP_EXEMPT_SCORE && score >= OVERLAP_EXEMPT_SCORE)
        });
        if duplicate {
            continue;
        }
        zones.push(HotZone {
            x: c.x,
            y: c.y,
            width: c.width,
            height: c.height,
            center_x: cx,
            center_y: cy,
            tag: c.tag,
            text: c.text,
            aria_role: c.aria_role,
            aria_label: c.aria_label,
            href: c.href,
            priority_score: score,
        });
    }
    zones
}
