//! Sequence generator
//!
//! Turns a persona's weight profile into a finite, shaped action sequence.
//! Pure and seed-deterministic: the same persona + RNG seed always yields
//! the same sequence.

use rand::Rng;

use crate::persona::{ActionKind, Persona};

/// Drawn sequence length bounds before any caller cap
pub const MIN_SEQUENCE_LEN: usize = 25;
pub const MAX_SEQUENCE_LEN: usize = 100;

/// Minimum number of clicks a sequence must carry
pub fn click_quota(len: usize) -> usize {
    5usize.max((len as f64 * 0.15).floor() as usize)
}

/// Trailing run length of `kind` at the end of `seq`
fn trailing_run(seq: &[ActionKind], kind: ActionKind) -> usize {
    seq.iter().rev().take_while(|k| **k == kind).count()
}

/// Whether rewriting position `idx` to click keeps every click-run ≤ 3
fn click_rewrite_ok(seq: &[ActionKind], idx: usize) -> bool {
    let before = seq[..idx]
        .iter()
        .rev()
        .take_while(|k| **k == ActionKind::Click)
        .count();
    let after = seq[idx + 1..]
        .iter()
        .take_while(|k| **k == ActionKind::Click)
        .count();
    before + 1 + after <= 3
}

/// Generate a shaped action sequence for `persona`.
///
/// Length is `min(max_actions, uniform(25, 100))`. Shaping is greedy and
/// local: scroll-runs cap at 4, click-runs at 3, wait-runs at 2, and a
/// wait is forced with 30% probability after 8 wait-free actions. The
/// click quota is enforced afterwards by rewriting non-click positions.
pub fn generate_sequence<R: Rng>(
    persona: &Persona,
    max_actions: Option<usize>,
    rng: &mut R,
) -> Vec<ActionKind> {
    let drawn = rng.gen_range(MIN_SEQUENCE_LEN..=MAX_SEQUENCE_LEN);
    let length = match max_actions {
        Some(cap) => drawn.min(cap.max(1)),
        None => drawn,
    };

    let mut seq: Vec<ActionKind> = Vec::with_capacity(length);
    let mut since_wait = 0usize;

    for _ in 0..length {
        let sampled = if since_wait >= 8 && rng.gen_bool(0.3) {
            ActionKind::Wait
        } else {
            persona.sample_action(rng)
        };

        // Local run caps; substitutions land next to a run of a different
        // kind, so they can never start an over-long run themselves.
        let kind = match sampled {
            ActionKind::Scroll if trailing_run(&seq, ActionKind::Scroll) >= 4 => {
                if rng.gen_bool(0.6) {
                    ActionKind::Click
                } else {
                    ActionKind::Wait
                }
            }
            ActionKind::Click if trailing_run(&seq, ActionKind::Click) >= 3 => {
                if rng.gen_bool(0.7) {
                    ActionKind::Scroll
                } else {
                    ActionKind::Wait
                }
            }
            ActionKind::Wait if trailing_run(&seq, ActionKind::Wait) >= 2 => {
                if rng.gen_bool(0.5) {
                    ActionKind::Click
                } else {
                    ActionKind::Scroll
                }
            }
            other => other,
        };

        since_wait = if kind == ActionKind::Wait {
            0
        } else {
            since_wait + 1
        };
        seq.push(kind);
    }

    // Click quota: rewrite random non-click positions, skipping any spot
    // that would create a click-run longer than 3.
    let quota = click_quota(length);
    let mut clicks = seq.iter().filter(|k| **k == ActionKind::Click).count();
    while clicks < quota {
        let candidates: Vec<usize> = (0..seq.len())
            .filter(|&i| seq[i] != ActionKind::Click && click_rewrite_ok(&seq, i))
            .collect();
        let Some(&idx) = candidates.get(rng.gen_range(0..candidates.len().max(1))) else {
            break;
        };
        seq[idx] = ActionKind::Click;
        clicks += 1;
    }

    seq
}
