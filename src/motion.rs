//! Human-like mouse motion planning.
//!
//! Paths are cubic bezier arcs with an ease-in/out pacing profile,
//! start-heavy tremor, occasional micro-corrections, and an
//! overshoot-and-settle near the target. Planning is pure; the executor
//! walks the points against the driver and the clock.

use rand::Rng;

/// One sampled point of a planned path
#[derive(Debug, Clone, Copy)]
pub struct MotionPoint {
    pub x: f64,
    pub y: f64,
    /// Milliseconds since the start of the motion
    pub timing_offset_ms: f64,
}

/// Step count is a pure function of distance so longer paths always get
/// at least as many samples as shorter ones.
fn step_count(distance: f64) -> usize {
    ((distance / 14.0).round() as usize).clamp(10, 64)
}

/// Fitts-style total duration: distance relative to target size on a log
/// scale, with a floor for very close targets.
fn motion_duration_ms(distance: f64, target_size: f64) -> f64 {
    180.0 + 160.0 * (distance / target_size.max(1.0) + 1.0).log2()
}

/// Plan a path from `start` to `end` toward a target of the given size.
///
/// The final point always lands within one pixel of `end`.
pub fn plan_motion<R: Rng>(
    start: (f64, f64),
    end: (f64, f64),
    target_size: f64,
    rng: &mut R,
) -> Vec<MotionPoint> {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < 1.0 {
        return vec![MotionPoint {
            x: end.0,
            y: end.1,
            timing_offset_ms: 0.0,
        }];
    }

    let steps = step_count(distance);
    let duration = motion_duration_ms(distance, target_size);

    // Unit perpendicular for arcing the control points off the chord
    let (px, py) = (-dy / distance, dx / distance);
    let arc = distance * 0.18;
    let c1_off = arc * rng.gen_range(-1.0..1.0);
    let c2_off = arc * rng.gen_range(-1.0..1.0);
    let c1 = (
        start.0 + dx * 0.3 + px * c1_off,
        start.1 + dy * 0.3 + py * c1_off,
    );
    let c2 = (
        start.0 + dx * 0.7 + px * c2_off,
        start.1 + dy * 0.7 + py * c2_off,
    );

    // Occasional mid-path correction that bleeds off over later points
    let correction = if rng.gen_bool(0.12) {
        let at = rng.gen_range(0.55..0.85);
        let amp = rng.gen_range(2.0..6.0);
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        Some((at, amp * angle.cos(), amp * angle.sin()))
    } else {
        None
    };

    let overshoot_amp = (distance * 0.03).min(8.0) * rng.gen_range(0.3..1.0);

    // Ease-in/out pacing: velocity peaks mid-path, so per-step time is
    // largest near the endpoints. Weights normalize to the total duration.
    let mut weights = Vec::with_capacity(steps);
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        weights.push(1.0 / (0.25 + 4.0 * t * (1.0 - t)));
    }
    let weight_sum: f64 = weights.iter().sum();

    let mut points = Vec::with_capacity(steps);
    let mut elapsed = 0.0;
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let u = 1.0 - t;
        let mut x = u * u * u * start.0
            + 3.0 * u * u * t * c1.0
            + 3.0 * u * t * t * c2.0
            + t * t * t * end.0;
        let mut y = u * u * u * start.1
            + 3.0 * u * u * t * c1.1
            + 3.0 * u * t * t * c2.1
            + t * t * t * end.1;

        // Tremor is strongest leaving the start and dies out on approach
        let tremor = 2.2 * (1.0 - t);
        x += tremor * rng.gen_range(-1.0..1.0);
        y += tremor * rng.gen_range(-1.0..1.0);

        if let Some((at, cx, cy)) = correction {
            if t >= at {
                let decay = (-(t - at) * 12.0).exp();
                x += cx * decay;
                y += cy * decay;
            }
        }

        // Overshoot past the target in the last 10%, settling back to zero
        if t > 0.9 {
            let local = (t - 0.9) / 0.1;
            let bump = (local * std::f64::consts::PI).sin() * overshoot_amp;
            x += (dx / distance) * bump;
            y += (dy / distance) * bump;
        }

        elapsed += duration * weights[i - 1] / weight_sum;

        if i == steps {
            x = end.0 + rng.gen_range(-0.4..0.4);
            y = end.1 + rng.gen_range(-0.4..0.4);
            elapsed = duration;
        }

        points.push(MotionPoint {
            x,
            y,
            timing_offset_ms: elapsed,
        });
    }
    points
}
