//! Lock-free engine statistics using atomic operations
//!
//! Aggregated across all sessions without mutex contention; safe to read
//! from any task at any time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::session::{SessionReport, SessionStatus};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Global statistics aggregated across all sessions
#[derive(Debug, Default)]
pub struct GlobalStats {
    pub sessions_completed: AtomicU64,
    pub sessions_timed_out: AtomicU64,
    pub sessions_circuit_broken: AtomicU64,
    pub sessions_crashed: AtomicU64,
    pub actions_attempted: AtomicU64,
    pub active_sessions: AtomicU64,
    pub start_time: AtomicU64,
}

impl GlobalStats {
    pub fn new() -> Self {
        Self {
            start_time: AtomicU64::new(now_secs()),
            ..Default::default()
        }
    }

    /// Increment active sessions
    pub fn add_session(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement active sessions
    pub fn remove_session(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    /// Fold one finished session into the totals
    pub fn record_report(&self, report: &SessionReport) {
        self.actions_attempted
            .fetch_add(report.actions_completed as u64, Ordering::Relaxed);
        let counter = match report.status {
            SessionStatus::Completed => &self.sessions_completed,
            SessionStatus::TimedOut => &self.sessions_timed_out,
            SessionStatus::CircuitBroken => &self.sessions_circuit_broken,
            SessionStatus::Crashed => &self.sessions_crashed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sessions_finished(&self) -> u64 {
        self.sessions_completed.load(Ordering::Relaxed)
            + self.sessions_timed_out.load(Ordering::Relaxed)
            + self.sessions_circuit_broken.load(Ordering::Relaxed)
            + self.sessions_crashed.load(Ordering::Relaxed)
    }

    /// Actions attempted per minute since startup
    pub fn actions_per_minute(&self) -> f64 {
        let elapsed_minutes = (now_secs().saturating_sub(self.start_time.load(Ordering::Relaxed)))
            as f64
            / 60.0;
        if elapsed_minutes < 0.001 {
            return 0.0;
        }
        self.actions_attempted.load(Ordering::Relaxed) as f64 / elapsed_minutes
    }

    /// Get snapshot for serialization
    pub fn snapshot(&self) -> GlobalStatsSnapshot {
        GlobalStatsSnapshot {
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_timed_out: self.sessions_timed_out.load(Ordering::Relaxed),
            sessions_circuit_broken: self.sessions_circuit_broken.load(Ordering::Relaxed),
            sessions_crashed: self.sessions_crashed.load(Ordering::Relaxed),
            actions_attempted: self.actions_attempted.load(Ordering::Relaxed),
            actions_per_minute: self.actions_per_minute(),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
        }
    }

    /// Reset all stats
    pub fn reset(&self) {
        self.sessions_completed.store(0, Ordering::Relaxed);
        self.sessions_timed_out.store(0, Ordering::Relaxed);
        self.sessions_circuit_broken.store(0, Ordering::Relaxed);
        self.sessions_crashed.store(0, Ordering::Relaxed);
        self.actions_attempted.store(0, Ordering::Relaxed);
        self.start_time.store(now_secs(), Ordering::Relaxed);
    }
}

/// Serializable snapshot of global stats
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStatsSnapshot {
    pub sessions_completed: u64,
    pub sessions_timed_out: u64,
    pub sessions_circuit_broken: u64,
    pub sessions_crashed: u64,
    pub actions_attempted: u64,
    pub actions_per_minute: f64,
    pub active_sessions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(status: SessionStatus, actions: usize) -> SessionReport {
        let mut report = SessionReport::new("Meeple-stat".to_string());
        report.status = status;
        report.actions_completed = actions;
        report
    }

    #[test]
    fn reports_land_in_the_right_buckets() {
        let stats = GlobalStats::new();
        stats.record_report(&report_with(SessionStatus::Completed, 10));
        stats.record_report(&report_with(SessionStatus::Completed, 7));
        stats.record_report(&report_with(SessionStatus::TimedOut, 3));
        stats.record_report(&report_with(SessionStatus::Crashed, 0));

        let snap = stats.snapshot();
        assert_eq!(snap.sessions_completed, 2);
        assert_eq!(snap.sessions_timed_out, 1);
        assert_eq!(snap.sessions_crashed, 1);
        assert_eq!(snap.actions_attempted, 20);
        assert_eq!(stats.sessions_finished(), 4);
    }

    #[test]
    fn active_gauge_tracks_add_and_remove() {
        let stats = GlobalStats::new();
        stats.add_session();
        stats.add_session();
        stats.remove_session();
        assert_eq!(stats.snapshot().active_sessions, 1);
    }
}
