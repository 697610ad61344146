//! Sleep capability threaded through the engine.
//!
//! Every artificial delay (pacing, dwell, motion timing) goes through a
//! `Clock` so tests can run the full action pipeline without real waits.

use std::time::Duration;

use async_trait::async_trait;

/// Injectable sleep capability
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by the tokio timer
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that returns immediately; used by the test suite
pub struct NullClock;

#[async_trait]
impl Clock for NullClock {
    async fn sleep(&self, _duration: Duration) {}
}
