//! Close-once wrapper around a driver instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::BrowserDriver;

/// Shared handle that guarantees the underlying driver is closed exactly
/// once, no matter which side (session runner or orchestrator cleanup)
/// reaches the terminal state first.
pub struct DriverGuard {
    driver: Arc<dyn BrowserDriver>,
    closed: AtomicBool,
}

impl DriverGuard {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Arc<Self> {
        Arc::new(Self {
            driver,
            closed: AtomicBool::new(false),
        })
    }

    /// Access the underlying driver
    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    /// Shared handle to the underlying driver
    pub fn driver_arc(&self) -> Arc<dyn BrowserDriver> {
        self.driver.clone()
    }

    /// Close the driver if nobody has yet
    pub async fn release(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.driver.close().await {
            warn!("Driver close failed: {}", e);
        }
    }

    /// Whether the driver has been released
    pub fn is_released(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
