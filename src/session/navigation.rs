//! Navigation monitor
//!
//! Checked around every action: keeps the session on its original site,
//! recovers from `about:blank`, and enforces the single-tab invariant.

use tracing::{debug, info, warn};
use url::Url;

use crate::driver::BrowserDriver;
use crate::error::EngineError;

/// Back-navigations attempted before giving up and reloading directly
const MAX_DRIFT_BACKS: usize = 5;

pub struct NavigationMonitor {
    origin_url: String,
    origin_host: String,
}

impl NavigationMonitor {
    pub fn new(origin_url: &str) -> Result<Self, EngineError> {
        let parsed = Url::parse(origin_url)
            .map_err(|e| EngineError::NavigationFailed(format!("{}: {}", origin_url, e)))?;
        let origin_host = parsed
            .host_str()
            .ok_or_else(|| {
                EngineError::NavigationFailed(format!("{} has no host", origin_url))
            })?
            .to_string();
        Ok(Self {
            origin_url: origin_url.to_string(),
            origin_host,
        })
    }

    fn host_of(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Inspect the page and repair navigation drift. Returns whether a
    /// corrective navigation happened (the caller re-ranks zones then).
    pub async fn check(&self, driver: &dyn BrowserDriver) -> Result<bool, EngineError> {
        // Pages that open tabs would leak drivers; close them right away
        match driver.close_extra_tabs().await {
            Ok(0) => {}
            Ok(n) => info!("Closed {} extra tab(s)", n),
            Err(e) => warn!("Could not close extra tabs: {}", e),
        }

        let url = driver.current_url().await?;

        if url.is_empty() || url == "about:blank" {
            return self.recover_blank(driver).await.map(|_| true);
        }

        match Self::host_of(&url) {
            Some(host) if host == self.origin_host => Ok(false),
            _ => {
                debug!("Domain drift to {}", url);
                self.recover_drift(driver).await.map(|_| true)
            }
        }
    }

    /// about:blank usually means a busted history entry: try stepping
    /// around it before reloading from scratch.
    async fn recover_blank(&self, driver: &dyn BrowserDriver) -> Result<(), EngineError> {
        warn!("Page is about:blank, attempting recovery");
        driver.go_back().await?;
        if self.is_on_origin(driver).await {
            return Ok(());
        }
        driver.go_forward().await?;
        if self.is_on_origin(driver).await {
            return Ok(());
        }
        info!("History recovery failed, reloading {}", self.origin_url);
        driver.navigate(&self.origin_url).await
    }

    /// Walk back through history toward the origin; reload directly if
    /// the drift is deeper than a few steps.
    async fn recover_drift(&self, driver: &dyn BrowserDriver) -> Result<(), EngineError> {
        for _ in 0..MAX_DRIFT_BACKS {
            driver.go_back().await?;
            if self.is_on_origin(driver).await {
                return Ok(());
            }
        }
        info!("Still off-site, reloading {}", self.origin_url);
        driver.navigate(&self.origin_url).await
    }

    async fn is_on_origin(&self, driver: &dyn BrowserDriver) -> bool {
        match driver.current_url().await {
            Ok(url) => Self::host_of(&url).as_deref() == Some(self.origin_host.as_str()),
            Err(_) => false,
        }
    }
}
