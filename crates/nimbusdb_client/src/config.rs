//! Configuration for the client.

use std::time::Duration;

/// Configuration for a client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Database the session talks to.
    pub database: String,
    /// Default staleness budget when a query asks to wait for non-stale
    /// results without its own timeout.
    pub default_stale_wait: Duration,
    /// Pause between stale-result retries.
    pub stale_retry_interval: Duration,
}

impl ClientConfig {
    /// Creates a configuration for the given database.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            default_stale_wait: Duration::from_secs(15),
            stale_retry_interval: Duration::from_millis(50),
        }
    }

    /// Sets the default staleness budget.
    #[must_use]
    pub fn with_default_stale_wait(mut self, budget: Duration) -> Self {
        self.default_stale_wait = budget;
        self
    }

    /// Sets the pause between stale-result retries.
    #[must_use]
    pub fn with_stale_retry_interval(mut self, interval: Duration) -> Self {
        self.stale_retry_interval = interval;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = ClientConfig::new("northwind")
            .with_default_stale_wait(Duration::from_secs(2))
            .with_stale_retry_interval(Duration::from_millis(10));

        assert_eq!(config.database, "northwind");
        assert_eq!(config.default_stale_wait, Duration::from_secs(2));
        assert_eq!(config.stale_retry_interval, Duration::from_millis(10));
    }
}
