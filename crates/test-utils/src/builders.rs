#![allow(dead_code)]

use std::time::Duration;

use dropwatch::config::WatchConfig;

/// Builder for `WatchConfig` with test-friendly defaults: no debounce delay,
/// no stability threshold, a short stability timeout and the default ignore
/// set.
pub struct WatchConfigBuilder {
    config: WatchConfig,
}

impl WatchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: WatchConfig {
                debounce_delay: Duration::ZERO,
                stability_threshold: Duration::ZERO,
                stability_timeout: Duration::from_secs(5),
                ignore_patterns: Vec::new(),
            },
        }
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.config.debounce_delay = delay;
        self
    }

    pub fn stability_threshold(mut self, threshold: Duration) -> Self {
        self.config.stability_threshold = threshold;
        self
    }

    pub fn stability_timeout(mut self, timeout: Duration) -> Self {
        self.config.stability_timeout = timeout;
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.config.ignore_patterns.push(pattern.to_string());
        self
    }

    pub fn build(self) -> WatchConfig {
        self.config
    }
}

impl Default for WatchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
