use serde::{Deserialize, Serialize};
use std::time::Duration;

use smeshmon_sync::{RetryPolicy, DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};

use crate::{MonitorError, Result};

/// Configuration for the monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Base URL of the node's JSON API, e.g. `http://localhost:9071`
    pub rpc_url: Option<String>,

    /// Records requested per page of identity states
    pub page_size: usize,

    /// Pause between attempts of a failed request (in milliseconds)
    pub retry_delay_ms: u64,

    /// Cap on reward pages fetched per identity and poll
    pub max_reward_pages: usize,

    /// How often to poll for new identity states (in seconds)
    pub events_poll_interval_secs: u64,

    /// How often to refresh PoET info (in seconds)
    pub poet_poll_interval_secs: u64,

    /// How often the clock advances the timeline (in seconds)
    pub clock_tick_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            retry_delay_ms: 5_000,
            max_reward_pages: DEFAULT_MAX_PAGES,
            events_poll_interval_secs: 20,
            poet_poll_interval_secs: 3_600,
            clock_tick_secs: 5,
        }
    }
}

impl MonitorConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: MonitorConfig =
            toml::from_str(s).map_err(|e| MonitorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(MonitorError::Config("page_size must be positive".to_string()));
        }
        if self.max_reward_pages == 0 {
            return Err(MonitorError::Config(
                "max_reward_pages must be positive".to_string(),
            ));
        }
        let intervals = [
            ("events_poll_interval_secs", self.events_poll_interval_secs),
            ("poet_poll_interval_secs", self.poet_poll_interval_secs),
            ("clock_tick_secs", self.clock_tick_secs),
        ];
        for (name, secs) in intervals {
            if secs == 0 {
                return Err(MonitorError::Config(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_millis(self.retry_delay_ms))
    }

    pub fn events_poll_interval(&self) -> Duration {
        Duration::from_secs(self.events_poll_interval_secs)
    }

    pub fn poet_poll_interval(&self) -> Duration {
        Duration::from_secs(self.poet_poll_interval_secs)
    }

    pub fn clock_tick(&self) -> Duration {
        Duration::from_secs(self.clock_tick_secs)
    }
}
