//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Quiet period after the last contribution before a refresh starts
    #[serde(rename = "debounce-ms", default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Channel buffer size for coordinator requests
    #[serde(rename = "channel-buffer", default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Class set on the view's root element while a refresh is in flight
    #[serde(rename = "busy-class", default = "default_busy_class")]
    pub busy_class: String,

    /// Class set on the view's root element until the first refresh completes
    #[serde(rename = "initial-mask-class", default = "default_initial_mask_class")]
    pub initial_mask_class: String,
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_channel_buffer() -> usize {
    256
}

fn default_busy_class() -> String {
    "widget-data-source-helper-loading".to_string()
}

fn default_initial_mask_class() -> String {
    "widget-data-source-helper-initial-loading".to_string()
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            debounce_ms: default_debounce_ms(),
            channel_buffer: default_channel_buffer(),
            busy_class: default_busy_class(),
            initial_mask_class: default_initial_mask_class(),
        }
    }
}

impl CoordinatorConfig {
    /// Get the debounce window as a Duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
