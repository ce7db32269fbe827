use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum number of entries in the simulated scatter-gather table.
///
/// Uncompressed surfaces map to many entries, and at least one frame's worth of entries must be
/// queued before the hardware can place a frame.
pub const SCATTER_GATHER_MAPPINGS_MAX: usize = 128;

/// Where the hardware takes each frame from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSource {
    /// Copy the externally written live buffer (see `HardwareSimulation::set_data`)
    Live,
    /// Let the image synthesizer draw into the synthesis buffer
    Synthesized,
}

/// Tunables of the simulated hardware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capacity of the scatter-gather descriptor pool
    pub mappings_max: usize,
    /// Largest image size accepted when starting
    pub max_image_size: usize,
    pub frame_source: FrameSource,
    /// Name of the scheduler thread
    pub timer_name: String,
    /// Poll period of a pause/stop caller waiting for the running tick
    pub quiesce_poll_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mappings_max: SCATTER_GATHER_MAPPINGS_MAX,
            max_image_size: 64 * 1024 * 1024,
            frame_source: FrameSource::Live,
            timer_name: String::from("capsim-isr"),
            quiesce_poll_ms: 100,
        }
    }
}

impl Config {
    pub(crate) fn quiesce_poll(&self) -> Duration {
        Duration::from_millis(self.quiesce_poll_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let json = r#"{ "frame_source": "synthesized", "mappings_max": 16 }"#;

        let cfg: Config = serde_json::from_str(json).expect("valid config");
        assert_eq!(cfg.frame_source, FrameSource::Synthesized);
        assert_eq!(cfg.mappings_max, 16);
        assert_eq!(cfg.max_image_size, Config::default().max_image_size);
        assert_eq!(cfg.timer_name, "capsim-isr");
    }

    #[test]
    fn zero_poll_is_clamped() {
        let cfg = Config {
            quiesce_poll_ms: 0,
            ..Config::default()
        };
        assert_eq!(cfg.quiesce_poll(), Duration::from_millis(1));
    }
}
