use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::platform::CudaPlatform;
use crate::sequencer::{BringUpReport, Sequencer};

/// Settings for the native bring-up, read from the `bringup` section of the
/// service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BringUpConfig {
    /// Skips the whole sequence when false.
    pub enabled: bool,

    /// Libraries loaded with global visibility, in order.
    pub preload: Vec<String>,

    pub driver_library: String,
    pub runtime_library: String,

    /// Device ordinal.
    pub device: i32,

    /// Environment applied before any native library is touched.
    pub env: BTreeMap<String, String>,
}

impl Default for BringUpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preload: vec![
                "libcuda.so.1".into(),
                "libcudart.so.12".into(),
                "libnvinfer.so.10".into(),
                "libnvinfer_plugin.so.10".into(),
            ],
            driver_library: "libcuda.so.1".into(),
            runtime_library: "libcudart.so.12".into(),
            device: 0,
            env: BTreeMap::from([
                ("CUDA_MODULE_LOADING".into(), "EAGER".into()),
                ("NVIDIA_DRIVER_CAPABILITIES".into(), "compute,utility".into()),
            ]),
        }
    }
}

impl BringUpConfig {
    /// Exports the configured environment variables.
    ///
    /// # Safety
    ///
    /// Mutates the process environment. Call before any other thread is
    /// started, in particular before the async runtime is built.
    pub unsafe fn apply_env(&self) {
        for (key, value) in &self.env {
            unsafe { std::env::set_var(key, value) };
            info!(key = %key, value = %value, "set environment");
        }
    }
}

static REPORT: OnceCell<BringUpReport> = OnceCell::new();

/// Runs the bring-up sequence once per process and returns its report.
///
/// Later calls return the first report regardless of `config`. Libraries
/// opened by a successful or partial run stay loaded until the process exits.
pub fn bring_up(config: &BringUpConfig) -> &'static BringUpReport {
    REPORT.get_or_init(|| {
        if !config.enabled {
            info!("native bring-up disabled");
            return BringUpReport::disabled();
        }

        let platform = CudaPlatform::new(&config.driver_library, &config.runtime_library);
        let mut sequencer = Sequencer::new(platform, config.preload.clone(), config.device);
        if let Err(e) = sequencer.run() {
            warn!(error = %e, "native bring-up failed");
        }
        let report = sequencer.report().clone();
        sequencer.into_platform().make_resident();
        report
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = BringUpConfig::default();
        assert!(c.enabled);
        assert_eq!(c.preload.len(), 4);
        assert_eq!(c.preload[0], "libcuda.so.1");
        assert_eq!(c.env["CUDA_MODULE_LOADING"], "EAGER");
        assert_eq!(c.env["NVIDIA_DRIVER_CAPABILITIES"], "compute,utility");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let c: BringUpConfig = serde_json::from_str(r#"{"device": 2, "preload": []}"#).unwrap();
        assert_eq!(c.device, 2);
        assert!(c.preload.is_empty());
        assert_eq!(c.runtime_library, "libcudart.so.12");
        assert_eq!(c.env.len(), 2);
    }

    #[test]
    fn test_bring_up_disabled() {
        let config = BringUpConfig {
            enabled: false,
            ..Default::default()
        };
        let report = bring_up(&config);
        assert!(!report.is_ready());
        assert!(report.preloaded.is_empty());
        // One-shot: a second call returns the same report.
        assert!(std::ptr::eq(report, bring_up(&BringUpConfig::default())));
    }
}
