//! The bring-up state machine.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::NativeError;
use crate::platform::Platform;

/// Progress of the bring-up sequence.
///
/// ```text
/// NotStarted → LibrariesPreloaded → DriverInitialized → RuntimeInitialized → Ready
///      └──────────────┴────────────────────┴───────────────────┴──────→ Failed
/// ```
///
/// `DriverInitialized` is skipped when the driver path fails; the runtime
/// path is attempted regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BringUpState {
    NotStarted,
    LibrariesPreloaded,
    DriverInitialized,
    RuntimeInitialized,
    Ready,
    Failed,
}

impl BringUpState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BringUpState::Ready | BringUpState::Failed)
    }
}

/// Result of one of the two independent initialization strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PathOutcome {
    NotAttempted,
    Ok,
    Failed(String),
}

impl PathOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, PathOutcome::Ok)
    }

    fn describe(&self) -> String {
        match self {
            PathOutcome::NotAttempted => "not attempted".into(),
            PathOutcome::Ok => "ok".into(),
            PathOutcome::Failed(detail) => detail.clone(),
        }
    }
}

/// A library that could not be preloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLibrary {
    pub library: String,
    pub reason: String,
}

/// What the sequence did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BringUpReport {
    pub state: BringUpState,
    pub preloaded: Vec<String>,
    pub skipped: Vec<SkippedLibrary>,
    pub driver: PathOutcome,
    pub runtime: PathOutcome,
    pub device_count: Option<i32>,
}

impl BringUpReport {
    fn new() -> Self {
        Self {
            state: BringUpState::NotStarted,
            preloaded: Vec::new(),
            skipped: Vec::new(),
            driver: PathOutcome::NotAttempted,
            runtime: PathOutcome::NotAttempted,
            device_count: None,
        }
    }

    /// Report for a process where bring-up was turned off.
    pub fn disabled() -> Self {
        Self::new()
    }

    pub fn is_ready(&self) -> bool {
        self.state == BringUpState::Ready
    }
}

/// Drives a [`Platform`] through the bring-up states exactly once.
pub struct Sequencer<P: Platform> {
    platform: P,
    preload: Vec<String>,
    device: i32,
    report: BringUpReport,
}

impl<P: Platform> Sequencer<P> {
    /// Creates a sequencer that preloads `preload` in order and targets the
    /// device with ordinal `device`.
    pub fn new(platform: P, preload: Vec<String>, device: i32) -> Self {
        Self {
            platform,
            preload,
            device,
            report: BringUpReport::new(),
        }
    }

    pub fn state(&self) -> BringUpState {
        self.report.state
    }

    pub fn report(&self) -> &BringUpReport {
        &self.report
    }

    /// Returns the platform, keeping whatever it loaded.
    pub fn into_platform(self) -> P {
        self.platform
    }

    /// Runs the sequence. Calling again after a terminal state returns the
    /// recorded outcome without touching the platform.
    pub fn run(&mut self) -> Result<&BringUpReport, NativeError> {
        if !self.report.state.is_terminal() {
            self.preload_libraries();
            self.report.state = BringUpState::LibrariesPreloaded;

            self.report.driver = self.guarded("driver path", Self::init_driver);
            if self.report.driver.is_ok() {
                self.report.state = BringUpState::DriverInitialized;
            }

            self.report.runtime = self.guarded("runtime path", Self::init_runtime);
            if self.report.runtime.is_ok() {
                self.report.state = BringUpState::RuntimeInitialized;
            }

            self.report.state = if self.report.driver.is_ok() || self.report.runtime.is_ok() {
                BringUpState::Ready
            } else {
                BringUpState::Failed
            };

            info!(
                state = ?self.report.state,
                driver = %self.report.driver.describe(),
                runtime = %self.report.runtime.describe(),
                preloaded = self.report.preloaded.len(),
                skipped = self.report.skipped.len(),
                "native bring-up finished"
            );
        }

        match self.report.state {
            BringUpState::Ready => Ok(&self.report),
            _ => Err(NativeError::BringUpFailed {
                driver: self.report.driver.describe(),
                runtime: self.report.runtime.describe(),
            }),
        }
    }

    fn preload_libraries(&mut self) {
        for library in &self.preload {
            match self.platform.preload(library) {
                Ok(()) => {
                    info!(library = %library, "preloaded library");
                    self.report.preloaded.push(library.clone());
                }
                Err(e) => {
                    // Optional plugins are commonly absent.
                    warn!(library = %library, error = %e, "could not preload library");
                    self.report.skipped.push(SkippedLibrary {
                        library: library.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Runs one strategy, turning both errors and panics into a failed outcome.
    fn guarded(
        &mut self,
        name: &str,
        path: fn(&mut Self) -> Result<(), NativeError>,
    ) -> PathOutcome {
        match catch_unwind(AssertUnwindSafe(|| path(self))) {
            Ok(Ok(())) => PathOutcome::Ok,
            Ok(Err(e)) => {
                warn!(error = %e, "{name} failed");
                PathOutcome::Failed(e.to_string())
            }
            Err(_) => {
                let e = NativeError::Panic(name.to_string());
                warn!(error = %e, "{name} failed");
                PathOutcome::Failed(e.to_string())
            }
        }
    }

    fn init_driver(&mut self) -> Result<(), NativeError> {
        self.platform.driver_init()?;
        let count = self.platform.device_count()?;
        self.report.device_count = Some(count);
        if count < 1 {
            return Err(NativeError::NoDevice);
        }
        let device = self.platform.device_get(self.device)?;
        let context = self.platform.primary_context_retain(device)?;
        self.platform.context_set_current(context)?;
        info!(devices = count, device = device.0, "driver context current");
        Ok(())
    }

    fn init_runtime(&mut self) -> Result<(), NativeError> {
        self.platform.runtime_set_device(self.device)?;
        // The device is selected; a failed warm-up only delays lazy init.
        if let Err(e) = self.platform.runtime_warm_up() {
            warn!(error = %e, "runtime warm-up reported an error");
        }
        info!(device = self.device, "runtime initialized");
        Ok(())
    }
}
