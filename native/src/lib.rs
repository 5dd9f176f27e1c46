//! Native driver/runtime bring-up.
//!
//! The inference engine links against a GPU runtime whose initialization is
//! order-sensitive: shared libraries must be resident with global symbol
//! visibility and a device context must be current before the engine library
//! is loaded. This crate performs that sequence once per process.
//!
//! Two independent strategies are attempted and the bring-up succeeds when at
//! least one of them does:
//!
//! - the driver path: `cuInit` → enumerate devices → retain the primary
//!   context → make it current
//! - the runtime path: `cudaSetDevice` → `cudaFree(NULL)` warm-up
//!
//! # Usage
//!
//! ```no_run
//! use visage_native::{bring_up, BringUpConfig};
//!
//! let report = bring_up(&BringUpConfig::default());
//! if !report.is_ready() {
//!     eprintln!("GPU unavailable: {:?}", report);
//! }
//! ```
//!
//! # Testing
//!
//! The native calls sit behind the [`Platform`] trait; [`Sequencer`] is
//! generic over it so the state machine can be driven by a scripted platform.

mod config;
mod error;
mod ffi;
mod platform;
mod sequencer;

pub use config::{bring_up, BringUpConfig};
pub use error::NativeError;
pub use platform::{open_global, Context, CudaPlatform, Device, Platform};
pub use sequencer::{BringUpReport, BringUpState, PathOutcome, Sequencer, SkippedLibrary};
