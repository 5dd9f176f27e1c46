//! Inference backend adapter.
//!
//! The blendshape engine is an external native library reachable in two
//! mutually exclusive ways:
//!
//! - **in-process binding**: an object-style surface. A model object is
//!   constructed from a model file, persona index and solver flags, reports its
//!   frame rate and channel count, and returns frames it allocated itself.
//!   See [`BlendshapeModel`].
//! - **shared-library call convention**: three C functions (`a2f_init`,
//!   `a2f_process`, `a2f_cleanup`) where the caller owns the output buffer.
//!   See [`EngineAbi`].
//!
//! Both are wrapped in [`Backend`] and driven through [`Engine`], which owns
//! the single backend of the process and serializes inference calls.
//!
//! # Example
//!
//! ```no_run
//! use visage_audio::Waveform;
//! use visage_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new();
//! let info = engine.initialize(&EngineConfig::default())?;
//! println!("{} blendshapes at {} fps", info.blendshape_count, info.fps);
//!
//! let result = engine.infer(&Waveform::silence(std::time::Duration::from_secs(1)))?;
//! println!("{} frames", result.num_frames());
//! # Ok::<(), visage_engine::EngineError>(())
//! ```

mod backend;
mod binding;
mod dylib;
mod engine;
mod error;
mod ffi;
mod names;
mod result;
mod shared;

pub use backend::{Backend, BackendKind, BackendSelection, EngineConfig, InferenceBackend};
pub use binding::{BindingBackend, BlendshapeModel, DylibModel, ModelOptions};
pub use engine::{character_name, probe_library, Engine, EngineInfo};
pub use error::EngineError;
pub use names::{blendshape_names, ARKIT_NAMES};
pub use result::{AnimationFrame, AnimationResult};
pub use shared::{DylibAbi, EngineAbi, SharedLibraryBackend};
