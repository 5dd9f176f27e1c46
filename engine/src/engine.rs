use std::path::Path;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info};
use visage_audio::Waveform;

use crate::backend::{Backend, BackendKind, BackendSelection, EngineConfig, InferenceBackend};
use crate::dylib;
use crate::error::EngineError;
use crate::ffi;
use crate::names::blendshape_names;
use crate::result::AnimationResult;

/// Description of the initialized engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInfo {
    pub backend: BackendKind,
    pub library: String,
    pub model_path: String,
    pub fps: f32,
    pub blendshape_count: usize,
    pub character_index: i32,
    pub character_name: String,
    pub solver: &'static str,
}

impl EngineInfo {
    fn new(backend: &Backend, config: &EngineConfig) -> Self {
        Self {
            backend: backend.kind(),
            library: config.library.display().to_string(),
            model_path: config.model_path.display().to_string(),
            fps: backend.fps(),
            blendshape_count: backend.blendshape_count(),
            character_index: config.character_index,
            character_name: character_name(config.character_index),
            solver: if config.use_gpu_solver { "gpu" } else { "cpu" },
        }
    }
}

/// Display name of a persona index.
pub fn character_name(index: i32) -> String {
    match index {
        0 => "Claire".into(),
        1 => "James".into(),
        2 => "Mark".into(),
        n => format!("Character_{n}"),
    }
}

/// The engine handle of the process.
///
/// Holds at most one backend. [`Engine::infer`] calls are serialized;
/// [`Engine::info`] and [`Engine::blendshape_names`] read a separate snapshot
/// and never wait for a running inference.
#[derive(Default)]
pub struct Engine {
    backend: Mutex<Option<Backend>>,
    info: RwLock<Option<EngineInfo>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs the configured backend and makes it current.
    pub fn initialize(&self, config: &EngineConfig) -> Result<EngineInfo, EngineError> {
        if self.is_initialized() {
            return Err(EngineError::AlreadyInitialized);
        }
        let backend = Backend::open(config)?;
        self.install(backend, config)
    }

    /// Makes an already constructed backend current.
    pub fn install(&self, backend: Backend, config: &EngineConfig) -> Result<EngineInfo, EngineError> {
        let mut slot = self.backend.lock();
        if slot.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        let info = EngineInfo::new(&backend, config);
        info!(
            backend = ?info.backend,
            fps = info.fps,
            blendshapes = info.blendshape_count,
            character = %info.character_name,
            solver = info.solver,
            "engine initialized"
        );
        *slot = Some(backend);
        *self.info.write() = Some(info.clone());
        Ok(info)
    }

    pub fn is_initialized(&self) -> bool {
        self.info.read().is_some()
    }

    pub fn info(&self) -> Option<EngineInfo> {
        self.info.read().clone()
    }

    /// Channel names for the current engine.
    pub fn blendshape_names(&self) -> Result<Vec<String>, EngineError> {
        self.info
            .read()
            .as_ref()
            .map(|info| blendshape_names(info.blendshape_count))
            .ok_or(EngineError::NotInitialized)
    }

    /// Runs inference, waiting for any call already in progress.
    pub fn infer(&self, waveform: &Waveform) -> Result<AnimationResult, EngineError> {
        let mut slot = self.backend.lock();
        Self::run(&mut slot, waveform)
    }

    /// Like [`Engine::infer`], but gives up with [`EngineError::Busy`] if the
    /// engine is not free by `deadline`. A call that gets the engine in time
    /// runs to completion.
    pub fn infer_before(
        &self,
        waveform: &Waveform,
        deadline: Instant,
    ) -> Result<AnimationResult, EngineError> {
        let Some(mut slot) = self.backend.try_lock_until(deadline) else {
            debug!(samples = waveform.len(), "engine busy past deadline, inference skipped");
            return Err(EngineError::Busy);
        };
        if Instant::now() >= deadline {
            return Err(EngineError::Busy);
        }
        Self::run(&mut slot, waveform)
    }

    fn run(slot: &mut Option<Backend>, waveform: &Waveform) -> Result<AnimationResult, EngineError> {
        let backend = slot.as_mut().ok_or(EngineError::NotInitialized)?;

        let start = Instant::now();
        let result = backend.infer(waveform)?;
        debug!(
            samples = waveform.len(),
            frames = result.num_frames(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "inference done"
        );
        Ok(result)
    }

    /// Drops the backend, releasing the native engine. Safe to call more than
    /// once.
    pub fn release(&self) {
        *self.info.write() = None;
        if self.backend.lock().take().is_some() {
            info!("engine released");
        }
    }
}

/// Checks that `config.library` loads and exports the symbols of the
/// configured backend. Returns a short description on success.
pub fn probe_library(config: &EngineConfig) -> Result<String, EngineError> {
    let path: &Path = &config.library;
    let lib = dylib::open(path)?;
    let binding = dylib::first_missing(&lib, ffi::BINDING_SYMBOLS);
    let shared = dylib::first_missing(&lib, ffi::SHARED_SYMBOLS);
    describe_exports(path, config.backend, binding, shared)
}

/// Judges the exports of `path` for `selection`, given the first missing
/// symbol of each surface.
fn describe_exports(
    path: &Path,
    selection: BackendSelection,
    binding: Option<String>,
    shared: Option<String>,
) -> Result<String, EngineError> {
    let missing = |symbol: String| EngineError::MissingSymbol {
        library: path.display().to_string(),
        symbol,
    };

    match (selection, binding, shared) {
        (BackendSelection::Binding, Some(symbol), _) => Err(missing(symbol)),
        (BackendSelection::SharedLibrary, _, Some(symbol)) => Err(missing(symbol)),
        (BackendSelection::Auto, Some(_), Some(symbol)) => Err(missing(symbol)),
        (BackendSelection::SharedLibrary, _, None) => {
            Ok(format!("{} exports the shared-library call", path.display()))
        }
        (_, None, _) => Ok(format!("{} exports the binding surface", path.display())),
        (BackendSelection::Auto, Some(_), None) => {
            Ok(format!("{} exports the shared-library call", path.display()))
        }
    }
}
