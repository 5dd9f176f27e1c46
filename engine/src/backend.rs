use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use visage_audio::Waveform;

use crate::binding::{BindingBackend, ModelOptions};
use crate::error::EngineError;
use crate::result::AnimationResult;
use crate::shared::SharedLibraryBackend;

/// The capability every backend provides.
pub trait InferenceBackend: Send {
    fn kind(&self) -> BackendKind;

    fn fps(&self) -> f32;

    fn blendshape_count(&self) -> usize;

    /// Runs the engine on a normalized waveform.
    fn infer(&mut self, waveform: &Waveform) -> Result<AnimationResult, EngineError>;
}

/// The backend in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Binding,
    SharedLibrary,
}

/// Which backend to construct at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendSelection {
    #[default]
    Binding,
    SharedLibrary,
    /// Binding when the library exports it, shared-library call otherwise.
    Auto,
}

impl std::str::FromStr for BackendSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binding" => Ok(Self::Binding),
            "shared_library" | "shared-library" => Ok(Self::SharedLibrary),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown backend {other:?} (expected binding, shared_library or auto)"
            )),
        }
    }
}

/// Engine settings, the `engine` section of the service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backend: BackendSelection,

    /// Engine shared library, by name or path.
    pub library: PathBuf,

    pub model_path: PathBuf,

    /// Persona: 0 = Claire, 1 = James, 2 = Mark.
    pub character_index: i32,

    pub use_gpu_solver: bool,
    pub constant_noise: bool,

    /// Frame rate assumed by the shared-library backend.
    pub fps: f32,

    /// Channels per frame assumed by the shared-library backend.
    pub blendshape_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendSelection::Binding,
            library: PathBuf::from("libaudio2face.so"),
            model_path: PathBuf::from("models/Audio2Face-3D-v3.0/model.json"),
            character_index: 0,
            use_gpu_solver: false,
            constant_noise: false,
            fps: 30.0,
            blendshape_count: 72,
        }
    }
}

impl EngineConfig {
    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            model_path: self.model_path.clone(),
            character_index: self.character_index,
            use_gpu_solver: self.use_gpu_solver,
            constant_noise: self.constant_noise,
        }
    }
}

/// One of the two ways of reaching the engine.
pub enum Backend {
    InProcessBinding(BindingBackend),
    SharedLibraryCall(SharedLibraryBackend),
}

impl Backend {
    /// Constructs the backend chosen by `config.backend`.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::select(
            config.backend,
            || Self::open_binding(config),
            || Self::open_shared(config),
        )
    }

    /// `Auto` falls back to the shared-library call only when the binding
    /// surface is incomplete; any other binding error is returned as is.
    fn select(
        selection: BackendSelection,
        binding: impl FnOnce() -> Result<Self, EngineError>,
        shared: impl FnOnce() -> Result<Self, EngineError>,
    ) -> Result<Self, EngineError> {
        match selection {
            BackendSelection::Binding => binding(),
            BackendSelection::SharedLibrary => shared(),
            BackendSelection::Auto => match binding() {
                Err(EngineError::MissingSymbol { symbol, .. }) => {
                    warn!(symbol = %symbol, "binding surface not exported, using shared-library call");
                    shared()
                }
                other => other,
            },
        }
    }

    fn open_binding(config: &EngineConfig) -> Result<Self, EngineError> {
        let backend = BindingBackend::open(&config.library, &config.model_options())?;
        info!(library = %config.library.display(), "using in-process binding");
        Ok(Backend::InProcessBinding(backend))
    }

    fn open_shared(config: &EngineConfig) -> Result<Self, EngineError> {
        let backend = SharedLibraryBackend::open(
            &config.library,
            &config.model_path,
            config.fps,
            config.blendshape_count,
        )?;
        info!(library = %config.library.display(), "using shared-library call");
        Ok(Backend::SharedLibraryCall(backend))
    }

    fn inner(&mut self) -> &mut dyn InferenceBackend {
        match self {
            Backend::InProcessBinding(b) => b,
            Backend::SharedLibraryCall(b) => b,
        }
    }

    fn inner_ref(&self) -> &dyn InferenceBackend {
        match self {
            Backend::InProcessBinding(b) => b,
            Backend::SharedLibraryCall(b) => b,
        }
    }
}

impl InferenceBackend for Backend {
    fn kind(&self) -> BackendKind {
        self.inner_ref().kind()
    }

    fn fps(&self) -> f32 {
        self.inner_ref().fps()
    }

    fn blendshape_count(&self) -> usize {
        self.inner_ref().blendshape_count()
    }

    fn infer(&mut self, waveform: &Waveform) -> Result<AnimationResult, EngineError> {
        self.inner().infer(waveform)
    }
}
