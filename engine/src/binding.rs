//! In-process binding backend.

use std::ffi::CString;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;
use tracing::{debug, info};
use visage_audio::Waveform;

use crate::backend::{BackendKind, InferenceBackend};
use crate::dylib;
use crate::error::EngineError;
use crate::ffi;
use crate::result::AnimationResult;

/// Construction parameters of a blendshape model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub model_path: PathBuf,
    pub character_index: i32,
    pub use_gpu_solver: bool,
    pub constant_noise: bool,
}

/// Object-style engine surface: a constructed model that turns 16 kHz mono
/// samples into frames.
pub trait BlendshapeModel: Send {
    fn fps(&self) -> f32;

    fn num_blendshapes(&self) -> usize;

    /// Returns a row-major `frames × num_blendshapes` buffer.
    fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>, EngineError>;
}

/// [`BlendshapeModel`] backed by the object-style symbols of the engine
/// library.
pub struct DylibModel {
    handle: ffi::ModelHandle,
    fps: f32,
    num_blendshapes: usize,
    process: ffi::ModelProcess,
    free_output: ffi::ModelFreeOutput,
    destroy: ffi::ModelDestroy,
    _lib: Library,
}

// The handle is only touched through `&mut self` or in `Drop`, and the engine
// serializes access to the backend that owns it.
unsafe impl Send for DylibModel {}

impl DylibModel {
    /// Loads `library` and constructs a model from `options`.
    pub fn open(library: &Path, options: &ModelOptions) -> Result<Self, EngineError> {
        let lib = dylib::open(library)?;

        let (create, fps, num, process, free_output, destroy) = unsafe {
            (
                dylib::symbol::<ffi::ModelCreate>(&lib, library, ffi::MODEL_CREATE)?,
                dylib::symbol::<ffi::ModelFps>(&lib, library, ffi::MODEL_FPS)?,
                dylib::symbol::<ffi::ModelNumBlendshapes>(&lib, library, ffi::MODEL_NUM_BLENDSHAPES)?,
                dylib::symbol::<ffi::ModelProcess>(&lib, library, ffi::MODEL_PROCESS)?,
                dylib::symbol::<ffi::ModelFreeOutput>(&lib, library, ffi::MODEL_FREE_OUTPUT)?,
                dylib::symbol::<ffi::ModelDestroy>(&lib, library, ffi::MODEL_DESTROY)?,
            )
        };

        let model_path = options.model_path.display().to_string();
        let c_path = CString::new(model_path.as_str())
            .map_err(|_| EngineError::load(&model_path, "path contains a NUL byte"))?;

        let mut handle: ffi::ModelHandle = ptr::null_mut();
        let status = unsafe {
            create(
                c_path.as_ptr(),
                options.character_index as c_int,
                options.use_gpu_solver as c_int,
                options.constant_noise as c_int,
                &mut handle,
            )
        };
        if status != 0 || handle.is_null() {
            return Err(EngineError::load(
                &model_path,
                format!("a2f_model_create returned {status}"),
            ));
        }

        let fps = unsafe { fps(handle) };
        let num_blendshapes = unsafe { num(handle) };
        if fps.is_nan() || fps <= 0.0 || num_blendshapes <= 0 {
            unsafe { destroy(handle) };
            return Err(EngineError::load(
                &model_path,
                format!("model reports fps={fps} blendshapes={num_blendshapes}"),
            ));
        }

        debug!(library = %library.display(), model = %model_path, "model created");
        Ok(Self {
            handle,
            fps,
            num_blendshapes: num_blendshapes as usize,
            process,
            free_output,
            destroy,
            _lib: lib,
        })
    }
}

impl BlendshapeModel for DylibModel {
    fn fps(&self) -> f32 {
        self.fps
    }

    fn num_blendshapes(&self) -> usize {
        self.num_blendshapes
    }

    fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>, EngineError> {
        let mut out: *mut f32 = ptr::null_mut();
        let mut frames: usize = 0;
        let status = unsafe {
            (self.process)(self.handle, samples.as_ptr(), samples.len(), &mut out, &mut frames)
        };
        if status != 0 {
            if !out.is_null() {
                unsafe { (self.free_output)(self.handle, out) };
            }
            return Err(EngineError::Inference { code: status });
        }
        if out.is_null() {
            return match frames {
                0 => Ok(Vec::new()),
                n => Err(EngineError::MalformedOutput(format!("{n} frames but no buffer"))),
            };
        }

        let data =
            unsafe { std::slice::from_raw_parts(out, frames * self.num_blendshapes) }.to_vec();
        unsafe { (self.free_output)(self.handle, out) };
        Ok(data)
    }
}

impl Drop for DylibModel {
    fn drop(&mut self) {
        unsafe { (self.destroy)(self.handle) };
        debug!("model destroyed");
    }
}

/// Backend that runs a [`BlendshapeModel`] in process.
pub struct BindingBackend {
    model: Box<dyn BlendshapeModel>,
}

impl BindingBackend {
    pub fn new(model: impl BlendshapeModel + 'static) -> Self {
        Self {
            model: Box::new(model),
        }
    }

    /// Loads the engine library and constructs the model.
    pub fn open(library: &Path, options: &ModelOptions) -> Result<Self, EngineError> {
        let model = DylibModel::open(library, options)?;
        info!(
            fps = model.fps(),
            blendshapes = model.num_blendshapes(),
            character = options.character_index,
            gpu_solver = options.use_gpu_solver,
            "binding backend ready"
        );
        Ok(Self::new(model))
    }
}

impl InferenceBackend for BindingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Binding
    }

    fn fps(&self) -> f32 {
        self.model.fps()
    }

    fn blendshape_count(&self) -> usize {
        self.model.num_blendshapes()
    }

    fn infer(&mut self, waveform: &Waveform) -> Result<AnimationResult, EngineError> {
        let data = self.model.process(waveform.samples())?;
        AnimationResult::from_flat(data, self.model.fps(), self.model.num_blendshapes())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    /// Model that emits `ceil(duration * fps)` frames whose weights equal the
    /// frame index.
    pub(crate) struct CountingModel {
        pub fps: f32,
        pub channels: usize,
        pub fail_with: Option<i32>,
    }

    impl BlendshapeModel for CountingModel {
        fn fps(&self) -> f32 {
            self.fps
        }

        fn num_blendshapes(&self) -> usize {
            self.channels
        }

        fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>, EngineError> {
            if let Some(code) = self.fail_with {
                return Err(EngineError::Inference { code });
            }
            let secs = samples.len() as f64 / 16000.0;
            let frames = (secs * self.fps as f64).ceil() as usize;
            Ok((0..frames)
                .flat_map(|i| std::iter::repeat_n(i as f32, self.channels))
                .collect())
        }
    }

    #[test]
    fn test_one_second_at_30_fps() {
        let mut backend = BindingBackend::new(CountingModel {
            fps: 30.0,
            channels: 72,
            fail_with: None,
        });
        let result = backend.infer(&Waveform::silence(Duration::from_secs(1))).unwrap();
        assert_eq!(result.num_frames(), 30);
        assert_eq!(result.blendshape_count(), 72);
        for (i, t) in result.timestamps().iter().enumerate() {
            assert_eq!(*t, i as f64 / 30.0);
        }
        assert_eq!(result.frames()[29].weights[0], 29.0);
    }

    #[test]
    fn test_model_error_propagates() {
        let mut backend = BindingBackend::new(CountingModel {
            fps: 30.0,
            channels: 4,
            fail_with: Some(7),
        });
        let err = backend.infer(&Waveform::silence(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, EngineError::Inference { code: 7 }));
    }

    #[test]
    fn test_open_missing_library() {
        let options = ModelOptions {
            model_path: "model.json".into(),
            character_index: 0,
            use_gpu_solver: false,
            constant_noise: false,
        };
        let err = BindingBackend::open(Path::new("/nonexistent/libengine.so"), &options)
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Load { .. }));
    }
}
