//! Shared-library backend with a caller-owned output buffer.

use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::path::Path;

use libloading::Library;
use tracing::{debug, info, warn};
use visage_audio::{Waveform, TARGET_SAMPLE_RATE};

use crate::backend::{BackendKind, InferenceBackend};
use crate::dylib;
use crate::error::EngineError;
use crate::ffi;
use crate::result::AnimationResult;

/// The three-function C surface of the engine, as raw status codes.
pub trait EngineAbi: Send {
    /// Calls `a2f_init`.
    fn init(&mut self, model_path: &CStr) -> i32;

    /// Calls `a2f_process`, writing up to `out.len()` floats and storing the
    /// number of frames produced in `out_frames`.
    fn process(&mut self, samples: &[f32], out: &mut [f32], out_frames: &mut usize) -> i32;

    /// Calls `a2f_cleanup`.
    fn cleanup(&mut self);
}

/// [`EngineAbi`] resolved from a shared library.
pub struct DylibAbi {
    init: ffi::Init,
    process: ffi::Process,
    cleanup: ffi::Cleanup,
    _lib: Library,
}

impl DylibAbi {
    pub fn open(library: &Path) -> Result<Self, EngineError> {
        let lib = dylib::open(library)?;
        let (init, process, cleanup) = unsafe {
            (
                dylib::symbol::<ffi::Init>(&lib, library, ffi::INIT)?,
                dylib::symbol::<ffi::Process>(&lib, library, ffi::PROCESS)?,
                dylib::symbol::<ffi::Cleanup>(&lib, library, ffi::CLEANUP)?,
            )
        };
        Ok(Self {
            init,
            process,
            cleanup,
            _lib: lib,
        })
    }
}

impl EngineAbi for DylibAbi {
    fn init(&mut self, model_path: &CStr) -> i32 {
        unsafe { (self.init)(model_path.as_ptr()) }
    }

    fn process(&mut self, samples: &[f32], out: &mut [f32], out_frames: &mut usize) -> i32 {
        let Ok(count) = c_int::try_from(samples.len()) else {
            return -1;
        };
        let mut frames: c_int = 0;
        let status = unsafe { (self.process)(samples.as_ptr(), count, out.as_mut_ptr(), &mut frames) };
        *out_frames = frames.max(0) as usize;
        status
    }

    fn cleanup(&mut self) {
        unsafe { (self.cleanup)() }
    }
}

/// Backend that drives an [`EngineAbi`].
///
/// The ABI does not report its frame rate or channel count, so both come from
/// configuration.
pub struct SharedLibraryBackend {
    abi: Box<dyn EngineAbi>,
    fps: f32,
    blendshape_count: usize,
}

impl std::fmt::Debug for SharedLibraryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLibraryBackend")
            .field("fps", &self.fps)
            .field("blendshape_count", &self.blendshape_count)
            .finish_non_exhaustive()
    }
}

impl SharedLibraryBackend {
    /// Initializes the engine behind `abi` with the model at `model_path`.
    pub fn initialize(
        mut abi: impl EngineAbi + 'static,
        model_path: &Path,
        fps: f32,
        blendshape_count: usize,
    ) -> Result<Self, EngineError> {
        if fps.is_nan() || fps <= 0.0 || blendshape_count == 0 {
            return Err(EngineError::load(
                "engine config",
                format!("fps={fps} blendshape_count={blendshape_count}"),
            ));
        }
        let model = model_path.display().to_string();
        let c_path = CString::new(model.as_str())
            .map_err(|_| EngineError::load(&model, "path contains a NUL byte"))?;

        let status = abi.init(&c_path);
        if status != 0 {
            return Err(EngineError::load(&model, format!("a2f_init returned {status}")));
        }
        info!(model = %model, fps, blendshapes = blendshape_count, "shared-library backend ready");

        Ok(Self {
            abi: Box::new(abi),
            fps,
            blendshape_count,
        })
    }

    /// Loads the library at `library` and initializes it.
    pub fn open(
        library: &Path,
        model_path: &Path,
        fps: f32,
        blendshape_count: usize,
    ) -> Result<Self, EngineError> {
        Self::initialize(DylibAbi::open(library)?, model_path, fps, blendshape_count)
    }

    /// Frames reserved for `samples` input samples: `ceil(duration * fps) + 1`.
    pub fn frame_capacity(&self, samples: usize) -> usize {
        let duration = samples as f64 / TARGET_SAMPLE_RATE as f64;
        (duration * self.fps as f64).ceil() as usize + 1
    }
}

impl InferenceBackend for SharedLibraryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SharedLibrary
    }

    fn fps(&self) -> f32 {
        self.fps
    }

    fn blendshape_count(&self) -> usize {
        self.blendshape_count
    }

    fn infer(&mut self, waveform: &Waveform) -> Result<AnimationResult, EngineError> {
        let capacity = self.frame_capacity(waveform.len());
        let mut out = vec![0.0f32; capacity * self.blendshape_count];
        let mut frames = 0usize;

        let status = self.abi.process(waveform.samples(), &mut out, &mut frames);
        if status != 0 {
            return Err(EngineError::Inference { code: status });
        }
        if frames > capacity {
            warn!(frames, capacity, "engine overran the output buffer");
            return Err(EngineError::OutputOverflow { frames, capacity });
        }

        out.truncate(frames * self.blendshape_count);
        debug!(frames, capacity, "shared-library inference done");
        AnimationResult::from_flat(out, self.fps, self.blendshape_count)
    }
}

impl Drop for SharedLibraryBackend {
    fn drop(&mut self) {
        self.abi.cleanup();
        debug!("engine cleaned up");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// ABI double that fills `ceil(duration * fps)` frames plus `extra_frames`
    /// and counts cleanups.
    pub(crate) struct FakeAbi {
        pub fps: f64,
        pub channels: usize,
        pub init_status: i32,
        pub process_status: i32,
        pub extra_frames: usize,
        pub cleanups: Arc<AtomicUsize>,
    }

    impl FakeAbi {
        pub(crate) fn new(fps: f64, channels: usize) -> Self {
            Self {
                fps,
                channels,
                init_status: 0,
                process_status: 0,
                extra_frames: 0,
                cleanups: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl EngineAbi for FakeAbi {
        fn init(&mut self, model_path: &CStr) -> i32 {
            assert!(!model_path.to_bytes().is_empty());
            self.init_status
        }

        fn process(&mut self, samples: &[f32], out: &mut [f32], out_frames: &mut usize) -> i32 {
            if self.process_status != 0 {
                return self.process_status;
            }
            let secs = samples.len() as f64 / 16000.0;
            let frames = (secs * self.fps).ceil() as usize + self.extra_frames;
            let writable = (out.len() / self.channels).min(frames);
            for (i, row) in out.chunks_exact_mut(self.channels).take(writable).enumerate() {
                row.fill(i as f32);
            }
            *out_frames = frames;
            0
        }

        fn cleanup(&mut self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn backend(abi: FakeAbi) -> SharedLibraryBackend {
        SharedLibraryBackend::initialize(abi, Path::new("model.json"), 30.0, 72).unwrap()
    }

    #[test]
    fn test_one_second_silence_at_30_fps() {
        let mut b = backend(FakeAbi::new(30.0, 72));
        let r = b.infer(&Waveform::silence(Duration::from_secs(1))).unwrap();
        assert_eq!(r.num_frames(), 30);
        assert_eq!(r.blendshape_count(), 72);
        assert_eq!(r.fps(), 30.0);
        for (i, t) in r.timestamps().iter().enumerate() {
            assert_eq!(*t, i as f64 / 30.0);
        }
        assert_eq!(r.frames()[12].weights, vec![12.0; 72]);
    }

    #[test]
    fn test_frame_capacity() {
        let b = backend(FakeAbi::new(30.0, 72));
        assert_eq!(b.frame_capacity(16000), 31);
        assert_eq!(b.frame_capacity(8000), 16);
        assert_eq!(b.frame_capacity(1), 2);
        assert_eq!(b.frame_capacity(0), 1);
    }

    #[test]
    fn test_one_extra_frame_fits() {
        let mut abi = FakeAbi::new(30.0, 72);
        abi.extra_frames = 1;
        let mut b = backend(abi);
        let r = b.infer(&Waveform::silence(Duration::from_secs(1))).unwrap();
        assert_eq!(r.num_frames(), 31);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut abi = FakeAbi::new(30.0, 72);
        abi.extra_frames = 2;
        let mut b = backend(abi);
        let err = b.infer(&Waveform::silence(Duration::from_secs(1))).unwrap_err();
        assert!(matches!(err, EngineError::OutputOverflow { frames: 32, capacity: 31 }));
        assert!(err.is_inference());
    }

    #[test]
    fn test_process_status() {
        let mut abi = FakeAbi::new(30.0, 72);
        abi.process_status = -3;
        let mut b = backend(abi);
        let err = b.infer(&Waveform::silence(Duration::from_secs(1))).unwrap_err();
        assert!(matches!(err, EngineError::Inference { code: -3 }));
    }

    #[test]
    fn test_init_status() {
        let mut abi = FakeAbi::new(30.0, 72);
        abi.init_status = 4;
        let err = SharedLibraryBackend::initialize(abi, Path::new("model.json"), 30.0, 72)
            .unwrap_err();
        assert!(matches!(err, EngineError::Load { ref reason, .. } if reason.contains("4")));
    }

    #[test]
    fn test_cleanup_on_drop() {
        let abi = FakeAbi::new(30.0, 72);
        let cleanups = abi.cleanups.clone();
        drop(backend(abi));
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_open_missing_library() {
        let err = SharedLibraryBackend::open(
            Path::new("/nonexistent/libengine.so"),
            Path::new("model.json"),
            30.0,
            72,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Load { .. }));
    }
}
