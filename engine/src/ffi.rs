//! C signatures exported by the engine library.
//!
//! Object-style surface (in-process binding):
//!
//! ```c
//! int   a2f_model_create(const char *model_path, int character_index,
//!                        int use_gpu_solver, int constant_noise, void **model);
//! float a2f_model_fps(void *model);
//! int   a2f_model_num_blendshapes(void *model);
//! int   a2f_model_process(void *model, const float *samples, size_t count,
//!                         float **frames, size_t *num_frames);
//! void  a2f_model_free_output(void *model, float *frames);
//! void  a2f_model_destroy(void *model);
//! ```
//!
//! Call convention (shared library, caller-owned output):
//!
//! ```c
//! int  a2f_init(const char *model_path);
//! int  a2f_process(const float *samples, int count, float *out, int *out_frames);
//! void a2f_cleanup(void);
//! ```

use std::os::raw::{c_char, c_float, c_int, c_void};

pub type Status = c_int;
pub type ModelHandle = *mut c_void;

pub type ModelCreate = unsafe extern "C" fn(
    model_path: *const c_char,
    character_index: c_int,
    use_gpu_solver: c_int,
    constant_noise: c_int,
    model: *mut ModelHandle,
) -> Status;
pub type ModelFps = unsafe extern "C" fn(model: ModelHandle) -> c_float;
pub type ModelNumBlendshapes = unsafe extern "C" fn(model: ModelHandle) -> c_int;
pub type ModelProcess = unsafe extern "C" fn(
    model: ModelHandle,
    samples: *const c_float,
    count: usize,
    frames: *mut *mut c_float,
    num_frames: *mut usize,
) -> Status;
pub type ModelFreeOutput = unsafe extern "C" fn(model: ModelHandle, frames: *mut c_float);
pub type ModelDestroy = unsafe extern "C" fn(model: ModelHandle);

pub type Init = unsafe extern "C" fn(model_path: *const c_char) -> Status;
pub type Process = unsafe extern "C" fn(
    samples: *const c_float,
    count: c_int,
    out: *mut c_float,
    out_frames: *mut c_int,
) -> Status;
pub type Cleanup = unsafe extern "C" fn();

pub const MODEL_CREATE: &[u8] = b"a2f_model_create\0";
pub const MODEL_FPS: &[u8] = b"a2f_model_fps\0";
pub const MODEL_NUM_BLENDSHAPES: &[u8] = b"a2f_model_num_blendshapes\0";
pub const MODEL_PROCESS: &[u8] = b"a2f_model_process\0";
pub const MODEL_FREE_OUTPUT: &[u8] = b"a2f_model_free_output\0";
pub const MODEL_DESTROY: &[u8] = b"a2f_model_destroy\0";

pub const INIT: &[u8] = b"a2f_init\0";
pub const PROCESS: &[u8] = b"a2f_process\0";
pub const CLEANUP: &[u8] = b"a2f_cleanup\0";

pub const BINDING_SYMBOLS: &[&[u8]] = &[
    MODEL_CREATE,
    MODEL_FPS,
    MODEL_NUM_BLENDSHAPES,
    MODEL_PROCESS,
    MODEL_FREE_OUTPUT,
    MODEL_DESTROY,
];

pub const SHARED_SYMBOLS: &[&[u8]] = &[INIT, PROCESS, CLEANUP];
