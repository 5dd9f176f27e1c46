//! Function signatures of the CUDA driver and runtime entry points we call.
//!
//! These match `cuda.h` and `cuda_runtime_api.h` for the subset used during
//! bring-up. They are resolved at run time with `libloading`, so nothing
//! links against the GPU libraries at build time.

use std::os::raw::{c_int, c_uint, c_void};

/// `CUresult` / `cudaError_t`: 0 on success.
pub type Status = c_int;
/// `CUdevice`.
pub type CuDevice = c_int;
/// `CUcontext` (opaque).
pub type CuContext = *mut c_void;

// Driver API (libcuda).
pub type CuInit = unsafe extern "C" fn(flags: c_uint) -> Status;
pub type CuDeviceGetCount = unsafe extern "C" fn(count: *mut c_int) -> Status;
pub type CuDeviceGet = unsafe extern "C" fn(device: *mut CuDevice, ordinal: c_int) -> Status;
pub type CuDevicePrimaryCtxRetain =
    unsafe extern "C" fn(ctx: *mut CuContext, device: CuDevice) -> Status;
pub type CuCtxSetCurrent = unsafe extern "C" fn(ctx: CuContext) -> Status;

// Runtime API (libcudart).
pub type CudaSetDevice = unsafe extern "C" fn(device: c_int) -> Status;
pub type CudaFree = unsafe extern "C" fn(ptr: *mut c_void) -> Status;

pub const CU_INIT: &[u8] = b"cuInit\0";
pub const CU_DEVICE_GET_COUNT: &[u8] = b"cuDeviceGetCount\0";
pub const CU_DEVICE_GET: &[u8] = b"cuDeviceGet\0";
pub const CU_DEVICE_PRIMARY_CTX_RETAIN: &[u8] = b"cuDevicePrimaryCtxRetain\0";
pub const CU_CTX_SET_CURRENT: &[u8] = b"cuCtxSetCurrent\0";
pub const CUDA_SET_DEVICE: &[u8] = b"cudaSetDevice\0";
pub const CUDA_FREE: &[u8] = b"cudaFree\0";
