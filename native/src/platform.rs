//! Native primitives used by the bring-up sequence.

use std::os::raw::c_int;
use std::ptr;

use libloading::Library;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::NativeError;
use crate::ffi;

/// Device ordinal handle returned by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device(pub i32);

/// Opaque context handle returned by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context(pub usize);

/// Black-box native calls, each reporting success or a status code.
///
/// Implementations keep whatever they load alive for as long as they exist;
/// see [`CudaPlatform::make_resident`] for keeping it for the whole process.
pub trait Platform {
    /// Loads a shared library with global symbol visibility.
    fn preload(&mut self, library: &str) -> Result<(), NativeError>;

    /// Initializes the low-level driver interface.
    fn driver_init(&mut self) -> Result<(), NativeError>;

    /// Returns the number of compute devices.
    fn device_count(&mut self) -> Result<i32, NativeError>;

    /// Returns the device handle for an ordinal.
    fn device_get(&mut self, ordinal: i32) -> Result<Device, NativeError>;

    /// Retains the primary context of a device.
    fn primary_context_retain(&mut self, device: Device) -> Result<Context, NativeError>;

    /// Makes a context current on the calling thread.
    fn context_set_current(&mut self, context: Context) -> Result<(), NativeError>;

    /// Selects the device on the higher-level runtime.
    fn runtime_set_device(&mut self, ordinal: i32) -> Result<(), NativeError>;

    /// Forces the runtime to finish lazy initialization.
    fn runtime_warm_up(&mut self) -> Result<(), NativeError>;
}

/// Libraries that must stay mapped until the process exits.
static RESIDENT: Lazy<Mutex<Vec<Library>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Opens a shared library by name or path, exporting its symbols globally.
pub fn open_global(name: &str) -> Result<Library, NativeError> {
    #[cfg(unix)]
    let lib = {
        use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
        unsafe { UnixLibrary::open(Some(name), RTLD_NOW | RTLD_GLOBAL) }.map(Library::from)
    };
    #[cfg(not(unix))]
    let lib = unsafe { Library::new(name) };

    lib.map_err(|e| NativeError::Load {
        library: name.to_string(),
        reason: e.to_string(),
    })
}

/// CUDA driver + runtime, resolved with `dlopen` at run time.
pub struct CudaPlatform {
    driver_library: String,
    runtime_library: String,
    driver: Option<Library>,
    runtime: Option<Library>,
    preloaded: Vec<Library>,
}

impl CudaPlatform {
    pub fn new(driver_library: impl Into<String>, runtime_library: impl Into<String>) -> Self {
        Self {
            driver_library: driver_library.into(),
            runtime_library: runtime_library.into(),
            driver: None,
            runtime: None,
            preloaded: Vec::new(),
        }
    }

    /// Moves every library this platform opened into process-wide storage so
    /// that native global state survives dropping the platform.
    pub fn make_resident(self) {
        let mut resident = RESIDENT.lock();
        resident.extend(self.preloaded);
        resident.extend(self.driver);
        resident.extend(self.runtime);
    }

    fn driver(&mut self) -> Result<&Library, NativeError> {
        let lib = match self.driver.take() {
            Some(lib) => lib,
            None => open_global(&self.driver_library)?,
        };
        Ok(self.driver.insert(lib))
    }

    fn runtime(&mut self) -> Result<&Library, NativeError> {
        let lib = match self.runtime.take() {
            Some(lib) => lib,
            None => open_global(&self.runtime_library)?,
        };
        Ok(self.runtime.insert(lib))
    }
}

/// Resolves `symbol` in `lib` as a function pointer of type `T`.
///
/// # Safety
///
/// `T` must match the C signature of the exported symbol.
unsafe fn resolve<T: Copy>(lib: &Library, library: &str, symbol: &[u8]) -> Result<T, NativeError> {
    let sym = unsafe { lib.get::<T>(symbol) }.map_err(|e| NativeError::Symbol {
        library: library.to_string(),
        symbol: String::from_utf8_lossy(&symbol[..symbol.len() - 1]).into_owned(),
        reason: e.to_string(),
    })?;
    Ok(*sym)
}

impl Platform for CudaPlatform {
    fn preload(&mut self, library: &str) -> Result<(), NativeError> {
        let lib = open_global(library)?;
        debug!(library, "preloaded");
        self.preloaded.push(lib);
        Ok(())
    }

    fn driver_init(&mut self) -> Result<(), NativeError> {
        let name = self.driver_library.clone();
        let f: ffi::CuInit = unsafe { resolve(self.driver()?, &name, ffi::CU_INIT)? };
        NativeError::check("cuInit", unsafe { f(0) })
    }

    fn device_count(&mut self) -> Result<i32, NativeError> {
        let name = self.driver_library.clone();
        let f: ffi::CuDeviceGetCount =
            unsafe { resolve(self.driver()?, &name, ffi::CU_DEVICE_GET_COUNT)? };
        let mut count: c_int = 0;
        NativeError::check("cuDeviceGetCount", unsafe { f(&mut count) })?;
        Ok(count)
    }

    fn device_get(&mut self, ordinal: i32) -> Result<Device, NativeError> {
        let name = self.driver_library.clone();
        let f: ffi::CuDeviceGet = unsafe { resolve(self.driver()?, &name, ffi::CU_DEVICE_GET)? };
        let mut device: ffi::CuDevice = 0;
        NativeError::check("cuDeviceGet", unsafe { f(&mut device, ordinal) })?;
        Ok(Device(device))
    }

    fn primary_context_retain(&mut self, device: Device) -> Result<Context, NativeError> {
        let name = self.driver_library.clone();
        let f: ffi::CuDevicePrimaryCtxRetain =
            unsafe { resolve(self.driver()?, &name, ffi::CU_DEVICE_PRIMARY_CTX_RETAIN)? };
        let mut ctx: ffi::CuContext = ptr::null_mut();
        NativeError::check("cuDevicePrimaryCtxRetain", unsafe { f(&mut ctx, device.0) })?;
        Ok(Context(ctx as usize))
    }

    fn context_set_current(&mut self, context: Context) -> Result<(), NativeError> {
        let name = self.driver_library.clone();
        let f: ffi::CuCtxSetCurrent =
            unsafe { resolve(self.driver()?, &name, ffi::CU_CTX_SET_CURRENT)? };
        NativeError::check("cuCtxSetCurrent", unsafe { f(context.0 as ffi::CuContext) })
    }

    fn runtime_set_device(&mut self, ordinal: i32) -> Result<(), NativeError> {
        let name = self.runtime_library.clone();
        let f: ffi::CudaSetDevice =
            unsafe { resolve(self.runtime()?, &name, ffi::CUDA_SET_DEVICE)? };
        NativeError::check("cudaSetDevice", unsafe { f(ordinal) })
    }

    fn runtime_warm_up(&mut self) -> Result<(), NativeError> {
        let name = self.runtime_library.clone();
        let f: ffi::CudaFree = unsafe { resolve(self.runtime()?, &name, ffi::CUDA_FREE)? };
        NativeError::check("cudaFree", unsafe { f(ptr::null_mut()) })
    }
}
