use thiserror::Error;

/// Errors returned by native bring-up primitives.
#[derive(Debug, Clone, Error)]
pub enum NativeError {
    #[error("native: load {library:?}: {reason}")]
    Load { library: String, reason: String },

    #[error("native: symbol {symbol:?} in {library:?}: {reason}")]
    Symbol {
        library: String,
        symbol: String,
        reason: String,
    },

    #[error("native: {call} returned {code}")]
    Status { call: &'static str, code: i32 },

    #[error("native: no compute device found")]
    NoDevice,

    #[error("native: panic in {0}")]
    Panic(String),

    #[error("native: bring-up failed (driver: {driver}; runtime: {runtime})")]
    BringUpFailed { driver: String, runtime: String },
}

impl NativeError {
    /// Maps a non-zero status code from `call` to an error.
    pub fn check(call: &'static str, code: i32) -> Result<(), NativeError> {
        if code == 0 {
            Ok(())
        } else {
            Err(NativeError::Status { call, code })
        }
    }
}
