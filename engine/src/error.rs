use thiserror::Error;

/// Errors returned by the inference adapter.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine: not initialized")]
    NotInitialized,

    #[error("engine: already initialized")]
    AlreadyInitialized,

    /// Another inference held the engine past the caller's deadline.
    #[error("engine: busy until the deadline passed")]
    Busy,

    /// The library, the model, or the engine's own initialization failed.
    #[error("engine: load {what}: {reason}")]
    Load { what: String, reason: String },

    #[error("engine: {library} does not export {symbol}")]
    MissingSymbol { library: String, symbol: String },

    /// The engine returned a non-zero status from a processing call.
    #[error("engine: inference failed with status {code}")]
    Inference { code: i32 },

    #[error("engine: reported {frames} frames but the output buffer holds {capacity}")]
    OutputOverflow { frames: usize, capacity: usize },

    #[error("engine: malformed output: {0}")]
    MalformedOutput(String),
}

impl EngineError {
    /// True for errors raised while processing audio, as opposed to errors
    /// about engine availability.
    pub fn is_inference(&self) -> bool {
        matches!(
            self,
            EngineError::Inference { .. }
                | EngineError::OutputOverflow { .. }
                | EngineError::MalformedOutput(_)
        )
    }

    pub(crate) fn load(what: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        EngineError::Load {
            what: what.to_string(),
            reason: reason.to_string(),
        }
    }
}
