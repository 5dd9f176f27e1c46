use thiserror::Error;

/// Errors returned by the audio pipeline.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio: decode: {0}")]
    Decode(String),

    #[error("audio: input decoded to zero samples")]
    EmptyInput,

    #[error("audio: resample: {0}")]
    Resample(String),

    #[error("audio: wav: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio: io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rubato::ResamplerConstructionError> for AudioError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        AudioError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for AudioError {
    fn from(e: rubato::ResampleError) -> Self {
        AudioError::Resample(e.to_string())
    }
}
