//! Audio normalization for blendshape inference.
//!
//! Every clip accepted by the service goes through the same fixed pipeline
//! before it reaches the inference engine:
//!
//! 1. decode the container (WAV, MP3, OGG/Vorbis, FLAC)
//! 2. down-mix to mono by averaging channels
//! 3. resample to 16 kHz with a fixed-parameter FFT resampler
//! 4. scale by the peak if the peak exceeds 1.0
//!
//! # Example
//!
//! ```no_run
//! use visage_audio::{normalize_file, TARGET_SAMPLE_RATE};
//!
//! let waveform = normalize_file("speech.wav").unwrap();
//! assert_eq!(waveform.sample_rate(), TARGET_SAMPLE_RATE);
//! assert!(waveform.peak() <= 1.0);
//! ```

mod decode;
mod error;
mod normalize;
pub mod resample;
mod waveform;
mod wav;

pub use decode::{decode, decode_owned, Decoded};
pub use error::AudioError;
pub use normalize::{downmix, normalize, normalize_file, normalize_samples, peak_normalize};
pub use waveform::{Waveform, SOURCE_RATE_RANGE, TARGET_SAMPLE_RATE};
pub use wav::{encode_wav, write_wav};
