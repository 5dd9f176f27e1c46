//! Normalized mono waveform.

use std::time::Duration;

/// Sample rate every waveform is converted to before inference.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Accepted source sample rates. The resampler's FFT size follows the source
/// rate, so rates outside this range are rejected before resampling.
pub const SOURCE_RATE_RANGE: std::ops::RangeInclusive<u32> = 1_000..=384_000;

/// Mono float PCM at [`TARGET_SAMPLE_RATE`], amplitude within [-1, 1].
///
/// Only the normalizer constructs waveforms from decoded audio, so the
/// amplitude invariant holds for every value that reaches the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    source_rate: u32,
    source_channels: usize,
}

impl Waveform {
    /// Wraps samples that are already mono 16 kHz.
    ///
    /// The caller is responsible for the amplitude invariant; use
    /// [`crate::normalize_samples`] for arbitrary input.
    pub fn from_normalized(samples: Vec<f32>) -> Self {
        Self {
            samples,
            source_rate: TARGET_SAMPLE_RATE,
            source_channels: 1,
        }
    }

    pub(crate) fn with_source(samples: Vec<f32>, source_rate: u32, source_channels: usize) -> Self {
        Self {
            samples,
            source_rate,
            source_channels,
        }
    }

    /// Creates `duration` of silence.
    pub fn silence(duration: Duration) -> Self {
        let n = (duration.as_secs_f64() * TARGET_SAMPLE_RATE as f64).round() as usize;
        Self::from_normalized(vec![0.0; n])
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Always [`TARGET_SAMPLE_RATE`].
    pub fn sample_rate(&self) -> u32 {
        TARGET_SAMPLE_RATE
    }

    /// Sample rate of the clip before resampling.
    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    /// Channel count of the clip before down-mixing.
    pub fn source_channels(&self) -> usize {
        self.source_channels
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / TARGET_SAMPLE_RATE as f64
    }

    /// Largest absolute sample value, 0.0 for an empty waveform.
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }
}

/// NaN is sticky: one NaN sample makes the peak NaN.
pub(crate) fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0f32, |m, a| if a > m || a.is_nan() { a } else { m })
}
