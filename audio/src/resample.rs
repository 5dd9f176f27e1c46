//! Fixed-parameter mono resampling.
//!
//! Uses rubato's synchronous FFT resampler with a constant chunk size, so the
//! same input always produces the same output. The final partial chunk is
//! zero-padded, the resampler's output delay is trimmed, and the result is cut
//! to exactly `ceil(len * dst / src)` samples.

use rubato::{FftFixedInOut, Resampler};

use crate::error::AudioError;
use crate::waveform::SOURCE_RATE_RANGE;

/// Input frames handed to the FFT resampler per call.
pub const CHUNK_FRAMES: usize = 1024;

/// Number of output samples for `input_len` samples converted from
/// `src_rate` to `dst_rate`.
pub fn output_len(input_len: usize, src_rate: u32, dst_rate: u32) -> usize {
    let num = input_len as u64 * dst_rate as u64;
    num.div_ceil(src_rate as u64) as usize
}

/// Resamples mono samples from `src_rate` to `dst_rate`.
pub fn resample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Result<Vec<f32>, AudioError> {
    if !SOURCE_RATE_RANGE.contains(&src_rate) || !SOURCE_RATE_RANGE.contains(&dst_rate) {
        return Err(AudioError::Resample(format!(
            "invalid sample rate {src_rate} -> {dst_rate}"
        )));
    }
    if src_rate == dst_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(src_rate as usize, dst_rate as usize, CHUNK_FRAMES, 1)?;
    let delay = resampler.output_delay();
    let expected = output_len(samples.len(), src_rate, dst_rate);

    let mut out: Vec<f32> = Vec::with_capacity(expected + delay + resampler.output_frames_max());
    let mut input: Vec<f32> = Vec::with_capacity(resampler.input_frames_max());
    let mut pos = 0;

    // Keep feeding (zero-padded once the input runs out) until the delayed
    // tail has been flushed.
    while out.len() < expected + delay {
        let need = resampler.input_frames_next();
        input.clear();
        if pos < samples.len() {
            let end = (pos + need).min(samples.len());
            input.extend_from_slice(&samples[pos..end]);
            pos = end;
        }
        input.resize(need, 0.0);

        let output = resampler.process(&[input.as_slice()], None)?;
        out.extend_from_slice(&output[0]);
    }

    out.drain(..delay);
    out.truncate(expected);
    Ok(out)
}
