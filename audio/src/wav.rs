//! 16-bit PCM WAV output.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::AudioError;
use crate::waveform::{Waveform, TARGET_SAMPLE_RATE};

const SPEC: WavSpec = WavSpec {
    channels: 1,
    sample_rate: TARGET_SAMPLE_RATE,
    bits_per_sample: 16,
    sample_format: SampleFormat::Int,
};

fn to_i16(s: f32) -> i16 {
    (s * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Encodes a waveform as a mono 16 kHz 16-bit WAV file in memory.
pub fn encode_wav(waveform: &Waveform) -> Result<Vec<u8>, AudioError> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, SPEC)?;
        for &s in waveform.samples() {
            writer.write_sample(to_i16(s))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Writes a waveform to `path` as a mono 16 kHz 16-bit WAV file.
pub fn write_wav(path: impl AsRef<Path>, waveform: &Waveform) -> Result<(), AudioError> {
    let mut writer = WavWriter::create(path, SPEC)?;
    for &s in waveform.samples() {
        writer.write_sample(to_i16(s))?;
    }
    writer.finalize()?;
    Ok(())
}
