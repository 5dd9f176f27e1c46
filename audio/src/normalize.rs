//! The normalization pipeline: decode → down-mix → resample → peak-scale.

use std::path::Path;

use tracing::debug;

use crate::decode::{decode_owned, Decoded};
use crate::error::AudioError;
use crate::resample::resample;
use crate::waveform::{peak, Waveform, SOURCE_RATE_RANGE, TARGET_SAMPLE_RATE};

/// Normalizes an in-memory audio file.
pub fn normalize(data: &[u8], extension: Option<&str>) -> Result<Waveform, AudioError> {
    normalize_owned(data.to_vec(), extension)
}

fn normalize_owned(data: Vec<u8>, extension: Option<&str>) -> Result<Waveform, AudioError> {
    let decoded = decode_owned(data, extension)?;
    normalize_decoded(decoded)
}

/// Reads and normalizes an audio file from disk.
pub fn normalize_file(path: impl AsRef<Path>) -> Result<Waveform, AudioError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let ext = path.extension().and_then(|e| e.to_str());
    normalize_owned(data, ext)
}

/// Normalizes raw interleaved samples.
pub fn normalize_samples(
    interleaved: &[f32],
    sample_rate: u32,
    channels: usize,
) -> Result<Waveform, AudioError> {
    normalize_decoded(Decoded {
        samples: interleaved.to_vec(),
        sample_rate,
        channels,
    })
}

fn normalize_decoded(decoded: Decoded) -> Result<Waveform, AudioError> {
    let Decoded {
        samples,
        sample_rate,
        channels,
    } = decoded;

    if channels == 0 {
        return Err(AudioError::Decode("zero channels".into()));
    }
    if samples.is_empty() {
        return Err(AudioError::EmptyInput);
    }
    if !SOURCE_RATE_RANGE.contains(&sample_rate) {
        return Err(AudioError::Decode(format!(
            "unsupported sample rate {sample_rate} Hz (accepted {}..={} Hz)",
            SOURCE_RATE_RANGE.start(),
            SOURCE_RATE_RANGE.end()
        )));
    }
    if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
        return Err(AudioError::Decode(format!("non-finite sample at index {i}")));
    }

    let mono = downmix(&samples, channels);
    let mut mono = if sample_rate != TARGET_SAMPLE_RATE {
        resample(&mono, sample_rate, TARGET_SAMPLE_RATE)?
    } else {
        mono
    };
    if mono.is_empty() {
        return Err(AudioError::EmptyInput);
    }

    let scaled_from = peak_normalize(&mut mono);
    debug!(
        source_rate = sample_rate,
        source_channels = channels,
        samples = mono.len(),
        scaled_from,
        "normalized waveform"
    );

    Ok(Waveform::with_source(mono, sample_rate, channels))
}

/// Averages each frame's channels into one sample.
///
/// `mono[i] = (x[i,0] + … + x[i,C-1]) / C`. A trailing partial frame is
/// dropped.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Divides every sample by the peak when the peak exceeds 1.0.
///
/// Returns the peak that was scaled away, or `None` when the samples were left
/// untouched (already within range, or silence).
pub fn peak_normalize(samples: &mut [f32]) -> Option<f32> {
    let p = peak(samples);
    if p > 1.0 {
        for s in samples.iter_mut() {
            *s /= p;
        }
        Some(p)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::{encode_wav, tests::wav_bytes};

    #[test]
    fn test_downmix_averages() {
        let mono = downmix(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_downmix_three_channels() {
        let mono = downmix(&[0.3, 0.6, 0.9], 3);
        assert!((mono[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_peak_normalize_scales_loud_input() {
        let mut s = vec![2.0, -4.0, 1.0];
        assert_eq!(peak_normalize(&mut s), Some(4.0));
        assert_eq!(s, vec![0.5, -1.0, 0.25]);
    }

    #[test]
    fn test_peak_normalize_leaves_quiet_input() {
        let mut s = vec![0.2, -0.9];
        assert_eq!(peak_normalize(&mut s), None);
        assert_eq!(s, vec![0.2, -0.9]);
    }

    #[test]
    fn test_peak_normalize_silence() {
        let mut s = vec![0.0; 100];
        assert_eq!(peak_normalize(&mut s), None);
        assert!(s.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_normalize_samples_loud_stereo_44k() {
        let interleaved: Vec<f32> = (0..44100 * 2)
            .map(|i| ((i / 2) as f32 * 0.05).sin() * 3.0)
            .collect();
        let w = normalize_samples(&interleaved, 44100, 2).unwrap();
        assert_eq!(w.sample_rate(), TARGET_SAMPLE_RATE);
        assert_eq!(w.len(), 16000);
        assert!(w.peak() <= 1.0);
        assert_eq!(w.source_rate(), 44100);
        assert_eq!(w.source_channels(), 2);
    }

    #[test]
    fn test_normalize_rejects_out_of_range_rates() {
        for rate in [999, 384_001, 1_000_003, 10_000_019] {
            let err = normalize_samples(&[0.1; 64], rate, 1).unwrap_err();
            assert!(matches!(err, AudioError::Decode(ref m) if m.contains("sample rate")), "{rate}");
        }
        assert!(normalize_samples(&[0.1; 64], 384_000, 1).is_ok());
    }

    #[test]
    fn test_normalize_wav_header_rate_rejected() {
        let data = wav_bytes(&[0.1; 64], 1_000_003, 1);
        let err = normalize(&data, Some("wav")).unwrap_err();
        assert!(matches!(err, AudioError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn test_normalize_rejects_non_finite_samples() {
        let mut samples = vec![0.25f32; 8000];
        samples[10] = f32::NAN;
        let err = normalize_samples(&samples, 16000, 1).unwrap_err();
        assert!(matches!(err, AudioError::Decode(ref m) if m.contains("index 10")));

        samples[10] = 0.0;
        samples[20] = f32::INFINITY;
        assert!(matches!(
            normalize_samples(&samples, 16000, 1),
            Err(AudioError::Decode(_))
        ));
    }

    #[test]
    fn test_normalize_float_wav_with_nan() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..8000 {
                let s = match i {
                    100 => f32::NAN,
                    200 => f32::INFINITY,
                    _ => 0.5,
                };
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        let err = normalize(&cursor.into_inner(), Some("wav")).unwrap_err();
        assert!(matches!(err, AudioError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn test_normalize_empty_samples() {
        let err = normalize_samples(&[], 16000, 1).unwrap_err();
        assert!(matches!(err, AudioError::EmptyInput));
    }

    #[test]
    fn test_normalize_wav_roundtrip_keeps_invariants() {
        let interleaved: Vec<f32> = (0..24000).map(|i| (i as f32 * 0.01).sin() * 0.9).collect();
        let data = wav_bytes(&interleaved, 24000, 1);

        let first = normalize(&data, Some("wav")).unwrap();
        let again = normalize(&encode_wav(&first).unwrap(), Some("wav")).unwrap();
        assert_eq!(again.sample_rate(), TARGET_SAMPLE_RATE);
        assert_eq!(again.len(), first.len());
        assert!(again.peak() <= 1.0);
    }

    #[test]
    fn test_normalize_silence_roundtrip() {
        let silence = Waveform::from_normalized(vec![0.0; 16000]);
        let data = encode_wav(&silence).unwrap();
        let w = normalize(&data, Some("wav")).unwrap();
        assert_eq!(w.len(), 16000);
        assert!(w.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_normalize_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, wav_bytes(&vec![0.25; 8000], 8000, 1)).unwrap();

        let w = normalize_file(&path).unwrap();
        assert_eq!(w.len(), 16000);
    }

    #[test]
    fn test_normalize_file_missing() {
        let err = normalize_file("/nonexistent/clip.wav").unwrap_err();
        assert!(matches!(err, AudioError::Io(_)));
    }
}
