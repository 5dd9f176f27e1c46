use criterion::{black_box, criterion_group, criterion_main, Criterion};
use visage_audio::{normalize, normalize_samples, resample, Waveform};

fn stereo_clip(rate: u32, secs: f32) -> Vec<f32> {
    let frames = (rate as f32 * secs) as usize;
    let mut data = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f32 / rate as f32;
        data.push((2.0 * std::f32::consts::PI * 220.0 * t).sin() * 1.5);
        data.push((2.0 * std::f32::consts::PI * 330.0 * t).sin() * 0.5);
    }
    data
}

fn bench_resample_44k(c: &mut Criterion) {
    let mono: Vec<f32> = stereo_clip(44100, 4.0).into_iter().step_by(2).collect();

    c.bench_function("resample_44k_to_16k_4s", |b| {
        b.iter(|| {
            let out = resample::resample(black_box(&mono), 44100, 16000).unwrap();
            black_box(out);
        });
    });
}

fn bench_normalize_samples(c: &mut Criterion) {
    let data = stereo_clip(48000, 4.0);

    c.bench_function("normalize_stereo_48k_4s", |b| {
        b.iter(|| {
            let w = normalize_samples(black_box(&data), 48000, 2).unwrap();
            black_box(w.peak());
        });
    });
}

fn bench_normalize_wav(c: &mut Criterion) {
    let w = Waveform::from_normalized(stereo_clip(16000, 4.0).into_iter().step_by(2).map(|s| s / 1.5).collect());
    let wav = visage_audio::encode_wav(&w).unwrap();

    c.bench_function("normalize_wav_16k_4s", |b| {
        b.iter(|| {
            let w = normalize(black_box(&wav), Some("wav")).unwrap();
            black_box(w.len());
        });
    });
}

criterion_group!(benches, bench_resample_44k, bench_normalize_samples, bench_normalize_wav);
criterion_main!(benches);
