//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::io::Cursor;

use beacon_stream::ErrorKind;
use beacon_stream::voice::{SAMPLE_RATE, decode_mp3, rms, samples_to_wav};

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

#[test]
fn test_samples_to_wav() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    // Check WAV header magic
    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");

    // WAV should have reasonable size
    assert!(wav_data.len() > 44);
}

#[test]
fn test_wav_roundtrip() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(wav_data)).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
    assert_eq!(read_samples[0], 0);
    assert_eq!(read_samples[3], i16::MAX);
    assert_eq!(read_samples[4], -i16::MAX);
}

#[test]
fn test_wav_clamps_out_of_range_samples() {
    let wav_data = samples_to_wav(&[2.0, -2.0], SAMPLE_RATE).unwrap();
    let mut reader = hound::WavReader::new(Cursor::new(wav_data)).unwrap();
    let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read, [i16::MAX, i16::MIN]);
}

#[test]
fn test_wav_keeps_capture_rate() {
    let wav_data = samples_to_wav(&generate_silence(0.05), 44_100).unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav_data)).unwrap();
    assert_eq!(reader.spec().sample_rate, 44_100);
}

#[test]
fn test_rms_of_silence_is_zero() {
    assert!(rms(&generate_silence(0.5)).abs() < f32::EPSILON);
    assert!(rms(&[]).abs() < f32::EPSILON);
}

#[test]
fn test_rms_of_sine() {
    // RMS of a sine is amplitude / sqrt(2)
    let samples = generate_sine_samples(440.0, 1.0, 0.5);
    let expected = 0.5 / std::f32::consts::SQRT_2;
    assert!((rms(&samples) - expected).abs() < 0.01);
}

#[test]
fn test_decode_rejects_non_mp3() {
    let wav = samples_to_wav(&generate_silence(0.1), SAMPLE_RATE).unwrap();
    let err = decode_mp3(&wav).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Playback);
}
