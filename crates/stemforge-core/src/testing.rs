//! Synthetic signals for tests
//!
//! Enabled for this crate's own tests and, through the `test-util` feature,
//! for downstream crates that need deterministic audio fixtures.

use std::path::Path;

use crate::audio_file::{write_wav, Result};
use crate::types::{AudioClip, StereoBuffer, StereoSample};

/// Length of a single click
const CLICK_SECS: f64 = 0.02;

/// Click pitch
const CLICK_HZ: f64 = 1000.0;

/// A metronome: one exponentially decaying 1 kHz burst per beat
pub fn click_track(bpm: f64, duration_secs: f64, sample_rate: u32) -> AudioClip {
    let total = (duration_secs * sample_rate as f64).round() as usize;
    let beat = 60.0 / bpm * sample_rate as f64;
    let click_len = (CLICK_SECS * sample_rate as f64) as usize;

    let mut buffer = StereoBuffer::silence(total);
    let mut n = 0usize;
    loop {
        let start = (n as f64 * beat).round() as usize;
        if start >= total {
            break;
        }
        let end = (start + click_len).min(total);
        for i in start..end {
            let t = (i - start) as f64 / sample_rate as f64;
            let envelope = (-t / (CLICK_SECS / 4.0)).exp();
            let value = (2.0 * std::f64::consts::PI * CLICK_HZ * t).sin() * envelope * 0.8;
            buffer[i] = StereoSample::mono(value as f32);
        }
        n += 1;
    }

    AudioClip::new(sample_rate, buffer)
}

/// A steady sine tone in both channels
pub fn sine_tone(freq: f64, amplitude: f32, duration_secs: f64, sample_rate: u32) -> AudioClip {
    let total = (duration_secs * sample_rate as f64).round() as usize;
    let buffer = StereoBuffer::from_vec(
        (0..total)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                StereoSample::mono((2.0 * std::f64::consts::PI * freq * t).sin() as f32 * amplitude)
            })
            .collect(),
    );
    AudioClip::new(sample_rate, buffer)
}

/// Write a click track straight to a WAV file
pub fn write_click_track(path: &Path, bpm: f64, duration_secs: f64, sample_rate: u32) -> Result<()> {
    write_wav(path, &click_track(bpm, duration_secs, sample_rate))
}
