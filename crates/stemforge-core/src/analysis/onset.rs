//! Onset-strength envelope
//!
//! Spectral flux over a log-compressed STFT magnitude. Each output value is
//! the summed positive change in energy between consecutive frames, so
//! percussive attacks show up as sharp peaks.

use realfft::RealFftPlanner;

/// STFT window length
pub const FRAME_SIZE: usize = 2048;
/// STFT hop length (75% overlap)
pub const HOP_SIZE: usize = 512;

/// Log compression factor applied to magnitudes before differencing
const LOG_COMPRESSION: f32 = 1000.0;

/// Length of the moving average subtracted from the raw flux
const DETREND_FRAMES: usize = 16;

/// Compute the onset-strength envelope of a mono signal
///
/// Returns one value per hop. Returns an empty envelope if the signal is
/// shorter than a single frame or the FFT cannot be computed.
pub fn onset_envelope(samples: &[f32]) -> Vec<f32> {
    if samples.len() < FRAME_SIZE {
        return Vec::new();
    }

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FRAME_SIZE);
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();

    let window: Vec<f32> = (0..FRAME_SIZE)
        .map(|i| {
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / FRAME_SIZE as f32).cos()
        })
        .collect();

    let num_frames = 1 + (samples.len() - FRAME_SIZE) / HOP_SIZE;
    let bins = spectrum.len();
    let mut previous = vec![0.0f32; bins];
    let mut current = vec![0.0f32; bins];
    let mut flux = Vec::with_capacity(num_frames);

    for frame in 0..num_frames {
        let start = frame * HOP_SIZE;
        for (i, slot) in input.iter_mut().enumerate() {
            *slot = samples[start + i] * window[i];
        }

        if let Err(e) = fft.process(&mut input, &mut spectrum) {
            log::warn!("onset_envelope: FFT failed at frame {}: {}", frame, e);
            return Vec::new();
        }

        for (bin, value) in spectrum.iter().enumerate() {
            current[bin] = (1.0 + LOG_COMPRESSION * value.norm()).ln();
        }

        // First frame has no predecessor
        let strength = if frame == 0 {
            0.0
        } else {
            current
                .iter()
                .zip(previous.iter())
                .map(|(c, p)| (c - p).max(0.0))
                .sum::<f32>()
                / bins as f32
        };
        flux.push(strength);
        std::mem::swap(&mut previous, &mut current);
    }

    detrend(&flux)
}

/// Subtract a trailing moving average and half-wave rectify
fn detrend(flux: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(flux.len());
    let mut running = 0.0f32;
    for (i, &value) in flux.iter().enumerate() {
        running += value;
        if i >= DETREND_FRAMES {
            running -= flux[i - DETREND_FRAMES];
        }
        let window = (i + 1).min(DETREND_FRAMES) as f32;
        out.push((value - running / window).max(0.0));
    }
    out
}
