//! Common audio types for stemforge
//!
//! Every stem, stretched stem and fusion mix moves through the crate as a
//! [`StereoBuffer`] tagged with its sample rate ([`AudioClip`]). Mono sources
//! are duplicated into both channels at decode time so downstream code never
//! has to branch on channel count.

use std::ops::{Index, IndexMut};

/// Sample rate the separation engine writes its stems at
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Audio sample type (32-bit float for processing)
pub type Sample = f32;

/// A single stereo sample (left and right channels)
///
/// `#[repr(C)]` guarantees the [left, right] layout, so a `&[StereoSample]`
/// can be viewed as interleaved `&[f32]` with bytemuck (no per-frame copy).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Same value in both channels
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Average of both channels
    #[inline]
    pub fn to_mono(&self) -> Sample {
        (self.left + self.right) * 0.5
    }

    /// Max of abs(left), abs(right)
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

impl std::ops::MulAssign<Sample> for StereoSample {
    #[inline]
    fn mul_assign(&mut self, factor: Sample) {
        self.left *= factor;
        self.right *= factor;
    }
}

/// A buffer of stereo samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    /// Create a buffer from interleaved samples [L, R, L, R, ...]
    ///
    /// A trailing odd sample is dropped.
    pub fn from_interleaved(interleaved: &[Sample]) -> Self {
        let samples = interleaved
            .chunks_exact(2)
            .map(|chunk| StereoSample::new(chunk[0], chunk[1]))
            .collect();
        Self { samples }
    }

    /// Create a buffer from separate left and right channel slices
    pub fn from_channels(left: &[Sample], right: &[Sample]) -> Self {
        let samples = left
            .iter()
            .zip(right.iter())
            .map(|(&l, &r)| StereoSample::new(l, r))
            .collect();
        Self { samples }
    }

    pub fn from_vec(samples: Vec<StereoSample>) -> Self {
        Self { samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Resize the buffer, filling with silence if growing
    pub fn resize(&mut self, new_len: usize) {
        self.samples.resize(new_len, StereoSample::silence());
    }

    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.samples.truncate(len);
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }

    /// Zero-copy view of samples as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved(&self) -> &[Sample] {
        bytemuck::cast_slice(&self.samples)
    }

    /// Zero-copy mutable view of samples as interleaved f32 [L, R, L, R, ...]
    #[inline]
    pub fn as_interleaved_mut(&mut self) -> &mut [Sample] {
        bytemuck::cast_slice_mut(&mut self.samples)
    }

    /// Split into planar left/right channels
    pub fn to_channels(&self) -> (Vec<Sample>, Vec<Sample>) {
        self.samples.iter().map(|s| (s.left, s.right)).unzip()
    }

    /// Mono mixdown (average of both channels)
    pub fn to_mono(&self) -> Vec<Sample> {
        self.samples.iter().map(StereoSample::to_mono).collect()
    }

    /// Additively mix `other` into this buffer, scaled by `gain`
    ///
    /// The buffer grows to the longer of the two lengths; the tail of the
    /// shorter signal is treated as silence.
    pub fn overlay(&mut self, other: &StereoBuffer, gain: Sample) {
        if other.len() > self.len() {
            self.resize(other.len());
        }
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            *dst += *src * gain;
        }
    }

    /// Scale all samples by a factor
    pub fn scale(&mut self, factor: Sample) {
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }

    #[inline]
    pub fn push(&mut self, sample: StereoSample) {
        self.samples.push(sample);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StereoSample> {
        self.samples.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StereoSample> {
        self.samples.iter_mut()
    }

    /// Peak amplitude in the buffer
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.peak()).fold(0.0, Sample::max)
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

/// Decoded audio: a stereo buffer plus the rate it was recorded at
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub buffer: StereoBuffer,
}

impl AudioClip {
    pub fn new(sample_rate: u32, buffer: StereoBuffer) -> Self {
        Self { sample_rate, buffer }
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.buffer.len()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.buffer.len() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_view_matches_layout() {
        let buffer = StereoBuffer::from_vec(vec![
            StereoSample::new(0.1, 0.2),
            StereoSample::new(0.3, 0.4),
        ]);
        assert_eq!(buffer.as_interleaved(), &[0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_overlay_extends_and_scales() {
        let mut mix = StereoBuffer::from_vec(vec![StereoSample::mono(1.0)]);
        let other = StereoBuffer::from_vec(vec![StereoSample::mono(1.0), StereoSample::mono(0.5)]);

        mix.overlay(&other, 0.5);

        assert_eq!(mix.len(), 2);
        assert_eq!(mix[0], StereoSample::mono(1.5));
        assert_eq!(mix[1], StereoSample::mono(0.25));
    }

    #[test]
    fn test_to_mono_averages_channels() {
        let buffer = StereoBuffer::from_channels(&[1.0, 0.0], &[0.0, -1.0]);
        assert_eq!(buffer.to_mono(), vec![0.5, -0.5]);
    }

    #[test]
    fn test_clip_duration() {
        let clip = AudioClip::new(100, StereoBuffer::silence(250));
        assert!((clip.duration_secs() - 2.5).abs() < 1e-9);
    }
}
