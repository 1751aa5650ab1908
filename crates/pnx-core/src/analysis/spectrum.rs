//! Spectral Estimation
//!
//! Welch averaged-periodogram PSD estimation with windowing, overlap,
//! per-segment detrending, power or power-density scaling and one- or
//! two-sided output.
//!
//! ## Segmentation
//!
//! ```text
//! input   |=================================================|
//! seg 0   |-----L-----|
//! seg 1         |-----L-----|            step = L - overlap
//! seg 2               |-----L-----|
//! ...                                     trailing samples that do not
//!                                         fill a segment are ignored
//! ```
//!
//! Each segment is detrended, windowed and transformed; the squared
//! magnitudes are averaged across segments. Longer segments give finer
//! resolution (`fs / L`) but fewer averages and therefore more variance.
//!
//! ## Scaling
//!
//! | Mode       | Factor             | Units       |
//! |------------|--------------------|-------------|
//! | `Spectrum` | `1 / (Σw)²`        | signal²     |
//! | `Density`  | `1 / (fs · Σw²)`   | signal²/Hz  |
//!
//! The ratio between the two is the window's equivalent noise bandwidth
//! `fs · Σw² / (Σw)²`. Density estimates integrate to the mean square of the
//! input; with [`Detrend::Constant`] the segment means are removed first and
//! the integral is the variance instead.

use crate::fft_utils::{fft_frequencies, rfft_frequencies, FftProcessor};
use crate::types::{check_sample_rate, DspError, DspResult, IQSample};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Window functions for spectral analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowFunction {
    /// No windowing (rectangular)
    Rectangular,
    /// Hann window (default) - good general purpose
    #[default]
    Hann,
    /// Hamming window - slightly less sidelobe suppression than Hann
    Hamming,
    /// Blackman window - excellent sidelobe suppression
    Blackman,
    /// Blackman-Harris window - very low sidelobes
    BlackmanHarris,
    /// Flat-top window - accurate amplitude measurement
    FlatTop,
}

impl WindowFunction {
    /// Generate periodic (DFT-even) window coefficients for the given size
    pub fn generate(&self, size: usize) -> Vec<f64> {
        let cosine_sum = |coeffs: &[f64]| -> Vec<f64> {
            (0..size)
                .map(|i| {
                    let n = i as f64 / size as f64;
                    coeffs
                        .iter()
                        .enumerate()
                        .map(|(k, &a)| {
                            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                            sign * a * (2.0 * PI * k as f64 * n).cos()
                        })
                        .sum()
                })
                .collect()
        };

        match self {
            WindowFunction::Rectangular => vec![1.0; size],
            WindowFunction::Hann => cosine_sum(&[0.5, 0.5]),
            WindowFunction::Hamming => cosine_sum(&[0.54, 0.46]),
            WindowFunction::Blackman => cosine_sum(&[0.42, 0.5, 0.08]),
            WindowFunction::BlackmanHarris => cosine_sum(&[0.35875, 0.48829, 0.14128, 0.01168]),
            WindowFunction::FlatTop => cosine_sum(&[
                0.21557895,
                0.41663158,
                0.277263158,
                0.083578947,
                0.006947368,
            ]),
        }
    }

    /// Parse window function from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "rectangular" | "rect" | "boxcar" => Some(WindowFunction::Rectangular),
            "hann" | "hanning" => Some(WindowFunction::Hann),
            "hamming" => Some(WindowFunction::Hamming),
            "blackman" => Some(WindowFunction::Blackman),
            "blackman-harris" | "blackmanharris" => Some(WindowFunction::BlackmanHarris),
            "flat-top" | "flattop" => Some(WindowFunction::FlatTop),
            _ => None,
        }
    }
}

/// Output units of a PSD estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    /// Power per bin (signal²), for reading tone powers
    Spectrum,
    /// Power per hertz (signal²/Hz), for noise floors
    #[default]
    Density,
}

impl Scaling {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "spectrum" | "power" => Some(Scaling::Spectrum),
            "density" | "psd" => Some(Scaling::Density),
            _ => None,
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            Scaling::Spectrum => "unit^2",
            Scaling::Density => "unit^2/Hz",
        }
    }
}

/// Frequency range covered by an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sidedness {
    /// Non-negative frequencies only, interior bins doubled (real input)
    #[default]
    OneSided,
    /// Full `[-fs/2, fs/2)` range
    TwoSided,
}

/// Bin order of a two-sided estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinOrder {
    /// FFT order: DC first, negative frequencies in the upper half
    #[default]
    Natural,
    /// Most-negative to most-positive frequency
    Shifted,
}

/// Per-segment trend removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detrend {
    /// Segments are used as-is
    #[default]
    None,
    /// Subtract each segment's mean
    Constant,
}

/// Sample types accepted by the estimator
pub trait SpectralInput: Copy + Send + Sync {
    /// Complex input always yields a two-sided estimate
    const IS_COMPLEX: bool;

    fn to_complex(self) -> Complex64;
}

impl SpectralInput for f64 {
    const IS_COMPLEX: bool = false;

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
}

impl SpectralInput for IQSample {
    const IS_COMPLEX: bool = true;

    #[inline]
    fn to_complex(self) -> Complex64 {
        self
    }
}

/// Welch estimator configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchConfig {
    /// Segment length in samples (power of two)
    pub segment_len: usize,
    /// Samples shared by consecutive segments (`None` = half a segment)
    pub overlap: Option<usize>,
    /// Window applied to each segment
    pub window: WindowFunction,
    /// Output units
    pub scaling: Scaling,
    /// Requested sidedness (complex input is always two-sided)
    pub sidedness: Sidedness,
    /// Per-segment detrending
    pub detrend: Detrend,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self {
            segment_len: 256,
            overlap: None,
            window: WindowFunction::Hann,
            scaling: Scaling::Density,
            sidedness: Sidedness::OneSided,
            detrend: Detrend::None,
        }
    }
}

impl WelchConfig {
    /// Default configuration with the given segment length
    pub fn new(segment_len: usize) -> Self {
        Self {
            segment_len,
            ..Self::default()
        }
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_sidedness(mut self, sidedness: Sidedness) -> Self {
        self.sidedness = sidedness;
        self
    }

    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.window = window;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = Some(overlap);
        self
    }

    pub fn with_detrend(mut self, detrend: Detrend) -> Self {
        self.detrend = detrend;
        self
    }

    /// Overlap actually used
    pub fn effective_overlap(&self) -> usize {
        self.overlap.unwrap_or(self.segment_len / 2)
    }

    /// Check segment length and overlap
    pub fn validate(&self) -> DspResult<()> {
        if self.segment_len < 2 || !self.segment_len.is_power_of_two() {
            return Err(DspError::SegmentNotPowerOfTwo(self.segment_len));
        }
        let overlap = self.effective_overlap();
        if overlap >= self.segment_len {
            return Err(DspError::InvalidOverlap {
                overlap,
                segment_len: self.segment_len,
            });
        }
        Ok(())
    }

    /// Number of full segments that fit in `len` samples
    pub fn num_segments(&self, len: usize) -> usize {
        if len < self.segment_len {
            return 0;
        }
        let step = self.segment_len - self.effective_overlap();
        (len - self.segment_len) / step + 1
    }
}

/// Result of a PSD estimation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsdEstimate {
    frequencies: Vec<f64>,
    values: Vec<f64>,
    sample_rate: f64,
    segment_len: usize,
    num_segments: usize,
    window: WindowFunction,
    scaling: Scaling,
    sidedness: Sidedness,
    order: BinOrder,
}

impl PsdEstimate {
    /// Frequency of each bin in Hz
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Power (or power density) of each bin
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Number of periodograms averaged
    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    pub fn window(&self) -> WindowFunction {
        self.window
    }

    pub fn scaling(&self) -> Scaling {
        self.scaling
    }

    pub fn sidedness(&self) -> Sidedness {
        self.sidedness
    }

    pub fn order(&self) -> BinOrder {
        self.order
    }

    /// Bin spacing `fs / L` in Hz
    pub fn resolution(&self) -> f64 {
        self.sample_rate / self.segment_len as f64
    }

    /// Two-sided estimate reordered from most-negative to most-positive
    /// frequency. One-sided or already shifted estimates are returned as-is.
    pub fn shifted(&self) -> PsdEstimate {
        if self.sidedness == Sidedness::OneSided || self.order == BinOrder::Shifted {
            return self.clone();
        }
        PsdEstimate {
            frequencies: FftProcessor::fft_shift(&self.frequencies),
            values: FftProcessor::fft_shift(&self.values),
            order: BinOrder::Shifted,
            ..self.clone()
        }
    }

    /// Estimate with every value multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> PsdEstimate {
        PsdEstimate {
            values: self.values.iter().map(|v| v * factor).collect(),
            ..self.clone()
        }
    }

    /// Values in dB, floored at -300 dB
    pub fn to_db(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|&p| if p > 1e-30 { 10.0 * p.log10() } else { -300.0 })
            .collect()
    }

    /// Frequency and value of the strongest bin
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, &v)| (self.frequencies[i], v))
    }

    /// `Σ value · df`. For density estimates this is the total power.
    pub fn integrate(&self) -> f64 {
        self.values.iter().sum::<f64>() * self.resolution()
    }

    /// Mean value over bins with `low <= f <= high`
    pub fn band_mean(&self, low: f64, high: f64) -> Option<f64> {
        let (sum, count) = self
            .frequencies
            .iter()
            .zip(self.values.iter())
            .filter(|(&f, _)| f >= low && f <= high)
            .fold((0.0, 0usize), |(s, c), (_, &v)| (s + v, c + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Format as text table of the strongest bins
    pub fn to_text(&self, rows: usize) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "PSD estimate (segment: {}, averages: {}, {:?}, {:?})\n",
            self.segment_len, self.num_segments, self.scaling, self.sidedness
        ));
        output.push_str(&format!(
            "Sample rate: {:.0} Hz, Resolution: {:.4} Hz\n",
            self.sample_rate,
            self.resolution()
        ));
        output.push_str("─".repeat(50).as_str());
        output.push('\n');
        output.push_str(&format!("  Frequency (Hz)    Value ({})\n", self.scaling.units()));
        output.push_str("─".repeat(50).as_str());
        output.push('\n');

        let mut indices: Vec<usize> = (0..self.values.len()).collect();
        indices.sort_by(|&a, &b| self.values[b].total_cmp(&self.values[a]));

        for &i in indices.iter().take(rows) {
            output.push_str(&format!(
                "{:>14.2}    {:>14.6e}\n",
                self.frequencies[i], self.values[i]
            ));
        }

        output
    }

    /// Format as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Format as CSV
    pub fn to_csv(&self) -> String {
        let mut output = String::from("frequency_hz,value\n");
        for (freq, value) in self.frequencies.iter().zip(self.values.iter()) {
            output.push_str(&format!("{},{}\n", freq, value));
        }
        output
    }
}

/// Welch PSD estimator with a fixed configuration
#[derive(Debug)]
pub struct WelchEstimator {
    config: WelchConfig,
    window_coeffs: Vec<f64>,
    window_sum: f64,
    window_power: f64,
    processor: FftProcessor,
}

impl WelchEstimator {
    /// Create an estimator; fails on an invalid segmentation
    pub fn new(config: WelchConfig) -> DspResult<Self> {
        config.validate()?;
        let window_coeffs = config.window.generate(config.segment_len);
        let window_sum = window_coeffs.iter().sum::<f64>();
        let window_power = window_coeffs.iter().map(|w| w * w).sum::<f64>();
        let processor = FftProcessor::new(config.segment_len);

        Ok(Self {
            config,
            window_coeffs,
            window_sum,
            window_power,
            processor,
        })
    }

    pub fn config(&self) -> &WelchConfig {
        &self.config
    }

    /// Equivalent noise bandwidth of the window in Hz
    pub fn enbw(&self, sample_rate: f64) -> f64 {
        sample_rate * self.window_power / (self.window_sum * self.window_sum)
    }

    /// Estimate the PSD of `samples` taken at `sample_rate`
    pub fn estimate<S: SpectralInput>(
        &mut self,
        samples: &[S],
        sample_rate: f64,
    ) -> DspResult<PsdEstimate> {
        check_sample_rate(sample_rate)?;
        let n = self.config.segment_len;
        if samples.len() < n {
            return Err(DspError::SegmentTooLong {
                segment_len: n,
                available: samples.len(),
            });
        }

        let sidedness = if S::IS_COMPLEX && self.config.sidedness == Sidedness::OneSided {
            warn!("Input is complex, returning a two-sided spectrum");
            Sidedness::TwoSided
        } else {
            self.config.sidedness
        };

        let num_segments = self.config.num_segments(samples.len());
        let step = n - self.config.effective_overlap();
        debug!(
            "Welch: {} samples, segment {}, step {}, {} segments",
            samples.len(),
            n,
            step,
            num_segments
        );

        let accumulated = self.accumulate(samples, num_segments, step);

        let scale = match self.config.scaling {
            Scaling::Density => 1.0 / (sample_rate * self.window_power),
            Scaling::Spectrum => 1.0 / (self.window_sum * self.window_sum),
        } / num_segments as f64;

        let two_sided: Vec<f64> = accumulated.iter().map(|&p| p * scale).collect();

        let (frequencies, values) = match sidedness {
            Sidedness::TwoSided => (fft_frequencies(n, sample_rate), two_sided),
            Sidedness::OneSided => (rfft_frequencies(n, sample_rate), fold_one_sided(&two_sided)),
        };

        Ok(PsdEstimate {
            frequencies,
            values,
            sample_rate,
            segment_len: n,
            num_segments,
            window: self.config.window,
            scaling: self.config.scaling,
            sidedness,
            order: BinOrder::Natural,
        })
    }

    /// Detrended, windowed copy of one segment
    fn prepare_segment<S: SpectralInput>(&self, segment: &[S]) -> Vec<Complex64> {
        let mut frame: Vec<Complex64> = segment.iter().map(|s| s.to_complex()).collect();
        if self.config.detrend == Detrend::Constant {
            let mean = frame.iter().sum::<Complex64>() / frame.len() as f64;
            for s in frame.iter_mut() {
                *s -= mean;
            }
        }
        for (s, &w) in frame.iter_mut().zip(self.window_coeffs.iter()) {
            *s *= w;
        }
        frame
    }

    /// Sum of `|X(f)|²` over all segments, in segment order
    #[cfg(not(feature = "parallel"))]
    fn accumulate<S: SpectralInput>(&mut self, samples: &[S], num_segments: usize, step: usize) -> Vec<f64> {
        let n = self.config.segment_len;
        let mut accumulated = vec![0.0f64; n];
        for seg in 0..num_segments {
            let offset = seg * step;
            let mut frame = self.prepare_segment(&samples[offset..offset + n]);
            self.processor.fft_inplace(&mut frame);
            for (acc, x) in accumulated.iter_mut().zip(frame.iter()) {
                *acc += x.norm_sqr();
            }
        }
        accumulated
    }

    /// Sum of `|X(f)|²` over all segments, in segment order
    #[cfg(feature = "parallel")]
    fn accumulate<S: SpectralInput>(&mut self, samples: &[S], num_segments: usize, step: usize) -> Vec<f64> {
        let n = self.config.segment_len;
        let this = &*self;
        let periodograms: Vec<Vec<f64>> = (0..num_segments)
            .into_par_iter()
            .map(|seg| {
                let offset = seg * step;
                let mut frame = this.prepare_segment(&samples[offset..offset + n]);
                this.processor.fft_inplace_shared(&mut frame);
                frame.iter().map(|x| x.norm_sqr()).collect()
            })
            .collect();

        let mut accumulated = vec![0.0f64; n];
        for periodogram in &periodograms {
            for (acc, p) in accumulated.iter_mut().zip(periodogram.iter()) {
                *acc += p;
            }
        }
        accumulated
    }
}

/// Keep bins `0..=n/2`, doubling everything except DC and (for even `n`)
/// Nyquist.
fn fold_one_sided(two_sided: &[f64]) -> Vec<f64> {
    let n = two_sided.len();
    let last = n / 2;
    two_sided[..=last]
        .iter()
        .enumerate()
        .map(|(k, &p)| {
            let is_nyquist = n % 2 == 0 && k == last;
            if k == 0 || is_nyquist {
                p
            } else {
                2.0 * p
            }
        })
        .collect()
}

/// One-shot Welch estimate
pub fn welch<S: SpectralInput>(
    samples: &[S],
    sample_rate: f64,
    config: WelchConfig,
) -> DspResult<PsdEstimate> {
    WelchEstimator::new(config)?.estimate(samples, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(n: usize, fs: f64, freq: f64, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).cos())
            .collect()
    }

    fn pseudo_noise(n: usize) -> Vec<f64> {
        // Deterministic, roughly white sequence
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    #[test]
    fn test_window_generation() {
        let size = 64;

        // Periodic Hann: 0 at the first sample, 1 at the centre
        let hann = WindowFunction::Hann.generate(size);
        assert!(hann[0].abs() < 1e-12);
        assert!((hann[size / 2] - 1.0).abs() < 1e-12);

        let hamming = WindowFunction::Hamming.generate(size);
        assert!((hamming[0] - 0.08).abs() < 1e-12);

        let blackman = WindowFunction::Blackman.generate(size);
        assert!(blackman[0].abs() < 1e-12);
    }

    #[test]
    fn test_window_from_str() {
        assert_eq!(WindowFunction::from_str("hann"), Some(WindowFunction::Hann));
        assert_eq!(WindowFunction::from_str("HAMMING"), Some(WindowFunction::Hamming));
        assert_eq!(WindowFunction::from_str("boxcar"), Some(WindowFunction::Rectangular));
        assert_eq!(WindowFunction::from_str("invalid"), None);
        assert_eq!(Scaling::from_str("Density"), Some(Scaling::Density));
    }

    #[test]
    fn test_config_validation() {
        assert!(WelchConfig::new(1024).validate().is_ok());
        assert_eq!(
            WelchConfig::new(1000).validate(),
            Err(DspError::SegmentNotPowerOfTwo(1000))
        );
        assert_eq!(
            WelchConfig::new(1).validate(),
            Err(DspError::SegmentNotPowerOfTwo(1))
        );
        assert_eq!(
            WelchConfig::new(64).with_overlap(64).validate(),
            Err(DspError::InvalidOverlap {
                overlap: 64,
                segment_len: 64
            })
        );
    }

    #[test]
    fn test_segment_count() {
        let config = WelchConfig::new(256);
        assert_eq!(config.effective_overlap(), 128);
        assert_eq!(config.num_segments(255), 0);
        assert_eq!(config.num_segments(256), 1);
        assert_eq!(config.num_segments(1024), 7);
        assert_eq!(config.with_overlap(0).num_segments(1100), 4);
    }

    #[test]
    fn test_segment_longer_than_input() {
        let x = vec![0.0; 100];
        let err = welch(&x, 1.0, WelchConfig::new(128)).unwrap_err();
        assert_eq!(
            err,
            DspError::SegmentTooLong {
                segment_len: 128,
                available: 100
            }
        );
    }

    #[test]
    fn test_spectrum_single_tone() {
        let fs = 8192.0;
        let freq = 1000.0;
        let x = tone(8192, fs, freq, 1.0);

        let config = WelchConfig::new(1024).with_scaling(Scaling::Spectrum);
        let psd = welch(&x, fs, config).unwrap();

        assert_eq!(psd.len(), 513);
        assert!((psd.resolution() - 8.0).abs() < 1e-12);
        let (peak_freq, peak_power) = psd.peak().unwrap();
        assert!(
            (peak_freq - freq).abs() < psd.resolution(),
            "Peak at {} Hz, expected {} Hz",
            peak_freq,
            freq
        );
        // Unit-amplitude cosine carries 0.5 in a one-sided power spectrum
        assert!((peak_power - 0.5).abs() < 1e-9, "peak power {}", peak_power);
    }

    #[test]
    fn test_spectrum_to_density_ratio_is_enbw() {
        let fs = 1000.0;
        let x = pseudo_noise(4096);
        let config = WelchConfig::new(256);

        let density = welch(&x, fs, config).unwrap();
        let spectrum = welch(&x, fs, config.with_scaling(Scaling::Spectrum)).unwrap();
        let enbw = WelchEstimator::new(config).unwrap().enbw(fs);

        // Hann ENBW is 1.5 bins
        assert!((enbw - 1.5 * fs / 256.0).abs() < 1e-9);
        for (s, d) in spectrum.values().iter().zip(density.values()) {
            assert!((s - d * enbw).abs() <= 1e-12 * s.abs().max(1e-30));
        }
    }

    #[test]
    fn test_parseval_density() {
        let fs = 2000.0;
        let x = pseudo_noise(1 << 15);
        let mean_square = x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64;

        let psd = welch(&x, fs, WelchConfig::new(1024)).unwrap();
        let total = psd.integrate();
        assert!(
            (total - mean_square).abs() / mean_square < 0.05,
            "integrated {} vs mean square {}",
            total,
            mean_square
        );
    }

    #[test]
    fn test_parseval_keeps_dc_offset() {
        let fs = 1000.0;
        let x: Vec<f64> = pseudo_noise(1 << 15).iter().map(|v| 1.0 + 0.1 * v).collect();
        let n = x.len() as f64;
        let mean = x.iter().sum::<f64>() / n;
        let mean_square = x.iter().map(|v| v * v).sum::<f64>() / n;
        let variance = mean_square - mean * mean;

        let total = welch(&x, fs, WelchConfig::new(1024)).unwrap().integrate();
        assert!(
            (total - mean_square).abs() / mean_square < 0.05,
            "integrated {} vs mean square {}",
            total,
            mean_square
        );

        // Constant detrend drops the offset and leaves the variance
        let detrended = welch(&x, fs, WelchConfig::new(1024).with_detrend(Detrend::Constant))
            .unwrap()
            .integrate();
        assert!(
            (detrended - variance).abs() / variance < 0.05,
            "integrated {} vs variance {}",
            detrended,
            variance
        );
    }

    #[test]
    fn test_one_sided_matches_two_sided() {
        let fs = 512.0;
        let x: Vec<f64> = pseudo_noise(4096)
            .iter()
            .zip(tone(4096, fs, 40.0, 0.3))
            .map(|(a, b)| a + b)
            .collect();
        let config = WelchConfig::new(256);
        let one = welch(&x, fs, config).unwrap();
        let two = welch(&x, fs, config.with_sidedness(Sidedness::TwoSided)).unwrap();

        assert_eq!(one.len(), 129);
        assert_eq!(two.len(), 256);
        assert_eq!(one.values()[0], two.values()[0]);
        assert_eq!(one.values()[128], two.values()[128]);
        for k in 1..128 {
            let folded = two.values()[k] + two.values()[256 - k];
            assert!(
                (one.values()[k] - folded).abs() <= 1e-9 * folded,
                "bin {}: {} vs {}",
                k,
                one.values()[k],
                folded
            );
        }
    }

    #[test]
    fn test_complex_input_is_two_sided() {
        let fs = 256.0;
        let x: Vec<IQSample> = (0..1024)
            .map(|i| IQSample::cis(-2.0 * PI * 32.0 * i as f64 / fs))
            .collect();
        let psd = welch(&x, fs, WelchConfig::new(64)).unwrap();
        assert_eq!(psd.sidedness(), Sidedness::TwoSided);
        assert_eq!(psd.len(), 64);
        let (peak_freq, _) = psd.peak().unwrap();
        assert!((peak_freq + 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_shift_is_permutation() {
        let fs = 100.0;
        let x = pseudo_noise(512);
        let two = welch(&x, fs, WelchConfig::new(64).with_sidedness(Sidedness::TwoSided)).unwrap();
        let shifted = two.shifted();

        assert_eq!(shifted.order(), BinOrder::Shifted);
        for w in shifted.frequencies().windows(2) {
            assert!(w[1] > w[0]);
        }
        assert_eq!(shifted.frequencies()[0], -50.0);

        let mut a = two.values().to_vec();
        let mut b = shifted.values().to_vec();
        a.sort_by(f64::total_cmp);
        b.sort_by(f64::total_cmp);
        assert_eq!(a, b);
        assert_eq!(shifted.shifted(), shifted);
    }

    #[test]
    fn test_band_mean_and_scaled() {
        let x = pseudo_noise(2048);
        let psd = welch(&x, 100.0, WelchConfig::new(128)).unwrap();
        let mean = psd.band_mean(10.0, 40.0).unwrap();
        let doubled = psd.scaled(2.0).band_mean(10.0, 40.0).unwrap();
        assert!((doubled - 2.0 * mean).abs() < 1e-15);
        assert!(psd.band_mean(70.0, 80.0).is_none());
    }

    #[test]
    fn test_output_formats() {
        let x = tone(1024, 1024.0, 100.0, 1.0);
        let psd = welch(&x, 1024.0, WelchConfig::new(128)).unwrap();
        let csv = psd.to_csv();
        assert!(csv.starts_with("frequency_hz,value\n"));
        assert_eq!(csv.lines().count(), psd.len() + 1);
        let json = psd.to_json().unwrap();
        assert!(json.contains("\"segment_len\": 128"));
        assert!(psd.to_text(5).contains("Resolution"));
    }
}
