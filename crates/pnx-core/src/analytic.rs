//! Analytic Signal Extraction
//!
//! Builds the complex analytic signal of a real waveform in the frequency
//! domain: the positive-frequency half of the spectrum is doubled, the
//! negative half discarded, DC and Nyquist kept as-is.
//!
//! ```text
//!   X(f) = FFT(x)            h[k] = 1   k = 0, k = N/2 (N even)
//!   z    = IFFT(X · h)       h[k] = 2   0 < k < N/2
//!                            h[k] = 0   N/2 < k < N
//! ```
//!
//! `Re z` is the input itself and `Im z` its Hilbert transform, so a carrier
//! `A·cos(θ(t))` becomes `A·e^(jθ(t))` and its phase can be read directly.
//! The transform is circular over the whole block: it is exact for blocks
//! holding an integer number of carrier cycles and shows small edge
//! transients otherwise.

use crate::fft_utils::FftProcessor;
use crate::phase::{phase_of, PhaseSequence};
use crate::types::{check_sample_rate, DspError, DspResult, IQSample};
use crate::waveform::Waveform;
use std::f64::consts::PI;
use tracing::debug;

/// Complex analytic representation of a real waveform
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticSignal {
    samples: Vec<IQSample>,
    sample_rate: f64,
}

impl AnalyticSignal {
    /// Analytic signal of a waveform
    pub fn from_waveform(waveform: &Waveform) -> DspResult<Self> {
        Self::from_samples(waveform.samples(), waveform.sample_rate())
    }

    /// Analytic signal of raw real samples taken at `sample_rate`
    pub fn from_samples(samples: &[f64], sample_rate: f64) -> DspResult<Self> {
        check_sample_rate(sample_rate)?;
        if samples.is_empty() {
            return Err(DspError::EmptyInput);
        }

        let n = samples.len();
        let mut processor = FftProcessor::new(n);
        let mut spectrum: Vec<IQSample> = samples.iter().map(|&x| IQSample::new(x, 0.0)).collect();
        processor.fft_inplace(&mut spectrum);

        for (k, bin) in spectrum.iter_mut().enumerate() {
            *bin *= analytic_gain(k, n);
        }

        processor.ifft_inplace(&mut spectrum);

        // The real part is the input up to rounding; pin it exactly
        for (z, &x) in spectrum.iter_mut().zip(samples.iter()) {
            z.re = x;
        }

        debug!("Analytic signal computed over {} samples", n);

        Ok(Self {
            samples: spectrum,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[IQSample] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// In-phase component (the original waveform)
    pub fn in_phase(&self) -> Vec<f64> {
        self.samples.iter().map(|z| z.re).collect()
    }

    /// Quadrature component (Hilbert transform of the waveform)
    pub fn quadrature(&self) -> Vec<f64> {
        self.samples.iter().map(|z| z.im).collect()
    }

    /// Instantaneous amplitude `|z|`
    pub fn envelope(&self) -> Vec<f64> {
        self.samples.iter().map(|z| z.norm()).collect()
    }

    /// Unwrapped instantaneous phase `unwrap(arg z)`
    pub fn instantaneous_phase(&self) -> DspResult<PhaseSequence> {
        phase_of(&self.samples, self.sample_rate, true)
    }

    /// Unwrapped phase minus the nominal carrier ramp `2π·fc·t`
    pub fn phase_deviation(&self, carrier_frequency: f64) -> DspResult<PhaseSequence> {
        if !carrier_frequency.is_finite() {
            return Err(DspError::InvalidCarrierFrequency {
                frequency: carrier_frequency,
                nyquist: self.sample_rate / 2.0,
            });
        }
        let phase = self.instantaneous_phase()?;
        Ok(phase.minus_ramp(|t| 2.0 * PI * carrier_frequency * t))
    }
}

/// Spectral weight applied to bin `k` of a length-`n` transform
#[inline]
fn analytic_gain(k: usize, n: usize) -> f64 {
    if k == 0 || (n % 2 == 0 && k == n / 2) {
        1.0
    } else if k < (n + 1) / 2 {
        2.0
    } else {
        0.0
    }
}
