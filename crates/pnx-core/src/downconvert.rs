//! Down-Conversion
//!
//! Shifts an analytic signal to baseband by mixing with `e^(−j·2π·fc·t)`.
//! What remains is the carrier's phase and amplitude fluctuation around a
//! stationary phasor:
//!
//! ```text
//!   analytic:  A(t)·e^(j(2π·fc·t + φ(t)))
//!   baseband:  A(t)·e^(jφ(t))
//! ```
//!
//! Reading `arg` of the baseband signal gives the same unwrapped result as
//! subtracting the carrier ramp from the analytic phase
//! ([`AnalyticSignal::phase_deviation`]), but the wrapped form stays inside
//! `[-π, π]` which is what the phase-noise spectra are computed from.

use crate::analytic::AnalyticSignal;
use crate::phase::{phase_of, PhaseSequence};
use crate::types::{DspError, DspResult, IQSample};
use std::f64::consts::PI;

/// Analytic signal shifted down by a carrier frequency
#[derive(Debug, Clone, PartialEq)]
pub struct BasebandSignal {
    samples: Vec<IQSample>,
    sample_rate: f64,
    carrier_frequency: f64,
}

impl BasebandSignal {
    pub fn samples(&self) -> &[IQSample] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Frequency removed by the mixer
    pub fn carrier_frequency(&self) -> f64 {
        self.carrier_frequency
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Phase in radians; wrapped to `[-π, π]` unless `unwrap_phase`
    pub fn phase(&self, unwrap_phase: bool) -> DspResult<PhaseSequence> {
        phase_of(&self.samples, self.sample_rate, unwrap_phase)
    }

    /// Instantaneous amplitude
    pub fn envelope(&self) -> Vec<f64> {
        self.samples.iter().map(|z| z.norm()).collect()
    }
}

/// Mix `analytic` with `e^(−j·2π·fc·t)`, `t = i / fs`
pub fn downconvert(analytic: &AnalyticSignal, carrier_frequency: f64) -> DspResult<BasebandSignal> {
    let sample_rate = analytic.sample_rate();
    if !carrier_frequency.is_finite() {
        return Err(DspError::InvalidCarrierFrequency {
            frequency: carrier_frequency,
            nyquist: sample_rate / 2.0,
        });
    }

    let samples = analytic
        .samples()
        .iter()
        .enumerate()
        .map(|(i, &z)| {
            let t = i as f64 / sample_rate;
            z * IQSample::cis(-(2.0 * PI * carrier_frequency * t))
        })
        .collect();

    Ok(BasebandSignal {
        samples,
        sample_rate,
        carrier_frequency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modulated_carrier(n: usize, fs: f64, fc: f64, beta: f64, fm: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * fc * t + beta * (2.0 * PI * fm * t).sin()).cos()
            })
            .collect()
    }

    #[test]
    fn test_baseband_of_clean_carrier_is_dc() {
        let x = modulated_carrier(1024, 1024.0, 256.0, 0.0, 0.0);
        let analytic = AnalyticSignal::from_samples(&x, 1024.0).unwrap();
        let baseband = downconvert(&analytic, 256.0).unwrap();
        for z in baseband.samples() {
            assert!((z - IQSample::new(1.0, 0.0)).norm() < 1e-9);
        }
    }

    #[test]
    fn test_matches_ramp_subtraction() {
        let (n, fs, fc) = (4096, 4096.0, 1024.0);
        let x = modulated_carrier(n, fs, fc, 2.5, 4.0);
        let analytic = AnalyticSignal::from_samples(&x, fs).unwrap();

        let by_ramp = analytic.phase_deviation(fc).unwrap();
        let by_mixing = downconvert(&analytic, fc).unwrap().phase(true).unwrap();

        for (a, b) in by_ramp.values().iter().zip(by_mixing.values()) {
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_recovers_modulation() {
        let (n, fs, fc, beta, fm) = (8192, 8192.0, 2048.0, 0.3, 8.0);
        let x = modulated_carrier(n, fs, fc, beta, fm);
        let analytic = AnalyticSignal::from_samples(&x, fs).unwrap();
        let phase = downconvert(&analytic, fc).unwrap().phase(false).unwrap();
        for (i, p) in phase.values().iter().enumerate() {
            let expected = beta * (2.0 * PI * fm * i as f64 / fs).sin();
            assert!((p - expected).abs() < 1e-6, "sample {}: {} vs {}", i, p, expected);
        }
    }

    #[test]
    fn test_rejects_non_finite_carrier() {
        let analytic = AnalyticSignal::from_samples(&[1.0, 0.0, -1.0, 0.0], 4.0).unwrap();
        assert!(downconvert(&analytic, f64::NAN).is_err());
    }
}
