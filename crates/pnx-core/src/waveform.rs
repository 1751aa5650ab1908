//! Real-valued waveforms and phase modulation descriptors

use crate::types::{check_sample_rate, DspError, DspResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Sinusoidal phase modulation `φ(t) = amplitude · sin(2π · frequency · t)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseModulation {
    /// Peak phase deviation in radians
    pub amplitude: f64,
    /// Modulation frequency in Hz
    pub frequency: f64,
}

impl PhaseModulation {
    pub fn new(amplitude: f64, frequency: f64) -> DspResult<Self> {
        let modulation = Self {
            amplitude,
            frequency,
        };
        modulation.validate()?;
        Ok(modulation)
    }

    pub fn validate(&self) -> DspResult<()> {
        if !self.amplitude.is_finite() {
            return Err(DspError::InvalidModulation(format!(
                "amplitude {} rad is not finite",
                self.amplitude
            )));
        }
        if !self.frequency.is_finite() || self.frequency < 0.0 {
            return Err(DspError::InvalidModulation(format!(
                "frequency {} Hz must be finite and non-negative",
                self.frequency
            )));
        }
        Ok(())
    }

    /// Phase offset in radians at time `t`
    #[inline]
    pub fn phase_at(&self, t: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.frequency * t).sin()
    }

    /// Carson's rule bandwidth `2·(β + 1)·fm` in Hz
    pub fn carson_bandwidth(&self) -> f64 {
        2.0 * (self.amplitude.abs() + 1.0) * self.frequency
    }
}

/// Real samples paired with their timestamps
///
/// Invariant: `samples.len() == timestamps.len()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waveform {
    sample_rate: f64,
    timestamps: Vec<f64>,
    samples: Vec<f64>,
}

impl Waveform {
    /// Wrap samples taken at `sample_rate`, starting at `t = 0`
    pub fn from_samples(samples: Vec<f64>, sample_rate: f64) -> DspResult<Self> {
        check_sample_rate(sample_rate)?;
        let timestamps = time_vector(samples.len(), sample_rate);
        Ok(Self {
            sample_rate,
            timestamps,
            samples,
        })
    }

    /// Build a waveform from explicit timestamps
    pub fn new(timestamps: Vec<f64>, samples: Vec<f64>, sample_rate: f64) -> DspResult<Self> {
        check_sample_rate(sample_rate)?;
        if timestamps.len() != samples.len() {
            return Err(DspError::LengthMismatch {
                expected: timestamps.len(),
                actual: samples.len(),
            });
        }
        Ok(Self {
            sample_rate,
            timestamps,
            samples,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration covered by the samples in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Copy of the samples with timestamps strictly below `t_end`
    pub fn truncated(&self, t_end: f64) -> Self {
        let keep = self.timestamps.partition_point(|&t| t < t_end);
        Self {
            sample_rate: self.sample_rate,
            timestamps: self.timestamps[..keep].to_vec(),
            samples: self.samples[..keep].to_vec(),
        }
    }

    /// Format as CSV
    pub fn to_csv(&self) -> String {
        let mut output = String::from("time_s,value\n");
        for (t, x) in self.timestamps.iter().zip(self.samples.iter()) {
            output.push_str(&format!("{},{}\n", t, x));
        }
        output
    }
}

/// `t[i] = i / fs` for `i` in `0..n`
pub fn time_vector(n: usize, sample_rate: f64) -> Vec<f64> {
    (0..n).map(|i| i as f64 / sample_rate).collect()
}
