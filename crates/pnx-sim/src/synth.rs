//! Carrier Synthesis
//!
//! Generates the real test signal the rest of the pipeline analyses:
//!
//! ```text
//!   x(t) = A · cos(2π·fc·t + φ(t)) + n(t)
//!   φ(t) = m · sin(2π·fm·t)            (optional phase modulation)
//!   n(t) ~ N(μ, σ²) i.i.d.             (additive Gaussian noise)
//! ```
//!
//! The noise realisation is returned alongside the waveform so its PSD can be
//! used as the reference for the phase-noise comparison. Several carriers can
//! be built on top of one noise draw with [`Synthesizer::synthesize_with_noise`].
//!
//! ## Usage
//!
//! ```rust
//! use pnx_sim::synth::{seeded_rng, SignalConfig, Synthesizer};
//!
//! let config = SignalConfig::builder()
//!     .sample_rate(10_000.0)
//!     .duration(0.5)
//!     .carrier_frequency(1_000.0)
//!     .amplitude(1.0)
//!     .noise_std(0.01)
//!     .build()
//!     .unwrap();
//!
//! let mut rng = seeded_rng(42);
//! let synthesis = Synthesizer::new(config).synthesize(&mut rng).unwrap();
//! assert_eq!(synthesis.waveform.len(), 5_000);
//! ```

use pnx_core::types::{DspError, DspResult};
use pnx_core::waveform::{time_vector, PhaseModulation, Waveform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Largest signal the synthesizer will allocate (2^31 samples)
pub const MAX_SAMPLES: usize = 1 << 31;

/// Parameters of one synthesis run
///
/// Fields are private; build with [`SignalConfig::builder`] or
/// [`SignalConfig::from_json`], both of which validate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalConfig {
    /// Sample rate in Hz
    sample_rate: f64,
    /// Signal length in seconds
    duration: f64,
    /// Carrier frequency in Hz
    carrier_frequency: f64,
    /// Carrier amplitude
    amplitude: f64,
    /// Mean of the additive noise
    noise_mean: f64,
    /// Standard deviation of the additive noise
    noise_std: f64,
    /// Optional sinusoidal phase modulation
    modulation: Option<PhaseModulation>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sample_rate: 100_000.0,
            duration: 10.0,
            carrier_frequency: 25_000.0,
            amplitude: 10.0,
            noise_mean: 0.0,
            noise_std: 0.01,
            modulation: None,
        }
    }
}

impl SignalConfig {
    /// Builder starting from the defaults
    pub fn builder() -> SignalConfigBuilder {
        SignalConfigBuilder {
            config: Self::default(),
        }
    }

    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json(json: &str) -> DspResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DspError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn carrier_frequency(&self) -> f64 {
        self.carrier_frequency
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn noise_mean(&self) -> f64 {
        self.noise_mean
    }

    pub fn noise_std(&self) -> f64 {
        self.noise_std
    }

    pub fn modulation(&self) -> Option<PhaseModulation> {
        self.modulation
    }

    /// `round(fs · duration)`
    pub fn num_samples(&self) -> usize {
        (self.sample_rate * self.duration).round() as usize
    }

    /// Same configuration with another carrier amplitude
    pub fn with_amplitude(self, amplitude: f64) -> DspResult<Self> {
        let config = Self { amplitude, ..self };
        config.validate()?;
        Ok(config)
    }

    /// Same configuration with another (or no) phase modulation
    pub fn with_modulation(self, modulation: Option<PhaseModulation>) -> DspResult<Self> {
        let config = Self { modulation, ..self };
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter; no sample is generated for an invalid config
    pub fn validate(&self) -> DspResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(self.sample_rate));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(DspError::InvalidDuration(self.duration));
        }
        let requested = (self.sample_rate * self.duration).round();
        if !requested.is_finite() || requested > MAX_SAMPLES as f64 {
            return Err(DspError::TooManySamples {
                requested,
                max: MAX_SAMPLES,
            });
        }
        if self.num_samples() == 0 {
            return Err(DspError::NoSamples {
                sample_rate: self.sample_rate,
                duration: self.duration,
            });
        }
        let nyquist = self.sample_rate / 2.0;
        if !(self.carrier_frequency.is_finite()
            && self.carrier_frequency >= 0.0
            && self.carrier_frequency < nyquist)
        {
            return Err(DspError::InvalidCarrierFrequency {
                frequency: self.carrier_frequency,
                nyquist,
            });
        }
        if !self.amplitude.is_finite() {
            return Err(DspError::InvalidAmplitude(self.amplitude));
        }
        if !(self.noise_mean.is_finite() && self.noise_std.is_finite() && self.noise_std >= 0.0) {
            return Err(DspError::InvalidNoise {
                mean: self.noise_mean,
                std_dev: self.noise_std,
            });
        }
        if let Some(modulation) = &self.modulation {
            modulation.validate()?;
        }
        Ok(())
    }

    /// Noise source described by this configuration
    pub fn noise(&self) -> GaussianNoise {
        GaussianNoise {
            mean: self.noise_mean,
            std_dev: self.noise_std,
        }
    }
}

/// Builder for [`SignalConfig`]
#[derive(Debug, Clone, Copy)]
pub struct SignalConfigBuilder {
    config: SignalConfig,
}

impl SignalConfigBuilder {
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    pub fn duration(mut self, duration: f64) -> Self {
        self.config.duration = duration;
        self
    }

    pub fn carrier_frequency(mut self, carrier_frequency: f64) -> Self {
        self.config.carrier_frequency = carrier_frequency;
        self
    }

    pub fn amplitude(mut self, amplitude: f64) -> Self {
        self.config.amplitude = amplitude;
        self
    }

    pub fn noise_mean(mut self, noise_mean: f64) -> Self {
        self.config.noise_mean = noise_mean;
        self
    }

    pub fn noise_std(mut self, noise_std: f64) -> Self {
        self.config.noise_std = noise_std;
        self
    }

    pub fn modulation(mut self, modulation: PhaseModulation) -> Self {
        self.config.modulation = Some(modulation);
        self
    }

    pub fn build(self) -> DspResult<SignalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// i.i.d. normal noise source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianNoise {
    pub mean: f64,
    pub std_dev: f64,
}

impl GaussianNoise {
    /// Draw `len` samples
    pub fn generate<R: Rng + ?Sized>(&self, len: usize, rng: &mut R) -> DspResult<Vec<f64>> {
        let dist = Normal::new(self.mean, self.std_dev).map_err(|_| DspError::InvalidNoise {
            mean: self.mean,
            std_dev: self.std_dev,
        })?;
        Ok((0..len).map(|_| dist.sample(rng)).collect())
    }
}

/// A synthesized waveform and the noise realisation inside it
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Carrier plus noise
    pub waveform: Waveform,
    /// The additive noise alone
    pub noise: Vec<f64>,
}

/// Carrier synthesizer for one configuration
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer {
    config: SignalConfig,
}

impl Synthesizer {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Noise-free modulated carrier
    pub fn carrier(&self) -> DspResult<Vec<f64>> {
        self.config.validate()?;
        let c = &self.config;
        let omega = 2.0 * PI * c.carrier_frequency;
        let samples = time_vector(c.num_samples(), c.sample_rate)
            .into_iter()
            .map(|t| {
                let phi = c.modulation.map_or(0.0, |m| m.phase_at(t));
                c.amplitude * (omega * t + phi).cos()
            })
            .collect();
        Ok(samples)
    }

    /// Carrier plus a fresh noise draw from `rng`
    pub fn synthesize<R: Rng + ?Sized>(&self, rng: &mut R) -> DspResult<Synthesis> {
        self.config.validate()?;
        let noise = self.config.noise().generate(self.config.num_samples(), rng)?;
        self.synthesize_with_noise(noise)
    }

    /// Carrier plus a caller-supplied noise realisation
    pub fn synthesize_with_noise(&self, noise: Vec<f64>) -> DspResult<Synthesis> {
        let expected = self.config.num_samples();
        if noise.len() != expected {
            return Err(DspError::LengthMismatch {
                expected,
                actual: noise.len(),
            });
        }

        let mut samples = self.carrier()?;
        for (x, n) in samples.iter_mut().zip(noise.iter()) {
            *x += n;
        }

        let c = &self.config;
        info!(
            "Synthesized {} samples: fc={} Hz, A={}, noise σ={}",
            expected, c.carrier_frequency, c.amplitude, c.noise_std
        );
        if let Some(m) = c.modulation {
            debug!("Phase modulation: {} rad at {} Hz", m.amplitude, m.frequency);
        }

        Ok(Synthesis {
            waveform: Waveform::from_samples(samples, c.sample_rate)?,
            noise,
        })
    }
}

/// Deterministic generator for reproducible runs
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
