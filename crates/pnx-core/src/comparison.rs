//! Phase-Noise Comparison
//!
//! Checks a measured phase-noise PSD against the level predicted from the
//! additive noise that produced it.
//!
//! ## Scaling Law
//!
//! Additive noise `n(t)` of one-sided density `S_n` on a carrier of amplitude
//! `A` splits evenly into amplitude and phase components. The phase part has
//! one-sided density
//!
//! ```text
//!   S_φ(f) = 2 · S_n(f) / A²        rad²/Hz, for 0 < f < fc
//! ```
//!
//! so the floor moves by `20·log10(A1/A2)` dB between two amplitudes: a ten
//! times weaker carrier shows a phase-noise floor 20 dB higher.
//!
//! Comparisons are made inside a band that avoids DC (where the estimator's
//! detrending and any slow modulation live) and the carrier frequency (where
//! the down-shifted spectrum folds).

use crate::analysis::spectrum::PsdEstimate;
use crate::types::{DspError, DspResult};
use crate::waveform::PhaseModulation;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Theoretical phase-noise PSD `2 · noise_psd / A²` on the noise grid
pub fn theoretical_phase_noise(noise_psd: &PsdEstimate, amplitude: f64) -> DspResult<PsdEstimate> {
    check_amplitude(amplitude)?;
    Ok(noise_psd.scaled(2.0 / (amplitude * amplitude)))
}

/// Predicted change of the phase-noise floor in dB when the carrier
/// amplitude goes from `from` to `to`
pub fn predicted_floor_change_db(from: f64, to: f64) -> DspResult<f64> {
    check_amplitude(from)?;
    check_amplitude(to)?;
    Ok(20.0 * (from.abs() / to.abs()).log10())
}

fn check_amplitude(amplitude: f64) -> DspResult<()> {
    if amplitude.is_finite() && amplitude != 0.0 {
        Ok(())
    } else {
        Err(DspError::InvalidAmplitude(amplitude))
    }
}

/// Closed frequency interval `[low, high]` in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low: f64,
    pub high: f64,
}

impl FrequencyBand {
    pub fn new(low: f64, high: f64) -> DspResult<Self> {
        let band = Self { low, high };
        band.validate()?;
        Ok(band)
    }

    pub fn validate(&self) -> DspResult<()> {
        if self.low.is_finite() && self.high.is_finite() && self.low >= 0.0 && self.low < self.high
        {
            Ok(())
        } else {
            Err(DspError::InvalidBand {
                low: self.low,
                high: self.high,
            })
        }
    }

    /// Band from 4 % to 80 % of the carrier frequency
    pub fn below_carrier(carrier_frequency: f64) -> DspResult<Self> {
        Self::new(0.04 * carrier_frequency, 0.8 * carrier_frequency)
    }

    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.low && frequency <= self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.1}, {:.1}] Hz", self.low, self.high)
    }
}

/// Outcome of a measured-vs-theoretical comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Band the comparison was made in
    pub band: FrequencyBand,
    /// Number of bins inside the band
    pub bins: usize,
    /// Band mean of the theoretical PSD
    pub theoretical_mean: f64,
    /// Band mean of the measured PSD
    pub measured_mean: f64,
    /// `10·log10(measured_mean / theoretical_mean)`
    pub band_ratio_db: f64,
    /// Mean of the per-bin dB deviations
    pub mean_deviation_db: f64,
    /// Standard deviation of the per-bin dB deviations
    pub std_deviation_db: f64,
    /// Largest absolute per-bin dB deviation
    pub max_abs_deviation_db: f64,
    /// Allowed `|band_ratio_db|`
    pub tolerance_db: f64,
    /// Whether the band ratio is within tolerance
    pub pass: bool,
}

impl ComparisonReport {
    /// Format as text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str("Phase-Noise Comparison\n");
        output.push_str(&"═".repeat(50));
        output.push('\n');
        output.push_str(&format!("Band:              {} ({} bins)\n", self.band, self.bins));
        output.push_str(&format!("Theoretical mean:  {:.4e} rad²/Hz\n", self.theoretical_mean));
        output.push_str(&format!("Measured mean:     {:.4e} rad²/Hz\n", self.measured_mean));
        output.push_str(&format!("Band ratio:        {:+.3} dB\n", self.band_ratio_db));
        output.push_str(&format!(
            "Per-bin deviation: {:+.3} ± {:.3} dB (max {:.3} dB)\n",
            self.mean_deviation_db, self.std_deviation_db, self.max_abs_deviation_db
        ));
        output.push_str(&format!(
            "Result:            {} (tolerance {:.2} dB)\n",
            if self.pass { "PASS" } else { "FAIL" },
            self.tolerance_db
        ));
        output
    }
}

/// Band-limited comparison of a measured phase-noise PSD against theory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseNoiseComparison {
    pub band: FrequencyBand,
    pub tolerance_db: f64,
}

impl PhaseNoiseComparison {
    pub fn new(band: FrequencyBand, tolerance_db: f64) -> DspResult<Self> {
        band.validate()?;
        if !(tolerance_db.is_finite() && tolerance_db >= 0.0) {
            return Err(DspError::InvalidConfig(format!(
                "tolerance {} dB must be finite and non-negative",
                tolerance_db
            )));
        }
        Ok(Self { band, tolerance_db })
    }

    /// Compare `measured` against `theoretical`; both must share a grid
    pub fn compare(
        &self,
        theoretical: &PsdEstimate,
        measured: &PsdEstimate,
    ) -> DspResult<ComparisonReport> {
        check_same_grid(theoretical, measured)?;

        let pairs: Vec<(f64, f64)> = theoretical
            .frequencies()
            .iter()
            .zip(theoretical.values().iter().zip(measured.values()))
            .filter(|(&f, _)| self.band.contains(f))
            .map(|(_, (&t, &m))| (t, m))
            .collect();

        if pairs.is_empty() {
            return Err(DspError::InvalidBand {
                low: self.band.low,
                high: self.band.high,
            });
        }
        if pairs.iter().any(|&(t, m)| !(t > 0.0 && m > 0.0)) {
            return Err(DspError::DegenerateSignal(format!(
                "non-positive PSD values inside {}",
                self.band
            )));
        }

        let bins = pairs.len();
        let n = bins as f64;
        let theoretical_mean = pairs.iter().map(|p| p.0).sum::<f64>() / n;
        let measured_mean = pairs.iter().map(|p| p.1).sum::<f64>() / n;
        let band_ratio_db = 10.0 * (measured_mean / theoretical_mean).log10();

        let deviations: Vec<f64> = pairs
            .iter()
            .map(|&(t, m)| 10.0 * (m / t).log10())
            .collect();
        let mean_deviation_db = deviations.iter().sum::<f64>() / n;
        let std_deviation_db = (deviations
            .iter()
            .map(|d| (d - mean_deviation_db).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();
        let max_abs_deviation_db = deviations.iter().fold(0.0f64, |acc, d| acc.max(d.abs()));

        let pass = band_ratio_db.abs() <= self.tolerance_db;
        debug!(
            "Comparison over {}: {} bins, ratio {:+.3} dB, {}",
            self.band,
            bins,
            band_ratio_db,
            if pass { "pass" } else { "fail" }
        );

        Ok(ComparisonReport {
            band: self.band,
            bins,
            theoretical_mean,
            measured_mean,
            band_ratio_db,
            mean_deviation_db,
            std_deviation_db,
            max_abs_deviation_db,
            tolerance_db: self.tolerance_db,
            pass,
        })
    }
}

/// Predicted vs measured floor change between two carrier amplitudes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalingReport {
    pub amplitude_from: f64,
    pub amplitude_to: f64,
    /// `20·log10(from / to)`
    pub predicted_db: f64,
    /// Change of the measured band mean
    pub measured_db: f64,
}

impl ScalingReport {
    /// `measured_db - predicted_db`
    pub fn error_db(&self) -> f64 {
        self.measured_db - self.predicted_db
    }

    pub fn within(&self, tolerance_db: f64) -> bool {
        self.error_db().abs() <= tolerance_db
    }
}

/// Measure how the phase-noise floor moved between two amplitudes
pub fn compare_scaling(
    from: (&PsdEstimate, f64),
    to: (&PsdEstimate, f64),
    band: FrequencyBand,
) -> DspResult<ScalingReport> {
    let (psd_from, amplitude_from) = from;
    let (psd_to, amplitude_to) = to;
    band.validate()?;
    check_same_grid(psd_from, psd_to)?;
    let predicted_db = predicted_floor_change_db(amplitude_from, amplitude_to)?;

    let invalid_band = || DspError::InvalidBand {
        low: band.low,
        high: band.high,
    };
    let mean_from = psd_from.band_mean(band.low, band.high).ok_or_else(invalid_band)?;
    let mean_to = psd_to.band_mean(band.low, band.high).ok_or_else(invalid_band)?;
    if !(mean_from > 0.0 && mean_to > 0.0) {
        return Err(DspError::DegenerateSignal(format!(
            "non-positive band mean inside {}",
            band
        )));
    }

    Ok(ScalingReport {
        amplitude_from,
        amplitude_to,
        predicted_db,
        measured_db: 10.0 * (mean_to / mean_from).log10(),
    })
}

fn check_same_grid(a: &PsdEstimate, b: &PsdEstimate) -> DspResult<()> {
    let mismatch = if a.len() != b.len() {
        Some(format!("{} bins vs {} bins", a.len(), b.len()))
    } else if a.sample_rate() != b.sample_rate() {
        Some(format!("{} Hz vs {} Hz", a.sample_rate(), b.sample_rate()))
    } else if a.segment_len() != b.segment_len() {
        Some(format!("segment {} vs {}", a.segment_len(), b.segment_len()))
    } else if a.scaling() != b.scaling() {
        Some(format!("{:?} vs {:?} scaling", a.scaling(), b.scaling()))
    } else if a.sidedness() != b.sidedness() || a.order() != b.order() {
        Some("different bin layout".to_string())
    } else {
        None
    };
    match mismatch {
        Some(reason) => Err(DspError::IncompatibleSpectra(reason)),
        None => Ok(()),
    }
}

/// Non-fatal condition that makes a modulated spectrum hard to read
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum LeakageWarning {
    /// Modulation sidebands fall within two bins of DC
    UnresolvedModulation {
        modulation_frequency: f64,
        resolution: f64,
    },
    /// Carson bandwidth reaches the carrier, so sidebands fold through DC
    CarrierOverlap {
        carson_bandwidth: f64,
        carrier_frequency: f64,
    },
}

impl fmt::Display for LeakageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeakageWarning::UnresolvedModulation {
                modulation_frequency,
                resolution,
            } => write!(
                f,
                "modulation at {} Hz is within two {} Hz bins of DC",
                modulation_frequency, resolution
            ),
            LeakageWarning::CarrierOverlap {
                carson_bandwidth,
                carrier_frequency,
            } => write!(
                f,
                "Carson bandwidth {} Hz reaches the {} Hz carrier",
                carson_bandwidth, carrier_frequency
            ),
        }
    }
}

/// Leakage conditions for `modulation` on a carrier at `carrier_frequency`
/// analysed with bin spacing `resolution`. Each one is also logged.
pub fn check_leakage(
    modulation: &PhaseModulation,
    carrier_frequency: f64,
    resolution: f64,
) -> Vec<LeakageWarning> {
    let mut warnings = Vec::new();
    if modulation.amplitude == 0.0 {
        return warnings;
    }

    if modulation.frequency < 2.0 * resolution {
        warnings.push(LeakageWarning::UnresolvedModulation {
            modulation_frequency: modulation.frequency,
            resolution,
        });
    }

    let carson_bandwidth = modulation.carson_bandwidth();
    if carson_bandwidth >= carrier_frequency {
        warnings.push(LeakageWarning::CarrierOverlap {
            carson_bandwidth,
            carrier_frequency,
        });
    }

    for w in &warnings {
        warn!("Spectral leakage: {}", w);
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::spectrum::{welch, WelchConfig};

    fn noise_psd(segment_len: usize) -> PsdEstimate {
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        let x: Vec<f64> = (0..8192)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect();
        welch(&x, 1000.0, WelchConfig::new(segment_len)).unwrap()
    }

    #[test]
    fn test_theoretical_scaling() {
        let noise = noise_psd(256);
        let theory = theoretical_phase_noise(&noise, 10.0).unwrap();
        for (t, n) in theory.values().iter().zip(noise.values()) {
            assert!((t - 0.02 * n).abs() <= 1e-15 * n.abs().max(1.0));
        }
        assert!(theoretical_phase_noise(&noise, 0.0).is_err());
    }

    #[test]
    fn test_predicted_floor_change() {
        assert!((predicted_floor_change_db(1.0, 0.1).unwrap() - 20.0).abs() < 1e-12);
        assert!((predicted_floor_change_db(1.0, 0.01).unwrap() - 40.0).abs() < 1e-12);
        assert!((predicted_floor_change_db(-2.0, 2.0).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_band_validation() {
        assert!(FrequencyBand::new(10.0, 5.0).is_err());
        assert!(FrequencyBand::new(-1.0, 5.0).is_err());
        let band = FrequencyBand::below_carrier(25_000.0).unwrap();
        assert!((band.low - 1000.0).abs() < 1e-9);
        assert!((band.high - 20_000.0).abs() < 1e-9);
        assert!(band.contains(1500.0));
        assert!(!band.contains(20_001.0));
    }

    #[test]
    fn test_compare_known_offset() {
        let theory = theoretical_phase_noise(&noise_psd(256), 1.0).unwrap();
        let measured = theory.scaled(10f64.powf(0.05));

        let band = FrequencyBand::new(50.0, 400.0).unwrap();
        let report = PhaseNoiseComparison::new(band, 1.0)
            .unwrap()
            .compare(&theory, &measured)
            .unwrap();

        assert!((report.band_ratio_db - 0.5).abs() < 1e-9);
        assert!((report.mean_deviation_db - 0.5).abs() < 1e-9);
        assert!(report.std_deviation_db < 1e-9);
        assert!(report.pass);
        assert!(report.to_text().contains("PASS"));

        let strict = PhaseNoiseComparison::new(band, 0.1).unwrap();
        assert!(!strict.compare(&theory, &measured).unwrap().pass);
    }

    #[test]
    fn test_compare_rejects_mismatched_grids() {
        let a = noise_psd(256);
        let b = noise_psd(512);
        let band = FrequencyBand::new(50.0, 400.0).unwrap();
        let err = PhaseNoiseComparison::new(band, 1.0)
            .unwrap()
            .compare(&a, &b)
            .unwrap_err();
        assert!(matches!(err, DspError::IncompatibleSpectra(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_compare_empty_band() {
        let a = noise_psd(256);
        let band = FrequencyBand::new(600.0, 700.0).unwrap();
        let err = PhaseNoiseComparison::new(band, 1.0)
            .unwrap()
            .compare(&a, &a)
            .unwrap_err();
        assert!(matches!(err, DspError::InvalidBand { .. }));
    }

    #[test]
    fn test_compare_scaling_exact() {
        let noise = noise_psd(256);
        let strong = theoretical_phase_noise(&noise, 1.0).unwrap();
        let weak = theoretical_phase_noise(&noise, 0.1).unwrap();
        let band = FrequencyBand::new(50.0, 400.0).unwrap();

        let report = compare_scaling((&strong, 1.0), (&weak, 0.1), band).unwrap();
        assert!((report.predicted_db - 20.0).abs() < 1e-12);
        assert!(report.error_db().abs() < 1e-9);
        assert!(report.within(0.01));
    }

    #[test]
    fn test_leakage_warnings() {
        let slow = PhaseModulation::new(0.1, 10.0).unwrap();
        let warnings = check_leakage(&slow, 25_000.0, 6.1);
        assert_eq!(
            warnings,
            vec![LeakageWarning::UnresolvedModulation {
                modulation_frequency: 10.0,
                resolution: 6.1
            }]
        );

        let wide = PhaseModulation::new(10.0, 2000.0).unwrap();
        let warnings = check_leakage(&wide, 25_000.0, 6.1);
        assert!(matches!(
            warnings.as_slice(),
            [LeakageWarning::CarrierOverlap { .. }]
        ));

        let fine = PhaseModulation::new(0.1, 100.0).unwrap();
        assert!(check_leakage(&fine, 25_000.0, 6.1).is_empty());
        let off = PhaseModulation::new(0.0, 0.0).unwrap();
        assert!(check_leakage(&off, 25_000.0, 6.1).is_empty());
    }
}
