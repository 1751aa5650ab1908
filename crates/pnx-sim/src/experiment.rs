//! Phase-Noise Experiments
//!
//! End-to-end runs of the pipeline on synthesized signals:
//!
//! ```text
//! SignalConfig ──► Synthesizer ──► Waveform ──► AnalyticSignal ──► downconvert(fc)
//!                      │                                               │
//!                      ▼                                               ▼
//!                 noise n(t)                                     phase φ(t)
//!                      │                                               │
//!                      ▼                                               ▼
//!                 Welch PSD ──► × 2/A² ──► theory        measured ◄── Welch PSD
//!                                             └────► comparison ◄────┘
//! ```
//!
//! | Runner                   | Question answered                                  |
//! |--------------------------|----------------------------------------------------|
//! | [`carrier_psd_sweep`]    | How does segment length trade resolution/variance? |
//! | [`PhaseNoiseExperiment`] | Does the measured phase floor follow `2·S_n/A²`?   |
//! | [`ModulationExperiment`] | Does the floor move with `1/A²` under modulation?  |
//! | [`TraceExperiment`]      | What does a large phase excursion look like?       |
//! | [`two_sided_spectra`]    | Why does the phase spectrum stop at `fc`?          |

use crate::synth::{SignalConfig, Synthesizer};
use pnx_core::analysis::{welch, Detrend, PsdEstimate, Sidedness, SignalStats, WelchConfig};
use pnx_core::analytic::AnalyticSignal;
use pnx_core::comparison::{
    check_leakage, compare_scaling, theoretical_phase_noise, ComparisonReport, FrequencyBand,
    LeakageWarning, PhaseNoiseComparison, ScalingReport,
};
use pnx_core::downconvert::downconvert;
use pnx_core::phase::PhaseSequence;
use pnx_core::types::{DspError, DspResult};
use pnx_core::waveform::{PhaseModulation, Waveform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Segment lengths compared by the carrier PSD sweep
pub const SWEEP_SEGMENT_LENGTHS: [usize; 3] = [1 << 10, 1 << 12, 1 << 14];

/// Segment length used for phase spectra
pub const PHASE_SEGMENT_LEN: usize = 1 << 15;

/// Welch settings for phase spectra: Hann, 50 % overlap, density scaling
/// and per-segment mean removal
pub fn phase_welch_config(segment_len: usize) -> WelchConfig {
    WelchConfig::new(segment_len).with_detrend(Detrend::Constant)
}

/// Carrier PSD at each segment length, otherwise configured as `base`.
///
/// Every segmentation is validated before any spectrum is computed.
pub fn carrier_psd_sweep(
    waveform: &Waveform,
    segment_lens: &[usize],
    base: WelchConfig,
) -> DspResult<Vec<PsdEstimate>> {
    let configs: Vec<WelchConfig> = segment_lens
        .iter()
        .map(|&segment_len| WelchConfig {
            segment_len,
            ..base
        })
        .collect();
    for config in &configs {
        config.validate()?;
        if config.segment_len > waveform.len() {
            return Err(DspError::SegmentTooLong {
                segment_len: config.segment_len,
                available: waveform.len(),
            });
        }
    }

    configs
        .into_iter()
        .map(|config| welch(waveform.samples(), waveform.sample_rate(), config))
        .collect()
}

/// Reject a segmentation that cannot run on `signal` before synthesizing it
fn check_segmentation(welch: &WelchConfig, signal: &SignalConfig) -> DspResult<()> {
    welch.validate()?;
    let available = signal.num_samples();
    if welch.segment_len > available {
        return Err(DspError::SegmentTooLong {
            segment_len: welch.segment_len,
            available,
        });
    }
    Ok(())
}

/// Down-shifted phase of a waveform around `carrier_frequency`
pub fn baseband_phase(
    waveform: &Waveform,
    carrier_frequency: f64,
    unwrap_phase: bool,
) -> DspResult<PhaseSequence> {
    let analytic = AnalyticSignal::from_waveform(waveform)?;
    let phase = downconvert(&analytic, carrier_frequency)?.phase(unwrap_phase)?;
    if phase.degenerate_samples() > 0 {
        warn!(
            "{} samples with undefined phase were held",
            phase.degenerate_samples()
        );
    }
    Ok(phase)
}

/// Measured phase-noise PSD against the additive-noise prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseNoiseExperiment {
    pub signal: SignalConfig,
    pub welch: WelchConfig,
    /// Comparison band; defaults to [`FrequencyBand::below_carrier`]
    pub band: Option<FrequencyBand>,
    pub tolerance_db: f64,
}

impl PhaseNoiseExperiment {
    pub fn new(signal: SignalConfig) -> Self {
        Self {
            signal,
            welch: phase_welch_config(PHASE_SEGMENT_LEN),
            band: None,
            tolerance_db: 1.0,
        }
    }

    pub fn with_welch(mut self, welch: WelchConfig) -> Self {
        self.welch = welch;
        self
    }

    pub fn with_band(mut self, band: FrequencyBand) -> Self {
        self.band = Some(band);
        self
    }

    pub fn with_tolerance(mut self, tolerance_db: f64) -> Self {
        self.tolerance_db = tolerance_db;
        self
    }

    fn resolve_band(&self) -> DspResult<FrequencyBand> {
        match self.band {
            Some(band) => band.validate().map(|_| band),
            None => FrequencyBand::below_carrier(self.signal.carrier_frequency()),
        }
    }

    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> DspResult<PhaseNoiseOutcome> {
        self.signal.validate()?;
        check_segmentation(&self.welch, &self.signal)?;
        let comparison = PhaseNoiseComparison::new(self.resolve_band()?, self.tolerance_db)?;
        let fs = self.signal.sample_rate();
        let fc = self.signal.carrier_frequency();

        let synthesis = Synthesizer::new(self.signal).synthesize(rng)?;

        let noise_psd = welch(&synthesis.noise, fs, self.welch)?;
        let theoretical = theoretical_phase_noise(&noise_psd, self.signal.amplitude())?;

        let phase = baseband_phase(&synthesis.waveform, fc, false)?;
        let measured = welch(phase.values(), fs, self.welch)?;

        let warnings = self
            .signal
            .modulation()
            .map(|m| check_leakage(&m, fc, measured.resolution()))
            .unwrap_or_default();

        let report = comparison.compare(&theoretical, &measured)?;
        info!(
            "Phase-noise floor: {:+.2} dB vs theory over {} ({})",
            report.band_ratio_db,
            report.band,
            if report.pass { "pass" } else { "fail" }
        );

        Ok(PhaseNoiseOutcome {
            noise_stats: SignalStats::compute(&synthesis.noise, Some(fs)),
            phase_stats: SignalStats::compute(phase.values(), Some(fs)),
            noise_psd,
            theoretical,
            measured,
            report,
            warnings,
        })
    }
}

/// Everything produced by a [`PhaseNoiseExperiment`]
#[derive(Debug, Clone)]
pub struct PhaseNoiseOutcome {
    /// PSD of the additive noise alone
    pub noise_psd: PsdEstimate,
    /// `2 · noise_psd / A²`
    pub theoretical: PsdEstimate,
    /// PSD of the down-shifted phase
    pub measured: PsdEstimate,
    pub report: ComparisonReport,
    pub noise_stats: SignalStats,
    pub phase_stats: SignalStats,
    pub warnings: Vec<LeakageWarning>,
}

/// Phase spectra of two carrier amplitudes sharing one noise draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulationExperiment {
    pub signal: SignalConfig,
    pub modulation: PhaseModulation,
    /// `(strong, weak)` carrier amplitudes
    pub amplitudes: (f64, f64),
    pub welch: WelchConfig,
    /// Band used to measure the floor change
    pub band: Option<FrequencyBand>,
}

impl ModulationExperiment {
    /// 0.1 rad at 100 Hz, carrier amplitudes 1 and 0.01
    pub fn new(signal: SignalConfig) -> Self {
        Self {
            signal,
            modulation: PhaseModulation {
                amplitude: 0.1,
                frequency: 100.0,
            },
            amplitudes: (1.0, 0.01),
            welch: phase_welch_config(PHASE_SEGMENT_LEN),
            band: None,
        }
    }

    pub fn with_modulation(mut self, modulation: PhaseModulation) -> Self {
        self.modulation = modulation;
        self
    }

    pub fn with_amplitudes(mut self, strong: f64, weak: f64) -> Self {
        self.amplitudes = (strong, weak);
        self
    }

    pub fn with_welch(mut self, welch: WelchConfig) -> Self {
        self.welch = welch;
        self
    }

    pub fn with_band(mut self, band: FrequencyBand) -> Self {
        self.band = Some(band);
        self
    }

    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> DspResult<ModulationOutcome> {
        let (a_strong, a_weak) = self.amplitudes;
        let strong_config = self
            .signal
            .with_modulation(Some(self.modulation))?
            .with_amplitude(a_strong)?;
        let weak_config = strong_config.with_amplitude(a_weak)?;
        check_segmentation(&self.welch, &self.signal)?;
        let band = match self.band {
            Some(band) => band.validate().map(|_| band)?,
            None => FrequencyBand::below_carrier(self.signal.carrier_frequency())?,
        };

        let fs = self.signal.sample_rate();
        let fc = self.signal.carrier_frequency();
        let noise = self.signal.noise().generate(self.signal.num_samples(), rng)?;

        let noise_psd = welch(&noise, fs, self.welch)?;
        let strong = Synthesizer::new(strong_config).synthesize_with_noise(noise.clone())?;
        let weak = Synthesizer::new(weak_config).synthesize_with_noise(noise)?;

        let strong_psd = welch(baseband_phase(&strong.waveform, fc, false)?.values(), fs, self.welch)?;
        let weak_psd = welch(baseband_phase(&weak.waveform, fc, false)?.values(), fs, self.welch)?;

        let warnings = check_leakage(&self.modulation, fc, strong_psd.resolution());
        let scaling = compare_scaling((&strong_psd, a_strong), (&weak_psd, a_weak), band)?;
        info!(
            "Floor change A={} -> A={}: predicted {:+.2} dB, measured {:+.2} dB",
            a_strong, a_weak, scaling.predicted_db, scaling.measured_db
        );

        Ok(ModulationOutcome {
            noise_psd,
            strong: (a_strong, strong_psd),
            weak: (a_weak, weak_psd),
            scaling,
            warnings,
        })
    }
}

/// Everything produced by a [`ModulationExperiment`]
#[derive(Debug, Clone)]
pub struct ModulationOutcome {
    pub noise_psd: PsdEstimate,
    /// Amplitude and phase PSD of the strong carrier
    pub strong: (f64, PsdEstimate),
    /// Amplitude and phase PSD of the weak carrier
    pub weak: (f64, PsdEstimate),
    pub scaling: ScalingReport,
    pub warnings: Vec<LeakageWarning>,
}

/// Unwrapped baseband phase of one carrier amplitude over a time window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseTrace {
    pub amplitude: f64,
    pub timestamps: Vec<f64>,
    pub phase: Vec<f64>,
}

impl PhaseTrace {
    /// Format as CSV
    pub fn to_csv(&self) -> String {
        let mut output = String::from("time_s,phase_rad\n");
        for (t, p) in self.timestamps.iter().zip(self.phase.iter()) {
            output.push_str(&format!("{},{}\n", t, p));
        }
        output
    }
}

/// Time traces of a large phase excursion at several carrier amplitudes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceExperiment {
    pub signal: SignalConfig,
    pub modulation: PhaseModulation,
    pub amplitudes: Vec<f64>,
    /// Traces are cut at this time in seconds
    pub window: f64,
}

impl TraceExperiment {
    /// 10 rad at 10 Hz, amplitudes 1 and 0.05, first 0.4 s
    pub fn new(signal: SignalConfig) -> Self {
        Self {
            signal,
            modulation: PhaseModulation {
                amplitude: 10.0,
                frequency: 10.0,
            },
            amplitudes: vec![1.0, 0.05],
            window: 0.4,
        }
    }

    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> DspResult<Vec<PhaseTrace>> {
        let base = self.signal.with_modulation(Some(self.modulation))?;
        let configs = self
            .amplitudes
            .iter()
            .map(|&a| base.with_amplitude(a))
            .collect::<DspResult<Vec<_>>>()?;

        let fc = base.carrier_frequency();
        let noise = base.noise().generate(base.num_samples(), rng)?;

        configs
            .into_iter()
            .map(|config| {
                let synthesis = Synthesizer::new(config).synthesize_with_noise(noise.clone())?;
                let waveform = &synthesis.waveform;
                let phase = baseband_phase(waveform, fc, true)?;
                let keep = waveform.truncated(self.window).len();
                Ok(PhaseTrace {
                    amplitude: config.amplitude(),
                    timestamps: waveform.timestamps()[..keep].to_vec(),
                    phase: phase.values()[..keep].to_vec(),
                })
            })
            .collect()
    }
}

/// Shifted two-sided spectra along the down-conversion chain
#[derive(Debug, Clone)]
pub struct TwoSidedSpectra {
    /// Real waveform, scaled by 4 to line up with the analytic spectrum
    pub carrier: PsdEstimate,
    /// Analytic signal: positive frequencies only
    pub analytic: PsdEstimate,
    /// Analytic signal shifted down by `fc`
    pub baseband: PsdEstimate,
}

/// Two-sided spectra of a waveform, its analytic signal and the down-shifted
/// analytic signal, all shifted to ascending frequency
pub fn two_sided_spectra(
    waveform: &Waveform,
    carrier_frequency: f64,
    config: WelchConfig,
) -> DspResult<TwoSidedSpectra> {
    let config = config.with_sidedness(Sidedness::TwoSided);
    config.validate()?;
    let fs = waveform.sample_rate();

    let analytic = AnalyticSignal::from_waveform(waveform)?;
    let baseband = downconvert(&analytic, carrier_frequency)?;

    let carrier = welch(waveform.samples(), fs, config)?.scaled(4.0).shifted();
    let analytic_psd = welch(analytic.samples(), fs, config)?.shifted();
    let baseband_psd = welch(baseband.samples(), fs, config)?.shifted();

    Ok(TwoSidedSpectra {
        carrier,
        analytic: analytic_psd,
        baseband: baseband_psd,
    })
}
