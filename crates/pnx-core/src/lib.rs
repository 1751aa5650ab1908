//! # Phase Noise Core DSP Library
//!
//! Signal-processing building blocks for studying how additive noise on a
//! carrier turns into phase noise, as a design aid for phase-locked loops.
//!
//! ## Overview
//!
//! - **Analytic Signal**: FFT-based quadrature extraction of a real waveform
//! - **Phase**: instantaneous phase with numpy-compatible unwrapping
//! - **Down-Conversion**: mixing to baseband to isolate the phase deviation
//! - **Welch PSD**: averaged periodograms with power or density scaling
//! - **Comparison**: measured phase-noise floor vs the `2·S_n/A²` law
//!
//! ## Signal Flow
//!
//! ```text
//! x(t) → Analytic → Down-convert(fc) → arg → Welch PSD ─┐
//!                                                       ├→ Comparison
//! n(t) ─────────────────────────────────→ Welch PSD ────┘   (× 2/A²)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use pnx_core::prelude::*;
//!
//! # fn main() -> DspResult<()> {
//! let fs = 100_000.0;
//! let carrier: Vec<f64> = (0..1 << 17)
//!     .map(|i| (2.0 * std::f64::consts::PI * 25_000.0 * i as f64 / fs).cos())
//!     .collect();
//!
//! let analytic = AnalyticSignal::from_samples(&carrier, fs)?;
//! let baseband = downconvert(&analytic, 25_000.0)?;
//! let phase = baseband.phase(false)?;
//!
//! let psd = welch(phase.values(), fs, WelchConfig::new(4096))?;
//! println!("{} bins at {:.2} Hz", psd.len(), psd.resolution());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod analytic;
pub mod comparison;
pub mod downconvert;
pub mod fft_utils;
pub mod phase;
pub mod types;
pub mod waveform;

// Re-exports
pub use analysis::{
    welch, BinOrder, Detrend, PeakFinder, PsdEstimate, Scaling, Sidedness, SignalStats,
    SpectralPeak, WelchConfig, WelchEstimator, WindowFunction,
};
pub use analytic::AnalyticSignal;
pub use comparison::{
    check_leakage, compare_scaling, predicted_floor_change_db, theoretical_phase_noise,
    ComparisonReport, FrequencyBand, LeakageWarning, PhaseNoiseComparison, ScalingReport,
};
pub use downconvert::{downconvert, BasebandSignal};
pub use fft_utils::FftProcessor;
pub use phase::{phase_of, unwrap, wrap_phase, PhaseSequence};
pub use types::{Complex, DspError, DspResult, ErrorKind, IQSample, Sample};
pub use waveform::{time_vector, PhaseModulation, Waveform};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{
        welch, PsdEstimate, Scaling, Sidedness, WelchConfig, WelchEstimator, WindowFunction,
    };
    pub use crate::analytic::AnalyticSignal;
    pub use crate::comparison::{theoretical_phase_noise, FrequencyBand, PhaseNoiseComparison};
    pub use crate::downconvert::downconvert;
    pub use crate::types::{DspError, DspResult, IQSample};
    pub use crate::waveform::{PhaseModulation, Waveform};
}
