//! Signal Analysis Module
//!
//! Spectral estimation and measurement tools for real and complex sequences.
//!
//! ## Features
//!
//! - **Welch PSD**: averaged, windowed periodograms with power or density
//!   scaling, one- or two-sided output
//! - **Signal Statistics**: moments, power and crest factor of real sequences
//! - **Peak Detection**: find spectral lines above the floor
//!
//! ## Example
//!
//! ```rust,no_run
//! use pnx_core::analysis::{welch, PeakFinder, Scaling, SignalStats, WelchConfig};
//!
//! let samples: Vec<f64> = vec![0.0; 1 << 16]; // Your real samples
//! let sample_rate = 100_000.0;
//!
//! let config = WelchConfig::new(4096).with_scaling(Scaling::Density);
//! let psd = welch(&samples, sample_rate, config).expect("valid segmentation");
//! let peaks = PeakFinder::new().find_peaks(&psd);
//!
//! let stats = SignalStats::compute(&samples, Some(sample_rate));
//! println!("Mean square: {:.3e}, {} peaks", stats.mean_square, peaks.len());
//! ```

pub mod peaks;
pub mod spectrum;
pub mod statistics;

pub use peaks::{PeakFinder, SpectralPeak};
pub use spectrum::{
    welch, BinOrder, Detrend, PsdEstimate, Scaling, Sidedness, SpectralInput, WelchConfig,
    WelchEstimator, WindowFunction,
};
pub use statistics::SignalStats;
