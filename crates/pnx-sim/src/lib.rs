//! # Phase Noise Simulation
//!
//! Synthesizes noisy, optionally phase-modulated carriers and runs them
//! through the `pnx-core` pipeline to compare measured phase noise against
//! the additive-noise prediction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                    │
//! │                     (pnx-cli, tests)                    │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Experiments                       │
//! │   sweep, phase noise, modulation, trace, two-sided      │
//! └─────────────────────────────────────────────────────────┘
//!         │                                      │
//!         ▼                                      ▼
//!   ┌────────────┐                      ┌──────────────────┐
//!   │Synthesizer │                      │    pnx-core      │
//!   │(seeded RNG)│                      │ analytic / Welch │
//!   └────────────┘                      └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pnx_sim::{seeded_rng, PhaseNoiseExperiment, SignalConfig};
//!
//! let config = SignalConfig::default();
//! let outcome = PhaseNoiseExperiment::new(config)
//!     .run(&mut seeded_rng(0))
//!     .unwrap();
//! println!("{}", outcome.report.to_text());
//! ```

pub mod experiment;
pub mod synth;

// Re-exports
pub use experiment::{
    baseband_phase, carrier_psd_sweep, phase_welch_config, two_sided_spectra,
    ModulationExperiment, ModulationOutcome, PhaseNoiseExperiment, PhaseNoiseOutcome, PhaseTrace,
    TraceExperiment, TwoSidedSpectra, PHASE_SEGMENT_LEN, SWEEP_SEGMENT_LENGTHS,
};
pub use synth::{seeded_rng, GaussianNoise, SignalConfig, SignalConfigBuilder, Synthesis, Synthesizer};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::experiment::{ModulationExperiment, PhaseNoiseExperiment, TraceExperiment};
    pub use crate::synth::{seeded_rng, SignalConfig, Synthesizer};
}
