//! Core types for phase-noise analysis
//!
//! Sample aliases and the error taxonomy shared by every stage of the
//! pipeline.
//!
//! ## Complex Samples
//!
//! A real carrier `A·cos(θ)` only becomes phase-measurable once it is paired
//! with its quadrature component `A·sin(θ)`. The complex pair `A·e^(jθ)` is
//! what the analytic-signal extractor produces and what the down-converter
//! consumes:
//!
//! ```text
//!            Q (quadrature)
//!            ^
//!            |     * A·e^(jθ)
//!            |    /
//!            |   / |z| = A
//!            |  /  arg z = θ
//!            | /
//!   ---------+---------> I (original waveform)
//!            |
//! ```

use rustfft::num_complex::Complex64;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// A single complex (I/Q) sample
pub type IQSample = Complex64;

/// A floating point sample (for real-valued signals)
pub type Sample = f64;

/// Result type for DSP operations
pub type DspResult<T> = Result<T, DspError>;

/// Broad error category, used by callers that only care whether the
/// configuration or the data was at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Parameters rejected before any computation started
    Configuration,
    /// Input data for which the requested quantity is undefined
    NumericalDegeneracy,
}

/// Errors that can occur during DSP operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DspError {
    #[error("Invalid sample rate: {0} Hz. Must be positive and finite")]
    InvalidSampleRate(f64),

    #[error("Invalid duration: {0} s. Must be positive and finite")]
    InvalidDuration(f64),

    #[error("Sample rate {sample_rate} Hz over {duration} s yields no samples")]
    NoSamples { sample_rate: f64, duration: f64 },

    #[error("Signal of {requested} samples exceeds the limit of {max}")]
    TooManySamples { requested: f64, max: usize },

    #[error("Invalid carrier frequency: {frequency} Hz. Must lie in [0, {nyquist}) Hz")]
    InvalidCarrierFrequency { frequency: f64, nyquist: f64 },

    #[error("Invalid carrier amplitude: {0}")]
    InvalidAmplitude(f64),

    #[error("Invalid noise parameters: mean {mean}, standard deviation {std_dev}")]
    InvalidNoise { mean: f64, std_dev: f64 },

    #[error("Invalid phase modulation: {0}")]
    InvalidModulation(String),

    #[error("Segment length {segment_len} exceeds sequence length {available}")]
    SegmentTooLong { segment_len: usize, available: usize },

    #[error("Segment length {0} is not a power of two >= 2")]
    SegmentNotPowerOfTwo(usize),

    #[error("Overlap {overlap} must be smaller than segment length {segment_len}")]
    InvalidOverlap { overlap: usize, segment_len: usize },

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Incompatible spectra: {0}")]
    IncompatibleSpectra(String),

    #[error("Invalid frequency band: [{low}, {high}] Hz")]
    InvalidBand { low: f64, high: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Empty input sequence")]
    EmptyInput,

    #[error("Degenerate signal: {0}")]
    DegenerateSignal(String),
}

impl DspError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DspError::EmptyInput | DspError::DegenerateSignal(_) => {
                ErrorKind::NumericalDegeneracy
            }
            _ => ErrorKind::Configuration,
        }
    }

    /// True for errors caused by invalid parameters
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

/// Validate a sample rate shared by every stage
pub(crate) fn check_sample_rate(sample_rate: f64) -> DspResult<()> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(DspError::InvalidSampleRate(sample_rate))
    }
}
