//! FFT Utilities
//!
//! Planned forward/inverse transforms plus the numpy-compatible helpers the
//! spectral code relies on: frequency axes and spectrum reordering.
//!
//! ## Bin Ordering
//!
//! A length-N transform returns bins in "natural" order, DC first and the
//! negative frequencies in the upper half:
//!
//! ```text
//! natural:  [ 0, df, 2df, ..., (N/2-1)df, -N/2·df, ..., -df ]
//! shifted:  [ -N/2·df, ..., -df, 0, df, ..., (N/2-1)df ]
//! ```
//!
//! [`FftProcessor::fft_shift`] maps the first layout onto the second and
//! [`FftProcessor::ifft_shift`] undoes it, for even and odd N.

use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// FFT processor with cached plans and scratch space
pub struct FftProcessor {
    /// FFT size
    size: usize,
    /// Forward FFT instance
    fft_forward: Arc<dyn Fft<f64>>,
    /// Inverse FFT instance
    fft_inverse: Arc<dyn Fft<f64>>,
    /// Scratch buffer for FFT operations
    scratch: Vec<Complex64>,
}

impl fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftProcessor")
            .field("size", &self.size)
            .finish()
    }
}

impl FftProcessor {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let fft_inverse = planner.plan_fft_inverse(size);
        let scratch_len = fft_forward
            .get_inplace_scratch_len()
            .max(fft_inverse.get_inplace_scratch_len());
        let scratch = vec![Complex64::new(0.0, 0.0); scratch_len];

        Self {
            size,
            fft_forward,
            fft_inverse,
            scratch,
        }
    }

    /// Get the FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Compute the forward FFT in-place
    pub fn fft_inplace(&mut self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        self.fft_forward.process_with_scratch(buffer, &mut self.scratch);
    }

    /// Compute the forward FFT in-place without touching the cached scratch
    /// buffer, so one processor can be shared between threads.
    pub fn fft_inplace_shared(&self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        self.fft_forward.process(buffer);
    }

    /// Compute the forward FFT, returning a new buffer
    pub fn fft(&mut self, input: &[Complex64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input.to_vec();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));
        self.fft_inplace(&mut buffer);
        buffer
    }

    /// Compute the inverse FFT in-place (normalized by 1/N)
    pub fn ifft_inplace(&mut self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        self.fft_inverse.process_with_scratch(buffer, &mut self.scratch);

        let scale = 1.0 / self.size as f64;
        for sample in buffer.iter_mut() {
            *sample *= scale;
        }
    }

    /// Compute the inverse FFT, returning a new buffer
    pub fn ifft(&mut self, input: &[Complex64]) -> Vec<Complex64> {
        let mut buffer = input.to_vec();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));
        self.ifft_inplace(&mut buffer);
        buffer
    }

    /// FFT shift - move zero frequency to center
    pub fn fft_shift<T: Clone>(spectrum: &[T]) -> Vec<T> {
        let mut shifted = spectrum.to_vec();
        shifted.rotate_right(spectrum.len() / 2);
        shifted
    }

    /// Inverse of [`FftProcessor::fft_shift`]
    pub fn ifft_shift<T: Clone>(spectrum: &[T]) -> Vec<T> {
        let mut unshifted = spectrum.to_vec();
        unshifted.rotate_left(spectrum.len() / 2);
        unshifted
    }
}

/// Bin frequencies of a length-`n` transform in natural order
/// (`numpy.fft.fftfreq`).
pub fn fft_frequencies(n: usize, sample_rate: f64) -> Vec<f64> {
    let df = sample_rate / n as f64;
    let positive = (n + 1) / 2;
    (0..n)
        .map(|i| {
            if i < positive {
                i as f64 * df
            } else {
                (i as f64 - n as f64) * df
            }
        })
        .collect()
}

/// Non-negative bin frequencies of a real length-`n` transform
/// (`numpy.fft.rfftfreq`).
pub fn rfft_frequencies(n: usize, sample_rate: f64) -> Vec<f64> {
    let df = sample_rate / n as f64;
    (0..=n / 2).map(|i| i as f64 * df).collect()
}
