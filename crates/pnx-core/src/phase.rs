//! Instantaneous Phase
//!
//! Phase extraction from complex samples and 2π unwrapping.
//!
//! ## Unwrapping
//!
//! `arg z` is only known modulo 2π. Each adjacent difference is reduced into
//! `[-π, π]` by adding the multiple of 2π that brings it there, and the
//! running correction is carried forward, so a sequence of any slope comes
//! out continuous:
//!
//! ```text
//! wrapped:    0.0  2.5  -1.3  1.2  -2.6      (steps of ~2.5 rad)
//! unwrapped:  0.0  2.5   4.98 7.48  9.97
//! ```
//!
//! ## Degenerate Samples
//!
//! A sample whose magnitude is at most [`MIN_PHASE_MAGNITUDE`] (or that is
//! not finite) has no phase. Such samples hold the previous valid phase;
//! samples before the first valid one take that first phase. The number of
//! substituted samples is reported by [`PhaseSequence::degenerate_samples`].
//! A sequence without any valid sample is rejected with
//! [`DspError::DegenerateSignal`].

use crate::types::{check_sample_rate, DspError, DspResult, IQSample};
use serde::Serialize;
use std::f64::consts::PI;
use tracing::debug;

/// Phase values in radians, one per input sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSequence {
    values: Vec<f64>,
    sample_rate: f64,
    unwrapped: bool,
    degenerate_samples: usize,
}

impl PhaseSequence {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Whether 2π discontinuities were removed
    pub fn is_unwrapped(&self) -> bool {
        self.unwrapped
    }

    /// Samples whose phase was undefined and continued from a neighbour
    pub fn degenerate_samples(&self) -> usize {
        self.degenerate_samples
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest absolute difference between adjacent samples
    pub fn max_step(&self) -> f64 {
        self.values
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0, f64::max)
    }

    /// Mean phase in radians
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Subtract `ramp(t)` from every value, `t = i / fs`
    pub(crate) fn minus_ramp(mut self, ramp: impl Fn(f64) -> f64) -> Self {
        for (i, value) in self.values.iter_mut().enumerate() {
            *value -= ramp(i as f64 / self.sample_rate);
        }
        self
    }
}

/// Extract the phase of every sample, optionally unwrapped
pub fn phase_of(samples: &[IQSample], sample_rate: f64, unwrap_phase: bool) -> DspResult<PhaseSequence> {
    check_sample_rate(sample_rate)?;
    if samples.is_empty() {
        return Err(DspError::EmptyInput);
    }

    let first_valid = samples
        .iter()
        .position(|z| has_phase(*z))
        .ok_or_else(|| {
            DspError::DegenerateSignal(format!(
                "all {} samples have negligible or non-finite magnitude",
                samples.len()
            ))
        })?;

    let mut degenerate_samples = 0;
    let mut last = samples[first_valid].arg();
    let angles: Vec<f64> = samples
        .iter()
        .map(|z| {
            if has_phase(*z) {
                last = z.arg();
            } else {
                degenerate_samples += 1;
            }
            last
        })
        .collect();

    if degenerate_samples > 0 {
        debug!(
            "{} of {} samples had undefined phase and were held",
            degenerate_samples,
            samples.len()
        );
    }

    let values = if unwrap_phase { unwrap(&angles) } else { angles };

    Ok(PhaseSequence {
        values,
        sample_rate,
        unwrapped: unwrap_phase,
        degenerate_samples,
    })
}

/// Magnitude at or below which a sample has no usable phase
pub const MIN_PHASE_MAGNITUDE: f64 = 1e-300;

#[inline]
fn has_phase(z: IQSample) -> bool {
    z.re.is_finite() && z.im.is_finite() && z.norm() > MIN_PHASE_MAGNITUDE
}

/// Remove 2π discontinuities (`numpy.unwrap` semantics)
pub fn unwrap(phases: &[f64]) -> Vec<f64> {
    let mut output = Vec::with_capacity(phases.len());
    let Some(&first) = phases.first() else {
        return output;
    };
    output.push(first);

    let mut correction = 0.0;
    for pair in phases.windows(2) {
        let diff = pair[1] - pair[0];
        if diff.abs() >= PI {
            let mut reduced = (diff + PI).rem_euclid(2.0 * PI) - PI;
            if reduced == -PI && diff > 0.0 {
                reduced = PI;
            }
            correction += reduced - diff;
        }
        output.push(pair[1] + correction);
    }
    output
}

/// Wrap phase to `[-π, π)`
pub fn wrap_phase(phase: f64) -> f64 {
    (phase + PI).rem_euclid(2.0 * PI) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_wrap() {
        let input = vec![0.0, 0.5, 1.0, 1.5, 2.0];
        assert_eq!(unwrap(&input), input);
    }

    #[test]
    fn test_positive_wrap() {
        let wrapped = vec![0.0, 1.0, 2.0, 3.0, -3.0, -2.0, -1.0, 0.0];
        let unwrapped = unwrap(&wrapped);
        for w in unwrapped.windows(2) {
            assert!(w[1] > w[0], "expected monotonic ramp, got {:?}", unwrapped);
        }
        assert!((unwrapped[7] - 2.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_multi_turn_jump() {
        // A raw jump of ~3 turns is reduced to its principal value
        let unwrapped = unwrap(&[0.0, 6.0 * PI + 0.2]);
        assert!((unwrapped[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unwrap_steep_ramp() {
        let step = 2.5;
        let ramp: Vec<f64> = (0..200).map(|i| i as f64 * step).collect();
        let wrapped: Vec<f64> = ramp.iter().map(|&p| wrap_phase(p)).collect();
        let unwrapped = unwrap(&wrapped);
        for (u, r) in unwrapped.iter().zip(ramp.iter()) {
            assert!((u - r).abs() < 1e-9);
        }
        for w in unwrapped.windows(2) {
            assert!((w[1] - w[0]).abs() <= PI + 1e-12);
        }
    }

    #[test]
    fn test_wrap_phase_range() {
        for k in -20..20 {
            let p = wrap_phase(k as f64 * 0.77);
            assert!((-PI..PI).contains(&p));
        }
        assert!((wrap_phase(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_phase_of_rotating_phasor() {
        let samples: Vec<IQSample> = (0..64).map(|i| IQSample::cis(0.4 * i as f64)).collect();
        let phase = phase_of(&samples, 1.0, true).unwrap();
        assert!(phase.is_unwrapped());
        assert_eq!(phase.degenerate_samples(), 0);
        assert!((phase.values()[63] - 0.4 * 63.0).abs() < 1e-9);
        assert!(phase.max_step() < 0.41);
    }

    #[test]
    fn test_phase_of_holds_zero_samples() {
        let samples = vec![
            IQSample::new(0.0, 0.0),
            IQSample::new(0.0, 1.0),
            IQSample::new(0.0, 0.0),
            IQSample::new(-1.0, 0.0),
        ];
        let phase = phase_of(&samples, 1.0, false).unwrap();
        assert_eq!(phase.degenerate_samples(), 2);
        assert_eq!(phase.values()[0], PI / 2.0);
        assert_eq!(phase.values()[2], PI / 2.0);
        assert!(phase.values().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_phase_of_magnitude_threshold() {
        let samples = vec![
            IQSample::new(0.0, 1e-299),
            IQSample::new(-1e-310, 0.0),
            IQSample::new(MIN_PHASE_MAGNITUDE, 0.0),
            IQSample::new(f64::NAN, 1.0),
            IQSample::new(-1.0, 0.0),
        ];
        let phase = phase_of(&samples, 1.0, false).unwrap();
        assert_eq!(phase.degenerate_samples(), 3);
        assert_eq!(phase.values()[1], PI / 2.0);
        assert_eq!(phase.values()[2], PI / 2.0);
        assert_eq!(phase.values()[3], PI / 2.0);
        assert_eq!(phase.values()[4], PI);

        let tiny = vec![IQSample::new(1e-305, -1e-305); 8];
        assert!(matches!(
            phase_of(&tiny, 1.0, false),
            Err(DspError::DegenerateSignal(_))
        ));
    }

    #[test]
    fn test_phase_of_all_zero_is_degenerate() {
        let samples = vec![IQSample::new(0.0, 0.0); 16];
        let err = phase_of(&samples, 1.0, true).unwrap_err();
        assert!(matches!(err, DspError::DegenerateSignal(_)));
        assert!(matches!(phase_of(&[], 1.0, true), Err(DspError::EmptyInput)));
    }
}
