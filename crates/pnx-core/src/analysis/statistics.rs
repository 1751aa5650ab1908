//! Signal Statistics
//!
//! Summary statistics for real sequences: the synthesized carrier, the noise
//! realisation that was added to it, or an extracted phase trace.

use serde::Serialize;

/// Summary statistics of a real sequence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalStats {
    /// Number of samples analyzed
    pub num_samples: usize,
    /// Signal duration in seconds (if sample rate provided)
    pub duration_sec: Option<f64>,
    /// Sample rate (if provided)
    pub sample_rate: Option<f64>,
    /// Arithmetic mean
    pub mean: f64,
    /// Population variance (divides by N)
    pub variance: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Mean of the squared samples (total power)
    pub mean_square: f64,
    /// Root of the mean square
    pub rms: f64,
    /// Largest absolute value
    pub peak_amplitude: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Mean power in dB (relative to 1.0)
    pub power_db: f64,
    /// Peak to RMS ratio in dB
    pub crest_factor_db: f64,
}

impl SignalStats {
    /// Compute statistics for the given samples
    pub fn compute(samples: &[f64], sample_rate: Option<f64>) -> Self {
        if samples.is_empty() {
            return Self::empty(sample_rate);
        }

        let num_samples = samples.len();
        let n = num_samples as f64;
        let duration_sec = sample_rate.map(|sr| n / sr);

        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let mean_square = samples.iter().map(|x| x * x).sum::<f64>() / n;
        let rms = mean_square.sqrt();

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &x in samples {
            min = min.min(x);
            max = max.max(x);
        }
        let peak_amplitude = min.abs().max(max.abs());

        let power_db = if mean_square > 1e-20 {
            10.0 * mean_square.log10()
        } else {
            -200.0
        };
        let crest_factor_db = 20.0 * (peak_amplitude / rms.max(1e-20)).max(1e-20).log10();

        Self {
            num_samples,
            duration_sec,
            sample_rate,
            mean,
            variance,
            std_dev: variance.sqrt(),
            mean_square,
            rms,
            peak_amplitude,
            min,
            max,
            power_db,
            crest_factor_db,
        }
    }

    fn empty(sample_rate: Option<f64>) -> Self {
        Self {
            num_samples: 0,
            duration_sec: Some(0.0),
            sample_rate,
            mean: 0.0,
            variance: 0.0,
            std_dev: 0.0,
            mean_square: 0.0,
            rms: 0.0,
            peak_amplitude: 0.0,
            min: 0.0,
            max: 0.0,
            power_db: -200.0,
            crest_factor_db: 0.0,
        }
    }

    /// Format as text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str("Signal Statistics\n");
        output.push_str(&"═".repeat(50));
        output.push('\n');

        output.push_str(&format!("Samples:           {}\n", self.num_samples));
        if let Some(dur) = self.duration_sec {
            output.push_str(&format!("Duration:          {:.6} s\n", dur));
        }
        if let Some(sr) = self.sample_rate {
            output.push_str(&format!("Sample Rate:       {:.0} Hz\n", sr));
        }

        output.push_str("\nMoments\n");
        output.push_str(&"─".repeat(50));
        output.push('\n');
        output.push_str(&format!("Mean:              {:.6e}\n", self.mean));
        output.push_str(&format!("Std Deviation:     {:.6e}\n", self.std_dev));
        output.push_str(&format!("Mean Square:       {:.6e}\n", self.mean_square));
        output.push_str(&format!("Power:             {:.2} dB\n", self.power_db));

        output.push_str("\nAmplitude\n");
        output.push_str(&"─".repeat(50));
        output.push('\n');
        output.push_str(&format!("RMS:               {:.6}\n", self.rms));
        output.push_str(&format!("Peak:              {:.6}\n", self.peak_amplitude));
        output.push_str(&format!("Range:             [{:.6}, {:.6}]\n", self.min, self.max));
        output.push_str(&format!("Crest Factor:      {:.2} dB\n", self.crest_factor_db));

        output
    }

    /// Format as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_stats_empty() {
        let stats = SignalStats::compute(&[], Some(48000.0));
        assert_eq!(stats.num_samples, 0);
        assert_eq!(stats.power_db, -200.0);
    }

    #[test]
    fn test_stats_cosine() {
        let sample_rate = 1000.0;
        let amplitude = 2.0;
        let samples: Vec<f64> = (0..1000)
            .map(|i| amplitude * (2.0 * PI * 50.0 * i as f64 / sample_rate).cos())
            .collect();

        let stats = SignalStats::compute(&samples, Some(sample_rate));

        assert!((stats.duration_sec.unwrap() - 1.0).abs() < 1e-12);
        assert!(stats.mean.abs() < 1e-9);
        // Mean square of A·cos is A²/2
        assert!((stats.mean_square - 2.0).abs() < 1e-9);
        assert!((stats.peak_amplitude - amplitude).abs() < 1e-12);
        assert!((stats.crest_factor_db - 20.0 * 2f64.sqrt().log10()).abs() < 1e-6);
    }

    #[test]
    fn test_stats_offset() {
        let samples = vec![1.0, 3.0, 1.0, 3.0];
        let stats = SignalStats::compute(&samples, None);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.variance, 1.0);
        assert_eq!(stats.std_dev, 1.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!(stats.duration_sec.is_none());
        assert!(stats.to_json().unwrap().contains("\"variance\": 1.0"));
    }
}
