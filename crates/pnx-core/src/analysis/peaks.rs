//! Spectral Peak Detection
//!
//! Find local maxima of a PSD estimate that stand out from its floor. Used to
//! locate the carrier line and the modulation sidebands around it.

use crate::analysis::spectrum::PsdEstimate;
use serde::Serialize;

/// A detected spectral peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralPeak {
    /// Frequency in Hz
    pub frequency: f64,
    /// Value in dB
    pub power_db: f64,
    /// Bin index in the estimate
    pub bin_index: usize,
    /// Distance from the floor in dB
    pub above_floor_db: f64,
}

/// Peak detection configuration
#[derive(Debug, Clone, Copy)]
pub struct PeakFinder {
    /// Threshold above the floor in dB
    threshold_db: f64,
    /// Maximum number of peaks to report
    max_peaks: usize,
    /// Minimum distance between peaks in bins
    min_distance: usize,
}

impl Default for PeakFinder {
    fn default() -> Self {
        Self {
            threshold_db: 10.0,
            max_peaks: 10,
            min_distance: 3,
        }
    }
}

impl PeakFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the threshold above the floor
    pub fn with_threshold(mut self, threshold_db: f64) -> Self {
        self.threshold_db = threshold_db;
        self
    }

    /// Set the maximum number of peaks to find
    pub fn with_max_peaks(mut self, max_peaks: usize) -> Self {
        self.max_peaks = max_peaks;
        self
    }

    /// Set minimum distance between peaks
    pub fn with_min_distance(mut self, min_distance: usize) -> Self {
        self.min_distance = min_distance;
        self
    }

    /// Find peaks in a PSD estimate
    pub fn find_peaks(&self, psd: &PsdEstimate) -> Vec<SpectralPeak> {
        self.find_peaks_in_power(&psd.to_db(), psd.frequencies())
    }

    /// Find peaks in a dB spectrum. Peaks are returned in ascending frequency.
    pub fn find_peaks_in_power(&self, power_db: &[f64], frequencies: &[f64]) -> Vec<SpectralPeak> {
        let n = power_db.len().min(frequencies.len());
        if n < 3 {
            return Vec::new();
        }

        // Lower quartile as the floor
        let mut sorted_power = power_db[..n].to_vec();
        sorted_power.sort_by(f64::total_cmp);
        let floor = sorted_power[n / 4];
        let threshold = floor + self.threshold_db;

        let mut candidates: Vec<(usize, f64)> = (1..n - 1)
            .filter(|&i| {
                let p = power_db[i];
                p > threshold && p > power_db[i - 1] && p > power_db[i + 1]
            })
            .map(|i| (i, power_db[i]))
            .collect();

        // Strongest first
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut peaks = Vec::new();
        let mut used = vec![false; n];

        for (idx, power) in candidates {
            if peaks.len() >= self.max_peaks {
                break;
            }

            let lo = idx.saturating_sub(self.min_distance);
            let hi = (idx + self.min_distance).min(n - 1);
            if used[lo..=hi].iter().any(|&u| u) {
                continue;
            }

            used[idx] = true;
            peaks.push(SpectralPeak {
                frequency: frequencies[idx],
                power_db: power,
                bin_index: idx,
                above_floor_db: power - floor,
            });
        }

        peaks.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        peaks
    }

    /// Format peaks as text table
    pub fn format_text(peaks: &[SpectralPeak]) -> String {
        let mut output = String::new();
        output.push_str("Spectral Peaks\n");
        output.push_str(&"═".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "{:>4}  {:>14}  {:>10}  {:>12}\n",
            "#", "Frequency (Hz)", "Level (dB)", "Above Floor"
        ));
        output.push_str(&"─".repeat(60));
        output.push('\n');

        for (i, peak) in peaks.iter().enumerate() {
            output.push_str(&format!(
                "{:>4}  {:>14.2}  {:>10.2}  {:>12.2} dB\n",
                i + 1,
                peak.frequency,
                peak.power_db,
                peak.above_floor_db
            ));
        }

        if peaks.is_empty() {
            output.push_str("  No peaks found above threshold\n");
        }

        output
    }

    /// Format peaks as JSON
    pub fn format_json(peaks: &[SpectralPeak]) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&serde_json::json!({
            "num_peaks": peaks.len(),
            "peaks": peaks,
        }))
    }

    /// Format peaks as CSV
    pub fn format_csv(peaks: &[SpectralPeak]) -> String {
        let mut output = String::from("frequency_hz,power_db,bin_index,above_floor_db\n");
        for peak in peaks {
            output.push_str(&format!(
                "{},{},{},{}\n",
                peak.frequency, peak.power_db, peak.bin_index, peak.above_floor_db
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::spectrum::{welch, Scaling, WelchConfig};
    use std::f64::consts::PI;

    #[test]
    fn test_find_two_tones() {
        let sample_rate = 8192.0;
        let freqs = [1000.0, 3000.0];
        let samples: Vec<f64> = (0..8192)
            .map(|i| {
                let t = i as f64 / sample_rate;
                freqs.iter().map(|f| (2.0 * PI * f * t).cos()).sum()
            })
            .collect();

        let config = WelchConfig::new(1024).with_scaling(Scaling::Spectrum);
        let psd = welch(&samples, sample_rate, config).unwrap();

        let peaks = PeakFinder::new()
            .with_threshold(20.0)
            .with_max_peaks(2)
            .find_peaks(&psd);

        assert_eq!(peaks.len(), 2);
        for (peak, &expected) in peaks.iter().zip(freqs.iter()) {
            assert!(
                (peak.frequency - expected).abs() < psd.resolution(),
                "Peak at {} Hz, expected {} Hz",
                peak.frequency,
                expected
            );
        }
    }

    #[test]
    fn test_min_distance() {
        let power_db = vec![-60.0, -10.0, -60.0, -12.0, -60.0, -60.0, -60.0, -60.0];
        let frequencies: Vec<f64> = (0..power_db.len()).map(|i| i as f64).collect();

        let close = PeakFinder::new().with_min_distance(3);
        let peaks = close.find_peaks_in_power(&power_db, &frequencies);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].bin_index, 1);

        let loose = PeakFinder::new().with_min_distance(1);
        assert_eq!(loose.find_peaks_in_power(&power_db, &frequencies).len(), 2);
    }

    #[test]
    fn test_no_peaks_in_flat_spectrum() {
        let n = 1024;
        let power_db = vec![-60.0; n];
        let frequencies: Vec<f64> = (0..n).map(|i| i as f64 * 100.0).collect();

        let peaks = PeakFinder::new().find_peaks_in_power(&power_db, &frequencies);
        assert!(peaks.is_empty(), "Should find no peaks in flat spectrum");
        assert!(PeakFinder::format_text(&peaks).contains("No peaks"));
    }

    #[test]
    fn test_formats() {
        let peaks = vec![SpectralPeak {
            frequency: 100.0,
            power_db: -3.0,
            bin_index: 4,
            above_floor_db: 40.0,
        }];
        assert_eq!(PeakFinder::format_csv(&peaks).lines().count(), 2);
        let json = PeakFinder::format_json(&peaks).unwrap();
        assert!(json.contains("\"num_peaks\": 1"));
    }
}
