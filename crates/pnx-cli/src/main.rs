//! Phase Noise Explorer Command-Line Interface
//!
//! This CLI provides tools for:
//! - Synthesizing noisy, phase-modulated carriers to raw or CSV files
//! - Welch PSD sweeps over segment length and scaling
//! - Comparing measured phase noise against the additive-noise prediction
//! - Phase traces and two-sided spectra along the down-conversion chain

use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use pnx_core::analysis::{PeakFinder, PsdEstimate, Scaling, SignalStats, WelchConfig, WindowFunction};
use pnx_core::comparison::FrequencyBand;
use pnx_core::waveform::PhaseModulation;
use pnx_sim::experiment::{
    carrier_psd_sweep, phase_welch_config, two_sided_spectra, ModulationExperiment,
    PhaseNoiseExperiment, TraceExperiment, PHASE_SEGMENT_LEN, SWEEP_SEGMENT_LENGTHS,
};
use pnx_sim::synth::{seeded_rng, SignalConfig, Synthesizer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "pnx")]
#[command(author, version, about = "Phase Noise Explorer CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Carrier and noise parameters shared by every experiment
#[derive(Args, Debug, Clone)]
struct SignalArgs {
    /// JSON signal configuration (replaces the flags below)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long, default_value = "100000")]
    sample_rate: f64,

    /// Signal duration in seconds
    #[arg(long, default_value = "10")]
    duration: f64,

    /// Carrier frequency in Hz
    #[arg(long, default_value = "25000")]
    carrier: f64,

    /// Carrier amplitude
    #[arg(long, default_value = "10", allow_negative_numbers = true)]
    amplitude: f64,

    /// Mean of the additive Gaussian noise
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    noise_mean: f64,

    /// Standard deviation of the additive Gaussian noise
    #[arg(long, default_value = "0.01")]
    noise_std: f64,

    /// Seed for the noise generator
    #[arg(long, default_value = "42")]
    seed: u64,
}

impl SignalArgs {
    fn to_config(&self) -> Result<SignalConfig> {
        if let Some(path) = &self.config {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            return SignalConfig::from_json(&json)
                .with_context(|| format!("Invalid config {:?}", path));
        }
        SignalConfig::builder()
            .sample_rate(self.sample_rate)
            .duration(self.duration)
            .carrier_frequency(self.carrier)
            .amplitude(self.amplitude)
            .noise_mean(self.noise_mean)
            .noise_std(self.noise_std)
            .build()
            .context("Invalid signal parameters")
    }
}

/// Optional sinusoidal phase modulation
#[derive(Args, Debug, Clone)]
struct ModulationArgs {
    /// Peak phase deviation in radians
    #[arg(long, requires = "mod_frequency", allow_negative_numbers = true)]
    mod_amplitude: Option<f64>,

    /// Modulation frequency in Hz
    #[arg(long, requires = "mod_amplitude")]
    mod_frequency: Option<f64>,
}

impl ModulationArgs {
    fn to_modulation(&self) -> Result<Option<PhaseModulation>> {
        match (self.mod_amplitude, self.mod_frequency) {
            (Some(amplitude), Some(frequency)) => Ok(Some(PhaseModulation::new(amplitude, frequency)?)),
            _ => Ok(None),
        }
    }

    /// Override the modulation of `config` only when the flags were given
    fn apply(&self, config: SignalConfig) -> Result<SignalConfig> {
        match self.to_modulation()? {
            Some(modulation) => Ok(config.with_modulation(Some(modulation))?),
            None => Ok(config),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SampleFormat {
    /// Little-endian f32
    F32,
    /// time_s,value
    Csv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ScalingArg {
    Spectrum,
    Density,
    Both,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a carrier with noise and optional phase modulation
    Synth {
        #[command(flatten)]
        signal: SignalArgs,

        #[command(flatten)]
        modulation: ModulationArgs,

        /// Output file for samples
        #[arg(short, long, default_value = "carrier.f32")]
        output: PathBuf,

        /// Sample file format
        #[arg(long, value_enum, default_value = "f32")]
        format: SampleFormat,

        /// Also write the noise realisation to this file
        #[arg(long)]
        noise_output: Option<PathBuf>,
    },

    /// Welch PSD of the carrier at several segment lengths
    Psd {
        #[command(flatten)]
        signal: SignalArgs,

        /// Segment lengths (powers of two)
        #[arg(long, value_delimiter = ',', default_values_t = SWEEP_SEGMENT_LENGTHS.to_vec())]
        segments: Vec<usize>,

        /// Scaling mode
        #[arg(long, value_enum, default_value = "both")]
        scaling: ScalingArg,

        /// Window function (hann, hamming, blackman, blackman-harris, flat-top, rectangular)
        #[arg(long, default_value = "hann")]
        window: String,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,

        /// Directory for one file per estimate (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of strongest bins / peaks to list in text output
        #[arg(long, default_value = "5")]
        rows: usize,
    },

    /// Compare the measured phase-noise PSD with 2·S_n/A²
    PhaseNoise {
        #[command(flatten)]
        signal: SignalArgs,

        #[command(flatten)]
        modulation: ModulationArgs,

        /// Welch segment length
        #[arg(long, default_value_t = PHASE_SEGMENT_LEN)]
        segment: usize,

        /// Lower edge of the comparison band in Hz (default 4 % of fc)
        #[arg(long, requires = "band_high")]
        band_low: Option<f64>,

        /// Upper edge of the comparison band in Hz (default 80 % of fc)
        #[arg(long, requires = "band_low")]
        band_high: Option<f64>,

        /// Allowed band ratio in dB
        #[arg(long, default_value = "1.0")]
        tolerance: f64,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Phase spectra of a strong and a weak modulated carrier sharing one noise draw
    Modulation {
        #[command(flatten)]
        signal: SignalArgs,

        /// Peak phase deviation in radians
        #[arg(long, default_value = "0.1")]
        mod_amplitude: f64,

        /// Modulation frequency in Hz
        #[arg(long, default_value = "100")]
        mod_frequency: f64,

        /// Strong carrier amplitude
        #[arg(long, default_value = "1.0")]
        strong: f64,

        /// Weak carrier amplitude
        #[arg(long, default_value = "0.01")]
        weak: f64,

        /// Welch segment length
        #[arg(long, default_value_t = PHASE_SEGMENT_LEN)]
        segment: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Unwrapped baseband phase of a large phase excursion
    Trace {
        #[command(flatten)]
        signal: SignalArgs,

        /// Peak phase deviation in radians
        #[arg(long, default_value = "10")]
        mod_amplitude: f64,

        /// Modulation frequency in Hz
        #[arg(long, default_value = "10")]
        mod_frequency: f64,

        /// Carrier amplitudes to trace
        #[arg(long, value_delimiter = ',', default_values_t = vec![1.0, 0.05])]
        amplitudes: Vec<f64>,

        /// Time window in seconds
        #[arg(long, default_value = "0.4")]
        window: f64,

        /// Output CSV file
        #[arg(short, long, default_value = "trace.csv")]
        output: PathBuf,
    },

    /// Shifted two-sided spectra of the carrier, analytic and down-shifted signals
    Spectra {
        #[command(flatten)]
        signal: SignalArgs,

        /// Welch segment length
        #[arg(long, default_value = "4096")]
        segment: usize,

        /// Output CSV file
        #[arg(short, long, default_value = "spectra.csv")]
        output: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn write_samples_f32(samples: &[f64], path: &Path) -> Result<()> {
    use byteorder::{LittleEndian, WriteBytesExt};

    let file = File::create(path).context("Failed to create output file")?;
    let mut writer = BufWriter::new(file);

    for &sample in samples {
        writer.write_f32::<LittleEndian>(sample as f32)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `text` to `output`, or print it
fn emit(text: &str, output: Option<&Path>, what: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
            println!("{} written to {:?}", what, path);
        }
        None => println!("{}", text),
    }
    Ok(())
}

/// CSV with a shared frequency column and one value column per estimate
fn psd_table_csv(columns: &[(&str, &PsdEstimate)]) -> Result<String> {
    let Some((_, first)) = columns.first() else {
        bail!("No spectra to write");
    };
    if columns.iter().any(|(_, psd)| psd.len() != first.len()) {
        bail!("Spectra have different lengths");
    }

    let mut output = String::from("frequency_hz");
    for (name, _) in columns {
        output.push(',');
        output.push_str(name);
    }
    output.push('\n');

    for (i, freq) in first.frequencies().iter().enumerate() {
        output.push_str(&freq.to_string());
        for (_, psd) in columns {
            output.push_str(&format!(",{}", psd.values()[i]));
        }
        output.push('\n');
    }
    Ok(output)
}

fn cmd_synth(
    signal: SignalArgs,
    modulation: ModulationArgs,
    output: PathBuf,
    format: SampleFormat,
    noise_output: Option<PathBuf>,
) -> Result<()> {
    let config = modulation.apply(signal.to_config()?)?;
    let synthesis = Synthesizer::new(config).synthesize(&mut seeded_rng(signal.seed))?;
    let waveform = &synthesis.waveform;

    match format {
        SampleFormat::F32 => write_samples_f32(waveform.samples(), &output)?,
        SampleFormat::Csv => std::fs::write(&output, waveform.to_csv())
            .with_context(|| format!("Failed to write {:?}", output))?,
    }
    println!("Wrote {} samples to {:?}", waveform.len(), output);

    if let Some(path) = noise_output {
        write_samples_f32(&synthesis.noise, &path)?;
        println!("Noise written to {:?}", path);
    }

    let stats = SignalStats::compute(waveform.samples(), Some(waveform.sample_rate()));
    println!();
    println!("{}", stats.to_text());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_psd(
    signal: SignalArgs,
    segments: Vec<usize>,
    scaling: ScalingArg,
    window: String,
    output_format: OutputFormat,
    output: Option<PathBuf>,
    rows: usize,
) -> Result<()> {
    let Some(window_fn) = WindowFunction::from_str(&window) else {
        bail!(
            "Unknown window: '{}'. Use: hann, hamming, blackman, blackman-harris, flat-top, rectangular",
            window
        );
    };

    let config = signal.to_config()?;
    let synthesis = Synthesizer::new(config).synthesize(&mut seeded_rng(signal.seed))?;

    let scalings: &[Scaling] = match scaling {
        ScalingArg::Spectrum => &[Scaling::Spectrum],
        ScalingArg::Density => &[Scaling::Density],
        ScalingArg::Both => &[Scaling::Spectrum, Scaling::Density],
    };

    if let Some(dir) = &output {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    for &mode in scalings {
        let base = WelchConfig::default().with_window(window_fn).with_scaling(mode);
        let psds = carrier_psd_sweep(&synthesis.waveform, &segments, base)?;
        for psd in &psds {
            info!(
                "{:?} estimate, segment {}: {} averages",
                mode,
                psd.segment_len(),
                psd.num_segments()
            );
            let text = match output_format {
                OutputFormat::Json => psd.to_json()?,
                OutputFormat::Csv => psd.to_csv(),
                OutputFormat::Text => {
                    let peaks = PeakFinder::new().with_max_peaks(rows).find_peaks(psd);
                    format!("{}\n{}", psd.to_text(rows), PeakFinder::format_text(&peaks))
                }
            };

            let path = output.as_ref().map(|dir| {
                let ext = match output_format {
                    OutputFormat::Json => "json",
                    OutputFormat::Csv => "csv",
                    OutputFormat::Text => "txt",
                };
                dir.join(format!(
                    "psd_{}_{}.{}",
                    format!("{:?}", mode).to_lowercase(),
                    psd.segment_len(),
                    ext
                ))
            });
            emit(&text, path.as_deref(), "PSD")?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_phase_noise(
    signal: SignalArgs,
    modulation: ModulationArgs,
    segment: usize,
    band_low: Option<f64>,
    band_high: Option<f64>,
    tolerance: f64,
    output_format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = modulation.apply(signal.to_config()?)?;
    let mut experiment = PhaseNoiseExperiment::new(config)
        .with_welch(phase_welch_config(segment))
        .with_tolerance(tolerance);
    if let (Some(low), Some(high)) = (band_low, band_high) {
        experiment = experiment.with_band(FrequencyBand::new(low, high)?);
    }

    let outcome = experiment.run(&mut seeded_rng(signal.seed))?;
    for warning in &outcome.warnings {
        println!("warning: {}", warning);
    }

    let text = match output_format {
        OutputFormat::Csv => psd_table_csv(&[
            ("noise_psd", &outcome.noise_psd),
            ("theoretical", &outcome.theoretical),
            ("measured", &outcome.measured),
        ])?,
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "signal": config,
            "report": outcome.report,
            "noise_stats": outcome.noise_stats,
            "phase_stats": outcome.phase_stats,
            "warnings": outcome.warnings,
        }))?,
        OutputFormat::Text => format!(
            "{}\nPhase (rad)\n{}",
            outcome.report.to_text(),
            outcome.phase_stats.to_text()
        ),
    };
    emit(&text, output.as_deref(), "Phase-noise comparison")
}

#[allow(clippy::too_many_arguments)]
fn cmd_modulation(
    signal: SignalArgs,
    mod_amplitude: f64,
    mod_frequency: f64,
    strong: f64,
    weak: f64,
    segment: usize,
    output_format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = signal.to_config()?;
    let outcome = ModulationExperiment::new(config)
        .with_modulation(PhaseModulation::new(mod_amplitude, mod_frequency)?)
        .with_amplitudes(strong, weak)
        .with_welch(phase_welch_config(segment))
        .run(&mut seeded_rng(signal.seed))?;

    for warning in &outcome.warnings {
        println!("warning: {}", warning);
    }

    let (a_strong, strong_psd) = &outcome.strong;
    let (a_weak, weak_psd) = &outcome.weak;
    let text = match output_format {
        OutputFormat::Csv => {
            let strong_name = format!("phase_psd_a{}", a_strong);
            let weak_name = format!("phase_psd_a{}", a_weak);
            psd_table_csv(&[
                ("noise_psd", &outcome.noise_psd),
                (strong_name.as_str(), strong_psd),
                (weak_name.as_str(), weak_psd),
            ])?
        }
        OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
            "scaling": outcome.scaling,
            "warnings": outcome.warnings,
        }))?,
        OutputFormat::Text => {
            let s = &outcome.scaling;
            let peaks = PeakFinder::new().with_max_peaks(4).find_peaks(strong_psd);
            format!(
                "Floor change A={} -> A={}\n  predicted: {:+.2} dB\n  measured:  {:+.2} dB\n  error:     {:+.2} dB\n\n{}",
                s.amplitude_from,
                s.amplitude_to,
                s.predicted_db,
                s.measured_db,
                s.error_db(),
                PeakFinder::format_text(&peaks)
            )
        }
    };
    emit(&text, output.as_deref(), "Modulation spectra")
}

fn cmd_trace(
    signal: SignalArgs,
    mod_amplitude: f64,
    mod_frequency: f64,
    amplitudes: Vec<f64>,
    window: f64,
    output: PathBuf,
) -> Result<()> {
    if amplitudes.is_empty() {
        bail!("At least one amplitude is required");
    }
    let experiment = TraceExperiment {
        signal: signal.to_config()?,
        modulation: PhaseModulation::new(mod_amplitude, mod_frequency)?,
        amplitudes,
        window,
    };
    let traces = experiment.run(&mut seeded_rng(signal.seed))?;

    let mut text = String::from("time_s");
    for trace in &traces {
        text.push_str(&format!(",phase_a{}", trace.amplitude));
    }
    text.push('\n');
    if let Some(first) = traces.first() {
        for (i, t) in first.timestamps.iter().enumerate() {
            text.push_str(&t.to_string());
            for trace in &traces {
                text.push_str(&format!(",{}", trace.phase[i]));
            }
            text.push('\n');
        }
    }

    for trace in &traces {
        let stats = SignalStats::compute(&trace.phase, None);
        println!(
            "A={}: phase range [{:.3}, {:.3}] rad",
            trace.amplitude, stats.min, stats.max
        );
    }
    emit(&text, Some(output.as_path()), "Phase traces")
}

fn cmd_spectra(signal: SignalArgs, segment: usize, output: PathBuf) -> Result<()> {
    let config = signal.to_config()?;
    let synthesis = Synthesizer::new(config).synthesize(&mut seeded_rng(signal.seed))?;
    let spectra = two_sided_spectra(
        &synthesis.waveform,
        config.carrier_frequency(),
        WelchConfig::new(segment),
    )?;

    let text = psd_table_csv(&[
        ("carrier_x4", &spectra.carrier),
        ("analytic", &spectra.analytic),
        ("baseband", &spectra.baseband),
    ])?;
    emit(&text, Some(output.as_path()), "Two-sided spectra")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Synth {
            signal,
            modulation,
            output,
            format,
            noise_output,
        } => cmd_synth(signal, modulation, output, format, noise_output),

        Commands::Psd {
            signal,
            segments,
            scaling,
            window,
            output_format,
            output,
            rows,
        } => cmd_psd(signal, segments, scaling, window, output_format, output, rows),

        Commands::PhaseNoise {
            signal,
            modulation,
            segment,
            band_low,
            band_high,
            tolerance,
            output_format,
            output,
        } => cmd_phase_noise(
            signal,
            modulation,
            segment,
            band_low,
            band_high,
            tolerance,
            output_format,
            output,
        ),

        Commands::Modulation {
            signal,
            mod_amplitude,
            mod_frequency,
            strong,
            weak,
            segment,
            output_format,
            output,
        } => cmd_modulation(
            signal,
            mod_amplitude,
            mod_frequency,
            strong,
            weak,
            segment,
            output_format,
            output,
        ),

        Commands::Trace {
            signal,
            mod_amplitude,
            mod_frequency,
            amplitudes,
            window,
            output,
        } => cmd_trace(signal, mod_amplitude, mod_frequency, amplitudes, window, output),

        Commands::Spectra {
            signal,
            segment,
            output,
        } => cmd_spectra(signal, segment, output),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth_args(args: &[&str]) -> (SignalArgs, ModulationArgs) {
        let cli = Cli::try_parse_from(["pnx", "synth"].iter().chain(args)).unwrap();
        match cli.command {
            Commands::Synth {
                signal, modulation, ..
            } => (signal, modulation),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_config_file_modulation_is_kept() {
        let path = std::env::temp_dir().join("pnx_test_modulated_config.json");
        std::fs::write(
            &path,
            r#"{ "sample_rate": 1000.0, "duration": 1.0, "carrier_frequency": 100.0,
                 "modulation": { "amplitude": 0.5, "frequency": 10.0 } }"#,
        )
        .unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let (signal, modulation) = synth_args(&["--config", &path_arg]);
        let config = modulation.apply(signal.to_config().unwrap()).unwrap();
        assert_eq!(
            config.modulation(),
            Some(PhaseModulation {
                amplitude: 0.5,
                frequency: 10.0
            })
        );

        // Flags still override the file
        let (signal, modulation) = synth_args(&[
            "--config",
            &path_arg,
            "--mod-amplitude",
            "2",
            "--mod-frequency",
            "5",
        ]);
        let config = modulation.apply(signal.to_config().unwrap()).unwrap();
        assert_eq!(config.modulation().map(|m| m.amplitude), Some(2.0));
        assert_eq!(config.modulation().map(|m| m.frequency), Some(5.0));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_flags_without_modulation() {
        let (signal, modulation) = synth_args(&["--sample-rate", "1000", "--carrier", "100"]);
        let config = modulation.apply(signal.to_config().unwrap()).unwrap();
        assert!(config.modulation().is_none());
        assert_eq!(config.sample_rate(), 1000.0);
    }

    #[test]
    fn test_mod_flags_require_each_other() {
        assert!(Cli::try_parse_from(["pnx", "synth", "--mod-amplitude", "1"]).is_err());
    }
}
