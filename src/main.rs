//! Batch detector: counts target-event frames in every audio file of a directory.

use std::path::{Path, PathBuf};

use acoustic_detector::batch::{list_audio_files, run_batch};
use acoustic_detector::config::{self, DetectorConfig};
use acoustic_detector::detection::Detector;
use acoustic_detector::logging::{self, LogTarget};
use acoustic_detector::ml::network::{NetworkWeights, TwoLayerNetwork};
use acoustic_detector::report::{write_json_report, write_text_report};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Run(CliOptions),
    InitConfig,
    Help,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct CliOptions {
    input_dir: Option<PathBuf>,
    output_file: Option<PathBuf>,
    threshold: Option<f64>,
    config_path: Option<PathBuf>,
    weights_path: Option<PathBuf>,
    json_path: Option<PathBuf>,
    jobs: Option<usize>,
    block_frames: Option<usize>,
    log_target: LogTarget,
}

const DEFAULT_INPUT_DIR: &str = "audios";
const DEFAULT_OUTPUT_FILE: &str = "results.txt";

fn run() -> Result<(), String> {
    let options = match parse_args(std::env::args().skip(1).collect())? {
        Command::Help => {
            println!("{}", help_text());
            return Ok(());
        }
        Command::InitConfig => return init_config(),
        Command::Run(options) => options,
    };
    if let Err(err) = logging::init(&options.log_target) {
        eprintln!("Logging disabled: {err}");
    }

    let config = resolve_config(&options)?;
    let network = load_network(config.weights_path.as_deref())?;
    let detector =
        Detector::new(config.detector_settings(), network).map_err(|err| err.to_string())?;

    let input_dir = options
        .input_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR));
    let files = list_audio_files(&input_dir, &config.normalized_extensions())
        .map_err(|err| err.to_string())?;
    if files.is_empty() {
        tracing::warn!("No audio files found in {}", input_dir.display());
    }
    tracing::info!(
        "Processing {} file(s) from {} at threshold {}",
        files.len(),
        input_dir.display(),
        config.threshold
    );

    let outcome = run_batch(&detector, &files, config.workers);
    let output_file = options
        .output_file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));
    write_text_report(&output_file, &outcome.processed).map_err(|err| err.to_string())?;
    if let Some(json_path) = &options.json_path {
        write_json_report(json_path, &outcome.processed).map_err(|err| err.to_string())?;
    }

    for file in &outcome.processed {
        println!("{}, {}", file.file_name, file.detections());
    }
    if !outcome.skipped.is_empty() {
        eprintln!("Skipped {} file(s) that could not be decoded", outcome.skipped.len());
    }
    println!();
    println!("Results saved in: {}", output_file.display());
    Ok(())
}

/// Config file (explicit or app default) with command-line overrides applied.
fn resolve_config(options: &CliOptions) -> Result<DetectorConfig, String> {
    let mut config = match &options.config_path {
        Some(path) => config::load_config(path),
        None => config::load_default_config(),
    }
    .map_err(|err| err.to_string())?;
    if let Some(threshold) = options.threshold {
        config.threshold = threshold;
    }
    if let Some(jobs) = options.jobs {
        config.workers = jobs;
    }
    if let Some(block_frames) = options.block_frames {
        config.block_frames = block_frames;
    }
    if let Some(weights) = &options.weights_path {
        config.weights_path = Some(weights.clone());
    }
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

fn load_network(path: Option<&Path>) -> Result<TwoLayerNetwork, String> {
    let Some(path) = path else {
        return Ok(TwoLayerNetwork::default());
    };
    let weights = NetworkWeights::load(path).map_err(|err| err.to_string())?;
    TwoLayerNetwork::from_weights(&weights).map_err(|err| err.to_string())
}

fn init_config() -> Result<(), String> {
    let path = config::default_config_path().map_err(|err| err.to_string())?;
    if path.exists() {
        return Err(format!("Config already exists at {}", path.display()));
    }
    config::save_to_path(&DetectorConfig::default(), &path).map_err(|err| err.to_string())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Command, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        match flag {
            "-h" | "--help" => return Ok(Command::Help),
            "--init-config" => return Ok(Command::InitConfig),
            "--persist-logs" => options.log_target = LogTarget::AppLogs,
            "--i" | "--input" => options.input_dir = Some(PathBuf::from(value(&args, &mut idx)?)),
            "--o" | "--output" => {
                options.output_file = Some(PathBuf::from(value(&args, &mut idx)?));
            }
            "--min_conf" => {
                let raw = value(&args, &mut idx)?;
                let threshold = raw
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --min_conf value: {raw}"))?;
                options.threshold = Some(threshold);
            }
            "--config" => options.config_path = Some(PathBuf::from(value(&args, &mut idx)?)),
            "--weights" => options.weights_path = Some(PathBuf::from(value(&args, &mut idx)?)),
            "--json" => options.json_path = Some(PathBuf::from(value(&args, &mut idx)?)),
            "--jobs" => {
                let raw = value(&args, &mut idx)?;
                let jobs = raw
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --jobs value: {raw}"))?;
                options.jobs = Some(jobs);
            }
            "--block-frames" => {
                let raw = value(&args, &mut idx)?;
                let frames = raw
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --block-frames value: {raw}"))?;
                options.block_frames = Some(frames);
            }
            "--log-file" => {
                options.log_target = LogTarget::File(PathBuf::from(value(&args, &mut idx)?));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(Command::Run(options))
}

/// Advance past `args[*idx]` and return the value that follows it.
fn value<'a>(args: &'a [String], idx: &mut usize) -> Result<&'a str, String> {
    let flag = &args[*idx];
    *idx += 1;
    args.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn help_text() -> String {
    [
        "acoustic-detector",
        "",
        "Usage:",
        "  acoustic-detector [--i <dir>] [--o <file>] [--min_conf <f>] [options]",
        "",
        "Options:",
        "  --i, --input <dir>        Audio folder (default: audios).",
        "  --o, --output <file>      Output .txt file (default: results.txt).",
        "  --min_conf <f>            Minimum confidence threshold (default: 0.5).",
        "  --config <file>           TOML config (default: app config dir, if present).",
        "  --weights <file>          JSON network weights replacing the built-in set.",
        "  --json <file>             Also write a JSON report with blocks and segments.",
        "  --jobs <n>                Worker threads, 0 = all cores (default: 1).",
        "  --block-frames <n>        Frames per vote block, 0 disables (default: 16).",
        "  --log-file <file>         Append logs to this file.",
        "  --persist-logs            Keep a timestamped log per run in the app logs dir.",
        "  --init-config             Write the default config to the app config dir.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn short_and_long_flags_are_accepted() {
        let Command::Run(options) = parse_args(args(&[
            "--i", "clips", "--output", "out.txt", "--min_conf", "0.4", "--jobs", "3",
        ]))
        .unwrap() else {
            panic!("expected a run command");
        };
        assert_eq!(options.input_dir, Some(PathBuf::from("clips")));
        assert_eq!(options.output_file, Some(PathBuf::from("out.txt")));
        assert_eq!(options.threshold, Some(0.4));
        assert_eq!(options.jobs, Some(3));
        assert_eq!(options.log_target, LogTarget::StderrOnly);
    }

    #[test]
    fn no_arguments_uses_defaults() {
        assert_eq!(
            parse_args(Vec::new()).unwrap(),
            Command::Run(CliOptions::default())
        );
    }

    #[test]
    fn bad_values_are_reported() {
        assert_eq!(
            parse_args(args(&["--min_conf", "high"])).unwrap_err(),
            "Invalid --min_conf value: high"
        );
        assert_eq!(
            parse_args(args(&["--o"])).unwrap_err(),
            "--o requires a value"
        );
        assert!(parse_args(args(&["--verbose"])).unwrap_err().starts_with("Unknown argument"));
    }

    #[test]
    fn command_line_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "threshold = 0.3\nworkers = 2\nblock_frames = 8\n").unwrap();
        let options = CliOptions {
            config_path: Some(path),
            threshold: Some(0.7),
            block_frames: Some(0),
            ..CliOptions::default()
        };
        let config = resolve_config(&options).unwrap();
        assert_eq!(config.threshold, 0.7);
        assert_eq!(config.workers, 2);
        assert_eq!(config.block_frames, 0);
    }

    #[test]
    fn log_flags_pick_a_target() {
        let Command::Run(options) = parse_args(args(&["--log-file", "run.log"])).unwrap() else {
            panic!("expected a run command");
        };
        assert_eq!(options.log_target, LogTarget::File(PathBuf::from("run.log")));
        assert_eq!(parse_args(args(&["--help", "--bogus"])).unwrap(), Command::Help);
    }
}
