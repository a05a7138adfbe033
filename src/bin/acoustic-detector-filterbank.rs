//! Developer utility to inspect a filterbank's band edges and weights.

use acoustic_detector::analysis::frequency_domain::{build_filterbank, filterbank_axis};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    low_hz: f64,
    high_hz: f64,
    bands: usize,
    sample_rate: u32,
    scale: u8,
    normalization: u8,
    show_weights: bool,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let axis = filterbank_axis(options.sample_rate);
    let filterbank = build_filterbank(
        options.low_hz,
        options.high_hz,
        options.bands,
        &axis,
        options.sample_rate,
        options.scale,
        options.normalization,
    )
    .map_err(|err| err.to_string())?;

    let edges = filterbank.edge_indices();
    println!("bands: {}", filterbank.bands());
    println!("edge indices: {edges:?}");
    println!("edge frequencies (Hz):");
    for (position, &index) in edges.iter().enumerate() {
        println!("  {position:>3}  bin {index:>3}  {:>10.2}", axis[index]);
    }
    if options.show_weights {
        println!("weights (non-zero span per band):");
        let weights = filterbank.weights();
        for band in 0..weights.rows() {
            let row = weights.row(band);
            let first = row.iter().position(|&w| w != 0.0);
            let last = row.iter().rposition(|&w| w != 0.0);
            let sum: f64 = row.iter().sum();
            match (first, last) {
                (Some(first), Some(last)) => println!(
                    "  band {band:>3}  bins {first:>3}..={last:<3}  peak {:.6}  sum {sum:.6}",
                    row.iter().copied().fold(0.0_f64, f64::max)
                ),
                _ => println!("  band {band:>3}  empty"),
            }
        }
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut low_hz = 300.0;
    let mut high_hz: Option<f64> = None;
    let mut bands = 41usize;
    let mut sample_rate = 32_000u32;
    let mut scale = 0u8;
    let mut normalization = 1u8;
    let mut show_weights = false;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--weights" => show_weights = true,
            flag @ ("--low" | "--high" | "--bands" | "--fs" | "--scale" | "--norm") => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| format!("{flag} requires a value"))?;
                let invalid = || format!("Invalid {flag} value: {value}");
                match flag {
                    "--low" => low_hz = value.parse().map_err(|_| invalid())?,
                    "--high" => high_hz = Some(value.parse().map_err(|_| invalid())?),
                    "--bands" => bands = value.parse().map_err(|_| invalid())?,
                    "--fs" => sample_rate = value.parse().map_err(|_| invalid())?,
                    "--scale" => scale = value.parse().map_err(|_| invalid())?,
                    _ => normalization = value.parse().map_err(|_| invalid())?,
                }
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        low_hz,
        high_hz: high_hz.unwrap_or(sample_rate as f64 / 2.0),
        bands,
        sample_rate,
        scale,
        normalization,
        show_weights,
    })
}

fn help_text() -> String {
    [
        "acoustic-detector-filterbank",
        "",
        "Usage:",
        "  acoustic-detector-filterbank [options]",
        "",
        "Options:",
        "  --low <hz>      Lowest edge (default: 300).",
        "  --high <hz>     Highest edge (default: fs/2).",
        "  --bands <n>     Number of bands (default: 41).",
        "  --fs <hz>       Sample rate for the 512-point axis (default: 32000).",
        "  --scale <0|1>   0 = Mel, 1 = hybrid Mel-linear (default: 0).",
        "  --norm <0|1>    0 = none, 1 = area (default: 1).",
        "  --weights       Print each band's non-zero span, peak and sum.",
    ]
    .join("\n")
}
