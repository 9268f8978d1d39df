//! Convert a model checkpoint into a flat, hierarchically named parameter file.
//!
//! Exit status: 0 on success, 1 when the conversion failed, 2 when the output
//! was written but verification reported issues.
//!
//! Options are read from the `[convert]` section of `config.toml` in the
//! working directory when that file exists.

use std::path::Path;
use std::process::ExitCode;

use boardgame_ml::config::ConvertConfig;
use boardgame_ml::convert::{convert_checkpoint, ConversionReport};

const CONFIG_PATH: &str = "config.toml";

fn print_report(report: &ConversionReport) {
    println!("Converted {} -> {}", report.input.display(), report.output.display());
    match &report.wrapper_key {
        Some(key) => println!("  source:     {} (under '{}')", report.checkpoint_kind, key),
        None => println!("  source:     {}", report.checkpoint_kind),
    }
    println!("  format:     {}", report.output_format);
    println!("  parameters: {}", report.parameter_count);
    println!("  remapped:   {} block names", report.remapped);
    if !report.flagged.is_empty() {
        println!("  flagged:    {} (left with '|' -> '.' only)", report.flagged.len());
        for name in &report.flagged {
            println!("    {name}");
        }
    }
    println!("  sample keys:");
    for key in &report.sample_keys {
        println!("    {key}");
    }
    let v = &report.verification;
    println!(
        "  verified:   {} with {} keys (source {})",
        v.container, v.key_count, v.source_count
    );
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        let program = args.first().map(String::as_str).unwrap_or("convert_model");
        eprintln!("Usage: {program} <input_path> <output_path>");
        eprintln!("Reads the [convert] section of ./{CONFIG_PATH} if present.");
        return ExitCode::from(1);
    }
    let input = Path::new(&args[1]);
    let output = Path::new(&args[2]);

    let config = match ConvertConfig::load_or_default(Path::new(CONFIG_PATH)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Conversion failed: {e}");
            return ExitCode::from(1);
        }
    };

    match convert_checkpoint(input, output, &config) {
        Ok(report) => {
            print_report(&report);
            if report.verification.is_ok() {
                println!("Conversion succeeded");
                ExitCode::SUCCESS
            } else {
                for issue in &report.verification.issues {
                    eprintln!("Verification issue: {issue}");
                }
                ExitCode::from(2)
            }
        }
        Err(e) => {
            eprintln!("Conversion failed: {e}");
            ExitCode::from(1)
        }
    }
}
