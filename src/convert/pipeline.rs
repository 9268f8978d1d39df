use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ConvertConfig;
use crate::convert::artifact::{extract_parameters, load_checkpoint};
use crate::convert::export::{save_parameters, OutputFormat};
use crate::convert::names::translate_names;
use crate::convert::verify::{verify, VerificationReport};
use crate::error::ConvertError;

/// Summary of one successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub checkpoint_kind: String,
    pub wrapper_key: Option<String>,
    pub output_format: String,
    pub parameter_count: usize,
    pub remapped: usize,
    pub flagged: Vec<String>,
    pub sample_keys: Vec<String>,
    pub verification: VerificationReport,
}

/// Load `input`, normalize it into a flat hierarchically named mapping and
/// write that to `output`, then verify the written file.
///
/// Nothing is written to `output` unless the mapping was fully built.
/// Failures are logged here with their category before being returned.
pub fn convert_checkpoint(
    input: &Path,
    output: &Path,
    config: &ConvertConfig,
) -> Result<ConversionReport, ConvertError> {
    run(input, output, config).inspect_err(|e| {
        log::error!(
            "conversion of {} failed ({:?} error): {e}",
            input.display(),
            e.category()
        );
    })
}

fn run(
    input: &Path,
    output: &Path,
    config: &ConvertConfig,
) -> Result<ConversionReport, ConvertError> {
    let checkpoint = load_checkpoint(input)?;
    let params = extract_parameters(&checkpoint, config.include_buffers)?;

    let expected = checkpoint.source_count(config.include_buffers);
    if params.len() != expected {
        return Err(ConvertError::CountMismatch {
            expected,
            actual: params.len(),
        });
    }
    log::info!(
        "extracted {} parameters from {} ({})",
        params.len(),
        input.display(),
        checkpoint.kind()
    );

    let translated = translate_names(params)?;
    log::debug!(
        "remapped {} block names, flagged {}",
        translated.remapped,
        translated.flagged.len()
    );

    let format: OutputFormat = save_parameters(&translated.params, output)?;
    let verification = verify(input, output, config)?;

    Ok(ConversionReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        checkpoint_kind: checkpoint.kind().to_string(),
        wrapper_key: checkpoint.wrapper_key().map(str::to_string),
        output_format: format.to_string(),
        parameter_count: translated.params.len(),
        remapped: translated.remapped,
        flagged: translated.flagged,
        sample_keys: translated
            .params
            .keys()
            .take(config.sample_keys)
            .cloned()
            .collect(),
        verification,
    })
}
