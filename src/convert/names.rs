//! Translation from the flat `|`-delimited naming scheme to dotted
//! hierarchical names with `res_blocks.<N>` block addressing.

use std::collections::BTreeMap;

use crate::convert::artifact::ParameterMap;
use crate::error::ConvertError;

const FLAT_DELIMITER: char = '|';
const BLOCK_PREFIX: &str = "res_";
const BLOCK_LIST: &str = "res_blocks";

/// How a single name was rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRewrite {
    /// Delimiter substitution only (or nothing to do).
    Delimited,
    /// Leading `res_<N>` segment rewritten to `res_blocks.<N>`.
    BlockRemapped,
    /// A `res_<N>` segment appears past the first position; substitution only.
    Flagged,
}

/// Returns the block index if `segment` is `res_` followed by one or more digits.
fn block_index(segment: &str) -> Option<&str> {
    let digits = segment.strip_prefix(BLOCK_PREFIX)?;
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

/// Translate one parameter name.
///
/// `res_3|conv1|weight` becomes `res_blocks.3.conv1.weight`. Names already in
/// hierarchical form come back unchanged, since `res_blocks` is not a block
/// prefix.
pub fn translate_name(name: &str) -> (String, NameRewrite) {
    let dotted = name.replace(FLAT_DELIMITER, ".");
    let mut segments = dotted.split('.');
    let head = segments.next().unwrap_or_default();
    let rest: Vec<&str> = segments.collect();

    if rest.iter().any(|s| block_index(s).is_some()) {
        return (dotted, NameRewrite::Flagged);
    }

    match block_index(head) {
        Some(index) => {
            let mut out = format!("{BLOCK_LIST}.{index}");
            for segment in rest {
                out.push('.');
                out.push_str(segment);
            }
            (out, NameRewrite::BlockRemapped)
        }
        None => (dotted, NameRewrite::Delimited),
    }
}

/// A translated parameter mapping and what happened to its keys.
#[derive(Debug, Clone, Default)]
pub struct TranslatedNames {
    pub params: ParameterMap,
    pub remapped: usize,
    /// Source names that were left with substitution only.
    pub flagged: Vec<String>,
}

/// Translate every key of `params`, failing if two source keys land on the
/// same target.
pub fn translate_names(params: ParameterMap) -> Result<TranslatedNames, ConvertError> {
    let mut out = TranslatedNames::default();
    let mut sources: BTreeMap<String, String> = BTreeMap::new();

    for (source, tensor) in params {
        let (target, rewrite) = translate_name(&source);
        match rewrite {
            NameRewrite::BlockRemapped => out.remapped += 1,
            NameRewrite::Flagged => {
                log::warn!(
                    "'{source}' has a block index past the first segment; left as '{target}'"
                );
                out.flagged.push(source.clone());
            }
            NameRewrite::Delimited => {}
        }
        if let Some(first) = sources.get(&target) {
            return Err(ConvertError::NameCollision {
                target,
                first: first.clone(),
                second: source,
            });
        }
        sources.insert(target.clone(), source);
        out.params.insert(target, tensor);
    }

    Ok(out)
}
