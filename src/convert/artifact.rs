//! Checkpoint shape detection and parameter extraction.

use std::collections::BTreeMap;
use std::path::Path;

use crate::convert::archive::{read_archive, Object, ScriptedModule, Tensor};
use crate::error::ConvertError;

/// Flat parameter name to tensor mapping.
pub type ParameterMap = BTreeMap<String, Tensor>;

/// Keys that wrap the real parameter mapping in a training checkpoint, in
/// lookup order.
pub const WRAPPER_KEYS: [&str; 2] = ["model_state_dict", "state_dict"];

/// How many keys of a mapping are quoted in error messages.
pub const KEY_SAMPLE: usize = 5;

fn key_sample<V>(map: &BTreeMap<String, V>) -> Vec<String> {
    map.keys().take(KEY_SAMPLE).cloned().collect()
}

/// The shape of a loaded checkpoint, decided once at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum Checkpoint {
    /// A compiled module exposing named parameters.
    Scripted(ScriptedModule),
    /// A mapping whose `key` entry holds the parameter mapping.
    Nested {
        key: String,
        entries: BTreeMap<String, Object>,
    },
    /// A mapping that is itself the parameter mapping.
    Flat(BTreeMap<String, Object>),
    /// Anything else. Kept for diagnostics.
    Unrecognized { kind: String },
}

impl Checkpoint {
    /// Inspect the root object: module first, then the wrapper keys, then a
    /// plain mapping.
    pub fn classify(root: Object) -> Result<Self, ConvertError> {
        match root {
            Object::Module(module) => Ok(Checkpoint::Scripted(module)),
            Object::Dict(mut map) => {
                for key in WRAPPER_KEYS {
                    if let Some(inner) = map.remove(key) {
                        return match inner {
                            Object::Dict(entries) => Ok(Checkpoint::Nested {
                                key: key.to_string(),
                                entries,
                            }),
                            other => Err(ConvertError::StateDictNotMapping {
                                key: key.to_string(),
                                kind: other.kind().to_string(),
                                other_keys: key_sample(&map),
                            }),
                        };
                    }
                }
                Ok(Checkpoint::Flat(map))
            }
            other => Ok(Checkpoint::Unrecognized {
                kind: other.kind().to_string(),
            }),
        }
    }

    /// Human-readable shape name for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Checkpoint::Scripted(_) => "scripted module",
            Checkpoint::Nested { .. } => "nested state dict",
            Checkpoint::Flat(_) => "flat state dict",
            Checkpoint::Unrecognized { .. } => "unrecognized",
        }
    }

    pub fn wrapper_key(&self) -> Option<&str> {
        match self {
            Checkpoint::Nested { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Number of parameters the source exposes, counted the same way
    /// [`extract_parameters`] collects them.
    pub fn source_count(&self, include_buffers: bool) -> usize {
        match self {
            Checkpoint::Scripted(module) => {
                let buffers = if include_buffers {
                    module.named_buffers().len()
                } else {
                    0
                };
                module.named_parameters().len() + buffers
            }
            Checkpoint::Nested { entries, .. } | Checkpoint::Flat(entries) => entries.len(),
            Checkpoint::Unrecognized { .. } => 0,
        }
    }
}

/// Read and classify the checkpoint at `path`.
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, ConvertError> {
    let root = read_archive(path)?;
    let checkpoint = Checkpoint::classify(root)?;
    log::info!("loaded {} from {}", checkpoint.kind(), path.display());
    Ok(checkpoint)
}

/// Collect the flat parameter mapping out of a checkpoint.
///
/// Scripted modules contribute the data of each named parameter (gradients
/// and autograd flags are dropped), plus buffers when `include_buffers` is set.
pub fn extract_parameters(
    checkpoint: &Checkpoint,
    include_buffers: bool,
) -> Result<ParameterMap, ConvertError> {
    match checkpoint {
        Checkpoint::Scripted(module) => {
            let named = module.named_parameters();
            if named.is_empty() {
                return Err(ConvertError::EmptyModule {
                    type_name: module.type_name.clone(),
                });
            }
            let mut params = ParameterMap::new();
            for (name, param) in named {
                param.data.validate(&name)?;
                params.insert(name, param.data.clone());
            }
            if include_buffers {
                for (name, buffer) in module.named_buffers() {
                    buffer.validate(&name)?;
                    params.insert(name, buffer.clone());
                }
            }
            Ok(params)
        }
        Checkpoint::Nested { entries, .. } | Checkpoint::Flat(entries) => tensor_entries(entries),
        Checkpoint::Unrecognized { kind } => {
            Err(ConvertError::UnrecognizedShape { kind: kind.clone() })
        }
    }
}

fn tensor_entries(entries: &BTreeMap<String, Object>) -> Result<ParameterMap, ConvertError> {
    entries
        .iter()
        .map(|(key, value)| match value {
            Object::Tensor(tensor) => {
                tensor.validate(key)?;
                Ok((key.clone(), tensor.clone()))
            }
            other => Err(ConvertError::NotATensor {
                key: key.clone(),
                kind: other.kind().to_string(),
                count: entries.len(),
                keys: key_sample(entries),
            }),
        })
        .collect()
}
