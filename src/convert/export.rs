//! Writing and re-reading a flat parameter mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;

use crate::checkpoint::write_atomic;
use crate::convert::archive::{read_archive, write_archive, DType, Object, Tensor};
use crate::convert::artifact::ParameterMap;
use crate::error::ConvertError;

/// On-disk format of a converted mapping, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    TensorArchive,
    Safetensors,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("safetensors") => OutputFormat::Safetensors,
            _ => OutputFormat::TensorArchive,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::TensorArchive => write!(f, "tensor archive"),
            OutputFormat::Safetensors => write!(f, "safetensors"),
        }
    }
}

fn to_safetensors_dtype(dtype: DType) -> Dtype {
    match dtype {
        DType::F32 => Dtype::F32,
        DType::F64 => Dtype::F64,
        DType::I64 => Dtype::I64,
        DType::U8 => Dtype::U8,
    }
}

fn from_safetensors_dtype(name: &str, dtype: Dtype) -> Result<DType, ConvertError> {
    match dtype {
        Dtype::F32 => Ok(DType::F32),
        Dtype::F64 => Ok(DType::F64),
        Dtype::I64 => Ok(DType::I64),
        Dtype::U8 => Ok(DType::U8),
        other => Err(ConvertError::InvalidTensor {
            name: name.to_string(),
            reason: format!("unsupported dtype {other:?}"),
        }),
    }
}

/// Atomically write `params` to `dest` as a flat mapping with no wrapper.
pub fn save_parameters(params: &ParameterMap, dest: &Path) -> Result<OutputFormat, ConvertError> {
    let format = OutputFormat::from_path(dest);
    match format {
        OutputFormat::TensorArchive => {
            let root = Object::tensor_dict(params.iter().map(|(k, v)| (k.clone(), v.clone())));
            write_archive(dest, &root)?;
        }
        OutputFormat::Safetensors => {
            let safetensors_err = |source: safetensors::SafeTensorError| ConvertError::Safetensors {
                path: dest.to_path_buf(),
                source,
            };
            let mut views: BTreeMap<String, TensorView<'_>> = BTreeMap::new();
            for (name, tensor) in params {
                let view = TensorView::new(
                    to_safetensors_dtype(tensor.dtype),
                    tensor.shape.clone(),
                    &tensor.data,
                )
                .map_err(safetensors_err)?;
                views.insert(name.clone(), view);
            }
            let bytes = safetensors::serialize(&views, &None).map_err(safetensors_err)?;
            write_atomic(dest, &bytes).map_err(|e| ConvertError::io(dest, e))?;
        }
    }
    log::info!("wrote {} parameters to {} ({format})", params.len(), dest.display());
    Ok(format)
}

/// A converted file as read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum SavedArtifact {
    /// A flat mapping of tensors.
    Flat(ParameterMap),
    /// Some other root object; carries its kind.
    Other(String),
}

/// Read a converted file in either output format.
pub fn read_saved(path: &Path) -> Result<SavedArtifact, ConvertError> {
    match OutputFormat::from_path(path) {
        OutputFormat::TensorArchive => {
            let root = read_archive(path)?;
            let Object::Dict(entries) = root else {
                return Ok(SavedArtifact::Other(root.kind().to_string()));
            };
            let mut params = ParameterMap::new();
            for (name, value) in entries {
                match value {
                    Object::Tensor(tensor) => {
                        params.insert(name, tensor);
                    }
                    _ => return Ok(SavedArtifact::Other("nested dict".to_string())),
                }
            }
            Ok(SavedArtifact::Flat(params))
        }
        OutputFormat::Safetensors => {
            let bytes = fs::read(path).map_err(|e| ConvertError::io(path, e))?;
            let st = SafeTensors::deserialize(&bytes).map_err(|source| {
                ConvertError::Safetensors {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            let mut params = ParameterMap::new();
            for (name, view) in st.tensors() {
                let dtype = from_safetensors_dtype(&name, view.dtype())?;
                let tensor = Tensor {
                    dtype,
                    shape: view.shape().to_vec(),
                    data: view.data().to_vec(),
                };
                params.insert(name, tensor);
            }
            Ok(SavedArtifact::Flat(params))
        }
    }
}
