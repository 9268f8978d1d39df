//! The tensor-archive container: a MessagePack document holding a tagged
//! object tree. Checkpoints written by the training runtime, wrapped training
//! states and plain parameter mappings all use this container.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::checkpoint::write_atomic;
use crate::error::ConvertError;

pub const ARCHIVE_FORMAT: &str = "tensor-archive";
pub const ARCHIVE_VERSION: u32 = 1;

/// Element type of a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    F64,
    I64,
    U8,
}

impl DType {
    /// Bytes per element.
    pub fn size(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 | DType::I64 => 8,
            DType::U8 => 1,
        }
    }
}

/// A dense tensor value: element type, shape and little-endian bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub data: Vec<u8>,
}

impl Tensor {
    /// Build an `f32` tensor from values in row-major order.
    pub fn from_f32(shape: Vec<usize>, values: &[f32]) -> Result<Self, ConvertError> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Tensor::from_values(DType::F32, shape, values.len(), data)
    }

    /// Build an `i64` tensor from values in row-major order.
    pub fn from_i64(shape: Vec<usize>, values: &[i64]) -> Result<Self, ConvertError> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Tensor::from_values(DType::I64, shape, values.len(), data)
    }

    fn from_values(
        dtype: DType,
        shape: Vec<usize>,
        count: usize,
        data: Vec<u8>,
    ) -> Result<Self, ConvertError> {
        if checked_numel(&shape) != Some(count) {
            return Err(ConvertError::ShapeMismatch { shape, values: count });
        }
        Ok(Tensor { dtype, shape, data })
    }

    /// Number of elements, or `None` if the shape overflows `usize`.
    pub fn numel(&self) -> Option<usize> {
        checked_numel(&self.shape)
    }

    /// Decode the payload as `f32` values, if that is the element type.
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        if self.dtype != DType::F32 {
            return None;
        }
        Some(
            self.data
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    /// Check that the payload length matches shape and element type.
    pub fn validate(&self, name: &str) -> Result<(), ConvertError> {
        let Some(expected) = self.numel().and_then(|n| n.checked_mul(self.dtype.size())) else {
            return Err(ConvertError::InvalidTensor {
                name: name.to_string(),
                reason: format!("shape {:?} overflows", self.shape),
            });
        };
        if self.data.len() != expected {
            return Err(ConvertError::InvalidTensor {
                name: name.to_string(),
                reason: format!(
                    "shape {:?} of {:?} needs {} bytes, found {}",
                    self.shape,
                    self.dtype,
                    expected,
                    self.data.len()
                ),
            });
        }
        Ok(())
    }
}

fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
}

/// A trainable parameter of a scripted module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub data: Tensor,
    #[serde(default)]
    pub requires_grad: bool,
    /// Accumulated gradient, if the module was saved mid-step.
    #[serde(default)]
    pub grad: Option<Tensor>,
}

impl Parameter {
    pub fn new(data: Tensor) -> Self {
        Parameter {
            data,
            requires_grad: true,
            grad: None,
        }
    }
}

/// A compiled module: its own parameters and buffers plus named children.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScriptedModule {
    pub type_name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(default)]
    pub buffers: BTreeMap<String, Tensor>,
    #[serde(default)]
    pub submodules: BTreeMap<String, ScriptedModule>,
}

impl ScriptedModule {
    pub fn new(type_name: impl Into<String>) -> Self {
        ScriptedModule {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, data: Tensor) -> Self {
        self.parameters.insert(name.into(), Parameter::new(data));
        self
    }

    pub fn with_buffer(mut self, name: impl Into<String>, data: Tensor) -> Self {
        self.buffers.insert(name.into(), data);
        self
    }

    pub fn with_submodule(mut self, name: impl Into<String>, module: ScriptedModule) -> Self {
        self.submodules.insert(name.into(), module);
        self
    }

    /// Every parameter in this module and its children, named by its path
    /// with `.` between module levels.
    pub fn named_parameters(&self) -> Vec<(String, &Parameter)> {
        let mut out = Vec::new();
        collect_parameters(self, "", &mut out);
        out
    }

    /// Every buffer (non-trainable state such as running statistics).
    pub fn named_buffers(&self) -> Vec<(String, &Tensor)> {
        let mut out = Vec::new();
        collect_buffers(self, "", &mut out);
        out
    }
}

fn collect_parameters<'a>(
    module: &'a ScriptedModule,
    prefix: &str,
    out: &mut Vec<(String, &'a Parameter)>,
) {
    for (name, param) in &module.parameters {
        out.push((join_path(prefix, name), param));
    }
    for (name, child) in &module.submodules {
        collect_parameters(child, &join_path(prefix, name), out);
    }
}

fn collect_buffers<'a>(
    module: &'a ScriptedModule,
    prefix: &str,
    out: &mut Vec<(String, &'a Tensor)>,
) {
    for (name, buffer) in &module.buffers {
        out.push((join_path(prefix, name), buffer));
    }
    for (name, child) in &module.submodules {
        collect_buffers(child, &join_path(prefix, name), out);
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// A node of the archive's object tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Object {
    Module(ScriptedModule),
    Dict(BTreeMap<String, Object>),
    Tensor(Tensor),
    List(Vec<Object>),
    Int(i64),
    Float(f64),
    Str(String),
    None,
}

impl Object {
    /// Short name of the node type, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Module(_) => "module",
            Object::Dict(_) => "dict",
            Object::Tensor(_) => "tensor",
            Object::List(_) => "list",
            Object::Int(_) => "int",
            Object::Float(_) => "float",
            Object::Str(_) => "str",
            Object::None => "none",
        }
    }

    /// Build a dict node from tensors.
    pub fn tensor_dict<I, K>(entries: I) -> Object
    where
        I: IntoIterator<Item = (K, Tensor)>,
        K: Into<String>,
    {
        Object::Dict(
            entries
                .into_iter()
                .map(|(k, t)| (k.into(), Object::Tensor(t)))
                .collect(),
        )
    }
}

#[derive(Serialize)]
struct ArchiveHeaderRef<'a> {
    format: &'a str,
    version: u32,
    root: &'a Object,
}

#[derive(Deserialize)]
struct ArchiveFile {
    format: String,
    version: u32,
    root: Object,
}

/// Encode `root` as a complete archive document.
pub fn encode_archive(root: &Object) -> Result<Vec<u8>, ConvertError> {
    let doc = ArchiveHeaderRef {
        format: ARCHIVE_FORMAT,
        version: ARCHIVE_VERSION,
        root,
    };
    Ok(rmp_serde::to_vec_named(&doc)?)
}

/// Atomically write `root` to `path`.
pub fn write_archive(path: &Path, root: &Object) -> Result<(), ConvertError> {
    let bytes = encode_archive(root)?;
    write_atomic(path, &bytes).map_err(|e| ConvertError::io(path, e))
}

/// Read the object tree stored at `path`.
pub fn read_archive(path: &Path) -> Result<Object, ConvertError> {
    let bytes = fs::read(path).map_err(|e| ConvertError::io(path, e))?;
    let doc: ArchiveFile = rmp_serde::from_slice(&bytes).map_err(|source| ConvertError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    if doc.format != ARCHIVE_FORMAT || doc.version != ARCHIVE_VERSION {
        return Err(ConvertError::NotAnArchive {
            path: path.to_path_buf(),
            format: doc.format,
            version: doc.version,
        });
    }
    Ok(doc.root)
}
