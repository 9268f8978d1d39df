use std::path::PathBuf;

/// Errors that can occur while persisting or restoring a value table.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("value table not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to access value table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode value table: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode value table {path}: {source}")]
    Decode {
        path: PathBuf,
        source: rmp_serde::decode::Error,
    },

    #[error("unsupported value table format version {found} in {path}")]
    UnsupportedVersion { path: PathBuf, found: u32 },
}

/// Coarse classification of conversion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The checkpoint is not one of the recognized shapes.
    InputShape,
    /// A path could not be read or written.
    Io,
    /// The conversion would lose or merge parameters.
    Integrity,
}

/// Errors that can occur while converting a model checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode tensor archive {path}: {source}")]
    Decode {
        path: PathBuf,
        source: rmp_serde::decode::Error,
    },

    #[error("failed to encode tensor archive: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("safetensors error on {path}: {source}")]
    Safetensors {
        path: PathBuf,
        source: safetensors::SafeTensorError,
    },

    #[error("{path} is not a tensor archive (format '{format}', version {version})")]
    NotAnArchive {
        path: PathBuf,
        format: String,
        version: u32,
    },

    #[error("unrecognized checkpoint shape: top-level object is {kind}")]
    UnrecognizedShape { kind: String },

    #[error("'{key}' holds {kind}, expected a parameter mapping (other keys: {other_keys:?})")]
    StateDictNotMapping {
        key: String,
        kind: String,
        other_keys: Vec<String>,
    },

    #[error("scripted module '{type_name}' has no parameters")]
    EmptyModule { type_name: String },

    #[error("entry '{key}' holds {kind}, expected a tensor ({count} entries, keys: {keys:?})")]
    NotATensor {
        key: String,
        kind: String,
        count: usize,
        keys: Vec<String>,
    },

    #[error("tensor '{name}' is malformed: {reason}")]
    InvalidTensor { name: String, reason: String },

    #[error("shape {shape:?} does not hold {values} values")]
    ShapeMismatch { shape: Vec<usize>, values: usize },

    #[error("name translation maps both '{first}' and '{second}' to '{target}'")]
    NameCollision {
        target: String,
        first: String,
        second: String,
    },

    #[error("parameter count mismatch: source has {expected}, converted has {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ConvertError::Io { .. } => ErrorCategory::Io,
            ConvertError::NameCollision { .. } | ConvertError::CountMismatch { .. } => {
                ErrorCategory::Integrity
            }
            ConvertError::Decode { .. }
            | ConvertError::Encode(_)
            | ConvertError::Safetensors { .. }
            | ConvertError::NotAnArchive { .. }
            | ConvertError::UnrecognizedShape { .. }
            | ConvertError::StateDictNotMapping { .. }
            | ConvertError::EmptyModule { .. }
            | ConvertError::NotATensor { .. }
            | ConvertError::InvalidTensor { .. }
            | ConvertError::ShapeMismatch { .. } => ErrorCategory::InputShape,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
