//! Model checkpoint conversion.
//!
//! A checkpoint is read from a tensor archive, classified as a scripted
//! module, a wrapped training state or a flat mapping, reduced to a flat
//! parameter mapping, renamed into the dotted `res_blocks.<N>` scheme and
//! written back out without any wrapper.

pub mod archive;
pub mod artifact;
pub mod export;
pub mod names;
mod pipeline;
pub mod verify;

pub use archive::{DType, Object, Parameter, ScriptedModule, Tensor};
pub use artifact::{extract_parameters, load_checkpoint, Checkpoint, ParameterMap};
pub use export::{save_parameters, OutputFormat};
pub use names::{translate_name, translate_names, NameRewrite};
pub use pipeline::{convert_checkpoint, ConversionReport};
pub use verify::{verify, VerificationIssue, VerificationReport};
