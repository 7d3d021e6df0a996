//! # Workflows Module
//!
//! End-to-end procedures built on the engine. Each workflow loads its inputs from disk,
//! validates them, runs the dihedral style and returns a plain report for the caller to
//! print or persist.
//!
//! - **Coefficients** ([`coefficients`]) - Loading a coefficient table from a TOML
//!   configuration, a binary restart or a data section, and exporting it again
//! - **Evaluation** ([`evaluate`]) - One force and energy evaluation over a particle set
//!   and its dihedral list

pub mod coefficients;
pub mod evaluate;

use crate::core::forcefield::params::ParamLoadError;
use crate::core::io::inputs::InputError;
use crate::engine::error::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Params(#[from] ParamLoadError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
