//! # I/O Module
//!
//! Persistence of dihedral coefficients and loading of evaluation inputs.
//!
//! - [`restart`] - Binary restart blocks, read on one process and broadcast to the others
//! - [`data`] - The human-readable coefficient section, one line per dihedral type
//! - [`inputs`] - CSV particle and dihedral lists, and CSV force output

pub mod data;
pub mod inputs;
pub mod restart;

use thiserror::Error;

use crate::core::forcefield::params::CoefficientError;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Dihedral type {0} has no coefficients to persist")]
    CoefficientsNotSet(usize),
    #[error("Malformed coefficient line {line}: '{content}'")]
    MalformedLine { line: usize, content: String },
    #[error("Invalid coefficients on line {line}: {source}")]
    Coefficient {
        line: usize,
        source: CoefficientError,
    },
}
