use thiserror::Error;

use crate::core::forcefield::params::CoefficientError;
use crate::core::io::PersistenceError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Dihedral coefficients have not been assigned")]
    CoefficientsNotAllocated,

    #[error("All dihedral coefficients are not set (type {0} is unset)")]
    CoefficientsNotSet(usize),

    #[error("Coefficient table covers {found} dihedral types, expected {expected}")]
    TypeCountMismatch { expected: usize, found: usize },

    #[error("Dihedral {index} references unknown dihedral type {dihedral_type}")]
    UnknownDihedralType { index: usize, dihedral_type: usize },

    #[error("Dihedral {index} references particle {particle}, but only {len} particles are stored")]
    ParticleOutOfRange {
        index: usize,
        particle: usize,
        len: usize,
    },

    #[error("Invalid dihedral coefficients: {source}")]
    Coefficient {
        #[from]
        source: CoefficientError,
    },

    #[error("Coefficient persistence failed: {source}")]
    Persistence {
        #[from]
        source: PersistenceError,
    },
}
