//! # Force Field Module
//!
//! Energy and force kernels of the Gaussian dihedral with its 1-4 LJ/lambda coupling,
//! and the per-type coefficients they consume.
//!
//! ## Key Components
//!
//! - [`potentials`] - The seven-basin Gaussian torsion and the switched 1-4 pair kernel
//! - [`params`] - Coefficient records, the per-type table and the type-range grammar
//! - [`term`] - Energy and virial aggregation
//!
//! ## Usage
//!
//! ```ignore
//! use ljlambda::core::forcefield::params::{CoefficientTable, TypeRange};
//!
//! let mut table = CoefficientTable::new(2);
//! table.set_coefficients(TypeRange::all(2), 1.0, 4.0, 0.5, 0.0)?;
//! table.coeff(&["2", "0.8", "3.8", "0.2", "0.1"])?;
//! ```

pub mod params;
pub mod potentials;
pub mod term;
