//! # Core Module
//!
//! Fundamental building blocks of the dihedral evaluator.
//!
//! - **Potentials and coefficients** ([`forcefield`]) - The Gaussian torsion basis, the
//!   1-4 LJ/lambda pair kernel and the per-type coefficient table
//! - **Particle representation** ([`models`]) - Particle stores, ownership and dihedral topology
//! - **Persistence** ([`io`]) - Binary restart, text data sections and CSV inputs
//! - **Geometry** ([`utils`]) - Dihedral angle construction and force projection

pub mod forcefield;
pub mod io;
pub mod models;
pub mod utils;
