//! # Models Module
//!
//! Particle storage, ownership and dihedral topology as seen by the evaluator.
//!
//! The evaluator never owns particles. It reads positions and accumulates forces through
//! [`system::ParticleStore`], asks [`system::Ownership`] whether a force may be written
//! to a particle, and walks a slice of [`topology::Dihedral`] records.

pub mod system;
pub mod topology;
