//! # Engine Module
//!
//! Walks a dihedral list once per timestep and turns each quadruplet into forces,
//! energies and virial contributions.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Newton mode, rank and which diagnostics to produce
//! - **Evaluation** ([`evaluator`]) - The dihedral style: coefficient ownership, validation
//!   and the per-quadruplet kernel
//! - **Tallies** ([`tally`]) - Energy and virial accumulation with ownership weighting
//! - **Diagnostics** ([`diagnostics`]) - Structured reports of degenerate dihedrals
//! - **Error Handling** ([`error`]) - Configuration errors detected before evaluation
//!
//! Geometry never aborts an evaluation. Degenerate quadruplets are floored, clamped and
//! reported through a [`diagnostics::WarningSink`].

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod tally;
