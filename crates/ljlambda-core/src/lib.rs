//! # ljlambda Core Library
//!
//! A per-quadruplet force and energy evaluator for a torsional potential built from a
//! fixed sum of seven Gaussian basins, coupled with a 1-4 Lennard-Jones interaction
//! whose long-range branch is scaled by a soft-core `lambda` parameter.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout so that the numerical kernel stays free of
//! I/O and orchestration concerns.
//!
//! - **[`core`]: The Foundation.** Stateless data models (particles, dihedral topology),
//!   the pure potential functions, the per-type coefficient table, torsion geometry and
//!   coefficient persistence.
//!
//! - **[`engine`]: The Logic Core.** The dihedral evaluator that walks a dihedral list,
//!   gates force accumulation by ownership, forwards energies and virials to a tally sink
//!   and reports degenerate geometries to a warning sink.
//!
//! - **[`workflows`]: The Public API.** Complete procedures that load inputs from disk,
//!   run the engine and hand back a report.

pub mod core;
pub mod engine;
pub mod workflows;
