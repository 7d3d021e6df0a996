use super::WorkflowError;
use super::coefficients::{CoefficientSource, load_style};
use crate::core::forcefield::term::{EnergyTerm, Virial};
use crate::core::io::inputs;
use crate::core::models::system::{ParticleStore, ParticleSystem};
use crate::engine::config::EvaluationConfig;
use crate::engine::diagnostics::TracingWarnings;
use crate::engine::evaluator::EvaluationSummary;
use crate::engine::tally::EnergyVirialTally;
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct EvaluationSetup {
    pub coefficients: CoefficientSource,
    pub particles_path: PathBuf,
    pub dihedrals_path: PathBuf,
    /// Number of owned particles. `None` owns every particle in the input.
    pub nlocal: Option<usize>,
    pub timestep: u64,
    pub config: EvaluationConfig,
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub summary: EvaluationSummary,
    pub energy: EnergyTerm,
    pub dihedral_virial: Virial,
    pub pair_virial: Virial,
    pub per_atom_energy: Option<Vec<f64>>,
    /// The particles with their accumulated forces.
    pub system: ParticleSystem,
}

impl EvaluationReport {
    pub fn virial(&self) -> Virial {
        self.dihedral_virial + self.pair_virial
    }
}

#[instrument(skip_all, name = "evaluation_workflow")]
pub fn run(setup: &EvaluationSetup) -> Result<EvaluationReport, WorkflowError> {
    // === Phase 1: Load coefficients and inputs ===
    info!("Loading coefficients, particles and dihedrals.");
    let style = load_style(&setup.coefficients, setup.config.clone())?;
    style.init()?;

    let mut system = inputs::read_particles(&setup.particles_path)?;
    let dihedrals = inputs::read_dihedrals(&setup.dihedrals_path, &system)?;
    info!(
        particles = system.len(),
        dihedrals = dihedrals.len(),
        "Inputs loaded."
    );

    // === Phase 2: Evaluate ===
    let nlocal = setup.nlocal.unwrap_or(system.len()).min(system.len());
    let ownership = setup.config.ownership(nlocal);
    let mut tally = EnergyVirialTally::new(ownership, setup.config.flags)
        .with_per_atom_energy(system.len());
    let mut warnings = TracingWarnings::new();

    let summary = style.compute(
        &mut system,
        &dihedrals,
        &ownership,
        setup.timestep,
        &mut tally,
        &mut warnings,
    )?;

    // === Phase 3: Report ===
    let energy = tally.energy();
    info!(
        dihedral = energy.dihedral,
        pair = energy.pair,
        warnings = summary.warnings,
        "Evaluated {} dihedral(s).",
        summary.evaluated
    );

    Ok(EvaluationReport {
        summary,
        energy,
        dihedral_virial: tally.dihedral_virial(),
        pair_virial: tally.pair_virial(),
        per_atom_energy: tally.per_atom_energy().map(<[f64]>::to_vec),
        system,
    })
}
