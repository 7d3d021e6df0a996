use super::config::{EvaluationConfig, EvaluationFlags};
use super::diagnostics::{DegenerateDihedral, WarningSink};
use super::error::EngineError;
use super::tally::TallySink;
use crate::core::forcefield::params::{CoefficientRecord, CoefficientTable, TypeRange};
use crate::core::forcefield::potentials::{
    PairEvaluation, TorsionEvaluation, gaussian_torsion, lj_lambda_14,
};
use crate::core::io::restart::{self, Communicator};
use crate::core::io::data;
use crate::core::models::system::{Ownership, ParticleStore};
use crate::core::models::topology::Dihedral;
use crate::core::utils::geometry::{QuadrupletForces, TorsionGeometry, floored_sin_phi};
use nalgebra::{Point3, Vector3};
use std::io::{BufRead, Read, Write};
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Everything one quadruplet contributes, before ownership gating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadrupletContribution {
    pub geometry: TorsionGeometry,
    pub phi: f64,
    pub torsion: TorsionEvaluation,
    /// Torsional forces on the four atoms.
    pub forces: QuadrupletForces,
    /// `x1 - x4`.
    pub pair_del: Vector3<f64>,
    pub pair: PairEvaluation,
}

impl QuadrupletContribution {
    /// Force of the 1-4 interaction on the first atom. The fourth receives its negative.
    pub fn pair_force(&self) -> Vector3<f64> {
        self.pair_del * self.pair.fpair
    }
}

/// The per-quadruplet kernel. Pure: positions and coefficients in, contribution out.
pub fn evaluate_quadruplet(
    positions: &[Point3<f64>; 4],
    coeff: &CoefficientRecord,
) -> QuadrupletContribution {
    let [x1, x2, x3, x4] = positions;
    let geometry = TorsionGeometry::new(x1, x2, x3, x4);

    let phi = geometry.phi();
    let siinv = 1.0 / floored_sin_phi(phi);
    let torsion = gaussian_torsion(phi, coeff.epsdihed());
    let forces = geometry.project(torsion.log_derivative * siinv);

    let pair_del = x1 - x4;
    let pair = lj_lambda_14(pair_del.norm_squared(), coeff);

    QuadrupletContribution {
        geometry,
        phi,
        torsion,
        forces,
        pair_del,
        pair,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub evaluated: usize,
    pub warnings: usize,
}

/// The Gaussian torsion with switched 1-4 Lennard-Jones, for `n_types` dihedral types.
///
/// The coefficient table is allocated on the first assignment, or installed whole from a
/// restart or configuration file. Evaluation requires every type to be set.
#[derive(Debug, Clone)]
pub struct DihedralStyle {
    n_types: usize,
    config: EvaluationConfig,
    coefficients: Option<CoefficientTable>,
}

impl DihedralStyle {
    pub fn new(n_types: usize, config: EvaluationConfig) -> Self {
        Self {
            n_types,
            config,
            coefficients: None,
        }
    }

    pub fn n_types(&self) -> usize {
        self.n_types
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn set_flags(&mut self, flags: EvaluationFlags) {
        self.config.flags = flags;
    }

    pub fn coefficients(&self) -> Option<&CoefficientTable> {
        self.coefficients.as_ref()
    }

    pub fn install_coefficients(&mut self, table: CoefficientTable) -> Result<(), EngineError> {
        if table.n_types() != self.n_types {
            return Err(EngineError::TypeCountMismatch {
                expected: self.n_types,
                found: table.n_types(),
            });
        }
        self.coefficients = Some(table);
        Ok(())
    }

    pub fn set_coefficients(
        &mut self,
        range: TypeRange,
        epsilon: f64,
        sigma: f64,
        lambda: f64,
        epsdihed: f64,
    ) -> Result<usize, EngineError> {
        Ok(self
            .table_mut()
            .set_coefficients(range, epsilon, sigma, lambda, epsdihed)?)
    }

    /// Argument-vector form: `range epsilon sigma lambda [epsdihed]`.
    pub fn coeff(&mut self, args: &[&str]) -> Result<usize, EngineError> {
        Ok(self.table_mut().coeff(args)?)
    }

    pub fn write_restart<W: Write>(&self, writer: &mut W) -> Result<(), EngineError> {
        let table = self.allocated_table()?;
        restart::write_restart(table, writer)?;
        Ok(())
    }

    /// Replaces the table with the one stored in a restart. Only rank 0 of `comm` reads.
    pub fn read_restart<R: Read, C: Communicator>(
        &mut self,
        reader: &mut R,
        comm: &C,
    ) -> Result<(), EngineError> {
        self.coefficients = Some(restart::read_restart(reader, self.n_types, comm)?);
        Ok(())
    }

    pub fn write_data<W: Write>(&self, writer: &mut W) -> Result<(), EngineError> {
        let table = self.allocated_table()?;
        data::write_data(table, writer)?;
        Ok(())
    }

    pub fn read_data<R: BufRead>(&mut self, reader: R) -> Result<usize, EngineError> {
        Ok(data::read_data(reader, self.table_mut())?)
    }

    /// Checks that every dihedral type has coefficients.
    pub fn init(&self) -> Result<(), EngineError> {
        self.ready_table().map(|_| ())
    }

    /// Evaluates every dihedral once.
    ///
    /// All dihedrals are validated before any force is written, so an error leaves the
    /// store untouched. Degenerate geometry never fails the call; it is reported to
    /// `warnings` and evaluated with clamped values.
    #[instrument(skip_all, name = "dihedral_compute", fields(dihedrals = dihedrals.len(), timestep = timestep))]
    pub fn compute<S, O, T, W>(
        &self,
        store: &mut S,
        dihedrals: &[Dihedral],
        ownership: &O,
        timestep: u64,
        tally: &mut T,
        warnings: &mut W,
    ) -> Result<EvaluationSummary, EngineError>
    where
        S: ParticleStore,
        O: Ownership,
        T: TallySink,
        W: WarningSink,
    {
        let table = self.ready_table()?;
        let records = resolve_records(table, dihedrals, store.len())?;
        let positions: Vec<[Point3<f64>; 4]> = dihedrals
            .iter()
            .map(|dihedral| dihedral.atoms.map(|i| store.position(i)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = positions.iter().zip(records.iter());

        #[cfg(feature = "parallel")]
        let iterator = positions.par_iter().zip(records.par_iter());

        let contributions: Vec<QuadrupletContribution> = iterator
            .map(|(x, &coeff)| evaluate_quadruplet(x, coeff))
            .collect();

        let flags = self.config.flags;
        let mut summary = EvaluationSummary::default();

        for ((dihedral, x), contribution) in dihedrals.iter().zip(&positions).zip(&contributions) {
            if contribution.geometry.is_out_of_band() {
                warnings.degenerate_dihedral(DegenerateDihedral {
                    rank: self.config.rank,
                    timestep,
                    tags: dihedral.atoms.map(|i| store.tag(i)),
                    positions: *x,
                    cosine: contribution.geometry.cosine,
                });
                summary.warnings += 1;
            }

            let owned = dihedral.atoms.map(|i| ownership.accumulates(i));
            for ((&i, &accumulate), force) in dihedral
                .atoms
                .iter()
                .zip(&owned)
                .zip(&contribution.forces)
            {
                if accumulate {
                    store.add_force(i, force);
                }
            }

            let (i1, i4) = dihedral.end_atoms();
            let pair_force = contribution.pair_force();
            if owned[0] {
                store.add_force(i1, &pair_force);
            }
            if owned[3] {
                store.add_force(i4, &-pair_force);
            }

            if flags.any() {
                let (torsion_energy, pair_energy) = if flags.any_energy() {
                    (contribution.torsion.energy, contribution.pair.energy)
                } else {
                    (0.0, 0.0)
                };
                tally.tally_dihedral(
                    dihedral.atoms,
                    torsion_energy,
                    &contribution.forces,
                    &contribution.geometry,
                );
                tally.tally_pair(
                    i1,
                    i4,
                    pair_energy,
                    contribution.pair.fpair,
                    &contribution.pair_del,
                );
            }

            summary.evaluated += 1;
        }

        debug!(
            evaluated = summary.evaluated,
            warnings = summary.warnings,
            "Dihedral evaluation finished"
        );
        Ok(summary)
    }

    fn table_mut(&mut self) -> &mut CoefficientTable {
        let n_types = self.n_types;
        self.coefficients
            .get_or_insert_with(|| CoefficientTable::new(n_types))
    }

    fn allocated_table(&self) -> Result<&CoefficientTable, EngineError> {
        self.coefficients
            .as_ref()
            .ok_or(EngineError::CoefficientsNotAllocated)
    }

    fn ready_table(&self) -> Result<&CoefficientTable, EngineError> {
        let table = self.allocated_table()?;
        match table.first_unset() {
            Some(dihedral_type) => Err(EngineError::CoefficientsNotSet(dihedral_type)),
            None => Ok(table),
        }
    }
}

fn resolve_records<'a>(
    table: &'a CoefficientTable,
    dihedrals: &[Dihedral],
    n_particles: usize,
) -> Result<Vec<&'a CoefficientRecord>, EngineError> {
    dihedrals
        .iter()
        .enumerate()
        .map(|(index, dihedral)| {
            if let Some(&particle) = dihedral.atoms.iter().find(|&&i| i >= n_particles) {
                return Err(EngineError::ParticleOutOfRange {
                    index,
                    particle,
                    len: n_particles,
                });
            }
            table
                .get(dihedral.dihedral_type)
                .ok_or(EngineError::UnknownDihedralType {
                    index,
                    dihedral_type: dihedral.dihedral_type,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::term::EnergyTerm;
    use crate::core::io::restart::SingleProcess;
    use crate::core::models::system::{NewtonOwnership, ParticleSystem};
    use crate::engine::config::EvaluationConfigBuilder;
    use crate::engine::tally::{EnergyVirialTally, NoTally};
    use nalgebra::Rotation3;
    use std::io::Cursor;

    const SKEWED: [[f64; 3]; 4] = [
        [-0.5, 1.4, 0.0],
        [0.0, 0.0, 0.0],
        [1.5, 0.0, 0.0],
        [2.0, 0.9, 1.0],
    ];

    fn style(sigma: f64, epsdihed: f64) -> DihedralStyle {
        let config = EvaluationConfigBuilder::new()
            .newton_bond(true)
            .build()
            .unwrap();
        let mut style = DihedralStyle::new(1, config);
        style
            .set_coefficients(TypeRange::single(1), 1.0, sigma, 0.5, epsdihed)
            .unwrap();
        style
    }

    fn system(points: &[[f64; 3]]) -> ParticleSystem {
        let mut system = ParticleSystem::new();
        for (idx, p) in points.iter().enumerate() {
            system.add_particle(idx as u64 + 1, Point3::new(p[0], p[1], p[2]));
        }
        system
    }

    fn no_warnings() -> Vec<DegenerateDihedral> {
        Vec::new()
    }

    fn quadruplet() -> Vec<Dihedral> {
        vec![Dihedral::new([0, 1, 2, 3], 1)]
    }

    fn evaluate(style: &DihedralStyle, system: &mut ParticleSystem) -> EnergyTerm {
        let ownership = style.config().ownership(system.len());
        let mut tally = EnergyVirialTally::new(ownership, style.config().flags);
        let mut warnings = no_warnings();
        style
            .compute(system, &quadruplet(), &ownership, 0, &mut tally, &mut warnings)
            .unwrap();
        assert!(warnings.is_empty());
        tally.energy()
    }

    #[test]
    fn forces_sum_to_zero() {
        for sigma in [1.0, 3.0] {
            let style = style(sigma, 0.2);
            let mut system = system(&SKEWED);
            evaluate(&style, &mut system);

            let net: Vector3<f64> = system.forces().iter().sum();
            assert!(net.norm() < 1e-10, "sigma = {sigma}: net force {net}");
        }
    }

    #[test]
    fn forces_match_finite_difference_of_energy() {
        let h = 1e-6;
        for sigma in [1.0, 3.0] {
            let style = style(sigma, 0.2);
            let mut system = system(&SKEWED);
            evaluate(&style, &mut system);
            let analytic = system.forces().to_vec();

            for particle in 0..4 {
                for axis in 0..3 {
                    let energy_at = |offset: f64| {
                        let mut displaced = self::system(&SKEWED);
                        displaced.positions_mut()[particle][axis] += offset;
                        evaluate(&style, &mut displaced).total()
                    };
                    let numeric = -(energy_at(h) - energy_at(-h)) / (2.0 * h);
                    let expected = analytic[particle][axis];
                    assert!(
                        (numeric - expected).abs() < 1e-5 * expected.abs().max(1.0),
                        "sigma = {sigma}, particle {particle}, axis {axis}: numeric {numeric}, analytic {expected}"
                    );
                }
            }
        }
    }

    #[test]
    fn rigid_motion_preserves_energy_and_rotates_forces() {
        let style = style(3.0, 0.1);
        let mut reference = system(&SKEWED);
        let reference_energy = evaluate(&style, &mut reference);

        let rotation = Rotation3::from_euler_angles(0.3, -0.7, 1.1);
        let shift = Vector3::new(2.0, -1.0, 0.5);
        let moved: Vec<[f64; 3]> = SKEWED
            .iter()
            .map(|p| {
                let q = rotation * Point3::new(p[0], p[1], p[2]) + shift;
                [q.x, q.y, q.z]
            })
            .collect();
        let mut moved = system(&moved);
        let moved_energy = evaluate(&style, &mut moved);

        assert!((moved_energy.dihedral - reference_energy.dihedral).abs() < 1e-10);
        assert!((moved_energy.pair - reference_energy.pair).abs() < 1e-10);
        for (f_ref, f_moved) in reference.forces().iter().zip(moved.forces()) {
            assert!((rotation * f_ref - f_moved).norm() < 1e-9);
        }
    }

    #[test]
    fn planar_cis_energy_matches_basin_sum_at_zero() {
        let style = style(1.0, 0.0);
        let mut system = system(&[
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
        ]);
        let energy = evaluate(&style, &mut system);
        assert!((energy.dihedral - gaussian_torsion(0.0, 0.0).energy).abs() < 1e-12);

        let contribution = evaluate_quadruplet(
            &system.positions().try_into().unwrap(),
            style.coefficients().unwrap().get(1).unwrap(),
        );
        assert_eq!(contribution.phi, 0.0);
    }

    #[test]
    fn symmetric_quadruplet_has_mirrored_forces() {
        let style = style(1.0, 0.0);
        let mut system = system(&[
            [0.0, 1.0, 0.4],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, -0.4],
        ]);
        evaluate(&style, &mut system);

        let mirror = |f: &Vector3<f64>| Vector3::new(-f.x, f.y, -f.z);
        let forces = system.forces();
        assert!((forces[3] - mirror(&forces[0])).norm() < 1e-10);
        assert!((forces[2] - mirror(&forces[1])).norm() < 1e-10);
    }

    #[test]
    fn ghost_particles_receive_no_force_without_newton_bond() {
        let style = style(3.0, 0.0);
        let mut newton = system(&SKEWED);
        evaluate(&style, &mut newton);

        let mut local = system(&SKEWED);
        let ownership = NewtonOwnership::new(2, false);
        style
            .compute(
                &mut local,
                &quadruplet(),
                &ownership,
                0,
                &mut NoTally,
                &mut no_warnings(),
            )
            .unwrap();

        assert_eq!(local.forces()[0], newton.forces()[0]);
        assert_eq!(local.forces()[1], newton.forces()[1]);
        assert_eq!(local.forces()[2], Vector3::zeros());
        assert_eq!(local.forces()[3], Vector3::zeros());
    }

    #[test]
    fn degenerate_quadruplet_warns_once_and_evaluation_continues() {
        let style = style(1.0, 0.0);
        let mut system = system(&[
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [-0.5, 1.4, 0.0],
            [0.0, 0.0, 0.0],
            [1.5, 0.0, 0.0],
            [2.0, 0.9, 1.0],
        ]);
        let dihedrals = vec![
            Dihedral::new([0, 1, 2, 3], 1),
            Dihedral::new([4, 5, 6, 7], 1),
        ];
        let ownership = NewtonOwnership::new(8, true);
        let mut warnings = no_warnings();

        let summary = style
            .compute(&mut system, &dihedrals, &ownership, 42, &mut NoTally, &mut warnings)
            .unwrap();

        assert_eq!(summary, EvaluationSummary { evaluated: 2, warnings: 1 });
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].tags, [1, 2, 3, 4]);
        assert_eq!(warnings[0].timestep, 42);
        assert!(system.forces()[4..].iter().all(|f| f.iter().all(|c| c.is_finite())));
    }

    #[test]
    fn disabling_energy_keeps_forces_and_virial() {
        let mut style = style(3.0, 0.0);
        let mut with_energy = system(&SKEWED);
        evaluate(&style, &mut with_energy);

        style.set_flags(EvaluationFlags {
            energy: false,
            ..EvaluationFlags::GLOBAL
        });
        let mut without_energy = system(&SKEWED);
        let ownership = style.config().ownership(4);
        let mut tally = EnergyVirialTally::new(ownership, style.config().flags);
        style
            .compute(
                &mut without_energy,
                &quadruplet(),
                &ownership,
                0,
                &mut tally,
                &mut no_warnings(),
            )
            .unwrap();

        assert_eq!(tally.energy(), EnergyTerm::default());
        assert!(tally.virial().trace() != 0.0);
        assert_eq!(with_energy.forces(), without_energy.forces());
    }

    #[test]
    fn compute_requires_allocated_coefficients() {
        let config = EvaluationConfigBuilder::new()
            .newton_bond(true)
            .build()
            .unwrap();
        let style = DihedralStyle::new(1, config);
        let mut system = system(&SKEWED);
        let result = style.compute(
            &mut system,
            &quadruplet(),
            &NewtonOwnership::new(4, true),
            0,
            &mut NoTally,
            &mut no_warnings(),
        );
        assert!(matches!(result, Err(EngineError::CoefficientsNotAllocated)));
        assert!(matches!(style.init(), Err(EngineError::CoefficientsNotAllocated)));
    }

    #[test]
    fn init_reports_first_unset_type() {
        let config = EvaluationConfigBuilder::new()
            .newton_bond(true)
            .build()
            .unwrap();
        let mut style = DihedralStyle::new(3, config);
        style.coeff(&["1", "1.0", "1.0", "0.5"]).unwrap();
        style.coeff(&["3", "1.0", "1.0", "0.5", "0.1"]).unwrap();
        assert!(matches!(style.init(), Err(EngineError::CoefficientsNotSet(2))));

        style.coeff(&["*", "2.0", "1.0", "0.5"]).unwrap();
        assert!(style.init().is_ok());
    }

    #[test]
    fn invalid_dihedrals_are_rejected_before_any_force_is_written() {
        let style = style(1.0, 0.0);
        let ownership = NewtonOwnership::new(4, true);

        let mut system = system(&SKEWED);
        let bad_type = vec![
            Dihedral::new([0, 1, 2, 3], 1),
            Dihedral::new([0, 1, 2, 3], 2),
        ];
        let result = style.compute(
            &mut system,
            &bad_type,
            &ownership,
            0,
            &mut NoTally,
            &mut no_warnings(),
        );
        assert!(matches!(
            result,
            Err(EngineError::UnknownDihedralType { index: 1, dihedral_type: 2 })
        ));
        assert!(system.forces().iter().all(|f| *f == Vector3::zeros()));

        let bad_particle = vec![Dihedral::new([0, 1, 2, 9], 1)];
        let result = style.compute(
            &mut system,
            &bad_particle,
            &ownership,
            0,
            &mut NoTally,
            &mut no_warnings(),
        );
        assert!(matches!(
            result,
            Err(EngineError::ParticleOutOfRange { index: 0, particle: 9, len: 4 })
        ));
    }

    #[test]
    fn install_coefficients_checks_type_count() {
        let mut style = style(1.0, 0.0);
        let result = style.install_coefficients(CoefficientTable::new(2));
        assert!(matches!(
            result,
            Err(EngineError::TypeCountMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn restart_round_trip_restores_coefficients() {
        let original = style(2.5, 0.3);
        let mut buffer = Vec::new();
        original.write_restart(&mut buffer).unwrap();

        let mut restored = DihedralStyle::new(1, original.config().clone());
        restored
            .read_restart(&mut Cursor::new(buffer), &SingleProcess)
            .unwrap();
        assert_eq!(restored.coefficients(), original.coefficients());
        assert!(restored.init().is_ok());
    }

    #[test]
    fn data_section_round_trip_restores_coefficients() {
        let original = style(2.5, 0.3);
        let mut buffer = Vec::new();
        original.write_data(&mut buffer).unwrap();

        let mut restored = DihedralStyle::new(1, original.config().clone());
        assert_eq!(restored.read_data(Cursor::new(buffer)).unwrap(), 1);
        assert_eq!(restored.coefficients(), original.coefficients());
    }
}
