use crate::core::forcefield::term::{EnergyTerm, Virial};
use crate::core::models::system::Ownership;
use crate::core::utils::geometry::{QuadrupletForces, TorsionGeometry};
use crate::engine::config::EvaluationFlags;
use nalgebra::Vector3;

/// Receives per-interaction energies and virial inputs when diagnostics are enabled.
pub trait TallySink {
    fn tally_dihedral(
        &mut self,
        atoms: [usize; 4],
        energy: f64,
        forces: &QuadrupletForces,
        geometry: &TorsionGeometry,
    );

    fn tally_pair(&mut self, i: usize, j: usize, energy: f64, fpair: f64, del: &Vector3<f64>);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTally;

impl TallySink for NoTally {
    fn tally_dihedral(&mut self, _: [usize; 4], _: f64, _: &QuadrupletForces, _: &TorsionGeometry) {}

    fn tally_pair(&mut self, _: usize, _: usize, _: f64, _: f64, _: &Vector3<f64>) {}
}

/// Global energy and virial accumulation.
///
/// Each interaction is shared evenly among its atoms, and only the shares of atoms the
/// ownership capability accumulates into are counted. Under Newton mode every atom
/// accumulates, so the whole interaction is counted once; otherwise each process counts
/// the shares of its own atoms and the partial sums add up across processes.
#[derive(Debug, Clone)]
pub struct EnergyVirialTally<O: Ownership> {
    ownership: O,
    flags: EvaluationFlags,
    energy: EnergyTerm,
    dihedral_virial: Virial,
    pair_virial: Virial,
    per_atom_energy: Option<Vec<f64>>,
}

impl<O: Ownership> EnergyVirialTally<O> {
    pub fn new(ownership: O, flags: EvaluationFlags) -> Self {
        Self {
            ownership,
            flags,
            energy: EnergyTerm::default(),
            dihedral_virial: Virial::default(),
            pair_virial: Virial::default(),
            per_atom_energy: None,
        }
    }

    /// Also keeps a per-atom energy for `n_particles` particles when the flags ask for it.
    pub fn with_per_atom_energy(mut self, n_particles: usize) -> Self {
        if self.flags.per_atom_energy {
            self.per_atom_energy = Some(vec![0.0; n_particles]);
        }
        self
    }

    pub fn energy(&self) -> EnergyTerm {
        self.energy
    }

    pub fn dihedral_virial(&self) -> Virial {
        self.dihedral_virial
    }

    pub fn pair_virial(&self) -> Virial {
        self.pair_virial
    }

    pub fn virial(&self) -> Virial {
        self.dihedral_virial + self.pair_virial
    }

    pub fn per_atom_energy(&self) -> Option<&[f64]> {
        self.per_atom_energy.as_deref()
    }

    pub fn reset(&mut self) {
        self.energy = EnergyTerm::default();
        self.dihedral_virial = Virial::default();
        self.pair_virial = Virial::default();
        if let Some(per_atom) = self.per_atom_energy.as_mut() {
            per_atom.fill(0.0);
        }
    }

    fn owned_fraction(&self, atoms: &[usize]) -> f64 {
        let owned = atoms
            .iter()
            .filter(|&&i| self.ownership.accumulates(i))
            .count();
        owned as f64 / atoms.len() as f64
    }

    fn distribute_energy(&mut self, atoms: &[usize], energy: f64) {
        let share = energy / atoms.len() as f64;
        if let Some(per_atom) = self.per_atom_energy.as_mut() {
            for &i in atoms {
                if self.ownership.accumulates(i) {
                    per_atom[i] += share;
                }
            }
        }
    }
}

impl<O: Ownership> TallySink for EnergyVirialTally<O> {
    fn tally_dihedral(
        &mut self,
        atoms: [usize; 4],
        energy: f64,
        forces: &QuadrupletForces,
        geometry: &TorsionGeometry,
    ) {
        let fraction = self.owned_fraction(&atoms);

        if self.flags.energy {
            self.energy.dihedral += energy * fraction;
        }
        if self.flags.per_atom_energy {
            self.distribute_energy(&atoms, energy);
        }
        if self.flags.virial {
            let [f1, _, f3, f4] = forces;
            let virial = Virial::from_dihedral(
                f1,
                f3,
                f4,
                &geometry.vb1,
                &geometry.vb2,
                &geometry.vb3,
            );
            self.dihedral_virial += virial * fraction;
        }
    }

    fn tally_pair(&mut self, i: usize, j: usize, energy: f64, fpair: f64, del: &Vector3<f64>) {
        let atoms = [i, j];
        let fraction = self.owned_fraction(&atoms);

        if self.flags.energy {
            self.energy.pair += energy * fraction;
        }
        if self.flags.per_atom_energy {
            self.distribute_energy(&atoms, energy);
        }
        if self.flags.virial {
            self.pair_virial += Virial::from_pair(fpair, del) * fraction;
        }
    }
}
