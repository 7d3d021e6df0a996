use nalgebra::Vector3;
use std::ops::{Add, AddAssign, Mul};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTerm {
    pub dihedral: f64,
    pub pair: f64,
}

impl EnergyTerm {
    pub fn new(dihedral: f64, pair: f64) -> Self {
        Self { dihedral, pair }
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.dihedral + self.pair
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            dihedral: self.dihedral + rhs.dihedral,
            pair: self.pair + rhs.pair,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.dihedral += rhs.dihedral;
        self.pair += rhs.pair;
    }
}

/// Symmetric virial tensor stored as `[xx, yy, zz, xy, xz, yz]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Virial(pub [f64; 6]);

impl Virial {
    /// Virial of a four-body term from the forces on atoms 1, 3 and 4 and the bond
    /// vectors `vb1 = x1 - x2`, `vb2 = x3 - x2`, `vb3 = x4 - x3`.
    pub fn from_dihedral(
        f1: &Vector3<f64>,
        f3: &Vector3<f64>,
        f4: &Vector3<f64>,
        vb1: &Vector3<f64>,
        vb2: &Vector3<f64>,
        vb3: &Vector3<f64>,
    ) -> Self {
        let arm4 = vb3 + vb2;
        let component = |a: usize, b: usize| vb1[a] * f1[b] + vb2[a] * f3[b] + arm4[a] * f4[b];
        Self([
            component(0, 0),
            component(1, 1),
            component(2, 2),
            component(0, 1),
            component(0, 2),
            component(1, 2),
        ])
    }

    /// Virial of a central pair force `del * fpair`.
    pub fn from_pair(fpair: f64, del: &Vector3<f64>) -> Self {
        Self([
            del.x * del.x * fpair,
            del.y * del.y * fpair,
            del.z * del.z * fpair,
            del.x * del.y * fpair,
            del.x * del.z * fpair,
            del.y * del.z * fpair,
        ])
    }

    /// Trace of the tensor.
    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[1] + self.0[2]
    }
}

impl Add for Virial {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        let mut out = self;
        out += rhs;
        out
    }
}

impl AddAssign for Virial {
    fn add_assign(&mut self, rhs: Self) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0) {
            *lhs += rhs;
        }
    }
}

impl Mul<f64> for Virial {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0.map(|v| v * rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_energy_term_with_specified_values() {
        let term = EnergyTerm::new(1.0, 2.0);
        assert_eq!(term.dihedral, 1.0);
        assert_eq!(term.pair, 2.0);
    }

    #[test]
    fn total_returns_sum_of_all_terms() {
        let term = EnergyTerm::new(1.5, -2.0);
        assert_eq!(term.total(), -0.5);
    }

    #[test]
    fn add_and_add_assign_sum_each_field() {
        let a = EnergyTerm::new(1.0, 2.0);
        let b = EnergyTerm::new(4.0, 5.0);
        assert_eq!(a + b, EnergyTerm::new(5.0, 7.0));

        let mut c = a;
        c += b;
        assert_eq!(c, EnergyTerm::new(5.0, 7.0));
    }

    #[test]
    fn pair_virial_is_outer_product_of_separation() {
        let del = Vector3::new(1.0, 2.0, 3.0);
        let virial = Virial::from_pair(0.5, &del);
        assert_eq!(virial, Virial([0.5, 2.0, 4.5, 1.0, 1.5, 3.0]));
        assert_eq!(virial.trace(), 7.0);
    }

    #[test]
    fn dihedral_virial_uses_combined_lever_arm_for_atom_four() {
        let f1 = Vector3::new(1.0, 0.0, 0.0);
        let f3 = Vector3::new(0.0, 1.0, 0.0);
        let f4 = Vector3::new(0.0, 0.0, 1.0);
        let vb1 = Vector3::new(2.0, 0.0, 0.0);
        let vb2 = Vector3::new(0.0, 3.0, 0.0);
        let vb3 = Vector3::new(0.0, 0.0, 4.0);

        let virial = Virial::from_dihedral(&f1, &f3, &f4, &vb1, &vb2, &vb3);
        assert_eq!(virial, Virial([2.0, 3.0, 4.0, 0.0, 0.0, 3.0]));
    }

    #[test]
    fn virial_add_and_scale_are_componentwise() {
        let a = Virial([1.0; 6]);
        let b = Virial([2.0, 0.0, 1.0, 0.0, 3.0, 0.0]);
        assert_eq!(a + b, Virial([3.0, 1.0, 2.0, 1.0, 4.0, 1.0]));
        assert_eq!(b * 0.5, Virial([1.0, 0.0, 0.5, 0.0, 1.5, 0.0]));
    }
}
