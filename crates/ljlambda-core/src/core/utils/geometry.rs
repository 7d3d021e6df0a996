use nalgebra::{Point3, Vector3};

/// Floor of the sine of each bond angle.
pub const SMALL: f64 = 0.001;
/// Floor of the magnitude of `sin(phi)`.
pub const SMALLER: f64 = 0.00001;
/// How far the combined cosine may stray outside `[-1, 1]` before it is reported.
pub const TOLERANCE: f64 = 0.05;

/// Bond vectors and angular quantities of one quadruplet.
///
/// `vb1 = x1 - x2`, `vb2 = x3 - x2` and `vb3 = x4 - x3`. `cosine` is the unclamped
/// combined cosine of the dihedral angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionGeometry {
    pub vb1: Vector3<f64>,
    pub vb2: Vector3<f64>,
    pub vb3: Vector3<f64>,
    sb1: f64,
    sb2: f64,
    sb3: f64,
    rb1: f64,
    rb3: f64,
    c0: f64,
    r12c1: f64,
    r12c2: f64,
    c1mag: f64,
    c2mag: f64,
    sc1: f64,
    sc2: f64,
    pub cosine: f64,
    signed_volume: f64,
}

/// Forces on the four atoms of a quadruplet.
pub type QuadrupletForces = [Vector3<f64>; 4];

impl TorsionGeometry {
    pub fn new(
        x1: &Point3<f64>,
        x2: &Point3<f64>,
        x3: &Point3<f64>,
        x4: &Point3<f64>,
    ) -> Self {
        let vb1 = x1 - x2;
        let vb2 = x3 - x2;
        let vb2m = -vb2;
        let vb3 = x4 - x3;

        let sb1 = 1.0 / vb1.norm_squared();
        let sb2 = 1.0 / vb2.norm_squared();
        let sb3 = 1.0 / vb3.norm_squared();

        let rb1 = sb1.sqrt();
        let rb3 = sb3.sqrt();

        let c0 = vb1.dot(&vb3) * rb1 * rb3;

        let b1mag = vb1.norm();
        let b2mag = vb2.norm();
        let b3mag = vb3.norm();

        let r12c1 = 1.0 / (b1mag * b2mag);
        let c1mag = vb1.dot(&vb2) * r12c1;

        let r12c2 = 1.0 / (b2mag * b3mag);
        let c2mag = vb2m.dot(&vb3) * r12c2;

        let sc1 = 1.0 / floored_sine(c1mag);
        let sc2 = 1.0 / floored_sine(c2mag);

        let cosine = (c0 + c1mag * c2mag) * sc1 * sc2;

        let normal = vb1.cross(&vb2);
        let signed_volume = normal.dot(&vb3) / normal.norm() / b3mag;

        Self {
            vb1,
            vb2,
            vb3,
            sb1,
            sb2,
            sb3,
            rb1,
            rb3,
            c0,
            r12c1,
            r12c2,
            c1mag,
            c2mag,
            sc1,
            sc2,
            cosine,
            signed_volume,
        }
    }

    /// Whether the combined cosine lies outside the tolerated band. A cosine that is not
    /// a number counts as outside.
    pub fn is_out_of_band(&self) -> bool {
        !(self.cosine.abs() <= 1.0 + TOLERANCE)
    }

    pub fn clamped_cosine(&self) -> f64 {
        self.cosine.clamp(-1.0, 1.0)
    }

    /// Signed dihedral angle in `[-pi, pi]`, negative when `(vb1 x vb2) . vb3 > 0`.
    pub fn phi(&self) -> f64 {
        let phi = self.clamped_cosine().acos();
        if self.signed_volume > 0.0 { -phi } else { phi }
    }

    /// Projects `de_dc`, the derivative of the energy with respect to the clamped cosine,
    /// onto the four atoms. The forces sum to zero by construction.
    pub fn project(&self, de_dc: f64) -> QuadrupletForces {
        let s1 = self.sc1 * self.sc1;
        let s2 = self.sc2 * self.sc2;
        let c = self.clamped_cosine() * de_dc;
        let s12 = self.sc1 * self.sc2 * de_dc;

        let a11 = c * self.sb1 * s1;
        let a22 = -self.sb2 * (2.0 * self.c0 * s12 - c * (s1 + s2));
        let a33 = c * self.sb3 * s2;
        let a12 = -self.r12c1 * (self.c1mag * c * s1 + self.c2mag * s12);
        let a13 = -self.rb1 * self.rb3 * s12;
        let a23 = self.r12c2 * (self.c2mag * c * s2 + self.c1mag * s12);

        let (vb1, vb2, vb3) = (&self.vb1, &self.vb2, &self.vb3);
        let s = vb1 * a12 + vb2 * a22 + vb3 * a23;

        let f1 = vb1 * a11 + vb2 * a12 + vb3 * a13;
        let f2 = -s - f1;
        let f4 = vb1 * a13 + vb2 * a23 + vb3 * a33;
        let f3 = s - f4;

        [f1, f2, f3, f4]
    }
}

/// `sin` of an angle from its cosine, floored at [`SMALL`].
#[inline]
fn floored_sine(cosine: f64) -> f64 {
    (1.0 - cosine * cosine).max(0.0).sqrt().max(SMALL)
}

/// `sin(phi)` with its magnitude floored at [`SMALLER`].
#[inline]
pub fn floored_sin_phi(phi: f64) -> f64 {
    let si = phi.sin();
    if si.abs() < SMALLER { SMALLER } else { si }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const TOLERANCE_TEST: f64 = 1e-12;

    fn quadruplet(x4: [f64; 3]) -> TorsionGeometry {
        TorsionGeometry::new(
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(x4[0], x4[1], x4[2]),
        )
    }

    #[test]
    fn planar_cis_quadruplet_has_zero_phi() {
        let geometry = quadruplet([1.0, 1.0, 0.0]);
        assert!((geometry.cosine - 1.0).abs() < TOLERANCE_TEST);
        assert!(geometry.phi().abs() < 1e-6);
    }

    #[test]
    fn planar_trans_quadruplet_has_phi_of_pi() {
        let geometry = quadruplet([1.0, -1.0, 0.0]);
        assert!((geometry.phi() - PI).abs() < 1e-6);
    }

    #[test]
    fn out_of_plane_quadruplets_have_opposite_signed_phi() {
        let up = quadruplet([1.0, 0.0, 1.0]);
        let down = quadruplet([1.0, 0.0, -1.0]);

        assert!((up.phi().abs() - PI / 2.0).abs() < 1e-9);
        assert!((up.phi() + down.phi()).abs() < 1e-12);
        // (vb1 x vb2) points along -z, so the atom above the plane gives a positive angle.
        assert!(up.phi() > 0.0);
    }

    #[test]
    fn bond_angle_sine_is_floored_for_collinear_bonds() {
        assert_eq!(floored_sine(1.0), SMALL);
        assert_eq!(floored_sine(-1.0), SMALL);
        assert!((floored_sine(0.0) - 1.0).abs() < TOLERANCE_TEST);
    }

    #[test]
    fn sin_phi_is_floored_to_positive_small_value() {
        assert_eq!(floored_sin_phi(0.0), SMALLER);
        assert_eq!(floored_sin_phi(-1e-9), SMALLER);
        assert_eq!(floored_sin_phi(PI), SMALLER);
        assert!((floored_sin_phi(PI / 2.0) - 1.0).abs() < TOLERANCE_TEST);
    }

    #[test]
    fn cosine_band_check_tolerates_small_overshoot() {
        let mut geometry = quadruplet([1.0, 1.0, 0.0]);

        geometry.cosine = 1.00001;
        assert!(!geometry.is_out_of_band());
        assert_eq!(geometry.clamped_cosine(), 1.0);
        assert_eq!(geometry.phi(), 0.0);

        geometry.cosine = -1.2;
        assert!(geometry.is_out_of_band());
        assert_eq!(geometry.clamped_cosine(), -1.0);

        geometry.cosine = f64::NAN;
        assert!(geometry.is_out_of_band());
    }

    #[test]
    fn projected_forces_sum_to_zero() {
        let geometry = TorsionGeometry::new(
            &Point3::new(0.3, 1.4, -0.2),
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(1.5, 0.1, 0.0),
            &Point3::new(2.1, 0.8, 1.1),
        );
        let forces = geometry.project(0.73);
        let net: Vector3<f64> = forces.iter().sum();
        assert!(net.norm() < 1e-12);
    }
}
