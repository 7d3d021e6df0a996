use super::params::CoefficientRecord;
use std::f64::consts::PI;

// Widths of the basins.
pub const KA: f64 = 11.4;
pub const KB: f64 = 0.15;
pub const KC: f64 = 1.8;
pub const KD: f64 = 0.65;

// Basin centres, in radians.
pub const FA: f64 = 0.9;
pub const FB: f64 = 1.02;
pub const FC: f64 = -1.55;
pub const FD: f64 = -2.5;

// Basin depths.
pub const EB0: f64 = 0.27;
pub const EC0: f64 = 0.14;
pub const ED0: f64 = 0.26;

/// Energy of the Gaussian torsion and the derivative of `ln(pp)` with respect to phi,
/// which is the negative of the angular force `-dE/dphi`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionEvaluation {
    pub energy: f64,
    pub log_derivative: f64,
}

struct Basin {
    slope: f64,
    exponent: f64,
    order: f64,
}

impl Basin {
    #[inline]
    fn quadratic(k: f64, dphi: f64, offset: f64) -> Self {
        let slope = -k * dphi;
        Self {
            slope,
            exponent: slope * dphi + offset,
            order: 2.0,
        }
    }

    #[inline]
    fn quartic(k: f64, dphi: f64, offset: f64) -> Self {
        let slope = -k * dphi * dphi * dphi;
        Self {
            slope,
            exponent: slope * dphi + offset,
            order: 4.0,
        }
    }
}

/// Evaluates `-ln(sum(exp(e_i)))` over the seven rotational basins at `phi`.
///
/// The `b`, `c` and `d` basins each have a copy shifted by a full turn so that the
/// landscape wraps across `phi = ±pi`. `epsdihed` lowers basin `a` and raises
/// both `c` basins.
#[inline]
pub fn gaussian_torsion(phi: f64, epsdihed: f64) -> TorsionEvaluation {
    let dphia = phi - FA;
    let dphib = phi - FB;
    let dphib2 = dphib + 2.0 * PI;
    let dphic = phi - FC;
    let dphic2 = dphic - 2.0 * PI;
    let dphid = phi - FD;
    let dphid2 = dphid - 2.0 * PI;

    let basins = [
        Basin::quadratic(KA, dphia, -epsdihed),
        Basin::quartic(KB, dphib, EB0),
        Basin::quartic(KB, dphib2, EB0),
        Basin::quadratic(KC, dphic, epsdihed + EC0),
        Basin::quadratic(KC, dphic2, epsdihed + EC0),
        Basin::quartic(KD, dphid, ED0 + EC0),
        Basin::quartic(KD, dphid2, ED0 + EC0),
    ];

    let (pp, ppd) = basins.iter().fold((0.0, 0.0), |(pp, ppd), basin| {
        let weight = basin.exponent.exp();
        (pp + weight, ppd + basin.order * basin.slope * weight)
    });

    TorsionEvaluation {
        energy: -pp.ln(),
        log_derivative: ppd / pp,
    }
}

/// Scalar force over distance (`fpair`) and energy of the switched 1-4 interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEvaluation {
    pub fpair: f64,
    pub energy: f64,
}

#[inline]
pub fn lj_lambda_14(rsq: f64, coeff: &CoefficientRecord) -> PairEvaluation {
    let r2inv = 1.0 / rsq;
    let r6inv = r2inv * r2inv * r2inv;

    let (forcelj, energy) = if coeff.is_short_range(rsq) {
        let branch = coeff.short_range();
        (
            branch.force(r6inv),
            branch.energy(r6inv) + coeff.short_range_offset(),
        )
    } else {
        let branch = coeff.long_range();
        (branch.force(r6inv), branch.energy(r6inv))
    };

    PairEvaluation {
        fpair: forcelj * r2inv,
        energy,
    }
}
