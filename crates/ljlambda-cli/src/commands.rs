pub mod coeffs;
pub mod eval;
