use crate::core::models::system::NewtonOwnership;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Which diagnostics an evaluation produces. Forces are always computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationFlags {
    pub energy: bool,
    pub virial: bool,
    pub per_atom_energy: bool,
}

impl EvaluationFlags {
    pub const NONE: Self = Self {
        energy: false,
        virial: false,
        per_atom_energy: false,
    };

    pub const GLOBAL: Self = Self {
        energy: true,
        virial: true,
        per_atom_energy: false,
    };

    /// Whether the tally sink is invoked at all.
    #[inline]
    pub fn any(&self) -> bool {
        self.energy || self.virial || self.per_atom_energy
    }

    #[inline]
    pub fn any_energy(&self) -> bool {
        self.energy || self.per_atom_energy
    }
}

impl Default for EvaluationFlags {
    fn default() -> Self {
        Self::GLOBAL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub rank: usize,
    pub newton_bond: bool,
    pub flags: EvaluationFlags,
}

impl EvaluationConfig {
    /// Ownership for a process whose owned particles are the first `nlocal` ones.
    pub fn ownership(&self, nlocal: usize) -> NewtonOwnership {
        NewtonOwnership::new(nlocal, self.newton_bond)
    }
}

#[derive(Default)]
pub struct EvaluationConfigBuilder {
    rank: Option<usize>,
    newton_bond: Option<bool>,
    flags: Option<EvaluationFlags>,
}

impl EvaluationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rank(mut self, rank: usize) -> Self {
        self.rank = Some(rank);
        self
    }
    pub fn newton_bond(mut self, enabled: bool) -> Self {
        self.newton_bond = Some(enabled);
        self
    }
    pub fn flags(mut self, flags: EvaluationFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn build(self) -> Result<EvaluationConfig, ConfigError> {
        Ok(EvaluationConfig {
            rank: self.rank.unwrap_or(0),
            newton_bond: self
                .newton_bond
                .ok_or(ConfigError::MissingParameter("newton_bond"))?,
            flags: self.flags.unwrap_or_default(),
        })
    }
}
