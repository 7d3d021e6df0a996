use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoefficientError {
    #[error("Invalid dihedral type range '{range}' for {n_types} dihedral types")]
    InvalidTypeRange { range: String, n_types: usize },
    #[error("Incorrect args for dihedral coefficients: expected 4 or 5, found {0}")]
    IncorrectArgCount(usize),
    #[error("Dihedral type range {lo}*{hi} matched no types")]
    NoTypesMatched { lo: usize, hi: usize },
    #[error("Invalid numeric value '{value}' for dihedral coefficient '{name}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// An inclusive range of 1-based dihedral types.
///
/// Accepts the usual wildcard grammar: `*` (every type), `n`, `*n` (1 to n),
/// `n*` (n to the last type) and `m*n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRange {
    lo: usize,
    hi: usize,
}

impl TypeRange {
    pub fn new(lo: usize, hi: usize) -> Self {
        Self { lo, hi }
    }

    pub fn single(dihedral_type: usize) -> Self {
        Self::new(dihedral_type, dihedral_type)
    }

    pub fn all(n_types: usize) -> Self {
        Self::new(1, n_types)
    }

    pub fn parse(spec: &str, n_types: usize) -> Result<Self, CoefficientError> {
        let invalid = || CoefficientError::InvalidTypeRange {
            range: spec.to_string(),
            n_types,
        };
        let parse_index = |s: &str| s.parse::<usize>().map_err(|_| invalid());

        let spec_trimmed = spec.trim();
        let range = match spec_trimmed.split_once('*') {
            None => {
                let index = parse_index(spec_trimmed)?;
                Self::single(index)
            }
            Some((lhs, rhs)) => {
                let lo = if lhs.is_empty() { 1 } else { parse_index(lhs)? };
                let hi = if rhs.is_empty() {
                    n_types
                } else {
                    parse_index(rhs)?
                };
                Self::new(lo, hi)
            }
        };

        if range.lo == 0 || range.hi > n_types {
            return Err(invalid());
        }
        Ok(range)
    }

    pub fn lo(&self) -> usize {
        self.lo
    }

    pub fn hi(&self) -> usize {
        self.hi
    }

    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    pub fn iter(&self) -> RangeInclusive<usize> {
        self.lo..=self.hi
    }
}

/// One branch of the switched 1-4 interaction.
///
/// `force12`/`force6` are the prefactors of the `r^-12`/`r^-6` force terms and
/// `energy12`/`energy6` those of the energy terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LjBranch {
    pub force12: f64,
    pub force6: f64,
    pub energy12: f64,
    pub energy6: f64,
}

impl LjBranch {
    #[inline]
    pub fn force(&self, r6inv: f64) -> f64 {
        r6inv * (self.force12 * r6inv - self.force6)
    }

    #[inline]
    pub fn energy(&self, r6inv: f64) -> f64 {
        r6inv * (self.energy12 * r6inv - self.energy6)
    }
}

/// Coefficients of one dihedral type.
///
/// The LJ prefactors are derived from `(epsilon, sigma, lambda)` in [`CoefficientRecord::new`]
/// and cannot be changed independently of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientRecord {
    epsilon: f64,
    sigma: f64,
    lambda: f64,
    epsdihed: f64,
    short_range: LjBranch,
    long_range: LjBranch,
}

impl CoefficientRecord {
    pub fn new(epsilon: f64, sigma: f64, lambda: f64, epsdihed: f64) -> Self {
        let sigma6 = sigma.powi(6);
        let sigma12 = sigma.powi(12);

        let short_range = LjBranch {
            force12: 12.0 * epsilon * sigma12,
            force6: 12.0 * epsilon * sigma6,
            energy12: epsilon * sigma12,
            energy6: 2.0 * epsilon * sigma6,
        };
        let long_range = LjBranch {
            force12: -12.0 * lambda * sigma12,
            force6: -12.0 * lambda * sigma6,
            energy12: -lambda * sigma12,
            energy6: -2.0 * lambda * sigma6,
        };

        Self {
            epsilon,
            sigma,
            lambda,
            epsdihed,
            short_range,
            long_range,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn epsdihed(&self) -> f64 {
        self.epsdihed
    }

    pub fn short_range(&self) -> &LjBranch {
        &self.short_range
    }

    pub fn long_range(&self) -> &LjBranch {
        &self.long_range
    }

    /// Strictly inside `sigma` the short-range branch applies.
    #[inline]
    pub fn is_short_range(&self, rsq: f64) -> bool {
        rsq < self.sigma * self.sigma
    }

    /// Constant energy shift of the short-range branch.
    #[inline]
    pub fn short_range_offset(&self) -> f64 {
        self.epsilon + self.lambda
    }
}

/// Per-type coefficients, indexed by 1-based dihedral type.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    records: Vec<Option<CoefficientRecord>>,
}

impl CoefficientTable {
    pub fn new(n_types: usize) -> Self {
        Self {
            records: vec![None; n_types],
        }
    }

    pub fn n_types(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, dihedral_type: usize) -> Option<&CoefficientRecord> {
        dihedral_type
            .checked_sub(1)
            .and_then(|idx| self.records.get(idx))
            .and_then(Option::as_ref)
    }

    pub fn is_set(&self, dihedral_type: usize) -> bool {
        self.get(dihedral_type).is_some()
    }

    pub fn first_unset(&self) -> Option<usize> {
        self.records
            .iter()
            .position(Option::is_none)
            .map(|idx| idx + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&CoefficientRecord>)> {
        self.records
            .iter()
            .enumerate()
            .map(|(idx, record)| (idx + 1, record.as_ref()))
    }

    /// Assigns the same coefficients to every type in `range` and returns how many
    /// types were written.
    pub fn set_coefficients(
        &mut self,
        range: TypeRange,
        epsilon: f64,
        sigma: f64,
        lambda: f64,
        epsdihed: f64,
    ) -> Result<usize, CoefficientError> {
        if range.lo() == 0 || range.hi() > self.n_types() {
            return Err(CoefficientError::InvalidTypeRange {
                range: format!("{}*{}", range.lo(), range.hi()),
                n_types: self.n_types(),
            });
        }

        if range.is_empty() {
            return Err(CoefficientError::NoTypesMatched {
                lo: range.lo(),
                hi: range.hi(),
            });
        }

        let record = CoefficientRecord::new(epsilon, sigma, lambda, epsdihed);
        let mut count = 0;
        for dihedral_type in range.iter() {
            self.records[dihedral_type - 1] = Some(record);
            count += 1;
        }
        Ok(count)
    }

    /// Argument-vector form: `range epsilon sigma lambda [epsdihed]`.
    pub fn coeff(&mut self, args: &[&str]) -> Result<usize, CoefficientError> {
        if !(4..=5).contains(&args.len()) {
            return Err(CoefficientError::IncorrectArgCount(args.len()));
        }

        let range = TypeRange::parse(args[0], self.n_types())?;
        let epsilon = parse_numeric("epsilon", args[1])?;
        let sigma = parse_numeric("sigma", args[2])?;
        let lambda = parse_numeric("lambda", args[3])?;
        let epsdihed = match args.get(4) {
            Some(value) => parse_numeric("epsdihed", value)?,
            None => 0.0,
        };

        self.set_coefficients(range, epsilon, sigma, lambda, epsdihed)
    }

    /// Rebuilds every type from stored base parameters, marking all of them set.
    pub(crate) fn from_base_parameters(
        epsilon: &[f64],
        sigma: &[f64],
        lambda: &[f64],
        epsdihed: &[f64],
    ) -> Self {
        let records = epsilon
            .iter()
            .zip(sigma)
            .zip(lambda)
            .zip(epsdihed)
            .map(|(((&e, &s), &l), &d)| Some(CoefficientRecord::new(e, s, l, d)))
            .collect();
        Self { records }
    }

    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: CoefficientFile = toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        file.into_table().map_err(|e| ParamLoadError::Coefficient {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}

fn parse_numeric(name: &'static str, value: &str) -> Result<f64, CoefficientError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| CoefficientError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CoefficientEntry {
    pub types: String,
    pub epsilon: f64,
    pub sigma: f64,
    pub lambda: f64,
    #[serde(default)]
    pub epsdihed: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CoefficientFile {
    pub n_dihedral_types: usize,
    #[serde(default)]
    pub coefficients: Vec<CoefficientEntry>,
}

impl CoefficientFile {
    pub fn into_table(self) -> Result<CoefficientTable, CoefficientError> {
        let mut table = CoefficientTable::new(self.n_dihedral_types);
        for entry in self.coefficients {
            let range = TypeRange::parse(&entry.types, self.n_dihedral_types)?;
            table.set_coefficients(
                range,
                entry.epsilon,
                entry.sigma,
                entry.lambda,
                entry.epsdihed,
            )?;
        }
        Ok(table)
    }
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid dihedral coefficients in '{path}': {source}")]
    Coefficient {
        path: String,
        source: CoefficientError,
    },
}
