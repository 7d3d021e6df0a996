use crate::cli::{CoefficientInput, EvalArgs};
use crate::error::{CliError, Result};
use ljlambda::engine::config::{EvaluationConfigBuilder, EvaluationFlags};
use ljlambda::workflows::coefficients::CoefficientSource;
use ljlambda::workflows::evaluate::EvaluationSetup;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialInputsConfig {
    coefficients: Option<PathBuf>,
    restart: Option<PathBuf>,
    data: Option<PathBuf>,
    n_dihedral_types: Option<usize>,
    particles: Option<PathBuf>,
    dihedrals: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEvaluationConfig {
    newton_bond: Option<bool>,
    nlocal: Option<usize>,
    timestep: Option<u64>,
    rank: Option<usize>,
    energy: Option<bool>,
    virial: Option<bool>,
    per_atom_energy: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputConfig {
    forces: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    inputs: Option<PartialInputsConfig>,
    evaluation: Option<PartialEvaluationConfig>,
    output: Option<PartialOutputConfig>,
}

/// A fully resolved `eval` invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub setup: EvaluationSetup,
    pub forces_output: Option<PathBuf>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, args: &EvalArgs) -> Result<RunConfig> {
        self.apply_set_values(&args.set_values)?;

        let inputs = self.inputs.take().unwrap_or_default();
        let eval = self.evaluation.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();

        let n_types = args.n_types.or(inputs.n_dihedral_types);
        let coefficients = Self::merge_coefficient_source(&args.coefficients, &inputs, n_types)?;

        let particles_path = args
            .particles
            .clone()
            .or(inputs.particles)
            .ok_or_else(|| required("inputs.particles", "--particles"))?;
        let dihedrals_path = args
            .dihedrals
            .clone()
            .or(inputs.dihedrals)
            .ok_or_else(|| required("inputs.dihedrals", "--dihedrals"))?;

        let newton_bond = if args.newton_bond.newton_bond {
            true
        } else if args.newton_bond.no_newton_bond {
            false
        } else {
            eval.newton_bond.unwrap_or(true)
        };

        let flags = EvaluationFlags {
            energy: !args.no_energy && eval.energy.unwrap_or(true),
            virial: !args.no_virial && eval.virial.unwrap_or(true),
            per_atom_energy: args.per_atom_energy || eval.per_atom_energy.unwrap_or(false),
        };

        let config = EvaluationConfigBuilder::new()
            .rank(eval.rank.unwrap_or(0))
            .newton_bond(newton_bond)
            .flags(flags)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(RunConfig {
            setup: EvaluationSetup {
                coefficients,
                particles_path,
                dihedrals_path,
                nlocal: args.nlocal.or(eval.nlocal),
                timestep: args.timestep.or(eval.timestep).unwrap_or(0),
                config,
            },
            forces_output: args.forces_output.clone().or(output.forces),
        })
    }

    fn merge_coefficient_source(
        cli: &CoefficientInput,
        file: &PartialInputsConfig,
        n_types: Option<usize>,
    ) -> Result<CoefficientSource> {
        let has_cli_source =
            cli.coefficients.is_some() || cli.restart.is_some() || cli.data.is_some();
        let (coefficients, restart, data) = if has_cli_source {
            (&cli.coefficients, &cli.restart, &cli.data)
        } else {
            (&file.coefficients, &file.restart, &file.data)
        };

        let n_types = || {
            n_types.ok_or_else(|| {
                required("inputs.n-dihedral-types", "--n-types")
            })
        };

        match (coefficients, restart, data) {
            (Some(path), None, None) => Ok(CoefficientSource::Config(path.clone())),
            (None, Some(path), None) => Ok(CoefficientSource::Restart {
                path: path.clone(),
                n_types: n_types()?,
            }),
            (None, None, Some(path)) => Ok(CoefficientSource::Data {
                path: path.clone(),
                n_types: n_types()?,
            }),
            (None, None, None) => Err(CliError::Config(
                "A coefficient source is required: one of `inputs.coefficients`, `inputs.restart` or `inputs.data`, or the matching CLI argument.".to_string(),
            )),
            _ => Err(CliError::Config(
                "Only one of `inputs.coefficients`, `inputs.restart` and `inputs.data` may be set."
                    .to_string(),
            )),
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            let eval = self.evaluation.get_or_insert_with(Default::default);
            match key {
                "evaluation.newton-bond" => eval.newton_bond = Some(parse_value(key, value_str)?),
                "evaluation.nlocal" => eval.nlocal = Some(parse_value(key, value_str)?),
                "evaluation.timestep" => eval.timestep = Some(parse_value(key, value_str)?),
                "evaluation.rank" => eval.rank = Some(parse_value(key, value_str)?),
                "evaluation.energy" => eval.energy = Some(parse_value(key, value_str)?),
                "evaluation.virial" => eval.virial = Some(parse_value(key, value_str)?),
                "evaluation.per-atom-energy" => {
                    eval.per_atom_energy = Some(parse_value(key, value_str)?)
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value_str: &str) -> Result<T> {
    value_str.trim().parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: {}", key, value_str))
    })
}

fn required(file_key: &str, cli_flag: &str) -> CliError {
    CliError::Config(format!(
        "A value for '{}' is required either in the config file or via {}.",
        file_key, cli_flag
    ))
}
