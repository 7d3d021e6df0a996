use super::WorkflowError;
use crate::core::forcefield::params::CoefficientTable;
use crate::core::io::restart::SingleProcess;
use crate::engine::config::EvaluationConfig;
use crate::engine::evaluator::DihedralStyle;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Where a coefficient table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoefficientSource {
    /// TOML configuration; it declares its own number of types.
    Config(PathBuf),
    /// Binary restart blocks for `n_types` types.
    Restart { path: PathBuf, n_types: usize },
    /// Text data section for `n_types` types.
    Data { path: PathBuf, n_types: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientFormat {
    Restart,
    Data,
}

/// Builds a dihedral style whose coefficients come from `source`.
#[instrument(skip_all, name = "load_coefficients")]
pub fn load_style(
    source: &CoefficientSource,
    config: EvaluationConfig,
) -> Result<DihedralStyle, WorkflowError> {
    let style = match source {
        CoefficientSource::Config(path) => {
            let table = CoefficientTable::load(path)?;
            let mut style = DihedralStyle::new(table.n_types(), config);
            style.install_coefficients(table)?;
            style
        }
        CoefficientSource::Restart { path, n_types } => {
            let mut style = DihedralStyle::new(*n_types, config);
            let mut reader = BufReader::new(open(path)?);
            style.read_restart(&mut reader, &SingleProcess)?;
            style
        }
        CoefficientSource::Data { path, n_types } => {
            let mut style = DihedralStyle::new(*n_types, config);
            let applied = style.read_data(BufReader::new(open(path)?))?;
            info!("Applied {} coefficient line(s) from data section.", applied);
            style
        }
    };

    info!(
        n_types = style.n_types(),
        "Loaded dihedral coefficients from {:?}.", source
    );
    Ok(style)
}

/// Writes the coefficients of `style` to `path` in the given format.
#[instrument(skip_all, name = "export_coefficients")]
pub fn export(
    style: &DihedralStyle,
    format: CoefficientFormat,
    path: &Path,
) -> Result<(), WorkflowError> {
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);
    match format {
        CoefficientFormat::Restart => style.write_restart(&mut writer)?,
        CoefficientFormat::Data => style.write_data(&mut writer)?,
    }
    info!("Wrote {:?} coefficients to '{}'.", format, path.display());
    Ok(())
}

fn open(path: &Path) -> Result<File, WorkflowError> {
    File::open(path).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> WorkflowError {
    WorkflowError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}
