use crate::cli::{CoeffsArgs, CoeffsCommands, CoeffsSource, InputFormat, OutputFormat};
use crate::error::{CliError, Result};
use ljlambda::engine::config::EvaluationConfigBuilder;
use ljlambda::engine::evaluator::DihedralStyle;
use ljlambda::workflows::WorkflowError;
use ljlambda::workflows::coefficients::{self, CoefficientFormat, CoefficientSource};
use tracing::info;

pub fn run(args: CoeffsArgs) -> Result<()> {
    match args.command {
        CoeffsCommands::Convert {
            source,
            output,
            format,
        } => {
            let style = load(&source)?;
            let format = match format {
                OutputFormat::Restart => CoefficientFormat::Restart,
                OutputFormat::Data => CoefficientFormat::Data,
            };
            coefficients::export(&style, format, &output)?;
            println!("Coefficients written to {}", output.display());
        }
        CoeffsCommands::Show { source } => {
            let style = load(&source)?;
            let mut stdout = std::io::stdout().lock();
            style
                .write_data(&mut stdout)
                .map_err(WorkflowError::from)?;
        }
    }
    Ok(())
}

fn load(source: &CoeffsSource) -> Result<DihedralStyle> {
    let n_types = || {
        source.n_types.ok_or_else(|| {
            CliError::Config(format!(
                "--n-types is required when reading {:?} input.",
                source.input_format
            ))
        })
    };
    let source = match source.input_format {
        InputFormat::Config => CoefficientSource::Config(source.input.clone()),
        InputFormat::Restart => CoefficientSource::Restart {
            path: source.input.clone(),
            n_types: n_types()?,
        },
        InputFormat::Data => CoefficientSource::Data {
            path: source.input.clone(),
            n_types: n_types()?,
        },
    };

    // Ownership mode has no effect on conversion.
    let config = EvaluationConfigBuilder::new()
        .newton_bond(true)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;
    info!("Loading coefficients from {:?}", source);
    Ok(coefficients::load_style(&source, config)?)
}
