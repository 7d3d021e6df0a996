use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    name = "ljlambda",
    version,
    about = "ljlambda - Evaluate Gaussian torsions with switched 1-4 Lennard-Jones interactions over a dihedral list.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel evaluation.
    /// Only honoured when built with the `parallel` feature.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate forces, energies and virial for one set of particles and dihedrals.
    Eval(EvalArgs),
    /// Convert or print dihedral coefficient tables.
    Coeffs(CoeffsArgs),
}

/// Arguments for the `eval` subcommand.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Path to a run configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Inputs ---
    #[command(flatten)]
    pub coefficients: CoefficientInput,

    /// Number of dihedral types stored in a restart or data file.
    #[arg(long, value_name = "INT")]
    pub n_types: Option<usize>,

    /// Particle CSV with columns `tag,x,y,z`.
    #[arg(short, long, value_name = "PATH")]
    pub particles: Option<PathBuf>,

    /// Dihedral CSV with columns `atom1,atom2,atom3,atom4,type`, atoms given by tag.
    #[arg(short, long, value_name = "PATH")]
    pub dihedrals: Option<PathBuf>,

    /// Write accumulated forces as CSV with columns `tag,fx,fy,fz`.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub forces_output: Option<PathBuf>,

    // --- Evaluation Overrides ---
    #[command(flatten)]
    pub newton_bond: NewtonBond,

    /// Number of owned particles; the rest are ghosts.
    #[arg(long, value_name = "INT")]
    pub nlocal: Option<usize>,

    /// Timestep reported with degenerate-geometry warnings.
    #[arg(long, value_name = "INT")]
    pub timestep: Option<u64>,

    /// Do not accumulate energies.
    #[arg(long)]
    pub no_energy: bool,

    /// Do not accumulate the virial.
    #[arg(long)]
    pub no_virial: bool,

    /// Also accumulate per-particle energies.
    #[arg(long)]
    pub per_atom_energy: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S evaluation.timestep=100
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Where coefficients come from. At most one may be given on the command line.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
pub struct CoefficientInput {
    /// Coefficient configuration in TOML format.
    #[arg(long, value_name = "PATH")]
    pub coefficients: Option<PathBuf>,
    /// Binary restart holding the coefficients.
    #[arg(long, value_name = "PATH")]
    pub restart: Option<PathBuf>,
    /// Text data section holding the coefficients.
    #[arg(long, value_name = "PATH")]
    pub data: Option<PathBuf>,
}

/// Mutually exclusive flags for Newton's third law across processes.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct NewtonBond {
    /// Accumulate forces into every particle of a dihedral, ghosts included.
    #[arg(long)]
    pub newton_bond: bool,
    /// Accumulate forces into owned particles only.
    #[arg(long)]
    pub no_newton_bond: bool,
}

/// Arguments for the `coeffs` subcommand.
#[derive(Args, Debug)]
pub struct CoeffsArgs {
    #[command(subcommand)]
    pub command: CoeffsCommands,
}

#[derive(Subcommand, Debug)]
pub enum CoeffsCommands {
    /// Convert a coefficient table between formats.
    Convert {
        #[command(flatten)]
        source: CoeffsSource,
        /// Output file.
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
        /// Output format.
        #[arg(short, long, value_enum)]
        format: OutputFormat,
    },
    /// Print a coefficient table as a data section.
    Show {
        #[command(flatten)]
        source: CoeffsSource,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CoeffsSource {
    /// Input file.
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,
    /// Input format.
    #[arg(long = "from", value_enum, default_value_t = InputFormat::Config)]
    pub input_format: InputFormat,
    /// Number of dihedral types, required for restart and data input.
    #[arg(long, value_name = "INT")]
    pub n_types: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Config,
    Restart,
    Data,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Restart,
    Data,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        let command = Cli::command();
        assert_eq!(command.get_name(), "ljlambda");
        command.debug_assert();
    }

    #[test]
    fn convert_output_format_is_independent_of_input_format() {
        let cli = Cli::try_parse_from([
            "ljlambda", "coeffs", "convert", "-i", "c.toml", "-o", "c.data", "-f", "data",
        ])
        .unwrap();
        let Commands::Coeffs(CoeffsArgs {
            command:
                CoeffsCommands::Convert {
                    source, format, ..
                },
        }) = cli.command
        else {
            panic!("Expected 'coeffs convert' subcommand");
        };
        assert_eq!(source.input_format, InputFormat::Config);
        assert_eq!(format, OutputFormat::Data);
    }

    #[test]
    fn eval_accepts_overrides_and_global_flags() {
        let cli = Cli::parse_from([
            "ljlambda",
            "-vv",
            "eval",
            "--restart",
            "coeffs.restart",
            "--n-types",
            "3",
            "--no-newton-bond",
            "--nlocal",
            "12",
            "--no-virial",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Eval(args) = cli.command else {
            panic!("Expected 'eval' subcommand");
        };
        assert_eq!(args.coefficients.restart, Some(PathBuf::from("coeffs.restart")));
        assert_eq!(args.n_types, Some(3));
        assert!(args.newton_bond.no_newton_bond);
        assert_eq!(args.nlocal, Some(12));
        assert!(args.no_virial);
        assert!(!args.no_energy);
    }

    #[test]
    fn coefficient_sources_are_mutually_exclusive() {
        let result = Cli::try_parse_from([
            "ljlambda",
            "eval",
            "--coefficients",
            "a.toml",
            "--data",
            "b.data",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn coeffs_convert_parses_formats() {
        let cli = Cli::parse_from([
            "ljlambda", "coeffs", "convert", "-i", "in.data", "--from", "data", "--n-types", "2",
            "-o", "out.restart", "-f", "restart",
        ]);
        let Commands::Coeffs(CoeffsArgs {
            command:
                CoeffsCommands::Convert {
                    source,
                    output,
                    format,
                },
        }) = cli.command
        else {
            panic!("Expected 'coeffs convert' subcommand");
        };
        assert_eq!(source.input_format, InputFormat::Data);
        assert_eq!(source.n_types, Some(2));
        assert_eq!(output, PathBuf::from("out.restart"));
        assert_eq!(format, OutputFormat::Restart);
    }
}
