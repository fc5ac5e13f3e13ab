use clap::{Args, Parser, Subcommand, ValueEnum};
use qcpipe::engine::registry::CalculationMethod;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "qcpipe CLI - Run electronic-structure calculations (single-point energy, geometry optimization, vibrational frequencies) on molecular structure files and export volumetric orbital/density grids.",
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
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a calculation on a molecular structure file.
    Run(RunArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    /// Single-point SCF energy plus electronic properties.
    Energy,
    /// Geometry relaxation with streamed per-iteration progress.
    Optimize,
    /// Harmonic vibrational frequencies and normal modes.
    Frequency,
}

impl From<MethodArg> for CalculationMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Energy => CalculationMethod::Energy,
            MethodArg::Optimize => CalculationMethod::Optimize,
            MethodArg::Frequency => CalculationMethod::Frequency,
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    // --- Core Arguments ---
    /// Path to the input structure file (.xyz, or .sdf/.mol with connectivity).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Calculation method to run.
    #[arg(short, long, value_enum, default_value = "energy")]
    pub method: MethodArg,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path for the JSON result; defaults to stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    // --- Solver Overrides ---
    /// Override the exchange-correlation functional from the config file.
    #[arg(long, value_name = "NAME")]
    pub functional: Option<String>,

    /// Override the basis set from the config file.
    #[arg(long, value_name = "NAME")]
    pub basis: Option<String>,

    /// Override the net molecular charge.
    #[arg(long, value_name = "INT")]
    pub charge: Option<i32>,

    /// Override the spin multiplicity (number of unpaired electrons).
    #[arg(long, value_name = "INT")]
    pub spin: Option<u32>,

    // --- Optimization Overrides ---
    /// Override the maximum number of optimizer iterations.
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Override the gradient-norm convergence threshold (Hartree/Bohr).
    #[arg(long, value_name = "FLOAT")]
    pub grad_tolerance: Option<f64>,

    // --- Volumetric Export ---
    /// Export one molecular orbital (zero-based index) after the run.
    #[arg(long, value_name = "INT", conflicts_with = "density", requires = "grid_output")]
    pub orbital: Option<usize>,

    /// Export the total electron density after the run.
    #[arg(long, requires = "grid_output")]
    pub density: bool,

    /// Path for the exported volumetric grid JSON.
    #[arg(long, value_name = "PATH")]
    pub grid_output: Option<PathBuf>,

    /// Override the grid resolution (points per axis).
    #[arg(long, value_name = "INT")]
    pub grid_resolution: Option<usize>,
}
