use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "LEED++ Developers",
    version,
    about = "LEED++ CLI - Dynamical low-energy electron diffraction: compute intensity-versus-energy curves of surface structures.",
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

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute IV curves for the structure described in an input file.
    Run(RunArgs),
    /// Print the output beam list of an input file without computing intensities.
    Beams(BeamsArgs),
    /// Compare computed IV curves with measured ones (R-factor).
    Rfactor(RfactorArgs),
    /// Check an input file and its phase shifts without computing anything.
    Validate(ValidateArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the input file (structure and parameters) in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output IV-curve table (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Directory searched for phase-shift files.
    /// Defaults to the directory of the input file.
    #[arg(long, value_name = "DIR")]
    pub phase_dir: Option<PathBuf>,

    /// Force single scattering (kinematic approximation).
    #[arg(long)]
    pub single_scattering: bool,

    /// Skip energies that fail instead of aborting the run.
    #[arg(long)]
    pub skip_failures: bool,

    /// Set a specific configuration value, overriding the input file.
    /// Can be used multiple times. Example: -S parameters.l-max=10
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `beams` subcommand.
#[derive(Args, Debug)]
pub struct BeamsArgs {
    /// Path to the input file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Write the beam list to this CSV file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Directory searched for phase-shift files.
    #[arg(long, value_name = "DIR")]
    pub phase_dir: Option<PathBuf>,

    /// Set a specific configuration value, overriding the input file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `rfactor` subcommand.
#[derive(Args, Debug)]
pub struct RfactorArgs {
    /// Computed IV curves (CSV written by `leed run`).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub theory: PathBuf,

    /// Measured IV curves in the same CSV layout.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub experiment: PathBuf,

    /// Half-width of the Lorentzian smoothing in eV (the imaginary optical potential).
    #[arg(long, default_value_t = 4.0, value_name = "EV")]
    pub width: f64,

    /// Smallest rigid energy shift of the computed curves, in eV.
    #[arg(long, default_value_t = 0.0, value_name = "EV", allow_negative_numbers = true)]
    pub shift_min: f64,

    /// Largest rigid energy shift of the computed curves, in eV.
    #[arg(long, default_value_t = 0.0, value_name = "EV", allow_negative_numbers = true)]
    pub shift_max: f64,

    /// Step between shifts, in eV.
    #[arg(long, default_value_t = 0.5, value_name = "EV")]
    pub shift_step: f64,

    /// Compare raw intensities instead of curves scaled to unit mean.
    #[arg(long)]
    pub no_normalize: bool,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the input file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory searched for phase-shift files.
    #[arg(long, value_name = "DIR")]
    pub phase_dir: Option<PathBuf>,
}
