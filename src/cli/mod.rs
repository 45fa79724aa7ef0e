//! Command-line parsing for the normal-equations regression tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the accumulation/solver code. Regression knobs can also be
//! set through `OLS_*` environment variables (or a `.env` file).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{BadRecordPolicy, DEFAULT_REGULARIZATION, OutputFormat};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "ols",
    version,
    about = "Least-squares regression over streamed records via Cholesky-solved normal equations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Accumulate, merge and solve in one process.
    Fit(FitArgs),
    /// Accumulate inputs into a partial-statistic JSON file (map stage).
    Accumulate(AccumulateArgs),
    /// Merge partial-statistic JSON files and solve (reduce stage).
    Solve(SolveArgs),
    /// Write a synthetic linear dataset as CSV.
    Sample(SampleArgs),
}

/// Shape of the regression problem.
#[derive(Debug, Args, Clone)]
pub struct ShapeArgs {
    /// Number of explanatory features per record (excluding bias).
    #[arg(short = 'd', long, env = "OLS_DIMENSION", default_value_t = 8)]
    pub dimension: usize,

    /// Do not append a constant bias feature.
    #[arg(long, env = "OLS_NO_BIAS")]
    pub no_bias: bool,
}

/// Where records come from and how they are spread over partitions.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Input CSV files (`label,feature_1,...`, no header). Use `-` for stdin.
    #[arg(required = true, value_name = "CSV")]
    pub inputs: Vec<PathBuf>,

    /// Number of independent accumulators.
    #[arg(short = 'p', long, env = "OLS_PARTITIONS", default_value_t = 1)]
    pub partitions: usize,

    /// Records read per batch.
    #[arg(long, env = "OLS_BATCH_SIZE", default_value_t = 8192)]
    pub batch_size: usize,

    /// What to do with a malformed record.
    #[arg(long, value_enum, default_value_t = BadRecordPolicy::Abort)]
    pub on_bad_record: BadRecordPolicy,
}

/// Solver and output options shared by `fit` and `solve`.
#[derive(Debug, Args, Clone)]
pub struct SolveOptions {
    /// Constant added to the diagonal of XᵗX before factoring.
    #[arg(long, env = "OLS_REGULARIZATION", default_value_t = DEFAULT_REGULARIZATION)]
    pub regularization: f64,

    /// Terminal output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Export coefficients (with names and run metadata) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub shape: ShapeArgs,

    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub solve: SolveOptions,
}

#[derive(Debug, Args, Clone)]
pub struct AccumulateArgs {
    #[command(flatten)]
    pub shape: ShapeArgs,

    #[command(flatten)]
    pub input: InputArgs,

    /// Partial-statistic JSON file to write.
    #[arg(short = 'o', long, value_name = "JSON")]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct SolveArgs {
    /// Partial-statistic JSON files produced by `ols accumulate`.
    #[arg(required = true, value_name = "JSON")]
    pub partials: Vec<PathBuf>,

    #[command(flatten)]
    pub solve: SolveOptions,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Number of rows to generate.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub rows: usize,

    /// True feature coefficients, comma-separated (e.g. `3,-1`).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub weights: Vec<f64>,

    /// True intercept.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub intercept: f64,

    /// Standard deviation of Gaussian label noise.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Features are drawn uniformly from [-scale, scale).
    #[arg(long, default_value_t = 10.0)]
    pub scale: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV (stdout when omitted).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}
