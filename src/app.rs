//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the accumulate / merge / solve pipeline
//! - prints reports and writes optional exports

use std::fs::File;
use std::io::BufWriter;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{AccumulateArgs, Command, FitArgs, InputArgs, SampleArgs, ShapeArgs, SolveArgs, SolveOptions};
use crate::data::sample::{SampleConfig, write_sample_csv};
use crate::domain::{FitConfig, OutputFormat, RegressionConfig};
use crate::error::AppError;
use crate::io::export::write_coefficients_json;
use crate::io::partial::write_partial_json;

pub mod pipeline;

/// Entry point for the `ols` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Accumulate(args) => handle_accumulate(args),
        Command::Solve(args) => handle_solve(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// Log to stderr so `--format json` output on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.shape, &args.input, Some(&args.solve))?;
    let run = pipeline::run_fit(&config)?;
    emit_run(&run, config.format, config.export.as_deref())
}

fn handle_accumulate(args: AccumulateArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.shape, &args.input, None)?;
    let sources = pipeline::open_sources(&config.inputs)?;
    let (stat, summary) = pipeline::run_accumulate(&config, sources)?;
    write_partial_json(&args.output, &config.regression, &stat)?;

    println!(
        "Wrote partial statistic to {} (observations={}, skipped={})",
        args.output.display(),
        stat.observation_count(),
        summary.row_errors.len()
    );
    Ok(())
}

fn handle_solve(args: SolveArgs) -> Result<(), AppError> {
    let run = pipeline::run_solve(&args.partials, args.solve.regularization)?;
    emit_run(&run, args.solve.format, args.solve.export.as_deref())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        rows: args.rows,
        weights: args.weights,
        intercept: args.intercept,
        noise: args.noise,
        feature_scale: args.scale,
        seed: args.seed,
    };

    match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::new(2, format!("Failed to create sample CSV '{}': {e}", path.display()))
            })?;
            write_sample_csv(&config, BufWriter::new(file))
        }
        None => write_sample_csv(&config, std::io::stdout().lock()),
    }
}

fn emit_run(
    run: &pipeline::RunOutput,
    format: OutputFormat,
    export: Option<&std::path::Path>,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Text => println!("{}", crate::report::format_run_summary(run)),
        OutputFormat::Json => println!("{}", crate::report::format_coefficients_json(&run.coefficients)?),
    }

    if let Some(path) = export {
        write_coefficients_json(path, run)?;
    }

    Ok(())
}

/// Build the run config. `solve` is `None` for the accumulate-only driver.
pub fn fit_config_from_args(
    shape: &ShapeArgs,
    input: &InputArgs,
    solve: Option<&SolveOptions>,
) -> Result<FitConfig, AppError> {
    let mut regression = RegressionConfig::new(shape.dimension, !shape.no_bias);
    if let Some(solve) = solve {
        regression = regression.with_regularization(solve.regularization);
    }
    regression.validate()?;

    Ok(FitConfig {
        inputs: input.inputs.clone(),
        regression,
        partitions: input.partitions,
        batch_size: input.batch_size,
        bad_record: input.on_bad_record,
        format: solve.map(|s| s.format).unwrap_or_default(),
        export: solve.and_then(|s| s.export.clone()),
    })
}
