//! Shared regression pipeline used by every CLI driver.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! read batches -> accumulate per partition -> merge -> solve
//!
//! `fit` runs the whole chain in one process; `accumulate` stops after the
//! merge and `solve` starts from merged partials read back from disk.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{BadRecordPolicy, Coefficients, FitConfig, RegressionConfig};
use crate::error::{AppError, RegressionError};
use crate::io::ingest::{RawRecord, RecordSource, RowError};
use crate::io::partial::read_partial_json;
use crate::math::NormalEquationsSolver;
use crate::stats::{StatAccumulator, StatMerger, SufficientStatistic, par_merge};

/// What the record-reading stage saw.
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub inputs: Vec<String>,
    pub rows_read: u64,
    pub rows_used: u64,
    pub row_errors: Vec<RowError>,
    pub partitions: usize,
}

/// All computed outputs of a `fit` or `solve` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub regression: RegressionConfig,
    pub global: SufficientStatistic,
    pub coefficients: Coefficients,
    /// `None` when the run started from partial files.
    pub ingest: Option<IngestSummary>,
    /// Number of partial statistics merged into `global`.
    pub partials: usize,
    pub elapsed: Duration,
}

/// A bad record that stops the run.
struct RecordFailure {
    line: u64,
    error: RegressionError,
}

/// Execute the full pipeline over the configured inputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let sources = open_sources(&config.inputs)?;
    run_fit_with_sources(config, sources)
}

/// Execute the full pipeline over already-open sources.
pub fn run_fit_with_sources(
    config: &FitConfig,
    sources: Vec<RecordSource>,
) -> Result<RunOutput, AppError> {
    let start = Instant::now();

    let (partials, summary) = accumulate_partitions(config, sources)?;
    let partial_count = partials.len();
    let global = par_merge(config.regression.effective_dimension(), &partials)?;
    let coefficients = NormalEquationsSolver::new(&config.regression).solve(&global)?;

    let elapsed = start.elapsed();
    info!(
        observations = global.observation_count(),
        partitions = partial_count,
        elapsed_ms = elapsed.as_millis() as u64,
        "fit finished"
    );

    Ok(RunOutput {
        regression: config.regression,
        global,
        coefficients,
        ingest: Some(summary),
        partials: partial_count,
        elapsed,
    })
}

/// Accumulate and merge without solving (the map side of a split job).
pub fn run_accumulate(
    config: &FitConfig,
    sources: Vec<RecordSource>,
) -> Result<(SufficientStatistic, IngestSummary), AppError> {
    let (partials, summary) = accumulate_partitions(config, sources)?;
    let global = par_merge(config.regression.effective_dimension(), &partials)?;
    Ok((global, summary))
}

/// Merge partial-statistic files and solve (the reduce side of a split job).
///
/// Every file must declare the same dimension and bias.
pub fn run_solve(paths: &[PathBuf], regularization: f64) -> Result<RunOutput, AppError> {
    let start = Instant::now();

    let mut state: Option<(RegressionConfig, StatMerger)> = None;

    for path in paths {
        let file = read_partial_json(path)?;
        let shape = RegressionConfig::new(file.dimension, file.bias).with_regularization(regularization);
        shape.validate()?;

        let (first, merger) =
            state.get_or_insert_with(|| (shape, StatMerger::new(shape.effective_dimension())));
        check_same_shape(first, &shape)
            .and_then(|()| file.into_statistic())
            .and_then(|stat| {
                debug!(path = %path.display(), observations = stat.observation_count(), "merging partial");
                merger.add(&stat)
            })
            .map_err(|e| {
                let app: AppError = e.into();
                AppError::new(app.exit_code(), format!("{}: {app}", path.display()))
            })?;
    }

    let Some((regression, merger)) = state else {
        return Err(AppError::new(2, "No partial statistics given."));
    };

    let partials = merger.partials();
    let global = merger.finish();
    let coefficients = NormalEquationsSolver::new(&regression).solve(&global)?;

    let elapsed = start.elapsed();
    info!(
        observations = global.observation_count(),
        partials,
        elapsed_ms = elapsed.as_millis() as u64,
        "solve finished"
    );

    Ok(RunOutput {
        regression,
        global,
        coefficients,
        ingest: None,
        partials,
        elapsed,
    })
}

pub fn open_sources(paths: &[PathBuf]) -> Result<Vec<RecordSource>, AppError> {
    if paths.is_empty() {
        return Err(AppError::new(2, "No input files given."));
    }
    paths.iter().map(|p| RecordSource::open(p)).collect()
}

fn check_same_shape(first: &RegressionConfig, other: &RegressionConfig) -> Result<(), RegressionError> {
    if first.effective_dimension() != other.effective_dimension() {
        return Err(RegressionError::ShapeMismatch {
            expected: first.effective_dimension(),
            observed: other.effective_dimension(),
        });
    }
    if first.bias != other.bias {
        return Err(RegressionError::InvalidStatistic {
            reason: format!("bias mismatch: expected bias={}, observed bias={}", first.bias, other.bias),
        });
    }
    Ok(())
}

/// Stream every source through `config.partitions` accumulators.
///
/// Each batch is cut into contiguous slices; slice `i` is folded into
/// accumulator `i` on the rayon pool. An accumulator is touched by exactly
/// one worker per batch, so no locking is needed.
fn accumulate_partitions(
    config: &FitConfig,
    sources: Vec<RecordSource>,
) -> Result<(Vec<SufficientStatistic>, IngestSummary), AppError> {
    config.regression.validate()?;
    if config.partitions == 0 {
        return Err(AppError::new(2, "Partition count must be >= 1."));
    }
    if config.batch_size == 0 {
        return Err(AppError::new(2, "Batch size must be >= 1."));
    }

    let mut accumulators: Vec<StatAccumulator> = (0..config.partitions)
        .map(|_| StatAccumulator::new(&config.regression))
        .collect();
    let mut summary = IngestSummary {
        partitions: config.partitions,
        ..IngestSummary::default()
    };

    for mut source in sources {
        let mut batches = 0usize;
        loop {
            let batch = source.next_batch(config.batch_size, config.bad_record)?;
            if batch.is_empty() {
                break;
            }
            batches += 1;
            debug!(source = source.name(), batch = batches, records = batch.len(), "folding batch");

            let skipped = fold_batch(&mut accumulators, &batch, config.bad_record).map_err(|f| {
                let app: AppError = f.error.into();
                AppError::new(app.exit_code(), format!("{}:{}: {app}", source.name(), f.line))
            })?;
            for (line, message) in skipped {
                warn!(source = source.name(), line, error = %message, "skipping bad record");
                summary.row_errors.push(RowError {
                    source: source.name().to_string(),
                    line,
                    message,
                });
            }
        }

        summary.rows_read += source.rows_read();
        summary.row_errors.extend_from_slice(source.row_errors());
        summary.inputs.push(source.name().to_string());
    }

    summary.row_errors.sort_by(|a, b| a.source.cmp(&b.source).then(a.line.cmp(&b.line)));

    let partials: Vec<SufficientStatistic> =
        accumulators.into_iter().map(StatAccumulator::finish).collect();
    for (i, p) in partials.iter().enumerate() {
        debug!(partition = i, observations = p.observation_count(), "partition finished");
    }
    summary.rows_used = partials.iter().map(SufficientStatistic::observation_count).sum();

    Ok((partials, summary))
}

/// Fold one batch across the partitions.
///
/// Returns the `(line, message)` of every skipped record, or the first
/// (lowest line) failure under [`BadRecordPolicy::Abort`].
fn fold_batch(
    accumulators: &mut [StatAccumulator],
    batch: &[RawRecord],
    policy: BadRecordPolicy,
) -> Result<Vec<(u64, String)>, RecordFailure> {
    let chunk_len = batch.len().div_ceil(accumulators.len()).max(1);

    let outcomes: Vec<Result<Vec<(u64, String)>, RecordFailure>> = accumulators
        .par_iter_mut()
        .zip(batch.par_chunks(chunk_len))
        .map(|(acc, chunk)| fold_chunk(acc, chunk, policy))
        .collect();

    let mut skipped = Vec::new();
    let mut failure: Option<RecordFailure> = None;
    for outcome in outcomes {
        match outcome {
            Ok(mut s) => skipped.append(&mut s),
            Err(f) => {
                if failure.as_ref().is_none_or(|cur| f.line < cur.line) {
                    failure = Some(f);
                }
            }
        }
    }

    match failure {
        Some(f) => Err(f),
        None => Ok(skipped),
    }
}

fn fold_chunk(
    acc: &mut StatAccumulator,
    chunk: &[RawRecord],
    policy: BadRecordPolicy,
) -> Result<Vec<(u64, String)>, RecordFailure> {
    let mut skipped = Vec::new();
    for raw in chunk {
        if let Err(error) = acc.push_tokens(raw.fields.iter()) {
            match policy {
                BadRecordPolicy::Abort => {
                    return Err(RecordFailure {
                        line: raw.line,
                        error,
                    });
                }
                BadRecordPolicy::Skip => skipped.push((raw.line, error.to_string())),
            }
        }
    }
    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{SampleConfig, write_sample_csv};
    use crate::domain::OutputFormat;
    use crate::io::partial::write_partial_json;
    use std::io::Cursor;

    fn fit_config(dimension: usize, bias: bool, partitions: usize) -> FitConfig {
        FitConfig {
            inputs: Vec::new(),
            regression: RegressionConfig::new(dimension, bias),
            partitions,
            batch_size: 7,
            bad_record: BadRecordPolicy::Abort,
            format: OutputFormat::Text,
            export: None,
        }
    }

    fn mem_source(text: &str) -> RecordSource {
        RecordSource::from_reader("mem", Cursor::new(text.as_bytes().to_vec()))
    }

    fn plane_csv() -> String {
        let mut out = String::new();
        for x1 in -4..=4 {
            for x2 in 0..6 {
                let y = 2.0 + 3.0 * x1 as f64 - x2 as f64;
                out.push_str(&format!("{y},{x1},{x2}\n"));
            }
        }
        out
    }

    fn noisy_csv(seed: u64) -> String {
        let sample = SampleConfig {
            rows: 240,
            weights: vec![1.5, -0.5, 4.0],
            intercept: -3.0,
            noise: 0.7,
            feature_scale: 10.0,
            seed,
        };
        let mut buf = Vec::new();
        write_sample_csv(&sample, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn fit_recovers_plane_coefficients() {
        let config = fit_config(2, true, 3);
        let run = run_fit_with_sources(&config, vec![mem_source(&plane_csv())]).unwrap();

        for (got, want) in run.coefficients.values().iter().zip([3.0, -1.0, 2.0]) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
        let summary = run.ingest.unwrap();
        assert_eq!(summary.rows_read, 54);
        assert_eq!(summary.rows_used, 54);
        assert_eq!(run.partials, 3);
    }

    #[test]
    fn partition_count_does_not_change_the_global_statistic() {
        let csv = noisy_csv(5);
        let single = run_accumulate(&fit_config(3, true, 1), vec![mem_source(&csv)])
            .unwrap()
            .0;

        for partitions in [2, 5] {
            let (global, _) =
                run_accumulate(&fit_config(3, true, partitions), vec![mem_source(&csv)]).unwrap();
            assert_eq!(global.observation_count(), single.observation_count());
            let scale = single.cross_product_matrix().amax().max(1.0);
            assert!(global.max_abs_diff(&single).unwrap() < 1e-9 * scale);
        }
    }

    #[test]
    fn dimension_mismatch_aborts_with_line_number() {
        let config = fit_config(8, true, 2);
        let err = run_fit_with_sources(&config, vec![mem_source("1,2,3,4\n")]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "mem:1: Expected number of dimensions: 8, observed: 3");
    }

    #[test]
    fn abort_reports_the_first_bad_line() {
        let config = fit_config(1, true, 4);
        let text = "1,1\n2,2\n3,x\n4,4\n5,y\n6,6\n";
        let err = run_fit_with_sources(&config, vec![mem_source(text)]).unwrap_err();
        assert!(err.to_string().starts_with("mem:3:"), "{err}");
    }

    #[test]
    fn skip_policy_drops_bad_records_and_reports_them() {
        let mut config = fit_config(2, true, 2);
        config.bad_record = BadRecordPolicy::Skip;
        let mut text = plane_csv();
        text.push_str("1,2\nfoo,1,2\n");

        let run = run_fit_with_sources(&config, vec![mem_source(&text)]).unwrap();
        let summary = run.ingest.unwrap();
        assert_eq!(summary.rows_read, 56);
        assert_eq!(summary.rows_used, 54);
        assert_eq!(summary.row_errors.len(), 2);
        assert_eq!(summary.row_errors[0].line, 55);
        assert!((run.coefficients.values()[0] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn blank_lines_follow_the_bad_record_policy() {
        let text = "1,1\n\n3,3\n2,2\n";

        let config = fit_config(1, true, 2);
        let err = run_fit_with_sources(&config, vec![mem_source(text)]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().starts_with("mem:2:"), "{err}");

        let mut config = fit_config(1, true, 2);
        config.bad_record = BadRecordPolicy::Skip;
        let run = run_fit_with_sources(&config, vec![mem_source(text)]).unwrap();
        let summary = run.ingest.unwrap();
        assert_eq!(summary.rows_read, 4);
        assert_eq!(summary.rows_used, 3);
        assert_eq!(summary.row_errors.len(), 1);
        assert_eq!(summary.row_errors[0].line, 2);
    }

    #[test]
    fn multiple_sources_feed_the_same_partitions() {
        let config = fit_config(2, true, 2);
        let csv = plane_csv();
        let cut = csv[..csv.len() / 2].rfind('\n').unwrap() + 1;
        let (first, second) = csv.split_at(cut);

        let split = run_fit_with_sources(&config, vec![mem_source(first), mem_source(second)]).unwrap();
        let whole = run_fit_with_sources(&config, vec![mem_source(&csv)]).unwrap();
        assert_eq!(split.global.observation_count(), whole.global.observation_count());
        assert_eq!(split.ingest.unwrap().inputs.len(), 2);
    }

    #[test]
    fn singular_data_is_reported_as_unsolvable() {
        let mut config = fit_config(2, true, 1);
        config.regression = config.regression.with_regularization(1e-20);
        let err = run_fit_with_sources(&config, vec![mem_source("5,1,2\n")]).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn split_job_matches_single_process_fit() {
        let dir = tempfile::tempdir().unwrap();
        let csv = noisy_csv(9);
        let lines: Vec<&str> = csv.lines().collect();
        let (a, b) = lines.split_at(100);
        let config = fit_config(3, true, 2);

        let mut paths = Vec::new();
        for (i, part) in [a, b].iter().enumerate() {
            let text = part.join("\n");
            let (stat, _) = run_accumulate(&config, vec![mem_source(&text)]).unwrap();
            let path = dir.path().join(format!("part{i}.json"));
            write_partial_json(&path, &config.regression, &stat).unwrap();
            paths.push(path);
        }

        let reduced = run_solve(&paths, config.regression.regularization).unwrap();
        let direct = run_fit_with_sources(&config, vec![mem_source(&csv)]).unwrap();

        assert_eq!(reduced.partials, 2);
        assert_eq!(reduced.global.observation_count(), 240);
        for (r, d) in reduced.coefficients.values().iter().zip(direct.coefficients.values()) {
            assert!((r - d).abs() < 1e-8);
        }
    }

    #[test]
    fn solve_rejects_partials_of_different_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let small = RegressionConfig::new(2, true);
        let large = RegressionConfig::new(3, true);
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        write_partial_json(&a, &small, &SufficientStatistic::zeros(3)).unwrap();
        write_partial_json(&b, &large, &SufficientStatistic::zeros(4)).unwrap();

        let err = run_solve(&[a, b], 1e-10).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("expected dimension 3, observed 4"), "{err}");
    }

    #[test]
    fn solve_rejects_partials_that_disagree_on_bias() {
        let dir = tempfile::tempdir().unwrap();
        let with_bias = RegressionConfig::new(2, true);
        let without_bias = RegressionConfig::new(3, false);
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        write_partial_json(&a, &with_bias, &SufficientStatistic::zeros(3)).unwrap();
        write_partial_json(&b, &without_bias, &SufficientStatistic::zeros(3)).unwrap();

        let err = run_solve(&[a, b.clone()], 1e-10).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        let message = err.to_string();
        assert!(message.starts_with(&b.display().to_string()), "{message}");
        assert!(message.contains("bias mismatch"), "{message}");
    }

    #[test]
    fn solve_needs_at_least_one_partial() {
        assert_eq!(run_solve(&[], 1e-10).unwrap_err().exit_code(), 2);
    }
}
