//! Repeated train/validate runs over reshuffled splits of one matrix

use crate::config::TrainConfig;
use crate::data::{split_dataset, PlayerDataset};
use crate::error::{Error, Result};
use crate::model::{train, KMeansModel};

/// Aggregate of a multi-run evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationSummary {
    /// Correct count per completed run, `(run, count)`.
    pub counts: Vec<(u64, usize)>,
    /// Runs that hit the iteration cap.
    pub failed_runs: Vec<u64>,
    /// Run with the highest count, first on ties.
    pub best_run: u64,
    pub best_count: usize,
    pub mean_count: f64,
    /// Model trained in the best run.
    pub best_model: KMeansModel,
}

/// Train and validate `runs` times, reshuffling with seed `seed + run` each time.
///
/// Runs that do not converge are logged and skipped; if every run fails the
/// last non-convergence error is returned.
pub fn evaluate_runs(
    dataset: &PlayerDataset,
    config: &TrainConfig,
    runs: u64,
    validation_size: usize,
    seed: u64,
) -> Result<EvaluationSummary> {
    if runs == 0 {
        return Err(Error::InvalidParameter {
            name: "runs",
            message: "must be at least 1".to_string(),
        });
    }

    let n_rows = dataset.records().nrows();
    if n_rows.saturating_sub(validation_size) < config.k {
        return Err(Error::InvalidClusterCount {
            requested: config.k,
            n_rows: n_rows.saturating_sub(validation_size),
        });
    }

    let mut counts = Vec::new();
    let mut failed_runs = Vec::new();
    let mut best: Option<(u64, usize, KMeansModel)> = None;
    let mut last_error = None;

    for run in 0..runs {
        let (training, validation) = split_dataset(dataset, validation_size, seed.wrapping_add(run))?;

        let model = match train(&training, config) {
            Ok(model) => model,
            Err(err @ Error::DidNotConverge { .. }) => {
                log::warn!("run {}: {}", run, err);
                failed_runs.push(run);
                last_error = Some(err);
                continue;
            }
            Err(err) => return Err(err),
        };

        let correct = model.validate(&validation)?;
        log::info!("run {}: {} / {} correct", run, correct, validation_size);
        counts.push((run, correct));

        if best.as_ref().map_or(true, |(_, count, _)| correct > *count) {
            best = Some((run, correct, model));
        }
    }

    let (best_run, best_count, best_model) = match best {
        Some(best) => best,
        None => return Err(last_error.unwrap_or(Error::EmptyInput)),
    };

    let mean_count = counts.iter().map(|&(_, c)| c as f64).sum::<f64>() / counts.len() as f64;

    Ok(EvaluationSummary {
        counts,
        failed_runs,
        best_run,
        best_count,
        mean_count,
        best_model,
    })
}
