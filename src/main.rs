//! PriceForge: football transfer price prediction using K-Means clustering
//!
//! This is the main entrypoint that orchestrates matrix preparation, model
//! training, multi-run evaluation and single-player prediction.

use anyhow::{Context, Result};
use clap::Parser;
use priceforge::cli::{Args, Command, TrainingArgs};
use priceforge::data::{self, PlayerDataset};
use priceforge::{evaluate, model, report, FeatureSchema, Predictor};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let schema = FeatureSchema::default();

    match &args.command {
        Command::Train {
            training,
            iteration,
            training_data,
            validation_data,
            output_dir,
        } => run_train(
            &args,
            &schema,
            training,
            *iteration,
            training_data,
            validation_data,
            output_dir,
        ),
        Command::Evaluate {
            training,
            data,
            runs,
            validation_size,
            seed,
            output_dir,
        } => run_evaluate(training, data, *runs, *validation_size, *seed, output_dir),
        Command::Predict {
            player,
            database,
            centroids,
            labels,
            ranges,
            report_dir,
        } => run_predict(&schema, player, database, centroids, labels, ranges, report_dir),
        Command::Prepare {
            database,
            output,
            ranges,
            buckets,
        } => run_prepare(&schema, database, output, ranges, *buckets),
    }
}

fn load_checked(path: &Path, schema: &FeatureSchema, what: &str) -> Result<PlayerDataset> {
    let dataset = data::load_matrix(path)
        .with_context(|| format!("Failed to load {} matrix {}", what, path.display()))?;

    let n_features = dataset.records().ncols();
    if n_features != schema.dim() {
        log::warn!(
            "{} matrix has {} feature columns, schema v{} defines {}",
            what,
            n_features,
            schema.version,
            schema.dim()
        );
    }
    Ok(dataset)
}

/// Train, write artifacts, print the validation hit count
#[allow(clippy::too_many_arguments)]
fn run_train(
    args: &Args,
    schema: &FeatureSchema,
    training: &TrainingArgs,
    iteration: u64,
    training_data: &Path,
    validation_data: &Path,
    output_dir: &Path,
) -> Result<()> {
    let config = training.resolve()?;

    // Fail fast on either matrix before any computation
    data::require_file(training_data)?;
    data::require_file(validation_data)?;

    let training_set = load_checked(training_data, schema, "training")?;
    let validation_set = load_checked(validation_data, schema, "validation")?;

    let start_time = Instant::now();
    let fitted = model::train(&training_set, &config).context("Failed to train K-Means model")?;
    log::debug!("training time: {:.2}s", start_time.elapsed().as_secs_f64());

    let (labels_path, centroids_path) = data::artifact_paths(output_dir, iteration, config.k);
    data::write_labels(&labels_path, &fitted.labels)?;
    data::write_centroids(&centroids_path, &fitted.centroids)?;

    let correct = fitted.validate(&validation_set)?;
    println!("{}", correct);

    if args.verbose {
        report::print_cluster_statistics(
            schema,
            &fitted,
            correct,
            validation_set.records().nrows(),
        );
    }

    Ok(())
}

/// Repeat training over seeded shuffles and keep the best run
fn run_evaluate(
    training: &TrainingArgs,
    data_path: &Path,
    runs: u64,
    validation_size: usize,
    seed: u64,
    output_dir: &Path,
) -> Result<()> {
    let config = training.resolve()?;
    let dataset = data::load_matrix(data_path)
        .with_context(|| format!("Failed to load matrix {}", data_path.display()))?;

    let start_time = Instant::now();
    let summary = evaluate::evaluate_runs(&dataset, &config, runs, validation_size, seed)?;

    let (labels_path, centroids_path) =
        data::artifact_paths(output_dir, summary.best_run, config.k);
    data::write_labels(&labels_path, &summary.best_model.labels)?;
    data::write_centroids(&centroids_path, &summary.best_model.centroids)?;

    println!("{}", summary.best_run);
    println!("{}", summary.best_count);
    println!("{}", summary.mean_count);

    if !summary.failed_runs.is_empty() {
        log::warn!(
            "{} of {} runs did not converge: {:?}",
            summary.failed_runs.len(),
            runs,
            summary.failed_runs
        );
    }
    log::info!(
        "evaluation finished in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Look up a player and predict their price range
fn run_predict(
    schema: &FeatureSchema,
    player: &str,
    database: &Path,
    centroids: &Path,
    labels: &Path,
    ranges: &Path,
    report_dir: &Path,
) -> Result<()> {
    println!("=== Transfer Price Prediction Tool ===\n");

    data::require_file(database)?;
    let predictor = Predictor::from_files(*schema, centroids, labels, ranges)
        .context("Failed to load model files")?;

    let record = data::find_player_row(database, schema, player)?
        .with_context(|| format!("Player '{}' not found in {}", player, database.display()))?;

    let prediction = predictor
        .predict(&record.query())
        .with_context(|| format!("Cannot predict a price for '{}'", player))?;

    log::debug!(
        "closest centroid {} at line {} in {}, label {}",
        prediction.closest_centroid,
        prediction.line_number,
        centroids.display(),
        prediction.label
    );
    println!(
        "The price prediction is... €{}M - €{}M",
        prediction.lower, prediction.upper
    );

    let path = report::save_prediction_report(report_dir, player, &record, &prediction)?;
    println!("\nPrediction saved to '{}'", path.display());

    Ok(())
}

/// Encode the merged database into a matrix with bucketed price labels
fn run_prepare(
    schema: &FeatureSchema,
    database: &Path,
    output: &Path,
    ranges_path: &Path,
    buckets: usize,
) -> Result<()> {
    let (encoded, dropped) = data::prepare_matrix(database, schema)
        .with_context(|| format!("Failed to prepare {}", database.display()))?;
    let (bucketed, ranges) = data::bucket_prices(&encoded, buckets)?;

    data::write_matrix(output, &bucketed)?;
    data::write_ranges(ranges_path, &ranges)?;

    println!(
        "✓ {} rows written to {} ({} incomplete rows dropped)",
        bucketed.records().nrows(),
        output.display(),
        dropped
    );
    println!("✓ {} price buckets written to {}", ranges.len(), ranges_path.display());

    Ok(())
}
