//! Command-line interface definitions and argument parsing

use crate::config::TrainConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Football transfer price prediction using K-Means clustering
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train on a matrix, write label/centroid files and print the validation hit count
    Train {
        #[command(flatten)]
        training: TrainingArgs,

        /// Run identifier used in the output file names
        #[arg(short, long, default_value = "0")]
        iteration: u64,

        /// Training matrix (whitespace-separated, label last)
        #[arg(short, long)]
        training_data: PathBuf,

        /// Validation matrix (same layout as the training matrix)
        #[arg(long)]
        validation_data: PathBuf,

        /// Directory for the label and centroid files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Repeat training over reshuffled splits and report the best run
    Evaluate {
        #[command(flatten)]
        training: TrainingArgs,

        /// Full labelled matrix to split
        #[arg(short, long)]
        data: PathBuf,

        /// Number of shuffled runs
        #[arg(long, default_value = "100")]
        runs: u64,

        /// Rows held out for validation in each run
        #[arg(long, default_value = "45")]
        validation_size: usize,

        /// Base seed; run `i` shuffles with `seed + i`
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Directory for the best run's label and centroid files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Predict a player's transfer price range from saved model files
    Predict {
        /// Player name, matched exactly against the `name` column
        #[arg(short, long)]
        player: String,

        /// Merged player database (CSV)
        #[arg(short, long, default_value = "merged_players.csv")]
        database: PathBuf,

        #[arg(long, default_value = "centroids31_65.txt")]
        centroids: PathBuf,

        #[arg(long, default_value = "cluster_labels_31_65.txt")]
        labels: PathBuf,

        #[arg(long, default_value = "ranges.txt")]
        ranges: PathBuf,

        /// Directory for the prediction report
        #[arg(long, default_value = ".")]
        report_dir: PathBuf,
    },

    /// Build the encoded matrix and price buckets from the merged player database
    Prepare {
        /// Merged player database (CSV)
        #[arg(short, long, default_value = "merged_players.csv")]
        database: PathBuf,

        /// Output matrix path
        #[arg(short, long, default_value = "merged_players_final.txt")]
        output: PathBuf,

        /// Output range file path
        #[arg(long, default_value = "ranges.txt")]
        ranges: PathBuf,

        /// Number of equal-width price buckets
        #[arg(long, default_value = "60")]
        buckets: usize,
    },
}

/// Training parameters shared by `train` and `evaluate`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TrainingArgs {
    /// Number of clusters for K-Means
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Maximum iterations for K-Means algorithm
    #[arg(long)]
    pub max_iters: Option<usize>,

    /// Tolerance for K-Means convergence (0 requires identical centroids)
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// JSON file with training parameters; flags above take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl TrainingArgs {
    /// Resolve the effective config: defaults, then the config file, then flags.
    pub fn resolve(&self) -> crate::Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)?,
            None => TrainConfig::default(),
        };

        if let Some(k) = self.clusters {
            config.k = k;
        }
        if let Some(max_iters) = self.max_iters {
            config.max_iters = max_iters;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_train_command() {
        let args = Args::try_parse_from([
            "priceforge",
            "train",
            "-k",
            "40",
            "--iteration",
            "3",
            "--training-data",
            "train.txt",
            "--validation-data",
            "valid.txt",
        ])
        .unwrap();

        match args.command {
            Command::Train {
                training,
                iteration,
                training_data,
                ..
            } => {
                assert_eq!(training.clusters, Some(40));
                assert_eq!(iteration, 3);
                assert_eq!(training_data, PathBuf::from("train.txt"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_resolve_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"k": 12, "max_iters": 50}}"#).unwrap();

        let training = TrainingArgs {
            clusters: Some(20),
            max_iters: None,
            tolerance: Some(0.0),
            config: Some(file.path().to_path_buf()),
        };

        let config = training.resolve().unwrap();
        assert_eq!(config, TrainConfig::new(20).with_max_iters(50).with_tolerance(0.0));
    }

    #[test]
    fn test_resolve_defaults() {
        assert_eq!(TrainingArgs::default().resolve().unwrap(), TrainConfig::default());
    }
}
