//! Console statistics for trained models and saved prediction reports

use crate::data::PlayerRecord;
use crate::error::Result;
use crate::model::{accuracy, KMeansModel, UNCLASSIFIED};
use crate::predict::Prediction;
use crate::schema::FeatureSchema;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Print cluster statistics to console
pub fn print_cluster_statistics(
    schema: &FeatureSchema,
    model: &KMeansModel,
    correct: usize,
    validation_rows: usize,
) {
    let training_rows: usize = model.cluster_sizes().iter().sum();

    println!("\n=== Cluster Statistics ===");
    println!("Number of clusters: {}", model.n_clusters);
    println!("Training rows: {}", training_rows);
    println!("Iterations to converge: {}", model.iterations);

    println!("\n  Cluster |  Size |        Label | Centroid ({})", schema.features.join(", "));
    println!("  --------|-------|--------------|----------");
    for (i, (size, label)) in model
        .cluster_sizes()
        .into_iter()
        .zip(model.labels.iter())
        .enumerate()
    {
        let label = if *label == UNCLASSIFIED {
            "-".to_string()
        } else {
            label.to_string()
        };
        let centroid: Vec<String> = model
            .centroids
            .row(i)
            .iter()
            .map(|v| format!("{:.2}", v))
            .collect();
        println!("  {:7} | {:5} | {:>12} | {}", i, size, label, centroid.join(" "));
    }

    println!(
        "\nValidation: {} / {} correct ({:.1}%)",
        correct,
        validation_rows,
        accuracy(correct, validation_rows) * 100.0
    );
}

/// Report file name for a player, spaces replaced by underscores.
pub fn report_file_name(player_name: &str) -> String {
    format!("{}_prediction.txt", player_name.replace(' ', "_"))
}

/// Save the player's stats and predicted price range to a text report.
pub fn save_prediction_report(
    dir: &Path,
    player_name: &str,
    record: &PlayerRecord,
    prediction: &Prediction,
) -> Result<PathBuf> {
    let path = dir.join(report_file_name(player_name));
    let mut out = BufWriter::new(fs::File::create(&path)?);

    writeln!(out, "Player Profile {}", player_name)?;
    writeln!(out, "{}\n", "=".repeat(40))?;

    writeln!(out, "Player Stats:")?;
    for (key, value) in &record.fields {
        if !value.trim().is_empty() {
            writeln!(out, "{}: {}", key, value)?;
        }
    }

    writeln!(out, "\n=== Transfer Price Prediction for {} ===", player_name)?;
    writeln!(out, "Closest Centroid: {}", prediction.closest_centroid)?;
    writeln!(out, "Centroid Line Number: {}", prediction.line_number)?;
    writeln!(out, "Cluster Label: {}", prediction.label)?;
    writeln!(
        out,
        "Predicted Price Range: €{}M - €{}M",
        prediction.lower, prediction.upper
    )?;
    writeln!(
        out,
        "\nGenerated: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    out.flush()?;

    log::info!("prediction saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    fn create_test_data() -> (PlayerRecord, Prediction) {
        let record = PlayerRecord {
            fields: vec![
                ("name".to_string(), "Alpha One".to_string()),
                ("Age".to_string(), "24".to_string()),
                ("Team".to_string(), "".to_string()),
            ],
        };
        let prediction = Prediction {
            closest_centroid: array![29.0, 950.0, 0.5, 1.0],
            line_number: 2,
            label: 150,
            lower: 1.2,
            upper: 2.4,
        };
        (record, prediction)
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(report_file_name("Alpha One"), "Alpha_One_prediction.txt");
    }

    #[test]
    fn test_save_prediction_report() {
        let (record, prediction) = create_test_data();
        let temp_dir = tempdir().unwrap();

        let path = save_prediction_report(temp_dir.path(), "Alpha One", &record, &prediction).unwrap();
        assert!(path.ends_with("Alpha_One_prediction.txt"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Player Profile Alpha One\n"));
        assert!(content.contains("Age: 24\n"));
        assert!(!content.contains("Team:"));
        assert!(content.contains("Centroid Line Number: 2\n"));
        assert!(content.contains("Cluster Label: 150\n"));
        assert!(content.contains("Predicted Price Range: €1.2M - €2.4M\n"));
    }
}
