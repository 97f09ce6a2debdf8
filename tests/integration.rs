//! Integration tests for PriceForge

use priceforge::data::{self, artifact_paths, PlayerRecord};
use priceforge::predict::PriceRange;
use priceforge::{load_matrix, train, Error, Predictor, RangeTable, TrainConfig, PLAYER_SCHEMA};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

const TRAINING: &str = "\
20 1000 1 2 100
22 1500 2 3 200
30 900 0 1 50
28 1200 1 1 150
";

const VALIDATION: &str = "\
21 1490 2 3 200
27 1000 1 1 50
25 1050 0 0 150
";

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_end_to_end_training() {
    let dir = tempdir().unwrap();
    let training = load_matrix(&write_file(dir.path(), "train.txt", TRAINING)).unwrap();
    let validation = load_matrix(&write_file(dir.path(), "valid.txt", VALIDATION)).unwrap();

    let config = TrainConfig::new(2).with_tolerance(0.0);
    let model = train(&training, &config).unwrap();

    // Verify model
    assert_eq!(model.centroids.shape(), &[2, 4]);
    assert!(model.iterations >= 1 && model.iterations <= config.max_iters);
    assert!(model.cluster_sizes().iter().all(|&size| size > 0));
    assert_eq!(model.cluster_sizes().iter().sum::<usize>(), 4);
    assert_eq!(model.labels, vec![50, 200]);

    assert_eq!(model.validate(&validation).unwrap(), 2);

    let (labels_path, centroids_path) = artifact_paths(dir.path(), 0, 2);
    data::write_labels(&labels_path, &model.labels).unwrap();
    data::write_centroids(&centroids_path, &model.centroids).unwrap();

    assert_eq!(data::load_labels(&labels_path).unwrap(), model.labels);
    let reloaded = data::load_centroids(&centroids_path).unwrap();
    for (a, b) in reloaded.iter().zip(model.centroids.iter()) {
        assert!((a - b).abs() <= 1e-12 * b.abs().max(1.0));
    }
}

#[test]
fn test_training_is_deterministic() {
    let file = {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", TRAINING).unwrap();
        f
    };
    let training = load_matrix(file.path()).unwrap();

    let a = train(&training, &TrainConfig::new(3)).unwrap();
    let b = train(&training, &TrainConfig::new(3)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_prediction_from_files() {
    let dir = tempdir().unwrap();
    let centroids = write_file(dir.path(), "centroids.txt", "25 1100 1 2\n29 950 0.5 1\n");
    let labels = write_file(dir.path(), "labels.txt", "5.000000000000000000e+01\n1.500000000000000000e+02\n");
    let ranges = write_file(dir.path(), "ranges.txt", "0 100\n100 200\n");

    let predictor = Predictor::from_files(PLAYER_SCHEMA, &centroids, &labels, &ranges).unwrap();

    let record = PlayerRecord {
        fields: vec![
            ("name".to_string(), "Test Player".to_string()),
            ("Age".to_string(), "29".to_string()),
            ("time".to_string(), "960".to_string()),
            ("xA".to_string(), "0.5".to_string()),
            ("xG".to_string(), "1.2".to_string()),
        ],
    };

    let prediction = predictor.predict(&record.query()).unwrap();
    assert_eq!(prediction.line_number, 2);
    assert_eq!(prediction.label, 150);
    assert_eq!((prediction.lower, prediction.upper), (100.0, 200.0));
}

#[test]
fn test_predictor_missing_file_names_path() {
    let dir = tempdir().unwrap();
    let centroids = write_file(dir.path(), "centroids.txt", "25 1100 1 2\n");
    let labels = write_file(dir.path(), "labels.txt", "50\n");
    let ranges = dir.path().join("ranges.txt");

    match Predictor::from_files(PLAYER_SCHEMA, &centroids, &labels, &ranges) {
        Err(Error::MissingFile { path }) => assert_eq!(path, ranges),
        other => panic!("expected missing file, got {:?}", other),
    }
}

#[test]
fn test_boundary_label_maps_to_next_bucket() {
    let ranges = RangeTable::new(vec![
        PriceRange::from_tokens("0", "100").unwrap(),
        PriceRange::from_tokens("100", "200").unwrap(),
    ]);
    let predictor = Predictor::new(
        PLAYER_SCHEMA,
        ndarray::array![[25.0, 1100.0, 1.0, 2.0]],
        vec![100],
        ranges,
    )
    .unwrap();

    let prediction = predictor
        .predict_features(&ndarray::array![25.0, 1100.0, 1.0, 2.0])
        .unwrap();
    assert_eq!((prediction.lower, prediction.upper), (100.0, 200.0));
}

#[test]
fn test_prepare_train_predict_pipeline() {
    let dir = tempdir().unwrap();
    let mut csv = String::from("name,Age,time,xA,xG,Value\n");
    for i in 0..10 {
        csv.push_str(&format!("Young {},{},{},0.5,1.0,€500k\n", i, 19 + i % 3, 300 + i * 10));
        csv.push_str(&format!("Star {},{},{},6.0,12.0,€85.5m\n", i, 26 + i % 3, 2800 + i * 10));
    }
    csv.push_str("Unknown,25,,1.0,1.0,€1m\n");
    let database = write_file(dir.path(), "merged_players.csv", &csv);

    let (encoded, dropped) = data::prepare_matrix(&database, &PLAYER_SCHEMA).unwrap();
    assert_eq!(dropped, 1);
    assert_eq!(encoded.records().nrows(), 20);

    let (bucketed, ranges) = data::bucket_prices(&encoded, 4).unwrap();
    let matrix_path = dir.path().join("merged_players_final.txt");
    let ranges_path = dir.path().join("ranges.txt");
    data::write_matrix(&matrix_path, &bucketed).unwrap();
    data::write_ranges(&ranges_path, &ranges).unwrap();

    let matrix = load_matrix(&matrix_path).unwrap();
    assert_eq!(matrix.targets(), bucketed.targets());

    let model = train(&matrix, &TrainConfig::new(2)).unwrap();
    let (labels_path, centroids_path) = artifact_paths(dir.path(), 1, 2);
    data::write_labels(&labels_path, &model.labels).unwrap();
    data::write_centroids(&centroids_path, &model.centroids).unwrap();

    let predictor =
        Predictor::from_files(PLAYER_SCHEMA, &centroids_path, &labels_path, &ranges_path).unwrap();
    let star = data::find_player_row(&database, &PLAYER_SCHEMA, "Star 3")
        .unwrap()
        .unwrap();
    let young = data::find_player_row(&database, &PLAYER_SCHEMA, "Young 3")
        .unwrap()
        .unwrap();

    let star_price = predictor.predict(&star.query()).unwrap();
    let young_price = predictor.predict(&young.query()).unwrap();
    assert!(star_price.label > young_price.label);
    assert!(star_price.lower <= star_price.upper);

    let unknown = data::find_player_row(&database, &PLAYER_SCHEMA, "Unknown")
        .unwrap()
        .unwrap();
    assert!(matches!(
        predictor.predict(&unknown.query()),
        Err(Error::InsufficientData { .. })
    ));
}
