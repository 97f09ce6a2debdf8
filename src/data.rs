//! Flat-file matrices, model artifacts and the merged player database

use crate::error::{Error, Result};
use crate::price::encode_price;
use crate::schema::{parse_stat, FeatureSchema, PlayerQuery};
use linfa::Dataset;
use ndarray::{Array1, Array2, Axis, Ix1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Training or validation matrix: feature records plus integer price labels.
pub type PlayerDataset = Dataset<f64, i64, Ix1>;

/// Fail fast with the offending path when an input file does not exist.
pub fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingFile {
            path: path.to_path_buf(),
        })
    }
}

/// Read whitespace-separated tokens, one `Vec` per non-blank line.
///
/// Returns `(line_number, tokens)` pairs so callers can report positions.
pub(crate) fn read_token_rows(path: &Path) -> Result<Vec<(usize, Vec<String>)>> {
    require_file(path)?;
    let content = fs::read_to_string(path)?;

    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.split_whitespace().map(str::to_string).collect()))
        .collect())
}

/// Read a numeric file where every line holds the same number of columns.
fn read_numeric_rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    let rows = read_token_rows(path)?;
    let mut parsed: Vec<Vec<f64>> = Vec::with_capacity(rows.len());
    let mut width = None;

    for (line, tokens) in rows {
        let values = tokens
            .iter()
            .map(|t| {
                t.parse::<f64>().map_err(|_| Error::Parse {
                    path: path.to_path_buf(),
                    line,
                    message: format!("'{}' is not a number", t),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        match width {
            None => width = Some(values.len()),
            Some(w) if w != values.len() => {
                return Err(Error::Parse {
                    path: path.to_path_buf(),
                    line,
                    message: format!("expected {} columns, found {}", w, values.len()),
                });
            }
            Some(_) => {}
        }

        parsed.push(values);
    }

    if parsed.is_empty() {
        return Err(Error::EmptyInput);
    }

    Ok(parsed)
}

fn to_label(path: &Path, line: usize, value: f64) -> Result<i64> {
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(Error::Parse {
            path: path.to_path_buf(),
            line,
            message: format!("label {} is not an integer", value),
        });
    }
    Ok(value as i64)
}

/// Load a training or validation matrix; the last column is the label.
pub fn load_matrix(path: &Path) -> Result<PlayerDataset> {
    let rows = read_numeric_rows(path)?;
    let n_cols = rows[0].len();
    if n_cols < 2 {
        return Err(Error::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: "a matrix row needs at least one feature and a label".to_string(),
        });
    }

    let n_features = n_cols - 1;
    let mut features = Vec::with_capacity(rows.len() * n_features);
    let mut labels = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        features.extend_from_slice(&row[..n_features]);
        labels.push(to_label(path, i + 1, row[n_features])?);
    }

    let records = Array2::from_shape_vec((rows.len(), n_features), features)?;
    log::debug!(
        "loaded {} rows x {} features from {}",
        records.nrows(),
        n_features,
        path.display()
    );

    Ok(Dataset::new(records, Array1::from(labels)))
}

/// Load a centroid file: one cluster per line.
pub fn load_centroids(path: &Path) -> Result<Array2<f64>> {
    let rows = read_numeric_rows(path)?;
    let dim = rows[0].len();
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(Array2::from_shape_vec((rows.len(), dim), flat)?)
}

/// Load a label file: one numeric label per line, aligned with the centroids.
pub fn load_labels(path: &Path) -> Result<Vec<i64>> {
    let rows = read_numeric_rows(path)?;
    if rows[0].len() != 1 {
        return Err(Error::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: format!("expected a single label per line, found {}", rows[0].len()),
        });
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| to_label(path, i + 1, row[0]))
        .collect()
}

/// Format a float the way numpy's `savetxt` does by default (`%.18e`).
pub fn format_scientific(value: f64) -> String {
    let formatted = format!("{:.18e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => formatted,
    }
}

fn write_lines<I>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    let mut out = BufWriter::new(fs::File::create(path)?);
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Write one centroid per line in `%.18e` layout.
pub fn write_centroids(path: &Path, centroids: &Array2<f64>) -> Result<()> {
    write_lines(
        path,
        centroids.outer_iter().map(|row| {
            row.iter()
                .map(|&v| format_scientific(v))
                .collect::<Vec<_>>()
                .join(" ")
        }),
    )
}

/// Write one label per line in `%.18e` layout.
pub fn write_labels(path: &Path, labels: &[i64]) -> Result<()> {
    write_lines(path, labels.iter().map(|&l| format_scientific(l as f64)))
}

/// Write `lower upper` bucket boundaries in `%.18e` layout.
pub fn write_ranges(path: &Path, ranges: &[(f64, f64)]) -> Result<()> {
    write_lines(
        path,
        ranges
            .iter()
            .map(|&(lo, hi)| format!("{} {}", format_scientific(lo), format_scientific(hi))),
    )
}

/// Write a matrix with integer labels in the trailing column.
pub fn write_matrix(path: &Path, dataset: &PlayerDataset) -> Result<()> {
    write_lines(
        path,
        dataset
            .records()
            .outer_iter()
            .zip(dataset.targets().iter())
            .map(|(row, label)| {
                let mut tokens: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                tokens.push(label.to_string());
                tokens.join(" ")
            }),
    )
}

/// Label and centroid file names for one training run.
pub fn artifact_paths(dir: &Path, iteration: u64, k: usize) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("cluster_labels_{}_{}.txt", iteration, k)),
        dir.join(format!("centroids{}_{}.txt", iteration, k)),
    )
}

/// One row of the merged player database, in CSV column order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub fields: Vec<(String, String)>,
}

impl PlayerRecord {
    /// Name-keyed view used for feature extraction.
    pub fn query(&self) -> PlayerQuery {
        self.fields.iter().cloned().collect()
    }
}

fn column_index(path: &Path, headers: &csv::StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| Error::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: format!("missing column '{}'", column),
        })
}

/// Find a player's row by exact name match.
pub fn find_player_row(
    database: &Path,
    schema: &FeatureSchema,
    player_name: &str,
) -> Result<Option<PlayerRecord>> {
    require_file(database)?;
    let mut reader = csv::Reader::from_path(database)?;
    let headers = reader.headers()?.clone();
    let name_idx = column_index(database, &headers, schema.name_column)?;

    for record in reader.records() {
        let record = record?;
        if record.get(name_idx) == Some(player_name) {
            let fields = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect();
            return Ok(Some(PlayerRecord { fields }));
        }
    }

    Ok(None)
}

/// Build an encoded matrix from the merged player database.
///
/// Rows with a missing or non-numeric feature, or an unreadable value,
/// are dropped. Returns the matrix and the number of dropped rows.
pub fn prepare_matrix(database: &Path, schema: &FeatureSchema) -> Result<(PlayerDataset, usize)> {
    require_file(database)?;
    let mut reader = csv::Reader::from_path(database)?;
    let headers = reader.headers()?.clone();

    let feature_idx = schema
        .features
        .iter()
        .map(|f| column_index(database, &headers, f))
        .collect::<Result<Vec<usize>>>()?;
    let target_idx = column_index(database, &headers, schema.target)?;

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut dropped = 0;

    for record in reader.records() {
        let record = record?;

        let row: Option<Vec<f64>> = feature_idx
            .iter()
            .map(|&i| record.get(i).and_then(parse_stat))
            .collect();
        let price = record.get(target_idx).and_then(|v| encode_price(v).ok());

        match (row, price) {
            (Some(row), Some(price)) => {
                features.extend(row);
                labels.push(price);
            }
            _ => dropped += 1,
        }
    }

    if labels.is_empty() {
        return Err(Error::EmptyInput);
    }

    log::info!(
        "prepared {} rows from {} ({} dropped)",
        labels.len(),
        database.display(),
        dropped
    );

    let records = Array2::from_shape_vec((labels.len(), schema.dim()), features)?;
    Ok((Dataset::new(records, Array1::from(labels)), dropped))
}

/// Replace encoded prices with the midpoint of `n_buckets` equal-width buckets.
///
/// Buckets span `[min, max]` of the prices; each covers `lower <= p < upper`
/// except the last, which also holds the maximum. Returns the relabelled
/// matrix and the bucket boundaries.
///
/// Labels are truncated midpoints, so buckets narrower than one price unit
/// can produce a label below their own lower bound. Fails when every price
/// is equal, since no bucket could then hold a label.
pub fn bucket_prices(
    dataset: &PlayerDataset,
    n_buckets: usize,
) -> Result<(PlayerDataset, Vec<(f64, f64)>)> {
    if n_buckets == 0 {
        return Err(Error::InvalidParameter {
            name: "buckets",
            message: "must be at least 1".to_string(),
        });
    }

    let prices = dataset.targets();
    let (min, max) = match (prices.iter().min(), prices.iter().max()) {
        (Some(&min), Some(&max)) => (min as f64, max as f64),
        _ => return Err(Error::EmptyInput),
    };

    if max == min {
        return Err(Error::InvalidParameter {
            name: "buckets",
            message: format!("all prices equal {}, price range is empty", min),
        });
    }

    let step = (max - min) / n_buckets as f64;
    let mut points: Vec<f64> = (0..=n_buckets).map(|i| min + step * i as f64).collect();
    points[n_buckets] = max;

    let ranges: Vec<(f64, f64)> = points.windows(2).map(|w| (w[0], w[1])).collect();

    let labels: Vec<i64> = prices
        .iter()
        .map(|&p| {
            let p = p as f64;
            let (lower, upper) = ranges
                .iter()
                .copied()
                .find(|&(lo, hi)| lo <= p && p < hi)
                .unwrap_or(ranges[n_buckets - 1]);
            ((lower + upper) / 2.0).trunc() as i64
        })
        .collect();

    Ok((
        Dataset::new(dataset.records().clone(), Array1::from(labels)),
        ranges,
    ))
}

/// Shuffle rows with a seeded RNG and hold out the first `validation_size`.
///
/// Returns `(training, validation)`.
pub fn split_dataset(
    dataset: &PlayerDataset,
    validation_size: usize,
    seed: u64,
) -> Result<(PlayerDataset, PlayerDataset)> {
    let n = dataset.records().nrows();
    if validation_size == 0 || validation_size >= n {
        return Err(Error::InvalidParameter {
            name: "validation_size",
            message: format!("must be between 1 and {} for {} rows", n.saturating_sub(1), n),
        });
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let (held_out, kept) = order.split_at(validation_size);
    let take = |idx: &[usize]| -> PlayerDataset {
        Dataset::new(
            dataset.records().select(Axis(0), idx),
            dataset.targets().select(Axis(0), idx),
        )
    };

    Ok((take(kept), take(held_out)))
}
