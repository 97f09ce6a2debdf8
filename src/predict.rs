//! Price-range prediction for a single player from persisted model artifacts

use crate::data::{load_centroids, load_labels, read_token_rows, require_file};
use crate::error::{Error, Result};
use crate::model::{nearest_centroid, UNCLASSIFIED};
use crate::price::decode_range_boundary;
use crate::schema::{FeatureSchema, PlayerQuery};
use ndarray::{Array1, Array2};
use std::path::Path;

/// One `[lower, upper)` price bucket, keeping the tokens as written on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRange {
    /// Inclusive lower bound, encoded price units.
    pub lower: f64,
    /// Exclusive upper bound, encoded price units.
    pub upper: f64,
    /// Lower bound token as read from the range file.
    pub lower_token: String,
    /// Upper bound token as read from the range file.
    pub upper_token: String,
}

impl PriceRange {
    /// Parse a bucket from its two boundary tokens.
    pub fn from_tokens(lower: &str, upper: &str) -> Result<Self> {
        let parse = |raw: &str| {
            raw.parse::<f64>().map_err(|_| Error::InvalidBoundary {
                raw: raw.to_string(),
            })
        };

        Ok(Self {
            lower: parse(lower)?,
            upper: parse(upper)?,
            lower_token: lower.to_string(),
            upper_token: upper.to_string(),
        })
    }

    /// Lower bound inclusive, upper bound exclusive.
    pub fn contains(&self, label: i64) -> bool {
        let label = label as f64;
        self.lower <= label && label < self.upper
    }

    /// Decoded `(lower, upper)` estimate in millions.
    pub fn decode(&self) -> Result<(f64, f64)> {
        Ok((
            decode_range_boundary(&self.lower_token)?,
            decode_range_boundary(&self.upper_token)?,
        ))
    }
}

/// Ordered price buckets covering the label domain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeTable {
    ranges: Vec<PriceRange>,
}

impl RangeTable {
    /// Wrap ordered buckets, warning when neighbours do not touch.
    pub fn new(ranges: Vec<PriceRange>) -> Self {
        for pair in ranges.windows(2) {
            if pair[0].upper != pair[1].lower {
                log::warn!(
                    "price buckets are not contiguous: {} is followed by {}",
                    pair[0].upper,
                    pair[1].lower
                );
            }
        }
        Self { ranges }
    }

    /// Read a range file: one `lower upper` pair per line.
    pub fn load(path: &Path) -> Result<Self> {
        let mut ranges = Vec::new();
        for (line, tokens) in read_token_rows(path)? {
            match tokens.as_slice() {
                [lower, upper] => ranges.push(PriceRange::from_tokens(lower, upper)?),
                _ => {
                    return Err(Error::Parse {
                        path: path.to_path_buf(),
                        line,
                        message: format!("expected 'lower upper', found {} tokens", tokens.len()),
                    })
                }
            }
        }

        if ranges.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(Self::new(ranges))
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True when the table holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The bucket holding `label`, if any.
    pub fn bucket_for(&self, label: i64) -> Option<&PriceRange> {
        self.ranges.iter().find(|r| r.contains(label))
    }
}

/// Outcome of one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Centroid of the matched cluster.
    pub closest_centroid: Array1<f64>,
    /// 1-based line of the centroid in its file.
    pub line_number: usize,
    /// Majority label of the matched cluster.
    pub label: i64,
    /// Decoded lower estimate, millions.
    pub lower: f64,
    /// Decoded upper estimate, millions.
    pub upper: f64,
}

/// Read-only centroid, label and range tables.
#[derive(Debug, Clone)]
pub struct Predictor {
    schema: FeatureSchema,
    centroids: Array2<f64>,
    labels: Vec<i64>,
    ranges: RangeTable,
}

impl Predictor {
    pub fn new(
        schema: FeatureSchema,
        centroids: Array2<f64>,
        labels: Vec<i64>,
        ranges: RangeTable,
    ) -> Result<Self> {
        if centroids.nrows() == 0 || ranges.is_empty() {
            return Err(Error::EmptyInput);
        }
        if centroids.nrows() != labels.len() {
            return Err(Error::DimensionMismatch {
                expected: centroids.nrows(),
                found: labels.len(),
            });
        }
        if centroids.ncols() != schema.dim() {
            return Err(Error::DimensionMismatch {
                expected: schema.dim(),
                found: centroids.ncols(),
            });
        }

        Ok(Self {
            schema,
            centroids,
            labels,
            ranges,
        })
    }

    /// Load the three artifact files, checking they all exist first.
    pub fn from_files(
        schema: FeatureSchema,
        centroids: &Path,
        labels: &Path,
        ranges: &Path,
    ) -> Result<Self> {
        for path in [centroids, labels, ranges] {
            require_file(path)?;
        }

        Self::new(
            schema,
            load_centroids(centroids)?,
            load_labels(labels)?,
            RangeTable::load(ranges)?,
        )
    }

    /// Predict the price range for a player record.
    pub fn predict(&self, query: &PlayerQuery) -> Result<Prediction> {
        let features = self.schema.extract(query)?;
        self.predict_features(&features)
    }

    /// Predict the price range for an already-extracted feature vector.
    pub fn predict_features(&self, features: &Array1<f64>) -> Result<Prediction> {
        let (idx, distance) = nearest_centroid(&self.centroids, features.view())?;
        log::debug!("closest centroid {} at distance {:.4}", idx, distance);

        let label = self.labels[idx];
        if label == UNCLASSIFIED {
            return Err(Error::Unclassifiable { cluster: idx });
        }

        let bucket = self
            .ranges
            .bucket_for(label)
            .ok_or(Error::LabelOutsideRanges { label })?;
        let (lower, upper) = bucket.decode()?;

        Ok(Prediction {
            closest_centroid: self.centroids.row(idx).to_owned(),
            line_number: idx + 1,
            label,
            lower,
            upper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PLAYER_SCHEMA;
    use ndarray::array;

    fn create_test_predictor() -> Predictor {
        let ranges = RangeTable::new(vec![
            PriceRange::from_tokens("0", "100").unwrap(),
            PriceRange::from_tokens("100", "200").unwrap(),
        ]);
        Predictor::new(
            PLAYER_SCHEMA,
            array![[25.0, 1100.0, 1.0, 2.0], [29.0, 950.0, 0.5, 1.0]],
            vec![50, 150],
            ranges,
        )
        .unwrap()
    }

    fn query(values: [&str; 4]) -> PlayerQuery {
        PLAYER_SCHEMA
            .features
            .iter()
            .zip(values)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_predict_closest_centroid() {
        let predictor = create_test_predictor();
        let prediction = predictor.predict(&query(["30", "940", "0.4", "1.1"])).unwrap();

        assert_eq!(prediction.line_number, 2);
        assert_eq!(prediction.label, 150);
        assert_eq!((prediction.lower, prediction.upper), (100.0, 200.0));
        assert_eq!(prediction.closest_centroid.to_vec(), vec![29.0, 950.0, 0.5, 1.0]);
    }

    #[test]
    fn test_predict_insufficient_data() {
        let predictor = create_test_predictor();
        let result = predictor.predict(&query(["30", "", "0.4", "1.1"]));
        assert!(matches!(result, Err(Error::InsufficientData { .. })));
    }

    #[test]
    fn test_shared_boundary_belongs_to_upper_bucket() {
        let ranges = RangeTable::new(vec![
            PriceRange::from_tokens("0", "100").unwrap(),
            PriceRange::from_tokens("100", "200").unwrap(),
        ]);

        assert_eq!(ranges.bucket_for(100).unwrap().lower_token, "100");
        assert_eq!(ranges.bucket_for(0).unwrap().lower_token, "0");
        assert!(ranges.bucket_for(200).is_none());
    }

    #[test]
    fn test_label_outside_ranges() {
        let ranges = RangeTable::new(vec![PriceRange::from_tokens("0", "100").unwrap()]);
        let predictor =
            Predictor::new(PLAYER_SCHEMA, array![[25.0, 1100.0, 1.0, 2.0]], vec![150], ranges)
                .unwrap();

        let result = predictor.predict_features(&array![25.0, 1100.0, 1.0, 2.0]);
        assert!(matches!(result, Err(Error::LabelOutsideRanges { label: 150 })));
    }

    #[test]
    fn test_empty_cluster_is_unclassifiable() {
        let ranges = RangeTable::new(vec![PriceRange::from_tokens("-10", "100").unwrap()]);
        let predictor = Predictor::new(
            PLAYER_SCHEMA,
            array![[25.0, 1100.0, 1.0, 2.0]],
            vec![UNCLASSIFIED],
            ranges,
        )
        .unwrap();

        let result = predictor.predict_features(&array![25.0, 1100.0, 1.0, 2.0]);
        assert!(matches!(result, Err(Error::Unclassifiable { cluster: 0 })));
    }

    #[test]
    fn test_decodes_scientific_tokens() {
        let range = PriceRange::from_tokens(
            "4.550000000000000000e+06",
            "9.100000000000000000e+07",
        )
        .unwrap();

        assert!(range.contains(4_550_000));
        let (lower, upper) = range.decode().unwrap();
        assert!((lower - 4.55).abs() < 1e-9);
        assert!((upper - 91.0).abs() < 1e-9);
    }

    #[test]
    fn test_misaligned_tables_rejected() {
        let result = Predictor::new(
            PLAYER_SCHEMA,
            array![[25.0, 1100.0, 1.0, 2.0]],
            vec![50, 150],
            RangeTable::new(vec![PriceRange::from_tokens("0", "100").unwrap()]),
        );
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }
}
