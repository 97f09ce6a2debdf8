//! The feature schema shared by matrix preparation, training and prediction

use crate::error::{Error, Result};
use ndarray::Array1;
use std::collections::HashMap;

/// Name-keyed stat strings for one player, as read from the merged database.
pub type PlayerQuery = HashMap<String, String>;

/// Ordered feature columns used as the clustering vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSchema {
    /// Bumped whenever the column set or order changes.
    pub version: u32,
    /// Feature column names in vector order.
    pub features: &'static [&'static str],
    /// Column holding the currency-formatted market value.
    pub target: &'static str,
    /// Column holding the player's name.
    pub name_column: &'static str,
}

/// Age, minutes played, expected assists, expected goals.
pub const PLAYER_SCHEMA: FeatureSchema = FeatureSchema {
    version: 1,
    features: &["Age", "time", "xA", "xG"],
    target: "Value",
    name_column: "name",
};

impl Default for FeatureSchema {
    fn default() -> Self {
        PLAYER_SCHEMA
    }
}

impl FeatureSchema {
    /// Number of features per vector.
    pub fn dim(&self) -> usize {
        self.features.len()
    }

    /// Extract the feature vector from a player record.
    ///
    /// Fails on the first feature that is absent, blank or not a finite
    /// number. No partial vector is ever returned.
    pub fn extract(&self, query: &PlayerQuery) -> Result<Array1<f64>> {
        let mut values = Vec::with_capacity(self.dim());

        for &feature in self.features {
            let value = query
                .get(feature)
                .and_then(|raw| parse_stat(raw))
                .ok_or_else(|| Error::InsufficientData {
                    feature: feature.to_string(),
                })?;
            values.push(value);
        }

        Ok(Array1::from(values))
    }
}

/// Parse one stat cell, treating blanks and non-finite values as absent.
pub(crate) fn parse_stat(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
