//! PriceForge: football transfer price prediction using K-Means clustering
//!
//! Player statistics (age, minutes, expected assists, expected goals) are
//! clustered with Lloyd's k-means, each cluster is labelled with the majority
//! encoded price of its training rows, and new players are mapped to the
//! nearest centroid's price bucket.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod predict;
pub mod price;
pub mod report;
pub mod schema;

// Re-export public items for easier access
pub use cli::Args;
pub use config::TrainConfig;
pub use data::{load_matrix, PlayerDataset};
pub use error::{Error, Result};
pub use model::{fit_kmeans, train, KMeansFit, KMeansModel, UNCLASSIFIED};
pub use predict::{Prediction, Predictor, RangeTable};
pub use price::{decode_range_boundary, encode_price};
pub use schema::{FeatureSchema, PlayerQuery, PLAYER_SCHEMA};
