//! # firerisk
//!
//! Inférence spatio-temporelle du risque d'incendie de forêt (Roumanie).
//!
//! ## Features
//!
//! - Grille candidate au pas fixe découpée par la frontière du pays
//! - Deux forêts aléatoires chaînées (végétation puis risque) avec végétation
//!   hors-pli à l'entraînement
//! - Confrontation aux détections satellite FIRMS (précision / rappel)
//! - Sous-échantillonnage stratifié par classe de risque
//! - Zones hexagonales fusionnées par classe
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use firerisk::{grid, scorer, CountryBoundary, RiskModel, BoundingBox};
//! use std::path::Path;
//!
//! let boundary = CountryBoundary::load(Path::new("countries.geojson"), "SOVEREIGNT", "Romania")?;
//! let model = RiskModel::load(Path::new("models"))?;
//!
//! let bbox = BoundingBox::new(20.2, 43.6, 29.7, 48.3);
//! let candidates = grid::generate(&bbox, 0.05, &boundary)?;
//! let scored = scorer::score(&candidates, &model)?;
//! println!("{:?}", scored.risk_counts());
//! ```

pub mod boundary;
pub mod crs;
pub mod error;
pub mod evaluate;
pub mod geometry;
pub mod grid;
pub mod hotspots;
pub mod model;
pub mod sampler;
pub mod scorer;
pub mod types;
pub mod zones;

pub use boundary::CountryBoundary;
pub use error::{FireRiskError, Result};
pub use evaluate::{evaluate, Evaluation};
pub use hotspots::{FeedConfig, HotspotFeed};
pub use model::{RiskModel, TrainingParams, TrainingRow};
pub use scorer::{score, Predictor};
pub use types::{
    BoundingBox, CandidateGrid, FireRiskLabel, GeoPoint, HotspotObservation, RiskClass,
    ScoredGrid, ScoredPoint, VegetationClass,
};
pub use zones::build_zones;
