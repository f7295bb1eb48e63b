//! # firerisk-map
//!
//! Production des cartes de risque d'incendie : entraînement, grille annotée,
//! grille échantillonnée, zones hexagonales et évaluation contre le flux FIRMS.
//!
//! Les étapes sont exposées dans [`pipeline`] ; [`pipeline::rebuild`] les
//! enchaîne et retourne un [`RunReport`].

pub mod config;
pub mod export;
pub mod pipeline;
pub mod report;

pub use config::Config;
pub use report::{RunReport, RunStatus};
