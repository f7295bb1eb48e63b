//! Annotation de la grille candidate par le modèle

use tracing::debug;

use crate::error::{FireRiskError, Result};
use crate::model::RiskModel;
use crate::types::{CandidateGrid, GeoPoint, RiskClass, ScoredGrid, ScoredPoint, VegetationClass};

/// Source de prédictions (végétation, risque) pour une liste de points
pub trait Predictor {
    /// Une prédiction par point, dans l'ordre des points
    fn predict(&self, points: &[GeoPoint]) -> Result<Vec<(VegetationClass, RiskClass)>>;
}

impl Predictor for RiskModel {
    fn predict(&self, points: &[GeoPoint]) -> Result<Vec<(VegetationClass, RiskClass)>> {
        RiskModel::predict(self, points)
    }
}

/// Annote chaque point de la grille (un seul appel de prédiction groupé)
///
/// # Errors
///
/// `Classifier` si le modèle échoue ou ne rend pas une prédiction par point.
pub fn score<P: Predictor + ?Sized>(grid: &CandidateGrid, model: &P) -> Result<ScoredGrid> {
    let predictions = model.predict(&grid.points)?;
    if predictions.len() != grid.len() {
        return Err(FireRiskError::Classifier(format!(
            "{} predictions for {} points",
            predictions.len(),
            grid.len()
        )));
    }

    let points: Vec<ScoredPoint> = grid
        .points
        .iter()
        .zip(predictions)
        .map(|(point, (vegetation, risk))| ScoredPoint {
            point: *point,
            vegetation,
            risk,
        })
        .collect();

    let scored = ScoredGrid { points };
    debug!(points = scored.len(), counts = ?scored.risk_counts(), "Grid scored");
    Ok(scored)
}
