//! Génération de la grille candidate
//!
//! Produit croisé latitude × longitude au pas fixe, découpé par la frontière.
//! L'ordre est latitude majeure, longitude mineure ; un pas qui ne divise pas
//! l'emprise tronque simplement la dernière ligne/colonne.

use tracing::debug;

use crate::boundary::CountryBoundary;
use crate::error::{FireRiskError, Result};
use crate::types::{BoundingBox, CandidateGrid, GeoPoint};

/// Pas par défaut (~5 km)
pub const DEFAULT_STEP_DEG: f64 = 0.05;

/// Tolérance pour ne pas créer d'échantillon parasite sur la borne haute
const EDGE_EPSILON: f64 = 1e-9;

/// Échantillons `start + i * step` strictement inférieurs à `stop`
pub fn axis_samples(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let count = ((stop - start) / step - EDGE_EPSILON).ceil().max(0.0) as usize;
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// Génère la grille candidate dans l'emprise, découpée par la frontière
///
/// # Errors
///
/// `InvalidParameter` si le pas ou l'emprise sont invalides.
pub fn generate(
    bbox: &BoundingBox,
    step_deg: f64,
    boundary: &CountryBoundary,
) -> Result<CandidateGrid> {
    if !step_deg.is_finite() || step_deg <= 0.0 {
        return Err(FireRiskError::InvalidParameter(format!(
            "grid step must be a positive number of degrees, got {}",
            step_deg
        )));
    }
    bbox.validate()?;

    let latitudes = axis_samples(bbox.south, bbox.north, step_deg);
    let longitudes = axis_samples(bbox.west, bbox.east, step_deg);

    let points: Vec<GeoPoint> = latitudes
        .iter()
        .flat_map(|&lat| longitudes.iter().map(move |&lon| GeoPoint::new(lat, lon)))
        .filter(|p| boundary.intersects(*p))
        .collect();

    debug!(
        rows = latitudes.len(),
        cols = longitudes.len(),
        kept = points.len(),
        region = boundary.name(),
        "Candidate grid generated"
    );

    Ok(CandidateGrid { points, step_deg })
}
