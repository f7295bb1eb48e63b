//! Confrontation des prédictions aux détections satellite
//!
//! Travail en Web Mercator : chaque hotspot est entouré d'un buffer de
//! `buffer_meters`, l'union des buffers forme l'empreinte. Un point signalé
//! (risque ≥ seuil) dans l'empreinte est un vrai positif, hors empreinte un
//! faux positif ; un point non signalé dans l'empreinte est un faux négatif.

use geo::{BoundingRect, Intersects, MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crs;
use crate::error::{FireRiskError, Result};
use crate::geometry::{point_buffer, union_polygons};
use crate::types::{HotspotObservation, RiskClass, ScoredGrid};

/// Distance de buffer par défaut autour d'un hotspot (m)
pub const DEFAULT_BUFFER_METERS: f64 = 600.0;

/// Seuil par défaut de signalement
pub const DEFAULT_HIGH_RISK_THRESHOLD: RiskClass = RiskClass::High;

/// Résultat d'une évaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub precision: f64,
    pub recall: f64,
}

impl Evaluation {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        Self {
            tp,
            fp,
            fn_,
            precision: tp as f64 / (tp + fp).max(1) as f64,
            recall: tp as f64 / (tp + fn_).max(1) as f64,
        }
    }
}

/// Empreinte des hotspots en Web Mercator
struct Footprint {
    geometry: MultiPolygon<f64>,
    extent: Option<Rect<f64>>,
}

impl Footprint {
    fn build(hotspots: &[HotspotObservation], buffer_meters: f64) -> Self {
        let buffers = hotspots
            .iter()
            .map(|h| point_buffer(crs::project_coord(h.point.lon, h.point.lat), buffer_meters))
            .collect();
        let geometry = union_polygons(buffers);
        let extent = geometry.bounding_rect();
        Self { geometry, extent }
    }

    fn contains(&self, p: &Point<f64>) -> bool {
        match &self.extent {
            Some(extent) if extent.intersects(&p.0) => self.geometry.intersects(p),
            _ => false,
        }
    }
}

/// Évalue la grille annotée contre les hotspots
///
/// Sans hotspot : tp = fp = fn = 0, précision 1.0 si aucun point n'est
/// signalé (0.0 sinon), rappel 1.0.
///
/// # Errors
///
/// `InvalidParameter` si la distance de buffer n'est pas un nombre positif.
pub fn evaluate(
    scored: &ScoredGrid,
    hotspots: &[HotspotObservation],
    high_risk_threshold: RiskClass,
    buffer_meters: f64,
) -> Result<Evaluation> {
    if !buffer_meters.is_finite() || buffer_meters <= 0.0 {
        return Err(FireRiskError::InvalidParameter(format!(
            "buffer distance must be a positive number of meters, got {}",
            buffer_meters
        )));
    }

    if hotspots.is_empty() {
        let any_flagged = scored.iter().any(|s| s.risk >= high_risk_threshold);
        return Ok(Evaluation {
            tp: 0,
            fp: 0,
            fn_: 0,
            precision: if any_flagged { 0.0 } else { 1.0 },
            recall: 1.0,
        });
    }

    let footprint = Footprint::build(hotspots, buffer_meters);

    let (mut tp, mut fp, mut fn_) = (0, 0, 0);
    for scored_point in scored.iter() {
        let p = Point::from(crs::project_coord(scored_point.point.lon, scored_point.point.lat));
        let inside = footprint.contains(&p);
        let flagged = scored_point.risk >= high_risk_threshold;

        match (flagged, inside) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }

    let evaluation = Evaluation::from_counts(tp, fp, fn_);

    info!(
        hotspots = hotspots.len(),
        buffer_m = buffer_meters,
        tp = evaluation.tp,
        fp = evaluation.fp,
        fn_ = evaluation.fn_,
        precision = evaluation.precision,
        recall = evaluation.recall,
        "Evaluation against hotspots"
    );

    Ok(evaluation)
}
