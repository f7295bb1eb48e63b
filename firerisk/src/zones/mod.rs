//! Zones de risque : hexagones fusionnés par classe
//!
//! Un hexagone par point annoté en Web Mercator, union par classe de risque,
//! simplification optionnelle préservant la topologie, puis retour en WGS84.

pub mod hexagon;

use std::collections::BTreeMap;

use geo::{MultiPolygon, Polygon, SimplifyVwPreserve};
use tracing::debug;

use crate::crs::{self, Crs};
use crate::error::{FireRiskError, Result};
use crate::geometry::union_polygons;
use crate::types::{RiskClass, ScoredGrid};

pub use hexagon::{hex_radius, HexCell, DEFAULT_FILL_MARGIN};

/// Construit un polygone (éventuellement multi-parties) par classe de risque
///
/// Les classes sans aucun point sont absentes du résultat. Les polygones sont
/// en WGS84.
///
/// `simplify_meters` est une longueur au sol : Visvalingam-Whyatt retire les
/// sommets dont le triangle fait moins que le carré de ce côté, mesuré en
/// Web Mercator à la latitude moyenne de la grille (voir [`mercator_area_tolerance`]).
///
/// # Errors
///
/// `InvalidParameter` si le pas, la tolérance ou la marge sont invalides.
pub fn build_zones(
    scored: &ScoredGrid,
    step_deg: f64,
    simplify_meters: f64,
    fill_margin: f64,
) -> Result<BTreeMap<RiskClass, MultiPolygon<f64>>> {
    if !step_deg.is_finite() || step_deg <= 0.0 {
        return Err(FireRiskError::InvalidParameter(format!(
            "zone step must be a positive number of degrees, got {}",
            step_deg
        )));
    }
    if !(fill_margin > 0.0 && fill_margin <= 1.0) {
        return Err(FireRiskError::InvalidParameter(format!(
            "fill margin must be in (0, 1], got {}",
            fill_margin
        )));
    }
    if !simplify_meters.is_finite() || simplify_meters < 0.0 {
        return Err(FireRiskError::InvalidParameter(format!(
            "simplify tolerance must be a non-negative number of meters, got {}",
            simplify_meters
        )));
    }

    let epsilon = match mean_latitude(scored) {
        Some(lat) if simplify_meters > 0.0 => mercator_area_tolerance(simplify_meters, lat),
        _ => 0.0,
    };

    let mut groups: BTreeMap<RiskClass, Vec<Polygon<f64>>> = BTreeMap::new();
    for point in scored.iter() {
        let cell = HexCell::new(point.point, point.risk, step_deg, fill_margin);
        groups
            .entry(point.risk)
            .or_default()
            .push(cell.to_mercator_polygon());
    }

    let mut zones = BTreeMap::new();
    for (class, cells) in groups {
        let count = cells.len();
        let mut zone = union_polygons(cells);

        if epsilon > 0.0 {
            zone = zone.simplify_vw_preserve(&epsilon);
        }

        debug!(
            class = %class,
            cells = count,
            parts = zone.0.len(),
            "Risk zone dissolved"
        );

        zones.insert(class, crs::ensure_crs(&zone, Crs::WebMercator, Crs::Wgs84));
    }

    Ok(zones)
}

/// Seuil d'aire VW en unités Mercator pour une longueur au sol à `lat`
///
/// Web Mercator dilate les longueurs d'un facteur 1/cos(lat).
pub fn mercator_area_tolerance(ground_meters: f64, lat: f64) -> f64 {
    let side = ground_meters / lat.to_radians().cos();
    side * side
}

fn mean_latitude(scored: &ScoredGrid) -> Option<f64> {
    if scored.is_empty() {
        return None;
    }
    Some(scored.iter().map(|p| p.point.lat).sum::<f64>() / scored.len() as f64)
}
