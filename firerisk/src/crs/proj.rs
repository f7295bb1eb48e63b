//! Reprojection de frontières avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`. Il permet de
//! charger une frontière publiée dans un CRS autre que 4326/3857 (ex: Stereo 70,
//! EPSG:3844) en la ramenant en WGS84.

use geo::{Coord, MultiPolygon};
use proj::Proj;

use crate::error::{FireRiskError, Result};

/// Reprojette une frontière depuis un EPSG quelconque vers WGS84 (EPSG:4326)
pub fn to_wgs84(geom: &MultiPolygon<f64>, source_epsg: u32) -> Result<MultiPolygon<f64>> {
    let source = format!("EPSG:{}", source_epsg);

    let proj = Proj::new_known_crs(&source, "EPSG:4326", None).map_err(|e| {
        FireRiskError::InvalidBoundary(format!(
            "Failed to create projection from {} to EPSG:4326: {}",
            source, e
        ))
    })?;

    // PROJ respecte l'ordre d'axes officiel (lat, lon) pour 4326 : on le normalise
    geom.try_map_coords(|c| {
        let (a, b) = proj.convert((c.x, c.y)).map_err(|e| {
            FireRiskError::InvalidBoundary(format!("Coordinate transformation failed: {}", e))
        })?;
        Ok(normalize_axis_order(a, b))
    })
}

/// Remet les coordonnées en (lon, lat) si PROJ les a rendues en (lat, lon)
fn normalize_axis_order(a: f64, b: f64) -> Coord<f64> {
    if a.abs() <= 90.0 && b.abs() > 90.0 {
        Coord { x: b, y: a }
    } else {
        Coord { x: a, y: b }
    }
}
