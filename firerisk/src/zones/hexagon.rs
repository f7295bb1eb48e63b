//! Cellule hexagonale centrée sur un point de grille

use geo::{Coord, LineString, Polygon};

use crate::crs::{self, mercator, WGS84};
use crate::types::{GeoPoint, RiskClass};

/// Marge de remplissage par défaut (laisse un léger espace entre cellules)
pub const DEFAULT_FILL_MARGIN: f64 = 0.95;

/// Rayon circonscrit au sol (m) d'un hexagone qui pave la grille à cette latitude
///
/// `R = min(pas_lat / √3, pas_lon / 2) × fill_margin`
pub fn hex_radius(lat_deg: f64, step_deg: f64, fill_margin: f64) -> f64 {
    let step_lat = step_deg * WGS84::METERS_PER_DEGREE_LAT;
    let step_lon = step_deg * crs::meters_per_degree_lon(lat_deg);
    (step_lat / 3f64.sqrt()).min(step_lon / 2.0) * fill_margin
}

/// Hexagone d'un point annoté
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexCell {
    pub center: GeoPoint,
    pub risk: RiskClass,

    /// Rayon circonscrit au sol (m)
    pub radius_m: f64,
}

impl HexCell {
    pub fn new(center: GeoPoint, risk: RiskClass, step_deg: f64, fill_margin: f64) -> Self {
        Self {
            center,
            risk,
            radius_m: hex_radius(center.lat, step_deg, fill_margin),
        }
    }

    /// Polygone en Web Mercator, sommets à 0°, 60°, …, 300°
    ///
    /// Le rayon est multiplié par le facteur d'échelle local pour que la
    /// cellule garde sa taille au sol.
    pub fn to_mercator_polygon(&self) -> Polygon<f64> {
        let center = crs::project_coord(self.center.lon, self.center.lat);
        let r = self.radius_m * mercator::scale_factor(self.center.lat);

        let mut ring: Vec<Coord<f64>> = (0..6)
            .map(|i| {
                let theta = (60.0 * i as f64).to_radians();
                Coord {
                    x: center.x + r * theta.cos(),
                    y: center.y + r * theta.sin(),
                }
            })
            .collect();
        ring.push(ring[0]);

        Polygon::new(LineString::new(ring), vec![])
    }
}
