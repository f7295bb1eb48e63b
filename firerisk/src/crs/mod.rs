//! Systèmes de coordonnées du pipeline
//!
//! Deux CRS seulement :
//! - WGS84 (EPSG:4326) - stockage et échange, en degrés
//! - Web Mercator (EPSG:3857) - calculs de distance, en mètres
//!
//! Toute traversée de frontière (chargement, buffer, dissolution, sortie)
//! passe par [`ensure_crs`].

pub mod ellipsoid;
pub mod mercator;
#[cfg(feature = "reproject")]
pub mod proj;

use geo::{Coord, MapCoords};
use serde::{Deserialize, Serialize};

pub use ellipsoid::{meters_per_degree_lon, WGS84};

/// CRS reconnu par le pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    /// EPSG:4326 (lon/lat en degrés)
    Wgs84,
    /// EPSG:3857 (mètres)
    WebMercator,
}

impl Crs {
    pub fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }

    pub fn from_epsg(epsg: u32) -> Option<Self> {
        match epsg {
            4326 => Some(Self::Wgs84),
            3857 | 900913 => Some(Self::WebMercator),
            _ => None,
        }
    }

    /// Nom URN utilisé dans le membre `crs` des GeoJSON
    pub fn urn(self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg())
    }
}

/// Extrait le code EPSG d'un nom de CRS (`EPSG:4326`, `urn:ogc:def:crs:EPSG::3857`, CRS84)
pub fn parse_crs_name(name: &str) -> Option<u32> {
    let name = name.trim();
    if name.ends_with("CRS84") {
        return Some(4326);
    }
    let upper = name.to_ascii_uppercase();
    let pos = upper.rfind("EPSG")?;
    upper[pos + 4..]
        .trim_start_matches(':')
        .trim()
        .parse()
        .ok()
}

/// Convertit une géométrie d'un CRS à l'autre (identité si `from == to`)
pub fn ensure_crs<G>(geom: &G, from: Crs, to: Crs) -> G
where
    G: MapCoords<f64, f64, Output = G> + Clone,
{
    match (from, to) {
        (Crs::Wgs84, Crs::WebMercator) => geom.map_coords(mercator::geographic_to_web_mercator),
        (Crs::WebMercator, Crs::Wgs84) => geom.map_coords(mercator::web_mercator_to_geographic),
        _ => geom.clone(),
    }
}

/// Projette une coordonnée (lon, lat) vers le CRS métrique
pub fn project_coord(lon: f64, lat: f64) -> Coord<f64> {
    mercator::geographic_to_web_mercator(Coord { x: lon, y: lat })
}
