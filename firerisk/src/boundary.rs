//! Frontière du pays cible
//!
//! Chargée une fois depuis un FeatureCollection GeoJSON, normalisée en WGS84,
//! puis immuable. Toutes les sélections de points passent par
//! [`CountryBoundary::intersects`].

use std::path::Path;

use geo::{BoundingRect, Intersects, MultiPolygon, Polygon, Rect};
use geojson::{FeatureCollection, GeoJson};
use tracing::{debug, info};

use crate::crs::{self, Crs};
use crate::error::{FireRiskError, Result};
use crate::geometry::union_polygons;
use crate::types::{BoundingBox, GeoPoint};

/// Attribut par défaut portant le nom du pays (Natural Earth)
pub const DEFAULT_NAME_ATTRIBUTE: &str = "SOVEREIGNT";

/// Polygone (ou multipolygone) du pays en WGS84
#[derive(Debug, Clone)]
pub struct CountryBoundary {
    name: String,
    geometry: MultiPolygon<f64>,
    extent: Rect<f64>,
}

impl CountryBoundary {
    /// Construit une frontière depuis une géométrie dans le CRS donné (code EPSG)
    ///
    /// # Errors
    ///
    /// `InvalidBoundary` si la géométrie est vide ou si l'EPSG n'est pas reconnu.
    pub fn from_geometry(
        name: impl Into<String>,
        geometry: MultiPolygon<f64>,
        epsg: u32,
    ) -> Result<Self> {
        let name = name.into();

        if geometry.0.is_empty() || geometry.0.iter().all(|p| p.exterior().0.is_empty()) {
            return Err(FireRiskError::InvalidBoundary(format!(
                "boundary geometry for '{}' is empty",
                name
            )));
        }

        let geometry = normalize_to_wgs84(&geometry, epsg)?;

        let extent = geometry.bounding_rect().ok_or_else(|| {
            FireRiskError::InvalidBoundary(format!("boundary '{}' has no extent", name))
        })?;

        Ok(Self {
            name,
            geometry,
            extent,
        })
    }

    /// Charge une frontière depuis un fichier GeoJSON
    pub fn load(path: &Path, attribute: &str, region: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FireRiskError::InvalidBoundary(format!(
                "failed to read boundary file {}: {}",
                path.display(),
                e
            ))
        })?;
        let boundary = Self::from_geojson_str(&content, attribute, region)?;

        info!(
            path = %path.display(),
            region = region,
            polygons = boundary.geometry.0.len(),
            "Boundary loaded"
        );

        Ok(boundary)
    }

    /// Sélectionne les features dont `attribute == region` et les fusionne
    pub fn from_geojson_str(text: &str, attribute: &str, region: &str) -> Result<Self> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e| FireRiskError::InvalidBoundary(format!("invalid GeoJSON: {}", e)))?;

        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(f) => FeatureCollection {
                bbox: None,
                features: vec![f],
                foreign_members: None,
            },
            GeoJson::Geometry(_) => {
                return Err(FireRiskError::InvalidBoundary(
                    "expected a Feature or FeatureCollection with a name attribute".to_string(),
                ))
            }
        };

        let epsg = declared_epsg(&collection)?;

        let mut polygons: Vec<Polygon<f64>> = Vec::new();
        for feature in &collection.features {
            let matches = feature
                .property(attribute)
                .and_then(|v| v.as_str())
                .map_or(false, |v| v == region);
            if !matches {
                continue;
            }

            let Some(geometry) = feature.geometry.clone() else {
                continue;
            };

            let geometry = geo::Geometry::<f64>::try_from(geometry.value).map_err(|e| {
                FireRiskError::InvalidBoundary(format!("unsupported geometry: {}", e))
            })?;

            match geometry {
                geo::Geometry::Polygon(p) => polygons.push(p),
                geo::Geometry::MultiPolygon(mp) => polygons.extend(mp.0),
                _ => debug!(region = region, "Skipping non-areal geometry"),
            }
        }

        if polygons.is_empty() {
            return Err(FireRiskError::InvalidBoundary(format!(
                "no polygon with {} = '{}'",
                attribute, region
            )));
        }

        // Union des parties (équivalent d'un unary_union)
        let geometry = if polygons.len() == 1 {
            MultiPolygon::new(polygons)
        } else {
            union_polygons(polygons)
        };

        Self::from_geometry(region, geometry, epsg)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Géométrie en WGS84 (x = lon, y = lat)
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Emprise de la frontière
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.extent.min().x,
            self.extent.min().y,
            self.extent.max().x,
            self.extent.max().y,
        )
    }

    /// Vrai si le point touche la frontière (intérieur ou bord)
    pub fn intersects(&self, point: GeoPoint) -> bool {
        let p = point.to_point();
        // Filtre rapide sur l'emprise avant le test exact
        if !self.extent.intersects(&p.0) {
            return false;
        }
        self.geometry.intersects(&p)
    }
}

/// EPSG déclaré par le membre `crs` (héritage GeoJSON 2008), 4326 sinon
fn declared_epsg(collection: &FeatureCollection) -> Result<u32> {
    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str());

    match name {
        None => Ok(Crs::Wgs84.epsg()),
        Some(name) => crs::parse_crs_name(name).ok_or_else(|| {
            FireRiskError::InvalidBoundary(format!("unrecognized CRS name: {}", name))
        }),
    }
}

/// Ramène la géométrie en WGS84
fn normalize_to_wgs84(geometry: &MultiPolygon<f64>, epsg: u32) -> Result<MultiPolygon<f64>> {
    if let Some(source) = Crs::from_epsg(epsg) {
        return Ok(crs::ensure_crs(geometry, source, Crs::Wgs84));
    }

    #[cfg(feature = "reproject")]
    {
        crs::proj::to_wgs84(geometry, epsg)
    }

    #[cfg(not(feature = "reproject"))]
    Err(FireRiskError::InvalidBoundary(format!(
        "EPSG:{} is not supported (4326, 3857). Build with the 'reproject' feature for other CRSs",
        epsg
    )))
}
