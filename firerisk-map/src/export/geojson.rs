//! Export vers GeoJSON
//!
//! Deux formes : écriture en flux vers un fichier (geozero pour les
//! géométries) et `FeatureCollection` en mémoire (crate geojson) pour les
//! réponses de service.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::{Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection, JsonObject};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde_json::{json, Value};

use firerisk::crs::Crs;
use firerisk::{HotspotObservation, RiskClass, ScoredGrid, ScoredPoint};

/// Propriétés d'un point annoté (codes entiers et libellés)
pub fn scored_point_properties(p: &ScoredPoint) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("Latitude".to_string(), json!(p.point.lat));
    props.insert("Longitude".to_string(), json!(p.point.lon));
    props.insert("Predicted_Vegetation".to_string(), json!(p.vegetation.code()));
    props.insert("Predicted_Fire_Risk".to_string(), json!(p.risk.code()));
    props.insert("Vegetation_Name".to_string(), json!(p.vegetation.name()));
    props.insert("Fire_Risk_Name".to_string(), json!(p.risk.name()));
    props
}

fn zone_properties(class: RiskClass, zone: &MultiPolygon<f64>) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("Predicted_Fire_Risk".to_string(), json!(class.code()));
    props.insert("Fire_Risk_Name".to_string(), json!(class.name()));
    props.insert("parts".to_string(), json!(zone.0.len()));
    props
}

fn hotspot_properties(h: &HotspotObservation) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("latitude".to_string(), json!(h.point.lat));
    props.insert("longitude".to_string(), json!(h.point.lon));
    props.insert("source".to_string(), json!(h.source));
    props.insert(
        "acquired_at".to_string(),
        h.acquired_at
            .map(|t| Value::String(t.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
    );
    props.insert("satellite".to_string(), json!(h.satellite));
    props.insert("instrument".to_string(), json!(h.instrument));
    props.insert("confidence".to_string(), json!(h.confidence));
    props.insert("frp".to_string(), json!(h.frp));
    props
}

/// Grille annotée en FeatureCollection (un point par feature)
pub fn scored_grid_to_feature_collection(scored: &ScoredGrid) -> FeatureCollection {
    let features = scored
        .iter()
        .map(|p| feature(point_geometry(p.point.to_point()), scored_point_properties(p)))
        .collect();
    collection(features)
}

/// Zones de risque en FeatureCollection (une feature par classe)
pub fn zones_to_feature_collection(
    zones: &BTreeMap<RiskClass, MultiPolygon<f64>>,
) -> FeatureCollection {
    let features = zones
        .iter()
        .map(|(class, zone)| {
            feature(
                geojson::Geometry::new(geojson::Value::from(zone)),
                zone_properties(*class, zone),
            )
        })
        .collect();
    collection(features)
}

/// Hotspots en FeatureCollection
pub fn hotspots_to_feature_collection(hotspots: &[HotspotObservation]) -> FeatureCollection {
    let features = hotspots
        .iter()
        .map(|h| feature(point_geometry(h.point.to_point()), hotspot_properties(h)))
        .collect();
    collection(features)
}

fn point_geometry(point: geo::Point<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(&point))
}

fn feature(geometry: geojson::Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Écrit la grille annotée (streaming)
pub fn write_scored_grid(scored: &ScoredGrid, output_path: &Path) -> Result<usize> {
    write_features(
        output_path,
        scored
            .iter()
            .map(|p| (Geometry::Point(p.point.to_point()), scored_point_properties(p))),
    )
}

/// Écrit les zones de risque (streaming)
pub fn write_zones(
    zones: &BTreeMap<RiskClass, MultiPolygon<f64>>,
    output_path: &Path,
) -> Result<usize> {
    write_features(
        output_path,
        zones.iter().map(|(class, zone)| {
            (
                Geometry::MultiPolygon(zone.clone()),
                zone_properties(*class, zone),
            )
        }),
    )
}

/// Écrit les hotspots (streaming)
pub fn write_hotspots(hotspots: &[HotspotObservation], output_path: &Path) -> Result<usize> {
    write_features(
        output_path,
        hotspots
            .iter()
            .map(|h| (Geometry::Point(h.point.to_point()), hotspot_properties(h))),
    )
}

/// Écrit un FeatureCollection WGS84 dans un fichier, retourne le nombre de features
fn write_features<I>(output_path: &Path, features: I) -> Result<usize>
where
    I: IntoIterator<Item = (Geometry<f64>, JsonObject)>,
{
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    let count = write_collection(&mut writer, features)?;
    writer.flush()?;

    Ok(count)
}

fn write_collection<W, I>(writer: &mut W, features: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = (Geometry<f64>, JsonObject)>,
{
    // Header FeatureCollection avec CRS
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"{}"}}}},"features":["#,
        Crs::Wgs84.urn()
    )?;

    let mut count = 0;
    for (i, (geometry, properties)) in features.into_iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, &geometry, &properties)?;
        count += 1;
    }

    // Footer
    write!(writer, "]}}")?;

    Ok(count)
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(
    writer: &mut W,
    geometry: &Geometry<f64>,
    properties: &JsonObject,
) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","geometry":"#)?;

    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, properties)?;
    write!(writer, "}}")?;

    Ok(())
}
