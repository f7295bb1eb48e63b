//! Modules d'export (GeoJSON)

pub mod geojson;

pub use self::geojson::{
    hotspots_to_feature_collection, scored_grid_to_feature_collection, write_hotspots,
    write_scored_grid, write_zones, zones_to_feature_collection,
};
