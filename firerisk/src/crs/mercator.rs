//! Projection Web Mercator (EPSG:3857)
//!
//! Aussi connu sous le nom de Pseudo-Mercator ou Spherical Mercator.
//! C'est le CRS métrique du pipeline (buffers, hexagones).

use geo::Coord;

use super::ellipsoid::WGS84;

/// Latitude maximale représentable (degrés)
const MAX_LAT: f64 = 85.0;

/// Convertit (lon, lat) en degrés vers Web Mercator (mètres)
pub fn geographic_to_web_mercator(c: Coord<f64>) -> Coord<f64> {
    // Web Mercator utilise un modèle sphérique avec le rayon équatorial
    let r = WGS84::A;

    // Limiter la latitude pour éviter l'infini
    let lat = c.y.clamp(-MAX_LAT, MAX_LAT).to_radians();

    Coord {
        x: r * c.x.to_radians(),
        y: r * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

/// Convertit Web Mercator (mètres) vers (lon, lat) en degrés
pub fn web_mercator_to_geographic(c: Coord<f64>) -> Coord<f64> {
    let r = WGS84::A;

    // Latitude = 2 * atan(exp(y/R)) - π/2
    let lat = 2.0 * (c.y / r).exp().atan() - std::f64::consts::FRAC_PI_2;

    Coord {
        x: (c.x / r).to_degrees(),
        y: lat.to_degrees(),
    }
}

/// Facteur d'échelle local de la projection (unités Mercator par mètre au sol)
pub fn scale_factor(lat_deg: f64) -> f64 {
    1.0 / lat_deg.clamp(-MAX_LAT, MAX_LAT).to_radians().cos()
}
