//! Constantes de l'ellipsoïde WGS84 et longueurs de degré

/// Ellipsoïde WGS84
pub struct WGS84;

impl WGS84 {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub const A: f64 = 6378137.0;

    /// Circonférence équatoriale en mètres
    pub const EQUATORIAL_CIRCUMFERENCE: f64 = 40_075_016.6856;

    /// Longueur moyenne d'un degré de latitude en mètres
    pub const METERS_PER_DEGREE_LAT: f64 = 111_132.0;
}

/// Mètres par degré de longitude à la latitude donnée (degrés)
pub fn meters_per_degree_lon(lat_deg: f64) -> f64 {
    WGS84::EQUATORIAL_CIRCUMFERENCE * lat_deg.to_radians().cos() / 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_per_degree_lon() {
        // Équateur: ~111 320 m, 60°: la moitié
        assert!((meters_per_degree_lon(0.0) - 111_319.49).abs() < 0.1);
        assert!((meters_per_degree_lon(60.0) - 55_659.75).abs() < 0.1);
    }
}
