//! Opérations géométriques communes (dissolution, buffer de points)

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

/// Segments par quart de cercle pour l'approximation des buffers
pub const QUAD_SEGMENTS: usize = 16;

/// Union de polygones par réduction deux à deux
///
/// Chaque passe fusionne les voisins adjacents de la liste, ce qui garde des
/// opérandes de taille comparable au lieu d'accumuler sur un seul polygone.
pub fn cascaded_union(parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    let mut layer: Vec<MultiPolygon<f64>> = parts.into_iter().filter(|p| !p.0.is_empty()).collect();

    if layer.is_empty() {
        return MultiPolygon::new(Vec::new());
    }

    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len() / 2 + 1);
        let mut iter = layer.into_iter();
        while let Some(a) = iter.next() {
            match iter.next() {
                Some(b) => next.push(a.union(&b)),
                None => next.push(a),
            }
        }
        layer = next;
    }

    layer.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

/// Union d'une liste de polygones simples
pub fn union_polygons(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    cascaded_union(
        polygons
            .into_iter()
            .map(|p| MultiPolygon::new(vec![p]))
            .collect(),
    )
}

/// Buffer circulaire d'un point (polygone régulier à `4 * QUAD_SEGMENTS` côtés)
///
/// Les coordonnées doivent être dans un CRS métrique.
pub fn point_buffer(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    let n = 4 * QUAD_SEGMENTS;
    let mut ring: Vec<Coord<f64>> = (0..n)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / n as f64;
            Coord {
                x: center.x + radius * theta.cos(),
                y: center.y + radius * theta.sin(),
            }
        })
        .collect();
    ring.push(ring[0]);
    Polygon::new(LineString::new(ring), vec![])
}
