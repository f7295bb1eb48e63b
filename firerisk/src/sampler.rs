//! Sous-échantillonnage stratifié par classe de risque (rendu cartographique)
//!
//! Les quotas sont proportionnels à `effectif × poids` ; les arrondis sont
//! corrigés en ajoutant d'abord aux classes à fort risque et en retirant
//! d'abord aux classes à faible risque.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::error::{FireRiskError, Result};
use crate::types::{RiskClass, ScoredGrid, ScoredPoint};

pub const DEFAULT_RATIO: f64 = 0.4;
pub const DEFAULT_SEED: u64 = 42;

/// Poids par défaut : le code de la classe (1, 2, 3, 4)
pub fn default_weights() -> BTreeMap<RiskClass, f64> {
    RiskClass::ALL
        .iter()
        .map(|class| (*class, f64::from(class.code())))
        .collect()
}

/// Quotas par classe pour une cible donnée
///
/// La somme vaut `target` sauf si la capacité totale (`Σ counts`) est inférieure.
pub fn quotas(
    counts: &BTreeMap<RiskClass, usize>,
    target: usize,
    weights: &BTreeMap<RiskClass, f64>,
) -> BTreeMap<RiskClass, usize> {
    let count = |class: &RiskClass| counts.get(class).copied().unwrap_or(0);
    let weight = |class: &RiskClass| weights.get(class).copied().unwrap_or(1.0);

    let weighted: f64 = RiskClass::ALL
        .iter()
        .map(|class| count(class) as f64 * weight(class))
        .sum();
    let total = if weighted == 0.0 { 1.0 } else { weighted };

    // Du risque le plus fort au plus faible
    let descending: Vec<RiskClass> = RiskClass::ALL.iter().rev().copied().collect();

    let mut quotas: BTreeMap<RiskClass, usize> = BTreeMap::new();
    let mut assigned = 0usize;
    for class in &descending {
        let n = count(class);
        let q = if n == 0 {
            0
        } else {
            let raw = (target as f64 * (n as f64 * weight(class)) / total).round_ties_even();
            (raw.max(0.0) as usize).min(n)
        };
        quotas.insert(*class, q);
        assigned += q;
    }

    while assigned < target {
        let before = assigned;
        for class in &descending {
            if assigned == target {
                break;
            }
            if let Some(q) = quotas.get_mut(class) {
                if *q < count(class) {
                    *q += 1;
                    assigned += 1;
                }
            }
        }
        if assigned == before {
            break;
        }
    }

    while assigned > target {
        for class in RiskClass::ALL.iter() {
            if assigned == target {
                break;
            }
            if let Some(q) = quotas.get_mut(class) {
                if *q > 0 {
                    *q -= 1;
                    assigned -= 1;
                }
            }
        }
    }

    quotas
}

/// Sous-échantillonne la grille annotée
///
/// # Errors
///
/// `InvalidParameter` si le ratio n'est pas dans `(0, 1]` ou si un poids est
/// négatif ou non fini.
pub fn sample(
    scored: &ScoredGrid,
    target_ratio: f64,
    class_weights: &BTreeMap<RiskClass, f64>,
    seed: u64,
) -> Result<ScoredGrid> {
    if !(target_ratio > 0.0 && target_ratio <= 1.0) {
        return Err(FireRiskError::InvalidParameter(format!(
            "sampling ratio must be in (0, 1], got {}",
            target_ratio
        )));
    }
    if let Some((class, w)) = class_weights
        .iter()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(FireRiskError::InvalidParameter(format!(
            "weight for class {} must be a non-negative number, got {}",
            class, w
        )));
    }

    if scored.is_empty() {
        return Ok(ScoredGrid::default());
    }

    let n = scored.len();
    let target = ((target_ratio * n as f64).ceil() as usize).max(1);

    let mut groups: BTreeMap<RiskClass, Vec<ScoredPoint>> = BTreeMap::new();
    for point in scored.iter() {
        groups.entry(point.risk).or_default().push(*point);
    }
    let counts: BTreeMap<RiskClass, usize> = groups.iter().map(|(c, g)| (*c, g.len())).collect();

    let quotas = quotas(&counts, target, class_weights);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut points: Vec<ScoredPoint> = Vec::with_capacity(target);
    for class in RiskClass::ALL.iter().rev() {
        let q = quotas.get(class).copied().unwrap_or(0);
        if q == 0 {
            continue;
        }
        let Some(group) = groups.get(class) else {
            continue;
        };
        if q == group.len() {
            points.extend_from_slice(group);
        } else {
            points.extend(group.choose_multiple(&mut rng, q).copied());
        }
    }

    points.shuffle(&mut StdRng::seed_from_u64(seed));

    debug!(
        input = n,
        target = target,
        output = points.len(),
        quotas = ?quotas,
        "Grid downsampled by risk"
    );

    Ok(ScoredGrid { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeoPoint, VegetationClass};

    fn grid(counts: &[(RiskClass, usize)]) -> ScoredGrid {
        let mut points = Vec::new();
        for (class, n) in counts {
            for i in 0..*n {
                points.push(ScoredPoint {
                    point: GeoPoint::new(44.0 + i as f64 * 0.01, 22.0 + class.code() as f64),
                    vegetation: VegetationClass::LowVegetation,
                    risk: *class,
                });
            }
        }
        ScoredGrid { points }
    }

    fn counts(values: &[(RiskClass, usize)]) -> BTreeMap<RiskClass, usize> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_quotas_proportional() {
        // 10 de chaque, poids 1..4, cible 20 : 2, 4, 6, 8
        let c = counts(&[
            (RiskClass::VeryLow, 10),
            (RiskClass::Low, 10),
            (RiskClass::Medium, 10),
            (RiskClass::High, 10),
        ]);
        let q = quotas(&c, 20, &default_weights());
        assert_eq!(q[&RiskClass::VeryLow], 2);
        assert_eq!(q[&RiskClass::Low], 4);
        assert_eq!(q[&RiskClass::Medium], 6);
        assert_eq!(q[&RiskClass::High], 8);
    }

    #[test]
    fn test_quotas_capped_and_redistributed() {
        // High n'a que 2 points : le reste est redistribué
        let c = counts(&[(RiskClass::VeryLow, 50), (RiskClass::High, 2)]);
        let q = quotas(&c, 21, &default_weights());
        assert_eq!(q[&RiskClass::High], 2);
        assert_eq!(q[&RiskClass::VeryLow], 19);
    }

    #[test]
    fn test_quotas_half_even_rounding() {
        // 5 × 1/2 = 2.5 → 2 pour chaque classe, puis +1 à la classe la plus risquée
        let c = counts(&[(RiskClass::Low, 10), (RiskClass::High, 10)]);
        let weights: BTreeMap<RiskClass, f64> =
            [(RiskClass::Low, 1.0), (RiskClass::High, 1.0)].into_iter().collect();
        let q = quotas(&c, 5, &weights);
        assert_eq!(q[&RiskClass::High], 3);
        assert_eq!(q[&RiskClass::Low], 2);
    }

    #[test]
    fn test_quota_law_sum() {
        let c = counts(&[
            (RiskClass::VeryLow, 7),
            (RiskClass::Low, 3),
            (RiskClass::Medium, 11),
            (RiskClass::High, 1),
        ]);
        for target in 1..=22 {
            let q = quotas(&c, target, &default_weights());
            assert_eq!(q.values().sum::<usize>(), target);
            for (class, quota) in &q {
                assert!(*quota <= c.get(class).copied().unwrap_or(0));
            }
        }
    }

    #[test]
    fn test_single_class_scenario() {
        let g = grid(&[(RiskClass::VeryLow, 100)]);
        let out = sample(&g, 0.4, &default_weights(), 42).unwrap();
        assert_eq!(out.len(), 40);
        assert!(out.iter().all(|p| p.risk == RiskClass::VeryLow));
    }

    #[test]
    fn test_zero_weights() {
        let g = grid(&[(RiskClass::VeryLow, 100)]);
        let weights: BTreeMap<RiskClass, f64> = RiskClass::ALL.iter().map(|c| (*c, 0.0)).collect();
        let out = sample(&g, 0.4, &weights, 42).unwrap();
        assert_eq!(out.len(), 40);
    }

    #[test]
    fn test_deterministic_and_subset() {
        let g = grid(&[
            (RiskClass::VeryLow, 30),
            (RiskClass::Medium, 20),
            (RiskClass::High, 5),
        ]);
        let a = sample(&g, 0.3, &default_weights(), 7).unwrap();
        let b = sample(&g, 0.3, &default_weights(), 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 17);
        assert!(a.iter().all(|p| g.points.contains(p)));
    }

    #[test]
    fn test_empty_and_invalid() {
        let empty = ScoredGrid::default();
        assert!(sample(&empty, 0.4, &default_weights(), 42).unwrap().is_empty());

        let g = grid(&[(RiskClass::Low, 3)]);
        assert!(sample(&g, 0.0, &default_weights(), 42).is_err());
        assert!(sample(&g, 1.5, &default_weights(), 42).is_err());

        let bad: BTreeMap<RiskClass, f64> = [(RiskClass::Low, -1.0)].into_iter().collect();
        assert!(sample(&g, 0.5, &bad, 42).is_err());
    }

    #[test]
    fn test_tiny_ratio_keeps_one() {
        let g = grid(&[(RiskClass::Low, 3)]);
        assert_eq!(sample(&g, 0.01, &default_weights(), 42).unwrap().len(), 1);
    }
}
