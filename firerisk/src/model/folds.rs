//! Validation croisée k-fold et prédictions hors-pli (out-of-fold)
//!
//! Chaque ligne reçoit la prédiction d'un modèle de pli qui ne l'a jamais vue
//! pendant son entraînement. C'est cette prédiction, et non l'étiquette vraie,
//! qui alimente l'étage de risque.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::forest::{FeatureMatrix, ForestParams, Label, RandomForest};
use crate::error::{FireRiskError, Result};

/// Un pli : lignes d'entraînement et lignes de validation (disjointes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validate: Vec<usize>,
}

/// Découpe `0..n` en `k` plis après mélange avec la graine donnée
///
/// Les `n % k` premiers plis reçoivent une ligne de plus.
pub fn kfold(n: usize, k: usize, seed: u64) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(FireRiskError::InvalidParameter(format!(
            "k-fold needs at least 2 folds, got {}",
            k
        )));
    }
    if n < k {
        return Err(FireRiskError::InsufficientData(format!(
            "cannot split {} rows into {} folds",
            n, k
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;

    for f in 0..k {
        let size = base + usize::from(f < extra);
        let mut validate: Vec<usize> = order[start..start + size].to_vec();
        validate.sort_unstable();

        let mut in_fold = vec![false; n];
        validate.iter().for_each(|&i| in_fold[i] = true);
        let train: Vec<usize> = (0..n).filter(|&i| !in_fold[i]).collect();

        folds.push(Fold { train, validate });
        start += size;
    }

    Ok(folds)
}

/// Prédictions hors-pli et plis utilisés pour les produire
#[derive(Debug, Clone)]
pub struct OutOfFold<L> {
    /// Prédiction pour chaque ligne d'entraînement
    pub predictions: Vec<L>,

    pub folds: Vec<Fold>,
}

impl<L: Label> OutOfFold<L> {
    /// Part des prédictions hors-pli égales aux étiquettes vraies
    pub fn accuracy(&self, truth: &[L]) -> f64 {
        if truth.is_empty() {
            return 0.0;
        }
        let hits = self
            .predictions
            .iter()
            .zip(truth)
            .filter(|(p, t)| p == t)
            .count();
        hits as f64 / truth.len() as f64
    }
}

/// Entraîne un modèle par pli et prédit les lignes de validation de ce pli
pub fn out_of_fold_predictions<L: Label>(
    x: &FeatureMatrix,
    y: &[L],
    k: usize,
    fold_seed: u64,
    params: &ForestParams,
) -> Result<OutOfFold<L>> {
    let n = x.n_rows();
    let folds = kfold(n, k, fold_seed)?;

    let mut predictions: Vec<Option<L>> = vec![None; n];

    for (f, fold) in folds.iter().enumerate() {
        let train_x = x.select(&fold.train);
        let train_y: Vec<L> = fold.train.iter().map(|&i| y[i]).collect();

        let model = RandomForest::fit(&train_x, &train_y, params)?;

        let validate_x = x.select(&fold.validate);
        for (&i, predicted) in fold.validate.iter().zip(model.predict(&validate_x)?) {
            predictions[i] = Some(predicted);
        }

        debug!(
            fold = f,
            train = fold.train.len(),
            validate = fold.validate.len(),
            "Out-of-fold model fitted"
        );
    }

    // Chaque ligne appartient à exactement un pli de validation
    let predictions = predictions
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            p.ok_or_else(|| {
                FireRiskError::InvalidParameter(format!("row {} is in no validation fold", i))
            })
        })
        .collect::<Result<Vec<L>>>()?;

    Ok(OutOfFold { predictions, folds })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_partition_rows() {
        let folds = kfold(23, 5, 42).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0usize; 23];
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.validate.len(), 23);
            for &i in &fold.validate {
                seen[i] += 1;
                assert!(!fold.train.contains(&i));
            }
        }
        assert!(seen.iter().all(|&c| c == 1));

        // 23 = 5*4 + 3 : trois plis de 5, deux de 4
        let sizes: Vec<usize> = folds.iter().map(|f| f.validate.len()).collect();
        assert_eq!(sizes, vec![5, 5, 5, 4, 4]);
    }

    #[test]
    fn test_folds_are_seeded() {
        assert_eq!(kfold(30, 5, 42).unwrap(), kfold(30, 5, 42).unwrap());
        assert_ne!(kfold(30, 5, 42).unwrap(), kfold(30, 5, 43).unwrap());
    }

    #[test]
    fn test_too_few_rows() {
        assert!(matches!(
            kfold(3, 5, 1),
            Err(FireRiskError::InsufficientData(_))
        ));
        assert!(kfold(10, 1, 1).is_err());
    }

    #[test]
    fn test_out_of_fold_covers_every_row() {
        let mut x = FeatureMatrix::new(2);
        let mut y = Vec::new();
        for i in 0..50 {
            let v = i as f64;
            x.push_row(&[v, 50.0 - v]);
            y.push(if i < 25 { 1u8 } else { 2u8 });
        }

        let oof = out_of_fold_predictions(&x, &y, 5, 42, &ForestParams::new(10, 42)).unwrap();
        assert_eq!(oof.predictions.len(), 50);
        assert!(oof.accuracy(&y) > 0.8);
    }

    /// Grille 8×8 de classe 1 avec trois lignes isolées d'étiquette unique
    fn grid_with_isolated_rows() -> (FeatureMatrix, Vec<u8>, Vec<usize>) {
        let mut x = FeatureMatrix::new(2);
        let mut y = Vec::new();
        let mut isolated = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                let label = match (i, j) {
                    (2, 2) => 2,
                    (5, 3) => 3,
                    (3, 6) => 4,
                    _ => 1,
                };
                if label != 1 {
                    isolated.push(y.len());
                }
                x.push_row(&[i as f64, j as f64]);
                y.push(label);
            }
        }
        (x, y, isolated)
    }

    #[test]
    fn test_out_of_fold_prediction_never_sees_its_row() {
        let (x, y, isolated) = grid_with_isolated_rows();
        let params = ForestParams {
            max_features: Some(2),
            ..ForestParams::new(15, 7)
        };

        // Une forêt entraînée sur toutes les lignes restitue les lignes isolées
        let full = RandomForest::fit(&x, &y, &params).unwrap();
        for &i in &isolated {
            assert_eq!(full.predict_row(x.row(i)).unwrap(), y[i]);
        }

        // Hors-pli, le modèle qui prédit une ligne isolée n'a jamais vu son étiquette
        let oof = out_of_fold_predictions(&x, &y, 4, 42, &params).unwrap();
        for &i in &isolated {
            assert_ne!(oof.predictions[i], y[i]);
        }
        for fold in &oof.folds {
            assert!(fold.validate.iter().all(|i| !fold.train.contains(i)));
        }
    }
}
