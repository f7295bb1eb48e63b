//! Forêt aléatoire de classification (smartcore)
//!
//! Arbres CART (Gini) sur échantillons bootstrap, ⌊√n⌋ features tirées à
//! chaque split, vote majoritaire. Les égalités reviennent à la classe de plus
//! petit code : les étiquettes sont encodées par leur rang dans la liste triée
//! des classes vues. La graine fixe rend l'entraînement reproductible.
//!
//! smartcore refuse un apprentissage à une seule classe : la forêt devient
//! alors une prédiction constante.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

use crate::error::{FireRiskError, Result};

/// Étiquette de classe utilisable par la forêt
pub trait Label: Copy + Ord + Serialize + DeserializeOwned {}

impl<T: Copy + Ord + Serialize + DeserializeOwned> Label for T {}

type Classifier = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// Matrice de features dense, ligne par ligne
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    n_cols: usize,
}

impl FeatureMatrix {
    pub fn new(n_cols: usize) -> Self {
        Self {
            data: Vec::new(),
            n_cols,
        }
    }

    pub fn with_capacity(n_cols: usize, rows: usize) -> Self {
        Self {
            data: Vec::with_capacity(n_cols * rows),
            n_cols,
        }
    }

    /// Ajoute une ligne (doit contenir exactement `n_cols` valeurs)
    pub fn push_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.n_cols);
        self.data.extend_from_slice(row);
    }

    pub fn n_rows(&self) -> usize {
        if self.n_cols == 0 {
            0
        } else {
            self.data.len() / self.n_cols
        }
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Sous-matrice des lignes données (dans l'ordre donné)
    pub fn select(&self, rows: &[usize]) -> Self {
        let mut out = Self::with_capacity(self.n_cols, rows.len());
        for &i in rows {
            out.push_row(self.row(i));
        }
        out
    }

    fn to_dense(&self) -> DenseMatrix<f64> {
        DenseMatrix::new(self.n_rows(), self.n_cols, self.data.clone(), false)
    }
}

/// Features examinées à chaque split : ⌊√n⌋, au moins une
pub fn features_per_split(n_features: usize) -> usize {
    ((n_features as f64).sqrt().floor() as usize).clamp(1, n_features.max(1))
}

/// Hyperparamètres d'une forêt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,

    /// Profondeur maximale (`None` = arbres développés jusqu'aux feuilles pures)
    pub max_depth: Option<usize>,

    /// Features par split (`None` = ⌊√n⌋)
    pub max_features: Option<usize>,
}

impl ForestParams {
    pub fn new(n_trees: usize, seed: u64) -> Self {
        Self {
            n_trees,
            seed,
            ..Self::default()
        }
    }

    fn to_smartcore(self, n_features: usize) -> Result<RandomForestClassifierParameters> {
        let n_trees = u16::try_from(self.n_trees).map_err(|_| {
            FireRiskError::InvalidParameter(format!(
                "at most {} trees per forest, got {}",
                u16::MAX,
                self.n_trees
            ))
        })?;

        let m = self
            .max_features
            .unwrap_or_else(|| features_per_split(n_features))
            .clamp(1, n_features.max(1));

        let mut params = RandomForestClassifierParameters::default()
            .with_n_trees(n_trees)
            .with_m(m)
            .with_seed(self.seed);

        if let Some(depth) = self.max_depth {
            let depth = u16::try_from(depth).map_err(|_| {
                FireRiskError::InvalidParameter(format!("max depth {} is too large", depth))
            })?;
            params = params.with_max_depth(depth);
        }

        Ok(params)
    }
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: None,
            max_features: None,
        }
    }
}

/// Forêt entraînée
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "L: DeserializeOwned"))]
pub struct RandomForest<L: Label> {
    /// Classes vues à l'entraînement, triées ; la forêt prédit leur rang
    classes: Vec<L>,
    n_features: usize,
    n_trees: usize,

    /// `None` si une seule classe a été vue
    classifier: Option<Classifier>,
}

impl<L: Label> RandomForest<L> {
    /// Entraîne la forêt
    ///
    /// # Errors
    ///
    /// `InsufficientData` si aucune ligne n'est fournie, `InvalidParameter` si
    /// les dimensions ou les hyperparamètres sont invalides.
    pub fn fit(x: &FeatureMatrix, y: &[L], params: &ForestParams) -> Result<Self> {
        let n = x.n_rows();
        if n == 0 {
            return Err(FireRiskError::InsufficientData(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }
        if y.len() != n {
            return Err(FireRiskError::InvalidParameter(format!(
                "{} feature rows but {} labels",
                n,
                y.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(FireRiskError::InvalidParameter(
                "a forest needs at least one tree".to_string(),
            ));
        }

        let mut classes: Vec<L> = y.to_vec();
        classes.sort();
        classes.dedup();

        let ranks: Vec<u32> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default() as u32)
            .collect();

        let smartcore_params = params.to_smartcore(x.n_cols())?;
        let classifier = if classes.len() > 1 {
            let fitted = Classifier::fit(&x.to_dense(), &ranks, smartcore_params)
                .map_err(|e| FireRiskError::Classifier(e.to_string()))?;
            Some(fitted)
        } else {
            None
        };

        debug!(
            rows = n,
            features = x.n_cols(),
            classes = classes.len(),
            trees = params.n_trees,
            "Forest fitted"
        );

        Ok(Self {
            classes,
            n_features: x.n_cols(),
            n_trees: params.n_trees,
            classifier,
        })
    }

    /// Classes prédites pour toutes les lignes
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<L>> {
        if x.n_cols() != self.n_features {
            return Err(FireRiskError::InvalidParameter(format!(
                "forest expects {} features, got {}",
                self.n_features,
                x.n_cols()
            )));
        }
        if x.n_rows() == 0 {
            return Ok(Vec::new());
        }

        let Some(classifier) = &self.classifier else {
            return self
                .classes
                .first()
                .map(|only| vec![*only; x.n_rows()])
                .ok_or_else(|| FireRiskError::Classifier("forest has no classes".to_string()));
        };

        let ranks = classifier
            .predict(&x.to_dense())
            .map_err(|e| FireRiskError::Classifier(e.to_string()))?;

        ranks
            .into_iter()
            .map(|rank| {
                self.classes.get(rank as usize).copied().ok_or_else(|| {
                    FireRiskError::Classifier(format!("predicted class rank {} is unknown", rank))
                })
            })
            .collect()
    }

    /// Classe prédite pour une ligne
    pub fn predict_row(&self, row: &[f64]) -> Result<L> {
        let mut x = FeatureMatrix::with_capacity(row.len(), 1);
        x.push_row(row);
        let mut predicted = self.predict(&x)?;
        predicted
            .pop()
            .ok_or_else(|| FireRiskError::Classifier("no prediction returned".to_string()))
    }

    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Vérifie la cohérence d'une forêt relue depuis le disque
    pub fn validate(&self, expected_features: usize) -> Result<(), String> {
        if self.n_features != expected_features {
            return Err(format!(
                "forest expects {} features, pipeline provides {}",
                self.n_features, expected_features
            ));
        }
        if self.classes.is_empty() || self.n_trees == 0 {
            return Err("forest has no classes or no trees".to_string());
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err("forest classes are not strictly sorted".to_string());
        }
        if self.classifier.is_some() != (self.classes.len() > 1) {
            return Err("classifier does not match the class count".to_string());
        }

        // Le classifieur relu doit répondre avec un rang connu
        let origin = vec![0.0; self.n_features];
        self.predict_row(&origin)
            .map(|_| ())
            .map_err(|e| format!("classifier is unusable: {}", e))
    }
}
