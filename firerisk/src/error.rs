//! Types d'erreurs pour le crate firerisk

use thiserror::Error;

/// Erreurs pouvant survenir dans le pipeline de risque d'incendie
#[derive(Debug, Error)]
pub enum FireRiskError {
    /// Frontière du pays absente, vide ou dans un CRS non reconnu
    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),

    /// Entraînement sans lignes étiquetées exploitables
    #[error("Insufficient training data: {0}")]
    InsufficientData(String),

    /// Flux de hotspots injoignable ou réponse malformée
    #[error("Hotspot feed unavailable: {reason}")]
    FeedUnavailable {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Artefact de modèle manquant ou corrompu
    #[error("Model artifact error ({path}): {reason}")]
    ModelArtifact { path: String, reason: String },

    /// Échec du classifieur sous-jacent (apprentissage ou prédiction)
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Paramètre d'appel invalide (pas de grille, bbox, ratio...)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Erreur d'I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FireRiskError {
    /// Crée une erreur de flux sans cause sous-jacente
    pub fn feed(reason: impl Into<String>) -> Self {
        Self::FeedUnavailable {
            reason: reason.into(),
            source: None,
        }
    }

    /// Crée une erreur de flux en conservant la cause
    pub fn feed_with_source(
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::FeedUnavailable {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Crée une erreur d'artefact de modèle avec contexte
    pub fn artifact(path: impl AsRef<std::path::Path>, reason: impl Into<String>) -> Self {
        Self::ModelArtifact {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }

    /// Vrai si l'erreur provient du flux de hotspots (et non d'une absence de détections)
    pub fn is_feed_unavailable(&self) -> bool {
        matches!(self, Self::FeedUnavailable { .. })
    }
}

pub type Result<T, E = FireRiskError> = std::result::Result<T, E>;
