//! Configuration du système

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use firerisk::boundary::DEFAULT_NAME_ATTRIBUTE;
use firerisk::evaluate::{DEFAULT_BUFFER_METERS, DEFAULT_HIGH_RISK_THRESHOLD};
use firerisk::grid::DEFAULT_STEP_DEG;
use firerisk::hotspots::DEFAULT_LOOKBACK_DAYS;
use firerisk::sampler::{default_weights, DEFAULT_RATIO, DEFAULT_SEED};
use firerisk::zones::DEFAULT_FILL_MARGIN;
use firerisk::{BoundingBox, FeedConfig, RiskClass, TrainingParams};

/// Variable d'environnement portant la clé d'API FIRMS
pub const API_KEY_ENV: &str = "FIRMS_MAP_KEY";

/// Configuration principale
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub region: RegionConfig,
    pub grid: GridConfig,
    pub feed: FeedSection,
    pub evaluation: EvaluationConfig,
    pub sampling: SamplingConfig,
    pub zones: ZoneConfig,
    pub training: TrainingParams,
    pub paths: PathsConfig,
}

/// Pays cible dans le fichier de frontières
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Valeur de l'attribut qui sélectionne le pays
    pub name: String,

    /// Attribut portant le nom du pays
    pub attribute: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: "Romania".to_string(),
            attribute: DEFAULT_NAME_ATTRIBUTE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    pub bbox: BoundingBox,
    pub step_deg: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::new(20.2, 43.6, 29.7, 48.3),
            step_deg: DEFAULT_STEP_DEG,
        }
    }
}

/// Flux de hotspots et fenêtre d'évaluation
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedSection {
    #[serde(flatten)]
    pub client: FeedConfig,

    pub lookback_days: u32,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            client: FeedConfig::default(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub buffer_meters: f64,

    /// Classe à partir de laquelle un point est signalé
    pub high_risk_threshold: RiskClass,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            buffer_meters: DEFAULT_BUFFER_METERS,
            high_risk_threshold: DEFAULT_HIGH_RISK_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub ratio: f64,

    /// Poids par code de classe (1 par défaut pour une classe absente)
    pub weights: BTreeMap<RiskClass, f64>,

    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_RATIO,
            weights: default_weights(),
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub fill_margin: f64,

    /// Tolérance de simplification (m), 0 = pas de simplification
    pub simplify_meters: f64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            fill_margin: DEFAULT_FILL_MARGIN,
            simplify_meters: 0.0,
        }
    }
}

/// Chemins par défaut, surchargeables en ligne de commande
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// FeatureCollection des frontières
    pub boundary: PathBuf,

    /// Table historique (CSV)
    pub training_table: PathBuf,

    /// Répertoire des artefacts de modèle
    pub model_dir: PathBuf,

    /// Répertoire des GeoJSON produits
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            boundary: PathBuf::from("countries.geojson"),
            training_table: PathBuf::from("fire_data.csv"),
            model_dir: PathBuf::from("models"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "romania" => Self::load_embedded(include_str!("presets/romania.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: romania", preset),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }

    /// Fichier JSON s'il est donné, preset sinon
    pub fn resolve(path: Option<&Path>, preset: &str) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::from_preset(preset),
        }
    }

    /// Renseigne la clé d'API depuis l'environnement si elle n'est pas déjà fixée
    pub fn with_env(mut self) -> Self {
        if self.feed.client.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.feed.client.api_key = key.trim().to_string();
            }
        }
        self
    }

    /// Vrai si une clé d'API est disponible pour le flux
    pub fn has_api_key(&self) -> bool {
        !self.feed.client.api_key.is_empty()
    }
}
