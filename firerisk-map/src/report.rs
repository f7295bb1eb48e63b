//! Rapport d'exécution du pipeline
//!
//! Collecte les compteurs de chaque étape, l'évaluation éventuelle et les
//! avertissements non bloquants (flux indisponible par exemple).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use firerisk::model::TrainingSummary;
use firerisk::{Evaluation, RiskClass, ScoredGrid};

/// Statut global de l'exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Toutes les étapes ont abouti
    Success,
    /// Étapes principales abouties, étape optionnelle dégradée
    Degraded,
}

/// Rapport complet d'une exécution
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub region: String,
    pub duration_secs: f64,
    pub status: RunStatus,

    /// Statistiques d'entraînement (si le modèle a été entraîné)
    pub training: Option<TrainingSummary>,

    /// Points de la grille candidate
    pub grid_points: usize,

    /// Points par classe de risque (libellé → effectif)
    pub risk_counts: BTreeMap<String, usize>,

    /// Points après sous-échantillonnage
    pub sampled_points: usize,

    /// Parties de polygone par zone (libellé → parties)
    pub zones: BTreeMap<String, usize>,

    /// Détections retenues dans le pays
    pub hotspots: Option<usize>,

    pub evaluation: Option<Evaluation>,

    /// Fichiers écrits
    pub outputs: Vec<String>,

    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            duration_secs: 0.0,
            status: RunStatus::Success,
            training: None,
            grid_points: 0,
            risk_counts: BTreeMap::new(),
            sampled_points: 0,
            zones: BTreeMap::new(),
            hotspots: None,
            evaluation: None,
            outputs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Enregistre la grille annotée
    pub fn record_scored(&mut self, scored: &ScoredGrid) {
        self.grid_points = scored.len();
        self.risk_counts = scored
            .risk_counts()
            .into_iter()
            .map(|(class, n)| (class.name().to_string(), n))
            .collect();
    }

    /// Enregistre le nombre de parties d'une zone
    pub fn record_zone(&mut self, class: RiskClass, parts: usize) {
        self.zones.insert(class.name().to_string(), parts);
    }

    pub fn record_output(&mut self, path: &Path) {
        self.outputs.push(path.display().to_string());
    }

    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Définit la durée de l'exécution
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.warnings.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Degraded
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("FIRE RISK REPORT - {}", self.region);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        if let Some(ref t) = self.training {
            println!("\n--- TRAINING ---");
            println!(
                "Rows: {} total, {} labeled, {} used ({} folds)",
                t.rows_total, t.rows_labeled, t.rows_used, t.folds
            );
            println!("Out-of-fold vegetation accuracy: {:.3}", t.oof_vegetation_accuracy);
        }

        println!("\n--- GRID ---");
        println!(
            "Points: {} scored, {} sampled",
            self.grid_points, self.sampled_points
        );
        for (name, n) in &self.risk_counts {
            println!("  {}: {}", name, n);
        }

        if !self.zones.is_empty() {
            println!("\n--- ZONES ---");
            for (name, parts) in &self.zones {
                println!("  {}: {} part(s)", name, parts);
            }
        }

        if let Some(ref e) = self.evaluation {
            println!("\n--- EVALUATION ---");
            println!(
                "Hotspots: {}, TP={} FP={} FN={}",
                self.hotspots.unwrap_or(0),
                e.tp,
                e.fp,
                e.fn_
            );
            println!("Precision={:.2}, Recall={:.2}", e.precision, e.recall);
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in &self.warnings {
                println!("  {}", w);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        let evaluation = match self.evaluation {
            Some(e) => format!(", precision {:.2}, recall {:.2}", e.precision, e.recall),
            None => String::new(),
        };
        format!(
            "{}: {} points, {} sampled, {} zones{}",
            self.region,
            self.grid_points,
            self.sampled_points,
            self.zones.len(),
            evaluation
        )
    }
}
