//! Chargement de la table historique d'entraînement (CSV)
//!
//! Colonnes attendues : `Latitude`, `Longitude`, `Vegetation_Density`,
//! `Fire_Risk`. Les autres colonnes sont ignorées.

use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use super::TrainingRow;
use crate::error::{FireRiskError, Result};
use crate::types::{FireRiskLabel, VegetationClass};

const COL_LAT: &str = "Latitude";
const COL_LON: &str = "Longitude";
const COL_VEGETATION: &str = "Vegetation_Density";
const COL_RISK: &str = "Fire_Risk";

/// Charge un fichier CSV historique
pub fn load_csv(path: &Path) -> Result<Vec<TrainingRow>> {
    let file = std::fs::File::open(path)?;
    let rows = read_csv(file)?;
    info!(path = %path.display(), rows = rows.len(), "Training table loaded");
    Ok(rows)
}

/// Lit une table historique depuis un flux CSV
///
/// Un libellé de risque inconnu devient `Unknown` ; une classe de végétation
/// inconnue ou une coordonnée non numérique est une erreur.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<TrainingRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| FireRiskError::InvalidParameter(format!("training table: {}", e)))?
        .clone();

    let column = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            FireRiskError::InvalidParameter(format!("training table has no '{}' column", name))
        })
    };
    let lat_idx = column(COL_LAT)?;
    let lon_idx = column(COL_LON)?;
    let veg_idx = column(COL_VEGETATION)?;
    let risk_idx = column(COL_RISK)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| FireRiskError::InvalidParameter(format!("training table: {}", e)))?;
        // Ligne 1 = en-tête
        let line = line + 2;

        let field = |idx: usize| record.get(idx).unwrap_or("");

        let number = |idx: usize, name: &str| -> Result<f64> {
            field(idx).parse::<f64>().map_err(|_| {
                FireRiskError::InvalidParameter(format!(
                    "line {}: invalid {} '{}'",
                    line,
                    name,
                    field(idx)
                ))
            })
        };

        let lat = number(lat_idx, COL_LAT)?;
        let lon = number(lon_idx, COL_LON)?;

        let vegetation = VegetationClass::from_name(field(veg_idx)).ok_or_else(|| {
            FireRiskError::InvalidParameter(format!(
                "line {}: unknown vegetation class '{}'",
                line,
                field(veg_idx)
            ))
        })?;

        rows.push(TrainingRow {
            lat,
            lon,
            vegetation,
            fire_risk: FireRiskLabel::parse(field(risk_idx)),
        });
    }

    debug!(rows = rows.len(), "Training table parsed");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskClass;

    #[test]
    fn test_read_rows() {
        let text = "Latitude,Longitude,Vegetation_Density,Fire_Risk,Extra\n\
                    45.1,25.2,High_Vegetation,High,x\n\
                    44.0,26.0,Urban,Unknown,y\n\
                    46.5,23.5,Low_Vegetation,Very Low,z\n";
        let rows = read_csv(text.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].vegetation, VegetationClass::HighVegetation);
        assert_eq!(rows[0].fire_risk, FireRiskLabel::Known(RiskClass::High));
        assert_eq!(rows[1].fire_risk, FireRiskLabel::Unknown);
        assert_eq!(rows[2].fire_risk, FireRiskLabel::Known(RiskClass::VeryLow));
        assert_eq!(rows[2].lon, 23.5);
    }

    #[test]
    fn test_unrecognized_risk_is_unknown() {
        let text = "Latitude,Longitude,Vegetation_Density,Fire_Risk\n45,25,Urban,Extreme\n";
        let rows = read_csv(text.as_bytes()).unwrap();
        assert_eq!(rows[0].fire_risk, FireRiskLabel::Unknown);
    }

    #[test]
    fn test_unknown_vegetation_rejected() {
        let text = "Latitude,Longitude,Vegetation_Density,Fire_Risk\n45,25,Desert,High\n";
        let err = read_csv(text.as_bytes()).unwrap_err();
        assert!(matches!(err, FireRiskError::InvalidParameter(ref m) if m.contains("line 2")));
    }

    #[test]
    fn test_missing_column() {
        let text = "Latitude,Longitude,Fire_Risk\n45,25,High\n";
        assert!(read_csv(text.as_bytes()).is_err());
    }
}
