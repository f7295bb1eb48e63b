//! Types de données pour le crate firerisk

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{FireRiskError, Result};

/// Point géographique (WGS84, degrés)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Point `geo` en ordre (x = lon, y = lat)
    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }
}

/// Emprise géographique (degrés)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Vérifie que l'emprise est finie et non inversée
    pub fn validate(&self) -> Result<()> {
        let values = [self.west, self.south, self.east, self.north];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FireRiskError::InvalidParameter(format!(
                "bounding box has non-finite coordinates: {self}"
            )));
        }
        if self.west >= self.east || self.south >= self.north {
            return Err(FireRiskError::InvalidParameter(format!(
                "bounding box is empty or inverted: {self}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BoundingBox {
    /// Format `west,south,east,north` attendu par le flux FIRMS
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// Classe de densité de végétation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VegetationClass {
    HighVegetation,
    MediumVegetation,
    LowVegetation,
    Urban,
}

/// Table fixe classe ↔ code ↔ nom
const VEGETATION_TABLE: [(VegetationClass, u8, &str); 4] = [
    (VegetationClass::HighVegetation, 1, "High_Vegetation"),
    (VegetationClass::MediumVegetation, 2, "Medium_Vegetation"),
    (VegetationClass::LowVegetation, 3, "Low_Vegetation"),
    (VegetationClass::Urban, 4, "Urban"),
];

impl VegetationClass {
    pub const ALL: [VegetationClass; 4] = [
        VegetationClass::HighVegetation,
        VegetationClass::MediumVegetation,
        VegetationClass::LowVegetation,
        VegetationClass::Urban,
    ];

    pub fn code(self) -> u8 {
        VEGETATION_TABLE
            .iter()
            .find(|(class, _, _)| *class == self)
            .map(|(_, code, _)| *code)
            .unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        VEGETATION_TABLE
            .iter()
            .find(|(class, _, _)| *class == self)
            .map(|(_, _, name)| *name)
            .unwrap_or_default()
    }

    pub fn from_code(code: u8) -> Option<Self> {
        VEGETATION_TABLE
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(class, _, _)| *class)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        VEGETATION_TABLE
            .iter()
            .find(|(_, _, n)| *n == name)
            .map(|(class, _, _)| *class)
    }
}

impl From<VegetationClass> for u8 {
    fn from(class: VegetationClass) -> Self {
        class.code()
    }
}

impl TryFrom<u8> for VegetationClass {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("invalid vegetation code: {code}"))
    }
}

impl fmt::Display for VegetationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classe de risque d'incendie (ordinale, du plus faible au plus fort)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RiskClass {
    VeryLow,
    Low,
    Medium,
    High,
}

/// Code réservé au libellé "Unknown" des données historiques
pub const UNKNOWN_RISK_CODE: u8 = 0;
pub const UNKNOWN_RISK_NAME: &str = "Unknown";

const RISK_TABLE: [(RiskClass, u8, &str); 4] = [
    (RiskClass::VeryLow, 1, "Very Low"),
    (RiskClass::Low, 2, "Low"),
    (RiskClass::Medium, 3, "Medium"),
    (RiskClass::High, 4, "High"),
];

impl RiskClass {
    /// Toutes les classes, du risque le plus faible au plus fort
    pub const ALL: [RiskClass; 4] = [
        RiskClass::VeryLow,
        RiskClass::Low,
        RiskClass::Medium,
        RiskClass::High,
    ];

    pub fn code(self) -> u8 {
        RISK_TABLE
            .iter()
            .find(|(class, _, _)| *class == self)
            .map(|(_, code, _)| *code)
            .unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        RISK_TABLE
            .iter()
            .find(|(class, _, _)| *class == self)
            .map(|(_, _, name)| *name)
            .unwrap_or_default()
    }

    pub fn from_code(code: u8) -> Option<Self> {
        RISK_TABLE
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(class, _, _)| *class)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        RISK_TABLE
            .iter()
            .find(|(_, _, n)| *n == name)
            .map(|(class, _, _)| *class)
    }
}

impl From<RiskClass> for u8 {
    fn from(class: RiskClass) -> Self {
        class.code()
    }
}

impl TryFrom<u8> for RiskClass {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("invalid fire risk code: {code}"))
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Libellé de risque tel qu'il apparaît dans les données historiques
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireRiskLabel {
    Known(RiskClass),
    Unknown,
}

impl FireRiskLabel {
    /// Tout libellé non reconnu est traité comme "Unknown"
    pub fn parse(name: &str) -> Self {
        RiskClass::from_name(name)
            .map(Self::Known)
            .unwrap_or(Self::Unknown)
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Known(class) => class.code(),
            Self::Unknown => UNKNOWN_RISK_CODE,
        }
    }

    pub fn known(self) -> Option<RiskClass> {
        match self {
            Self::Known(class) => Some(class),
            Self::Unknown => None,
        }
    }
}

/// Grille candidate : points au pas fixe, découpés par la frontière
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateGrid {
    /// Points dans l'ordre latitude puis longitude
    pub points: Vec<GeoPoint>,

    /// Pas angulaire (degrés)
    pub step_deg: f64,
}

impl CandidateGrid {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Point de grille annoté par le modèle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub point: GeoPoint,
    pub vegetation: VegetationClass,
    pub risk: RiskClass,
}

/// Grille annotée (une végétation et un risque par point)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredGrid {
    pub points: Vec<ScoredPoint>,
}

impl ScoredGrid {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredPoint> {
        self.points.iter()
    }

    /// Nombre de points par classe de risque (classes absentes incluses à 0)
    pub fn risk_counts(&self) -> BTreeMap<RiskClass, usize> {
        let mut counts: BTreeMap<RiskClass, usize> =
            RiskClass::ALL.iter().map(|class| (*class, 0)).collect();
        for scored in &self.points {
            *counts.entry(scored.risk).or_insert(0) += 1;
        }
        counts
    }
}

/// Détection satellite de feu actif
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotObservation {
    pub point: GeoPoint,

    /// Date/heure d'acquisition (UTC) si fournie par le flux
    pub acquired_at: Option<NaiveDateTime>,

    /// Source interrogée (ex: VIIRS_NOAA21_NRT)
    pub source: String,

    pub satellite: Option<String>,
    pub instrument: Option<String>,
    pub confidence: Option<String>,

    /// Puissance radiative du feu (MW)
    pub frp: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vegetation_table_is_bidirectional() {
        for class in VegetationClass::ALL {
            assert_eq!(VegetationClass::from_code(class.code()), Some(class));
            assert_eq!(VegetationClass::from_name(class.name()), Some(class));
        }
        assert_eq!(VegetationClass::Urban.code(), 4);
        assert_eq!(VegetationClass::from_code(0), None);
    }

    #[test]
    fn test_risk_table_is_bidirectional() {
        for class in RiskClass::ALL {
            assert_eq!(RiskClass::from_code(class.code()), Some(class));
            assert_eq!(RiskClass::from_name(class.name()), Some(class));
        }
        assert_eq!(RiskClass::from_name("Very Low"), Some(RiskClass::VeryLow));
        assert!(RiskClass::High > RiskClass::Medium);
    }

    #[test]
    fn test_unknown_label() {
        assert_eq!(FireRiskLabel::parse("Unknown"), FireRiskLabel::Unknown);
        assert_eq!(FireRiskLabel::parse("Unknown").code(), 0);
        assert_eq!(
            FireRiskLabel::parse(" High "),
            FireRiskLabel::Known(RiskClass::High)
        );
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&RiskClass::Medium).unwrap();
        assert_eq!(json, "3");
        let veg: VegetationClass = serde_json::from_str("2").unwrap();
        assert_eq!(veg, VegetationClass::MediumVegetation);
        assert!(serde_json::from_str::<RiskClass>("0").is_err());
    }

    #[test]
    fn test_bbox_display_and_validate() {
        let bbox = BoundingBox::new(20.2, 43.6, 29.7, 48.3);
        assert_eq!(bbox.to_string(), "20.2,43.6,29.7,48.3");
        assert!(bbox.validate().is_ok());
        assert!(BoundingBox::new(29.7, 43.6, 20.2, 48.3).validate().is_err());
    }
}
