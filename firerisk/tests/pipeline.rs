//! Tests d'intégration du pipeline : entraînement, persistance, annotation,
//! évaluation, échantillonnage et zones

use std::collections::{BTreeMap, BTreeSet};

use firerisk::model::kfold;
use firerisk::sampler::{default_weights, sample};
use firerisk::types::{FireRiskLabel, UNKNOWN_RISK_NAME};
use firerisk::{
    build_zones, evaluate, grid, score, BoundingBox, CandidateGrid, CountryBoundary,
    FireRiskError, GeoPoint, HotspotObservation, Predictor, RiskClass, RiskModel, ScoredGrid,
    TrainingParams, TrainingRow, VegetationClass,
};
use geo::{polygon, MultiPolygon};

/// Végétation dense à l'ouest de 25°E, urbaine à l'est ; risque élevé au nord de 46°N
fn synthetic_rows() -> Vec<TrainingRow> {
    let mut rows = Vec::new();
    for i in 0..12 {
        for j in 0..16 {
            let lat = 44.0 + i as f64 * 0.35;
            let lon = 21.0 + j as f64 * 0.5;
            let vegetation = if lon < 25.0 {
                VegetationClass::HighVegetation
            } else {
                VegetationClass::Urban
            };
            let fire_risk = if lat > 46.0 {
                FireRiskLabel::Known(RiskClass::High)
            } else {
                FireRiskLabel::Known(RiskClass::VeryLow)
            };
            rows.push(TrainingRow {
                lat,
                lon,
                vegetation,
                fire_risk,
            });
        }
    }
    // Quelques lignes sans étiquette, ignorées
    rows.push(TrainingRow {
        lat: 45.0,
        lon: 25.0,
        vegetation: VegetationClass::MediumVegetation,
        fire_risk: FireRiskLabel::parse(UNKNOWN_RISK_NAME),
    });
    rows
}

fn fast_params() -> TrainingParams {
    TrainingParams {
        fold_trees: 10,
        vegetation_trees: 20,
        fire_trees: 30,
        ..TrainingParams::default()
    }
}

fn romania_box() -> CountryBoundary {
    let poly = polygon![
        (x: 20.5, y: 43.7),
        (x: 29.5, y: 43.7),
        (x: 29.5, y: 48.2),
        (x: 20.5, y: 48.2),
        (x: 20.5, y: 43.7),
    ];
    CountryBoundary::from_geometry("Romania", MultiPolygon::new(vec![poly]), 4326).unwrap()
}

fn hotspot(lat: f64, lon: f64) -> HotspotObservation {
    HotspotObservation {
        point: GeoPoint::new(lat, lon),
        acquired_at: None,
        source: "VIIRS_NOAA21_NRT".to_string(),
        satellite: None,
        instrument: None,
        confidence: None,
        frp: None,
    }
}

/// Modèle factice : tout est à risque élevé
struct AllHigh;

impl Predictor for AllHigh {
    fn predict(&self, points: &[GeoPoint]) -> firerisk::Result<Vec<(VegetationClass, RiskClass)>> {
        Ok(vec![(VegetationClass::HighVegetation, RiskClass::High); points.len()])
    }
}

#[test]
fn test_four_point_scenario() {
    let grid = CandidateGrid {
        points: vec![
            GeoPoint::new(45.0, 25.0),
            GeoPoint::new(45.05, 25.0),
            GeoPoint::new(45.0, 25.05),
            GeoPoint::new(45.05, 25.05),
        ],
        step_deg: 0.05,
    };
    let scored = score(&grid, &AllHigh).unwrap();
    let e = evaluate(&scored, &[hotspot(45.0, 25.0)], RiskClass::High, 6000.0).unwrap();

    assert!(e.tp >= 1);
    assert_eq!(e.fn_, 0);
    assert_eq!(e.tp + e.fp, 4);
    assert!(e.precision.is_finite() && e.precision > 0.0);
    assert_eq!(e.recall, 1.0);
}

#[test]
fn test_single_class_sampling_scenario() {
    let scored = ScoredGrid {
        points: (0..100)
            .map(|i| firerisk::ScoredPoint {
                point: GeoPoint::new(45.0, 20.0 + i as f64 * 0.05),
                vegetation: VegetationClass::LowVegetation,
                risk: RiskClass::VeryLow,
            })
            .collect(),
    };
    let weights: BTreeMap<RiskClass, f64> = [(RiskClass::VeryLow, 7.0)].into_iter().collect();

    let out = sample(&scored, 0.4, &weights, 42).unwrap();
    assert_eq!(out.len(), 40);
    assert!(out.iter().all(|p| p.risk == RiskClass::VeryLow));
}

#[test]
fn test_all_unknown_training_fails() {
    let rows: Vec<TrainingRow> = (0..20)
        .map(|i| TrainingRow {
            lat: 45.0 + i as f64 * 0.1,
            lon: 25.0,
            vegetation: VegetationClass::Urban,
            fire_risk: FireRiskLabel::Unknown,
        })
        .collect();

    let err = RiskModel::train(&rows, &fast_params()).unwrap_err();
    assert!(matches!(err, FireRiskError::InsufficientData(_)));
}

#[test]
fn test_oof_folds_never_see_their_rows() {
    let folds = kfold(192, 5, 42).unwrap();
    let mut validated = BTreeSet::new();
    for fold in &folds {
        let train: BTreeSet<usize> = fold.train.iter().copied().collect();
        assert!(fold.validate.iter().all(|i| !train.contains(i)));
        validated.extend(fold.validate.iter().copied());
    }
    assert_eq!(validated.len(), 192);
}

#[test]
fn test_train_save_load_score() {
    let rows = synthetic_rows();
    let (model, summary) = RiskModel::train_detailed(&rows, &fast_params()).unwrap();

    assert_eq!(summary.rows_total, 193);
    assert_eq!(summary.rows_labeled, 192);
    assert_eq!(summary.folds, 5);
    assert!(summary.oof_vegetation_accuracy > 0.9);

    let sites = [GeoPoint::new(47.5, 22.0), GeoPoint::new(44.5, 28.0)];
    let predictions = model.predict(&sites).unwrap();
    assert_eq!(
        predictions[0],
        (VegetationClass::HighVegetation, RiskClass::High)
    );
    assert_eq!(predictions[1], (VegetationClass::Urban, RiskClass::VeryLow));

    // Persistance : relecture exacte
    let dir = tempfile::tempdir().unwrap();
    model.save(dir.path()).unwrap();
    let loaded = RiskModel::load(dir.path()).unwrap();
    assert_eq!(loaded, model);

    // Annotation : idempotente, groupée = point par point
    let boundary = romania_box();
    let bbox = BoundingBox::new(20.2, 43.6, 29.7, 48.3);
    let candidates = grid::generate(&bbox, 0.25, &boundary).unwrap();
    assert!(candidates
        .points
        .iter()
        .all(|p| boundary.intersects(*p)));

    let first = score(&candidates, &loaded).unwrap();
    let second = score(&candidates, &loaded).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), candidates.len());

    for (i, p) in candidates.points.iter().enumerate().step_by(17) {
        let single = loaded.predict(std::slice::from_ref(p)).unwrap();
        assert_eq!(single[0], (first.points[i].vegetation, first.points[i].risk));
    }

    // Zones : une par classe présente
    let zones = build_zones(&first, 0.25, 0.0, 0.95).unwrap();
    let present: BTreeSet<RiskClass> = first.iter().map(|p| p.risk).collect();
    assert_eq!(zones.keys().copied().collect::<BTreeSet<_>>(), present);

    // Échantillonnage
    let sampled = sample(&first, 0.4, &default_weights(), 42).unwrap();
    assert_eq!(sampled.len(), (0.4 * first.len() as f64).ceil() as usize);
}

#[test]
fn test_corrupted_artifact_is_rejected() {
    let model = RiskModel::train(&synthetic_rows(), &fast_params()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    model.save(dir.path()).unwrap();

    let path = dir.path().join(firerisk::model::FIRE_ARTIFACT);
    let mut bytes = std::fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x55;
    std::fs::write(&path, bytes).unwrap();

    let err = RiskModel::load(dir.path()).unwrap_err();
    assert!(matches!(err, FireRiskError::ModelArtifact { .. }));

    // Le classifieur de végétation reste lisible seul
    let vegetation =
        firerisk::model::load_vegetation(&dir.path().join(firerisk::model::VEGETATION_ARTIFACT))
            .unwrap();
    assert_eq!(vegetation, *model.vegetation());
}

#[test]
fn test_artifacts_from_two_trainings_are_not_mixed() {
    let rows = synthetic_rows();
    let first = RiskModel::train(&rows, &fast_params()).unwrap();
    let second = RiskModel::train(
        &rows,
        &TrainingParams {
            fire_trees: 31,
            seed: 7,
            ..fast_params()
        },
    )
    .unwrap();

    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    first.save(a.path()).unwrap();
    second.save(b.path()).unwrap();

    std::fs::copy(
        b.path().join(firerisk::model::FIRE_ARTIFACT),
        a.path().join(firerisk::model::FIRE_ARTIFACT),
    )
    .unwrap();

    match RiskModel::load(a.path()).unwrap_err() {
        FireRiskError::ModelArtifact { reason, .. } => {
            assert!(reason.contains("different trainings"), "{reason}")
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Chaque fichier reste lisible isolément
    let fire = firerisk::model::load_fire_risk(&a.path().join(firerisk::model::FIRE_ARTIFACT))
        .unwrap();
    assert_eq!(fire, *second.fire_risk());
    assert_eq!(RiskModel::load(b.path()).unwrap(), second);
    assert!(!a.path().join("fire_rf.bin.tmp").exists());
}
