//! Benchmarks pour la génération et l'annotation de grille

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::{polygon, MultiPolygon};

use firerisk::{
    grid, score, BoundingBox, CountryBoundary, FireRiskLabel, RiskClass, RiskModel,
    TrainingParams, TrainingRow, VegetationClass,
};

fn boundary() -> CountryBoundary {
    let poly = polygon![
        (x: 20.2, y: 43.6),
        (x: 29.7, y: 43.6),
        (x: 29.7, y: 48.3),
        (x: 20.2, y: 48.3),
        (x: 20.2, y: 43.6),
    ];
    CountryBoundary::from_geometry("Romania", MultiPolygon::new(vec![poly]), 4326).unwrap()
}

fn model() -> RiskModel {
    let mut rows = Vec::new();
    for i in 0..20 {
        for j in 0..20 {
            let lat = 43.6 + i as f64 * 0.23;
            let lon = 20.2 + j as f64 * 0.47;
            let vegetation = VegetationClass::ALL[(i + j) % 4];
            let risk = RiskClass::ALL[(i * 3 + j) % 4];
            rows.push(TrainingRow {
                lat,
                lon,
                vegetation,
                fire_risk: FireRiskLabel::Known(risk),
            });
        }
    }
    let params = TrainingParams {
        fold_trees: 10,
        vegetation_trees: 50,
        fire_trees: 50,
        ..TrainingParams::default()
    };
    RiskModel::train(&rows, &params).unwrap()
}

fn bench_generate(c: &mut Criterion) {
    let boundary = boundary();
    let bbox = BoundingBox::new(20.2, 43.6, 29.7, 48.3);

    let mut group = c.benchmark_group("grid_generate");
    for step in [0.2, 0.1, 0.05] {
        group.bench_with_input(BenchmarkId::from_parameter(step), &step, |b, step| {
            b.iter(|| grid::generate(black_box(&bbox), *step, &boundary).unwrap())
        });
    }
    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let boundary = boundary();
    let bbox = BoundingBox::new(20.2, 43.6, 29.7, 48.3);
    let model = model();

    let mut group = c.benchmark_group("grid_score");
    for step in [0.2, 0.1] {
        let candidates = grid::generate(&bbox, step, &boundary).unwrap();
        group.throughput(Throughput::Elements(candidates.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(step),
            &candidates,
            |b, candidates| b.iter(|| black_box(score(candidates, &model).unwrap())),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_generate, bench_score);
criterion_main!(benches);
