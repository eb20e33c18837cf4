// Predictor benchmark: feature extraction, greedy prediction, and one
// online training step in isolation, so regressions in the neural-network
// forward/backward pass are visible without the rest of the pipeline's
// noise. Grounded on the teacher's `utility_generation.rs` shape (separate
// benchmark functions per hot path, one `criterion_group!`).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use neurowasm_core::call_graph::CallGraph;
use neurowasm_core::features::FeatureExtractor;
use neurowasm_core::predictor::OptimizationPredictor;
use neurowasm_core::profile::ProfileStore;
use std::collections::HashSet;

fn sample_store() -> ProfileStore {
    let store = ProfileStore::new(1000);
    store.static_analyze(
        "f",
        "function f(a, b) { return a + b; }",
        &[],
        false,
    );
    for i in 0..500 {
        store.record_call("f", 1_000.0 + i as f64, vec!["Integer".to_string(), "Integer".to_string()]);
    }
    store
}

fn bench_feature_extraction(c: &mut Criterion) {
    let store = sample_store();
    let profile = store.get("f").unwrap();
    let graph = CallGraph::new();
    let hot: HashSet<String> = ["f".to_string()].into_iter().collect();

    c.bench_function("extract_feature_vector", |b| {
        b.iter(|| black_box(FeatureExtractor::extract(black_box(&profile), &graph, 100, &hot)));
    });
}

fn bench_predict(c: &mut Criterion) {
    let store = sample_store();
    let profile = store.get("f").unwrap();
    let graph = CallGraph::new();
    let hot: HashSet<String> = ["f".to_string()].into_iter().collect();
    let features = FeatureExtractor::extract(&profile, &graph, 100, &hot);
    let predictor = OptimizationPredictor::with_shape(&[50, 128, 64, 32, 7], 1e-3, 10, 1);

    c.bench_function("predict_optimization_plan", |b| {
        b.iter(|| black_box(predictor.predict("f", black_box(&features), false).unwrap()));
    });
}

fn bench_train_step(c: &mut Criterion) {
    let store = sample_store();
    let profile = store.get("f").unwrap();
    let graph = CallGraph::new();
    let hot: HashSet<String> = ["f".to_string()].into_iter().collect();
    let features = FeatureExtractor::extract(&profile, &graph, 100, &hot);
    let mut predictor = OptimizationPredictor::with_shape(&[50, 128, 64, 32, 7], 1e-3, 10, 1);
    let observed = vec![1.2, 1.0, 1.0, 1.1, 1.0, 1.05, 1.3];

    c.bench_function("predictor_train_step", |b| {
        b.iter(|| black_box(predictor.train_step(black_box(&features), black_box(&observed))));
    });
}

criterion_group!(benches, bench_feature_extraction, bench_predict, bench_train_step);
criterion_main!(benches);
