// spec.md §8 scenario 5: training a predictor on a fixed dataset and seed
// for a fixed epoch count strictly reduces MSE, and repeating with the same
// seed reproduces the same weights bit-for-bit.

use neurowasm_core::features::FeatureVector;
use neurowasm_core::predictor::OptimizationPredictor;

fn dataset() -> Vec<(FeatureVector, Vec<f64>)> {
    (0..32)
        .map(|i| {
            let mut features = vec![0.0; 50];
            features[0] = (i % 7) as f64 / 10.0;
            features[20] = ((i * 3) % 11) as f64 / 10.0;
            let speedups = vec![1.0 + (i % 5) as f64 / 10.0; 7];
            (FeatureVector::from(features), speedups)
        })
        .collect()
}

#[test]
fn training_strictly_reduces_mean_squared_error() {
    let mut predictor = OptimizationPredictor::with_shape(&[50, 128, 64, 32, 7], 1e-3, 10, 42);
    let mse = predictor.train_batch(&dataset(), 100, 42);
    assert_eq!(mse.len(), 100);
    assert!(mse.last().unwrap() < mse.first().unwrap(), "expected MSE to decrease: {:?} -> {:?}", mse.first(), mse.last());
}

#[test]
fn the_same_seed_reproduces_bit_identical_weights() {
    let mut a = OptimizationPredictor::with_shape(&[50, 128, 64, 32, 7], 1e-3, 10, 42);
    let mut b = OptimizationPredictor::with_shape(&[50, 128, 64, 32, 7], 1e-3, 10, 42);
    let data = dataset();
    a.train_batch(&data, 100, 42);
    b.train_batch(&data, 100, 42);

    let features = FeatureVector::from(vec![0.2; 50]);
    let plan_a = a.predict("f", &features, false).unwrap();
    let plan_b = b.predict("f", &features, false).unwrap();
    assert_eq!(plan_a, plan_b);
}
