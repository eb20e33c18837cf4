// Neural optimization predictor (spec.md §4.5): chooses which of the seven
// optimization kinds to apply to a function, under a compilation-cost
// budget, from its feature vector. No direct teacher analogue — built fresh
// in `jounce`'s module style (`Result`-returning fallible entry points,
// `Default` impls for configuration, per-module `#[cfg(test)]` blocks).

pub mod network;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::CompileError;
use crate::features::{FeatureVector, FEATURE_LEN};
use network::NeuralNetwork;

/// The seven optimization kinds the predictor scores (spec.md §3),
/// matching the seven output units of the default `[50,128,64,32,7]`
/// network shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptimizationKind {
    Inlining,
    LoopUnrolling,
    Vectorization,
    ConstantFolding,
    TailCallOptimization,
    CommonSubexpressionElimination,
    StrengthReduction,
}

impl OptimizationKind {
    /// Fixed order matching the network's seven output units, and the order
    /// the WAT optimizer pipeline applies these transforms in (spec.md
    /// §4.6): ConstantFolding, StrengthReduction, CSE, LoopUnrolling,
    /// Vectorization, TailCallOptimization, Inlining.
    pub const ALL: [OptimizationKind; 7] = [
        OptimizationKind::ConstantFolding,
        OptimizationKind::StrengthReduction,
        OptimizationKind::CommonSubexpressionElimination,
        OptimizationKind::LoopUnrolling,
        OptimizationKind::Vectorization,
        OptimizationKind::TailCallOptimization,
        OptimizationKind::Inlining,
    ];

    /// Cost in arbitrary compilation-time budget units (spec.md §4.5 table).
    pub fn cost(&self) -> u32 {
        match self {
            OptimizationKind::Inlining => 2,
            OptimizationKind::LoopUnrolling => 4,
            OptimizationKind::Vectorization => 5,
            OptimizationKind::ConstantFolding => 1,
            OptimizationKind::TailCallOptimization => 3,
            OptimizationKind::CommonSubexpressionElimination => 3,
            OptimizationKind::StrengthReduction => 2,
        }
    }

    /// Code-size multiplier (spec.md §4.5 table).
    pub fn size_multiplier(&self) -> f64 {
        match self {
            OptimizationKind::Inlining => 1.5,
            OptimizationKind::LoopUnrolling => 3.0,
            OptimizationKind::Vectorization => 1.2,
            OptimizationKind::ConstantFolding => 0.9,
            OptimizationKind::TailCallOptimization => 1.0,
            OptimizationKind::CommonSubexpressionElimination => 1.1,
            OptimizationKind::StrengthReduction => 1.0,
        }
    }

    /// The output-unit index this kind occupies in the network's seven-wide
    /// output, following `ALL`'s order.
    fn output_index(&self) -> usize {
        OptimizationKind::ALL.iter().position(|k| k == self).unwrap()
    }
}

/// Per-function optimization selection (spec.md §3): the chosen kinds, their
/// combined cost (always `<= budget`), and the multiplicative expected
/// speedup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPlan {
    pub kinds: Vec<OptimizationKind>,
    pub total_cost: u32,
    pub expected_speedup: f64,
}

/// A scored candidate during greedy selection.
struct Scored {
    kind: OptimizationKind,
    score: f64,
    speedup: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationPredictor {
    network: NeuralNetwork,
    pub budget: u32,
}

impl OptimizationPredictor {
    pub fn new(network: NeuralNetwork, budget: u32) -> Self {
        OptimizationPredictor { network, budget }
    }

    /// Builds a predictor with a freshly Xavier-initialized network of
    /// `shape` (default `[50, 128, 64, 32, 7]`), seeded deterministically.
    pub fn with_shape(shape: &[usize], learning_rate: f64, budget: u32, seed: u64) -> Self {
        OptimizationPredictor { network: NeuralNetwork::new(shape, learning_rate, seed), budget }
    }

    /// Scores every optimization kind for `features` and greedily selects a
    /// plan within budget (spec.md §4.5): `score = (speedup - 1) / (cost *
    /// sqrt(size_multiplier))`, sorted descending, added while the running
    /// cost total stays `<= budget`. `is_recursive` disables `Inlining`
    /// candidates for functions on a call-graph cycle (spec.md §9).
    pub fn predict(&self, function: &str, features: &FeatureVector, is_recursive: bool) -> Result<OptimizationPlan, CompileError> {
        if features.len() != FEATURE_LEN {
            return Err(CompileError::Prediction {
                function: function.to_string(),
                message: format!("feature vector has length {}, expected {FEATURE_LEN}", features.len()),
            });
        }

        let raw = self.network.forward(features.as_slice());
        if raw.len() != OptimizationKind::ALL.len() {
            return Err(CompileError::Prediction {
                function: function.to_string(),
                message: format!("predictor output has length {}, expected {}", raw.len(), OptimizationKind::ALL.len()),
            });
        }

        let mut candidates: Vec<Scored> = OptimizationKind::ALL
            .iter()
            .filter(|kind| !(is_recursive && **kind == OptimizationKind::Inlining))
            .map(|&kind| {
                // Predicted speedups are clamped to >= 1.0: no pessimization (spec.md §4.5).
                let speedup = raw[kind.output_index()].max(1.0);
                let score = (speedup - 1.0) / (kind.cost() as f64 * kind.size_multiplier().sqrt());
                Scored { kind, score, speedup }
            })
            .collect();

        // Deterministic for identical inputs: ties keep `ALL`'s fixed order
        // because `sort_by` is stable.
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut kinds = Vec::new();
        let mut total_cost = 0u32;
        let mut expected_speedup = 1.0;
        for candidate in &candidates {
            let cost = candidate.kind.cost();
            if total_cost + cost > self.budget {
                continue;
            }
            total_cost += cost;
            expected_speedup *= candidate.speedup;
            kinds.push(candidate.kind);
        }

        Ok(OptimizationPlan { kinds, total_cost, expected_speedup })
    }

    pub fn train_step(&mut self, features: &FeatureVector, observed_speedups: &[f64]) -> f64 {
        self.network.train_step(features.as_slice(), observed_speedups)
    }

    pub fn train_batch(&mut self, dataset: &[(FeatureVector, Vec<f64>)], epochs: usize, seed: u64) -> Vec<f64> {
        let owned: Vec<(Vec<f64>, Vec<f64>)> =
            dataset.iter().map(|(fv, target)| (fv.as_slice().to_vec(), target.clone())).collect();
        self.network.train_batch(&owned, epochs, seed)
    }
}

/// Orders a plan's transforms in the fixed pipeline order the WAT optimizer
/// applies them in (spec.md §4.6), regardless of the order the predictor
/// selected them in.
pub fn in_pipeline_order(kinds: &[OptimizationKind]) -> Vec<OptimizationKind> {
    let selected: HashSet<OptimizationKind> = kinds.iter().copied().collect();
    OptimizationKind::ALL.iter().copied().filter(|k| selected.contains(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_graph::CallGraph;
    use crate::features::FeatureExtractor;
    use crate::profile::ProfileStore;
    use std::collections::HashSet;

    fn sample_features() -> FeatureVector {
        let store = ProfileStore::new(1000);
        store.static_analyze("f", "function f(a, b) { return a + b; }", &[], false);
        for _ in 0..200 {
            store.record_call("f", 10.0, vec!["Integer".to_string(), "Integer".to_string()]);
        }
        let profile = store.get("f").unwrap();
        let graph = CallGraph::new();
        let hot: HashSet<String> = ["f".to_string()].into_iter().collect();
        FeatureExtractor::extract(&profile, &graph, 100, &hot)
    }

    #[test]
    fn plan_never_exceeds_budget() {
        let predictor = OptimizationPredictor::with_shape(&[50, 128, 64, 32, 7], 1e-3, 10, 1);
        let plan = predictor.predict("f", &sample_features(), false).unwrap();
        assert!(plan.total_cost <= 10);
    }

    #[test]
    fn selection_is_deterministic() {
        let predictor = OptimizationPredictor::with_shape(&[50, 128, 64, 32, 7], 1e-3, 10, 7);
        let features = sample_features();
        let a = predictor.predict("f", &features, false).unwrap();
        let b = predictor.predict("f", &features, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn recursive_functions_never_get_inlining() {
        let predictor = OptimizationPredictor::with_shape(&[50, 128, 64, 32, 7], 1e-3, 10, 3);
        let plan = predictor.predict("f", &sample_features(), true).unwrap();
        assert!(!plan.kinds.contains(&OptimizationKind::Inlining));
    }

    #[test]
    fn wrong_length_feature_vector_is_a_prediction_error() {
        let predictor = OptimizationPredictor::with_shape(&[4, 8, 7], 1e-3, 10, 1);
        let bad = crate::features::FeatureVector::from(vec![0.0; 4]);
        let err = predictor.predict("f", &bad, false).unwrap_err();
        assert!(matches!(err, CompileError::Prediction { .. }));
    }

    #[test]
    fn pipeline_order_matches_fixed_transform_sequence() {
        let ordered = in_pipeline_order(&[OptimizationKind::Inlining, OptimizationKind::ConstantFolding, OptimizationKind::LoopUnrolling]);
        assert_eq!(
            ordered,
            vec![OptimizationKind::ConstantFolding, OptimizationKind::LoopUnrolling, OptimizationKind::Inlining]
        );
    }
}
