// Compiler configuration (spec.md §6), grounded on the teacher's
// `build_config.rs` (`BuildConfig`/`OptimizationLevel` with
// `development()`/`production()` presets and `with_optimization_level`):
// same preset-constructor shape, generalized from a bundler's optimization
// levels to the predictor's budget/architecture knobs, plus `Deserialize` so
// a project can override them from a TOML file the way the teacher's CLI
// loads project config.

use serde::{Deserialize, Serialize};

/// Network shape, learning rate, and training knobs for the optimization
/// predictor (spec.md §4.5, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub architecture: Vec<usize>,
    pub learning_rate: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig { architecture: vec![50, 128, 64, 32, 7], learning_rate: 1e-3 }
    }
}

/// Top-level compiler configuration (spec.md §6): the compilation-cost
/// budget per function, the loop-unrolling factor, the profiler's sample
/// retention cap, the predictor's network shape, and the call-count
/// threshold that marks a function hot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub optimization_budget: u32,
    pub unroll_factor: usize,
    pub sample_capacity: usize,
    pub predictor: PredictorConfig,
    pub hot_call_threshold: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            optimization_budget: 10,
            unroll_factor: 4,
            sample_capacity: 1000,
            predictor: PredictorConfig::default(),
            hot_call_threshold: 100,
        }
    }
}

impl CompilerConfig {
    /// A cautious preset: a tight budget and a lower hot-call bar, biasing
    /// toward cheap, low-risk transforms (spec.md §9's "smaller programs
    /// should favor cheaper optimizations").
    pub fn conservative() -> Self {
        CompilerConfig { optimization_budget: 4, unroll_factor: 2, hot_call_threshold: 200, ..Self::default() }
    }

    /// A generous preset: a wide budget, deeper unrolling, and a lower hot
    /// bar so more functions qualify for the full transform set.
    pub fn aggressive() -> Self {
        CompilerConfig { optimization_budget: 20, unroll_factor: 8, hot_call_threshold: 50, ..Self::default() }
    }

    /// Loads a config from a TOML file, falling back to `default()` for any
    /// field the file omits (spec.md §6's configuration options are all
    /// optional overrides of built-in defaults).
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.optimization_budget, 10);
        assert_eq!(config.unroll_factor, 4);
        assert_eq!(config.sample_capacity, 1000);
        assert_eq!(config.predictor.architecture, vec![50, 128, 64, 32, 7]);
        assert_eq!(config.hot_call_threshold, 100);
    }

    #[test]
    fn conservative_has_a_tighter_budget_than_aggressive() {
        assert!(CompilerConfig::conservative().optimization_budget < CompilerConfig::aggressive().optimization_budget);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config = CompilerConfig::from_toml("optimization_budget = 6\n").unwrap();
        assert_eq!(config.optimization_budget, 6);
        assert_eq!(config.unroll_factor, 4); // unspecified field keeps its default
    }

    #[test]
    fn nested_predictor_table_overrides_independently() {
        let config = CompilerConfig::from_toml("[predictor]\nlearning_rate = 0.01\n").unwrap();
        assert!((config.predictor.learning_rate - 0.01).abs() < 1e-12);
        assert_eq!(config.predictor.architecture, vec![50, 128, 64, 32, 7]);
    }
}
