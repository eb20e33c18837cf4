// Feature extractor (spec.md §4.3): turns a `FunctionProfile` into the
// fixed-length numeric fingerprint the optimization predictor consumes.
// Built fresh — `jounce` has no ML feature pipeline — but in the teacher's
// struct/impl style, with named constants for each slot index rather than
// magic numbers, mirroring the way `css_utilities.rs` names its fixed
// Tailwind-scale indices instead of indexing blind.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::call_graph::CallGraph;
use crate::profile::FunctionProfile;

/// Total length of a `FeatureVector`, fixed by spec.md §3.
pub const FEATURE_LEN: usize = 50;

// -- 0..20: static code statistics -----------------------------------------
pub const IDX_LINES: usize = 0;
pub const IDX_CYCLOMATIC_COMPLEXITY: usize = 1;
pub const IDX_MAX_NESTING_DEPTH: usize = 2;
pub const IDX_TOTAL_OPS: usize = 3;
pub const IDX_CODE_LENGTH: usize = 4;
pub const IDX_CONDITIONAL_COUNT: usize = 5;
pub const IDX_LOOP_COUNT: usize = 6;
pub const IDX_CALL_COUNT: usize = 7;
pub const IDX_ARRAY_OP_COUNT: usize = 8;
pub const IDX_OBJECT_OP_COUNT: usize = 9;
pub const IDX_ARITHMETIC_OP_COUNT: usize = 10;
pub const IDX_COMPARISON_OP_COUNT: usize = 11;
pub const IDX_LOGICAL_OP_COUNT: usize = 12;
pub const IDX_BITWISE_OP_COUNT: usize = 13;
pub const IDX_ASSIGNMENT_OP_COUNT: usize = 14;
pub const IDX_HAS_LOOP: usize = 15;
pub const IDX_HAS_CONDITIONAL: usize = 16;
pub const IDX_HAS_ASYNC: usize = 17;
pub const IDX_HAS_RECURSION: usize = 18;
pub const IDX_IS_LEAF: usize = 19;

// -- 20..30: dynamic (profiled) statistics ----------------------------------
pub const IDX_LOG_CALL_COUNT: usize = 20;
pub const IDX_AVG_TIME: usize = 21;
pub const IDX_TOTAL_TIME: usize = 22;
pub const IDX_MIN_TIME: usize = 23;
pub const IDX_MAX_TIME: usize = 24;
pub const IDX_VARIANCE: usize = 25;
pub const IDX_STDDEV: usize = 26;
pub const IDX_HOTNESS: usize = 27;
pub const IDX_P95: usize = 28;
pub const IDX_P99: usize = 29;

// -- 30..35: call-graph statistics ------------------------------------------
pub const IDX_OUT_DEGREE: usize = 30;
pub const IDX_IN_DEGREE: usize = 31;
pub const IDX_CALL_DEPTH: usize = 32;
pub const IDX_IN_HOT_PATH: usize = 33;
pub const IDX_FAN_OUT: usize = 34;

// -- 35..40: argument-pattern summaries --------------------------------------
// Resolved per SPEC_FULL.md §4.3 (spec.md's open question on indices 35-39):
// shape cardinality, modal frequency, entropy ratio, arity-match fraction,
// non-numeric-shape fraction.
pub const IDX_ARG_SHAPE_CARDINALITY: usize = 35;
pub const IDX_ARG_SHAPE_MODAL_FREQ: usize = 36;
pub const IDX_ARG_SHAPE_ENTROPY_RATIO: usize = 37;
pub const IDX_ARG_ARITY_MATCH_FRACTION: usize = 38;
pub const IDX_ARG_NON_NUMERIC_FRACTION: usize = 39;

// -- 40..50: optimization hints ----------------------------------------------
pub const IDX_VECTORIZABLE_LOOP: usize = 40;
pub const IDX_INLINABLE_SIZE: usize = 41;
pub const IDX_TAIL_RECURSIVE_SHAPE: usize = 42;
pub const IDX_CSE_LIKELY: usize = 43;
pub const IDX_STRENGTH_REDUCTION_OPPORTUNITY: usize = 44;
pub const IDX_LOOP_UNROLL_CANDIDATE: usize = 45;
pub const IDX_HOT_AND_SIMPLE: usize = 46;
pub const IDX_BRANCH_DENSITY: usize = 47;
pub const IDX_CALL_DENSITY: usize = 48;
pub const IDX_LEAF_AND_HOT: usize = 49;

/// A 50-element numeric fingerprint of a function, normalized to roughly
/// `[0, 1]` per spec.md §4.3. Deterministic: identical profile and call-graph
/// input always produce an identical vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> f64 {
        self.0[idx]
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(v: Vec<f64>) -> Self {
        FeatureVector(v)
    }
}

impl std::ops::Index<usize> for FeatureVector {
    type Output = f64;
    fn index(&self, idx: usize) -> &f64 {
        &self.0[idx]
    }
}

/// Maps non-finite/out-of-range raw values into roughly `[0, 1]`
/// (spec.md §4.3): non-finite becomes 0; values above 1000 are
/// log-compressed; (100, 1000] divides by 100; (10, 100] divides by 10;
/// [0, 10] passes through unchanged. The result is always finite and ≥ 0.
fn normalize(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    let x = x.max(0.0);
    let normalized = if x > 1000.0 {
        x.ln()
    } else if x > 100.0 {
        x / 100.0
    } else if x > 10.0 {
        x / 10.0
    } else {
        x
    };
    if normalized.is_finite() {
        normalized.max(0.0)
    } else {
        0.0
    }
}

fn bool_slot(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Shannon entropy (base 2) of a discrete frequency distribution.
fn shannon_entropy(counts: &[u64], total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Derives the 50-slot `FeatureVector` for `profile`. `call_graph` is
    /// consulted for the call-graph block (indices 30-34); `hot_functions` is
    /// the set of function names profiled as hot elsewhere in the same run,
    /// used to decide whether `profile` sits in a hot call path.
    pub fn extract(profile: &FunctionProfile, call_graph: &CallGraph, hot_threshold: u64, hot_functions: &HashSet<String>) -> FeatureVector {
        let mut v = vec![0.0; FEATURE_LEN];
        let stats = &profile.stats;

        v[IDX_LINES] = normalize(stats.lines as f64);
        v[IDX_CYCLOMATIC_COMPLEXITY] = normalize(stats.cyclomatic_complexity as f64);
        v[IDX_MAX_NESTING_DEPTH] = normalize(stats.max_nesting_depth as f64);
        v[IDX_TOTAL_OPS] = normalize(stats.total_ops as f64);
        v[IDX_CODE_LENGTH] = normalize(stats.code_length as f64);
        v[IDX_CONDITIONAL_COUNT] = normalize(stats.conditional_count as f64);
        v[IDX_LOOP_COUNT] = normalize(stats.loop_count as f64);
        v[IDX_CALL_COUNT] = normalize(stats.call_count as f64);
        v[IDX_ARRAY_OP_COUNT] = normalize(stats.array_op_count as f64);
        v[IDX_OBJECT_OP_COUNT] = normalize(stats.object_op_count as f64);
        v[IDX_ARITHMETIC_OP_COUNT] = normalize(stats.arithmetic_op_count as f64);
        v[IDX_COMPARISON_OP_COUNT] = normalize(stats.comparison_op_count as f64);
        v[IDX_LOGICAL_OP_COUNT] = normalize(stats.logical_op_count as f64);
        v[IDX_BITWISE_OP_COUNT] = normalize(stats.bitwise_op_count as f64);
        v[IDX_ASSIGNMENT_OP_COUNT] = normalize(stats.assignment_op_count as f64);
        v[IDX_HAS_LOOP] = bool_slot(stats.has_loop);
        v[IDX_HAS_CONDITIONAL] = bool_slot(stats.has_conditional);
        v[IDX_HAS_ASYNC] = bool_slot(stats.has_async);
        v[IDX_HAS_RECURSION] = bool_slot(stats.has_recursion);
        v[IDX_IS_LEAF] = bool_slot(stats.is_leaf);

        v[IDX_LOG_CALL_COUNT] = normalize((profile.call_count as f64 + 1.0).ln());
        v[IDX_AVG_TIME] = normalize(profile.avg_time_ns());
        v[IDX_TOTAL_TIME] = normalize(profile.total_time_ns);
        v[IDX_MIN_TIME] = normalize(if profile.min_time_ns.is_finite() { profile.min_time_ns } else { 0.0 });
        v[IDX_MAX_TIME] = normalize(profile.max_time_ns);
        v[IDX_VARIANCE] = normalize(profile.timing_variance());
        v[IDX_STDDEV] = normalize(profile.timing_stddev());
        v[IDX_HOTNESS] = bool_slot(profile.is_hot(hot_threshold));
        v[IDX_P95] = normalize(profile.percentile(95.0));
        v[IDX_P99] = normalize(profile.percentile(99.0));

        let out_degree = call_graph.out_degree(&profile.name);
        v[IDX_OUT_DEGREE] = normalize(out_degree as f64);
        v[IDX_IN_DEGREE] = normalize(call_graph.in_degree(&profile.name) as f64);
        v[IDX_CALL_DEPTH] = normalize(call_graph.call_depth(&profile.name) as f64);
        let in_hot_path = hot_functions.iter().any(|hot| call_graph.reachable_from(hot).contains(&profile.name));
        v[IDX_IN_HOT_PATH] = bool_slot(in_hot_path);
        let fan_out = call_graph.reachable_from(&profile.name).len().saturating_sub(1);
        v[IDX_FAN_OUT] = normalize(fan_out as f64);

        let total_calls: u64 = profile.arg_shape_histogram.values().sum();
        let cardinality = profile.arg_shape_histogram.len();
        v[IDX_ARG_SHAPE_CARDINALITY] = normalize(cardinality as f64);
        let modal_count = profile.arg_shape_histogram.values().copied().max().unwrap_or(0);
        v[IDX_ARG_SHAPE_MODAL_FREQ] = if total_calls > 0 { modal_count as f64 / total_calls as f64 } else { 0.0 };
        let counts: Vec<u64> = profile.arg_shape_histogram.values().copied().collect();
        let entropy = shannon_entropy(&counts, total_calls);
        v[IDX_ARG_SHAPE_ENTROPY_RATIO] = if cardinality > 1 { entropy / (cardinality as f64).log2() } else { 0.0 };
        let declared_arity = stats.call_count; // best static proxy available from the profile alone
        let arity_matches: u64 = profile
            .arg_shape_histogram
            .iter()
            .filter(|(shape, _)| shape.len() as u64 == declared_arity || declared_arity == 0)
            .map(|(_, count)| *count)
            .sum();
        v[IDX_ARG_ARITY_MATCH_FRACTION] = if total_calls > 0 { arity_matches as f64 / total_calls as f64 } else { 1.0 };
        let non_numeric: u64 = profile
            .arg_shape_histogram
            .iter()
            .filter(|(shape, _)| shape.iter().any(|t| t != "Integer" && t != "Number"))
            .map(|(_, count)| *count)
            .sum();
        v[IDX_ARG_NON_NUMERIC_FRACTION] = if total_calls > 0 { non_numeric as f64 / total_calls as f64 } else { 0.0 };

        v[IDX_VECTORIZABLE_LOOP] = bool_slot(stats.has_loop && stats.array_op_count > 0);
        v[IDX_INLINABLE_SIZE] = 1.0 / (1.0 + stats.total_ops as f64 + stats.lines as f64 / 5.0);
        v[IDX_TAIL_RECURSIVE_SHAPE] = bool_slot(stats.has_recursion && stats.cyclomatic_complexity <= 3);
        v[IDX_CSE_LIKELY] = bool_slot(stats.has_loop && stats.arithmetic_op_count > stats.loop_count.max(1) * 2);
        v[IDX_STRENGTH_REDUCTION_OPPORTUNITY] = bool_slot(stats.arithmetic_op_count > 0);
        v[IDX_LOOP_UNROLL_CANDIDATE] = bool_slot(stats.has_loop && !stats.has_recursion && stats.max_nesting_depth <= 2);
        v[IDX_HOT_AND_SIMPLE] = bool_slot(profile.is_hot(hot_threshold) && stats.cyclomatic_complexity <= 3);
        v[IDX_BRANCH_DENSITY] = normalize(stats.conditional_count as f64 / stats.lines.max(1) as f64);
        v[IDX_CALL_DENSITY] = normalize(stats.call_count as f64 / stats.lines.max(1) as f64);
        v[IDX_LEAF_AND_HOT] = bool_slot(stats.is_leaf && profile.is_hot(hot_threshold));

        FeatureVector(v)
    }
}
