// Worker command protocol (spec.md §5, §6): four pipeline stages
// (profiler, AI analyzer, WAT generator, WASM compiler), each processing its
// slice of functions independently via `rayon`'s `par_iter`, dispatched
// through a correlation-id envelope over `std::sync::mpsc` the way the
// teacher's `watcher.rs` dispatches file-change events over a channel.
// Unlike the teacher's long-lived file-watch loop, each stage here runs to
// completion and replies once — the driver still awaits one stage before
// dispatching the next (spec.md §5: "the driver awaits one stage before
// starting the next").

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ast::{ArrowBody, Expression, ExpressionKind, FunctionDeclaration, Program, Statement};
use crate::call_graph::CallGraph;
use crate::errors::CompileError;
use crate::features::{FeatureExtractor, FeatureVector};
use crate::predictor::{OptimizationPlan, OptimizationPredictor};
use crate::profile::{FunctionProfile, ProfileStore};

/// The four pipeline stages a request can target (spec.md §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerCommand {
    Profile,
    Analyze,
    Generate,
    Assemble,
}

/// A correlation-id-tagged request to one of the stage workers. `data` is
/// the opaque, stage-specific payload, serialized the same way a profile or
/// plan would be persisted between runs (spec.md §4.4/§4.5 persistence).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest<T> {
    pub id: u64,
    pub command: WorkerCommand,
    pub data: T,
}

/// The matching reply: `result` holds the stage's output on success, `error`
/// is set instead on failure — never both (spec.md §7's per-stage error
/// accumulation, carried across the channel boundary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse<T> {
    pub id: u64,
    pub command: WorkerCommand,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> WorkerResponse<T> {
    fn ok(id: u64, command: WorkerCommand, result: T) -> Self {
        WorkerResponse { id, command, result: Some(result), error: None }
    }

    fn err(id: u64, command: WorkerCommand, error: CompileError) -> Self {
        WorkerResponse { id, command, result: None, error: Some(error.to_string()) }
    }
}

/// Every named function declaration in `program`, including ones nested
/// inside another function's body.
pub fn function_declarations(program: &Program) -> Vec<&FunctionDeclaration> {
    let mut out = Vec::new();
    collect_decls(&program.body, &mut out);
    out
}

fn collect_decls<'a>(stmts: &'a [Statement], out: &mut Vec<&'a FunctionDeclaration>) {
    for stmt in stmts {
        collect_decls_one(stmt, out);
    }
}

fn collect_decls_one<'a>(stmt: &'a Statement, out: &mut Vec<&'a FunctionDeclaration>) {
    match stmt {
        Statement::FunctionDeclaration(f) => {
            out.push(f);
            collect_decls(&f.body.body, out);
        }
        Statement::Block(b) => collect_decls(&b.body, out),
        Statement::If(i) => {
            collect_decls_one(&i.then_branch, out);
            if let Some(else_branch) = &i.else_branch {
                collect_decls_one(else_branch, out);
            }
        }
        Statement::While(w) => collect_decls_one(&w.body, out),
        Statement::For(f) => collect_decls_one(&f.body, out),
        Statement::VariableDeclaration(_) | Statement::Return(_) | Statement::Expression(_) => {}
    }
}

/// Every `(caller, callee)` edge reachable from `function`'s body — one
/// call site, one edge, duplicates included (the call graph stores these as
/// a set, so repeats collapse there).
pub fn call_edges(function: &FunctionDeclaration) -> Vec<(String, String)> {
    let mut callees = Vec::new();
    for stmt in &function.body.body {
        collect_calls_stmt(stmt, &mut callees);
    }
    callees.into_iter().map(|callee| (function.name.name.clone(), callee)).collect()
}

fn collect_calls_stmt(stmt: &Statement, out: &mut Vec<String>) {
    match stmt {
        Statement::Expression(e) => collect_calls_expr(&e.expr, out),
        Statement::VariableDeclaration(v) => {
            if let Some(init) = &v.init {
                collect_calls_expr(init, out);
            }
        }
        Statement::Return(r) => {
            if let Some(value) = &r.value {
                collect_calls_expr(value, out);
            }
        }
        Statement::If(i) => {
            collect_calls_expr(&i.condition, out);
            collect_calls_stmt(&i.then_branch, out);
            if let Some(else_branch) = &i.else_branch {
                collect_calls_stmt(else_branch, out);
            }
        }
        Statement::While(w) => {
            collect_calls_expr(&w.condition, out);
            collect_calls_stmt(&w.body, out);
        }
        Statement::For(f) => {
            if let Some(init) = &f.init {
                collect_calls_stmt(init, out);
            }
            if let Some(cond) = &f.condition {
                collect_calls_expr(cond, out);
            }
            if let Some(update) = &f.update {
                collect_calls_stmt(update, out);
            }
            collect_calls_stmt(&f.body, out);
        }
        Statement::Block(b) => {
            for stmt in &b.body {
                collect_calls_stmt(stmt, out);
            }
        }
        // A nested function declaration's own calls are walked separately,
        // under its own name, by the top-level `function_declarations` scan.
        Statement::FunctionDeclaration(_) => {}
    }
}

fn collect_calls_expr(expr: &Expression, out: &mut Vec<String>) {
    match &expr.kind {
        ExpressionKind::Call(c) => {
            if let ExpressionKind::Identifier(id) = &c.callee.kind {
                out.push(id.name.clone());
            } else {
                collect_calls_expr(&c.callee, out);
            }
            for arg in &c.arguments {
                collect_calls_expr(arg, out);
            }
        }
        ExpressionKind::Binary(b) => {
            collect_calls_expr(&b.left, out);
            collect_calls_expr(&b.right, out);
        }
        ExpressionKind::Unary(u) => collect_calls_expr(&u.operand, out),
        ExpressionKind::Assignment(a) => collect_calls_expr(&a.value, out),
        ExpressionKind::Member(m) => {
            collect_calls_expr(&m.object, out);
            collect_calls_expr(&m.property, out);
        }
        ExpressionKind::ArrowFunction(a) => match &a.body {
            ArrowBody::Expression(e) => collect_calls_expr(e, out),
            ArrowBody::Block(b) => {
                for stmt in &b.body {
                    collect_calls_stmt(stmt, out);
                }
            }
        },
        ExpressionKind::Identifier(_)
        | ExpressionKind::NumberLiteral(_)
        | ExpressionKind::StringLiteral(_)
        | ExpressionKind::BooleanLiteral(_)
        | ExpressionKind::NullLiteral => {}
    }
}

/// Runs the profiler stage over every function in `programs`, in parallel,
/// recording static stats and call edges into `store`. One profiler worker
/// per function (spec.md §5's "function-level parallelism").
pub fn run_profiler_stage(store: &ProfileStore, programs: &[(&str, &Program)]) {
    programs.par_iter().for_each(|(source, program)| {
        let declarations = function_declarations(program);
        declarations.par_iter().for_each(|f| {
            store.static_analyze(&f.name.name, source, &[], false);
        });
        for f in &declarations {
            for (caller, callee) in call_edges(f) {
                store.note_edge(&caller, &callee);
            }
        }
    });
}

/// Runs the AI analyzer stage: extracts a feature vector and predicts an
/// optimization plan for every named function, in parallel.
pub fn run_analyzer_stage(
    store: &ProfileStore,
    call_graph: &CallGraph,
    predictor: &OptimizationPredictor,
    hot_threshold: u64,
    names: &[String],
) -> Vec<(String, Result<(FeatureVector, OptimizationPlan), CompileError>)> {
    let hot_functions: HashSet<String> =
        names.iter().filter(|n| store.get(n).map(|p| p.is_hot(hot_threshold)).unwrap_or(false)).cloned().collect();
    let recursive = call_graph.recursive_functions();

    names
        .par_iter()
        .map(|name| {
            let profile = store.get(name).unwrap_or_else(|| FunctionProfile::new(name.clone(), String::new(), 0));
            let features = FeatureExtractor::extract(&profile, call_graph, hot_threshold, &hot_functions);
            let plan = predictor.predict(name, &features, recursive.contains(name));
            (name.clone(), plan.map(|p| (features.clone(), p)))
        })
        .collect()
}

/// Dispatches a batch of profiler requests through an `mpsc` channel and
/// collects the replies, mirroring the request/response shape spec.md §6
/// describes for the worker protocol (in-process here; a real deployment
/// would put the channel's ends in different threads or processes).
pub fn dispatch_profiler_requests(requests: Vec<WorkerRequest<(String, String)>>) -> Vec<WorkerResponse<()>> {
    let (tx, rx): (Sender<WorkerResponse<()>>, Receiver<WorkerResponse<()>>) = channel();
    let store = ProfileStore::new(1000);

    requests.into_par_iter().for_each_with(tx, |tx, req| {
        let (name, source) = &req.data;
        store.static_analyze(name, source, &[], false);
        let _ = tx.send(WorkerResponse::ok(req.id, req.command, ()));
    });

    let mut responses: Vec<WorkerResponse<()>> = rx.into_iter().collect();
    responses.sort_by_key(|r| r.id);
    responses
}

/// Collects the final reply set for a batch of `(id, Result)` stage
/// outcomes into the envelope shape spec.md §6 defines, for any stage.
pub fn collect_responses<T>(command: WorkerCommand, outcomes: Vec<(u64, Result<T, CompileError>)>) -> Vec<WorkerResponse<T>> {
    outcomes
        .into_iter()
        .map(|(id, outcome)| match outcome {
            Ok(value) => WorkerResponse::ok(id, command, value),
            Err(e) => WorkerResponse::err(id, command, e),
        })
        .collect()
}

/// Merges a set of named stage outcomes into a single error accumulator,
/// keeping one entry per function that failed (spec.md §7: one function's
/// failure doesn't prevent others from producing output).
pub fn partition_outcomes<T>(outcomes: Vec<(String, Result<T, CompileError>)>) -> (HashMap<String, T>, Vec<CompileError>) {
    let mut ok = HashMap::new();
    let mut errors = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(value) => {
                ok.insert(name, value);
            }
            Err(e) => errors.push(e),
        }
    }
    (ok, errors)
}
