// The seven WAT optimization transforms (spec.md §4.6), applied in the
// fixed pipeline order ConstantFolding → StrengthReduction → CSE →
// LoopUnrolling → Vectorization → TailCallOptimization → Inlining. Grounded
// on the teacher's `wasm_optimizer.rs` pass shape (`OptimizationStats`
// counters, one function per pass, preset thresholds) generalized from
// optimizing a parsed `WasmModule` to optimizing a `WatFunction`'s
// instruction list.

use std::collections::{HashMap, HashSet};

use crate::predictor::OptimizationKind;

use super::wat_ir::{ConstValue, WatFunction, WatInstr, WatLocal, WatModule};

/// Counters mirroring the teacher's `OptimizationStats`, reported back so a
/// caller can inspect how much each pass actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptimizationStats {
    pub constants_folded: u32,
    pub strength_reductions: u32,
    pub subexpressions_eliminated: u32,
    pub loops_unrolled: u32,
    pub vectorized_groups: u32,
    pub tail_calls_rewritten: u32,
    pub calls_inlined: u32,
}

impl OptimizationStats {
    pub fn total_optimizations(&self) -> u32 {
        self.constants_folded
            + self.strength_reductions
            + self.subexpressions_eliminated
            + self.loops_unrolled
            + self.vectorized_groups
            + self.tail_calls_rewritten
            + self.calls_inlined
    }
}

/// Applies every selected kind except `Inlining` to `function`, in the
/// fixed pipeline order, and reports how much each pass changed. `Inlining`
/// needs sibling functions and runs separately via [`apply_inlining`].
pub fn apply_plan(function: &mut WatFunction, kinds: &[OptimizationKind], unroll_factor: usize) -> OptimizationStats {
    let selected: HashSet<OptimizationKind> = kinds.iter().copied().collect();
    let mut stats = OptimizationStats::default();

    if selected.contains(&OptimizationKind::ConstantFolding) {
        stats.constants_folded += fold_constants(&mut function.body);
    }
    if selected.contains(&OptimizationKind::StrengthReduction) {
        stats.strength_reductions += reduce_strength(&mut function.body);
    }
    if selected.contains(&OptimizationKind::CommonSubexpressionElimination) {
        stats.subexpressions_eliminated += eliminate_common_subexpressions(function);
    }
    if selected.contains(&OptimizationKind::LoopUnrolling) {
        stats.loops_unrolled += unroll_loops(&mut function.body, unroll_factor);
    }
    if selected.contains(&OptimizationKind::Vectorization) {
        stats.vectorized_groups += vectorize(&mut function.body);
    }
    if selected.contains(&OptimizationKind::TailCallOptimization) {
        stats.tail_calls_rewritten += optimize_tail_calls(function);
    }

    stats
}

/// Runs the inlining pass across the whole module for functions whose plan
/// selects `Inlining`, using each callee's *current* (already per-function
/// optimized) body as the inlining source. `recursive` excludes functions on
/// a call-graph cycle from ever being inlined (spec.md §9).
pub fn apply_inlining(module: &mut WatModule, plans: &HashMap<String, Vec<OptimizationKind>>, recursive: &HashSet<String>) -> OptimizationStats {
    const INLINE_SIZE_THRESHOLD: usize = 12;
    let mut stats = OptimizationStats::default();
    let snapshot = module.functions.clone();
    let mut call_site_counter = 0u32;

    for function in &mut module.functions {
        let wants_inlining = plans.get(&function.name).map(|k| k.contains(&OptimizationKind::Inlining)).unwrap_or(false);
        if !wants_inlining {
            continue;
        }
        let inlined = inline_eligible_calls(&mut function.body, &mut function.locals, &snapshot, recursive, INLINE_SIZE_THRESHOLD, &mut call_site_counter);
        stats.calls_inlined += inlined;
    }

    stats
}

// -- ConstantFolding ---------------------------------------------------------

fn fold_constants(instrs: &mut Vec<WatInstr>) -> u32 {
    let mut count = 0;
    for instr in instrs.iter_mut() {
        count += fold_nested(instr);
    }

    let mut i = 0;
    let mut result = Vec::with_capacity(instrs.len());
    while i < instrs.len() {
        if let (Some(WatInstr::Const(a)), Some(WatInstr::Const(b)), Some(WatInstr::Op(mnemonic))) =
            (instrs.get(i), instrs.get(i + 1), instrs.get(i + 2))
        {
            if let Some(folded) = eval_const(mnemonic, *a, *b) {
                result.push(WatInstr::Const(folded));
                i += 3;
                count += 1;
                continue;
            }
        }
        result.push(instrs[i].clone());
        i += 1;
    }
    *instrs = result;
    count
}

fn fold_nested(instr: &mut WatInstr) -> u32 {
    match instr {
        WatInstr::Block { body, .. } | WatInstr::Loop { body, .. } => fold_constants(body),
        WatInstr::If { then_body, else_body } => fold_constants(then_body) + fold_constants(else_body),
        _ => 0,
    }
}

/// Evaluates a folded constant binary op; returns `None` (skip folding) for
/// division or remainder by a literal zero, preserving the runtime trap
/// rather than emitting undefined behavior (spec.md §8).
fn eval_const(mnemonic: &str, a: ConstValue, b: ConstValue) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::I32(x), ConstValue::I32(y)) => match mnemonic {
            "i32.add" => Some(ConstValue::I32(x.wrapping_add(y))),
            "i32.sub" => Some(ConstValue::I32(x.wrapping_sub(y))),
            "i32.mul" => Some(ConstValue::I32(x.wrapping_mul(y))),
            "i32.div_s" if y != 0 => Some(ConstValue::I32(x.wrapping_div(y))),
            "i32.rem_s" if y != 0 => Some(ConstValue::I32(x.wrapping_rem(y))),
            "i32.and" => Some(ConstValue::I32(x & y)),
            "i32.or" => Some(ConstValue::I32(x | y)),
            "i32.eq" => Some(ConstValue::I32((x == y) as i32)),
            "i32.ne" => Some(ConstValue::I32((x != y) as i32)),
            "i32.lt_s" => Some(ConstValue::I32((x < y) as i32)),
            "i32.gt_s" => Some(ConstValue::I32((x > y) as i32)),
            "i32.le_s" => Some(ConstValue::I32((x <= y) as i32)),
            "i32.ge_s" => Some(ConstValue::I32((x >= y) as i32)),
            _ => None,
        },
        (ConstValue::F64(x), ConstValue::F64(y)) => match mnemonic {
            "f64.add" => Some(ConstValue::F64(x + y)),
            "f64.sub" => Some(ConstValue::F64(x - y)),
            "f64.mul" => Some(ConstValue::F64(x * y)),
            "f64.div" if y != 0.0 => Some(ConstValue::F64(x / y)),
            "f64.eq" => Some(ConstValue::I32((x == y) as i32)),
            "f64.ne" => Some(ConstValue::I32((x != y) as i32)),
            "f64.lt" => Some(ConstValue::I32((x < y) as i32)),
            "f64.gt" => Some(ConstValue::I32((x > y) as i32)),
            "f64.le" => Some(ConstValue::I32((x <= y) as i32)),
            "f64.ge" => Some(ConstValue::I32((x >= y) as i32)),
            _ => None,
        },
        _ => None,
    }
}

// -- StrengthReduction --------------------------------------------------------

fn reduce_strength(instrs: &mut Vec<WatInstr>) -> u32 {
    let mut count = 0;
    for instr in instrs.iter_mut() {
        match instr {
            WatInstr::Block { body, .. } | WatInstr::Loop { body, .. } => count += reduce_strength(body),
            WatInstr::If { then_body, else_body } => {
                count += reduce_strength(then_body);
                count += reduce_strength(else_body);
            }
            _ => {}
        }
    }

    let mut i = 0;
    while i + 1 < instrs.len() {
        if let (WatInstr::Const(ConstValue::I32(k)), WatInstr::Op(mnemonic)) = (&instrs[i], &instrs[i + 1]) {
            let k = *k;
            if k > 0 && (k & (k - 1)) == 0 {
                let shift = k.trailing_zeros() as i32;
                let replacement = match *mnemonic {
                    "i32.mul" => Some(("i32.shl", shift)),
                    "i32.div_s" => Some(("i32.shr_s", shift)),
                    "i32.rem_s" => None, // rem becomes a mask, not a shift: handled separately below
                    _ => None,
                };
                if let Some((op, operand)) = replacement {
                    instrs[i] = WatInstr::Const(ConstValue::I32(operand));
                    instrs[i + 1] = WatInstr::Op(op);
                    count += 1;
                    i += 2;
                    continue;
                }
                if *mnemonic == "i32.rem_s" {
                    instrs[i] = WatInstr::Const(ConstValue::I32(k - 1));
                    instrs[i + 1] = WatInstr::Op("i32.and");
                    count += 1;
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    count
}

// -- CommonSubexpressionElimination -------------------------------------------

/// Within-basic-block only (spec.md §9): each nested body (function top
/// level, or a `Block`/`Loop`/`If` arm) is treated as its own block, never
/// straddled. Detects repeated 3-instruction pure binary subexpressions
/// (`operand, operand, Op`) and hoists the second-and-later occurrences to a
/// `local.tee`'d temporary.
fn eliminate_common_subexpressions(function: &mut WatFunction) -> u32 {
    let mut counter = 0;
    let mut new_locals = Vec::new();
    let removed = cse_block(&mut function.body, &mut counter, &mut new_locals);
    function.locals.extend(new_locals);
    removed
}

fn cse_block(instrs: &mut Vec<WatInstr>, counter: &mut u32, new_locals: &mut Vec<WatLocal>) -> u32 {
    let mut removed = 0;
    for instr in instrs.iter_mut() {
        match instr {
            WatInstr::Block { body, .. } | WatInstr::Loop { body, .. } => removed += cse_block(body, counter, new_locals),
            WatInstr::If { then_body, else_body } => {
                removed += cse_block(then_body, counter, new_locals);
                removed += cse_block(else_body, counter, new_locals);
            }
            _ => {}
        }
    }

    let mut seen: HashMap<[WatInstr; 3], String> = HashMap::new();
    let mut i = 0;
    let mut result = Vec::with_capacity(instrs.len());
    while i + 2 < instrs.len() {
        let window = [instrs[i].clone(), instrs[i + 1].clone(), instrs[i + 2].clone()];
        let is_pure_binary = matches!(window[0], WatInstr::LocalGet(_) | WatInstr::Const(_))
            && matches!(window[1], WatInstr::LocalGet(_) | WatInstr::Const(_))
            && matches!(window[2], WatInstr::Op(_));

        if is_pure_binary {
            if let Some(name) = seen.get(&window) {
                result.push(WatInstr::LocalGet(name.clone()));
                i += 3;
                removed += 1;
                continue;
            }
            let name = format!("cse{counter}");
            *counter += 1;
            result.push(window[0].clone());
            result.push(window[1].clone());
            result.push(window[2].clone());
            result.push(WatInstr::LocalTee(name.clone()));
            new_locals.push(WatLocal { name: name.clone(), valtype: crate::types::WasmValType::I32 });
            seen.insert(window, name);
            i += 3;
            continue;
        }
        result.push(instrs[i].clone());
        i += 1;
    }
    while i < instrs.len() {
        result.push(instrs[i].clone());
        i += 1;
    }
    *instrs = result;
    removed
}

// -- LoopUnrolling -------------------------------------------------------------

/// Duplicates the body of a simple (straight-line, no nested control flow)
/// counted loop `unroll_factor` times. Skips silently when the loop isn't
/// simple, matching spec.md's "transforms may be skipped if a preflight
/// check indicates inapplicability".
fn unroll_loops(instrs: &mut [WatInstr], unroll_factor: usize) -> u32 {
    let mut count = 0;
    for instr in instrs.iter_mut() {
        if let WatInstr::Block { body, .. } = instr {
            if let Some(WatInstr::Loop { body: loop_body, .. }) = body.first_mut() {
                if try_unroll_one(loop_body, unroll_factor) {
                    count += 1;
                }
            }
            for nested in body.iter_mut() {
                count += unroll_loops(std::slice::from_mut(nested), unroll_factor);
            }
        }
    }
    count
}

fn try_unroll_one(loop_body: &mut Vec<WatInstr>, unroll_factor: usize) -> bool {
    if unroll_factor < 2 {
        return false;
    }
    // Preflight: the guarded region (between the condition's `br_if` and the
    // trailing `br`) must be simple, straight-line code — no nested control
    // flow — or unrolling is skipped.
    let br_if_pos = loop_body.iter().position(|i| matches!(i, WatInstr::BrIf(_)));
    let br_pos = loop_body.iter().rposition(|i| matches!(i, WatInstr::Br(_)));
    let (Some(start), Some(end)) = (br_if_pos, br_pos) else { return false };
    if start + 1 >= end {
        return false;
    }
    let guarded = &loop_body[start + 1..end];
    let is_simple = guarded.iter().all(|i| !matches!(i, WatInstr::Block { .. } | WatInstr::Loop { .. } | WatInstr::If { .. }));
    if !is_simple {
        return false;
    }

    let guarded_owned: Vec<WatInstr> = guarded.to_vec();
    let mut duplicated = Vec::with_capacity(guarded_owned.len() * unroll_factor);
    for _ in 0..unroll_factor {
        duplicated.extend(guarded_owned.clone());
    }
    loop_body.splice(start + 1..end, duplicated);
    true
}

// -- Vectorization --------------------------------------------------------------

/// Replaces four or more contiguous identical `f64` binary arithmetic ops
/// (the closest structural signal this IR has to a lane-parallel array-op
/// pattern) with a single `f32x4` equivalent. In practice this codegen has
/// no array lowering yet, so this almost always finds nothing and silently
/// no-ops — a preflight skip, not a bug.
fn vectorize(instrs: &mut Vec<WatInstr>) -> u32 {
    let mut count = 0;
    for instr in instrs.iter_mut() {
        match instr {
            WatInstr::Block { body, .. } | WatInstr::Loop { body, .. } => count += vectorize(body),
            WatInstr::If { then_body, else_body } => {
                count += vectorize(then_body);
                count += vectorize(else_body);
            }
            _ => {}
        }
    }

    const LANES: usize = 4;
    let simd_mnemonic = |scalar: &str| -> Option<&'static str> {
        match scalar {
            "f64.add" => Some("f32x4.add"),
            "f64.mul" => Some("f32x4.mul"),
            "f64.sub" => Some("f32x4.sub"),
            _ => None,
        }
    };

    let mut i = 0;
    let mut result = Vec::with_capacity(instrs.len());
    while i < instrs.len() {
        if let WatInstr::Op(mnemonic) = &instrs[i] {
            if let Some(simd) = simd_mnemonic(mnemonic) {
                let run = instrs[i..].iter().take_while(|x| matches!(x, WatInstr::Op(m) if *m == *mnemonic)).count();
                if run >= LANES {
                    result.push(WatInstr::Op(simd));
                    i += LANES;
                    count += 1;
                    continue;
                }
            }
        }
        result.push(instrs[i].clone());
        i += 1;
    }
    *instrs = result;
    count
}

// -- TailCallOptimization --------------------------------------------------------

/// Rewrites a self-call immediately followed by `return` into assignments to
/// the parameter locals plus a `br` to a synthesized loop head wrapping the
/// whole function body. No qualifying tail call means no wrapper is added
/// (silent skip).
fn optimize_tail_calls(function: &mut WatFunction) -> u32 {
    let loop_label = "tailrec".to_string();
    let param_names: Vec<String> = function.params.iter().map(|p| p.name.clone()).collect();
    let mut count = 0;
    rewrite_tail_calls(&mut function.body, &function.name, &param_names, &loop_label, &mut count);
    if count > 0 {
        let body = std::mem::take(&mut function.body);
        function.body = vec![WatInstr::Loop { label: loop_label, body }];
    }
    count
}

fn rewrite_tail_calls(instrs: &mut Vec<WatInstr>, fn_name: &str, params: &[String], loop_label: &str, count: &mut u32) {
    for instr in instrs.iter_mut() {
        match instr {
            WatInstr::If { then_body, else_body } => {
                rewrite_tail_calls(then_body, fn_name, params, loop_label, count);
                rewrite_tail_calls(else_body, fn_name, params, loop_label, count);
            }
            WatInstr::Block { body, .. } | WatInstr::Loop { body, .. } => {
                rewrite_tail_calls(body, fn_name, params, loop_label, count);
            }
            _ => {}
        }
    }

    if instrs.len() >= 2 {
        let last_two = &instrs[instrs.len() - 2..];
        if let (WatInstr::Call(callee), WatInstr::Return) = (&last_two[0], &last_two[1]) {
            if callee == fn_name {
                let call_pos = instrs.len() - 2;
                instrs.truncate(call_pos);
                // Arguments are already on the stack in order; bind them to
                // the parameter locals back-to-front, since the last
                // argument evaluated sits on top.
                for name in params.iter().rev() {
                    instrs.push(WatInstr::LocalSet(name.clone()));
                }
                instrs.push(WatInstr::Br(loop_label.to_string()));
                *count += 1;
            }
        }
    }
}

// -- Inlining --------------------------------------------------------------------

fn inline_eligible_calls(
    instrs: &mut Vec<WatInstr>,
    caller_locals: &mut Vec<WatLocal>,
    module: &[WatFunction],
    recursive: &HashSet<String>,
    size_threshold: usize,
    call_site_counter: &mut u32,
) -> u32 {
    let mut inlined = 0;
    for instr in instrs.iter_mut() {
        match instr {
            WatInstr::Block { body, .. } | WatInstr::Loop { body, .. } => {
                inlined += inline_eligible_calls(body, caller_locals, module, recursive, size_threshold, call_site_counter)
            }
            WatInstr::If { then_body, else_body } => {
                inlined += inline_eligible_calls(then_body, caller_locals, module, recursive, size_threshold, call_site_counter);
                inlined += inline_eligible_calls(else_body, caller_locals, module, recursive, size_threshold, call_site_counter);
            }
            _ => {}
        }
    }

    let mut i = 0;
    let mut result = Vec::with_capacity(instrs.len());
    while i < instrs.len() {
        if let WatInstr::Call(name) = &instrs[i] {
            let callee = module.iter().find(|f| &f.name == name);
            let eligible = callee.map(|f| {
                !recursive.contains(name)
                    && f.body.len() <= size_threshold
                    && matches!(f.body.last(), Some(WatInstr::Return) | None)
                    && f.body.iter().all(|i| !matches!(i, WatInstr::Block { .. } | WatInstr::Loop { .. } | WatInstr::If { .. }))
            });
            if eligible == Some(true) {
                let callee = callee.unwrap();
                let suffix = format!("_inl{}", *call_site_counter);
                *call_site_counter += 1;

                // Arguments are on the stack in call order; bind them
                // back-to-front since the last argument evaluated is on top.
                for param in callee.params.iter().rev() {
                    result.push(WatInstr::LocalSet(format!("{}{suffix}", param.name)));
                }
                for param in &callee.params {
                    caller_locals.push(WatLocal { name: format!("{}{suffix}", param.name), valtype: param.valtype });
                }
                for local in &callee.locals {
                    caller_locals.push(WatLocal { name: format!("{}{suffix}", local.name), valtype: local.valtype });
                }

                let rename = |n: &str| -> String {
                    if callee.params.iter().any(|p| p.name == n) || callee.locals.iter().any(|l| l.name == n) {
                        format!("{n}{suffix}")
                    } else {
                        n.to_string()
                    }
                };
                for body_instr in &callee.body {
                    if matches!(body_instr, WatInstr::Return) {
                        continue;
                    }
                    result.push(rename_instr(body_instr, &rename));
                }

                inlined += 1;
                i += 1;
                continue;
            }
        }
        result.push(instrs[i].clone());
        i += 1;
    }
    *instrs = result;
    inlined
}

fn rename_instr(instr: &WatInstr, rename: &impl Fn(&str) -> String) -> WatInstr {
    match instr {
        WatInstr::LocalGet(n) => WatInstr::LocalGet(rename(n)),
        WatInstr::LocalSet(n) => WatInstr::LocalSet(rename(n)),
        WatInstr::LocalTee(n) => WatInstr::LocalTee(rename(n)),
        WatInstr::Block { label, body } => {
            WatInstr::Block { label: label.clone(), body: body.iter().map(|i| rename_instr(i, rename)).collect() }
        }
        WatInstr::Loop { label, body } => {
            WatInstr::Loop { label: label.clone(), body: body.iter().map(|i| rename_instr(i, rename)).collect() }
        }
        WatInstr::If { then_body, else_body } => WatInstr::If {
            then_body: then_body.iter().map(|i| rename_instr(i, rename)).collect(),
            else_body: else_body.iter().map(|i| rename_instr(i, rename)).collect(),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WasmValType;

    fn simple_fn(name: &str, params: &[&str], body: Vec<WatInstr>) -> WatFunction {
        WatFunction {
            name: name.to_string(),
            params: params.iter().map(|p| WatLocal { name: p.to_string(), valtype: WasmValType::I32 }).collect(),
            result: Some(WasmValType::I32),
            locals: vec![],
            body,
        }
    }

    #[test]
    fn constant_folding_collapses_a_literal_binary_op() {
        let mut f = simple_fn(
            "f",
            &[],
            vec![WatInstr::Const(ConstValue::I32(2)), WatInstr::Const(ConstValue::I32(3)), WatInstr::Op("i32.add"), WatInstr::Return],
        );
        let stats = apply_plan(&mut f, &[OptimizationKind::ConstantFolding], 4);
        assert_eq!(stats.constants_folded, 1);
        assert_eq!(f.body[0], WatInstr::Const(ConstValue::I32(5)));
    }

    #[test]
    fn constant_folding_is_idempotent() {
        let mut f = simple_fn(
            "f",
            &[],
            vec![WatInstr::Const(ConstValue::I32(2)), WatInstr::Const(ConstValue::I32(3)), WatInstr::Op("i32.add"), WatInstr::Return],
        );
        apply_plan(&mut f, &[OptimizationKind::ConstantFolding], 4);
        let once = f.body.clone();
        apply_plan(&mut f, &[OptimizationKind::ConstantFolding], 4);
        assert_eq!(f.body, once);
    }

    #[test]
    fn constant_folding_skips_division_by_a_literal_zero() {
        let mut f = simple_fn(
            "f",
            &[],
            vec![WatInstr::Const(ConstValue::I32(10)), WatInstr::Const(ConstValue::I32(0)), WatInstr::Op("i32.div_s"), WatInstr::Return],
        );
        let stats = apply_plan(&mut f, &[OptimizationKind::ConstantFolding], 4);
        assert_eq!(stats.constants_folded, 0);
        assert!(f.body.contains(&WatInstr::Op("i32.div_s")));
    }

    #[test]
    fn strength_reduction_replaces_power_of_two_multiply_with_a_shift() {
        let mut f = simple_fn(
            "dbl",
            &["x"],
            vec![WatInstr::LocalGet("x".to_string()), WatInstr::Const(ConstValue::I32(2)), WatInstr::Op("i32.mul"), WatInstr::Return],
        );
        let stats = apply_plan(&mut f, &[OptimizationKind::StrengthReduction], 4);
        assert_eq!(stats.strength_reductions, 1);
        assert_eq!(
            f.body,
            vec![
                WatInstr::LocalGet("x".to_string()),
                WatInstr::Const(ConstValue::I32(1)),
                WatInstr::Op("i32.shl"),
                WatInstr::Return,
            ]
        );
    }

    #[test]
    fn strength_reduction_replaces_power_of_two_remainder_with_a_mask() {
        let mut f = simple_fn(
            "m",
            &["x"],
            vec![WatInstr::LocalGet("x".to_string()), WatInstr::Const(ConstValue::I32(8)), WatInstr::Op("i32.rem_s"), WatInstr::Return],
        );
        apply_plan(&mut f, &[OptimizationKind::StrengthReduction], 4);
        assert_eq!(
            f.body,
            vec![
                WatInstr::LocalGet("x".to_string()),
                WatInstr::Const(ConstValue::I32(7)),
                WatInstr::Op("i32.and"),
                WatInstr::Return,
            ]
        );
    }

    #[test]
    fn cse_hoists_a_repeated_subexpression_to_a_local() {
        let mut f = simple_fn(
            "f",
            &["a", "b"],
            vec![
                WatInstr::LocalGet("a".to_string()),
                WatInstr::LocalGet("b".to_string()),
                WatInstr::Op("i32.add"),
                WatInstr::Drop,
                WatInstr::LocalGet("a".to_string()),
                WatInstr::LocalGet("b".to_string()),
                WatInstr::Op("i32.add"),
                WatInstr::Return,
            ],
        );
        let stats = apply_plan(&mut f, &[OptimizationKind::CommonSubexpressionElimination], 4);
        assert_eq!(stats.subexpressions_eliminated, 1);
        assert!(f.body.iter().any(|i| matches!(i, WatInstr::LocalTee(_))));
        assert!(f.locals.iter().any(|l| l.name.starts_with("cse")));
    }

    #[test]
    fn loop_unrolling_duplicates_a_simple_counted_loop_body() {
        let mut f = simple_fn(
            "sum",
            &["n"],
            vec![WatInstr::Block {
                label: "b0".to_string(),
                body: vec![WatInstr::Loop {
                    label: "l0".to_string(),
                    body: vec![
                        WatInstr::LocalGet("n".to_string()),
                        WatInstr::Op("i32.eqz"),
                        WatInstr::BrIf("b0".to_string()),
                        WatInstr::LocalGet("n".to_string()),
                        WatInstr::Drop,
                        WatInstr::Br("l0".to_string()),
                    ],
                }],
            }],
        );
        let stats = apply_plan(&mut f, &[OptimizationKind::LoopUnrolling], 4);
        assert_eq!(stats.loops_unrolled, 1);
        let WatInstr::Block { body, .. } = &f.body[0] else { unreachable!() };
        let WatInstr::Loop { body: loop_body, .. } = &body[0] else { unreachable!() };
        let drop_count = loop_body.iter().filter(|i| matches!(i, WatInstr::Drop)).count();
        assert_eq!(drop_count, 4);
    }

    #[test]
    fn tail_call_optimization_rewrites_self_call_followed_by_return_into_a_branch() {
        let mut f = simple_fn(
            "fact",
            &["n", "acc"],
            vec![
                WatInstr::LocalGet("n".to_string()),
                WatInstr::Const(ConstValue::I32(1)),
                WatInstr::Op("i32.sub"),
                WatInstr::LocalGet("n".to_string()),
                WatInstr::LocalGet("acc".to_string()),
                WatInstr::Op("i32.mul"),
                WatInstr::Call("fact".to_string()),
                WatInstr::Return,
            ],
        );
        let stats = apply_plan(&mut f, &[OptimizationKind::TailCallOptimization], 4);
        assert_eq!(stats.tail_calls_rewritten, 1);
        assert!(!f.body.iter().any(|i| matches!(i, WatInstr::Call(name) if name == "fact")));
        assert!(matches!(&f.body[0], WatInstr::Loop { .. }));
    }

    #[test]
    fn inlining_substitutes_a_small_non_recursive_callee_body() {
        let callee = simple_fn(
            "add",
            &["a", "b"],
            vec![WatInstr::LocalGet("a".to_string()), WatInstr::LocalGet("b".to_string()), WatInstr::Op("i32.add"), WatInstr::Return],
        );
        let caller = simple_fn(
            "caller",
            &["x"],
            vec![
                WatInstr::LocalGet("x".to_string()),
                WatInstr::Const(ConstValue::I32(1)),
                WatInstr::Call("add".to_string()),
                WatInstr::Return,
            ],
        );
        let mut module = WatModule { functions: vec![callee, caller], exports: vec![] };
        let mut plans = HashMap::new();
        plans.insert("caller".to_string(), vec![OptimizationKind::Inlining]);
        let stats = apply_inlining(&mut module, &plans, &HashSet::new());
        assert_eq!(stats.calls_inlined, 1);
        let caller = module.function("caller").unwrap();
        assert!(!caller.body.iter().any(|i| matches!(i, WatInstr::Call(name) if name == "add")));
    }

    #[test]
    fn recursive_functions_are_never_inlined() {
        let callee = simple_fn(
            "f",
            &["n"],
            vec![WatInstr::LocalGet("n".to_string()), WatInstr::Call("f".to_string()), WatInstr::Return],
        );
        let caller = simple_fn("caller", &["x"], vec![WatInstr::LocalGet("x".to_string()), WatInstr::Call("f".to_string()), WatInstr::Return]);
        let mut module = WatModule { functions: vec![callee, caller], exports: vec![] };
        let mut plans = HashMap::new();
        plans.insert("caller".to_string(), vec![OptimizationKind::Inlining]);
        let mut recursive = HashSet::new();
        recursive.insert("f".to_string());
        let stats = apply_inlining(&mut module, &plans, &recursive);
        assert_eq!(stats.calls_inlined, 0);
    }
}
