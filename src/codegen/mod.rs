// WAT code generator (spec.md §4.6): lowers a typed AST into the WAT IR via
// postfix traversal, grounded on the teacher's `codegen.rs` symbol-table +
// per-function local tracking, retargeted from JS-host emission to a pure
// WASM stack machine.

pub mod optimize;
pub mod wat_ir;

use std::collections::HashSet;

use crate::ast::*;
use crate::errors::CompileError;
use crate::types::{Type, WasmValType};
use wat_ir::{ConstValue, WatFunction, WatInstr, WatLocal, WatModule};

/// Fixed binary-op mnemonic table (spec.md §4.6): signed variants for
/// `i32`, float variants for `f64`.
fn binary_mnemonic(op: BinaryOp, valtype: WasmValType) -> &'static str {
    match (op, valtype) {
        (BinaryOp::Add, WasmValType::I32) => "i32.add",
        (BinaryOp::Add, _) => "f64.add",
        (BinaryOp::Sub, WasmValType::I32) => "i32.sub",
        (BinaryOp::Sub, _) => "f64.sub",
        (BinaryOp::Mul, WasmValType::I32) => "i32.mul",
        (BinaryOp::Mul, _) => "f64.mul",
        (BinaryOp::Div, WasmValType::I32) => "i32.div_s",
        (BinaryOp::Div, _) => "f64.div",
        (BinaryOp::Rem, WasmValType::I32) => "i32.rem_s",
        (BinaryOp::Rem, _) => "f64.rem", // not a real WASM op; rem is integer-only in practice, kept for table symmetry
        (BinaryOp::Eq, WasmValType::I32) => "i32.eq",
        (BinaryOp::Eq, _) => "f64.eq",
        (BinaryOp::NotEq, WasmValType::I32) => "i32.ne",
        (BinaryOp::NotEq, _) => "f64.ne",
        (BinaryOp::Lt, WasmValType::I32) => "i32.lt_s",
        (BinaryOp::Lt, _) => "f64.lt",
        (BinaryOp::Gt, WasmValType::I32) => "i32.gt_s",
        (BinaryOp::Gt, _) => "f64.gt",
        (BinaryOp::LtEq, WasmValType::I32) => "i32.le_s",
        (BinaryOp::LtEq, _) => "f64.le",
        (BinaryOp::GtEq, WasmValType::I32) => "i32.ge_s",
        (BinaryOp::GtEq, _) => "f64.ge",
        (BinaryOp::And, _) => "i32.and",
        (BinaryOp::Or, _) => "i32.or",
    }
}

/// The operand valtype a binary op's instruction is chosen against: integer
/// arithmetic widens per `Type::widen_arithmetic`; comparisons key off
/// whichever operand is `Number` (mixed or both-`Number` compares as float).
fn operand_valtype(lt: &Type, rt: &Type) -> WasmValType {
    if matches!(lt, Type::Number) || matches!(rt, Type::Number) {
        WasmValType::F64
    } else {
        WasmValType::I32
    }
}

/// Collects every `VariableDeclaration` name reachable from a function body,
/// in first-encounter order, skipping names already seen (spec.md §4.6).
fn collect_locals(body: &BlockStatement, seen: &mut HashSet<String>, out: &mut Vec<WatLocal>) {
    for stmt in &body.body {
        collect_locals_stmt(stmt, seen, out);
    }
}

fn collect_locals_stmt(stmt: &Statement, seen: &mut HashSet<String>, out: &mut Vec<WatLocal>) {
    match stmt {
        Statement::VariableDeclaration(v) => {
            if seen.insert(v.name.name.clone()) {
                let valtype = v
                    .init
                    .as_ref()
                    .and_then(|e| e.inferred_type.clone())
                    .unwrap_or(Type::Unknown)
                    .to_wasm_valtype();
                out.push(WatLocal { name: v.name.name.clone(), valtype });
            }
        }
        Statement::Block(b) => collect_locals(b, seen, out),
        Statement::If(i) => {
            collect_locals_stmt(&i.then_branch, seen, out);
            if let Some(e) = &i.else_branch {
                collect_locals_stmt(e, seen, out);
            }
        }
        Statement::While(w) => collect_locals_stmt(&w.body, seen, out),
        Statement::For(f) => {
            if let Some(init) = &f.init {
                collect_locals_stmt(init, seen, out);
            }
            collect_locals_stmt(&f.body, seen, out);
        }
        Statement::FunctionDeclaration(_) | Statement::Return(_) | Statement::Expression(_) => {}
    }
}

/// First `return <expr>` found anywhere in the body determines the
/// function's declared result type; a bare `return;` or a function with no
/// return at all lowers to a function with no result (spec.md §4.6).
fn infer_result_type(body: &BlockStatement) -> Option<Type> {
    fn find(stmt: &Statement) -> Option<Option<Type>> {
        match stmt {
            Statement::Return(r) => Some(r.value.as_ref().and_then(|e| e.inferred_type.clone())),
            Statement::Block(b) => b.body.iter().find_map(find),
            Statement::If(i) => find(&i.then_branch).or_else(|| i.else_branch.as_ref().and_then(|e| find(e))),
            Statement::While(w) => find(&w.body),
            Statement::For(f) => find(&f.body),
            _ => None,
        }
    }
    body.body.iter().find_map(find).flatten()
}

pub struct CodeGenerator {
    /// Label counter for `block`/`loop` pairs, unique per function.
    label_counter: u32,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator { label_counter: 0 }
    }

    /// Lowers every top-level function declaration in `program` into the
    /// module, exporting each by name. Non-function top-level statements are
    /// not part of the function set spec.md targets and are skipped.
    pub fn generate_program(&mut self, program: &Program) -> Result<WatModule, CompileError> {
        let mut functions = Vec::new();
        let mut exports = Vec::new();
        for stmt in &program.body {
            if let Statement::FunctionDeclaration(f) = stmt {
                functions.push(self.generate_function(f)?);
                exports.push(f.name.name.clone());
            }
        }
        Ok(WatModule { functions, exports })
    }

    pub fn generate_function(&mut self, f: &FunctionDeclaration) -> Result<WatFunction, CompileError> {
        self.label_counter = 0;

        // Parameter types are not tracked by the analyzer (spec.md §4.3
        // leaves them `Unknown`); downstream phases default `Unknown` to
        // `i32` (spec.md §7), matching the `Integer`-with-no-call-history
        // default from spec.md §8 scenario 1.
        let params: Vec<WatLocal> =
            f.params.iter().map(|p| WatLocal { name: p.name.clone(), valtype: WasmValType::I32 }).collect();

        let mut seen: HashSet<String> = params.iter().map(|p| p.name.clone()).collect();
        let mut locals = Vec::new();
        collect_locals(&f.body, &mut seen, &mut locals);

        let result = infer_result_type(&f.body).map(|t| t.to_wasm_valtype());

        let mut body = Vec::new();
        for stmt in &f.body.body {
            self.lower_statement(stmt, &mut body)?;
        }

        Ok(WatFunction { name: f.name.name.clone(), params, result, locals, body })
    }

    fn next_label(&mut self) -> (String, String) {
        let n = self.label_counter;
        self.label_counter += 1;
        (format!("b{n}"), format!("l{n}"))
    }

    fn lower_statement(&mut self, stmt: &Statement, out: &mut Vec<WatInstr>) -> Result<(), CompileError> {
        match stmt {
            Statement::FunctionDeclaration(_) => Ok(()), // nested declarations are not part of this language's codegen surface
            Statement::VariableDeclaration(v) => {
                if let Some(init) = &v.init {
                    self.lower_expression(init, out)?;
                    out.push(WatInstr::LocalSet(v.name.name.clone()));
                }
                Ok(())
            }
            Statement::Block(b) => {
                for s in &b.body {
                    self.lower_statement(s, out)?;
                }
                Ok(())
            }
            Statement::Return(r) => {
                if let Some(value) = &r.value {
                    self.lower_expression(value, out)?;
                }
                out.push(WatInstr::Return);
                Ok(())
            }
            Statement::If(i) => {
                self.lower_expression(&i.condition, out)?;
                let mut then_body = Vec::new();
                self.lower_statement(&i.then_branch, &mut then_body)?;
                let mut else_body = Vec::new();
                if let Some(e) = &i.else_branch {
                    self.lower_statement(e, &mut else_body)?;
                }
                out.push(WatInstr::If { then_body, else_body });
                Ok(())
            }
            Statement::While(w) => {
                let (block_label, loop_label) = self.next_label();
                let mut loop_body = Vec::new();
                self.lower_expression(&w.condition, &mut loop_body)?;
                loop_body.push(WatInstr::Op("i32.eqz"));
                loop_body.push(WatInstr::BrIf(block_label.clone()));
                self.lower_statement(&w.body, &mut loop_body)?;
                loop_body.push(WatInstr::Br(loop_label.clone()));
                out.push(WatInstr::Block { label: block_label, body: vec![WatInstr::Loop { label: loop_label, body: loop_body }] });
                Ok(())
            }
            Statement::For(f) => {
                if let Some(init) = &f.init {
                    self.lower_statement(init, out)?;
                }
                let (block_label, loop_label) = self.next_label();
                let mut loop_body = Vec::new();
                if let Some(condition) = &f.condition {
                    self.lower_expression(condition, &mut loop_body)?;
                    loop_body.push(WatInstr::Op("i32.eqz"));
                    loop_body.push(WatInstr::BrIf(block_label.clone()));
                }
                self.lower_statement(&f.body, &mut loop_body)?;
                if let Some(update) = &f.update {
                    self.lower_statement(update, &mut loop_body)?;
                }
                loop_body.push(WatInstr::Br(loop_label.clone()));
                out.push(WatInstr::Block { label: block_label, body: vec![WatInstr::Loop { label: loop_label, body: loop_body }] });
                Ok(())
            }
            Statement::Expression(e) => {
                self.lower_expression(&e.expr, out)?;
                // Every lowered expression leaves exactly one value on the
                // stack (assignments included, per spec.md §4.6); an
                // expression statement always drops it.
                out.push(WatInstr::Drop);
                Ok(())
            }
        }
    }

    fn lower_expression(&mut self, expr: &Expression, out: &mut Vec<WatInstr>) -> Result<(), CompileError> {
        match &expr.kind {
            ExpressionKind::Identifier(id) => {
                out.push(WatInstr::LocalGet(id.name.clone()));
                Ok(())
            }
            ExpressionKind::NumberLiteral(n) => {
                if n.is_integer {
                    out.push(WatInstr::Const(ConstValue::I32(n.value as i32)));
                } else {
                    out.push(WatInstr::Const(ConstValue::F64(n.value)));
                }
                Ok(())
            }
            ExpressionKind::StringLiteral(_) | ExpressionKind::NullLiteral => Err(CompileError::Codegen {
                function: String::new(),
                message: "string/null literals have no scalar WASM lowering in this target".to_string(),
            }),
            ExpressionKind::BooleanLiteral(b) => {
                out.push(WatInstr::Const(ConstValue::I32(if *b { 1 } else { 0 })));
                Ok(())
            }
            ExpressionKind::Binary(b) => {
                self.lower_expression(&b.left, out)?;
                self.lower_expression(&b.right, out)?;
                let lt = b.left.inferred_type.clone().unwrap_or(Type::Unknown);
                let rt = b.right.inferred_type.clone().unwrap_or(Type::Unknown);
                let valtype = operand_valtype(&lt, &rt);
                out.push(WatInstr::Op(binary_mnemonic(b.op, valtype)));
                Ok(())
            }
            ExpressionKind::Unary(u) => {
                match u.op {
                    UnaryOp::Neg => {
                        let operand_ty = u.operand.inferred_type.clone().unwrap_or(Type::Unknown);
                        let valtype = operand_ty.to_wasm_valtype();
                        out.push(WatInstr::Const(if valtype == WasmValType::F64 {
                            ConstValue::F64(0.0)
                        } else {
                            ConstValue::I32(0)
                        }));
                        self.lower_expression(&u.operand, out)?;
                        out.push(WatInstr::Op(if valtype == WasmValType::F64 { "f64.sub" } else { "i32.sub" }));
                    }
                    UnaryOp::Not => {
                        self.lower_expression(&u.operand, out)?;
                        out.push(WatInstr::Op("i32.eqz"));
                    }
                    UnaryOp::Plus => {
                        self.lower_expression(&u.operand, out)?;
                    }
                }
                Ok(())
            }
            ExpressionKind::Assignment(a) => {
                self.lower_expression(&a.value, out)?;
                out.push(WatInstr::LocalTee(a.target.name.clone()));
                Ok(())
            }
            ExpressionKind::Call(c) => {
                let ExpressionKind::Identifier(callee_id) = &c.callee.kind else {
                    return Err(CompileError::Codegen {
                        function: String::new(),
                        message: "indirect calls through a non-identifier callee have no lowering in this target"
                            .to_string(),
                    });
                };
                for arg in &c.arguments {
                    self.lower_expression(arg, out)?;
                }
                out.push(WatInstr::Call(callee_id.name.clone()));
                Ok(())
            }
            ExpressionKind::Member(_) => Err(CompileError::Codegen {
                function: String::new(),
                message: "member access has no scalar WASM lowering in this target".to_string(),
            }),
            ExpressionKind::ArrowFunction(_) => Err(CompileError::Codegen {
                function: String::new(),
                message: "arrow functions are not independently codegen'd; only top-level declarations are".to_string(),
            }),
        }
    }
}
