// WAT instruction IR and its textual pretty-printer (spec.md §4.6), grounded
// on the postfix-stack shape `jounce`'s old `codegen.rs` lowers expressions
// into, retargeted from its JS-host-call emission to a pure WASM stack
// machine with symbolic locals and labels (resolved to indices only in the
// assembler, not here).

use crate::types::WasmValType;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    I32(i32),
    F64(f64),
}

/// One instruction in a function's body. Locals, labels, and call targets
/// stay symbolic (`String`) through codegen and optimization; the assembler
/// resolves them to indices against a function's declared locals and the
/// module's function order.
#[derive(Debug, Clone, PartialEq)]
pub enum WatInstr {
    Const(ConstValue),
    LocalGet(String),
    LocalSet(String),
    LocalTee(String),
    Call(String),
    Drop,
    Return,
    /// A fixed-mnemonic, no-operand opcode such as `i32.add` or `i32.eqz`.
    /// The mnemonic is resolved to a byte by the assembler's opcode table.
    Op(&'static str),
    Block { label: String, body: Vec<WatInstr> },
    Loop { label: String, body: Vec<WatInstr> },
    Br(String),
    BrIf(String),
    If { then_body: Vec<WatInstr>, else_body: Vec<WatInstr> },
}

impl WatInstr {
    /// Net stack effect (values pushed minus values popped), used by the
    /// assembler's arity validation (spec.md §4.7). Block-shaped
    /// instructions are validated recursively by the caller, not inline
    /// here, so `Block`/`Loop`/`If` fall through to their own effect
    /// excluding the branch instructions which leave the stack unchanged.
    pub fn stack_effect(&self) -> i32 {
        match self {
            WatInstr::Const(_) => 1,
            WatInstr::LocalGet(_) => 1,
            WatInstr::LocalSet(_) => -1,
            WatInstr::LocalTee(_) => 0,
            WatInstr::Call(_) => 0, // resolved against the callee's signature by the caller
            WatInstr::Drop => -1,
            WatInstr::Return => 0,
            WatInstr::Op(mnemonic) => op_stack_effect(mnemonic),
            WatInstr::Block { .. } | WatInstr::Loop { .. } | WatInstr::If { .. } => 0,
            // `br` carries no values across an empty-blocktype target; `br_if`
            // always pops its condition off the stack regardless of arity.
            WatInstr::Br(_) => 0,
            WatInstr::BrIf(_) => -1,
        }
    }
}

/// Binary ops pop two and push one (net -1); unary ops pop one push one
/// (net 0); `eqz` is unary.
fn op_stack_effect(mnemonic: &str) -> i32 {
    if mnemonic.ends_with("eqz") {
        0
    } else {
        -1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatLocal {
    pub name: String,
    pub valtype: WasmValType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatFunction {
    pub name: String,
    pub params: Vec<WatLocal>,
    pub result: Option<WasmValType>,
    /// Locals beyond the parameters, in first-encounter order.
    pub locals: Vec<WatLocal>,
    pub body: Vec<WatInstr>,
}

impl WatFunction {
    /// All locals (params first, then declared locals) — the order the
    /// assembler assigns local indices in.
    pub fn all_locals(&self) -> Vec<&WatLocal> {
        self.params.iter().chain(&self.locals).collect()
    }

    pub fn local_index(&self, name: &str) -> Option<u32> {
        self.all_locals().iter().position(|l| l.name == name).map(|i| i as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WatModule {
    pub functions: Vec<WatFunction>,
    /// Names exported under their own identifier, function kind.
    pub exports: Vec<String>,
}

impl WatModule {
    pub fn function(&self, name: &str) -> Option<&WatFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_index(&self, name: &str) -> Option<u32> {
        self.functions.iter().position(|f| f.name == name).map(|i| i as u32)
    }
}

fn print_instrs(instrs: &[WatInstr], indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    for instr in instrs {
        match instr {
            WatInstr::Const(ConstValue::I32(v)) => out.push_str(&format!("{pad}i32.const {v}\n")),
            WatInstr::Const(ConstValue::F64(v)) => out.push_str(&format!("{pad}f64.const {v}\n")),
            WatInstr::LocalGet(name) => out.push_str(&format!("{pad}local.get ${name}\n")),
            WatInstr::LocalSet(name) => out.push_str(&format!("{pad}local.set ${name}\n")),
            WatInstr::LocalTee(name) => out.push_str(&format!("{pad}local.tee ${name}\n")),
            WatInstr::Call(name) => out.push_str(&format!("{pad}call ${name}\n")),
            WatInstr::Drop => out.push_str(&format!("{pad}drop\n")),
            WatInstr::Return => out.push_str(&format!("{pad}return\n")),
            WatInstr::Op(mnemonic) => out.push_str(&format!("{pad}{mnemonic}\n")),
            WatInstr::Block { label, body } => {
                out.push_str(&format!("{pad}(block ${label}\n"));
                print_instrs(body, indent + 1, out);
                out.push_str(&format!("{pad})\n"));
            }
            WatInstr::Loop { label, body } => {
                out.push_str(&format!("{pad}(loop ${label}\n"));
                print_instrs(body, indent + 1, out);
                out.push_str(&format!("{pad})\n"));
            }
            WatInstr::Br(label) => out.push_str(&format!("{pad}br ${label}\n")),
            WatInstr::BrIf(label) => out.push_str(&format!("{pad}br_if ${label}\n")),
            WatInstr::If { then_body, else_body } => {
                out.push_str(&format!("{pad}(if\n{pad}  (then\n"));
                print_instrs(then_body, indent + 2, out);
                out.push_str(&format!("{pad}  )\n"));
                if !else_body.is_empty() {
                    out.push_str(&format!("{pad}  (else\n"));
                    print_instrs(else_body, indent + 2, out);
                    out.push_str(&format!("{pad}  )\n"));
                }
                out.push_str(&format!("{pad})\n"));
            }
        }
    }
}

/// Renders a full module as textual WAT, suitable for inspection or
/// hand-verification (spec.md §6's "textual WAT is emitted alongside").
pub fn print_module(module: &WatModule) -> String {
    let mut out = String::new();
    out.push_str("(module\n");
    for function in &module.functions {
        out.push_str(&format!("  (func ${}", function.name));
        for param in &function.params {
            out.push_str(&format!(" (param ${} {})", param.name, param.valtype.text_name()));
        }
        if let Some(result) = function.result {
            out.push_str(&format!(" (result {})", result.text_name()));
        }
        out.push('\n');
        for local in &function.locals {
            out.push_str(&format!("    (local ${} {})\n", local.name, local.valtype.text_name()));
        }
        print_instrs(&function.body, 2, &mut out);
        out.push_str("  )\n");
    }
    for name in &module.exports {
        out.push_str(&format!("  (export \"{name}\" (func ${name}))\n"));
    }
    out.push_str(")\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_identity_addition_module() {
        let module = WatModule {
            functions: vec![WatFunction {
                name: "add".to_string(),
                params: vec![
                    WatLocal { name: "a".to_string(), valtype: WasmValType::I32 },
                    WatLocal { name: "b".to_string(), valtype: WasmValType::I32 },
                ],
                result: Some(WasmValType::I32),
                locals: vec![],
                body: vec![WatInstr::LocalGet("a".to_string()), WatInstr::LocalGet("b".to_string()), WatInstr::Op("i32.add")],
            }],
            exports: vec!["add".to_string()],
        };
        let text = print_module(&module);
        assert!(text.contains("(func $add"));
        assert!(text.contains("i32.add"));
        assert!(text.contains("(export \"add\""));
    }

    #[test]
    fn local_index_resolves_params_then_locals() {
        let f = WatFunction {
            name: "f".to_string(),
            params: vec![WatLocal { name: "a".to_string(), valtype: WasmValType::I32 }],
            result: None,
            locals: vec![WatLocal { name: "s".to_string(), valtype: WasmValType::I32 }],
            body: vec![],
        };
        assert_eq!(f.local_index("a"), Some(0));
        assert_eq!(f.local_index("s"), Some(1));
        assert_eq!(f.local_index("missing"), None);
    }
}
