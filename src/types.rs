// Scalar type system for the type analyzer (spec.md §3, §4.3).
//
// Narrowed from the teacher's Hindley-Milner `Type`/`TypeEnv` (which exists to
// check generics, traits, and impls this language doesn't have) down to the
// closed scalar lattice and lexically-scoped environment the spec specifies.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Integer,
    Number,
    Boolean,
    String,
    Array,
    Object,
    Function { param_types: Vec<Type>, return_type: Box<Type> },
    Void,
    Unknown,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "Integer"),
            Type::Number => write!(f, "Number"),
            Type::Boolean => write!(f, "Boolean"),
            Type::String => write!(f, "String"),
            Type::Array => write!(f, "Array"),
            Type::Object => write!(f, "Object"),
            Type::Function { param_types, return_type } => {
                write!(f, "Function(")?;
                for (i, p) in param_types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {return_type}")
            }
            Type::Void => write!(f, "Void"),
            Type::Unknown => write!(f, "Unknown"),
        }
    }
}

impl Type {
    /// Widen two operand types for an arithmetic binary operator: `Integer`
    /// with `Integer` stays `Integer`; any mix with `Number` widens to
    /// `Number`; anything involving `Unknown` is `Unknown` (contagious only
    /// when no concrete constraint fires, per spec.md §3).
    pub fn widen_arithmetic(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Integer, Type::Integer) => Type::Integer,
            (Type::Integer, Type::Number) | (Type::Number, Type::Integer) | (Type::Number, Type::Number) => Type::Number,
            _ => Type::Unknown,
        }
    }

    /// The WASM value type this scalar type lowers to (spec.md §4.6).
    pub fn to_wasm_valtype(&self) -> WasmValType {
        match self {
            Type::Integer | Type::Boolean => WasmValType::I32,
            Type::Number => WasmValType::F64,
            Type::String | Type::Array | Type::Object => WasmValType::ExternRef,
            Type::Function { .. } => WasmValType::FuncRef,
            Type::Void | Type::Unknown => WasmValType::I32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WasmValType {
    I32,
    I64,
    F32,
    F64,
    V128,
    FuncRef,
    ExternRef,
}

impl WasmValType {
    /// The binary encoding byte for this value type (spec.md §4.7).
    pub fn encode_byte(&self) -> u8 {
        match self {
            WasmValType::I32 => 0x7f,
            WasmValType::I64 => 0x7e,
            WasmValType::F32 => 0x7d,
            WasmValType::F64 => 0x7c,
            WasmValType::V128 => 0x7b,
            WasmValType::FuncRef => 0x70,
            WasmValType::ExternRef => 0x6f,
        }
    }

    pub fn text_name(&self) -> &'static str {
        match self {
            WasmValType::I32 => "i32",
            WasmValType::I64 => "i64",
            WasmValType::F32 => "f32",
            WasmValType::F64 => "f64",
            WasmValType::V128 => "v128",
            WasmValType::FuncRef => "funcref",
            WasmValType::ExternRef => "externref",
        }
    }
}

/// A lexically scoped map from identifier name to inferred `Type`, walked
/// in program order by the type analyzer.
pub struct TypeEnv {
    scopes: Vec<HashMap<String, Type>>,
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeEnv {
    pub fn new() -> Self {
        TypeEnv { scopes: vec![HashMap::new()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn bind(&mut self, name: String, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, ty);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return Some(ty);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_arithmetic_rules() {
        assert_eq!(Type::Integer.widen_arithmetic(&Type::Integer), Type::Integer);
        assert_eq!(Type::Integer.widen_arithmetic(&Type::Number), Type::Number);
        assert_eq!(Type::Number.widen_arithmetic(&Type::Integer), Type::Number);
    }

    #[test]
    fn scoped_lookup_shadowing() {
        let mut env = TypeEnv::new();
        env.bind("x".to_string(), Type::Integer);
        env.push_scope();
        env.bind("x".to_string(), Type::String);
        assert_eq!(env.lookup("x"), Some(&Type::String));
        env.pop_scope();
        assert_eq!(env.lookup("x"), Some(&Type::Integer));
    }
}
