// Scalar-lattice type analyzer (spec.md §4.3), narrowed from the teacher's
// Hindley-Milner `TypeChecker` (constraint generation + unification over
// generics, traits and impls) down to a single environment-threaded walk:
// no unknowns are solved for, every node's type is read off directly from
// its children as the walk proceeds.

use crate::ast::*;
use crate::errors::CompileError;
use crate::types::{Type, TypeEnv};

pub struct TypeAnalyzer {
    env: TypeEnv,
    errors: Vec<CompileError>,
}

impl Default for TypeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeAnalyzer {
    pub fn new() -> Self {
        TypeAnalyzer { env: TypeEnv::new(), errors: Vec::new() }
    }

    /// Annotates every expression node in `program` with its inferred type,
    /// returning any type errors collected along the way. Errors are
    /// non-fatal: the walk always completes and every node ends up with
    /// `Some(_)` in `inferred_type`.
    pub fn analyze(&mut self, program: &mut Program) -> Vec<CompileError> {
        for stmt in &mut program.body {
            self.visit_statement(stmt);
        }
        std::mem::take(&mut self.errors)
    }

    fn visit_statement(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::FunctionDeclaration(f) => self.visit_function(f),
            Statement::VariableDeclaration(v) => self.visit_variable_declaration(v),
            Statement::Block(b) => self.visit_block(b),
            Statement::Return(r) => {
                if let Some(expr) = &mut r.value {
                    self.visit_expression(expr);
                }
            }
            Statement::If(i) => {
                self.visit_expression(&mut i.condition);
                self.visit_statement(&mut i.then_branch);
                if let Some(else_branch) = &mut i.else_branch {
                    self.visit_statement(else_branch);
                }
            }
            Statement::While(w) => {
                self.visit_expression(&mut w.condition);
                self.visit_statement(&mut w.body);
            }
            Statement::For(f) => {
                self.env.push_scope();
                if let Some(init) = &mut f.init {
                    self.visit_statement(init);
                }
                if let Some(cond) = &mut f.condition {
                    self.visit_expression(cond);
                }
                if let Some(update) = &mut f.update {
                    self.visit_statement(update);
                }
                self.visit_statement(&mut f.body);
                self.env.pop_scope();
            }
            Statement::Expression(e) => self.visit_expression(&mut e.expr),
        }
    }

    fn visit_function(&mut self, f: &mut FunctionDeclaration) {
        self.env.push_scope();
        for param in &f.params {
            // Parameters carry no declared type in this language; they start
            // `Unknown` and narrow only if the analyzer later sees a
            // consistent use (it doesn't re-visit, so this is the final
            // value — matching spec.md's "otherwise Unknown" fallback).
            self.env.bind(param.name.clone(), Type::Unknown);
        }
        let param_types = vec![Type::Unknown; f.params.len()];
        self.env.bind(
            f.name.name.clone(),
            Type::Function { param_types, return_type: Box::new(Type::Unknown) },
        );
        self.visit_block(&mut f.body);
        self.env.pop_scope();
    }

    fn visit_variable_declaration(&mut self, v: &mut VariableDeclaration) {
        let ty = if let Some(init) = &mut v.init {
            self.visit_expression(init);
            init.inferred_type.clone().unwrap_or(Type::Unknown)
        } else {
            Type::Unknown
        };
        self.env.bind(v.name.name.clone(), ty);
    }

    fn visit_block(&mut self, b: &mut BlockStatement) {
        self.env.push_scope();
        for stmt in &mut b.body {
            self.visit_statement(stmt);
        }
        self.env.pop_scope();
    }

    fn visit_expression(&mut self, expr: &mut Expression) {
        let ty = match &mut expr.kind {
            ExpressionKind::Identifier(id) => self.env.lookup(&id.name).cloned().unwrap_or(Type::Unknown),
            ExpressionKind::NumberLiteral(n) => {
                if n.is_integer {
                    Type::Integer
                } else {
                    Type::Number
                }
            }
            ExpressionKind::StringLiteral(_) => Type::String,
            ExpressionKind::BooleanLiteral(_) => Type::Boolean,
            ExpressionKind::NullLiteral => Type::Unknown,
            ExpressionKind::Binary(b) => self.visit_binary(b),
            ExpressionKind::Unary(u) => self.visit_unary(u),
            ExpressionKind::Assignment(a) => self.visit_assignment(a),
            ExpressionKind::Call(c) => self.visit_call(c),
            ExpressionKind::Member(m) => {
                self.visit_expression(&mut m.object);
                self.visit_expression(&mut m.property);
                Type::Unknown
            }
            ExpressionKind::ArrowFunction(a) => self.visit_arrow(a),
        };
        expr.inferred_type = Some(ty);
    }

    fn visit_binary(&mut self, b: &mut BinaryExpression) -> Type {
        self.visit_expression(&mut b.left);
        self.visit_expression(&mut b.right);
        let lt = b.left.inferred_type.clone().unwrap_or(Type::Unknown);
        let rt = b.right.inferred_type.clone().unwrap_or(Type::Unknown);

        match b.op {
            BinaryOp::Div => Type::Number,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Rem => lt.widen_arithmetic(&rt),
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::LtEq
            | BinaryOp::GtEq
            | BinaryOp::And
            | BinaryOp::Or => Type::Boolean,
        }
    }

    fn visit_unary(&mut self, u: &mut UnaryExpression) -> Type {
        self.visit_expression(&mut u.operand);
        let operand_ty = u.operand.inferred_type.clone().unwrap_or(Type::Unknown);
        match u.op {
            UnaryOp::Not => Type::Boolean,
            UnaryOp::Neg | UnaryOp::Plus => operand_ty,
        }
    }

    fn visit_assignment(&mut self, a: &mut AssignmentExpression) -> Type {
        self.visit_expression(&mut a.value);
        let ty = a.value.inferred_type.clone().unwrap_or(Type::Unknown);
        self.env.bind(a.target.name.clone(), ty.clone());
        ty
    }

    /// A bare-identifier callee is looked up against the current scope (an
    /// undeclared function stays `Unknown` rather than erroring, since
    /// top-level declarations aren't pre-bound before this walk). Any other
    /// callee shape (`obj.method()`, `f()()`, …) is only visited for its own
    /// type annotations — this language has no function-valued member access
    /// or indirect-call target to resolve a return type from.
    fn visit_call(&mut self, c: &mut CallExpression) -> Type {
        self.visit_expression(&mut c.callee);
        for arg in &mut c.arguments {
            self.visit_expression(arg);
        }
        let ExpressionKind::Identifier(callee_id) = &c.callee.kind else {
            return Type::Unknown;
        };
        match self.env.lookup(&callee_id.name) {
            Some(Type::Function { return_type, .. }) => (**return_type).clone(),
            Some(_) => {
                self.errors.push(CompileError::Type {
                    message: format!("`{}` is not callable", callee_id.name),
                    line: 0,
                    column: 0,
                });
                Type::Unknown
            }
            None => Type::Unknown,
        }
    }

    fn visit_arrow(&mut self, a: &mut ArrowFunctionExpression) -> Type {
        self.env.push_scope();
        for param in &a.params {
            self.env.bind(param.name.clone(), Type::Unknown);
        }
        let return_type = match &mut a.body {
            ArrowBody::Expression(expr) => {
                self.visit_expression(expr);
                expr.inferred_type.clone().unwrap_or(Type::Unknown)
            }
            ArrowBody::Block(block) => {
                self.visit_block(block);
                Type::Unknown
            }
        };
        self.env.pop_scope();
        Type::Function {
            param_types: vec![Type::Unknown; a.params.len()],
            return_type: Box::new(return_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn analyze(src: &str) -> (Program, Vec<CompileError>) {
        let mut lexer = Lexer::new(src.to_string());
        let mut parser = Parser::new(&mut lexer).unwrap();
        let mut program = parser.parse_program().unwrap();
        let errors = TypeAnalyzer::new().analyze(&mut program);
        (program, errors)
    }

    #[test]
    fn integer_arithmetic_stays_integer() {
        let (program, errors) = analyze("function f() { return 1 + 2; }");
        assert!(errors.is_empty());
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        assert_eq!(r.value.as_ref().unwrap().inferred_type, Some(Type::Integer));
    }

    #[test]
    fn division_always_widens_to_number() {
        let (program, _) = analyze("function f() { return 4 / 2; }");
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        assert_eq!(r.value.as_ref().unwrap().inferred_type, Some(Type::Number));
    }

    #[test]
    fn mixed_integer_and_number_widens_to_number() {
        let (program, _) = analyze("function f() { return 1 + 2.5; }");
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        assert_eq!(r.value.as_ref().unwrap().inferred_type, Some(Type::Number));
    }

    #[test]
    fn comparison_yields_boolean() {
        let (program, _) = analyze("function f(a, b) { return a < b; }");
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        assert_eq!(r.value.as_ref().unwrap().inferred_type, Some(Type::Boolean));
    }

    #[test]
    fn assignment_propagates_rhs_type_to_binding() {
        let (program, _) = analyze("function f() { var x = 1; x = 2.5; return x; }");
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Expression(e) = &f.body.body[1] else { panic!() };
        assert_eq!(e.expr.inferred_type, Some(Type::Number));
    }

    #[test]
    fn every_node_ends_up_annotated() {
        let (program, _) = analyze("function f(a) { return a + 1 + \"x\"; }");
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        assert!(r.value.as_ref().unwrap().inferred_type.is_some());
    }
}
