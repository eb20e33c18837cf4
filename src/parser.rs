use std::collections::HashMap;

use crate::ast::*;
use crate::errors::CompileError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    Lowest,
    Assignment,
    LogicalOr,
    LogicalAnd,
    Equality,
    Relational,
    Additive,
    Multiplicative,
    Unary,
    Postfix,
}

lazy_static::lazy_static! {
    static ref PRECEDENCES: HashMap<TokenKind, Precedence> = {
        let mut m = HashMap::new();
        m.insert(TokenKind::Assign, Precedence::Assignment);
        m.insert(TokenKind::PipePipe, Precedence::LogicalOr);
        m.insert(TokenKind::AmpAmp, Precedence::LogicalAnd);
        m.insert(TokenKind::EqEq, Precedence::Equality);
        m.insert(TokenKind::EqEqEq, Precedence::Equality);
        m.insert(TokenKind::NotEq, Precedence::Equality);
        m.insert(TokenKind::NotEqEq, Precedence::Equality);
        m.insert(TokenKind::Lt, Precedence::Relational);
        m.insert(TokenKind::Gt, Precedence::Relational);
        m.insert(TokenKind::LtEq, Precedence::Relational);
        m.insert(TokenKind::GtEq, Precedence::Relational);
        m.insert(TokenKind::Plus, Precedence::Additive);
        m.insert(TokenKind::Minus, Precedence::Additive);
        m.insert(TokenKind::Star, Precedence::Multiplicative);
        m.insert(TokenKind::Slash, Precedence::Multiplicative);
        m.insert(TokenKind::Percent, Precedence::Multiplicative);
        m.insert(TokenKind::Dot, Precedence::Postfix);
        m.insert(TokenKind::LParen, Precedence::Postfix);
        m.insert(TokenKind::LBracket, Precedence::Postfix);
        m
    };
}

/// Statement keywords a synchronizing recovery may safely resume at
/// (spec.md §4.2): each one starts a new statement, so discarding tokens up
/// to the next one (or the next `;`) can't swallow more than the bad
/// statement itself.
const SYNC_KEYWORDS: &[TokenKind] = &[
    TokenKind::Function,
    TokenKind::Var,
    TokenKind::Let,
    TokenKind::Const,
    TokenKind::If,
    TokenKind::While,
    TokenKind::For,
    TokenKind::Return,
];

pub struct Parser<'a> {
    lexer: &'a mut Lexer,
    current: Token,
    peek: Token,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: &'a mut Lexer) -> Result<Self, CompileError> {
        let current = lexer.next_token()?;
        let peek = lexer.next_token()?;
        Ok(Self { lexer, current, peek })
    }

    pub fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut body = Vec::new();
        let mut first_error = None;
        while self.current.kind != TokenKind::Eof {
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    self.synchronize()?;
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        Ok(Program { body })
    }

    fn advance(&mut self) -> Result<(), CompileError> {
        self.current = self.peek.clone();
        self.peek = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, CompileError> {
        if self.current.kind == expected {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(self.error(expected.describe()))
        }
    }

    fn consume_if(&mut self, kind: &TokenKind) -> Result<bool, CompileError> {
        if &self.current.kind == kind {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Semicolons are optional between statements (spec.md §4.2): consume one
    /// if present, otherwise carry on without error.
    fn consume_statement_terminator(&mut self) -> Result<(), CompileError> {
        self.consume_if(&TokenKind::Semicolon)?;
        Ok(())
    }

    fn error(&self, expected: String) -> CompileError {
        CompileError::Parse {
            line: self.current.line,
            column: self.current.column,
            expected,
            got: self.current.kind.describe(),
        }
    }

    /// Discard tokens until a statement-starting keyword, the next `;`, or
    /// end of input — so one bad statement doesn't abort the whole parse.
    fn synchronize(&mut self) -> Result<(), CompileError> {
        while self.current.kind != TokenKind::Eof {
            if self.current.kind == TokenKind::Semicolon {
                self.advance()?;
                return Ok(());
            }
            if SYNC_KEYWORDS.contains(&self.current.kind) {
                return Ok(());
            }
            self.advance()?;
        }
        Ok(())
    }

    fn current_precedence(&self) -> Precedence {
        PRECEDENCES.get(&self.current.kind).copied().unwrap_or(Precedence::Lowest)
    }

    // -- statements ----------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, CompileError> {
        match self.current.kind {
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::Var | TokenKind::Let | TokenKind::Const => self.parse_variable_declaration(),
            TokenKind::LBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_function_declaration(&mut self) -> Result<Statement, CompileError> {
        self.advance()?; // `function`
        let name = self.parse_identifier()?;
        let params = self.parse_param_list()?;
        let body = self.parse_block()?;
        Ok(Statement::FunctionDeclaration(FunctionDeclaration { name, params, body }))
    }

    fn parse_param_list(&mut self) -> Result<Vec<Identifier>, CompileError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.current.kind != TokenKind::RParen {
            params.push(self.parse_identifier()?);
            while self.consume_if(&TokenKind::Comma)? {
                params.push(self.parse_identifier()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_identifier(&mut self) -> Result<Identifier, CompileError> {
        if self.current.kind != TokenKind::Identifier {
            return Err(self.error("identifier".to_string()));
        }
        let name = self.current.lexeme.clone();
        self.advance()?;
        Ok(Identifier { name })
    }

    fn parse_variable_declaration(&mut self) -> Result<Statement, CompileError> {
        let kind = match self.current.kind {
            TokenKind::Var => DeclarationKind::Var,
            TokenKind::Let => DeclarationKind::Let,
            TokenKind::Const => DeclarationKind::Const,
            _ => unreachable!(),
        };
        self.advance()?;
        let name = self.parse_identifier()?;
        let init = if self.consume_if(&TokenKind::Assign)? {
            Some(self.parse_expression(Precedence::Lowest)?)
        } else {
            None
        };
        self.consume_statement_terminator()?;
        Ok(Statement::VariableDeclaration(VariableDeclaration { kind, name, init }))
    }

    fn parse_block(&mut self) -> Result<BlockStatement, CompileError> {
        self.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while self.current.kind != TokenKind::RBrace && self.current.kind != TokenKind::Eof {
            body.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(BlockStatement { body })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, CompileError> {
        self.advance()?; // `return`
        let value = if self.current.kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expression(Precedence::Lowest)?)
        };
        self.consume_statement_terminator()?;
        Ok(Statement::Return(ReturnStatement { value }))
    }

    fn parse_if_statement(&mut self) -> Result<Statement, CompileError> {
        self.advance()?; // `if`
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RParen)?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.consume_if(&TokenKind::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement { condition, then_branch, else_branch }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, CompileError> {
        self.advance()?; // `while`
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { condition, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, CompileError> {
        self.advance()?; // `for`
        self.expect(TokenKind::LParen)?;

        let init = if self.current.kind == TokenKind::Semicolon {
            self.advance()?;
            None
        } else {
            let stmt = match self.current.kind {
                TokenKind::Var | TokenKind::Let | TokenKind::Const => self.parse_variable_declaration()?,
                _ => self.parse_expression_statement()?,
            };
            Some(Box::new(stmt))
        };

        let condition = if self.current.kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expression(Precedence::Lowest)?)
        };
        self.expect(TokenKind::Semicolon)?;

        let update = if self.current.kind == TokenKind::RParen {
            None
        } else {
            Some(Box::new(Statement::Expression(ExpressionStatement {
                expr: self.parse_expression(Precedence::Lowest)?,
            })))
        };
        self.expect(TokenKind::RParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For(ForStatement { init, condition, update, body }))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, CompileError> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.consume_statement_terminator()?;
        Ok(Statement::Expression(ExpressionStatement { expr }))
    }

    // -- expressions (Pratt) --------------------------------------------

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression, CompileError> {
        let mut left = self.parse_prefix()?;
        while self.current.kind != TokenKind::Semicolon && precedence < self.current_precedence() {
            left = self.parse_infix(left)?;
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expression, CompileError> {
        match self.current.kind.clone() {
            TokenKind::Integer(v) => {
                self.advance()?;
                Ok(Expression::new(ExpressionKind::NumberLiteral(NumberLiteral {
                    value: v as f64,
                    is_integer: true,
                })))
            }
            TokenKind::Number(ref text) => {
                let value: f64 = text.parse().map_err(|_| CompileError::Parse {
                    line: self.current.line,
                    column: self.current.column,
                    expected: "number literal".to_string(),
                    got: text.clone(),
                })?;
                self.advance()?;
                Ok(Expression::new(ExpressionKind::NumberLiteral(NumberLiteral {
                    value,
                    is_integer: false,
                })))
            }
            TokenKind::StringLiteral(ref s) => {
                let s = s.clone();
                self.advance()?;
                Ok(Expression::new(ExpressionKind::StringLiteral(s)))
            }
            TokenKind::True => {
                self.advance()?;
                Ok(Expression::new(ExpressionKind::BooleanLiteral(true)))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(Expression::new(ExpressionKind::BooleanLiteral(false)))
            }
            TokenKind::Null => {
                self.advance()?;
                Ok(Expression::new(ExpressionKind::NullLiteral))
            }
            TokenKind::Identifier => self.parse_identifier_expression(),
            TokenKind::LParen => self.parse_paren_or_arrow(),
            TokenKind::Minus => {
                self.advance()?;
                let operand = Box::new(self.parse_expression(Precedence::Unary)?);
                Ok(Expression::new(ExpressionKind::Unary(UnaryExpression { op: UnaryOp::Neg, operand })))
            }
            TokenKind::Plus => {
                self.advance()?;
                let operand = Box::new(self.parse_expression(Precedence::Unary)?);
                Ok(Expression::new(ExpressionKind::Unary(UnaryExpression { op: UnaryOp::Plus, operand })))
            }
            TokenKind::Bang => {
                self.advance()?;
                let operand = Box::new(self.parse_expression(Precedence::Unary)?);
                Ok(Expression::new(ExpressionKind::Unary(UnaryExpression { op: UnaryOp::Not, operand })))
            }
            _ => Err(self.error("expression".to_string())),
        }
    }

    /// An identifier prefix may turn out to be a plain reference or an
    /// assignment target — or, if followed directly by `=>`, a single bare
    /// arrow-function parameter. Calls, member access, and computed member
    /// access are handled uniformly by the postfix loop in `parse_infix`,
    /// regardless of what kind of primary expression they follow.
    fn parse_identifier_expression(&mut self) -> Result<Expression, CompileError> {
        let name = self.current.lexeme.clone();
        let ident = Identifier { name };

        if self.peek.kind == TokenKind::FatArrow {
            self.advance()?; // identifier
            self.advance()?; // =>
            let body = self.parse_arrow_body()?;
            return Ok(Expression::new(ExpressionKind::ArrowFunction(ArrowFunctionExpression {
                params: vec![ident],
                body,
            })));
        }

        self.advance()?;

        if self.current.kind == TokenKind::Assign {
            self.advance()?;
            let value = Box::new(self.parse_expression(Precedence::Assignment)?);
            return Ok(Expression::new(ExpressionKind::Assignment(AssignmentExpression { target: ident, value })));
        }

        Ok(Expression::new(ExpressionKind::Identifier(ident)))
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expression>, CompileError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.current.kind != TokenKind::RParen {
            args.push(self.parse_expression(Precedence::Assignment)?);
            while self.consume_if(&TokenKind::Comma)? {
                args.push(self.parse_expression(Precedence::Assignment)?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    /// A `(` starts either a grouped expression or a multi-parameter arrow
    /// function (`(a, b) => ...`, including the zero-arg `() => ...`);
    /// distinguished by scanning the parenthesized list as identifiers and
    /// checking for a trailing `=>`, restoring the saved position on
    /// mismatch so it can be re-parsed as a grouped expression instead.
    fn parse_paren_or_arrow(&mut self) -> Result<Expression, CompileError> {
        if let Some(params) = self.try_parse_arrow_params()? {
            self.expect(TokenKind::FatArrow)?;
            let body = self.parse_arrow_body()?;
            return Ok(Expression::new(ExpressionKind::ArrowFunction(ArrowFunctionExpression { params, body })));
        }
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RParen)?;
        Ok(expr)
    }

    fn try_parse_arrow_params(&mut self) -> Result<Option<Vec<Identifier>>, CompileError> {
        let saved_current = self.current.clone();
        let saved_peek = self.peek.clone();

        self.advance()?; // consume `(`
        let mut params = Vec::new();
        let mut ok = true;

        if self.current.kind != TokenKind::RParen {
            loop {
                if self.current.kind == TokenKind::Identifier {
                    params.push(Identifier { name: self.current.lexeme.clone() });
                    self.advance()?;
                } else {
                    ok = false;
                    break;
                }
                if self.current.kind == TokenKind::Comma {
                    self.advance()?;
                    continue;
                }
                break;
            }
        }

        if ok && self.current.kind == TokenKind::RParen {
            self.advance()?; // consume `)`
            if self.current.kind == TokenKind::FatArrow {
                return Ok(Some(params));
            }
        }

        self.current = saved_current;
        self.peek = saved_peek;
        Ok(None)
    }

    fn parse_arrow_body(&mut self) -> Result<ArrowBody, CompileError> {
        if self.current.kind == TokenKind::LBrace {
            Ok(ArrowBody::Block(self.parse_block()?))
        } else {
            Ok(ArrowBody::Expression(Box::new(self.parse_expression(Precedence::Assignment)?)))
        }
    }

    /// The postfix level of the precedence ladder (spec.md §4.2): `.x`
    /// member access, `[…]` computed member access, and `(…)` calls all sit
    /// at `Precedence::Postfix`, the highest level, so `parse_expression`'s
    /// loop re-enters here after each one and chains them — `a[0].f().g[1]`
    /// parses left-to-right with no extra bookkeeping, since each case below
    /// takes whatever was already built as its `left`/callee/object.
    fn parse_infix(&mut self, left: Expression) -> Result<Expression, CompileError> {
        match self.current.kind.clone() {
            TokenKind::Dot => {
                self.advance()?;
                let property = self.parse_identifier()?;
                Ok(Expression::new(ExpressionKind::Member(MemberExpression {
                    object: Box::new(left),
                    property: Box::new(Expression::new(ExpressionKind::Identifier(property))),
                    computed: false,
                })))
            }
            TokenKind::LBracket => {
                self.advance()?;
                let index = self.parse_expression(Precedence::Lowest)?;
                self.expect(TokenKind::RBracket)?;
                Ok(Expression::new(ExpressionKind::Member(MemberExpression {
                    object: Box::new(left),
                    property: Box::new(index),
                    computed: true,
                })))
            }
            TokenKind::LParen => {
                let arguments = self.parse_argument_list()?;
                Ok(Expression::new(ExpressionKind::Call(CallExpression { callee: Box::new(left), arguments })))
            }
            op_kind => {
                let op = binary_op_for(&op_kind).ok_or_else(|| self.error("binary operator".to_string()))?;
                let precedence = self.current_precedence();
                self.advance()?;
                let right = self.parse_expression(precedence)?;
                Ok(Expression::new(ExpressionKind::Binary(BinaryExpression {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })))
            }
        }
    }
}

fn binary_op_for(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::EqEq | TokenKind::EqEqEq => BinaryOp::Eq,
        TokenKind::NotEq | TokenKind::NotEqEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::PipePipe => BinaryOp::Or,
        _ => return None,
    })
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Function => "`function`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBrace => "`{`".to_string(),
            TokenKind::RBrace => "`}`".to_string(),
            TokenKind::Semicolon => "`;`".to_string(),
            TokenKind::Assign => "`=`".to_string(),
            other => crate::token::TokenKind::describe(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<Program, CompileError> {
        let mut lexer = Lexer::new(src.to_string());
        let mut parser = Parser::new(&mut lexer)?;
        parser.parse_program()
    }

    #[test]
    fn parses_identity_addition() {
        let program = parse("function add(a, b) { return a + b; }").unwrap();
        assert_eq!(program.body.len(), 1);
        match &program.body[0] {
            Statement::FunctionDeclaration(f) => {
                assert_eq!(f.name.name, "add");
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.body.body.len(), 1);
            }
            _ => panic!("expected function declaration"),
        }
    }

    #[test]
    fn precedence_climbs_multiplicative_over_additive() {
        let program = parse("function f() { return 1 + 2 * 3; }").unwrap();
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        let Expression { kind: ExpressionKind::Binary(b), .. } = r.value.as_ref().unwrap() else { panic!() };
        assert_eq!(b.op, BinaryOp::Add);
        assert!(matches!(b.right.kind, ExpressionKind::Binary(_)));
    }

    #[test]
    fn for_loop_counted_sum() {
        let src = "function sum(n) { var total = 0; for (var i = 0; i < n; i = i + 1) { total = total + i; } return total; }";
        let program = parse(src).unwrap();
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        assert_eq!(f.body.body.len(), 3);
        assert!(matches!(f.body.body[1], Statement::For(_)));
    }

    #[test]
    fn arrow_function_expression_body() {
        let program = parse("function f() { var g = x => x + 1; return g; }").unwrap();
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::VariableDeclaration(v) = &f.body.body[0] else { panic!() };
        assert!(matches!(v.init.as_ref().unwrap().kind, ExpressionKind::ArrowFunction(_)));
    }

    #[test]
    fn multi_param_arrow_function() {
        let program = parse("function f() { var g = (a, b) => a + b; return g; }").unwrap();
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::VariableDeclaration(v) = &f.body.body[0] else { panic!() };
        match &v.init.as_ref().unwrap().kind {
            ExpressionKind::ArrowFunction(a) => assert_eq!(a.params.len(), 2),
            _ => panic!("expected arrow function"),
        }
    }

    #[test]
    fn missing_semicolon_is_not_an_error() {
        let program = parse("function f() { return 1 }").unwrap();
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        assert_eq!(f.body.body.len(), 1);
    }

    #[test]
    fn unexpected_token_still_reports_parse_error() {
        let err = parse("function f( { return 1; }").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplicative() {
        let program = parse("function f() { return -1 * 2; }").unwrap();
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        let Expression { kind: ExpressionKind::Binary(b), .. } = r.value.as_ref().unwrap() else { panic!() };
        assert_eq!(b.op, BinaryOp::Mul);
        assert!(matches!(b.left.kind, ExpressionKind::Unary(_)));
    }

    #[test]
    fn computed_member_access_parses() {
        let program = parse("function f(a) { return a[0]; }").unwrap();
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        let Expression { kind: ExpressionKind::Member(m), .. } = r.value.as_ref().unwrap() else { panic!() };
        assert!(m.computed);
        assert!(matches!(m.object.kind, ExpressionKind::Identifier(_)));
        assert!(matches!(m.property.kind, ExpressionKind::NumberLiteral(_)));
    }

    #[test]
    fn chained_member_call_parses() {
        let program = parse("function f(obj) { return obj.method(); }").unwrap();
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        let Expression { kind: ExpressionKind::Call(c), .. } = r.value.as_ref().unwrap() else { panic!() };
        assert!(c.arguments.is_empty());
        let ExpressionKind::Member(m) = &c.callee.kind else { panic!("expected member callee") };
        assert!(!m.computed);
        let ExpressionKind::Identifier(method) = &m.property.kind else { panic!() };
        assert_eq!(method.name, "method");
    }

    #[test]
    fn computed_member_then_call_chains() {
        let program = parse("function f(arr) { return arr[0](1, 2); }").unwrap();
        let Statement::FunctionDeclaration(f) = &program.body[0] else { panic!() };
        let Statement::Return(r) = &f.body.body[0] else { panic!() };
        let Expression { kind: ExpressionKind::Call(c), .. } = r.value.as_ref().unwrap() else { panic!() };
        assert_eq!(c.arguments.len(), 2);
        let ExpressionKind::Member(m) = &c.callee.kind else { panic!("expected member callee") };
        assert!(m.computed);
    }
}
