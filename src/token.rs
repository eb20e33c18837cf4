#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Self { kind, lexeme, line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Function, Var, Let, Const, If, Else, While, For, Return, True, False, Null,

    // Identifiers & literals
    Identifier,
    Integer(i64),
    Number(String), // stored as text to preserve precision until parsed
    StringLiteral(String),
    Bool(bool),

    // Punctuation
    Assign,      // =
    Semicolon,   // ;
    Colon,       // :
    Comma,       // ,
    Dot,         // .
    LParen,      // (
    RParen,      // )
    LBrace,      // {
    RBrace,      // }
    LBracket,    // [
    RBracket,    // ]
    FatArrow,    // =>

    // Arithmetic
    Plus, Minus, Star, Slash, Percent,

    // Logical / unary
    Bang, AmpAmp, PipePipe,

    // Comparison
    Lt, Gt, LtEq, GtEq, EqEq, EqEqEq, NotEq, NotEqEq,

    // Meta
    Eof,
}

lazy_static::lazy_static! {
    pub static ref KEYWORDS: std::collections::HashMap<&'static str, TokenKind> = {
        let mut map = std::collections::HashMap::new();
        map.insert("function", TokenKind::Function);
        map.insert("var", TokenKind::Var);
        map.insert("let", TokenKind::Let);
        map.insert("const", TokenKind::Const);
        map.insert("if", TokenKind::If);
        map.insert("else", TokenKind::Else);
        map.insert("while", TokenKind::While);
        map.insert("for", TokenKind::For);
        map.insert("return", TokenKind::Return);
        map.insert("true", TokenKind::True);
        map.insert("false", TokenKind::False);
        map.insert("null", TokenKind::Null);
        map
    };
}

impl TokenKind {
    /// Human-readable name used in parser diagnostics (`expected X, found Y`).
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier => "identifier".to_string(),
            TokenKind::Integer(_) => "integer literal".to_string(),
            TokenKind::Number(_) => "number literal".to_string(),
            TokenKind::StringLiteral(_) => "string literal".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{other:?}"),
        }
    }
}
