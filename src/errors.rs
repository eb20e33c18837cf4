use std::fmt;
use crate::diagnostics::{Diagnostic, SourceLocation};

/// One variant per error-taxonomy entry in the error handling design: each
/// stage reports its own kind of failure, carrying a source location where
/// one is meaningful.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Lex { line: usize, column: usize, reason: String },
    Parse { line: usize, column: usize, expected: String, got: String },
    Type { message: String, line: usize, column: usize },
    Feature { message: String },
    Prediction { function: String, message: String },
    Codegen { function: String, message: String },
    Assembly { function: String, mnemonic: String },
    Validation { message: String },
}

impl CompileError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CompileError::Lex { line, column, reason } => {
                Diagnostic::error(reason.clone())
                    .with_code("E0001")
                    .at(SourceLocation::new(*line, *column))
            }
            CompileError::Parse { line, column, expected, got } => {
                Diagnostic::error(format!("expected {expected}, found {got}"))
                    .with_code("E0002")
                    .at(SourceLocation::new(*line, *column))
            }
            CompileError::Type { message, line, column } => {
                Diagnostic::error(message.clone())
                    .with_code("E0003")
                    .at(SourceLocation::new(*line, *column))
            }
            CompileError::Feature { message } => {
                Diagnostic::error(message.clone()).with_code("E0004")
            }
            CompileError::Prediction { function, message } => {
                Diagnostic::error(format!("{function}: {message}")).with_code("E0005")
            }
            CompileError::Codegen { function, message } => {
                Diagnostic::error(format!("{function}: {message}")).with_code("E0006")
            }
            CompileError::Assembly { function, mnemonic } => {
                Diagnostic::error(format!("{function}: unknown mnemonic `{mnemonic}`"))
                    .with_code("E0007")
            }
            CompileError::Validation { message } => {
                Diagnostic::error(message.clone()).with_code("E0008")
            }
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex { line, column, reason } => {
                write!(f, "lex error [{line}:{column}]: {reason}")
            }
            CompileError::Parse { line, column, expected, got } => {
                write!(f, "parse error [{line}:{column}]: expected {expected}, found {got}")
            }
            CompileError::Type { message, line, column } => {
                write!(f, "type error [{line}:{column}]: {message}")
            }
            CompileError::Feature { message } => write!(f, "feature extraction error: {message}"),
            CompileError::Prediction { function, message } => {
                write!(f, "prediction error in `{function}`: {message}")
            }
            CompileError::Codegen { function, message } => {
                write!(f, "codegen error in `{function}`: {message}")
            }
            CompileError::Assembly { function, mnemonic } => {
                write!(f, "assembly error in `{function}`: unknown mnemonic `{mnemonic}`")
            }
            CompileError::Validation { message } => write!(f, "validation error: {message}"),
        }
    }
}

impl std::error::Error for CompileError {}
