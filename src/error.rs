//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  Static
//! (resolver) and dynamic (runtime) failures carry a structured kind so that
//! a diagnostics sink can report them as `{line, type, message}` records.
//!
//! The module **does not** print diagnostics itself

use std::io;
use thiserror::Error;

use log::info;

/// Static well‑formedness violations detected by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Can't read local variable in its own initializer")]
    UninitializedRead,

    /// `location` is `top-level code` or `constructor`.
    #[error("Can't return from {0}")]
    InvalidReturn(&'static str),

    #[error("Can't use 'this' {0}")]
    InvalidThis(&'static str),

    #[error("Can't use 'super' {0}")]
    InvalidSuper(&'static str),

    #[error("{0}")]
    InvalidInheritance(String),

    #[error("Variable '{0}' is already declared in this scope")]
    VariableRedeclaration(String),
}

impl ResolveError {
    pub fn name(&self) -> &'static str {
        match self {
            ResolveError::UninitializedRead => "UninitializedRead",
            ResolveError::InvalidReturn(_) => "InvalidReturn",
            ResolveError::InvalidThis(_) => "InvalidThis",
            ResolveError::InvalidSuper(_) => "InvalidSuper",
            ResolveError::InvalidInheritance(_) => "InvalidInheritance",
            ResolveError::VariableRedeclaration(_) => "VariableRedeclaration",
        }
    }
}

/// Failures raised while evaluating a program.  Any of these aborts the
/// remaining program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("Undefined property '{name}' for class '{class}'")]
    UndefinedProperty { name: String, class: String },

    #[error("Operator '{operator}': incompatible types '{lhs}' and '{rhs}'")]
    UnsupportedBinaryOperation {
        operator: String,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("Operator '{operator}': incompatible type '{operand}'")]
    UnsupportedUnaryOperation {
        operator: String,
        operand: &'static str,
    },

    #[error("Only class instances have properties")]
    InvalidSetGet,

    #[error("Only classes and functions are callable")]
    NotCallable,

    #[error("Function '{name}' expected {expected} arguments but got {got}")]
    BadArity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Superclass expression evaluated to something other than a class.
    #[error("{0}")]
    InvalidInheritance(String),

    #[error("Stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),
}

impl RuntimeError {
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeError::UndefinedVariable(_) => "UndefinedVariable",
            RuntimeError::UndefinedProperty { .. } => "UndefinedProperty",
            RuntimeError::UnsupportedBinaryOperation { .. } => "UnsupportedBinaryOperation",
            RuntimeError::UnsupportedUnaryOperation { .. } => "UnsupportedUnaryOperation",
            RuntimeError::InvalidSetGet => "InvalidSetGet",
            RuntimeError::NotCallable => "NotCallable",
            RuntimeError::BadArity { .. } => "BadArity",
            RuntimeError::InvalidInheritance(_) => "InvalidInheritance",
            RuntimeError::StackOverflow(_) => "StackOverflow",
        }
    }
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis failure reported by the resolver.
    #[error("[line {line}] Error: {kind}")]
    Resolve { kind: ResolveError, line: usize },

    /// Runtime evaluation error.
    #[error("[line {line}] Error: {kind}")]
    Runtime { kind: RuntimeError, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve(line: usize, kind: ResolveError) -> Self {
        info!("Creating Resolve error: line={}, kind={:?}", line, kind);

        LoxError::Resolve { kind, line }
    }

    /// Helper constructor for the **evaluator**.
    pub fn runtime(line: usize, kind: RuntimeError) -> Self {
        info!("Creating Runtime error: line={}, kind={:?}", line, kind);

        LoxError::Runtime { kind, line }
    }

    /// Source line of the failure, when there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. }
            | LoxError::Runtime { line, .. } => Some(*line),
            LoxError::Io(_) => None,
        }
    }

    /// Stable machine‑readable name of the error kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            LoxError::Lex { .. } => "LexError",
            LoxError::Parse { .. } => "ParseError",
            LoxError::Resolve { kind, .. } => kind.name(),
            LoxError::Runtime { kind, .. } => kind.name(),
            LoxError::Io(_) => "IoError",
        }
    }

    /// The message without the `[line N] Error:` prefix.
    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. } | LoxError::Parse { message, .. } => message.clone(),
            LoxError::Resolve { kind, .. } => kind.to_string(),
            LoxError::Runtime { kind, .. } => kind.to_string(),
            LoxError::Io(e) => e.to_string(),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. }
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
