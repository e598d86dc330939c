//! Abstract syntax tree consumed by the resolver and the evaluator.
//!
//! Nodes are immutable once built.  Every expression that names a binding
//! (`Variable`, `Assign`, `This`, `Super`) carries an [`ExprId`] handed out by
//! the parser; the resolver keys its distance table by that id instead of by
//! node address.

use std::fmt;
use std::rc::Rc;

use crate::token::Token;

/// Stable identity of a name‑bearing expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A **literal constant** that appears directly in the source code.
///
/// The parser copies the value out of the token so the tree does not depend
/// on the token buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Every kind of *expression* in Lox.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralValue),

    /// Prefix unary operator expression: `!isReady` or `-42`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix arithmetic, comparison or equality operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Function, method or constructor call.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}

impl Expr {
    /// Best source line for diagnostics about this expression.
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal(_) => 0,
            Expr::Unary { operator, .. } => operator.line,
            Expr::Binary { operator, .. } => operator.line,
            Expr::Grouping(inner) => inner.line(),
            Expr::Variable { name, .. } => name.line,
            Expr::Assign { name, .. } => name.line,
            Expr::Logical { operator, .. } => operator.line,
            Expr::Call { paren, .. } => paren.line,
            Expr::Get { name, .. } => name.line,
            Expr::Set { name, .. } => name.line,
            Expr::This { keyword, .. } => keyword.line,
            Expr::Super { keyword, .. } => keyword.line,
        }
    }
}

/// A named function or method: shared between the tree and every runtime
/// function value created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

/// Executable *statements*.  A program is a sequence of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Print(Expr),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop; `for` loops are desugared into this by the parser.
    While { condition: Expr, body: Box<Stmt> },

    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class {
        name: Token,

        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,

        methods: Vec<Rc<FunctionDecl>>,
    },
}
