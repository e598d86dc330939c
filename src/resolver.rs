//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, read in own initializer, misplaced
//!    `return`/`this`/`super`, self‑inheritance).
//! 3. Record, for *each* name‑bearing expression, how many scopes separate it
//!    from its binding.  Expressions absent from the table are globals.
//!
//! Errors do not stop the walk: every violation in the program is collected
//! and handed back together.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{LoxError, ResolveError};
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;

/// Resolution table: expression id → scope distance.
pub type Locals = HashMap<ExprId, usize>;

/// What kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Constructor,
}

/// What kind of class body are we in?  Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
    locals: Locals,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
            locals: Locals::new(),
        }
    }

    /// Walk all top‑level statements, returning the resolution table or every
    /// static error found.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Locals, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);

        if self.errors.is_empty() {
            info!("Resolved {} local reference(s)", self.locals.len());
            Ok(self.locals)
        } else {
            info!("Resolve failed with {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    fn error(&mut self, line: usize, kind: ResolveError) {
        self.errors.push(LoxError::resolve(line, kind));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| self.resolve_stmt_inner(stmt))
    }

    fn resolve_stmt_inner(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),

            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // the name is visible *inside* its own body, so recursion works
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword.line, ResolveError::InvalidReturn("top-level code"));
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Constructor {
                        self.error(keyword.line, ResolveError::InvalidReturn("constructor"));
                    }
                    self.resolve_expr(expr);
                }
            }
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) {
        debug!("Resolving class '{}'", name.lexeme);

        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable {
                name: super_name, ..
            } = superclass
            {
                if super_name.lexeme == name.lexeme {
                    self.error(
                        super_name.line,
                        ResolveError::InvalidInheritance(
                            "A class can't inherit from itself".to_string(),
                        ),
                    );
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.bind_implicit("super");
        }

        self.begin_scope();
        self.bind_implicit("this");

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Constructor
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        ensure_sufficient_stack(|| self.resolve_expr_inner(expr))
    }

    fn resolve_expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(name.line, ResolveError::UninitializedRead);
                    }
                }
                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword.line, ResolveError::InvalidThis("outside of a class"));
                    return;
                }
                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword.line, ResolveError::InvalidSuper("outside of a class"));
                        return;
                    }
                    ClassType::Class => {
                        self.error(
                            keyword.line,
                            ResolveError::InvalidSuper("in a class with no superclass"),
                        );
                        return;
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&declaration.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        // A duplicate is reset to "declared" too.
        let duplicate = scope.insert(name.lexeme.clone(), false).is_some();

        if duplicate {
            let lexeme = name.lexeme.clone();
            self.error(name.line, ResolveError::VariableRedeclaration(lexeme));
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Bind `this`/`super` in the innermost scope.
    fn bind_implicit(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it out of the
    /// table if no enclosing scope binds the name (global).
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' {} at depth {}", name.lexeme, id, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' {} as global", name.lexeme, id);
    }
}
