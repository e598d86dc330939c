//! Tree‑walking evaluator.
//!
//! Statements yield a [`Flow`]: `return` is an ordinary value that every
//! statement list, branch and loop passes upward until a function call
//! consumes it.  Errors travel separately on the `Err` side and abort the
//! whole program.
//!
//! Name lookups use the resolver's [`Locals`] table: an expression id found
//! there is read at a fixed scope distance, anything else is a global.

use std::collections::HashMap;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use log::{debug, error, info};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result, RuntimeError};
use crate::function::LoxFunction;
use crate::natives::define_natives;
use crate::resolver::Locals;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Default ceiling on nested calls before `StackOverflow` is raised.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// Tuning knobs for an [`Interpreter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterOptions {
    pub max_call_depth: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_call_depth: MAX_CALL_DEPTH,
        }
    }
}

pub struct Interpreter<'w> {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    output: Box<dyn Write + 'w>,
    options: InterpreterOptions,
    call_depth: usize,
}

/// Swaps a scope in as the interpreter's current environment and puts the
/// previous one back when dropped, whichever way the block is left.
struct EnvironmentGuard<'g, 'w> {
    interpreter: &'g mut Interpreter<'w>,
    previous: EnvRef,
}

impl<'g, 'w> EnvironmentGuard<'g, 'w> {
    fn enter(interpreter: &'g mut Interpreter<'w>, environment: EnvRef) -> Self {
        let previous = std::mem::replace(&mut interpreter.environment, environment);

        Self {
            interpreter,
            previous,
        }
    }
}

impl<'w> Deref for EnvironmentGuard<'_, 'w> {
    type Target = Interpreter<'w>;

    fn deref(&self) -> &Self::Target {
        &*self.interpreter
    }
}

impl DerefMut for EnvironmentGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.interpreter
    }
}

impl Drop for EnvironmentGuard<'_, '_> {
    fn drop(&mut self) {
        self.interpreter.environment = Rc::clone(&self.previous);
    }
}

impl<'w> Interpreter<'w> {
    /// Creates an interpreter printing to `output`, with natives such as
    /// `clock` already defined.
    pub fn new<W: Write + 'w>(output: W) -> Self {
        Self::with_options(output, InterpreterOptions::default())
    }

    pub fn with_options<W: Write + 'w>(output: W, options: InterpreterOptions) -> Self {
        info!("Initializing Interpreter with {:?}", options);

        let mut globals = Environment::new();
        define_natives(&mut globals);
        let globals: EnvRef = globals.into_ref();

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output: Box::new(output),
            options,
            call_depth: 0,
        }
    }

    /// Merge a resolution table produced for the next program chunk.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Merging {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Interprets a list of statements (a "program").  The first runtime error
    /// stops execution; output already written stays written.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        self.output.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                debug!("Printing value: {}", value);
                writeln!(self.output, "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let environment =
                    Environment::with_enclosing(Rc::clone(&self.environment)).into_ref();
                return self.execute_block(statements, environment);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Function(Rc::new(function)),
                );
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                return Ok(Flow::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods)?,
        }

        Ok(Flow::Normal)
    }

    /// Runs `statements` with `environment` as the current scope.  The caller's
    /// scope is restored afterwards on every path, including errors.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        let mut scope = EnvironmentGuard::enter(self, environment);

        for stmt in statements {
            if let Flow::Return(value) = scope.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(LoxError::runtime(
                        expr.line(),
                        RuntimeError::InvalidInheritance("Superclass must be a class".to_string()),
                    ))
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over an extra scope binding `super`.
        let closure: EnvRef = match &superclass {
            Some(superclass) => {
                let mut environment = Environment::with_enclosing(Rc::clone(&self.environment));
                environment.define("super", Value::Class(Rc::clone(superclass)));
                environment.into_ref()
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|method| {
                let function = LoxFunction::new(
                    Rc::clone(method),
                    Rc::clone(&closure),
                    method.name.lexeme == "init",
                )
                .with_class_name(name.lexeme.as_str());

                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(name.lexeme.clone(), superclass, methods);

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression, growing the host stack first if it is close
    /// to running out.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { id, name } => self.lookup_variable(*id, name),

            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        if !Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        ) {
                            return Err(self.unresolved(name, distance));
                        }
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;
                self.unary(operator, right)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;
                self.binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(&callee, args, paren.line)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name.line, RuntimeError::InvalidSetGet)),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name.line, RuntimeError::InvalidSetGet));
                };

                let value: Value = self.evaluate(value)?;
                instance.set(name, value.clone());

                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.super_method(*id, keyword, method),
        }
    }

    fn unary(&self, operator: &Token, right: Value) -> Result<Value> {
        match (&operator.token_type, right) {
            (TokenType::BANG, value) => Ok(Value::Bool(!value.is_truthy())),
            (TokenType::MINUS, Value::Number(n)) => Ok(Value::Number(-n)),
            (_, value) => Err(LoxError::runtime(
                operator.line,
                RuntimeError::UnsupportedUnaryOperation {
                    operator: operator.lexeme.clone(),
                    operand: value.kind_name(),
                },
            )),
        }
    }

    fn binary(&self, operator: &Token, left: Value, right: Value) -> Result<Value> {
        use Value::Number;

        let value = match (&operator.token_type, &left, &right) {
            (TokenType::EQUAL_EQUAL, _, _) => Value::Bool(left.equals(&right)),
            (TokenType::BANG_EQUAL, _, _) => Value::Bool(!left.equals(&right)),

            (TokenType::PLUS, Number(a), Number(b)) => Number(a + b),
            (TokenType::PLUS, Value::String(a), Value::String(b)) => {
                Value::String(format!("{}{}", a, b))
            }

            (TokenType::MINUS, Number(a), Number(b)) => Number(a - b),
            (TokenType::STAR, Number(a), Number(b)) => Number(a * b),
            // IEEE‑754: 1/0 is Infinity, 0/0 is NaN.
            (TokenType::SLASH, Number(a), Number(b)) => Number(a / b),

            (TokenType::GREATER, Number(a), Number(b)) => Value::Bool(a > b),
            (TokenType::GREATER_EQUAL, Number(a), Number(b)) => Value::Bool(a >= b),
            (TokenType::LESS, Number(a), Number(b)) => Value::Bool(a < b),
            (TokenType::LESS_EQUAL, Number(a), Number(b)) => Value::Bool(a <= b),

            _ => {
                return Err(LoxError::runtime(
                    operator.line,
                    RuntimeError::UnsupportedBinaryOperation {
                        operator: operator.lexeme.clone(),
                        lhs: left.kind_name(),
                        rhs: right.kind_name(),
                    },
                ))
            }
        };

        Ok(value)
    }

    /// Invoke `callee` after checking it is callable, that the argument count
    /// matches and that the call depth limit has room.
    fn call_value(&mut self, callee: &Value, arguments: Vec<Value>, line: usize) -> Result<Value> {
        let Some(callable) = callee.as_callable() else {
            return Err(LoxError::runtime(line, RuntimeError::NotCallable));
        };

        if arguments.len() != callable.arity() {
            return Err(LoxError::runtime(
                line,
                RuntimeError::BadArity {
                    name: callable.callable_name(),
                    expected: callable.arity(),
                    got: arguments.len(),
                },
            ));
        }

        if self.call_depth >= self.options.max_call_depth {
            return Err(LoxError::runtime(
                line,
                RuntimeError::StackOverflow(self.options.max_call_depth),
            ));
        }

        self.call_depth += 1;
        let result = callable.call(self, arguments, line);
        self.call_depth -= 1;

        result
    }

    fn super_method(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(self.unresolved(keyword, 0));
        };

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(self.unresolved(keyword, distance)),
        };

        // `this` lives in the scope just inside the one binding `super`.
        let instance = match distance
            .checked_sub(1)
            .and_then(|d| Environment::get_at(&self.environment, d, "this"))
        {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(self.unresolved(&Token::identifier("this", keyword.line), distance)),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(LoxError::runtime(
                method.line,
                RuntimeError::UndefinedProperty {
                    name: method.lexeme.clone(),
                    class: superclass.name().to_string(),
                },
            )),
        }
    }

    fn lookup_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| self.unresolved(name, distance)),
            None => self.globals.borrow().get(name),
        }
    }

    /// The resolver promised a binding that is not there.
    fn unresolved(&self, name: &Token, distance: usize) -> LoxError {
        error!(
            "No binding for '{}' at distance {} (line {})",
            name.lexeme, distance, name.line
        );

        LoxError::runtime(
            name.line,
            RuntimeError::UndefinedVariable(name.lexeme.clone()),
        )
    }
}
