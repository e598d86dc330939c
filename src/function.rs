//! Callable runtime objects: user functions, bound methods and natives.

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result, RuntimeError};
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;

/// Anything a call expression can invoke.
pub trait Callable {
    /// Number of arguments the call must supply.
    fn arity(&self) -> usize;

    /// Name used in arity diagnostics.
    fn callable_name(&self) -> String;

    /// Invoke with already‑evaluated, arity‑checked arguments.  `line` is the
    /// call site, for errors raised by the callee itself.
    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value>;
}

/// Host implementation of a native function.
pub type NativeFn = fn(&[Value]) -> Value;

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn callable_name(&self) -> String {
        self.name.to_string()
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
        _line: usize,
    ) -> Result<Value> {
        debug!("Calling native function '{}'", self.name);

        Ok((self.func)(&arguments))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A user‑defined function or method together with the scope it closes over.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_constructor: bool,
    class_name: Option<String>,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_constructor: bool) -> Self {
        Self {
            declaration,
            closure,
            is_constructor,
            class_name: None,
        }
    }

    /// Mark this function as a method of `class_name` (affects diagnostics only).
    pub fn with_class_name<S: Into<String>>(mut self, class_name: S) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Produce a copy whose closure is extended with `this` = `instance`.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: environment.into_ref(),
            is_constructor: self.is_constructor,
            class_name: self.class_name.clone(),
        }
    }

    fn this_value(&self, line: usize) -> Result<Value> {
        Environment::get_at(&self.closure, 0, "this").ok_or_else(|| {
            LoxError::runtime(line, RuntimeError::UndefinedVariable("this".to_string()))
        })
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn callable_name(&self) -> String {
        match &self.class_name {
            Some(class) => format!("{}::{}", class, self.declaration.name.lexeme),
            None => self.declaration.name.lexeme.clone(),
        }
    }

    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.callable_name());

        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        // The parameter scope doubles as the body's block scope.
        let flow: Flow = interpreter.execute_block(&self.declaration.body, environment.into_ref())?;

        if self.is_constructor {
            return self.this_value(line);
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.callable_name())
            .field("arity", &self.arity())
            .field("is_constructor", &self.is_constructor)
            .finish()
    }
}
