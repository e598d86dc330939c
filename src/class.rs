//! Classes and their instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result, RuntimeError};
use crate::function::{Callable, LoxFunction};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

const INITIALIZER: &str = "init";

pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look `name` up in this class, then along the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }
}

/// Classes are called to construct instances; the `Rc` is needed so the new
/// instance can point back at its class.
impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.find_method(INITIALIZER)
            .map_or(0, |initializer| initializer.arity())
    }

    fn callable_name(&self) -> String {
        format!("{}::{}", self.name, self.name)
    }

    fn call(
        &self,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", self.name);

        let instance = Rc::new(LoxInstance::new(Rc::clone(self)));

        if let Some(initializer) = self.find_method(INITIALIZER) {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments, line)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort();

        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|superclass| superclass.name()),
            )
            .field("methods", &methods)
            .finish()
    }
}

/// An object: a class reference plus fields created on first assignment.
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Property read: fields shadow methods; methods come back bound to
    /// `instance`.
    pub fn get(instance: &Rc<LoxInstance>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance)))));
        }

        Err(LoxError::runtime(
            name.line,
            RuntimeError::UndefinedProperty {
                name: name.lexeme.clone(),
                class: instance.class.name.clone(),
            },
        ))
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<String> = self.fields.borrow().keys().cloned().collect();
        fields.sort();

        f.debug_struct("LoxInstance")
            .field("class", &self.class.name)
            .field("fields", &fields)
            .finish()
    }
}
