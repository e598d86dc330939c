//! Host functions pre‑bound into the global scope.

use std::io::{self, Read};
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::environment::Environment;
use crate::function::{NativeFn, NativeFunction};
use crate::value::Value;

const NATIVES: &[(&str, usize, NativeFn)] = &[("clock", 0, clock), ("getchar", 0, getchar)];

/// Wall‑clock time in seconds, with millisecond resolution.
fn clock(_args: &[Value]) -> Value {
    let seconds: f64 = Utc::now().timestamp_millis() as f64 / 1000.0;

    debug!("Native 'clock' returned {}", seconds);

    Value::Number(seconds)
}

/// Next byte of standard input, or `-1` at end of input.  Read failures are
/// reported as end of input.
fn getchar(_args: &[Value]) -> Value {
    let mut byte = [0u8; 1];

    let code: f64 = match io::stdin().lock().read(&mut byte) {
        Ok(1) => f64::from(byte[0]),
        Ok(_) => -1.0,
        Err(e) => {
            debug!("Native 'getchar' read failed: {}", e);
            -1.0
        }
    };

    Value::Number(code)
}

/// Bind every native into `globals`.
pub fn define_natives(globals: &mut Environment) {
    for &(name, arity, func) in NATIVES {
        debug!("Defining native function '{}'", name);

        globals.define(
            name,
            Value::NativeFunction(Rc::new(NativeFunction { name, arity, func })),
        );
    }

    info!("Defined {} native functions", NATIVES.len());
}
