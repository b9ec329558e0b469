//! Built-in operation registries: the native procedures and special forms
//! installed into every fresh environment.
//!
//! ## Functions vs special forms
//!
//! - **Native procedures** (`cons`, `car`, `eq?`, ...) receive their
//!   arguments already evaluated, left to right.
//! - **Special forms** (`quote`, `if`, `lambda`, ...) receive the raw,
//!   unevaluated tail of the call and control evaluation themselves. Their
//!   handlers live in [`crate::evaluator`]; this module only registers
//!   them.
//!
//! Both kinds are first-class values: the registries are static slices and
//! the environment binds each entry under its name, so `(set! my-if if)`
//! works and dispatch is by the value a list head evaluates to, never by
//! the spelling of the head.
//!
//! ## Error handling
//!
//! Arity is validated before a native procedure runs; type expectations
//! are checked by each procedure and name the expected type (for example
//! `car expects a pair`). There is no truthiness or coercion anywhere in
//! this set.

use crate::Error;
use crate::ast::{self, Value};
use crate::evaluator::{self, Environment};
use std::fmt;

/// Expected number of arguments for a native procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub(crate) fn validate(&self, got: usize) -> Result<(), Error> {
        match self {
            Arity::Exact(expected) if got != *expected => Err(Error::arity_error(*expected, got)),
            Arity::AtLeast(expected) if got < *expected => Err(Error::arity_error(*expected, got)),
            _ => Ok(()),
        }
    }
}

/// Canonical native procedure signature: evaluated arguments plus the
/// environment (needed by `fresh-symbol` for the interner).
pub type NativeFn = fn(&[Value], &mut Environment) -> Result<Value, Error>;

/// A native procedure registry entry.
pub struct NativeOp {
    pub name: &'static str,
    pub arity: Arity,
    pub func: NativeFn,
}

impl NativeOp {
    pub(crate) fn validate_arity(&self, got: usize) -> Result<(), Error> {
        self.arity.validate(got)
    }
}

impl fmt::Debug for NativeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeOp({})", self.name)
    }
}

/// Special form handler signature: the raw, unevaluated tail of the call.
pub type FormFn = fn(&Value, &mut Environment) -> Result<Value, Error>;

/// A special form registry entry.
pub struct FormOp {
    pub name: &'static str,
    pub func: FormFn,
}

impl fmt::Debug for FormOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormOp({})", self.name)
    }
}

/// Registry of all native procedures.
pub static NATIVE_OPS: &[NativeOp] = &[
    NativeOp {
        name: "cons",
        arity: Arity::Exact(2),
        func: native_cons,
    },
    NativeOp {
        name: "car",
        arity: Arity::Exact(1),
        func: native_car,
    },
    NativeOp {
        name: "cdr",
        arity: Arity::Exact(1),
        func: native_cdr,
    },
    NativeOp {
        name: "null?",
        arity: Arity::Exact(1),
        func: native_is_null,
    },
    NativeOp {
        name: "pair?",
        arity: Arity::Exact(1),
        func: native_is_pair,
    },
    NativeOp {
        name: "symbol?",
        arity: Arity::Exact(1),
        func: native_is_symbol,
    },
    NativeOp {
        name: "eq?",
        arity: Arity::Exact(2),
        func: native_eq,
    },
    NativeOp {
        name: "fresh-symbol",
        arity: Arity::Exact(0),
        func: native_fresh_symbol,
    },
];

/// Registry of all special forms. Handlers live in the evaluator since
/// they drive evaluation.
pub static FORM_OPS: &[FormOp] = &[
    FormOp {
        name: "quote",
        func: evaluator::eval_quote,
    },
    FormOp {
        name: "quasiquote",
        func: evaluator::eval_quasiquote,
    },
    FormOp {
        name: "if",
        func: evaluator::eval_if,
    },
    FormOp {
        name: "lambda",
        func: evaluator::eval_lambda,
    },
    FormOp {
        name: "syntax",
        func: evaluator::eval_syntax,
    },
    FormOp {
        name: "set!",
        func: evaluator::eval_set,
    },
];

//
// Native procedure implementations
//

fn native_cons(args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    let [first, rest] = args else {
        return Err(Error::arity_error(2, args.len()));
    };
    Ok(ast::cons(first.clone(), rest.clone()))
}

fn native_car(args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    match args {
        [Value::Cell(cell)] => Ok(cell.first.clone()),
        [other] => Err(Error::TypeError(format!("car expects a pair, found {other}"))),
        _ => Err(Error::arity_error(1, args.len())),
    }
}

fn native_cdr(args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    match args {
        [Value::Cell(cell)] => Ok(cell.rest.clone()),
        [other] => Err(Error::TypeError(format!("cdr expects a pair, found {other}"))),
        _ => Err(Error::arity_error(1, args.len())),
    }
}

fn native_is_null(args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    let [value] = args else {
        return Err(Error::arity_error(1, args.len()));
    };
    Ok(Value::Bool(matches!(value, Value::Null)))
}

fn native_is_pair(args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    let [value] = args else {
        return Err(Error::arity_error(1, args.len()));
    };
    Ok(Value::Bool(matches!(value, Value::Cell(_))))
}

fn native_is_symbol(args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    let [value] = args else {
        return Err(Error::arity_error(1, args.len()));
    };
    Ok(Value::Bool(matches!(value, Value::Symbol(_))))
}

fn native_eq(args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    let [a, b] = args else {
        return Err(Error::arity_error(2, args.len()));
    };
    Ok(Value::Bool(identical(a, b)))
}

/// `eq?` semantics: symbols compare by identity, numbers and strings by
/// value (an integer and a float compare numerically, like the original
/// host language), everything else by object identity.
fn identical(a: &Value, b: &Value) -> bool {
    use std::rc::Rc;
    match (a, b) {
        (Value::Null, Value::Null) | (Value::Void, Value::Void) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Symbol(a), Value::Symbol(b)) => a == b,
        (Value::Cell(a), Value::Cell(b)) => Rc::ptr_eq(a, b),
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
        (Value::Macro(a), Value::Macro(b)) => Rc::ptr_eq(a, b),
        (Value::Native(a), Value::Native(b)) => std::ptr::eq(*a, *b),
        (Value::Form(a), Value::Form(b)) => std::ptr::eq(*a, *b),
        _ => false,
    }
}

fn native_fresh_symbol(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    if !args.is_empty() {
        return Err(Error::arity_error(0, args.len()));
    }
    Ok(Value::Symbol(env.symbols_mut().fresh()))
}
