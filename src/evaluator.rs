//! The tree-walking interpreter: the environment with its checkpoint
//! frame stack, the special form handlers, the evaluation loop, and the
//! self-hosted bootstrap library.
//!
//! ## Scope discipline
//!
//! Binding is dynamic by design. There is exactly one flat table from
//! symbol identity to value; a call does not allocate a fresh namespace.
//! Instead [`Environment::push_frame`] opens a checkpoint, and the first
//! time a symbol is rebound while that frame is active its prior value
//! (or a was-unbound sentinel) is recorded. [`Environment::pop_frame`]
//! restores every recorded symbol, so lookup is O(1) and restoration is
//! proportional to the number of distinct symbols the call touched. The
//! pop runs unconditionally, also when an error is propagating out of a
//! call, which keeps the environment consistent for subsequent
//! evaluation.
//!
//! ## Macros
//!
//! A macro body runs exactly like a closure body, but on the unevaluated
//! call tail, and its result is evaluated once more after the frame has
//! popped - in the caller's dynamic scope. This re-evaluated-fexpr model
//! is what the bootstrap's `defmacro` builds on.

use crate::Error;
use crate::ast::{self, Lambda, Value, cons};
use crate::builtinops::{FORM_OPS, NATIVE_OPS};
use crate::reader;
use crate::symbol::{Symbol, SymbolTable};
use std::collections::HashMap;
use std::rc::Rc;

/// Interpreter state: the symbol interner, the flat binding table, and
/// the stack of checkpoint frames. Each frame maps a symbol to the value
/// it held immediately before the frame began, or `None` if it was
/// unbound then.
#[derive(Debug, Default)]
pub struct Environment {
    symbols: SymbolTable,
    bindings: HashMap<Symbol, Value>,
    frames: Vec<HashMap<Symbol, Option<Value>>>,
}

impl Environment {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Intern a name through the environment's symbol table.
    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    /// Install a global binding without checkpointing. Used while wiring
    /// up a fresh environment; user code goes through [`Environment::bind`].
    pub fn define(&mut self, symbol: Symbol, value: Value) {
        self.bindings.insert(symbol, value);
    }

    pub fn lookup(&self, symbol: &Symbol) -> Result<Value, Error> {
        self.bindings
            .get(symbol)
            .cloned()
            .ok_or_else(|| Error::UnboundVariable(symbol.name().to_owned()))
    }

    /// Open a new checkpoint frame.
    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Restore every symbol recorded in the innermost frame to its
    /// snapshotted prior value, then discard the frame.
    pub fn pop_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            for (symbol, prior) in frame {
                match prior {
                    Some(value) => {
                        self.bindings.insert(symbol, value);
                    }
                    None => {
                        self.bindings.remove(&symbol);
                    }
                }
            }
        }
    }

    /// Set `symbol` in the flat table, first recording its prior value in
    /// the innermost open frame (once per frame). With no open frame the
    /// binding is simply global.
    pub fn bind(&mut self, symbol: &Symbol, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            if !frame.contains_key(symbol) {
                frame.insert(symbol.clone(), self.bindings.get(symbol).cloned());
            }
        }
        self.bindings.insert(symbol.clone(), value);
    }

    /// Remove `symbol` from the flat table, recording its prior value in
    /// the innermost open frame like [`Environment::bind`].
    pub fn unbind(&mut self, symbol: &Symbol) {
        if let Some(frame) = self.frames.last_mut() {
            if !frame.contains_key(symbol) {
                frame.insert(symbol.clone(), self.bindings.get(symbol).cloned());
            }
        }
        self.bindings.remove(symbol);
    }

    /// Recursively bind a formal-parameter pattern against an actual
    /// value tree. A symbol pattern absorbs the whole remaining value
    /// (variadic rest parameters); a cell pattern against a cell value
    /// binds car to car and recurses cdr to cdr; null against null is a
    /// no-op. Any other pairing is an arity mismatch.
    pub fn destructure_bind(&mut self, pattern: &Value, value: &Value) -> Result<(), Error> {
        match (pattern, value) {
            (Value::Symbol(symbol), _) => {
                self.bind(symbol, value.clone());
                Ok(())
            }
            (Value::Null, Value::Null) => Ok(()),
            (Value::Cell(p), Value::Cell(v)) => {
                self.destructure_bind(&p.first, &v.first)?;
                self.destructure_bind(&p.rest, &v.rest)
            }
            (Value::Null, _) => Err(Error::EvalError(format!(
                "arity mismatch: {value} not absorbed by the parameter pattern"
            ))),
            (Value::Cell(_), _) => Err(Error::EvalError(format!(
                "arity mismatch: too few arguments for parameter pattern {pattern}"
            ))),
            _ => Err(Error::EvalError(format!(
                "cannot bind parameter pattern {pattern}"
            ))),
        }
    }

    /// All current global bindings, sorted by name.
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings: Vec<_> = self
            .bindings
            .iter()
            .map(|(symbol, value)| (symbol.name().to_owned(), value.clone()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }
}

/// Evaluate one pre-parsed value against an environment.
pub fn eval(expr: &Value, env: &mut Environment) -> Result<Value, Error> {
    match expr {
        // Variable lookup
        Value::Symbol(symbol) => env.lookup(symbol),

        // Application: evaluate the head, then dispatch on what it is.
        // Special forms and macros receive the raw tail; closures and
        // native procedures receive evaluated arguments.
        Value::Cell(cell) => {
            let head = eval(&cell.first, env)?;
            let result = match head {
                Value::Form(op) => (op.func)(&cell.rest, env),
                Value::Macro(lambda) => {
                    let expansion = apply(&lambda, &cell.rest, env)?;
                    // The extra evaluation pass, in the caller's scope
                    eval(&expansion, env)
                }
                Value::Closure(lambda) => {
                    let args = eval_args(&cell.rest, env)?;
                    apply(&lambda, &args, env)
                }
                Value::Native(op) => {
                    let args = eval_args_vec(&cell.rest, env)?;
                    op.validate_arity(args.len())?;
                    (op.func)(&args, env)
                }
                other => Err(Error::TypeError(format!(
                    "cannot invoke {other} as a procedure"
                ))),
            };
            result.map_err(|err| add_context(err, expr))
        }

        // Everything else is self-evaluating
        other => Ok(other.clone()),
    }
}

/// Helper function to add expression context to errors
fn add_context(error: Error, expr: &Value) -> Error {
    let context = format!("while evaluating: {expr}");
    match error {
        Error::EvalError(msg) => Error::EvalError(format!("{msg}\n  Context: {context}")),
        Error::TypeError(msg) => Error::TypeError(format!("{msg}\n  Context: {context}")),
        // Other kinds carry their own context
        other => other,
    }
}

/// Evaluate a call tail left-to-right into an argument vector.
fn eval_args_vec(tail: &Value, env: &mut Environment) -> Result<Vec<Value>, Error> {
    let exprs = ast::list_to_vec(tail)?;
    exprs.iter().map(|expr| eval(expr, env)).collect()
}

/// Evaluate a call tail left-to-right into an argument list.
fn eval_args(tail: &Value, env: &mut Environment) -> Result<Value, Error> {
    eval_args_vec(tail, env).map(ast::list_from_vec)
}

/// Invoke a closure or macro body: push a frame, destructure-bind the
/// formal pattern against `actuals`, evaluate the body forms in sequence,
/// and pop the frame - unconditionally, also when an error propagates.
pub fn apply(lambda: &Lambda, actuals: &Value, env: &mut Environment) -> Result<Value, Error> {
    env.push_frame();
    let result = eval_call(lambda, actuals, env);
    env.pop_frame();
    result
}

fn eval_call(lambda: &Lambda, actuals: &Value, env: &mut Environment) -> Result<Value, Error> {
    env.destructure_bind(&lambda.params, actuals)?;
    let mut result = Value::Void;
    for form in &lambda.body {
        result = eval(form, env)?;
    }
    Ok(result)
}

/// Evaluate an entire text buffer: read and evaluate top-level forms
/// until end-of-input, collecting each non-void result. Evaluation stops
/// at the first error; what to do with the results (print, collect,
/// discard) is the caller's policy.
pub fn eval_source(code: &str, env: &mut Environment) -> Result<Vec<Value>, Error> {
    let mut results = Vec::new();
    let mut pos = 0;
    loop {
        let next = reader::decode(code, pos, env.symbols_mut()).map_err(Error::Syntax)?;
        let Some((form, next_pos)) = next else {
            return Ok(results);
        };
        pos = next_pos;
        let value = eval(&form, env)?;
        if !matches!(value, Value::Void) {
            results.push(value);
        }
    }
}

//
// Special form handlers. Each receives the unevaluated remainder of the
// call list; the registry in `builtinops` wires them up by name.
//

/// Collect a special form's argument list, which must be proper.
fn form_args<'a>(args: &'a Value, name: &str) -> Result<Vec<&'a Value>, Error> {
    let mut items = Vec::new();
    let mut cursor = args;
    loop {
        match cursor {
            Value::Null => return Ok(items),
            Value::Cell(cell) => {
                items.push(&cell.first);
                cursor = &cell.rest;
            }
            other => {
                return Err(Error::FormError(format!(
                    "{name} requires a proper argument list, found {other}"
                )));
            }
        }
    }
}

fn form_arity(name: &str, expected: &str, got: usize) -> Error {
    Error::FormError(format!("{name} expects {expected}, got {got} arguments"))
}

/// `(quote datum)` - returns the datum unevaluated.
pub(crate) fn eval_quote(args: &Value, _env: &mut Environment) -> Result<Value, Error> {
    match form_args(args, "quote")?.as_slice() {
        [datum] => Ok((*datum).clone()),
        other => Err(form_arity("quote", "1 argument", other.len())),
    }
}

/// `(quasiquote template)` - rebuilds the template, replacing each cell
/// whose head is the `unquote` symbol by the evaluated result of its
/// single argument. Because the replacement happens at the cell level, an
/// unquote form in tail position splices its result in as the tail from
/// that point. Nesting is not depth-tracked: a quasiquote inside a
/// quasiquote is copied verbatim and its unquotes evaluate at the outer
/// level.
pub(crate) fn eval_quasiquote(args: &Value, env: &mut Environment) -> Result<Value, Error> {
    match form_args(args, "quasiquote")?.as_slice() {
        [template] => expand_template(template, env),
        other => Err(form_arity("quasiquote", "1 argument", other.len())),
    }
}

fn expand_template(template: &Value, env: &mut Environment) -> Result<Value, Error> {
    let Value::Cell(cell) = template else {
        return Ok(template.clone());
    };
    if let Value::Symbol(head) = &cell.first {
        if head.name() == "unquote" {
            let [expr] = ast::expect_elems::<1>(&cell.rest)
                .map_err(|_| Error::FormError("unquote expects exactly 1 expression".into()))?;
            return eval(expr, env);
        }
    }
    let first = expand_template(&cell.first, env)?;
    let rest = expand_template(&cell.rest, env)?;
    Ok(cons(first, rest))
}

/// `(if test then)` / `(if test then else)` - only the boolean false
/// value is falsy; a false test with no else branch yields void.
pub(crate) fn eval_if(args: &Value, env: &mut Environment) -> Result<Value, Error> {
    match form_args(args, "if")?.as_slice() {
        [test, then_branch] => {
            if is_truthy(&eval(test, env)?) {
                eval(then_branch, env)
            } else {
                Ok(Value::Void)
            }
        }
        [test, then_branch, else_branch] => {
            if is_truthy(&eval(test, env)?) {
                eval(then_branch, env)
            } else {
                eval(else_branch, env)
            }
        }
        other => Err(form_arity("if", "2 or 3 arguments", other.len())),
    }
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Bool(false))
}

/// `(lambda pattern body...)` - produces a closure without evaluating the
/// body.
pub(crate) fn eval_lambda(args: &Value, _env: &mut Environment) -> Result<Value, Error> {
    make_lambda(args, "lambda").map(|lambda| Value::Closure(Rc::new(lambda)))
}

/// `(syntax pattern body...)` - identical surface to lambda, produces a
/// macro.
pub(crate) fn eval_syntax(args: &Value, _env: &mut Environment) -> Result<Value, Error> {
    make_lambda(args, "syntax").map(|lambda| Value::Macro(Rc::new(lambda)))
}

fn make_lambda(args: &Value, name: &str) -> Result<Lambda, Error> {
    let Value::Cell(cell) = args else {
        return Err(Error::FormError(format!(
            "{name} requires a parameter pattern and a body"
        )));
    };
    validate_params(&cell.first, name)?;
    let body = form_args(&cell.rest, name)?.into_iter().cloned().collect();
    Ok(Lambda {
        params: cell.first.clone(),
        body,
    })
}

/// A formal-parameter pattern is a symbol, null, or a proper or dotted
/// list of symbols.
fn validate_params(pattern: &Value, name: &str) -> Result<(), Error> {
    let mut cursor = pattern;
    loop {
        match cursor {
            Value::Null | Value::Symbol(_) => return Ok(()),
            Value::Cell(cell) => {
                if !matches!(cell.first, Value::Symbol(_)) {
                    return Err(Error::FormError(format!(
                        "{name} parameters must be symbols, found {}",
                        cell.first
                    )));
                }
                cursor = &cell.rest;
            }
            other => {
                return Err(Error::FormError(format!(
                    "{name} parameter pattern must be a symbol or a list of symbols, found {other}"
                )));
            }
        }
    }
}

/// `(set! symbol expr)` - evaluates the expression, binds the symbol in
/// the innermost frame, and yields void.
pub(crate) fn eval_set(args: &Value, env: &mut Environment) -> Result<Value, Error> {
    match form_args(args, "set!")?.as_slice() {
        [target, expr] => {
            let Value::Symbol(symbol) = *target else {
                return Err(Error::FormError(format!(
                    "set! requires a symbol, found {target}"
                )));
            };
            let symbol = symbol.clone();
            let value = eval(expr, env)?;
            env.bind(&symbol, value);
            Ok(Value::Void)
        }
        other => Err(form_arity("set!", "2 arguments", other.len())),
    }
}

/// The bootstrap library, written in the notation itself and evaluated
/// once at environment construction. It defines the macro-defining macro
/// `defmacro`, the function-defining macro `defun`, and the self-hosted
/// `list` and `reverse` with their recursive helpers. Its successful
/// evaluation exercises the whole reader/evaluator stack.
pub const BOOTSTRAP: &str = "\
(set! defmacro
  (syntax (spec . body)
    (quasiquote
      (set! (unquote (car spec))
            (syntax (unquote (cdr spec)) . (unquote body))))))

(defmacro (defun spec . body)
  (quasiquote
    (set! (unquote (car spec))
          (lambda (unquote (cdr spec)) . (unquote body)))))

(defun (copy-list items)
  (if (null? items)
      null
      (cons (car items) (copy-list (cdr items)))))

(defun (list . items)
  (copy-list items))

(defun (reverse-onto source target)
  (if (null? source)
      target
      (reverse-onto (cdr source) (cons (car source) target))))

(defun (reverse items)
  (reverse-onto items null))
";

/// Create a ready-to-use interpreter state: all native procedures and
/// special forms installed and the bootstrap library evaluated.
pub fn create_global_env() -> Environment {
    let mut env = Environment::new();
    for op in NATIVE_OPS {
        let symbol = env.intern(op.name);
        env.define(symbol, Value::Native(op));
    }
    for op in FORM_OPS {
        let symbol = env.intern(op.name);
        env.define(symbol, Value::Form(op));
    }
    eval_source(BOOTSTRAP, &mut env).expect("bootstrap library must evaluate");
    env
}
