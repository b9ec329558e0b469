//! sjson - Symbolic JSON notation and interpreter
//!
//! This crate implements a hybrid textual notation that merges JSON-style
//! literals with S-expression lists, together with a small Lisp-family
//! interpreter that consumes the notation as its program source.
//!
//! ## The notation
//!
//! Every JSON value is a valid form, and so is every S-expression:
//!
//! ```text
//! (list and symbol)
//! (dotted . pair)
//! [1, 2, 3]
//! {"a": carrot, "b": apple}
//! "COMPLEX\nMULTI\tLINED"
//! -9.876543e21
//! '(a b c)
//! ```
//!
//! Lists are built from cons cells and may be dotted; objects require
//! string keys; `true`, `false` and `null` are reserved tokens; `'v` is
//! shorthand for `(quote v)`.
//!
//! ## The interpreter
//!
//! Programs are notation values evaluated by a tree-walking interpreter:
//!
//! ```text
//! (if false 0 1)         ; => 1
//! (cons 'a 'b)           ; => (a . b)
//! (list 'a 'b 'c)        ; => (a b c), defined by the bootstrap library
//! (reverse '(a b c))     ; => (c b a)
//! ```
//!
//! The scoping model is deliberately dynamic: one flat binding table plus a
//! stack of checkpoint frames. A call pushes a frame, records the prior
//! value of every symbol it rebinds, and restores those values when the
//! frame pops - including when an error propagates out of the call. Macros
//! are fexpr-style: a macro body runs on the unevaluated call tail and its
//! result is evaluated once more in the caller's scope.
//!
//! ## Modules
//!
//! - `symbol`: the symbol interner (identity-comparing name tokens)
//! - `ast`: the value model (scalars, cells, arrays, objects, procedures)
//! - `reader`: notation text to values, with positional errors
//! - `writer`: values back to notation text
//! - `evaluator`: environment, special forms, evaluation loop, bootstrap
//! - `builtinops`: native procedure and special form registries
//! - `json`: serde_json interchange (feature `json`)

use std::fmt;

/// A reader error with the offending position resolved to a line and
/// column in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-based line number of the error position.
    pub line: usize,
    /// 1-based column, measured from the last preceding newline.
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    /// Build a SyntaxError from a byte position in `code`.
    pub(crate) fn new(code: &str, pos: usize, message: impl Into<String>) -> Self {
        let line = code[..pos].matches('\n').count() + 1;
        let column = match code[..pos].rfind('\n') {
            Some(newline) => pos - newline,
            None => pos + 1,
        };
        SyntaxError {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed notation text (reader only)
    Syntax(SyntaxError),
    /// A special form invoked with a structurally invalid argument list
    FormError(String),
    EvalError(String),
    TypeError(String),
    UnboundVariable(String),
    ArityError { expected: usize, got: usize },
    /// The writer was given a value outside the notation subset
    EncodeError(String),
}

impl Error {
    /// Create an ArityError
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError { expected, got }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "SyntaxError: {e}"),
            Error::FormError(msg) => write!(f, "FormError: {msg}"),
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
            Error::TypeError(msg) => write!(f, "Type error: {msg}"),
            Error::UnboundVariable(var) => write!(f, "Unbound variable: {var}"),
            Error::ArityError { expected, got } => write!(
                f,
                "ArityError: procedure expected {expected} arguments but got {got}"
            ),
            Error::EncodeError(msg) => write!(f, "EncodeError: {msg}"),
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod reader;
pub mod symbol;
pub mod writer;

#[cfg(feature = "json")]
pub mod json;
