//! minilisp - A minimal Lisp-family interpreter
//!
//! This crate provides a small S-expression interpreter built from four
//! pieces: a tagged value model over a mutable pair heap, a reader that
//! parses one textual term into a value, a chain of lexical environment
//! frames, and an evaluator that walks values against that chain.
//!
//! ```scheme
//! (define add (lambda (a b) (+ a b)))  ; closures capture their environment
//! (add 1 (add 2 3))                    ; eager, left-to-right application
//! (quote (1 2 3))                      ; code is list data
//! ```
//!
//! Source text flows through [`reader::read`] into a [`value::Value`]
//! expression tree, and [`evaluator::evaluate`] reduces that tree against an
//! [`evaluator::Environment`], consulting and mutating the shared
//! [`value::Heap`] of pair cells. Primitive procedures are installed once by
//! [`evaluator::root_environment`]; there is no global interpreter state.
//!
//! ```
//! use minilisp::value::Heap;
//! use minilisp::{evaluator, reader};
//!
//! let mut heap = Heap::new();
//! let env = evaluator::root_environment(&mut heap);
//! let expr = reader::read(&mut heap, "(+ 1 (+ 2 3))").unwrap();
//! let result = evaluator::evaluate(&mut heap, &expr, &env).unwrap();
//! assert_eq!(heap.render(&result), "6");
//! ```
//!
//! ## Modules
//!
//! - `value`: tagged values, the pair heap, structural equality, rendering
//! - `reader`: S-expression parsing from text
//! - `evaluator`: environment chain and the evaluation core
//! - `primitives`: the built-in procedures of the root environment

use std::fmt;

/// Maximum reader nesting depth. Deeper list structure is rejected instead of
/// risking a host stack overflow while parsing hostile input.
pub const MAX_READ_DEPTH: usize = 64;

/// Maximum evaluation depth. Set well above the read depth so that nested
/// applications and recursive user procedures have room to run; exceeding it
/// aborts the evaluation instead of overflowing the host stack.
pub const MAX_EVAL_DEPTH: usize = 512;

/// Categorizes the different kinds of reader errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (stray `)`, unknown `#` literal)
    InvalidSyntax,
    /// Input ended before the term was complete (EOF, unterminated list)
    Incomplete,
    /// Nesting exceeded [`MAX_READ_DEPTH`]
    TooDeeplyNested,
    /// Extra input found after a complete, valid term
    TrailingContent,
}

/// A structured error describing a reader failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    /// Create a ParseError with all fields
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a ParseError with context extracted from the input at an offset
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        Self::with_context_and_found(kind, message, input, error_offset, None)
    }

    /// Create a ParseError with context and the offending token
    pub fn with_context_and_found(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
        found: Option<String>,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        // Show some input before the error position as well.
        let context_start = error_offset.saturating_sub(20);

        let context_str: String = input.chars().skip(context_start).take(MAX_CONTEXT).collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.len() < input.len() {
            display_context.push_str("[...]");
        }

        // Newlines would garble single-line error reports.
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), found)
    }
}

/// Error types for the interpreter.
///
/// Every variant is unrecoverable for the `read`/`evaluate` call it occurs
/// in: the failing call aborts and the error propagates to the embedding
/// caller, which is responsible for reporting it.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed source text (unterminated list, trailing input, stray `)`)
    Parse(ParseError),
    /// Symbol absent from every frame of the environment chain
    UnboundVariable(String),
    /// `define` of a symbol already bound in the same frame
    DuplicateDefinition(String),
    /// A non-pair value of unrecognized kind reached evaluation
    UnknownAtomType(String),
    /// Structurally bad form: missing `if` alternate, empty `begin`,
    /// improper special-form shape
    Malformed(String),
    /// Wrong kind of value where another was required (`car` of a non-pair,
    /// applying a non-procedure, `+` of non-numbers)
    TypeError(String),
    /// Compound-procedure parameter/argument count mismatch
    ArityError {
        expected: usize,
        got: usize,
        expression: Option<String>,
    },
    /// Evaluation aborted by an implementation limit (recursion depth)
    EvalError(String),
}

impl Error {
    /// Create an ArityError without expression context
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityError with expression context
    pub fn arity_error_with_expr(expected: usize, got: usize, expression: String) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: Some(expression),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(e) => {
                write!(f, "ParseError: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::UnboundVariable(name) => write!(f, "Unbound variable: {name}"),
            Error::DuplicateDefinition(name) => write!(f, "Duplicate definition: {name}"),
            Error::UnknownAtomType(atom) => write!(f, "Unknown atom type: {atom}"),
            Error::Malformed(msg) => write!(f, "Malformed expression: {msg}"),
            Error::TypeError(msg) => write!(f, "Type error: {msg}"),
            Error::ArityError {
                expected,
                got,
                expression,
            } => match expression {
                Some(expr) => write!(
                    f,
                    "ArityError: procedure {expr}: expected {expected} arguments, got {got}"
                ),
                None => write!(
                    f,
                    "ArityError: procedure expected {expected} arguments but got {got}"
                ),
            },
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
        }
    }
}

pub mod evaluator;
pub mod primitives;
pub mod reader;
pub mod value;
