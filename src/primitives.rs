//! The built-in procedures installed by the root environment.
//!
//! Each primitive follows the canonical signature [`PrimFn`]: it receives
//! the already-evaluated argument list as one proper-list value and returns
//! a value. The set is deliberately minimal — `cons`, `car`, `cdr`, `null?`
//! and `+` — and partial: argument counts and kinds beyond what each
//! operation touches are not validated up front, so a missing or ill-kinded
//! argument surfaces as the type error of whatever accessor hit it first.

use crate::Error;
use crate::value::{Heap, PrimFn, PrimOp, Value};

/// Registry of every primitive, in the order they are installed.
pub static PRIMITIVES: &[PrimOp] = &[
    PrimOp {
        name: "cons",
        func: prim_cons as PrimFn,
    },
    PrimOp {
        name: "car",
        func: prim_car as PrimFn,
    },
    PrimOp {
        name: "cdr",
        func: prim_cdr as PrimFn,
    },
    PrimOp {
        name: "null?",
        func: prim_null as PrimFn,
    },
    PrimOp {
        name: "+",
        func: prim_add as PrimFn,
    },
];

/// Look up a primitive by its installed name.
pub fn find_primitive(name: &str) -> Option<&'static PrimOp> {
    PRIMITIVES.iter().find(|op| op.name == name)
}

/// `(cons a d)`: a fresh pair of the first two arguments.
fn prim_cons(heap: &mut Heap, args: &Value) -> Result<Value, Error> {
    let head = heap.car(args)?;
    let tail = heap.cadr(args)?;
    Ok(heap.cons(head, tail))
}

/// `(car p)`: head of a pair argument.
fn prim_car(heap: &mut Heap, args: &Value) -> Result<Value, Error> {
    let pair = heap.car(args)?;
    heap.car(&pair)
}

/// `(cdr p)`: tail of a pair argument.
fn prim_cdr(heap: &mut Heap, args: &Value) -> Result<Value, Error> {
    let pair = heap.car(args)?;
    heap.cdr(&pair)
}

/// `(null? v)`: whether the single argument is nil.
fn prim_null(heap: &mut Heap, args: &Value) -> Result<Value, Error> {
    let v = heap.car(args)?;
    Ok(Value::Bool(v.is_nil()))
}

/// `(+ a b)`: sum of two number payloads.
fn prim_add(heap: &mut Heap, args: &Value) -> Result<Value, Error> {
    let a = number_payload(heap, heap.car(args)?)?;
    let b = number_payload(heap, heap.cadr(args)?)?;
    Ok(Value::Number(a + b))
}

fn number_payload(heap: &Heap, v: Value) -> Result<f64, Error> {
    match v {
        Value::Number(n) => Ok(n),
        other => Err(Error::TypeError(format!(
            "'+' expects numbers, got: {}",
            heap.render(&other)
        ))),
    }
}
