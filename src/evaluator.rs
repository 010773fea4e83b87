//! The evaluation core: lexical environments and the dispatch loop.
//!
//! An [`Environment`] is a chain of frames, each frame a heap-allocated list
//! `(vars vals parent)` holding two parallel binding lists and the enclosing
//! frame (or nil at the root). Procedures are tagged pair lists built from
//! the same material: `(primitive <op>)` for host procedures and
//! `(compound <params> <body> <env>)` for closures, so code, data, and
//! scopes all live on one heap.
//!
//! [`evaluate`] classifies an expression as self-evaluating, a variable
//! reference, or a compound form; the five special forms (`quote`, `lambda`,
//! `if`, `define`, `begin`) get dedicated cases and everything else is
//! eager, left-to-right procedure application. Environments are threaded
//! explicitly through every call; [`root_environment`] is the only
//! bootstrap, so embedders and tests can hold as many isolated interpreters
//! as they like.

use crate::value::{Heap, PrimOp, Value};
use crate::{Error, MAX_EVAL_DEPTH, primitives};

/// Tag symbol heading a primitive-procedure list.
pub(crate) const PRIMITIVE_TAG: &str = "primitive";
/// Tag symbol heading a compound-procedure list.
pub(crate) const COMPOUND_TAG: &str = "compound";

/// A handle on one frame of the environment chain.
///
/// Cloning an `Environment` clones the handle, not the frame: both handles
/// see definitions made through either one.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    frame: Value,
}

impl Environment {
    /// The underlying frame value, for embedding environments inside
    /// procedure values and for diagnostic walks.
    pub fn as_value(&self) -> &Value {
        &self.frame
    }

    /// Build one frame from host (name, value) pairs, preserving order,
    /// chained over `parent` (or over nothing for a root frame).
    pub fn extend(
        heap: &mut Heap,
        bindings: &[(&str, Value)],
        parent: Option<&Environment>,
    ) -> Self {
        let mut vars = Value::Nil;
        let mut vals = Value::Nil;
        for (name, value) in bindings.iter().rev() {
            vars = heap.cons(Value::symbol(*name), vars);
            vals = heap.cons(value.clone(), vals);
        }
        let parent_frame = parent.map_or(Value::Nil, |p| p.frame.clone());
        let frame = heap.list(&[vars, vals, parent_frame]);
        Environment { frame }
    }

    /// Build the frame for one procedure application: `params` (a list of
    /// symbols) bound positionally to `args`, chained over the captured
    /// frame. The parameter chain is copied into fresh cells so that later
    /// `define`s in the frame never grow the procedure's own parameter list.
    pub(crate) fn bind(
        heap: &mut Heap,
        params: &Value,
        args: &Value,
        parent: &Value,
    ) -> Result<Self, Error> {
        let expected = heap.list_len(params);
        let got = heap.list_len(args);
        if expected != got {
            return Err(Error::arity_error_with_expr(
                expected,
                got,
                heap.render(params),
            ));
        }

        let mut names = Vec::new();
        let mut cursor = params.clone();
        while cursor.is_pair() {
            let param = heap.car(&cursor)?;
            if !matches!(param, Value::Symbol(_)) {
                return Err(Error::TypeError(format!(
                    "procedure parameter is not a symbol: {}",
                    heap.render(&param)
                )));
            }
            names.push(param);
            cursor = heap.cdr(&cursor)?;
        }
        if !cursor.is_nil() {
            return Err(Error::TypeError(format!(
                "improper parameter list: {}",
                heap.render(params)
            )));
        }

        let vars = heap.list(&names);
        let frame = heap.list(&[vars, args.clone(), parent.clone()]);
        Ok(Environment { frame })
    }

    /// Resolve `name`, walking the chain innermost-first and scanning each
    /// frame's binding lists in order.
    pub fn lookup(&self, heap: &Heap, name: &str) -> Result<Value, Error> {
        let mut env = self.frame.clone();
        while !env.is_nil() {
            let mut vars = heap.car(&env)?;
            let mut vals = heap.cadr(&env)?;
            while vars.is_pair() {
                if heap.car(&vars)?.is_symbol(name) {
                    return heap.car(&vals);
                }
                vars = heap.cdr(&vars)?;
                vals = heap.cdr(&vals)?;
            }
            env = env_parent(heap, &env)?;
        }
        Err(Error::UnboundVariable(name.to_owned()))
    }

    /// Bind `name` to `value` in this frame only.
    ///
    /// Fails with `DuplicateDefinition` if the name is already bound here;
    /// bindings in ancestor frames are ignored, so shadowing across frames
    /// is legal. On success the binding lists are extended in place and the
    /// defined symbol is returned.
    pub fn define(&self, heap: &mut Heap, name: &str, value: Value) -> Result<Value, Error> {
        let sym = Value::symbol(name);
        let vars_head = heap.car(&self.frame)?;

        if vars_head.is_nil() {
            // First binding: install fresh singleton lists in the frame.
            let vars = heap.cons(sym.clone(), Value::Nil);
            heap.set_car(&self.frame, vars)?;
            let vals_cell = heap.cdr(&self.frame)?;
            let vals = heap.cons(value, Value::Nil);
            heap.set_car(&vals_cell, vals)?;
            return Ok(sym);
        }

        // Walk to the last cell of both lists, checking for a duplicate.
        let mut vars = vars_head;
        let mut vals = heap.cadr(&self.frame)?;
        loop {
            if heap.car(&vars)?.is_symbol(name) {
                return Err(Error::DuplicateDefinition(name.to_owned()));
            }
            let next = heap.cdr(&vars)?;
            if next.is_nil() {
                break;
            }
            vars = next;
            vals = heap.cdr(&vals)?;
        }

        let var_tail = heap.cons(sym.clone(), Value::Nil);
        heap.set_cdr(&vars, var_tail)?;
        let val_tail = heap.cons(value, Value::Nil);
        heap.set_cdr(&vals, val_tail)?;
        Ok(sym)
    }
}

fn env_parent(heap: &Heap, frame: &Value) -> Result<Value, Error> {
    let tail = heap.cdr(frame)?;
    let tail = heap.cdr(&tail)?;
    heap.car(&tail)
}

/// Create a fresh root environment: the primitive procedures in their own
/// frame, with an empty frame on top so user definitions never collide with
/// the primitive bindings (they shadow them instead).
pub fn root_environment(heap: &mut Heap) -> Environment {
    let mut bindings: Vec<(&str, Value)> = Vec::new();
    for op in primitives::PRIMITIVES {
        let procedure = make_primitive(heap, *op);
        bindings.push((op.name, procedure));
    }
    let primitive_frame = Environment::extend(heap, &bindings, None);
    Environment::extend(heap, &[], Some(&primitive_frame))
}

/// Build a primitive-procedure value: `(primitive <op>)`.
fn make_primitive(heap: &mut Heap, op: PrimOp) -> Value {
    let tag = Value::symbol(PRIMITIVE_TAG);
    heap.list(&[tag, Value::PrimOp(op)])
}

/// Build a compound-procedure value: `(compound <params> <body> <env>)`.
fn make_compound(heap: &mut Heap, params: Value, body: Value, env: &Environment) -> Value {
    let tag = Value::symbol(COMPOUND_TAG);
    let captured = env.as_value().clone();
    heap.list(&[tag, params, body, captured])
}

/// Evaluate an expression against an environment (public API).
pub fn evaluate(heap: &mut Heap, expr: &Value, env: &Environment) -> Result<Value, Error> {
    eval_at_depth(heap, expr, env, 0)
}

/// Read one expression from `source` and evaluate it against `env`.
pub fn eval_source(heap: &mut Heap, source: &str, env: &Environment) -> Result<Value, Error> {
    let expr = crate::reader::read(heap, source)?;
    evaluate(heap, &expr, env)
}

fn eval_at_depth(
    heap: &mut Heap,
    expr: &Value,
    env: &Environment,
    depth: usize,
) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::EvalError(format!(
            "evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }

    match expr {
        // Self-evaluating kinds
        Value::Nil | Value::Number(_) | Value::String(_) | Value::Bool(_) => Ok(expr.clone()),

        // Variable reference
        Value::Symbol(name) => env.lookup(heap, name),

        // The only remaining atom kind; it never appears in read source and
        // must not be silently passed through.
        Value::PrimOp(_) => Err(Error::UnknownAtomType(heap.render(expr))),

        Value::Pair(_) => {
            let op = heap.car(expr)?;
            if let Value::Symbol(tag) = &op {
                match tag.as_str() {
                    "quote" => return eval_quote(heap, expr),
                    "lambda" => return eval_lambda(heap, expr, env),
                    "if" => return eval_if(heap, expr, env, depth),
                    "define" => return eval_define(heap, expr, env, depth),
                    "begin" => return eval_begin(heap, expr, env, depth),
                    _ => {}
                }
            }

            // Application: operator first, then operands, left to right.
            let procedure = eval_at_depth(heap, &op, env, depth + 1)?;
            let operands = heap.cdr(expr)?;
            let args = eval_operands(heap, &operands, env, depth)?;
            apply(heap, &procedure, &args, depth)
        }
    }
}

/// `car` of the `index`th `cdr` of a form, with structural failures reported
/// as a malformed form rather than a bare pair error.
fn operand(heap: &Heap, exp: &Value, form: &'static str, index: usize) -> Result<Value, Error> {
    let mut cursor = exp.clone();
    for _ in 0..index {
        cursor = heap
            .cdr(&cursor)
            .map_err(|_| malformed_form(heap, form, exp))?;
    }
    heap.car(&cursor)
        .map_err(|_| malformed_form(heap, form, exp))
}

/// The tail of a form after `index` `cdr` steps.
fn operand_tail(
    heap: &Heap,
    exp: &Value,
    form: &'static str,
    index: usize,
) -> Result<Value, Error> {
    let mut cursor = exp.clone();
    for _ in 0..index {
        cursor = heap
            .cdr(&cursor)
            .map_err(|_| malformed_form(heap, form, exp))?;
    }
    Ok(cursor)
}

fn malformed_form(heap: &Heap, form: &str, exp: &Value) -> Error {
    Error::Malformed(format!("malformed {form} form: {}", heap.render(exp)))
}

/// `(quote <datum>)`: the single operand, unevaluated.
fn eval_quote(heap: &mut Heap, exp: &Value) -> Result<Value, Error> {
    operand(heap, exp, "quote", 1)
}

/// `(lambda <params> <body>...)`: close over the current environment.
fn eval_lambda(heap: &mut Heap, exp: &Value, env: &Environment) -> Result<Value, Error> {
    let params = operand(heap, exp, "lambda", 1)?;
    let body = operand_tail(heap, exp, "lambda", 2)?;
    Ok(make_compound(heap, params, body, env))
}

/// `(if <cond> <conseq> <alt>)`: branch on the condition's payload.
fn eval_if(heap: &mut Heap, exp: &Value, env: &Environment, depth: usize) -> Result<Value, Error> {
    let cond = operand(heap, exp, "if", 1)?;
    let test = eval_at_depth(heap, &cond, env, depth + 1)?;
    if truthy(&test) {
        let conseq = operand(heap, exp, "if", 2)?;
        eval_at_depth(heap, &conseq, env, depth + 1)
    } else {
        // A two-arm `if` whose condition is false has no alternate to take.
        let alt = operand(heap, exp, "if", 3)?;
        eval_at_depth(heap, &alt, env, depth + 1)
    }
}

/// Raw payload truthiness: only `#f`, nil, `0`, and empty strings are false.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Nil => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) | Value::Symbol(s) => !s.is_empty(),
        Value::PrimOp(_) | Value::Pair(_) => true,
    }
}

/// `(define <name> <expr>)`: evaluate the expression, then bind the name in
/// the current frame. Yields the defined symbol.
fn eval_define(
    heap: &mut Heap,
    exp: &Value,
    env: &Environment,
    depth: usize,
) -> Result<Value, Error> {
    let name = match operand(heap, exp, "define", 1)? {
        Value::Symbol(name) => name,
        other => {
            return Err(Error::TypeError(format!(
                "define requires a symbol name, got: {}",
                heap.render(&other)
            )));
        }
    };
    let value_exp = operand(heap, exp, "define", 2)?;
    let value = eval_at_depth(heap, &value_exp, env, depth + 1)?;
    env.define(heap, &name, value)
}

/// `(begin <expr>...)`: each expression in order, value of the last.
fn eval_begin(
    heap: &mut Heap,
    exp: &Value,
    env: &Environment,
    depth: usize,
) -> Result<Value, Error> {
    let seq = operand_tail(heap, exp, "begin", 1)?;
    eval_sequence(heap, &seq, env, depth)
}

/// Evaluate a proper, non-empty list of expressions in order, returning the
/// last result. Empty and improper sequences are malformed, not guessed at.
fn eval_sequence(
    heap: &mut Heap,
    seq: &Value,
    env: &Environment,
    depth: usize,
) -> Result<Value, Error> {
    if seq.is_nil() {
        return Err(Error::Malformed("empty expression sequence".to_owned()));
    }

    let mut seq = seq.clone();
    loop {
        let head = heap.car(&seq).map_err(|_| {
            Error::Malformed(format!(
                "improper expression sequence: {}",
                heap.render(&seq)
            ))
        })?;
        let value = eval_at_depth(heap, &head, env, depth + 1)?;
        let rest = heap.cdr(&seq)?;
        if rest.is_nil() {
            return Ok(value);
        }
        seq = rest;
    }
}

/// Evaluate each operand left to right into a fresh argument list.
fn eval_operands(
    heap: &mut Heap,
    operands: &Value,
    env: &Environment,
    depth: usize,
) -> Result<Value, Error> {
    let mut items = Vec::new();
    let mut rest = operands.clone();
    while rest.is_pair() {
        let head = heap.car(&rest)?;
        items.push(eval_at_depth(heap, &head, env, depth + 1)?);
        rest = heap.cdr(&rest)?;
    }
    if !rest.is_nil() {
        return Err(Error::Malformed(format!(
            "improper argument list: {}",
            heap.render(operands)
        )));
    }
    Ok(heap.list(&items))
}

/// Apply a procedure value to an evaluated argument list.
fn apply(heap: &mut Heap, procedure: &Value, args: &Value, depth: usize) -> Result<Value, Error> {
    if !procedure.is_pair() {
        return Err(Error::TypeError(format!(
            "cannot apply non-procedure: {}",
            heap.render(procedure)
        )));
    }

    let tag = heap.car(procedure)?;
    if tag.is_symbol(PRIMITIVE_TAG) {
        let op = operand(heap, procedure, "primitive procedure", 1)?;
        return match op {
            Value::PrimOp(op) => (op.func)(heap, args),
            other => Err(Error::Malformed(format!(
                "primitive procedure without an operation: {}",
                heap.render(&other)
            ))),
        };
    }

    if tag.is_symbol(COMPOUND_TAG) {
        let params = operand(heap, procedure, "compound procedure", 1)?;
        let body = operand(heap, procedure, "compound procedure", 2)?;
        let captured = operand(heap, procedure, "compound procedure", 3)?;
        let frame = Environment::bind(heap, &params, args, &captured)?;
        return eval_sequence(heap, &body, &frame, depth + 1);
    }

    Err(Error::TypeError(format!(
        "cannot apply non-procedure: {}",
        heap.render(procedure)
    )))
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;

    /// Expected outcome of evaluating one input.
    #[derive(Debug)]
    enum EvalOutcome {
        /// Evaluation succeeds and the result renders as this text
        Renders(&'static str),
        /// Evaluation fails with an error whose display contains this text
        SpecificError(&'static str),
    }
    use EvalOutcome::*;

    /// A sequence of inputs evaluated against one shared environment.
    struct TestEnvironment(Vec<(&'static str, EvalOutcome)>);

    fn execute_test_case(
        heap: &mut Heap,
        env: &Environment,
        input: &str,
        expected: &EvalOutcome,
        test_id: &str,
    ) {
        match (eval_source(heap, input, env), expected) {
            (Ok(actual), Renders(text)) => {
                assert_eq!(heap.render(&actual), *text, "{test_id}: result mismatch");
            }
            (Err(e), SpecificError(text)) => {
                let message = format!("{e}");
                assert!(
                    message.contains(text),
                    "{test_id}: error should contain '{text}', got: {message}"
                );
            }
            (Ok(actual), SpecificError(text)) => {
                panic!(
                    "{test_id}: expected error containing '{text}', got {}",
                    heap.render(&actual)
                );
            }
            (Err(e), Renders(text)) => {
                panic!("{test_id}: expected {text:?}, got error: {e}");
            }
        }
    }

    /// Each case runs against a fresh heap and root environment.
    fn run_eval_tests(test_cases: Vec<(&str, EvalOutcome)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let mut heap = Heap::new();
            let env = root_environment(&mut heap);
            let test_id = format!("Eval test #{} ({input:?})", i + 1);
            execute_test_case(&mut heap, &env, input, expected, &test_id);
        }
    }

    /// Each group shares one environment across its cases.
    fn run_tests_in_environment(test_environments: Vec<TestEnvironment>) {
        for (env_idx, TestEnvironment(test_cases)) in test_environments.iter().enumerate() {
            let mut heap = Heap::new();
            let env = root_environment(&mut heap);
            for (test_idx, (input, expected)) in test_cases.iter().enumerate() {
                let test_id = format!(
                    "Environment #{} test #{} ({input:?})",
                    env_idx + 1,
                    test_idx + 1
                );
                execute_test_case(&mut heap, &env, input, expected, &test_id);
            }
        }
    }

    #[test]
    #[expect(clippy::too_many_lines)] // comprehensive coverage is intentionally thorough
    fn test_evaluator_comprehensive() {
        let test_cases = vec![
            // ===== SELF-EVALUATING FORMS =====
            ("1", Renders("1")),
            ("0", Renders("0")),
            ("#t", Renders("#t")),
            ("#f", Renders("#f")),
            ("()", Renders("()")),
            // ===== VARIABLE REFERENCE =====
            ("car", Renders("(primitive #<primitive:car>)")),
            ("y", SpecificError("Unbound variable: y")),
            // ===== QUOTE =====
            ("(quote aaa)", Renders("aaa")),
            ("(quote (1 2))", Renders("(1 2)")),
            ("(quote ())", Renders("()")),
            ("(quote (quote a))", Renders("(quote a)")),
            ("(quote)", SpecificError("Malformed")),
            // ===== IF: payload truthiness =====
            ("(if #t 1 2)", Renders("1")),
            ("(if #f 1 2)", Renders("2")),
            ("(if () 1 2)", Renders("2")),
            ("(if 0 1 2)", Renders("2")),
            ("(if 7 1 2)", Renders("1")),
            ("(if (quote sym) 1 2)", Renders("1")),
            ("(if (cons 1 2) 1 2)", Renders("1")),
            ("(if (null? ()) 1 2)", Renders("1")),
            // A true condition never touches the (absent) alternate...
            ("(if #t 1)", Renders("1")),
            // ...but a false one needs it.
            ("(if #f 1)", SpecificError("Malformed")),
            ("(if)", SpecificError("Malformed")),
            // The condition is evaluated, not inspected literally.
            ("(if y 1 2)", SpecificError("Unbound variable")),
            // ===== BEGIN =====
            ("(begin 1 2 3)", Renders("3")),
            ("(begin (quote a))", Renders("a")),
            ("(begin)", SpecificError("Malformed")),
            // ===== DEFINE =====
            ("(define x 1)", Renders("x")),
            ("(begin (define x 1) x)", Renders("1")),
            ("(begin (define x 1) (+ x 1))", Renders("2")),
            (
                "(begin (define x 1) (define x 2))",
                SpecificError("Duplicate definition: x"),
            ),
            ("(define 1 2)", SpecificError("define requires a symbol")),
            ("(define x)", SpecificError("Malformed")),
            // Shadowing a primitive is a fresh-frame define, not a duplicate.
            ("(define cons 1)", Renders("cons")),
            // ===== APPLICATION =====
            ("(+ 1 1)", Renders("2")),
            ("(+ 1 (+ 2 3))", Renders("6")),
            ("((lambda (a b) (+ a b)) 1 2)", Renders("3")),
            ("((lambda (b) (define a 1) (+ a b)) 2)", Renders("3")),
            ("(((lambda (a) (lambda (b) (+ a b))) 1) 2)", Renders("3")),
            ("((lambda () 42))", Renders("42")),
            ("(1 2)", SpecificError("cannot apply non-procedure")),
            // ===== ARITY =====
            ("((lambda (a b) a) 1)", SpecificError("ArityError")),
            ("((lambda () 1) 2)", SpecificError("ArityError")),
            ("((lambda (a) a) 1 2)", SpecificError("ArityError")),
            // ===== PRIMITIVES =====
            ("(cons 1 2)", Renders("(1 . 2)")),
            ("(car (cons 1 2))", Renders("1")),
            ("(cdr (cons 1 2))", Renders("2")),
            ("(null? ())", Renders("#t")),
            ("(null? 1)", Renders("#f")),
            ("(null? (quote ()))", Renders("#t")),
            ("(car 1)", SpecificError("Type error")),
            ("(cdr #t)", SpecificError("Type error")),
            ("(+ 1 #t)", SpecificError("Type error")),
            // Operands are evaluated before application, left to right.
            ("(+ (+ 1 2) (+ 3 4))", Renders("10")),
            ("(car (quote (1 2)))", Renders("1")),
        ];

        run_eval_tests(test_cases);
    }

    #[test]
    fn test_definitions_and_closures_share_an_environment() {
        let test_environments = vec![
            TestEnvironment(vec![
                ("(define lst (cons 1 (cons 2 ())))", Renders("lst")),
                ("lst", Renders("(1 2)")),
                ("(car lst)", Renders("1")),
                ("(cdr lst)", Renders("(2)")),
                ("(null? lst)", Renders("#f")),
                ("(null? (cdr (cdr lst)))", Renders("#t")),
                (
                    "(define length (lambda (l) (if (null? l) 0 (+ 1 (length (cdr l))))))",
                    Renders("length"),
                ),
                ("(length lst)", Renders("2")),
                ("(length ())", Renders("0")),
            ]),
            TestEnvironment(vec![
                ("(define add (lambda (a b) (+ a b)))", Renders("add")),
                ("(add 1 (add 2 (add 3 4)))", Renders("10")),
                // Same frame: duplicate. Inner frame: shadowing, legal.
                ("(define add 1)", SpecificError("Duplicate definition")),
                ("((lambda (add) add) 9)", Renders("9")),
                ("((lambda () (define add 5) add))", Renders("5")),
            ]),
            TestEnvironment(vec![
                // A define inside a body grows only the call frame; the
                // procedure stays callable with its declared arity.
                (
                    "(define f (lambda (b) (define a 1) (+ a b)))",
                    Renders("f"),
                ),
                ("(f 2)", Renders("3")),
                ("(f 10)", Renders("11")),
            ]),
        ];

        run_tests_in_environment(test_environments);
    }

    #[test]
    fn test_lambda_yields_compound_procedure() {
        let mut heap = Heap::new();
        let env = root_environment(&mut heap);
        let procedure = eval_source(&mut heap, "(lambda (x) x)", &env).unwrap();
        assert!(procedure.is_pair());
        assert!(heap.car(&procedure).unwrap().is_symbol(COMPOUND_TAG));
        let rendered = heap.render(&procedure);
        assert!(
            rendered.starts_with("(compound (x) (x)"),
            "got: {rendered}"
        );
    }

    #[test]
    fn test_primop_atom_is_unknown_atom_type() {
        let mut heap = Heap::new();
        let env = root_environment(&mut heap);
        let op = Value::PrimOp(primitives::PRIMITIVES[0]);
        match evaluate(&mut heap, &op, &env) {
            Err(Error::UnknownAtomType(text)) => assert!(text.contains("#<primitive:")),
            other => panic!("expected UnknownAtomType, got {other:?}"),
        }
    }

    #[test]
    fn test_eval_depth_limit() {
        let mut heap = Heap::new();
        let env = root_environment(&mut heap);

        // Build (+ 1 (+ 1 (+ 1 ...))) nested past the evaluation budget,
        // directly on the heap so the reader's own limit is not involved.
        let mut expr = Value::Number(1.0);
        for _ in 0..(MAX_EVAL_DEPTH + 1) {
            expr = heap.list(&[Value::symbol("+"), Value::Number(1.0), expr]);
        }
        match evaluate(&mut heap, &expr, &env) {
            Err(Error::EvalError(msg)) => assert!(msg.contains("depth limit")),
            other => panic!("expected EvalError, got {other:?}"),
        }
    }

    #[test]
    fn test_environment_primitive_frame_is_isolated() {
        let mut heap = Heap::new();
        let env = root_environment(&mut heap);

        // The bootstrap's top frame starts empty.
        let vars = heap.car(env.as_value()).unwrap();
        assert!(vars.is_nil());

        // Shadow a primitive in the top frame; a fresh bootstrap still sees
        // the original procedure.
        eval_source(&mut heap, "(define car 1)", &env).unwrap();
        assert_eq!(env.lookup(&heap, "car").unwrap(), Value::Number(1.0));

        let fresh = root_environment(&mut heap);
        assert!(fresh.lookup(&heap, "car").unwrap().is_pair());
    }

    #[test]
    fn test_environment_extend_lookup_define() {
        let mut heap = Heap::new();

        let root = Environment::extend(
            &mut heap,
            &[("a", Value::Number(1.0)), ("b", Value::Number(2.0))],
            None,
        );
        assert_eq!(root.lookup(&heap, "a").unwrap(), Value::Number(1.0));
        assert_eq!(root.lookup(&heap, "b").unwrap(), Value::Number(2.0));
        assert!(matches!(
            root.lookup(&heap, "c"),
            Err(Error::UnboundVariable(name)) if name == "c"
        ));

        // Child frames see parent bindings and may shadow them.
        let child = Environment::extend(&mut heap, &[("a", Value::Number(10.0))], Some(&root));
        assert_eq!(child.lookup(&heap, "a").unwrap(), Value::Number(10.0));
        assert_eq!(child.lookup(&heap, "b").unwrap(), Value::Number(2.0));

        // define extends the frame in place and returns the symbol.
        let sym = child.define(&mut heap, "c", Value::Number(3.0)).unwrap();
        assert_eq!(sym, Value::symbol("c"));
        assert_eq!(child.lookup(&heap, "c").unwrap(), Value::Number(3.0));
        assert!(matches!(
            root.lookup(&heap, "c"),
            Err(Error::UnboundVariable(_))
        ));

        // Redefinition in the same frame fails; shadowing a parent succeeds.
        assert!(matches!(
            child.define(&mut heap, "c", Value::Number(4.0)),
            Err(Error::DuplicateDefinition(name)) if name == "c"
        ));
        assert_eq!(
            child.define(&mut heap, "b", Value::Number(20.0)).unwrap(),
            Value::symbol("b")
        );
        assert_eq!(child.lookup(&heap, "b").unwrap(), Value::Number(20.0));
        assert_eq!(root.lookup(&heap, "b").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_bind_copies_parameter_list() {
        let mut heap = Heap::new();
        let params = heap.list(&[Value::symbol("b")]);
        let args = heap.list(&[Value::Number(2.0)]);
        let frame = Environment::bind(&mut heap, &params, &args, &Value::Nil).unwrap();

        // Growing the call frame must not grow the source parameter list.
        frame.define(&mut heap, "a", Value::Number(1.0)).unwrap();
        assert_eq!(heap.list_len(&params), 1);
        let frame_vars = heap.car(frame.as_value()).unwrap();
        assert_eq!(heap.list_len(&frame_vars), 2);
    }

    #[test]
    fn test_bind_arity_mismatch() {
        let mut heap = Heap::new();
        let params = heap.list(&[Value::symbol("a"), Value::symbol("b")]);
        let args = heap.list(&[Value::Number(1.0)]);
        match Environment::bind(&mut heap, &params, &args, &Value::Nil) {
            Err(Error::ArityError { expected, got, .. }) => {
                assert_eq!((expected, got), (2, 1));
            }
            other => panic!("expected ArityError, got {other:?}"),
        }
    }
}
