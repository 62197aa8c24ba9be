use std::iter::once;

use tracing::trace;

use crate::{
    builtins,
    env::{Env, EnvId, Scopes},
    error::LispError,
    parse,
    value::{Function, Lambda, Value},
};

/// The formal that binds all remaining arguments to the formal after it
pub const VARIADIC: &str = "&";

static PRELUDE: &str = include_str!("prelude.lspy");

/// Reduces a value to normal form in the given environment
pub fn eval(scopes: &mut Scopes, env: EnvId, value: Value) -> Value {
    match value {
        Value::Sym(name) => scopes.get(env, &name),
        Value::Sexpr(cells) => eval_sexpr(scopes, env, cells),
        value => value,
    }
}

pub fn eval_sexpr(scopes: &mut Scopes, env: EnvId, cells: Vec<Value>) -> Value {
    let mut cells: Vec<Value> = cells
        .into_iter()
        .map(|cell| eval(scopes, env, cell))
        .collect();
    if let Some(i) = cells.iter().position(Value::is_err) {
        return cells.swap_remove(i);
    }
    match cells.len() {
        0 => return Value::Sexpr(cells),
        1 => return cells.remove(0),
        _ => {}
    }
    match cells.remove(0) {
        Value::Fun(f) => call(scopes, env, f, cells),
        other => LispError::NotAFunction(other.kind()).into(),
    }
}

/// Applies a function to evaluated arguments
pub fn call(scopes: &mut Scopes, env: EnvId, f: Function, args: Vec<Value>) -> Value {
    match f {
        Function::Builtin(builtin) => builtin.call(scopes, env, args),
        Function::Lambda(lambda) => apply(scopes, env, *lambda, args),
    }
}

fn apply(scopes: &mut Scopes, env: EnvId, mut lambda: Lambda, args: Vec<Value>) -> Value {
    let given = args.len();
    let total = lambda.formals.len();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if lambda.formals.is_empty() {
            return LispError::TooManyArguments { given, total }.into();
        }
        let formal = lambda.formals.remove(0);
        if formal == VARIADIC {
            if lambda.formals.len() != 1 {
                return LispError::InvalidVariadic.into();
            }
            let rest = lambda.formals.remove(0);
            let list = Value::Qexpr(once(arg).chain(args.by_ref()).collect());
            lambda.env.put(rest, list);
            break;
        }
        lambda.env.put(formal, arg);
    }
    // No arguments were left for the variadic formal
    if lambda.formals.first().map(String::as_str) == Some(VARIADIC) {
        if lambda.formals.len() != 2 {
            return LispError::InvalidVariadic.into();
        }
        let rest = lambda.formals.remove(1);
        lambda.formals.clear();
        lambda.env.put(rest, Value::qexpr());
    }
    if lambda.formals.is_empty() {
        trace!(given, bound = lambda.env.len(), "full application");
        let frame = scopes.push(lambda.env, env);
        let result = eval(scopes, frame, Value::Sexpr(lambda.body));
        scopes.pop(frame);
        result
    } else {
        trace!(given, remaining = lambda.formals.len(), "partial application");
        Value::Fun(Function::Lambda(Box::new(lambda)))
    }
}

/// Evaluates every top-level form of `source` in the global environment
///
/// Stops at the first form that evaluates to an error and returns it.
pub fn load_source(scopes: &mut Scopes, source: &str) -> Value {
    let forms = match parse::parse(source) {
        Ok(program) => program.into_cells().unwrap_or_default(),
        Err(e) => return LispError::from(e).into(),
    };
    for form in forms {
        let result = eval(scopes, Scopes::ROOT, form);
        if result.is_err() {
            return result;
        }
    }
    Value::sexpr()
}

/// A persistent global environment with every builtin bound
pub struct Interpreter {
    scopes: Scopes,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let mut global = Env::default();
        builtins::register(&mut global);
        Interpreter {
            scopes: Scopes::new(global),
        }
    }
    /// An interpreter with the prelude already loaded
    pub fn with_prelude() -> Result<Self, LispError> {
        let mut interpreter = Interpreter::new();
        interpreter.load_prelude()?;
        Ok(interpreter)
    }
    pub fn load_prelude(&mut self) -> Result<(), LispError> {
        match load_source(&mut self.scopes, PRELUDE) {
            Value::Err(e) => Err(e),
            _ => Ok(()),
        }
    }
    /// Parses a line and evaluates it as a single S-Expression
    pub fn eval_str(&mut self, input: &str) -> Value {
        match parse::parse(input) {
            Ok(program) => self.eval(program),
            Err(e) => LispError::from(e).into(),
        }
    }
    pub fn eval(&mut self, value: Value) -> Value {
        eval(&mut self.scopes, Scopes::ROOT, value)
    }
    /// Loads a file the way the `load` builtin does
    pub fn load(&mut self, path: &str) -> Value {
        self.eval(
            Value::sexpr()
                .push(Value::builtin(builtins::Builtin::Load))
                .push(Value::string(path)),
        )
    }
    pub fn global(&self) -> &Env {
        self.scopes.global()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(lines: &[&str]) -> Value {
        let mut interpreter = Interpreter::new();
        let mut result = Value::sexpr();
        for line in lines {
            result = interpreter.eval_str(line);
        }
        result
    }

    fn nums(ns: &[i64]) -> Value {
        Value::Qexpr(ns.iter().copied().map(Value::num).collect())
    }

    #[test]
    fn self_evaluating() {
        let mut scopes = Scopes::default();
        assert_eq!(eval(&mut scopes, Scopes::ROOT, Value::num(3)), Value::num(3));
        assert_eq!(eval(&mut scopes, Scopes::ROOT, nums(&[1])), nums(&[1]));
        assert_eq!(eval(&mut scopes, Scopes::ROOT, Value::sexpr()), Value::sexpr());
    }

    #[test]
    fn singleton_is_unwrapped() {
        assert_eq!(run(&["(5)"]), Value::num(5));
        assert_eq!(run(&["((((5))))"]), Value::num(5));
    }

    #[test]
    fn first_error_wins() {
        assert_eq!(
            run(&["(+ (/ 1 0) undefined)"]),
            Value::Err(LispError::DivisionByZero)
        );
        assert_eq!(
            run(&["(+ undefined (/ 1 0))"]),
            Value::Err(LispError::UnboundSymbol("undefined".into()))
        );
    }

    #[test]
    fn head_must_be_a_function() {
        assert_eq!(
            run(&["(1 2)"]),
            Value::Err(LispError::NotAFunction(crate::value::Type::Number))
        );
    }

    #[test]
    fn partial_application_accumulates() {
        let partial = run(&["(def {add3} (\\ {x y z} {+ x y z}))", "(add3 1 2)"]);
        match &partial {
            Value::Fun(Function::Lambda(lambda)) => {
                assert_eq!(lambda.formals, ["z"]);
                assert_eq!(lambda.env.get("x"), Some(&Value::num(1)));
                assert_eq!(lambda.env.get("y"), Some(&Value::num(2)));
            }
            other => panic!("expected a lambda, got {}", other),
        }
        assert_eq!(
            run(&["(def {add3} (\\ {x y z} {+ x y z}))", "((add3 1) 2 3)"]),
            Value::num(6)
        );
    }

    #[test]
    fn too_many_arguments() {
        assert_eq!(
            run(&["((\\ {x} {x}) 1 2)"]),
            Value::Err(LispError::TooManyArguments { given: 2, total: 1 })
        );
    }

    #[test]
    fn variadic_binding() {
        assert_eq!(run(&["((\\ {x & xs} {xs}) 1 2 3)"]), nums(&[2, 3]));
        assert_eq!(run(&["((\\ {x & xs} {xs}) 1)"]), nums(&[]));
        assert_eq!(run(&["((\\ {& xs} {xs}) 1 2)"]), nums(&[1, 2]));
        assert_eq!(run(&["((\\ {x y & r} {r}) 1 2)"]), nums(&[]));
    }

    #[test]
    fn malformed_variadic_formals() {
        assert_eq!(
            run(&["((\\ {& a b} {a}) 1)"]),
            Value::Err(LispError::InvalidVariadic)
        );
        assert_eq!(
            run(&["((\\ {x &} {x}) 1)"]),
            Value::Err(LispError::InvalidVariadic)
        );
    }

    #[test]
    fn frames_are_released_after_calls() {
        let mut interpreter = Interpreter::new();
        interpreter.eval_str("(def {f} (\\ {x} {= {y} x}))");
        assert_eq!(interpreter.eval_str("(f 1)"), Value::sexpr());
        assert_eq!(interpreter.scopes.depth(), 1);
        assert!(interpreter.global().get("y").is_none());
    }

    #[test]
    fn load_source_stops_at_first_error() {
        let mut global = Env::default();
        builtins::register(&mut global);
        let mut scopes = Scopes::new(global);
        let result = load_source(&mut scopes, "(def {a} 1) (error \"stop\") (def {b} 2)");
        assert_eq!(result, Value::Err(LispError::User("stop".into())));
        assert!(scopes.global().get("a").is_some());
        assert!(scopes.global().get("b").is_none());
    }

    #[test]
    fn prelude_loads() {
        let interpreter = Interpreter::with_prelude().expect("prelude should load");
        assert!(interpreter.global().get("map").is_some());
    }
}
