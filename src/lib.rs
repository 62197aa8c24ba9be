//! A small Lisp with S-Expressions, Q-Expressions, first-class functions,
//! partial application and variadic formals.
//!
//! ```
//! use lispy::{Interpreter, Value};
//!
//! let mut lisp = Interpreter::new();
//! assert_eq!(lisp.eval_str("(+ 1 2)"), Value::Num(3));
//! ```

pub mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod parse;
pub mod value;

pub use crate::{
    builtins::Builtin,
    env::{Env, EnvId, Scopes},
    error::LispError,
    eval::Interpreter,
    value::{Function, Lambda, Type, Value},
};
