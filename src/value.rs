use std::fmt;

use derive_more::Display;
use itertools::Itertools;

use crate::{builtins::Builtin, env::Env, error::LispError};

/// The type of a [`Value`], as named in diagnostics
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    #[display(fmt = "Number")]
    Number,
    #[display(fmt = "Error")]
    Error,
    #[display(fmt = "Symbol")]
    Symbol,
    #[display(fmt = "String")]
    String,
    #[display(fmt = "Function")]
    Function,
    #[display(fmt = "S-Expression")]
    Sexpr,
    #[display(fmt = "Q-Expression")]
    Qexpr,
}

/// A runtime value
///
/// Values form trees. Every child is owned by exactly one container, and
/// `clone` is a deep copy, lambdas included.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(i64),
    Err(LispError),
    Sym(String),
    Str(String),
    Fun(Function),
    Sexpr(Vec<Value>),
    Qexpr(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    Builtin(Builtin),
    Lambda(Box<Lambda>),
}

/// A user-defined function
///
/// `env` belongs to the lambda alone. Arguments bound by a partial
/// application accumulate there until every formal is bound.
#[derive(Debug, Clone)]
pub struct Lambda {
    pub formals: Vec<String>,
    pub body: Vec<Value>,
    pub env: Env,
}

impl PartialEq for Lambda {
    fn eq(&self, other: &Self) -> bool {
        self.formals == other.formals && self.body == other.body
    }
}

impl Value {
    pub fn num(n: i64) -> Self {
        Value::Num(n)
    }
    pub fn sym<S>(name: S) -> Self
    where
        S: Into<String>,
    {
        Value::Sym(name.into())
    }
    pub fn string<S>(text: S) -> Self
    where
        S: Into<String>,
    {
        Value::Str(text.into())
    }
    pub fn error(error: LispError) -> Self {
        Value::Err(error)
    }
    pub fn sexpr() -> Self {
        Value::Sexpr(Vec::new())
    }
    pub fn qexpr() -> Self {
        Value::Qexpr(Vec::new())
    }
    pub fn builtin(builtin: Builtin) -> Self {
        Value::Fun(Function::Builtin(builtin))
    }
    pub fn lambda(formals: Vec<String>, body: Vec<Value>, env: Env) -> Self {
        Value::Fun(Function::Lambda(Box::new(Lambda { formals, body, env })))
    }
    pub fn kind(&self) -> Type {
        match self {
            Value::Num(_) => Type::Number,
            Value::Err(_) => Type::Error,
            Value::Sym(_) => Type::Symbol,
            Value::Str(_) => Type::String,
            Value::Fun(_) => Type::Function,
            Value::Sexpr(_) => Type::Sexpr,
            Value::Qexpr(_) => Type::Qexpr,
        }
    }
    pub fn is_err(&self) -> bool {
        matches!(self, Value::Err(_))
    }
    /// The children of an S- or Q-Expression
    pub fn cells(&self) -> Option<&[Value]> {
        match self {
            Value::Sexpr(cells) | Value::Qexpr(cells) => Some(cells),
            _ => None,
        }
    }
    pub fn cells_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Sexpr(cells) | Value::Qexpr(cells) => Some(cells),
            _ => None,
        }
    }
    pub fn into_cells(self) -> Option<Vec<Value>> {
        match self {
            Value::Sexpr(cells) | Value::Qexpr(cells) => Some(cells),
            _ => None,
        }
    }
    /// Appends a child to an S- or Q-Expression
    pub fn push(mut self, child: Value) -> Self {
        if let Some(cells) = self.cells_mut() {
            cells.push(child);
        }
        self
    }
    /// Removes the `i`th child, shifting the rest down
    pub fn pop(&mut self, i: usize) -> Option<Value> {
        let cells = self.cells_mut()?;
        if i < cells.len() {
            Some(cells.remove(i))
        } else {
            None
        }
    }
    /// Like [`Value::pop`], but the rest of the list is dropped
    pub fn take(mut self, i: usize) -> Option<Value> {
        self.pop(i)
    }
    /// Moves every child of `other` onto the end of `self`
    pub fn join(mut self, other: Value) -> Self {
        if let (Some(cells), Some(rest)) = (self.cells_mut(), other.into_cells()) {
            cells.extend(rest);
        }
        self
    }
    /// Turns a Q-Expression into an S-Expression so it can be evaluated
    pub fn into_sexpr(self) -> Self {
        match self {
            Value::Qexpr(cells) => Value::Sexpr(cells),
            value => value,
        }
    }
}

impl From<LispError> for Value {
    fn from(error: LispError) -> Self {
        Value::Err(error)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{}", n),
            Value::Err(e) => write!(f, "Error: {}", e),
            Value::Sym(s) | Value::Str(s) => write!(f, "{}", s),
            Value::Fun(fun) => write!(f, "{}", fun),
            Value::Sexpr(cells) => write!(f, "({})", cells.iter().format(" ")),
            Value::Qexpr(cells) => write!(f, "{{{}}}", cells.iter().format(" ")),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Function::Builtin(_) => write!(f, "<builtin>"),
            Function::Lambda(lambda) => write!(
                f,
                "(\\ {{{}}} {{{}}})",
                lambda.formals.iter().format(" "),
                lambda.body.iter().format(" ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ns: &[i64]) -> Value {
        Value::Qexpr(ns.iter().copied().map(Value::num).collect())
    }

    #[test]
    fn pop_shifts_remaining_children() {
        let mut v = list(&[1, 2, 3]);
        assert_eq!(v.pop(1), Some(Value::num(2)));
        assert_eq!(v, list(&[1, 3]));
        assert_eq!(v.pop(5), None);
        assert_eq!(Value::num(1).pop(0), None);
    }

    #[test]
    fn take_and_join() {
        assert_eq!(list(&[4, 5]).take(1), Some(Value::num(5)));
        assert_eq!(list(&[1, 2]).join(list(&[3, 4])), list(&[1, 2, 3, 4]));
        assert_eq!(list(&[]).join(list(&[])), list(&[]));
    }

    #[test]
    fn lambda_equality_ignores_closure() {
        let mut env = Env::default();
        env.put("y", Value::num(10));
        let body = vec![Value::sym("+"), Value::sym("x"), Value::sym("y")];
        let a = Value::lambda(vec!["x".into()], body.clone(), env);
        let b = Value::lambda(vec!["x".into()], body, Env::default());
        assert_eq!(a, b);
        assert_ne!(a, Value::builtin(Builtin::Add));
        assert_eq!(Value::builtin(Builtin::Add), Value::builtin(Builtin::Add));
        assert_ne!(Value::builtin(Builtin::Add), Value::builtin(Builtin::Sub));
    }

    #[test]
    fn sexpr_and_qexpr_differ() {
        assert_ne!(Value::sexpr(), Value::qexpr());
        assert_eq!(Value::qexpr().into_sexpr(), Value::sexpr());
    }

    #[test]
    fn display() {
        let nested = Value::Sexpr(vec![
            Value::sym("+"),
            Value::num(-1),
            list(&[2, 3]),
            Value::string("hi"),
        ]);
        assert_eq!(nested.to_string(), "(+ -1 {2 3} hi)");
        assert_eq!(Value::builtin(Builtin::Head).to_string(), "<builtin>");
        assert_eq!(
            Value::error(LispError::DivisionByZero).to_string(),
            "Error: division by zero"
        );
        let lambda = Value::lambda(
            vec!["x".into(), "y".into()],
            vec![Value::sym("+"), Value::sym("x"), Value::sym("y")],
            Env::default(),
        );
        assert_eq!(lambda.to_string(), "(\\ {x y} {+ x y})");
        assert_eq!(Value::sexpr().to_string(), "()");
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::qexpr().kind().to_string(), "Q-Expression");
        assert_eq!(Value::sexpr().kind().to_string(), "S-Expression");
        assert_eq!(Value::string("").kind().to_string(), "String");
    }
}
