use std::{fs, path::Path};

use itertools::Itertools;

use crate::{
    env::{Env, EnvId, Scopes},
    error::LispError,
    eval::{eval, load_source},
    value::{Type, Value},
};

type BuiltinResult = Result<Value, LispError>;

macro_rules! builtins {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// A primitive operation
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Builtin {
            $($variant),*
        }

        impl Builtin {
            pub const ALL: &'static [Builtin] = &[$(Builtin::$variant),*];
            /// The name the builtin is bound to in the global environment
            pub fn name(self) -> &'static str {
                match self {
                    $(Builtin::$variant => $name),*
                }
            }
        }
    };
}

builtins! {
    Lambda => "\\",
    Def => "def",
    Put => "=",
    List => "list",
    Head => "head",
    Tail => "tail",
    Eval => "eval",
    Join => "join",
    Add => "+",
    Sub => "-",
    Mul => "*",
    Div => "/",
    Rem => "%",
    Less => "<",
    Greater => ">",
    LessOrEqual => "<=",
    GreaterOrEqual => ">=",
    Equal => "==",
    NotEqual => "!=",
    If => "if",
    Load => "load",
    Print => "print",
    Error => "error",
}

/// Binds every builtin under its name
pub fn register(env: &mut Env) {
    for &builtin in Builtin::ALL {
        env.put(builtin.name(), Value::builtin(builtin));
    }
}

impl Builtin {
    /// Applies the builtin to already evaluated arguments in the caller's environment
    pub fn call(self, scopes: &mut Scopes, env: EnvId, args: Vec<Value>) -> Value {
        let result = match self {
            Builtin::Lambda => lambda(scopes, env, args),
            Builtin::Def | Builtin::Put => define(self, scopes, env, args),
            Builtin::List => Ok(Value::Qexpr(args)),
            Builtin::Head => head(args),
            Builtin::Tail => tail(args),
            Builtin::Eval => eval_list(scopes, env, args),
            Builtin::Join => join(args),
            Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div | Builtin::Rem => {
                arithmetic(self, args)
            }
            Builtin::Less | Builtin::Greater | Builtin::LessOrEqual | Builtin::GreaterOrEqual => {
                ordering(self, args)
            }
            Builtin::Equal | Builtin::NotEqual => equality(self, args),
            Builtin::If => if_(scopes, env, args),
            Builtin::Load => load(scopes, args),
            Builtin::Print => print(args),
            Builtin::Error => error(args),
        };
        result.unwrap_or_else(Value::Err)
    }
}

fn expect_count(func: &'static str, args: &[Value], count: usize) -> Result<(), LispError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(LispError::ArityMismatch {
            func,
            expected: count,
            actual: args.len(),
        })
    }
}

fn expect_type(
    func: &'static str,
    args: &[Value],
    index: usize,
    expected: Type,
) -> Result<(), LispError> {
    let actual = args[index].kind();
    if actual == expected {
        Ok(())
    } else {
        Err(LispError::TypeMismatch {
            func,
            index,
            expected,
            actual,
        })
    }
}

fn expect_not_empty(func: &'static str, arg: &Value, index: usize) -> Result<(), LispError> {
    match arg.cells() {
        Some(cells) if cells.is_empty() => Err(LispError::EmptyList { func, index }),
        _ => Ok(()),
    }
}

/// Checks that every child of a Q-Expression is a symbol and returns their names
fn symbols(func: &'static str, list: Value) -> Result<Vec<String>, LispError> {
    list.into_cells()
        .unwrap_or_default()
        .into_iter()
        .map(|value| match value {
            Value::Sym(name) => Ok(name),
            other => Err(LispError::NonSymbol {
                func,
                actual: other.kind(),
            }),
        })
        .collect()
}

/// The only argument, once checked to be of the given type
fn single(func: &'static str, args: Vec<Value>, expected: Type) -> BuiltinResult {
    expect_count(func, &args, 1)?;
    expect_type(func, &args, 0, expected)?;
    Ok(Value::Qexpr(args).take(0).unwrap_or_else(Value::qexpr))
}

fn lambda(scopes: &Scopes, env: EnvId, args: Vec<Value>) -> BuiltinResult {
    let func = Builtin::Lambda.name();
    expect_count(func, &args, 2)?;
    expect_type(func, &args, 0, Type::Qexpr)?;
    expect_type(func, &args, 1, Type::Qexpr)?;
    let mut args = args.into_iter();
    let formals = symbols(func, args.next().unwrap_or_else(Value::qexpr))?;
    let body = args.next().and_then(Value::into_cells).unwrap_or_default();
    Ok(Value::lambda(formals, body, scopes.captured(env)))
}

fn define(builtin: Builtin, scopes: &mut Scopes, env: EnvId, args: Vec<Value>) -> BuiltinResult {
    let func = builtin.name();
    if args.is_empty() {
        return Err(LispError::ArityMismatch {
            func,
            expected: 1,
            actual: 0,
        });
    }
    expect_type(func, &args, 0, Type::Qexpr)?;
    let mut args = args.into_iter();
    let names = symbols(func, args.next().unwrap_or_else(Value::qexpr))?;
    if names.len() != args.len() {
        return Err(LispError::UnmatchedDefinition {
            func,
            symbols: names.len(),
            values: args.len(),
        });
    }
    for (name, value) in names.into_iter().zip(args) {
        if builtin == Builtin::Def {
            tracing::debug!(%name, "global definition");
            scopes.def(env, name, value);
        } else {
            scopes.put(env, name, value);
        }
    }
    Ok(Value::sexpr())
}

fn head(args: Vec<Value>) -> BuiltinResult {
    let func = Builtin::Head.name();
    let mut list = single(func, args, Type::Qexpr)?;
    expect_not_empty(func, &list, 0)?;
    if let Some(cells) = list.cells_mut() {
        cells.truncate(1);
    }
    Ok(list)
}

fn tail(args: Vec<Value>) -> BuiltinResult {
    let func = Builtin::Tail.name();
    let mut list = single(func, args, Type::Qexpr)?;
    expect_not_empty(func, &list, 0)?;
    list.pop(0);
    Ok(list)
}

fn eval_list(scopes: &mut Scopes, env: EnvId, args: Vec<Value>) -> BuiltinResult {
    let list = single(Builtin::Eval.name(), args, Type::Qexpr)?;
    Ok(eval(scopes, env, list.into_sexpr()))
}

fn join(args: Vec<Value>) -> BuiltinResult {
    let func = Builtin::Join.name();
    for index in 0..args.len() {
        expect_type(func, &args, index, Type::Qexpr)?;
    }
    Ok(args.into_iter().fold(Value::qexpr(), Value::join))
}

fn arithmetic(op: Builtin, args: Vec<Value>) -> BuiltinResult {
    let func = op.name();
    let mut nums = Vec::with_capacity(args.len());
    for (index, arg) in args.into_iter().enumerate() {
        match arg {
            Value::Num(n) => nums.push(n),
            other => {
                return Err(LispError::TypeMismatch {
                    func,
                    index,
                    expected: Type::Number,
                    actual: other.kind(),
                })
            }
        }
    }
    let (&first, rest) = nums.split_first().ok_or(LispError::ArityMismatch {
        func,
        expected: 1,
        actual: 0,
    })?;
    if op == Builtin::Sub && rest.is_empty() {
        return first
            .checked_neg()
            .map(Value::Num)
            .ok_or(LispError::IntegerOverflow);
    }
    let mut acc = first;
    for &y in rest {
        let result = match op {
            Builtin::Add => acc.checked_add(y),
            Builtin::Sub => acc.checked_sub(y),
            Builtin::Mul => acc.checked_mul(y),
            Builtin::Div | Builtin::Rem if y == 0 => return Err(LispError::DivisionByZero),
            Builtin::Div => acc.checked_div(y),
            Builtin::Rem => acc.checked_rem(y),
            op => unreachable!("{:?}", op),
        };
        acc = result.ok_or(LispError::IntegerOverflow)?;
    }
    Ok(Value::Num(acc))
}

fn ordering(op: Builtin, args: Vec<Value>) -> BuiltinResult {
    let func = op.name();
    expect_count(func, &args, 2)?;
    expect_type(func, &args, 0, Type::Number)?;
    expect_type(func, &args, 1, Type::Number)?;
    let result = match (&args[0], &args[1]) {
        (Value::Num(x), Value::Num(y)) => match op {
            Builtin::Less => x < y,
            Builtin::Greater => x > y,
            Builtin::LessOrEqual => x <= y,
            Builtin::GreaterOrEqual => x >= y,
            op => unreachable!("{:?}", op),
        },
        _ => unreachable!("arguments are checked to be numbers"),
    };
    Ok(Value::Num(result as i64))
}

fn equality(op: Builtin, args: Vec<Value>) -> BuiltinResult {
    expect_count(op.name(), &args, 2)?;
    let equal = args[0] == args[1];
    Ok(Value::Num((equal == (op == Builtin::Equal)) as i64))
}

fn if_(scopes: &mut Scopes, env: EnvId, args: Vec<Value>) -> BuiltinResult {
    let func = Builtin::If.name();
    expect_count(func, &args, 3)?;
    expect_type(func, &args, 0, Type::Number)?;
    expect_type(func, &args, 1, Type::Qexpr)?;
    expect_type(func, &args, 2, Type::Qexpr)?;
    let branch = match args[0] {
        Value::Num(0) => 2,
        _ => 1,
    };
    let chosen = Value::Qexpr(args).take(branch).unwrap_or_else(Value::qexpr);
    Ok(eval(scopes, env, chosen.into_sexpr()))
}

fn load(scopes: &mut Scopes, args: Vec<Value>) -> BuiltinResult {
    let path = match single(Builtin::Load.name(), args, Type::String)? {
        Value::Str(path) => path,
        _ => unreachable!("argument is checked to be a string"),
    };
    tracing::debug!(%path, "loading file");
    let source = fs::read_to_string(Path::new(&path)).map_err(|e| LispError::Io {
        path: path.clone(),
        message: e.to_string(),
    })?;
    let result = load_source(scopes, &source);
    if let Value::Err(e) = &result {
        tracing::warn!(%path, error = %e, "load stopped");
    }
    Ok(result)
}

fn print(args: Vec<Value>) -> BuiltinResult {
    println!("{}", args.iter().format(" "));
    Ok(Value::sexpr())
}

fn error(args: Vec<Value>) -> BuiltinResult {
    match single(Builtin::Error.name(), args, Type::String)? {
        Value::Str(message) => Err(LispError::User(message)),
        _ => unreachable!("argument is checked to be a string"),
    }
}
