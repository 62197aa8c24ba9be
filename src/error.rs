use crate::value::Type;

/// Every error the language can produce.
///
/// Errors are ordinary values: builtins and the evaluator return them inside
/// [`Value::Err`](crate::value::Value::Err) and they propagate by data flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LispError {
    #[error("unbound symbol `{0}`")]
    UnboundSymbol(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error(
        "function '{func}' passed incorrect type for argument `{index}`. Got `{actual}`, expected `{expected}`."
    )]
    TypeMismatch {
        func: &'static str,
        index: usize,
        expected: Type,
        actual: Type,
    },
    #[error(
        "function '{func}' passed incorrect number of arguments. Got `{actual}`, expected `{expected}`."
    )]
    ArityMismatch {
        func: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("function '{func}' passed `{{}}` for argument `{index}`.")]
    EmptyList { func: &'static str, index: usize },
    #[error("function format invalid. Symbol '&' not followed by single symbol.")]
    InvalidVariadic,
    #[error("function passed too many arguments. Got {given}, expected {total}.")]
    TooManyArguments { given: usize, total: usize },
    #[error("S-Expression starting with incorrect type. Got `{0}`, expected `Function`.")]
    NotAFunction(Type),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("function '{func}' cannot define non-symbol. Got `{actual}`, expected `Symbol`.")]
    NonSymbol { func: &'static str, actual: Type },
    #[error(
        "function '{func}' cannot define an unmatched number of values to symbols. Got {values}, expected {symbols}."
    )]
    UnmatchedDefinition {
        func: &'static str,
        symbols: usize,
        values: usize,
    },
    #[error("could not parse input: {0}")]
    Parse(String),
    #[error("could not load `{path}`: {message}")]
    Io { path: String, message: String },
    #[error("{0}")]
    User(String),
}
