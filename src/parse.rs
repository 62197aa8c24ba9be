#![allow(clippy::upper_case_acronyms)]

use pest::{error::Error as PestError, iterators::Pair, Parser, RuleType};
use tracing::trace;

use crate::{error::LispError, value::Value};

pub type ParseResult<T> = Result<T, PestError<Rule>>;

fn only<R>(pair: Pair<R>) -> Pair<R>
where
    R: RuleType,
{
    pair.into_inner()
        .next()
        .expect("rule always wraps exactly one pair")
}

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
struct LispyParser;

impl From<PestError<Rule>> for LispError {
    fn from(error: PestError<Rule>) -> Self {
        LispError::Parse(error.to_string())
    }
}

/// Parses a whole program into an S-Expression of its top-level forms
pub fn parse(input: &str) -> ParseResult<Value> {
    let pairs = LispyParser::parse(Rule::program, input)?;
    Ok(Value::Sexpr(
        pairs
            .flat_map(|program| program.into_inner())
            .filter_map(read)
            .collect(),
    ))
}

/// Builds a value from a parse tree node
///
/// Comments and the end-of-input marker produce nothing.
fn read(pair: Pair<Rule>) -> Option<Value> {
    trace!(rule = ?pair.as_rule(), text = pair.as_str(), "read");
    Some(match pair.as_rule() {
        Rule::number => read_number(pair.as_str()),
        Rule::symbol => Value::sym(pair.as_str()),
        Rule::string => Value::Str(read_string(pair)),
        Rule::sexpr => Value::Sexpr(pair.into_inner().filter_map(read).collect()),
        Rule::qexpr => Value::Qexpr(pair.into_inner().filter_map(read).collect()),
        Rule::comment | Rule::EOI => return None,
        rule => unreachable!("{:?}", rule),
    })
}

fn read_number(text: &str) -> Value {
    text.parse()
        .map(Value::Num)
        .unwrap_or_else(|_| LispError::InvalidNumber(text.into()).into())
}

fn read_string(pair: Pair<Rule>) -> String {
    let mut s = String::new();
    for pair in pair.into_inner() {
        match pair.as_rule() {
            Rule::raw_string => s.push_str(pair.as_str()),
            Rule::escape => s.push(match only(pair).as_str() {
                "0" => '\0',
                "a" => '\x07',
                "b" => '\x08',
                "f" => '\x0c',
                "n" => '\n',
                "r" => '\r',
                "t" => '\t',
                "v" => '\x0b',
                "\\" => '\\',
                "'" => '\'',
                "\"" => '"',
                s => unreachable!("{}", s),
            }),
            rule => unreachable!("{:?}", rule),
        }
    }
    s
}
