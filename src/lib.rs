//! A reader and evaluator for a tiny S-expression language.
//!
//! Source text goes through two strictly separate phases. [`Parser`] (on top
//! of [`Lexer`]) turns it into a tree of [`Value`]s. [`Evaluator`] then walks
//! that tree, dispatching names in head position to its builtin table.
//!
//! ```
//! use sexpr_interpreter::{Value, eval_str};
//!
//! assert_eq!(eval_str("(+ 2 (+ 30 10))").unwrap(), Value::Int(42));
//! ```

pub mod builtins;
pub mod eval;
pub mod lex;
pub mod parse;
mod stack;
pub mod value;

pub use builtins::{Builtin, Builtins};
pub use eval::{EvalError, Evaluator};
pub use lex::{Lexer, Token, TokenKind, UnknownChars};
pub use parse::{ParseMode, Parser};
pub use value::{TypeTag, Value};

/// The expression evaluated when none is given.
pub const DEMO_SOURCE: &str = "(+ 2 (+ 30 10))";

/// Parse `source` with the default options.
pub fn read(source: &str) -> miette::Result<Value> {
    Parser::new(None, source).parse()
}

pub fn read_with(source: &str, unknown: UnknownChars, mode: ParseMode) -> miette::Result<Value> {
    Parser::new(None, source)
        .unknown_chars(unknown)
        .mode(mode)
        .parse()
}

/// Parse `source` and evaluate the resulting tree with the standard builtins.
pub fn eval_str(source: &str) -> miette::Result<Value> {
    let tree = read(source)?;
    Ok(Evaluator::default().eval(&tree)?)
}
