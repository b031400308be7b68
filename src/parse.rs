use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{
    Lexer,
    lex::{TokenKind, UnknownChars, line_at, named_source},
    value::Value,
};

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected `)` with no matching `(`")]
#[diagnostic(
    code(parse::unexpected_close_bracket),
    help("remove this `)` or add a matching `(` before it")
)]
pub struct UnexpectedCloseBracket {
    #[source_code]
    src: NamedSource<String>,

    #[label("nothing to close here")]
    bad_bit: SourceSpan,
}

impl UnexpectedCloseBracket {
    pub fn line(&self) -> usize {
        line_at(self.src.inner(), self.bad_bit.offset())
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected end of input: {missing} unclosed `(`")]
#[diagnostic(
    code(parse::unclosed_bracket),
    help("add {missing} `)` at the end of the input")
)]
pub struct UnclosedBracket {
    #[source_code]
    src: NamedSource<String>,

    #[label("this `(` is never closed")]
    open: SourceSpan,

    pub missing: usize,
}

impl UnclosedBracket {
    pub fn line(&self) -> usize {
        line_at(self.src.inner(), self.open.offset())
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("Bad conversion: `{literal}` is not an integer")]
#[diagnostic(
    code(parse::invalid_integer),
    help("integers must fit in a signed 64-bit value")
)]
pub struct InvalidInteger {
    #[source_code]
    src: NamedSource<String>,

    #[label("this numeric literal")]
    bad_bit: SourceSpan,

    pub literal: String,
}

impl InvalidInteger {
    pub fn line(&self) -> usize {
        line_at(self.src.inner(), self.bad_bit.offset())
    }
}

/// How the parser reacts to malformed structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ParseMode {
    /// Fail on the first stray `)`, on `(` left open at the end and on
    /// integer literals that do not fit.
    #[default]
    Strict,
    /// Warn and keep going: stray `)` are ignored, open lists are closed at
    /// the end of input and bad integers become 0.
    Lenient,
}

struct Frame {
    open: usize,
    children: Vec<Value>,
}

/// The stack of lists still waiting for their `)`, above the root list.
#[derive(Default)]
struct TreeBuilder {
    root: Vec<Value>,
    open: Vec<Frame>,
}

impl TreeBuilder {
    fn push(&mut self, value: Value) {
        match self.open.last_mut() {
            Some(frame) => frame.children.push(value),
            None => self.root.push(value),
        }
    }

    fn open(&mut self, offset: usize) {
        self.open.push(Frame {
            open: offset,
            children: Vec::new(),
        });
    }

    /// Close the innermost open list. Returns `false` if only the root is left.
    fn close(&mut self) -> bool {
        match self.open.pop() {
            Some(frame) => {
                self.push(Value::List(frame.children));
                true
            }
            None => false,
        }
    }

    fn depth(&self) -> usize {
        self.open.len()
    }

    fn innermost_open(&self) -> Option<usize> {
        self.open.last().map(|frame| frame.open)
    }

    fn finish(mut self) -> Value {
        while self.close() {}
        Value::List(self.root)
    }
}

pub struct Parser<'de> {
    lexer: Lexer<'de>,
    mode: ParseMode,
}

impl<'de> Parser<'de> {
    pub fn new(filename: Option<&'de str>, whole: &'de str) -> Self {
        Parser {
            lexer: Lexer::new(filename, whole),
            mode: ParseMode::default(),
        }
    }

    pub fn mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn unknown_chars(mut self, unknown: UnknownChars) -> Self {
        self.lexer = self.lexer.unknown_chars(unknown);
        self
    }

    fn source(&self) -> NamedSource<String> {
        named_source(self.lexer.filename(), self.lexer.whole())
    }

    /// Build the tree for the whole input.
    ///
    /// The result is always a root list holding the top-level expressions in
    /// source order, so `(+ 1 2)` parses to `((+ 1 2))`.
    pub fn parse(mut self) -> Result<Value, Error> {
        let mut tree = TreeBuilder::default();

        while let Some(token) = self.lexer.next() {
            let token = token?;
            match token.kind {
                TokenKind::Whitespace => {}
                TokenKind::StartBracket => tree.open(token.span.offset()),
                TokenKind::EndBracket => {
                    if !tree.close() {
                        match self.mode {
                            ParseMode::Strict => {
                                return Err(UnexpectedCloseBracket {
                                    src: self.source(),
                                    bad_bit: token.span,
                                }
                                .into());
                            }
                            ParseMode::Lenient => {
                                tracing::warn!(
                                    offset = token.span.offset(),
                                    "ignoring `)` with no matching `(`"
                                );
                            }
                        }
                    }
                }
                TokenKind::Name => {
                    let name = token.text.unwrap_or_default().into_owned();
                    tree.push(Value::Name(name));
                }
                TokenKind::Number => {
                    let literal = token.text.unwrap_or_default();
                    let n = match literal.parse::<i64>() {
                        Ok(n) => n,
                        Err(e) => match self.mode {
                            ParseMode::Strict => {
                                return Err(InvalidInteger {
                                    src: self.source(),
                                    bad_bit: token.span,
                                    literal: literal.into_owned(),
                                }
                                .into());
                            }
                            ParseMode::Lenient => {
                                tracing::warn!(%literal, error = %e, "bad integer literal, using 0");
                                0
                            }
                        },
                    };
                    tree.push(Value::Int(n));
                }
            }
        }

        if let Some(open) = tree.innermost_open() {
            let missing = tree.depth();
            match self.mode {
                ParseMode::Strict => {
                    return Err(UnclosedBracket {
                        src: self.source(),
                        open: SourceSpan::from(open..open + 1),
                        missing,
                    }
                    .into());
                }
                ParseMode::Lenient => {
                    tracing::warn!(missing, "closing lists left open at end of input");
                }
            }
        }

        let root = tree.finish();
        tracing::debug!(top_level = root.as_list().map_or(0, |items| items.len()), "built tree");
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{int, list, name};
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Result<Value, Error> {
        Parser::new(None, input).parse()
    }

    fn parse_lenient(input: &str) -> Value {
        Parser::new(None, input)
            .mode(ParseMode::Lenient)
            .parse()
            .expect("lenient parsing never fails on structure")
    }

    #[test]
    fn demo_expression() {
        assert_eq!(
            parse("(+ 2 (+ 30 10))").unwrap(),
            list([list([
                name("+"),
                int(2),
                list([name("+"), int(30), int(10)]),
            ])])
        );
    }

    #[test]
    fn top_level_siblings_stay_in_order() {
        assert_eq!(
            parse("a (b) 3 ()").unwrap(),
            list([name("a"), list([name("b")]), int(3), list([])])
        );
        assert_eq!(parse("").unwrap(), list([]));
        assert_eq!(parse("   ").unwrap(), list([]));
    }

    #[test]
    fn stray_close_bracket_fails_fast() {
        let err = parse("(+ 1 2))").unwrap_err();
        let err = err
            .downcast_ref::<UnexpectedCloseBracket>()
            .expect("unexpected close bracket");
        assert_eq!(err.bad_bit, SourceSpan::from(7..8));
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn unclosed_bracket_points_at_the_innermost_open() {
        let err = parse("(+ 1\n  (+ 2").unwrap_err();
        let err = err.downcast_ref::<UnclosedBracket>().expect("unclosed bracket");
        assert_eq!(err.missing, 2);
        assert_eq!(err.open, SourceSpan::from(7..8));
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn lenient_mode_builds_a_best_effort_tree() {
        assert_eq!(
            parse_lenient("(+ 1 2"),
            list([list([name("+"), int(1), int(2)])])
        );
        assert_eq!(
            parse_lenient("(+ 1 2)) 3"),
            list([list([name("+"), int(1), int(2)]), int(3)])
        );
    }

    #[test]
    fn oversized_integers() {
        let input = "(+ 99999999999999999999 1)";
        let err = parse(input).unwrap_err();
        let err = err.downcast_ref::<InvalidInteger>().expect("invalid integer");
        assert_eq!(err.literal, "99999999999999999999");

        assert_eq!(
            parse_lenient(input),
            list([list([name("+"), int(0), int(1)])])
        );
    }

    #[test]
    fn names_with_digits() {
        assert_eq!(
            parse("(x1 2y)").unwrap(),
            list([list([name("x1"), int(2), name("y")])])
        );
    }

    #[test]
    fn unknown_characters_pass_through_the_parser_config() {
        assert_eq!(parse("(a,b)").unwrap(), list([list([name("ab")])]));
        assert!(
            Parser::new(None, "(a,b)")
                .unknown_chars(UnknownChars::Reject)
                .parse()
                .is_err()
        );
    }

    #[test]
    fn deep_nesting() {
        let depth = 1000;
        let input = format!("{}7{}", "(".repeat(depth), ")".repeat(depth));
        let mut expected = int(7);
        for _ in 0..depth {
            expected = list([expected]);
        }
        assert_eq!(parse(&input).unwrap(), list([expected]));
    }
}
