use std::{borrow::Cow, fmt::Display};

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected character '{token}'")]
#[diagnostic(
    code(lex::unexpected_character),
    help("only letters, digits, `+`, parentheses and whitespace are allowed")
)]
pub struct UnexpectedCharacter {
    #[source_code]
    src: NamedSource<String>,

    #[label("this character")]
    bad_bit: SourceSpan,

    pub token: char,
}

impl UnexpectedCharacter {
    pub fn line(&self) -> usize {
        line_at(self.src.inner(), self.bad_bit.offset())
    }
}

/// The 1-based line holding the byte at `offset`.
pub(crate) fn line_at(source: &str, offset: usize) -> usize {
    let before = &source.as_bytes()[..offset.min(source.len())];
    before.iter().filter(|&&b| b == b'\n').count() + 1
}

pub(crate) fn named_source(filename: Option<&str>, whole: &str) -> NamedSource<String> {
    NamedSource::new(filename.unwrap_or("<input>"), whole.to_string())
}

/// What the lexer does with a character that cannot start or extend a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UnknownChars {
    /// Skip it. The token being scanned stays open across it.
    #[default]
    Drop,
    /// Stop with an [`UnexpectedCharacter`] error.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    StartBracket,
    EndBracket,
    Name,
    Number,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::StartBracket => "start bracket",
            TokenKind::EndBracket => "end bracket",
            TokenKind::Name => "name",
            TokenKind::Number => "number",
        }
    }

    /// Whether `c` continues an open token of this kind.
    ///
    /// Digits continue names, but letters never continue numbers: `12ab`
    /// lexes as the number `12` followed by the name `ab`.
    fn extends_with(self, c: char) -> bool {
        match self {
            TokenKind::Whitespace => is_whitespace(c),
            TokenKind::Number => c.is_ascii_digit(),
            TokenKind::Name => c.is_ascii_digit() || is_name_char(c),
            TokenKind::StartBracket | TokenKind::EndBracket => false,
        }
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '+'
}

fn is_recognized(c: char) -> bool {
    matches!(c, '(' | ')') || c.is_ascii_digit() || is_whitespace(c) || is_name_char(c)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    /// Accumulated characters of a name or number. Borrowed from the source
    /// unless a dropped character split the token.
    pub text: Option<Cow<'de, str>>,
    pub span: SourceSpan,
}

impl Token<'_> {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.text {
            Some(text) => write!(f, "Token({}, {text})", self.kind.name()),
            None => write!(f, "Token({})", self.kind.name()),
        }
    }
}

pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    pub byte: usize,
    unknown: UnknownChars,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            unknown: UnknownChars::default(),
        }
    }

    pub fn unknown_chars(mut self, unknown: UnknownChars) -> Self {
        self.unknown = unknown;
        self
    }

    pub(crate) fn whole(&self) -> &'de str {
        self.whole
    }

    pub(crate) fn filename(&self) -> Option<&'de str> {
        self.filename
    }

    fn bump(&mut self, c: char) {
        self.rest = &self.rest[c.len_utf8()..];
        self.byte += c.len_utf8();
    }

    /// Scan the rest of a token whose first character starts at `start`.
    fn finish(&mut self, kind: TokenKind, start: usize) -> Token<'de> {
        let mut text = Cow::Borrowed(&self.whole[start..self.byte]);
        while let Some(c) = self.rest.chars().next() {
            let at = self.byte;
            if kind.extends_with(c) {
                self.bump(c);
                match &mut text {
                    Cow::Borrowed(s) if start + s.len() == at => {
                        *s = &self.whole[start..self.byte];
                    }
                    text => text.to_mut().push(c),
                }
            } else if !is_recognized(c) && self.unknown == UnknownChars::Drop {
                tracing::trace!(offset = at, character = %c, "dropping unrecognized character");
                self.bump(c);
            } else {
                break;
            }
        }

        let text = match kind {
            TokenKind::Name | TokenKind::Number => Some(text),
            _ => None,
        };
        Token {
            kind,
            text,
            span: SourceSpan::from(start..self.byte),
        }
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let c = self.rest.chars().next()?;
            let start = self.byte;
            self.bump(c);

            let bracket = |kind: TokenKind| Token {
                kind,
                text: None,
                span: SourceSpan::from(start..start + 1),
            };

            let kind = match c {
                '(' => TokenKind::StartBracket,
                ')' => TokenKind::EndBracket,
                '0'..='9' => TokenKind::Number,
                c if is_whitespace(c) => TokenKind::Whitespace,
                c if is_name_char(c) => TokenKind::Name,
                c => match self.unknown {
                    UnknownChars::Drop => {
                        tracing::trace!(offset = start, character = %c, "dropping unrecognized character");
                        continue;
                    }
                    UnknownChars::Reject => {
                        return Some(Err(UnexpectedCharacter {
                            src: named_source(self.filename, self.whole),
                            bad_bit: SourceSpan::from(start..self.byte),
                            token: c,
                        }
                        .into()));
                    }
                },
            };

            let token = match kind {
                TokenKind::StartBracket | TokenKind::EndBracket => bracket(kind),
                _ => self.finish(kind, start),
            };
            tracing::trace!(%token, "lexed");
            return Some(Ok(token));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(input: &str) -> Vec<(TokenKind, Option<String>)> {
        Lexer::new(None, input)
            .map(|token| {
                let token = token.expect("lexing should succeed");
                (token.kind, token.text().map(str::to_string))
            })
            .collect()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn demo_expression() {
        use TokenKind::*;
        let some = |s: &str| Some(s.to_string());
        assert_eq!(
            lex("(+ 2 (+ 30 10))"),
            vec![
                (StartBracket, None),
                (Name, some("+")),
                (Whitespace, None),
                (Number, some("2")),
                (Whitespace, None),
                (StartBracket, None),
                (Name, some("+")),
                (Whitespace, None),
                (Number, some("30")),
                (Whitespace, None),
                (Number, some("10")),
                (EndBracket, None),
                (EndBracket, None),
            ]
        );
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(
            kinds(" \t\n  x  "),
            vec![TokenKind::Whitespace, TokenKind::Name, TokenKind::Whitespace]
        );
    }

    #[test]
    fn digits_extend_names_but_letters_do_not_extend_numbers() {
        assert_eq!(lex("a1b2"), vec![(TokenKind::Name, Some("a1b2".into()))]);
        assert_eq!(
            lex("12ab"),
            vec![
                (TokenKind::Number, Some("12".into())),
                (TokenKind::Name, Some("ab".into())),
            ]
        );
        assert_eq!(lex("+a+"), vec![(TokenKind::Name, Some("+a+".into()))]);
    }

    #[test]
    fn brackets_never_extend() {
        assert_eq!(
            kinds("(()))"),
            vec![
                TokenKind::StartBracket,
                TokenKind::StartBracket,
                TokenKind::EndBracket,
                TokenKind::EndBracket,
                TokenKind::EndBracket,
            ]
        );
    }

    #[test]
    fn dropped_characters_keep_the_token_open() {
        let tokens: Vec<_> = Lexer::new(None, "ab$cd 1-2").collect::<Result<_, _>>().unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text(), Some("abcd"));
        assert!(matches!(tokens[0].text, Some(Cow::Owned(_))));
        assert_eq!(tokens[0].span, SourceSpan::from(0..5));
        assert_eq!(tokens[2].text(), Some("12"));
    }

    #[test]
    fn contiguous_tokens_borrow_the_source() {
        let token = Lexer::new(None, "hello").next().unwrap().unwrap();
        assert!(matches!(token.text, Some(Cow::Borrowed("hello"))));
    }

    #[test]
    fn reject_mode_reports_the_character() {
        let err = Lexer::new(None, "(+ 1\n 2 #)")
            .unknown_chars(UnknownChars::Reject)
            .find_map(Result::err)
            .expect("`#` should be rejected");
        let err = err
            .downcast_ref::<UnexpectedCharacter>()
            .expect("unexpected character error");
        assert_eq!(err.token, '#');
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn reject_mode_handles_multibyte_characters() {
        let err = Lexer::new(None, "(a\n\né)")
            .unknown_chars(UnknownChars::Reject)
            .find_map(Result::err)
            .expect("`é` should be rejected");
        let err = err
            .downcast_ref::<UnexpectedCharacter>()
            .expect("unexpected character error");
        assert_eq!(err.token, 'é');
        assert_eq!(err.bad_bit, SourceSpan::from(4..6));
        assert_eq!(err.line(), 3);

        let err = Lexer::new(None, "é")
            .unknown_chars(UnknownChars::Reject)
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.downcast_ref::<UnexpectedCharacter>().unwrap().line(), 1);
    }

    #[test]
    fn carriage_return_is_not_whitespace() {
        let tokens: Vec<String> = Lexer::new(None, "a\rb")
            .map(|t| t.unwrap().to_string())
            .collect();
        assert_eq!(tokens, vec!["Token(name, ab)"]);
        assert!(
            Lexer::new(None, "a\rb")
                .unknown_chars(UnknownChars::Reject)
                .any(|t| t.is_err())
        );
    }

    #[test]
    fn token_display() {
        let tokens: Vec<String> = Lexer::new(None, "(x 1")
            .map(|t| t.unwrap().to_string())
            .collect();
        assert_eq!(
            tokens,
            vec![
                "Token(start bracket)",
                "Token(name, x)",
                "Token(whitespace)",
                "Token(number, 1)",
            ]
        );
    }
}
