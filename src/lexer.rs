//! Converts sequences of characters into sequences of tokens.
//!
//! The [`tokenize`] function is the main entry point.
//! It produces a [`Vec<FullToken>`], which can be fed into the parser.
//!
//! The stream always ends with one [`Token::Eof`].

pub mod token;

use std::collections::VecDeque;
use std::fmt::Display;

use crate::err::{Cursor, CursorRange, FiaErr, FullFiaErr};
use token::{FullToken, Keyword, Token, DE_MAP, OP_MAP};

/// Lex a string and return the tokens in it.
pub fn tokenize(input: &str) -> LexResult<Vec<FullToken>> {
    Lexer::new(input).lex()
}

/// Errors that can occur in the lexing process.
#[derive(PartialEq, Eq, Debug)]
pub enum LexErr {
    /// Character does not exist in F-IA
    UnknownChar(char),

    /// A string literal ran into a line break or the end of the file
    /// before its closing quote
    UnterminatedString,

    /// A run of punctuation did not form a known operator
    UnknownOp(String)
}

/// A [`Result`] type for operations in the lexing process.
pub type LexResult<T> = Result<T, FullLexErr>;
type FullLexErr = FullFiaErr<LexErr>;

impl FiaErr for LexErr {
    fn err_name(&self) -> &'static str {
        "erreur de syntaxe"
    }
}

impl Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::UnknownChar(c)     => write!(f, "caractère inconnu: '{c}'"),
            LexErr::UnterminatedString => f.write_str("chaîne de caractères non terminée"),
            LexErr::UnknownOp(op)      => write!(f, "opérateur inconnu: '{op}'"),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum CharClass {
    Alpha,
    Numeric,
    Underscore,
    Quote,
    Semi,
    Punct,
    Whitespace
}

impl CharClass {
    fn of(c: char) -> Option<Self> {
        if c.is_alphabetic()             { Some(Self::Alpha) }
        else if c.is_ascii_digit()       { Some(Self::Numeric) }
        else if c == '_'                 { Some(Self::Underscore) }
        else if c == '"' || c == '\''    { Some(Self::Quote) }
        else if c == ';'                 { Some(Self::Semi) }
        else if c.is_whitespace()        { Some(Self::Whitespace) }
        else if c.is_ascii_punctuation() { Some(Self::Punct) }
        else { None }
    }

    fn of_or_err(c: char, pt: Cursor) -> LexResult<Self> {
        Self::of(c).ok_or_else(|| LexErr::UnknownChar(c).at(pt))
    }
}

/// The struct that lexes a string into tokens.
struct Lexer {
    tokens: Vec<FullToken>,
    cursor: Cursor,
    _current: Option<Cursor>,
    token_start: Cursor,
    remaining: VecDeque<char>
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            tokens: vec![],
            cursor: (0, 0),
            _current: None,
            token_start: (0, 0),
            remaining: input.chars().collect()
        }
    }

    fn peek(&self) -> Option<char> {
        self.remaining.front().copied()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining.get(n).copied()
    }

    /// Consume the next character, keeping the cursor in sync.
    fn next(&mut self) -> Option<char> {
        let mc = self.remaining.pop_front();

        if let Some(c) = mc {
            self._current = Some(self.cursor);

            if c == '\n' {
                self.cursor = (self.cursor.0 + 1, 0);
            } else {
                self.cursor.1 += 1;
            }
        }

        mc
    }

    /// The range of the token currently being read,
    /// from its start to the last consumed character.
    fn token_range(&self) -> CursorRange {
        let end = self._current.unwrap_or(self.token_start);
        self.token_start ..= end
    }

    fn push_token(&mut self, tt: Token) {
        let loc = self.token_range();
        self.tokens.push(FullToken::new(tt, loc));
    }

    fn lex(mut self) -> LexResult<Vec<FullToken>> {
        while let Some(c) = self.peek() {
            // comments run to the end of the line
            if c == '#' || (c == '/' && self.peek_nth(1) == Some('/')) {
                self.skip_line();
                continue;
            }

            self.token_start = self.cursor;
            match CharClass::of_or_err(c, self.cursor)? {
                CharClass::Alpha | CharClass::Underscore => self.push_ident(),
                CharClass::Numeric => self.push_num(),
                CharClass::Quote   => self.push_str()?,
                CharClass::Punct   => self.push_punct()?,
                CharClass::Semi => {
                    self.next();
                    self.push_token(Token::LineSep);
                },
                CharClass::Whitespace => {
                    self.next();
                },
            }
        }

        let eof = self.cursor;
        self.tokens.push(FullToken::new(Token::Eof, eof..=eof));
        Ok(self.tokens)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.next() {
            if c == '\n' { break; }
        }
    }

    /// Read an identifier or keyword.
    fn push_ident(&mut self) {
        let mut buf = String::new();

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                buf.push(c);
                self.next();
            } else {
                break;
            }
        }

        let tt = Keyword::get_kw(&buf)
            .unwrap_or(Token::Ident(buf));
        self.push_token(tt);
    }

    /// Read a numeric literal.
    ///
    /// A dot is part of the number only if a digit follows it,
    /// so `2.membre` still lexes as `2`, `.`, `membre`.
    fn push_num(&mut self) {
        let mut buf = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                buf.push(c);
                self.next();
            } else {
                break;
            }
        }

        let dot_starts_frac = self.peek() == Some('.')
            && matches!(self.peek_nth(1), Some(c) if c.is_ascii_digit());
        if dot_starts_frac {
            buf.push('.');
            self.next();

            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    buf.push(c);
                    self.next();
                } else {
                    break;
                }
            }
        }

        self.push_token(Token::Numeric(buf));
    }

    /// Read a string literal. Either quote character opens one,
    /// and only the same character closes it. There are no escapes.
    fn push_str(&mut self) -> LexResult<()> {
        let Some(qt) = self.next() else {
            return Err(LexErr::UnterminatedString.at(self.cursor));
        };

        let mut buf = String::new();
        loop {
            match self.next() {
                Some(c) if c == qt => break,
                Some('\n') | None => {
                    return Err(LexErr::UnterminatedString.at_range(self.token_start..));
                },
                Some(c) => buf.push(c),
            }
        }

        self.push_token(Token::Str(buf));
        Ok(())
    }

    /// Read an operator or delimiter.
    ///
    /// Longest match first, so `==` lexes as one token and not two `=`.
    fn push_punct(&mut self) -> LexResult<()> {
        let mut buf = String::new();
        for i in 0..2 {
            match self.peek_nth(i) {
                Some(c) if CharClass::of(c) == Some(CharClass::Punct) => buf.push(c),
                _ => break
            }
        }

        while !buf.is_empty() {
            let mtt = OP_MAP.get(&*buf)
                .or_else(|| DE_MAP.get(&*buf))
                .cloned();

            if let Some(tt) = mtt {
                for _ in buf.chars() {
                    self.next();
                }
                self.push_token(tt);
                return Ok(());
            }

            buf.pop();
        }

        // nothing matched, report the whole punctuation run
        let mut op = String::new();
        while let Some(c) = self.peek() {
            if CharClass::of(c) == Some(CharClass::Punct) {
                op.push(c);
                self.next();
            } else {
                break;
            }
        }
        Err(LexErr::UnknownOp(op).at_range(self.token_range()))
    }
}

#[cfg(test)]
mod tests {
    use super::token::token;
    use super::*;

    /// Asserts that the input lexes into the tokens provided,
    /// followed by the closing Eof token.
    fn assert_lex(input: &str, expected: &[Token]) {
        let result = match tokenize(input) {
            Ok(t) => t,
            Err(e) => panic!("Lexing of {input:?} failed:\n{}", e.full_msg(input)),
        };
        let tokens: Vec<_> = result.into_iter().map(|ft| ft.tt).collect();

        let mut expected = expected.to_vec();
        expected.push(Token::Eof);
        assert_eq!(expected, tokens);
    }

    fn assert_lex_fail(input: &str, expected: LexErr) {
        match tokenize(input) {
            Ok(t)  => panic!("Lexing of {input:?} unexpectedly succeeded: {t:?}"),
            Err(e) => assert_eq!(e, expected),
        }
    }

    #[test]
    fn ident_lex() {
        assert_lex("abc a_b _b ab2", &[
            Token::Ident(String::from("abc")),
            Token::Ident(String::from("a_b")),
            Token::Ident(String::from("_b")),
            Token::Ident(String::from("ab2")),
        ]);

        // accented identifiers are fine
        assert_lex("été à_jour", &[
            Token::Ident(String::from("été")),
            Token::Ident(String::from("à_jour")),
        ]);
    }

    #[test]
    fn keyword_lex() {
        assert_lex("soit x = vrai;", &[
            token![soit],
            Token::Ident(String::from("x")),
            token![=],
            token![vrai],
            token![;],
        ]);

        // keywords are exact words, `tantque` is not `tant_que`
        assert_lex("tant_que tantque", &[
            token![tant_que],
            Token::Ident(String::from("tantque")),
        ]);
    }

    #[test]
    fn num_lex() {
        assert_lex("123 1.5 0.0", &[
            Token::Numeric(String::from("123")),
            Token::Numeric(String::from("1.5")),
            Token::Numeric(String::from("0.0")),
        ]);

        // the dot only joins the number when a digit follows
        assert_lex("2.b", &[
            Token::Numeric(String::from("2")),
            token![.],
            Token::Ident(String::from("b")),
        ]);
    }

    #[test]
    fn str_lex() {
        assert_lex(r#""bonjour" 'salut'"#, &[
            Token::Str(String::from("bonjour")),
            Token::Str(String::from("salut")),
        ]);

        // one quote kind can hold the other
        assert_lex(r#""l'heure""#, &[
            Token::Str(String::from("l'heure")),
        ]);

        assert_lex_fail(r#""sans fin"#, LexErr::UnterminatedString);
        assert_lex_fail("\"sans\nfin\"", LexErr::UnterminatedString);
    }

    #[test]
    fn punct_lex() {
        assert_lex("a == b", &[
            Token::Ident(String::from("a")),
            token![==],
            Token::Ident(String::from("b")),
        ]);

        // greedy: `+=` is one token, `+ =` is two
        assert_lex("x += 1", &[
            Token::Ident(String::from("x")),
            token![+=],
            Token::Numeric(String::from("1")),
        ]);
        assert_lex("x + = 1", &[
            Token::Ident(String::from("x")),
            token![+],
            token![=],
            Token::Numeric(String::from("1")),
        ]);

        assert_lex("([{}])", &[
            token!["("],
            token!["["],
            token!["{"],
            token!["}"],
            token!["]"],
            token![")"],
        ]);

        assert_lex_fail("a ! b", LexErr::UnknownOp(String::from("!")));
    }

    #[test]
    fn comment_lex() {
        assert_lex("soit x # le reste disparaît\nsoit y", &[
            token![soit],
            Token::Ident(String::from("x")),
            token![soit],
            Token::Ident(String::from("y")),
        ]);

        assert_lex("1 // deux\n3", &[
            Token::Numeric(String::from("1")),
            Token::Numeric(String::from("3")),
        ]);

        // a lone slash is still division
        assert_lex("1 / 2", &[
            Token::Numeric(String::from("1")),
            token![/],
            Token::Numeric(String::from("2")),
        ]);
    }

    #[test]
    fn unknown_char_lex() {
        assert_lex_fail("soit € = 1", LexErr::UnknownChar('€'));
    }

    #[test]
    fn eof_positioning() {
        let tokens = tokenize("soit").unwrap();
        let last = tokens.last().unwrap();
        assert_eq!(last.tt, Token::Eof);
        assert_eq!(last.loc, (0, 4)..=(0, 4));
    }
}
