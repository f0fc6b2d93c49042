//! Case Lexer
//!
//! Splits case text into tokens with byte spans. Whitespace separates tokens
//! and is otherwise discarded, which is what normalises runs of blanks inside
//! outcome phrases.

use crate::error::{ParseError, ParseErrorKind};

/// Byte range into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    /// `->`
    Arrow,
    /// `|`
    Pipe,
    /// `*`
    Star,
    Integer(i64),
    Double(f64),
    Str(String),
    Char(char),
    Ident(String),
    Eof,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    /// Tokenize the whole input, ending with `Eof`.
    pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, kind: ParseErrorKind, start: usize) -> ParseError {
        ParseError::new(kind, self.src, start, self.pos.max(start + 1))
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }

        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span { start, end: start },
            });
        };

        let kind = match c {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            ',' => self.single(TokenKind::Comma),
            ':' => self.single(TokenKind::Colon),
            '|' => self.single(TokenKind::Pipe),
            '*' => self.single(TokenKind::Star),
            '"' => self.lex_string()?,
            '\'' => self.lex_char()?,
            '-' if self.peek_at(1) == Some('>') => {
                self.pos += 2;
                TokenKind::Arrow
            }
            '-' | '+' | '.' | '0'..='9' => self.lex_number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_ident(),
            _ => {
                self.advance();
                return Err(self.error(ParseErrorKind::UnexpectedChar, start));
            }
        };

        Ok(Token {
            kind,
            span: Span {
                start,
                end: self.pos,
            },
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn lex_string(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.advance();
        let body_start = self.pos;
        while let Some(c) = self.peek() {
            if c == '"' {
                let body = self.src[body_start..self.pos].to_string();
                self.advance();
                return Ok(TokenKind::Str(body));
            }
            self.advance();
        }
        Err(self.error(ParseErrorKind::UnterminatedString, start))
    }

    fn lex_char(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.advance();
        let Some(c) = self.advance() else {
            return Err(self.error(ParseErrorKind::UnterminatedChar, start));
        };
        if self.peek() != Some('\'') {
            return Err(self.error(ParseErrorKind::UnterminatedChar, start));
        }
        self.advance();
        Ok(TokenKind::Char(c))
    }

    fn eat_digits(&mut self) -> usize {
        let begin = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        self.pos - begin
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.advance();
        }

        let int_digits = self.eat_digits();
        let mut is_double = false;
        let mut frac_digits = 0;

        if self.peek() == Some('.') {
            is_double = true;
            self.advance();
            frac_digits = self.eat_digits();
        }
        if int_digits == 0 && frac_digits == 0 {
            return Err(self.error(ParseErrorKind::InvalidNumber, start));
        }

        if is_double && matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('-' | '+')) {
                self.advance();
            }
            if self.eat_digits() == 0 {
                return Err(self.error(ParseErrorKind::InvalidNumber, start));
            }
        }

        if self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.advance();
            return Err(self.error(ParseErrorKind::InvalidNumber, start));
        }

        let text = &self.src[start..self.pos];
        if is_double {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(ParseErrorKind::InvalidNumber, start))?;
            if !value.is_finite() {
                return Err(self.error(ParseErrorKind::DoubleOverflow, start));
            }
            Ok(TokenKind::Double(value))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Integer)
                .map_err(|_| self.error(ParseErrorKind::IntegerOverflow, start))
        }
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        TokenKind::Ident(self.src[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn err(src: &str) -> ParseError {
        Lexer::tokenize(src).unwrap_err()
    }

    #[test]
    fn test_lex_case() {
        assert_eq!(
            kinds("(\"hello\", -5, 'l') -> out of bounds"),
            vec![
                TokenKind::LParen,
                TokenKind::Str("hello".to_string()),
                TokenKind::Comma,
                TokenKind::Integer(-5),
                TokenKind::Comma,
                TokenKind::Char('l'),
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::Ident("out".to_string()),
                TokenKind::Ident("of".to_string()),
                TokenKind::Ident("bounds".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_doubles() {
        assert_eq!(kinds("1.5")[0], TokenKind::Double(1.5));
        assert_eq!(kinds("-0.25")[0], TokenKind::Double(-0.25));
        assert_eq!(kinds("2.")[0], TokenKind::Double(2.0));
        assert_eq!(kinds(".5")[0], TokenKind::Double(0.5));
        assert_eq!(kinds("1.0e3")[0], TokenKind::Double(1000.0));
    }

    #[test]
    fn test_lex_char_quote() {
        assert_eq!(kinds("'''")[0], TokenKind::Char('\''));
        assert_eq!(kinds("' '")[0], TokenKind::Char(' '));
    }

    #[test]
    fn test_lex_errors() {
        assert_eq!(err("\"abc").kind, ParseErrorKind::UnterminatedString);
        assert_eq!(err("'ab'").kind, ParseErrorKind::UnterminatedChar);
        assert_eq!(err("12abc").kind, ParseErrorKind::InvalidNumber);
        assert_eq!(err("99999999999999999999").kind, ParseErrorKind::IntegerOverflow);
        assert_eq!(err("1.0e999").kind, ParseErrorKind::DoubleOverflow);
        let e = err("(1) # ok");
        assert_eq!(e.kind, ParseErrorKind::UnexpectedChar);
        assert_eq!(e.offset, 4);
        assert_eq!(e.fragment, "#");
    }
}
