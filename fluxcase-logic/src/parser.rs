//! Case Parser
//!
//! Grammar:
//!
//! ```text
//! case     := '(' args ')' '->' outcomes
//! args     := ε | IDENT | literal (',' literal)*
//! literal  := INT | DOUBLE | STRING | CHAR | 'true' | 'false' | 'null' | array
//! array    := '[' (TYPE ':')? (literal (',' literal)*)? ']'
//! TYPE     := 'I' | 'J' | 'D' | 'Z' | 'C' | 'S'
//! outcomes := outcome ('|' outcome)*
//! outcome  := '*' | WORD+
//! ```

use crate::case::{Case, Expected, ExpectedOutcome};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Lexer, Span, Token, TokenKind};
use fluxcase_core::{ArgValue, OutcomeCategory, ValueKind};

/// Parse a full case string.
pub fn parse_case(src: &str) -> Result<Case, ParseError> {
    let mut parser = Parser::new(src)?;
    let args = parser.parse_arg_list()?;
    parser.expect_arrow()?;
    let expected = parser.parse_outcomes()?;
    parser.expect_eof()?;
    Ok(Case::new(args, expected))
}

/// Parse a bare argument list, `(a, b, ...)`.
pub fn parse_args(src: &str) -> Result<Vec<ArgValue>, ParseError> {
    let mut parser = Parser::new(src)?;
    let args = parser.parse_arg_list()?;
    parser.expect_eof()?;
    Ok(args)
}

/// Parse the outcome side alone, e.g. `ok | divide by zero`.
pub fn parse_expected(src: &str) -> Result<ExpectedOutcome, ParseError> {
    let mut parser = Parser::new(src)?;
    let expected = parser.parse_outcomes()?;
    parser.expect_eof()?;
    Ok(expected)
}

/// Element constraint declared by a typed array prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayType {
    Int,
    Long,
    Double,
    Boolean,
    Char,
    Str,
}

impl ArrayType {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "I" => Some(ArrayType::Int),
            "J" => Some(ArrayType::Long),
            "D" => Some(ArrayType::Double),
            "Z" => Some(ArrayType::Boolean),
            "C" => Some(ArrayType::Char),
            "S" => Some(ArrayType::Str),
            _ => None,
        }
    }

    fn admits(self, value: &ArgValue) -> bool {
        match (self, value) {
            (ArrayType::Int, ArgValue::Integer(v)) => i32::try_from(*v).is_ok(),
            (ArrayType::Long, ArgValue::Integer(_)) => true,
            (ArrayType::Double, ArgValue::Double(_)) => true,
            (ArrayType::Boolean, ArgValue::Boolean(_)) => true,
            (ArrayType::Char, ArgValue::Char(_)) => true,
            (ArrayType::Str, ArgValue::Str(_) | ArgValue::Null) => true,
            _ => false,
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Result<Self, ParseError> {
        Ok(Self {
            src,
            tokens: Lexer::tokenize(src)?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        // tokenize always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, n: usize) -> &TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, kind: ParseErrorKind, span: Span) -> ParseError {
        let end = if span.end > span.start {
            span.end
        } else {
            self.src.len()
        };
        ParseError::new(kind, self.src, span.start, end)
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        let kind = match token.kind {
            TokenKind::Eof => ParseErrorKind::UnexpectedEnd,
            _ => ParseErrorKind::UnexpectedToken,
        };
        self.error_at(kind, token.span)
    }

    fn parse_arg_list(&mut self) -> Result<Vec<ArgValue>, ParseError> {
        let open = self.bump();
        if open.kind != TokenKind::LParen {
            return Err(self.unexpected(&open));
        }

        // `()` or a lone placeholder identifier
        if self.peek().kind == TokenKind::RParen {
            self.bump();
            return Ok(Vec::new());
        }
        if let TokenKind::Ident(name) = &self.peek().kind {
            if !is_keyword(name) && *self.peek_kind_at(1) == TokenKind::RParen {
                self.bump();
                self.bump();
                return Ok(Vec::new());
            }
        }

        let mut args = Vec::new();
        loop {
            args.push(self.parse_literal()?);
            let next = self.bump();
            match next.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => return Ok(args),
                TokenKind::Eof => {
                    return Err(self.error_at(
                        ParseErrorKind::UnbalancedParens,
                        Span {
                            start: open.span.start,
                            end: self.src.len(),
                        },
                    ));
                }
                _ => return Err(self.unexpected(&next)),
            }
        }
    }

    fn parse_literal(&mut self) -> Result<ArgValue, ParseError> {
        let token = self.bump();
        match token.kind {
            TokenKind::Integer(v) => Ok(ArgValue::Integer(v)),
            TokenKind::Double(v) => Ok(ArgValue::Double(v)),
            TokenKind::Str(s) => Ok(ArgValue::Str(s)),
            TokenKind::Char(c) => Ok(ArgValue::Char(c)),
            TokenKind::Ident(ref name) => match name.as_str() {
                "true" => Ok(ArgValue::Boolean(true)),
                "false" => Ok(ArgValue::Boolean(false)),
                "null" => Ok(ArgValue::Null),
                _ => Err(self.error_at(ParseErrorKind::BareIdentifier, token.span)),
            },
            TokenKind::LBracket => self.parse_array(token.span),
            TokenKind::LParen | TokenKind::RParen => {
                Err(self.error_at(ParseErrorKind::UnbalancedParens, token.span))
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    fn parse_array(&mut self, open: Span) -> Result<ArgValue, ParseError> {
        let mut declared = None;
        if let TokenKind::Ident(prefix) = &self.peek().kind {
            if *self.peek_kind_at(1) == TokenKind::Colon {
                let prefix_span = self.peek().span;
                declared = Some(
                    ArrayType::from_prefix(prefix)
                        .ok_or_else(|| self.error_at(ParseErrorKind::BadArrayType, prefix_span))?,
                );
                self.bump();
                self.bump();
            }
        }

        let mut items = Vec::new();
        let mut spans = Vec::new();
        if self.peek().kind == TokenKind::RBracket {
            self.bump();
        } else {
            loop {
                let start = self.peek().span;
                items.push(self.parse_literal()?);
                spans.push(start);
                let next = self.bump();
                match next.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RBracket => break,
                    TokenKind::Eof => {
                        return Err(self.error_at(
                            ParseErrorKind::UnbalancedBrackets,
                            Span {
                                start: open.start,
                                end: self.src.len(),
                            },
                        ));
                    }
                    _ => return Err(self.unexpected(&next)),
                }
            }
        }

        let offending = match declared {
            Some(ty) => items.iter().position(|item| !ty.admits(item)),
            None => first_heterogeneous(&items),
        };
        if let Some(i) = offending {
            return Err(self.error_at(ParseErrorKind::MixedArray, spans[i]));
        }

        Ok(ArgValue::Array(items))
    }

    fn expect_arrow(&mut self) -> Result<(), ParseError> {
        let token = self.bump();
        match token.kind {
            TokenKind::Arrow => Ok(()),
            TokenKind::RParen => Err(self.error_at(ParseErrorKind::UnbalancedParens, token.span)),
            _ => Err(self.error_at(ParseErrorKind::MissingArrow, token.span)),
        }
    }

    fn parse_outcomes(&mut self) -> Result<ExpectedOutcome, ParseError> {
        let mut expected = ExpectedOutcome::default();
        loop {
            expected.insert(self.parse_outcome()?);
            if self.peek().kind == TokenKind::Pipe {
                self.bump();
            } else {
                return Ok(expected);
            }
        }
    }

    fn parse_outcome(&mut self) -> Result<Expected, ParseError> {
        let first = self.peek().clone();
        if first.kind == TokenKind::Star {
            self.bump();
            return Ok(Expected::NonTermination);
        }

        let mut words = Vec::new();
        let mut end = first.span.end;
        while let TokenKind::Ident(word) = &self.peek().kind {
            words.push(word.clone());
            end = self.peek().span.end;
            self.bump();
        }
        if words.is_empty() {
            return Err(self.error_at(ParseErrorKind::MissingOutcome, first.span));
        }

        let phrase = words.join(" ");
        OutcomeCategory::from_phrase(&phrase)
            .map(Expected::Category)
            .ok_or_else(|| {
                self.error_at(
                    ParseErrorKind::UnknownOutcome,
                    Span {
                        start: first.span.start,
                        end,
                    },
                )
            })
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        let token = self.bump();
        match token.kind {
            TokenKind::Eof => Ok(()),
            TokenKind::RParen => Err(self.error_at(ParseErrorKind::UnbalancedParens, token.span)),
            _ => Err(self.error_at(
                ParseErrorKind::TrailingInput,
                Span {
                    start: token.span.start,
                    end: self.src.len(),
                },
            )),
        }
    }
}

fn is_keyword(name: &str) -> bool {
    matches!(name, "true" | "false" | "null")
}

/// Index of the first element breaking homogeneity, if any.
///
/// `null` is admitted alongside reference kinds (strings, arrays).
fn first_heterogeneous(items: &[ArgValue]) -> Option<usize> {
    let kind = items.iter().map(ArgValue::kind).find(|k| *k != ValueKind::Null)?;
    items.iter().position(|item| match item.kind() {
        ValueKind::Null => !kind.is_reference(),
        other => other != kind,
    })
}
