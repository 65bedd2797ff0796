// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hand-written scanner producing a trivia-preserving token stream.

use super::token::{Span, Token, TokenKind};

/// Tokenizer over a source string.
///
/// Every character of the source lands in exactly one token, either as
/// leading trivia (whitespace) or as token text; trailing whitespace is the
/// trivia of the final [`TokenKind::Empty`] token. Characters no class
/// accepts become single-character [`TokenKind::Error`] tokens rather than
/// aborting the scan.
#[derive(Debug)]
pub struct Lexer<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer at the start of `source`.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    /// Tokenizes a whole source string, ending with the `Empty` token.
    #[must_use]
    pub fn tokenize(source: &'a str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Empty;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> Token {
        let trivia_start = self.position;
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c);
            } else {
                break;
            }
        }
        let trivia = self.source[trivia_start..self.position].to_owned();
        let start = self.position;

        let Some(c) = self.peek() else {
            return self.token(TokenKind::Empty, trivia, start);
        };

        let kind = match c {
            '0'..='9' => self.scan_number(),
            'a'..='z' | 'A'..='Z' | '_' => self.scan_identifier(),
            '+' | '-' | '*' | '/' | '%' => {
                self.advance(c);
                TokenKind::Operator
            }
            '(' => {
                self.advance(c);
                TokenKind::LeftParen
            }
            ')' => {
                self.advance(c);
                TokenKind::RightParen
            }
            ',' => {
                self.advance(c);
                TokenKind::Comma
            }
            other => {
                self.advance(other);
                TokenKind::Error
            }
        };
        self.token(kind, trivia, start)
    }

    fn token(&self, kind: TokenKind, trivia: String, start: usize) -> Token {
        Token {
            kind,
            text: self.source[start..self.position].to_owned(),
            trivia,
            span: Span {
                start,
                end: self.position,
            },
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        self.scan_digits();
        let mut kind = TokenKind::Int;

        // Fraction, only when a digit follows the dot.
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance('.');
            self.scan_digits();
            kind = TokenKind::Double;
        }

        // Exponent, only when a digit (possibly signed) follows the marker.
        if let Some(marker @ ('e' | 'E')) = self.peek() {
            let after = self.peek_second();
            let signed_digit = matches!(after, Some('+' | '-'))
                && self.peek_third().is_some_and(|c| c.is_ascii_digit());
            if after.is_some_and(|c| c.is_ascii_digit()) || signed_digit {
                self.advance(marker);
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    self.advance(sign);
                }
                self.scan_digits();
                kind = TokenKind::Double;
            }
        }
        kind
    }

    fn scan_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance(c);
            } else {
                break;
            }
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance(c);
            } else {
                break;
            }
        }
        TokenKind::Identifier
    }

    fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn peek_third(&self) -> Option<char> {
        let mut chars = self.source[self.position..].chars();
        chars.next();
        chars.next();
        chars.next()
    }

    fn advance(&mut self, c: char) {
        self.position += c.len_utf8();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn scans_numbers() {
        assert_eq!(kinds("42"), vec![TokenKind::Int, TokenKind::Empty]);
        assert_eq!(kinds("1_000"), vec![TokenKind::Int, TokenKind::Empty]);
        assert_eq!(kinds("3.25"), vec![TokenKind::Double, TokenKind::Empty]);
        assert_eq!(kinds("1e9"), vec![TokenKind::Double, TokenKind::Empty]);
        assert_eq!(kinds("1.5e-3"), vec![TokenKind::Double, TokenKind::Empty]);
    }

    #[test]
    fn dot_without_digit_is_not_a_fraction() {
        assert_eq!(
            kinds("1."),
            vec![TokenKind::Int, TokenKind::Error, TokenKind::Empty]
        );
    }

    #[test]
    fn exponent_marker_without_digits_stays_separate() {
        // `1e` scans as an int followed by an identifier.
        assert_eq!(
            kinds("1e"),
            vec![TokenKind::Int, TokenKind::Identifier, TokenKind::Empty]
        );
    }

    #[test]
    fn scans_identifiers_and_operators() {
        assert_eq!(
            kinds("rate * _x1"),
            vec![
                TokenKind::Identifier,
                TokenKind::Operator,
                TokenKind::Identifier,
                TokenKind::Empty
            ]
        );
    }

    #[test]
    fn unexpected_character_becomes_error_token() {
        assert_eq!(
            kinds("a $ b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Error,
                TokenKind::Identifier,
                TokenKind::Empty
            ]
        );
    }

    #[test]
    fn every_character_lands_in_a_token() {
        let source = "  a +\t2 * ( b )  ";
        let reassembled: String = Lexer::tokenize(source)
            .iter()
            .map(Token::full_text)
            .collect();
        assert_eq!(reassembled, source);
    }
}
