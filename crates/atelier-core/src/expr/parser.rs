// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recursive-descent parser for the arithmetic expression grammar.
//!
//! ```text
//! expression → term
//! term       → factor ( ("+" | "-") factor )*
//! factor     → unary  ( ("*" | "/" | "%") unary )*
//! unary      → "-" unary | primary
//! primary    → number | identifier ( "(" arguments? ")" )? | "(" expression ")"
//! arguments  → expression ( "," expression )*
//! ```
//!
//! Binary operators associate left-to-right, unary minus is
//! right-associative. Parsing stops at the first error; there is no
//! recovery.

use thiserror::Error;

use super::cst::{Cst, CstArgument, CstExpression};
use super::lexer::Lexer;
use super::token::{Token, TokenKind};

/// Syntax errors, each carrying the byte offset of the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// An expression was required and something else was found.
    #[error("expression expected at offset {position}")]
    ExpressionExpected {
        /// Byte offset of the offending token.
        position: usize,
    },
    /// An opened parenthesis was never closed.
    #[error("missing right parenthesis at offset {position}")]
    MissingRightParenthesis {
        /// Byte offset where the parenthesis was expected.
        position: usize,
    },
    /// A token that no production accepts at this point.
    #[error("unexpected token '{text}' at offset {position}")]
    UnexpectedToken {
        /// Literal text of the offending token.
        text: String,
        /// Byte offset of the offending token.
        position: usize,
    },
}

/// Parses a source string into a concrete syntax tree.
///
/// # Errors
/// Returns the first [`SyntaxError`] encountered; nothing is recovered.
pub fn parse(source: &str) -> Result<Cst, SyntaxError> {
    let tokens = Lexer::tokenize(source);
    let mut parser = Parser { tokens, index: 0 };
    let root = parser.expression()?;
    let end = parser.current().clone();
    if end.kind != TokenKind::Empty {
        return Err(SyntaxError::UnexpectedToken {
            text: end.text,
            position: end.span.start,
        });
    }
    Ok(Cst::new(root, end))
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        // The token stream always ends with `Empty`, which is never consumed.
        let Some(token) = self.tokens.get(self.index) else {
            unreachable!("token stream exhausted past the empty token")
        };
        token
    }

    fn take(&mut self) -> Token {
        let token = self.current().clone();
        self.index += 1;
        token
    }

    fn at_operator(&self, accepted: &[&str]) -> bool {
        let token = self.current();
        token.kind == TokenKind::Operator && accepted.contains(&token.text.as_str())
    }

    fn expression(&mut self) -> Result<CstExpression, SyntaxError> {
        self.term()
    }

    fn term(&mut self) -> Result<CstExpression, SyntaxError> {
        let mut expression = self.factor()?;
        while self.at_operator(&["+", "-"]) {
            let op = self.take();
            let rhs = self.factor()?;
            expression = CstExpression::Binary {
                op,
                lhs: Box::new(expression),
                rhs: Box::new(rhs),
            };
        }
        Ok(expression)
    }

    fn factor(&mut self) -> Result<CstExpression, SyntaxError> {
        let mut expression = self.unary()?;
        while self.at_operator(&["*", "/", "%"]) {
            let op = self.take();
            let rhs = self.unary()?;
            expression = CstExpression::Binary {
                op,
                lhs: Box::new(expression),
                rhs: Box::new(rhs),
            };
        }
        Ok(expression)
    }

    fn unary(&mut self) -> Result<CstExpression, SyntaxError> {
        if self.at_operator(&["-"]) {
            let op = self.take();
            let operand = self.unary()?;
            return Ok(CstExpression::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<CstExpression, SyntaxError> {
        match self.current().kind {
            TokenKind::Int | TokenKind::Double => {
                let token = self.take();
                check_number_range(&token)?;
                Ok(CstExpression::Number(token))
            }
            TokenKind::Identifier => {
                let name = self.take();
                if self.current().kind == TokenKind::LeftParen {
                    self.function_call(name)
                } else {
                    Ok(CstExpression::Variable(name))
                }
            }
            TokenKind::LeftParen => {
                let lparen = self.take();
                let expression = self.expression()?;
                if self.current().kind != TokenKind::RightParen {
                    return Err(SyntaxError::MissingRightParenthesis {
                        position: self.current().span.start,
                    });
                }
                let rparen = self.take();
                Ok(CstExpression::Parenthesis {
                    lparen,
                    expression: Box::new(expression),
                    rparen,
                })
            }
            _ => Err(SyntaxError::ExpressionExpected {
                position: self.current().span.start,
            }),
        }
    }

    fn function_call(&mut self, name: Token) -> Result<CstExpression, SyntaxError> {
        let lparen = self.take();
        let mut arguments: Vec<CstArgument> = Vec::new();

        if self.current().kind != TokenKind::RightParen {
            loop {
                let expression = self.expression()?;
                if self.current().kind == TokenKind::Comma {
                    let comma = self.take();
                    arguments.push(CstArgument {
                        expression,
                        comma: Some(comma),
                    });
                } else {
                    arguments.push(CstArgument {
                        expression,
                        comma: None,
                    });
                    break;
                }
            }
        }

        if self.current().kind != TokenKind::RightParen {
            return Err(SyntaxError::MissingRightParenthesis {
                position: self.current().span.start,
            });
        }
        let rparen = self.take();
        Ok(CstExpression::FunctionCall {
            name,
            lparen,
            arguments,
            rparen,
        })
    }
}

/// Rejects numeric literals outside the representable range, so that
/// lowering to the evaluation tree is total.
fn check_number_range(token: &Token) -> Result<(), SyntaxError> {
    let digits: String = token.text.chars().filter(|&c| c != '_').collect();
    let in_range = match token.kind {
        TokenKind::Int => digits.parse::<i64>().is_ok(),
        TokenKind::Double => digits.parse::<f64>().is_ok(),
        _ => true,
    };
    if in_range {
        Ok(())
    } else {
        Err(SyntaxError::UnexpectedToken {
            text: token.text.clone(),
            position: token.span.start,
        })
    }
}
