// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Concrete syntax tree: every production owns its tokens.
//!
//! The tree exists for exact source round-tripping: [`Cst::full_text`]
//! concatenates token full-texts in source order and equals the parsed
//! input verbatim. Evaluation never runs on this tree; it lowers to
//! [`UnboundExpression`] first.

use super::ast::UnboundExpression;
use super::token::{Token, TokenKind};
use crate::value::Variant;

/// One expression production with its tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CstExpression {
    /// Integer or double literal.
    Number(Token),
    /// Variable reference.
    Variable(Token),
    /// Unary operator application.
    Unary {
        /// Operator token.
        op: Token,
        /// Operand production.
        operand: Box<CstExpression>,
    },
    /// Binary operator application.
    Binary {
        /// Operator token.
        op: Token,
        /// Left operand production.
        lhs: Box<CstExpression>,
        /// Right operand production.
        rhs: Box<CstExpression>,
    },
    /// Function call with a parenthesized argument list.
    FunctionCall {
        /// Function name token.
        name: Token,
        /// Opening parenthesis.
        lparen: Token,
        /// Arguments with their separating commas.
        arguments: Vec<CstArgument>,
        /// Closing parenthesis.
        rparen: Token,
    },
    /// Parenthesized expression.
    Parenthesis {
        /// Opening parenthesis.
        lparen: Token,
        /// Inner production.
        expression: Box<CstExpression>,
        /// Closing parenthesis.
        rparen: Token,
    },
}

/// One argument of a function call, with its trailing comma when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CstArgument {
    /// The argument expression.
    pub expression: CstExpression,
    /// Separator following the argument; `None` on the last argument.
    pub comma: Option<Token>,
}

impl CstExpression {
    fn write_text(&self, out: &mut String) {
        match self {
            Self::Number(token) | Self::Variable(token) => out.push_str(&token.full_text()),
            Self::Unary { op, operand } => {
                out.push_str(&op.full_text());
                operand.write_text(out);
            }
            Self::Binary { op, lhs, rhs } => {
                lhs.write_text(out);
                out.push_str(&op.full_text());
                rhs.write_text(out);
            }
            Self::FunctionCall {
                name,
                lparen,
                arguments,
                rparen,
            } => {
                out.push_str(&name.full_text());
                out.push_str(&lparen.full_text());
                for argument in arguments {
                    argument.expression.write_text(out);
                    if let Some(comma) = &argument.comma {
                        out.push_str(&comma.full_text());
                    }
                }
                out.push_str(&rparen.full_text());
            }
            Self::Parenthesis {
                lparen,
                expression,
                rparen,
            } => {
                out.push_str(&lparen.full_text());
                expression.write_text(out);
                out.push_str(&rparen.full_text());
            }
        }
    }

    fn to_unbound(&self) -> UnboundExpression {
        match self {
            Self::Number(token) => UnboundExpression::Value(number_value(token)),
            Self::Variable(token) => UnboundExpression::Variable(token.text.clone()),
            Self::Unary { op, operand } => UnboundExpression::Unary {
                op: op.text.clone(),
                operand: Box::new(operand.to_unbound()),
            },
            Self::Binary { op, lhs, rhs } => UnboundExpression::Binary {
                op: op.text.clone(),
                lhs: Box::new(lhs.to_unbound()),
                rhs: Box::new(rhs.to_unbound()),
            },
            Self::FunctionCall {
                name, arguments, ..
            } => UnboundExpression::Function {
                name: name.text.clone(),
                args: arguments
                    .iter()
                    .map(|argument| argument.expression.to_unbound())
                    .collect(),
            },
            Self::Parenthesis { expression, .. } => expression.to_unbound(),
        }
    }
}

/// Converts a validated number token into a literal value.
///
/// The parser rejects out-of-range literals, so conversion here is total.
fn number_value(token: &Token) -> Variant {
    let digits: String = token.text.chars().filter(|&c| c != '_').collect();
    match token.kind {
        TokenKind::Int => match digits.parse::<i64>() {
            Ok(value) => Variant::from(value),
            Err(_) => unreachable!("parser accepted unrepresentable int literal"),
        },
        TokenKind::Double => match digits.parse::<f64>() {
            Ok(value) => Variant::from(value),
            Err(_) => unreachable!("parser accepted unrepresentable double literal"),
        },
        _ => unreachable!("number node holds a non-numeric token"),
    }
}

/// Result of a successful parse: the expression plus the end-of-input token.
///
/// The end token carries the source's trailing whitespace, which is what
/// makes the round-trip law hold for inputs with trailing trivia.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cst {
    root: CstExpression,
    end: Token,
}

impl Cst {
    pub(crate) fn new(root: CstExpression, end: Token) -> Self {
        Self { root, end }
    }

    /// The top production.
    #[must_use]
    pub fn root(&self) -> &CstExpression {
        &self.root
    }

    /// Reconstructs the exact source text.
    ///
    /// For every parseable input `s`, `parse(s)?.full_text() == s`.
    #[must_use]
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        self.root.write_text(&mut out);
        out.push_str(&self.end.full_text());
        out
    }

    /// Lowers to the trivia-free evaluation tree.
    #[must_use]
    pub fn to_unbound(&self) -> UnboundExpression {
        self.root.to_unbound()
    }
}
