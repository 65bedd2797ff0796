// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Evaluator over bound expressions.
//!
//! The walk is bottom-up. Integer arithmetic is checked: wrap-around
//! conditions surface as [`EvalError::ArithmeticOverflow`] instead of
//! wrapping silently. When either operand of a binary operator is a double,
//! both are promoted and the operation computes in double. `%` on integers
//! is the remainder with the sign of the dividend. Division (and remainder)
//! by an exact zero fails with [`EvalError::DivisionByZero`] in both numeric
//! domains.
//!
//! A bound expression's variables must all be provided and its function
//! names must all resolve in the supplied map; a missing entry is a caller
//! bug and asserts.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::bind::{BoundExpression, VariableReference};
use super::function::Function;
use crate::value::{Atom, ValueType, Variant};

/// Runtime evaluation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Integer or double division (or remainder) by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Checked integer arithmetic overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    /// An arithmetic operator was applied to a non-numeric operand.
    #[error("operator '{op}' is not defined for {operand}")]
    InvalidOperand {
        /// Operator text.
        op: String,
        /// Offending operand kind.
        operand: ValueType,
    },
    /// A host-supplied function reported a failure.
    #[error("function {function} failed: {message}")]
    FunctionFailed {
        /// Function that failed.
        function: String,
        /// Failure description from the function body.
        message: String,
    },
}

/// Evaluates a bound expression.
///
/// `variables` maps every variable reference of the expression to its
/// current value; `functions` supplies the callables for dispatch.
///
/// # Errors
/// Returns the first [`EvalError`] raised by an operator or function.
pub fn evaluate(
    expression: &BoundExpression,
    variables: &BTreeMap<VariableReference, Variant>,
    functions: &FxHashMap<String, Function>,
) -> Result<Variant, EvalError> {
    match expression {
        BoundExpression::Value(value) => Ok(value.clone()),
        BoundExpression::Variable(reference) => {
            let Some(value) = variables.get(reference) else {
                unreachable!("variable {reference:?} was not provided")
            };
            Ok(value.clone())
        }
        BoundExpression::Unary { op, operand } => {
            let operand = evaluate(operand, variables, functions)?;
            apply_unary(op, &operand)
        }
        BoundExpression::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, variables, functions)?;
            let rhs = evaluate(rhs, variables, functions)?;
            apply_binary(op, &lhs, &rhs)
        }
        BoundExpression::Function { name, args } => {
            let mut values: Vec<Variant> = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, variables, functions)?);
            }
            let Some(function) = functions.get(name) else {
                unreachable!("function {name} was not provided")
            };
            (function.body)(&values).map_err(|message| EvalError::FunctionFailed {
                function: name.clone(),
                message,
            })
        }
    }
}

/// Numeric operand view: integers stay integers until promotion is forced.
enum Number {
    Int(i64),
    Double(f64),
}

fn number(op: &str, value: &Variant) -> Result<Number, EvalError> {
    match value {
        Variant::Atom(Atom::Int(value)) => Ok(Number::Int(*value)),
        Variant::Atom(Atom::Double(value)) => Ok(Number::Double(*value)),
        other => Err(EvalError::InvalidOperand {
            op: op.to_owned(),
            operand: other.value_type(),
        }),
    }
}

fn apply_unary(op: &str, operand: &Variant) -> Result<Variant, EvalError> {
    match op {
        "-" => match number(op, operand)? {
            Number::Int(value) => value
                .checked_neg()
                .map(Variant::from)
                .ok_or(EvalError::ArithmeticOverflow),
            Number::Double(value) => Ok(Variant::from(-value)),
        },
        _ => unreachable!("unknown unary operator '{op}'"),
    }
}

fn apply_binary(op: &str, lhs: &Variant, rhs: &Variant) -> Result<Variant, EvalError> {
    let lhs = number(op, lhs)?;
    let rhs = number(op, rhs)?;
    match (lhs, rhs) {
        (Number::Int(lhs), Number::Int(rhs)) => int_binary(op, lhs, rhs),
        (Number::Int(lhs), Number::Double(rhs)) => double_binary(op, lhs as f64, rhs),
        (Number::Double(lhs), Number::Int(rhs)) => double_binary(op, lhs, rhs as f64),
        (Number::Double(lhs), Number::Double(rhs)) => double_binary(op, lhs, rhs),
    }
}

fn int_binary(op: &str, lhs: i64, rhs: i64) -> Result<Variant, EvalError> {
    let result = match op {
        "+" => lhs.checked_add(rhs),
        "-" => lhs.checked_sub(rhs),
        "*" => lhs.checked_mul(rhs),
        "/" => {
            if rhs == 0 {
                return Err(EvalError::DivisionByZero);
            }
            lhs.checked_div(rhs)
        }
        "%" => {
            if rhs == 0 {
                return Err(EvalError::DivisionByZero);
            }
            lhs.checked_rem(rhs)
        }
        _ => unreachable!("unknown binary operator '{op}'"),
    };
    result.map(Variant::from).ok_or(EvalError::ArithmeticOverflow)
}

fn double_binary(op: &str, lhs: f64, rhs: f64) -> Result<Variant, EvalError> {
    let result = match op {
        "+" => lhs + rhs,
        "-" => lhs - rhs,
        "*" => lhs * rhs,
        "/" => {
            if rhs == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            lhs / rhs
        }
        "%" => {
            if rhs == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            lhs % rhs
        }
        _ => unreachable!("unknown binary operator '{op}'"),
    };
    Ok(Variant::from(result))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::expr::bind::bind;
    use crate::expr::function::builtin_functions;
    use crate::expr::parser::parse;
    use crate::ident::ObjectId;

    fn eval(source: &str, values: &[(&str, u64, Variant)]) -> Result<Variant, EvalError> {
        let variables: FxHashMap<String, VariableReference> = values
            .iter()
            .map(|(name, id, _)| {
                (
                    (*name).to_owned(),
                    VariableReference::Object(ObjectId::from_raw(*id)),
                )
            })
            .collect();
        let signatures = builtin_functions()
            .iter()
            .map(|function| (function.name.clone(), function.signature.clone()))
            .collect();
        let functions: FxHashMap<String, Function> = builtin_functions()
            .iter()
            .map(|function| (function.name.clone(), function.clone()))
            .collect();
        let bound = bind(&parse(source).unwrap().to_unbound(), &variables, &signatures).unwrap();
        let provided: BTreeMap<VariableReference, Variant> = values
            .iter()
            .map(|(_, id, value)| {
                (
                    VariableReference::Object(ObjectId::from_raw(*id)),
                    value.clone(),
                )
            })
            .collect();
        evaluate(&bound, &provided, &functions)
    }

    #[test]
    fn integer_arithmetic_stays_integer() {
        assert_eq!(eval("2 + 3 * 4", &[]), Ok(Variant::from(14)));
        assert_eq!(eval("7 / 2", &[]), Ok(Variant::from(3)));
        assert_eq!(eval("-7 % 3", &[]), Ok(Variant::from(-1)));
    }

    #[test]
    fn double_operand_promotes_both() {
        assert_eq!(eval("1 + 0.5", &[]), Ok(Variant::from(1.5)));
        assert_eq!(eval("7.0 / 2", &[]), Ok(Variant::from(3.5)));
    }

    #[test]
    fn division_by_zero_fails() {
        assert_eq!(eval("1 / 0", &[]), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1 % 0", &[]), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1.5 / 0.0", &[]), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn integer_overflow_is_reported() {
        let max = i64::MAX;
        assert_eq!(
            eval(&format!("{max} + 1"), &[]),
            Err(EvalError::ArithmeticOverflow)
        );
    }

    #[test]
    fn negating_int_min_is_reported() {
        // i64::MIN itself is not a literal (the grammar negates MAX+1 would
        // overflow), so negate a variable holding it.
        assert_eq!(
            eval("-a", &[("a", 1, Variant::from(i64::MIN))]),
            Err(EvalError::ArithmeticOverflow)
        );
    }

    #[test]
    fn variables_resolve_through_references() {
        assert_eq!(
            eval(
                "a + b * c",
                &[
                    ("a", 1, Variant::from(2)),
                    ("b", 2, Variant::from(3)),
                    ("c", 3, Variant::from(4)),
                ]
            ),
            Ok(Variant::from(14))
        );
    }

    #[test]
    fn functions_dispatch_and_wrap_failures() {
        assert_eq!(eval("sum(1, 2, 3.5)", &[]), Ok(Variant::from(6.5)));
        assert_eq!(
            eval("max(a, 10)", &[("a", 1, Variant::from(3))]),
            Ok(Variant::from(10.0))
        );
        // A bool sneaking in through a variable fails inside the body and is
        // wrapped as FunctionFailed.
        let err = eval("sqrt(a)", &[("a", 1, Variant::from(true))]).unwrap_err();
        assert!(matches!(err, EvalError::FunctionFailed { ref function, .. } if function == "sqrt"));
    }

    #[test]
    fn non_numeric_operand_is_invalid() {
        let err = eval("a + 1", &[("a", 1, Variant::from("text"))]).unwrap_err();
        assert_eq!(
            err,
            EvalError::InvalidOperand {
                op: "+".to_owned(),
                operand: ValueType::STRING,
            }
        );
    }
}
