// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Binder: resolves variable and function names to stable references.
//!
//! Binding is deterministic: the same unbound tree bound against equal name
//! maps produces structurally equal bound expressions. Argument types are
//! inferred bottom-up where the tree allows it; positions whose type cannot
//! be known before evaluation (variables) are checked for arity only.

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::ast::UnboundExpression;
use super::function::{FunctionSignature, SignatureError, UnionType};
use crate::ident::ObjectId;
use crate::value::{AtomType, ValueType, Variant};

/// Stable reference a variable name resolves to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableReference {
    /// A design object, typically the holder of a computed attribute.
    Object(ObjectId),
    /// A built-in variable declared by the metamodel.
    Builtin(String),
}

/// Expression with every name resolved to a stable reference.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpression {
    /// Literal value.
    Value(Variant),
    /// Resolved variable reference.
    Variable(VariableReference),
    /// Unary operator application.
    Unary {
        /// Operator text.
        op: String,
        /// Operand expression.
        operand: Box<BoundExpression>,
    },
    /// Binary operator application.
    Binary {
        /// Operator text.
        op: String,
        /// Left operand.
        lhs: Box<BoundExpression>,
        /// Right operand.
        rhs: Box<BoundExpression>,
    },
    /// Function call; the name is the dispatch key into the host's function
    /// map at evaluation time.
    Function {
        /// Function name.
        name: String,
        /// Bound arguments in call order.
        args: Vec<BoundExpression>,
    },
}

/// Binding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// A variable name with no entry in the variable map.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    /// A function name with no entry in the function map.
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    /// The argument count does not fit the function's signature.
    #[error("invalid number of arguments for {function}: {got}")]
    InvalidArity {
        /// Function being called.
        function: String,
        /// Number of arguments supplied.
        got: usize,
    },
    /// An argument's inferred type is not acceptable for its position.
    #[error("argument {index} of {function}: expected {expected}, got {got}")]
    ArgumentTypeMismatch {
        /// Function being called.
        function: String,
        /// Zero-based argument position.
        index: usize,
        /// Types the position accepts.
        expected: UnionType,
        /// Inferred argument type.
        got: ValueType,
    },
}

/// Resolves every variable and function reference of an unbound expression.
///
/// # Errors
/// Fails fast with the first [`BindError`] encountered in a depth-first,
/// left-to-right walk.
pub fn bind(
    expression: &UnboundExpression,
    variables: &FxHashMap<String, VariableReference>,
    functions: &FxHashMap<String, FunctionSignature>,
) -> Result<BoundExpression, BindError> {
    Ok(bind_typed(expression, variables, functions)?.0)
}

/// Binds a subtree and infers its static type where possible.
///
/// `None` means the type is only known at evaluation time (variables and
/// anything computed from them).
fn bind_typed(
    expression: &UnboundExpression,
    variables: &FxHashMap<String, VariableReference>,
    functions: &FxHashMap<String, FunctionSignature>,
) -> Result<(BoundExpression, Option<ValueType>), BindError> {
    match expression {
        UnboundExpression::Value(value) => {
            let ty = value.value_type();
            Ok((BoundExpression::Value(value.clone()), Some(ty)))
        }
        UnboundExpression::Variable(name) => {
            let Some(reference) = variables.get(name) else {
                return Err(BindError::UnknownVariable(name.clone()));
            };
            Ok((BoundExpression::Variable(reference.clone()), None))
        }
        UnboundExpression::Unary { op, operand } => {
            let (operand, ty) = bind_typed(operand, variables, functions)?;
            Ok((
                BoundExpression::Unary {
                    op: op.clone(),
                    operand: Box::new(operand),
                },
                ty,
            ))
        }
        UnboundExpression::Binary { op, lhs, rhs } => {
            let (lhs, lhs_ty) = bind_typed(lhs, variables, functions)?;
            let (rhs, rhs_ty) = bind_typed(rhs, variables, functions)?;
            let ty = match (lhs_ty, rhs_ty) {
                (Some(ValueType::Atom(AtomType::Double)), Some(_))
                | (Some(_), Some(ValueType::Atom(AtomType::Double))) => Some(ValueType::DOUBLE),
                (Some(ValueType::Atom(AtomType::Int)), Some(ValueType::Atom(AtomType::Int))) => {
                    Some(ValueType::INT)
                }
                _ => None,
            };
            Ok((
                BoundExpression::Binary {
                    op: op.clone(),
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                ty,
            ))
        }
        UnboundExpression::Function { name, args } => {
            let Some(signature) = functions.get(name) else {
                return Err(BindError::UnknownFunction(name.clone()));
            };
            let mut bound_args: Vec<BoundExpression> = Vec::with_capacity(args.len());
            let mut arg_types: Vec<Option<ValueType>> = Vec::with_capacity(args.len());
            for arg in args {
                let (bound, ty) = bind_typed(arg, variables, functions)?;
                bound_args.push(bound);
                arg_types.push(ty);
            }
            validate_call(name, signature, &arg_types)?;
            Ok((
                BoundExpression::Function {
                    name: name.clone(),
                    args: bound_args,
                },
                Some(signature.returns),
            ))
        }
    }
}

fn validate_call(
    name: &str,
    signature: &FunctionSignature,
    arg_types: &[Option<ValueType>],
) -> Result<(), BindError> {
    if let Some(types) = arg_types
        .iter()
        .copied()
        .collect::<Option<Vec<ValueType>>>()
    {
        // Every argument type is known statically; run the full check.
        return match signature.validate(&types) {
            Ok(()) => Ok(()),
            Err(SignatureError::InvalidArity { got }) => Err(BindError::InvalidArity {
                function: name.to_owned(),
                got,
            }),
            Err(SignatureError::TypeMismatch(indexes)) => {
                let Some(&index) = indexes.first() else {
                    unreachable!("type mismatch with no positions")
                };
                let expected = signature
                    .positional
                    .get(index)
                    .or(signature.variadic.as_ref())
                    .map_or(UnionType::Any, |desc| desc.ty.clone());
                Err(BindError::ArgumentTypeMismatch {
                    function: name.to_owned(),
                    index,
                    expected,
                    got: types[index],
                })
            }
        };
    }

    // Some argument types are unknown until evaluation; check arity only.
    let count = arg_types.len();
    if count < signature.positional.len()
        || (count > signature.positional.len() && signature.variadic.is_none())
    {
        return Err(BindError::InvalidArity {
            function: name.to_owned(),
            got: count,
        });
    }
    Ok(())
}
