// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Function signatures and the built-in numeric function library.

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::value::{ValueType, Variant};

/// Acceptable types for one argument position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnionType {
    /// Any value is acceptable.
    Any,
    /// Exactly one acceptable type (up to convertibility).
    Concrete(ValueType),
    /// Any of the listed types is acceptable (up to convertibility).
    Union(Vec<ValueType>),
}

impl UnionType {
    /// The numeric union `int | double`, shared by the arithmetic built-ins.
    #[must_use]
    pub fn numeric() -> Self {
        Self::Union(vec![ValueType::INT, ValueType::DOUBLE])
    }

    /// Returns `true` when a value of `ty` is acceptable here.
    ///
    /// Acceptance follows type-level convertibility, see
    /// [`ValueType::is_convertible`].
    #[must_use]
    pub fn matches(&self, ty: &ValueType) -> bool {
        match self {
            Self::Any => true,
            Self::Concrete(accepted) => ty.is_convertible(accepted),
            Self::Union(accepted) => accepted.iter().any(|each| ty.is_convertible(each)),
        }
    }
}

impl core::fmt::Display for UnionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Concrete(ty) => write!(f, "{ty}"),
            Self::Union(types) => {
                for (index, ty) in types.iter().enumerate() {
                    if index > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{ty}")?;
                }
                Ok(())
            }
        }
    }
}

/// Description of one argument position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDesc {
    /// Argument name, for documentation and error messages.
    pub name: String,
    /// Acceptable types.
    pub ty: UnionType,
}

impl ArgumentDesc {
    /// Creates an argument description.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: UnionType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Signature mismatch reported by [`FunctionSignature::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The argument count does not fit the signature.
    #[error("invalid number of arguments: {got}")]
    InvalidArity {
        /// Number of arguments supplied.
        got: usize,
    },
    /// One or more arguments have unacceptable types.
    #[error("type mismatch at argument position(s) {0:?}")]
    TypeMismatch(Vec<usize>),
}

/// Callable shape: positional arguments, optional variadic tail, return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Fixed argument positions, in order.
    pub positional: Vec<ArgumentDesc>,
    /// Description applied to every argument past the fixed positions.
    pub variadic: Option<ArgumentDesc>,
    /// Type of the produced value.
    pub returns: ValueType,
}

impl FunctionSignature {
    /// Creates a purely positional signature.
    #[must_use]
    pub fn positional(positional: Vec<ArgumentDesc>, returns: ValueType) -> Self {
        Self {
            positional,
            variadic: None,
            returns,
        }
    }

    /// Creates a signature with a variadic tail.
    #[must_use]
    pub fn variadic(
        positional: Vec<ArgumentDesc>,
        variadic: ArgumentDesc,
        returns: ValueType,
    ) -> Self {
        Self {
            positional,
            variadic: Some(variadic),
            returns,
        }
    }

    /// Checks a list of argument types against the signature.
    ///
    /// # Errors
    /// [`SignatureError::InvalidArity`] when the count does not fit,
    /// [`SignatureError::TypeMismatch`] naming every unacceptable position.
    pub fn validate(&self, args: &[ValueType]) -> Result<(), SignatureError> {
        if args.len() < self.positional.len()
            || (args.len() > self.positional.len() && self.variadic.is_none())
        {
            return Err(SignatureError::InvalidArity { got: args.len() });
        }
        let mut mismatched: Vec<usize> = Vec::new();
        for (index, ty) in args.iter().enumerate() {
            let accepted = match self.positional.get(index) {
                Some(desc) => &desc.ty,
                None => match &self.variadic {
                    Some(desc) => &desc.ty,
                    None => unreachable!("arity check admitted an extra argument"),
                },
            };
            if !accepted.matches(ty) {
                mismatched.push(index);
            }
        }
        if mismatched.is_empty() {
            Ok(())
        } else {
            Err(SignatureError::TypeMismatch(mismatched))
        }
    }
}

/// Host-supplied callable body.
///
/// The error string is wrapped into
/// [`EvalError::FunctionFailed`](super::EvalError::FunctionFailed) by the
/// evaluator.
pub type FunctionBody = fn(&[Variant]) -> Result<Variant, String>;

/// Named callable: signature plus body.
#[derive(Debug, Clone)]
pub struct Function {
    /// Function name as referenced from formulas.
    pub name: String,
    /// Callable shape, used by the binder.
    pub signature: FunctionSignature,
    /// Body dispatched by the evaluator.
    pub body: FunctionBody,
}

impl Function {
    /// Creates a function.
    #[must_use]
    pub fn new(name: impl Into<String>, signature: FunctionSignature, body: FunctionBody) -> Self {
        Self {
            name: name.into(),
            signature,
            body,
        }
    }
}

fn doubles(args: &[Variant]) -> Result<Vec<f64>, String> {
    args.iter()
        .map(|arg| {
            arg.try_double()
                .map_err(|_| format!("expected a numeric argument, got {}", arg.value_type()))
        })
        .collect()
}

fn unary_double(args: &[Variant], apply: fn(f64) -> f64) -> Result<Variant, String> {
    let values = doubles(args)?;
    match values.as_slice() {
        [value] => Ok(Variant::from(apply(*value))),
        _ => Err(format!("expected 1 argument, got {}", values.len())),
    }
}

fn fold_double(args: &[Variant], start: f64, fold: fn(f64, f64) -> f64) -> Result<Variant, String> {
    let values = doubles(args)?;
    Ok(Variant::from(values.into_iter().fold(start, fold)))
}

fn reduce_double(args: &[Variant], reduce: fn(f64, f64) -> f64) -> Result<Variant, String> {
    let values = doubles(args)?;
    let mut iter = values.into_iter();
    let Some(first) = iter.next() else {
        return Err("expected at least 1 argument".to_owned());
    };
    Ok(Variant::from(iter.fold(first, reduce)))
}

fn builtin(name: &str, signature: FunctionSignature, body: FunctionBody) -> Function {
    Function::new(name, signature, body)
}

fn one_numeric(name: &str) -> FunctionSignature {
    FunctionSignature::positional(
        vec![ArgumentDesc::new(name, UnionType::numeric())],
        ValueType::DOUBLE,
    )
}

static BUILTINS: Lazy<Vec<Function>> = Lazy::new(|| {
    vec![
        builtin("abs", one_numeric("value"), |args| {
            unary_double(args, f64::abs)
        }),
        builtin("floor", one_numeric("value"), |args| {
            unary_double(args, f64::floor)
        }),
        builtin("ceiling", one_numeric("value"), |args| {
            unary_double(args, f64::ceil)
        }),
        builtin("round", one_numeric("value"), |args| {
            unary_double(args, f64::round)
        }),
        builtin("sqrt", one_numeric("value"), |args| {
            unary_double(args, f64::sqrt)
        }),
        builtin(
            "power",
            FunctionSignature::positional(
                vec![
                    ArgumentDesc::new("base", UnionType::numeric()),
                    ArgumentDesc::new("exponent", UnionType::numeric()),
                ],
                ValueType::DOUBLE,
            ),
            |args| {
                let values = doubles(args)?;
                match values.as_slice() {
                    [base, exponent] => Ok(Variant::from(base.powf(*exponent))),
                    _ => Err(format!("expected 2 arguments, got {}", values.len())),
                }
            },
        ),
        builtin(
            "sum",
            FunctionSignature::variadic(
                Vec::new(),
                ArgumentDesc::new("value", UnionType::numeric()),
                ValueType::DOUBLE,
            ),
            |args| fold_double(args, 0.0, |acc, value| acc + value),
        ),
        builtin(
            "min",
            FunctionSignature::variadic(
                vec![ArgumentDesc::new("value", UnionType::numeric())],
                ArgumentDesc::new("value", UnionType::numeric()),
                ValueType::DOUBLE,
            ),
            |args| reduce_double(args, f64::min),
        ),
        builtin(
            "max",
            FunctionSignature::variadic(
                vec![ArgumentDesc::new("value", UnionType::numeric())],
                ArgumentDesc::new("value", UnionType::numeric()),
                ValueType::DOUBLE,
            ),
            |args| reduce_double(args, f64::max),
        ),
    ]
});

/// The built-in numeric function library.
///
/// Domain metamodels typically merge these with their own functions before
/// binding formulas.
#[must_use]
pub fn builtin_functions() -> &'static [Function] {
    &BUILTINS
}
