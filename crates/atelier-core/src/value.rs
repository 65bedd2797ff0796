// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tagged value model: atoms, homogeneous arrays, comparison, conversion.
//!
//! Attribute payloads and expression results are [`Variant`] values: either a
//! single [`Atom`] or a homogeneous array of atoms tagged by item kind.
//!
//! Equality promotes across the numeric kinds (`Int(2) == Double(2.0)`), and
//! hashing is kept consistent with that by hashing every numeric atom through
//! its `f64` bit pattern. Ordering is total within the numeric kinds and
//! within strings; any other pairing reports [`ValueError::NotComparable`].
//!
//! Text forms are culture-neutral: `.` is the decimal separator and booleans
//! read `true`/`false`, independent of any host locale.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

/// Kind tag for a single atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AtomType {
    /// Signed 64-bit integer.
    Int,
    /// IEEE 754 double-precision float.
    Double,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Pair of doubles.
    Point,
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Point => "point",
        };
        write!(f, "{name}")
    }
}

/// Kind tag for a whole [`Variant`]: an atom kind or an array of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValueType {
    /// A single atom of the given kind.
    Atom(AtomType),
    /// A homogeneous array whose items are of the given kind.
    Array(AtomType),
}

impl ValueType {
    /// Shorthand for `ValueType::Atom(AtomType::Int)`.
    pub const INT: Self = Self::Atom(AtomType::Int);
    /// Shorthand for `ValueType::Atom(AtomType::Double)`.
    pub const DOUBLE: Self = Self::Atom(AtomType::Double);
    /// Shorthand for `ValueType::Atom(AtomType::Bool)`.
    pub const BOOL: Self = Self::Atom(AtomType::Bool);
    /// Shorthand for `ValueType::Atom(AtomType::String)`.
    pub const STRING: Self = Self::Atom(AtomType::String);
    /// Shorthand for `ValueType::Atom(AtomType::Point)`.
    pub const POINT: Self = Self::Atom(AtomType::Point);

    /// Returns `true` for the numeric atom kinds (`int`, `double`).
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Atom(AtomType::Int | AtomType::Double))
    }

    /// Type-level convertibility: `true` when *some* value of `self` converts
    /// into `to`.
    ///
    /// The graph is: identity; any atom → string; string → any atom
    /// (parseability is decided per value); int ↔ double. Arrays convert only
    /// to themselves.
    #[must_use]
    pub fn is_convertible(&self, to: &ValueType) -> bool {
        if self == to {
            return true;
        }
        match (self, to) {
            (Self::Atom(_), Self::Atom(AtomType::String))
            | (Self::Atom(AtomType::String), Self::Atom(_)) => true,
            (Self::Atom(AtomType::Int), Self::Atom(AtomType::Double))
            | (Self::Atom(AtomType::Double), Self::Atom(AtomType::Int)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(atom) => write!(f, "{atom}"),
            Self::Array(item) => write!(f, "array<{item}>"),
        }
    }
}

/// Errors produced by value comparison and conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The two value kinds have no defined ordering.
    #[error("values of type {lhs} and {rhs} are not comparable")]
    NotComparable {
        /// Kind of the left-hand value.
        lhs: ValueType,
        /// Kind of the right-hand value.
        rhs: ValueType,
    },
    /// The value does not convert into the requested kind.
    #[error("cannot convert {from} into {to}")]
    Conversion {
        /// Kind of the source value.
        from: ValueType,
        /// Requested target kind.
        to: ValueType,
    },
}

/// Pair of doubles, used for 2D positions in design diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Point {
    /// Constructs a point from its components.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Single tagged scalar.
#[derive(Debug, Clone)]
pub enum Atom {
    /// Signed 64-bit integer.
    Int(i64),
    /// Double-precision float.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    String(String),
    /// Pair of doubles.
    Point(Point),
}

/// Homogeneous array of atoms, tagged by item kind.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantArray {
    /// Array of integers.
    Int(Vec<i64>),
    /// Array of doubles.
    Double(Vec<f64>),
    /// Array of booleans.
    Bool(Vec<bool>),
    /// Array of strings.
    String(Vec<String>),
    /// Array of points.
    Point(Vec<Point>),
}

impl VariantArray {
    /// Returns the item kind tag.
    #[must_use]
    pub fn item_type(&self) -> AtomType {
        match self {
            Self::Int(_) => AtomType::Int,
            Self::Double(_) => AtomType::Double,
            Self::Bool(_) => AtomType::Bool,
            Self::String(_) => AtomType::String,
            Self::Point(_) => AtomType::Point,
        }
    }

    /// Number of items in the array.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int(items) => items.len(),
            Self::Double(items) => items.len(),
            Self::Bool(items) => items.len(),
            Self::String(items) => items.len(),
            Self::Point(items) => items.len(),
        }
    }

    /// Returns `true` when the array holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tagged value: a single atom or a homogeneous array of atoms.
#[derive(Debug, Clone)]
pub enum Variant {
    /// Single scalar payload.
    Atom(Atom),
    /// Homogeneous array payload.
    Array(VariantArray),
}

impl Variant {
    /// Returns the kind tag for this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Atom(Atom::Int(_)) => ValueType::INT,
            Self::Atom(Atom::Double(_)) => ValueType::DOUBLE,
            Self::Atom(Atom::Bool(_)) => ValueType::BOOL,
            Self::Atom(Atom::String(_)) => ValueType::STRING,
            Self::Atom(Atom::Point(_)) => ValueType::POINT,
            Self::Array(array) => ValueType::Array(array.item_type()),
        }
    }

    /// Returns `true` when the value is a single atom.
    #[must_use]
    pub fn is_atom(&self) -> bool {
        matches!(self, Self::Atom(_))
    }

    /// Converts to `int` when the conversion is defined.
    ///
    /// Defined for: `int` (identity), `double` (truncation toward zero),
    /// `string` (decimal parse).
    ///
    /// # Errors
    /// Returns [`ValueError::Conversion`] for every other source, including
    /// unparseable strings.
    pub fn try_int(&self) -> Result<i64, ValueError> {
        match self {
            Self::Atom(Atom::Int(value)) => Ok(*value),
            Self::Atom(Atom::Double(value)) if value.is_finite() => Ok(*value as i64),
            Self::Atom(Atom::String(text)) => {
                text.parse::<i64>().map_err(|_| self.conversion_error(ValueType::INT))
            }
            _ => Err(self.conversion_error(ValueType::INT)),
        }
    }

    /// Converts to `double` when the conversion is defined.
    ///
    /// Defined for: `double` (identity), `int` (exact widening for the
    /// representable range), `string` (decimal parse, `.` separator).
    ///
    /// # Errors
    /// Returns [`ValueError::Conversion`] for every other source.
    pub fn try_double(&self) -> Result<f64, ValueError> {
        match self {
            Self::Atom(Atom::Double(value)) => Ok(*value),
            Self::Atom(Atom::Int(value)) => Ok(*value as f64),
            Self::Atom(Atom::String(text)) => text
                .parse::<f64>()
                .map_err(|_| self.conversion_error(ValueType::DOUBLE)),
            _ => Err(self.conversion_error(ValueType::DOUBLE)),
        }
    }

    /// Converts to `bool` when the conversion is defined.
    ///
    /// Booleans parse only from the exact literals `true` and `false`;
    /// numeric kinds do not convert.
    ///
    /// # Errors
    /// Returns [`ValueError::Conversion`] for every other source.
    pub fn try_bool(&self) -> Result<bool, ValueError> {
        match self {
            Self::Atom(Atom::Bool(value)) => Ok(*value),
            Self::Atom(Atom::String(text)) => match text.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.conversion_error(ValueType::BOOL)),
            },
            _ => Err(self.conversion_error(ValueType::BOOL)),
        }
    }

    /// Converts to `string`. Defined for every atom.
    ///
    /// # Errors
    /// Returns [`ValueError::Conversion`] for arrays.
    pub fn try_string(&self) -> Result<String, ValueError> {
        match self {
            Self::Atom(Atom::Int(value)) => Ok(value.to_string()),
            Self::Atom(Atom::Double(value)) => Ok(value.to_string()),
            Self::Atom(Atom::Bool(value)) => Ok(value.to_string()),
            Self::Atom(Atom::String(text)) => Ok(text.clone()),
            Self::Atom(Atom::Point(point)) => Ok(point.to_string()),
            Self::Array(_) => Err(self.conversion_error(ValueType::STRING)),
        }
    }

    /// Converts to `point` when the conversion is defined.
    ///
    /// The accepted text form is `x,y` with optional whitespace around the
    /// components.
    ///
    /// # Errors
    /// Returns [`ValueError::Conversion`] for every other source.
    pub fn try_point(&self) -> Result<Point, ValueError> {
        match self {
            Self::Atom(Atom::Point(point)) => Ok(*point),
            Self::Atom(Atom::String(text)) => {
                let error = || self.conversion_error(ValueType::POINT);
                let (x, y) = text.split_once(',').ok_or_else(error)?;
                let x = x.trim().parse::<f64>().map_err(|_| error())?;
                let y = y.trim().parse::<f64>().map_err(|_| error())?;
                Ok(Point::new(x, y))
            }
            _ => Err(self.conversion_error(ValueType::POINT)),
        }
    }

    /// Returns `true` when this particular value converts into `to`.
    ///
    /// Unlike [`ValueType::is_convertible`], this is decided per value:
    /// `"12"` converts to `int`, `"twelve"` does not.
    #[must_use]
    pub fn is_convertible(&self, to: &ValueType) -> bool {
        if self.value_type() == *to {
            return true;
        }
        match to {
            ValueType::Atom(AtomType::Int) => self.try_int().is_ok(),
            ValueType::Atom(AtomType::Double) => self.try_double().is_ok(),
            ValueType::Atom(AtomType::Bool) => self.try_bool().is_ok(),
            ValueType::Atom(AtomType::String) => self.try_string().is_ok(),
            ValueType::Atom(AtomType::Point) => self.try_point().is_ok(),
            ValueType::Array(_) => false,
        }
    }

    /// Total order restricted to matching comparable kinds.
    ///
    /// Numeric atoms compare through double promotion, strings compare
    /// lexicographically.
    ///
    /// # Errors
    /// Returns [`ValueError::NotComparable`] for every other pairing,
    /// including booleans, points, arrays, and NaN operands.
    pub fn try_cmp(&self, other: &Variant) -> Result<Ordering, ValueError> {
        let not_comparable = || ValueError::NotComparable {
            lhs: self.value_type(),
            rhs: other.value_type(),
        };
        match (self, other) {
            (Self::Atom(Atom::Int(lhs)), Self::Atom(Atom::Int(rhs))) => Ok(lhs.cmp(rhs)),
            (Self::Atom(Atom::String(lhs)), Self::Atom(Atom::String(rhs))) => Ok(lhs.cmp(rhs)),
            (Self::Atom(lhs), Self::Atom(rhs)) => match (numeric(lhs), numeric(rhs)) {
                (Some(lhs), Some(rhs)) => lhs.partial_cmp(&rhs).ok_or_else(not_comparable),
                _ => Err(not_comparable()),
            },
            _ => Err(not_comparable()),
        }
    }

    fn conversion_error(&self, to: ValueType) -> ValueError {
        ValueError::Conversion {
            from: self.value_type(),
            to,
        }
    }
}

/// Numeric view of an atom, used for promotion in equality and ordering.
fn numeric(atom: &Atom) -> Option<f64> {
    match atom {
        Atom::Int(value) => Some(*value as f64),
        Atom::Double(value) => Some(*value),
        _ => None,
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(lhs), Self::Int(rhs)) => lhs == rhs,
            (Self::Bool(lhs), Self::Bool(rhs)) => lhs == rhs,
            (Self::String(lhs), Self::String(rhs)) => lhs == rhs,
            (Self::Point(lhs), Self::Point(rhs)) => lhs == rhs,
            // Numeric cross-kind equality by double promotion.
            (lhs, rhs) => match (numeric(lhs), numeric(rhs)) {
                (Some(lhs), Some(rhs)) => lhs == rhs,
                _ => false,
            },
        }
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Atom(lhs), Self::Atom(rhs)) => lhs == rhs,
            (Self::Array(lhs), Self::Array(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl Eq for Variant {}

impl Hash for Variant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Numeric atoms hash via f64 bits so that Int(2) and Double(2.0),
        // which compare equal, also hash equal.
        match self {
            Self::Atom(atom) => {
                state.write_u8(0);
                hash_atom(atom, state);
            }
            Self::Array(array) => {
                state.write_u8(1);
                state.write_u8(array.item_type() as u8);
                match array {
                    VariantArray::Int(items) => {
                        for item in items {
                            state.write_u64((*item as f64).to_bits());
                        }
                    }
                    VariantArray::Double(items) => {
                        for item in items {
                            state.write_u64(item.to_bits());
                        }
                    }
                    VariantArray::Bool(items) => items.hash(state),
                    VariantArray::String(items) => items.hash(state),
                    VariantArray::Point(items) => {
                        for item in items {
                            state.write_u64(item.x.to_bits());
                            state.write_u64(item.y.to_bits());
                        }
                    }
                }
            }
        }
    }
}

fn hash_atom<H: Hasher>(atom: &Atom, state: &mut H) {
    match atom {
        Atom::Int(value) => {
            state.write_u8(0);
            state.write_u64((*value as f64).to_bits());
        }
        Atom::Double(value) => {
            state.write_u8(0);
            state.write_u64(value.to_bits());
        }
        Atom::Bool(value) => {
            state.write_u8(1);
            state.write_u8(u8::from(*value));
        }
        Atom::String(text) => {
            state.write_u8(2);
            text.hash(state);
        }
        Atom::Point(point) => {
            state.write_u8(3);
            state.write_u64(point.x.to_bits());
            state.write_u64(point.y.to_bits());
        }
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Self::Atom(Atom::Int(value))
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Self::Atom(Atom::Double(value))
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Self::Atom(Atom::Bool(value))
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Self::Atom(Atom::String(value.to_owned()))
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Self::Atom(Atom::String(value))
    }
}

impl From<Point> for Variant {
    fn from(value: Point) -> Self {
        Self::Atom(Atom::Point(value))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(Atom::Int(value)) => write!(f, "{value}"),
            Self::Atom(Atom::Double(value)) => write!(f, "{value}"),
            Self::Atom(Atom::Bool(value)) => write!(f, "{value}"),
            Self::Atom(Atom::String(text)) => write!(f, "{text}"),
            Self::Atom(Atom::Point(point)) => write!(f, "{point}"),
            Self::Array(array) => write!(f, "array<{}>[{}]", array.item_type(), array.len()),
        }
    }
}
