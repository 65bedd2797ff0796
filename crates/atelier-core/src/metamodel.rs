// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Metamodel: object types, traits, attribute descriptors, built-ins.
//!
//! A [`Metamodel`] is the schema a memory is bound to at construction. It
//! owns the object types, the traits they mix in, the built-in variables
//! visible to formulas, and the constraints every accepted frame must
//! satisfy.
//!
//! Attribute descriptors live on traits; a type derives its attribute set by
//! walking its traits in declaration order. The walk must be unambiguous:
//! two traits of one type declaring the same attribute name is a metamodel
//! definition error, reported when the metamodel is assembled.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::constraint::Constraint;
use crate::value::{ValueType, Variant};

/// Structural kind of an object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StructuralKind {
    /// Plain object with no graph role.
    Unstructured,
    /// Graph node.
    Node,
    /// Directed graph edge with origin and target.
    Edge,
}

impl core::fmt::Display for StructuralKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Unstructured => "unstructured",
            Self::Node => "node",
            Self::Edge => "edge",
        };
        write!(f, "{name}")
    }
}

/// Descriptor for one named attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Attribute name, unique within the owning type's trait walk.
    pub name: String,
    /// Declared value kind.
    pub value_type: ValueType,
    /// Default value filled in when a snapshot is created without one.
    pub default: Option<Variant>,
    /// Short human-readable summary.
    pub summary: Option<String>,
}

impl Attribute {
    /// Creates a descriptor with no default and no summary.
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            default: None,
            summary: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: Variant) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets the summary line.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Named, reusable group of attribute descriptors, mixed into object types.
#[derive(Debug, Clone)]
pub struct ObjectTrait {
    /// Trait name, unique within a metamodel.
    pub name: String,
    /// Attribute descriptors contributed by this trait, in declaration order.
    pub attributes: Vec<Attribute>,
}

impl ObjectTrait {
    /// Creates a trait from its attribute list.
    #[must_use]
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Looks up an attribute descriptor by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }
}

/// Named object type: a structural kind plus an ordered trait list.
#[derive(Debug, Clone)]
pub struct ObjectType {
    /// Type name, unique within a metamodel.
    pub name: String,
    /// Structural kind every instance of this type has.
    pub structural_kind: StructuralKind,
    /// Traits mixed into this type, in resolution order.
    pub traits: Vec<Arc<ObjectTrait>>,
}

impl ObjectType {
    /// Creates a type from its traits.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        structural_kind: StructuralKind,
        traits: Vec<Arc<ObjectTrait>>,
    ) -> Self {
        Self {
            name: name.into(),
            structural_kind,
            traits,
        }
    }

    /// Resolves an attribute by walking the traits in order; first match wins.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.traits.iter().find_map(|tr| tr.attribute(name))
    }

    /// Iterates over all attribute descriptors in trait walk order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.traits.iter().flat_map(|tr| tr.attributes.iter())
    }

    /// Returns `true` when this type mixes in the named trait.
    #[must_use]
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.iter().any(|tr| tr.name == name)
    }
}

/// Errors reported while assembling a metamodel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetamodelError {
    /// Two types share a name.
    #[error("duplicate object type: {0}")]
    DuplicateType(String),
    /// Two traits share a name.
    #[error("duplicate trait: {0}")]
    DuplicateTrait(String),
    /// Two traits of one type declare the same attribute name.
    #[error("type {type_name} declares attribute {attribute} ambiguously")]
    DuplicateAttribute {
        /// Type whose trait walk is ambiguous.
        type_name: String,
        /// The attribute name declared more than once.
        attribute: String,
    },
}

/// Schema a memory is bound to: types, traits, built-ins, constraints.
#[derive(Debug, Clone, Default)]
pub struct Metamodel {
    types: Vec<Arc<ObjectType>>,
    traits: Vec<Arc<ObjectTrait>>,
    /// Built-in variables visible to bound formulas, by name.
    pub variables: BTreeMap<String, ValueType>,
    /// Constraints checked at frame acceptance, in declaration order.
    pub constraints: Vec<Constraint>,
    type_index: FxHashMap<String, usize>,
    trait_index: FxHashMap<String, usize>,
}

impl Metamodel {
    /// Assembles a metamodel, validating name uniqueness and the per-type
    /// attribute walk.
    ///
    /// # Errors
    /// Returns a [`MetamodelError`] naming the first duplicate type, trait,
    /// or ambiguous attribute.
    pub fn new(
        traits: Vec<ObjectTrait>,
        types: Vec<ObjectType>,
        variables: BTreeMap<String, ValueType>,
        constraints: Vec<Constraint>,
    ) -> Result<Self, MetamodelError> {
        let mut trait_index = FxHashMap::default();
        let traits: Vec<Arc<ObjectTrait>> = traits.into_iter().map(Arc::new).collect();
        for (position, tr) in traits.iter().enumerate() {
            if trait_index.insert(tr.name.clone(), position).is_some() {
                return Err(MetamodelError::DuplicateTrait(tr.name.clone()));
            }
        }

        let mut type_index = FxHashMap::default();
        let types: Vec<Arc<ObjectType>> = types.into_iter().map(Arc::new).collect();
        for (position, ty) in types.iter().enumerate() {
            if type_index.insert(ty.name.clone(), position).is_some() {
                return Err(MetamodelError::DuplicateType(ty.name.clone()));
            }
            let mut seen: Vec<&str> = Vec::new();
            for attr in ty.attributes() {
                if seen.contains(&attr.name.as_str()) {
                    return Err(MetamodelError::DuplicateAttribute {
                        type_name: ty.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
                seen.push(&attr.name);
            }
        }

        Ok(Self {
            types,
            traits,
            variables,
            constraints,
            type_index,
            trait_index,
        })
    }

    /// Resolves an object type by name.
    #[must_use]
    pub fn type_by_name(&self, name: &str) -> Option<&Arc<ObjectType>> {
        self.type_index.get(name).map(|&position| &self.types[position])
    }

    /// Resolves a trait by name.
    #[must_use]
    pub fn trait_by_name(&self, name: &str) -> Option<&Arc<ObjectTrait>> {
        self.trait_index
            .get(name)
            .map(|&position| &self.traits[position])
    }

    /// Iterates over all object types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<ObjectType>> {
        self.types.iter()
    }

    /// Iterates over all traits in declaration order.
    pub fn traits(&self) -> impl Iterator<Item = &Arc<ObjectTrait>> {
        self.traits.iter()
    }
}
