//! User-defined types and sequences.

use serde::{Deserialize, Serialize};

use crate::ident::ObjectId;

/// An attribute of a composite type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeAttribute {
    /// Attribute name.
    pub name: String,
    /// Attribute type name (as rendered, e.g. `text` or
    /// `public.status`).
    pub type_name: String,
    /// Explicit collation, if any.
    pub collation: Option<String>,
}

/// A named check constraint on a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConstraint {
    /// Constraint name.
    pub name: String,
    /// Check expression (without the `CHECK` keyword).
    pub check: String,
}

/// The shape of a user-defined type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Enum type with ordered labels. Appending labels is alterable
    /// (`ALTER TYPE … ADD VALUE`); removing or reordering is not.
    Enum {
        /// Ordered labels.
        labels: Vec<String>,
    },
    /// Composite type. Attributes can be added and dropped in place.
    Composite {
        /// Ordered attributes.
        attributes: Vec<CompositeAttribute>,
    },
    /// Domain over a base type. The base type is not alterable.
    Domain {
        /// Base type name.
        base_type: String,
        /// NOT NULL flag.
        not_null: bool,
        /// Default expression, if any.
        default: Option<String>,
        /// Named check constraints.
        constraints: Vec<DomainConstraint>,
    },
}

/// A user-defined type (enum, composite, or domain).
///
/// Identity: `(schema, name)`. The kind discriminant itself is
/// non-alterable: an enum cannot become a domain in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Schema.
    pub schema: String,
    /// Type name.
    pub name: String,
    /// Owning role.
    pub owner: String,
    /// Shape and shape-specific data.
    pub kind: TypeKind,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl TypeDef {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::type_(&self.schema, &self.name)
    }
}

/// The table column a sequence is owned by (`OWNED BY`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceOwner {
    /// Schema of the owning table.
    pub schema: String,
    /// Owning table.
    pub table: String,
    /// Owning column.
    pub column: String,
}

/// A sequence.
///
/// Identity: `(schema, name)`. Every numeric property and the owning
/// column have `ALTER SEQUENCE` forms, so sequences are never replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Schema.
    pub schema: String,
    /// Sequence name.
    pub name: String,
    /// Value type (`smallint`, `integer`, or `bigint`).
    pub data_type: String,
    /// START WITH.
    pub start: i64,
    /// INCREMENT BY.
    pub increment: i64,
    /// MINVALUE, `None` for the type default.
    pub min_value: Option<i64>,
    /// MAXVALUE, `None` for the type default.
    pub max_value: Option<i64>,
    /// CACHE size.
    pub cache: i64,
    /// CYCLE flag.
    pub cycle: bool,
    /// OWNED BY column, if any.
    pub owned_by: Option<SequenceOwner>,
    /// Owning role.
    pub owner: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Sequence {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::sequence(&self.schema, &self.name)
    }
}
