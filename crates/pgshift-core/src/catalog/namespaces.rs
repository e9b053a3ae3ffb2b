//! Schemas, extensions, and collations.

use serde::{Deserialize, Serialize};

use crate::ident::ObjectId;

/// A schema (namespace).
///
/// Identity: `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name.
    pub name: String,
    /// Owning role.
    pub owner: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Schema {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::schema(&self.name)
    }
}

/// An installed extension.
///
/// Identity: `name`. The installed version is alterable via
/// `ALTER EXTENSION … UPDATE TO`, the home schema via `… SET SCHEMA`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    /// Extension name.
    pub name: String,
    /// Schema the extension's objects live in.
    pub schema: String,
    /// Installed version.
    pub version: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Extension {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::extension(&self.name)
    }
}

/// Collation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollationProvider {
    /// Operating system locales.
    Libc,
    /// ICU locales.
    Icu,
    /// Built-in provider (PostgreSQL 17+).
    Builtin,
}

impl CollationProvider {
    /// SQL keyword for the provider clause.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Libc => "libc",
            Self::Icu => "icu",
            Self::Builtin => "builtin",
        }
    }
}

/// A collation.
///
/// Identity: `(schema, name)`. No data field has an alter form except
/// the owner and comment; any other difference forces a replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collation {
    /// Schema.
    pub schema: String,
    /// Collation name.
    pub name: String,
    /// Owning role.
    pub owner: String,
    /// Provider.
    pub provider: CollationProvider,
    /// Locale string.
    pub locale: String,
    /// Whether comparisons are deterministic.
    pub deterministic: bool,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Collation {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::collation(&self.schema, &self.name)
    }
}
