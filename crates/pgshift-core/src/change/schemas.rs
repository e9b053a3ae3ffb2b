//! Schema, extension, and collation changes.

use serde::{Deserialize, Serialize};

use super::{push_role, Operation};
use crate::catalog::{Collation, Extension, Schema};
use crate::error::Result;
use crate::ident::{ObjectId, ObjectType};
use crate::render::{quote_ident, quote_literal, quote_qualified, RenderOptions};

/// Changes to namespaces and namespace-scoped infrastructure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceChange {
    /// CREATE SCHEMA … AUTHORIZATION owner.
    CreateSchema(Schema),
    /// DROP SCHEMA.
    DropSchema(Schema),
    /// CREATE EXTENSION … WITH SCHEMA … VERSION ….
    CreateExtension(Extension),
    /// ALTER EXTENSION … UPDATE TO version.
    AlterExtensionVersion {
        /// Extension name.
        name: String,
        /// Target version.
        version: String,
    },
    /// ALTER EXTENSION … SET SCHEMA.
    AlterExtensionSchema {
        /// Extension name.
        name: String,
        /// Target schema.
        schema: String,
    },
    /// DROP EXTENSION.
    DropExtension(Extension),
    /// CREATE COLLATION.
    CreateCollation(Collation),
    /// DROP COLLATION.
    DropCollation(Collation),
}

impl NamespaceChange {
    pub(crate) fn object_type(&self) -> ObjectType {
        match self {
            Self::CreateSchema(_) | Self::DropSchema(_) => ObjectType::Schema,
            Self::CreateExtension(_)
            | Self::AlterExtensionVersion { .. }
            | Self::AlterExtensionSchema { .. }
            | Self::DropExtension(_) => ObjectType::Extension,
            Self::CreateCollation(_) | Self::DropCollation(_) => ObjectType::Collation,
        }
    }

    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::CreateSchema(_) | Self::CreateExtension(_) | Self::CreateCollation(_) => {
                Operation::Create
            }
            Self::AlterExtensionVersion { .. } | Self::AlterExtensionSchema { .. } => {
                Operation::Alter
            }
            Self::DropSchema(_) | Self::DropExtension(_) | Self::DropCollation(_) => {
                Operation::Drop
            }
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::CreateSchema(s) | Self::DropSchema(s) => s.stable_id(),
            Self::CreateExtension(e) | Self::DropExtension(e) => e.stable_id(),
            Self::AlterExtensionVersion { name, .. } | Self::AlterExtensionSchema { name, .. } => {
                ObjectId::extension(name)
            }
            Self::CreateCollation(c) | Self::DropCollation(c) => c.stable_id(),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::CreateSchema(s) => vec![s.stable_id()],
            Self::CreateExtension(e) => vec![e.stable_id()],
            Self::CreateCollation(c) => vec![c.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::DropSchema(s) => vec![s.stable_id()],
            Self::DropExtension(e) => vec![e.stable_id()],
            Self::DropCollation(c) => vec![c.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::CreateSchema(s) | Self::DropSchema(s) => {
                let mut ids = Vec::new();
                push_role(&mut ids, &s.owner);
                ids
            }
            Self::CreateExtension(e) | Self::DropExtension(e) => {
                vec![ObjectId::schema(&e.schema)]
            }
            Self::AlterExtensionVersion { name, .. } => vec![ObjectId::extension(name)],
            Self::AlterExtensionSchema { name, schema } => {
                vec![ObjectId::extension(name), ObjectId::schema(schema)]
            }
            Self::CreateCollation(c) | Self::DropCollation(c) => {
                let mut ids = vec![ObjectId::schema(&c.schema)];
                push_role(&mut ids, &c.owner);
                ids
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::CreateSchema(s) => Ok(format!(
                "{} {} {} {}",
                opts.kw("CREATE SCHEMA"),
                quote_ident(&s.name),
                opts.kw("AUTHORIZATION"),
                quote_ident(&s.owner)
            )),
            Self::DropSchema(s) => {
                Ok(format!("{} {}", opts.kw("DROP SCHEMA"), quote_ident(&s.name)))
            }
            Self::CreateExtension(e) => Ok(format!(
                "{} {} {} {} {} {}",
                opts.kw("CREATE EXTENSION"),
                quote_ident(&e.name),
                opts.kw("WITH SCHEMA"),
                quote_ident(&e.schema),
                opts.kw("VERSION"),
                quote_literal(&e.version)
            )),
            Self::AlterExtensionVersion { name, version } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER EXTENSION"),
                quote_ident(name),
                opts.kw("UPDATE TO"),
                quote_literal(version)
            )),
            Self::AlterExtensionSchema { name, schema } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER EXTENSION"),
                quote_ident(name),
                opts.kw("SET SCHEMA"),
                quote_ident(schema)
            )),
            Self::DropExtension(e) => Ok(format!(
                "{} {}",
                opts.kw("DROP EXTENSION"),
                quote_ident(&e.name)
            )),
            Self::CreateCollation(c) => {
                let mut clauses = vec![
                    format!("{} = {}", opts.kw("PROVIDER"), c.provider.as_sql()),
                    format!("{} = {}", opts.kw("LOCALE"), quote_literal(&c.locale)),
                ];
                if !c.deterministic {
                    clauses.push(format!("{} = {}", opts.kw("DETERMINISTIC"), opts.kw("FALSE")));
                }
                Ok(format!(
                    "{} {} ({})",
                    opts.kw("CREATE COLLATION"),
                    quote_qualified(&c.schema, &c.name),
                    clauses.join(", ")
                ))
            }
            Self::DropCollation(c) => Ok(format!(
                "{} {}",
                opts.kw("DROP COLLATION"),
                quote_qualified(&c.schema, &c.name)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CollationProvider;

    #[test]
    fn create_schema_sql() {
        let change = NamespaceChange::CreateSchema(Schema {
            name: "reporting".into(),
            owner: "analyst".into(),
            comment: None,
        });
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "CREATE SCHEMA reporting AUTHORIZATION analyst"
        );
        assert_eq!(change.creates(), vec![ObjectId::schema("reporting")]);
        assert_eq!(change.requires(), vec![ObjectId::role("analyst")]);
    }

    #[test]
    fn create_extension_sql() {
        let change = NamespaceChange::CreateExtension(Extension {
            name: "pg_trgm".into(),
            schema: "public".into(),
            version: "1.6".into(),
            comment: None,
        });
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "CREATE EXTENSION pg_trgm WITH SCHEMA public VERSION '1.6'"
        );
    }

    #[test]
    fn create_collation_sql() {
        let change = NamespaceChange::CreateCollation(Collation {
            schema: "public".into(),
            name: "de_ci".into(),
            owner: "postgres".into(),
            provider: CollationProvider::Icu,
            locale: "de-u-ks-level2".into(),
            deterministic: false,
            comment: None,
        });
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "CREATE COLLATION public.de_ci (PROVIDER = icu, LOCALE = 'de-u-ks-level2', DETERMINISTIC = FALSE)"
        );
    }
}
