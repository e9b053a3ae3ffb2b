//! ACL entries and default privileges.

use serde::{Deserialize, Serialize};

use super::ServerVersion;
use crate::ident::{ObjectId, ObjectType};

/// A single grantable privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// SELECT.
    Select,
    /// INSERT.
    Insert,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
    /// TRUNCATE.
    Truncate,
    /// REFERENCES.
    References,
    /// TRIGGER.
    Trigger,
    /// MAINTAIN (PostgreSQL 17+).
    Maintain,
    /// USAGE.
    Usage,
    /// CREATE.
    Create,
    /// EXECUTE.
    Execute,
}

impl Privilege {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::References => "REFERENCES",
            Self::Trigger => "TRIGGER",
            Self::Maintain => "MAINTAIN",
            Self::Usage => "USAGE",
            Self::Create => "CREATE",
            Self::Execute => "EXECUTE",
        }
    }
}

/// One privilege held by a grantee, with its grant option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrivilegeGrant {
    /// The privilege.
    pub privilege: Privilege,
    /// WITH GRANT OPTION.
    pub grantable: bool,
}

impl PrivilegeGrant {
    /// A plain, non-grantable privilege.
    #[must_use]
    pub const fn plain(privilege: Privilege) -> Self {
        Self {
            privilege,
            grantable: false,
        }
    }
}

/// The object a GRANT applies to.
///
/// Views, materialized views, and foreign tables share the `TABLE`
/// grant syntax but keep their own kind so dependency edges reference
/// the object that is actually created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclTarget {
    /// A table.
    Table {
        /// Schema.
        schema: String,
        /// Table name.
        name: String,
    },
    /// A view.
    View {
        /// Schema.
        schema: String,
        /// View name.
        name: String,
    },
    /// A materialized view.
    MaterializedView {
        /// Schema.
        schema: String,
        /// Materialized view name.
        name: String,
    },
    /// A foreign table.
    ForeignTable {
        /// Schema.
        schema: String,
        /// Foreign table name.
        name: String,
    },
    /// A sequence.
    Sequence {
        /// Schema.
        schema: String,
        /// Sequence name.
        name: String,
    },
    /// A schema.
    Schema {
        /// Schema name.
        name: String,
    },
    /// A function or procedure.
    Function {
        /// Schema.
        schema: String,
        /// Routine name.
        name: String,
        /// Normalized argument-type signature.
        args: String,
    },
    /// A type or domain.
    Type {
        /// Schema.
        schema: String,
        /// Type name.
        name: String,
    },
    /// A foreign data wrapper.
    ForeignDataWrapper {
        /// Wrapper name.
        name: String,
    },
    /// A foreign server.
    ForeignServer {
        /// Server name.
        name: String,
    },
}

impl AclTarget {
    /// Stable identifier of the target object.
    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        match self {
            Self::Table { schema, name } => ObjectId::table(schema, name),
            Self::View { schema, name } => ObjectId::view(schema, name),
            Self::MaterializedView { schema, name } => ObjectId::materialized_view(schema, name),
            Self::ForeignTable { schema, name } => ObjectId::foreign_table(schema, name),
            Self::Sequence { schema, name } => ObjectId::sequence(schema, name),
            Self::Schema { name } => ObjectId::schema(name),
            Self::Function { schema, name, args } => ObjectId::function(schema, name, args),
            Self::Type { schema, name } => ObjectId::type_(schema, name),
            Self::ForeignDataWrapper { name } => ObjectId::foreign_data_wrapper(name),
            Self::ForeignServer { name } => ObjectId::foreign_server(name),
        }
    }

    /// Kind tag of the target object.
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        match self {
            Self::Table { .. } => ObjectType::Table,
            Self::View { .. } => ObjectType::View,
            Self::MaterializedView { .. } => ObjectType::MaterializedView,
            Self::ForeignTable { .. } => ObjectType::ForeignTable,
            Self::Sequence { .. } => ObjectType::Sequence,
            Self::Schema { .. } => ObjectType::Schema,
            Self::Function { .. } => ObjectType::Function,
            Self::Type { .. } => ObjectType::Type,
            Self::ForeignDataWrapper { .. } => ObjectType::ForeignDataWrapper,
            Self::ForeignServer { .. } => ObjectType::ForeignServer,
        }
    }

    /// Keyword after `ON` in GRANT/REVOKE.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Table { .. }
            | Self::View { .. }
            | Self::MaterializedView { .. }
            | Self::ForeignTable { .. } => "TABLE",
            Self::Sequence { .. } => "SEQUENCE",
            Self::Schema { .. } => "SCHEMA",
            Self::Function { .. } => "FUNCTION",
            Self::Type { .. } => "TYPE",
            Self::ForeignDataWrapper { .. } => "FOREIGN DATA WRAPPER",
            Self::ForeignServer { .. } => "FOREIGN SERVER",
        }
    }

    /// The full privilege set available on this kind at the given
    /// server version. Used for the `ALL` collapse.
    #[must_use]
    pub fn universe(&self, version: ServerVersion) -> Vec<Privilege> {
        match self {
            Self::Table { .. }
            | Self::View { .. }
            | Self::MaterializedView { .. }
            | Self::ForeignTable { .. } => {
                let mut set = vec![
                    Privilege::Select,
                    Privilege::Insert,
                    Privilege::Update,
                    Privilege::Delete,
                    Privilege::Truncate,
                    Privilege::References,
                    Privilege::Trigger,
                ];
                if version.has_maintain_privilege() {
                    set.push(Privilege::Maintain);
                }
                set
            }
            Self::Sequence { .. } => {
                vec![Privilege::Usage, Privilege::Select, Privilege::Update]
            }
            Self::Schema { .. } => vec![Privilege::Usage, Privilege::Create],
            Self::Function { .. } => vec![Privilege::Execute],
            Self::Type { .. } | Self::ForeignDataWrapper { .. } | Self::ForeignServer { .. } => {
                vec![Privilege::Usage]
            }
        }
    }
}

/// The privileges one grantee holds on one object.
///
/// Identity: `acl(objectId, grantee)`. Data: the privilege set with
/// per-privilege grant options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Target object.
    pub target: AclTarget,
    /// Grantee role, or `PUBLIC`.
    pub grantee: String,
    /// Privileges held.
    pub privileges: Vec<PrivilegeGrant>,
}

impl Grant {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::acl_entry(&self.target.object_id(), &self.grantee)
    }
}

/// Object class of a default-privilege entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultAclKind {
    /// ON TABLES.
    Tables,
    /// ON SEQUENCES.
    Sequences,
    /// ON FUNCTIONS.
    Functions,
    /// ON TYPES.
    Types,
    /// ON SCHEMAS.
    Schemas,
}

impl DefaultAclKind {
    /// Keyword after `ON`.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Tables => "TABLES",
            Self::Sequences => "SEQUENCES",
            Self::Functions => "FUNCTIONS",
            Self::Types => "TYPES",
            Self::Schemas => "SCHEMAS",
        }
    }

    /// Tag used in the composite stable identifier.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Sequences => "sequences",
            Self::Functions => "functions",
            Self::Types => "types",
            Self::Schemas => "schemas",
        }
    }

    /// The full privilege set for this object class at the given
    /// server version.
    #[must_use]
    pub fn universe(self, version: ServerVersion) -> Vec<Privilege> {
        match self {
            Self::Tables => AclTarget::Table {
                schema: String::new(),
                name: String::new(),
            }
            .universe(version),
            Self::Sequences => {
                vec![Privilege::Usage, Privilege::Select, Privilege::Update]
            }
            Self::Functions => vec![Privilege::Execute],
            Self::Types => vec![Privilege::Usage],
            Self::Schemas => vec![Privilege::Usage, Privilege::Create],
        }
    }
}

/// A default-privilege entry: privileges automatically granted on new
/// objects created by `owner` (optionally scoped to a schema).
///
/// Identity: `defacl(owner, kind, schema, grantee)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultAcl {
    /// Creating role the default applies to.
    pub owner: String,
    /// Schema scope, if any.
    pub schema: Option<String>,
    /// Object class.
    pub kind: DefaultAclKind,
    /// Grantee role, or `PUBLIC`.
    pub grantee: String,
    /// Privileges granted by default.
    pub privileges: Vec<PrivilegeGrant>,
}

impl DefaultAcl {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::default_acl(
            &self.owner,
            self.kind.tag(),
            self.schema.as_deref(),
            &self.grantee,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_universe_grows_at_17() {
        let target = AclTarget::Table {
            schema: "public".into(),
            name: "t".into(),
        };
        let v16 = target.universe(ServerVersion(16));
        let v17 = target.universe(ServerVersion(17));
        assert!(!v16.contains(&Privilege::Maintain));
        assert!(v17.contains(&Privilege::Maintain));
        assert_eq!(v17.len(), v16.len() + 1);
    }

    #[test]
    fn grant_identity_is_object_and_grantee() {
        let grant = Grant {
            target: AclTarget::Sequence {
                schema: "public".into(),
                name: "s".into(),
            },
            grantee: "alice".into(),
            privileges: vec![PrivilegeGrant::plain(Privilege::Usage)],
        };
        assert_eq!(grant.stable_id().as_str(), "acl(sequence:public.s,alice)");
    }
}
