//! Roles, role memberships, and row-level security policies.

use serde::{Deserialize, Serialize};

use super::OptionList;
use crate::ident::ObjectId;

/// A database role.
///
/// Identity: `name`. Everything else is data; every role attribute has
/// an `ALTER ROLE` form, so roles are never dropped and recreated by
/// the diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name.
    pub name: String,
    /// SUPERUSER flag.
    pub superuser: bool,
    /// CREATEDB flag.
    pub create_db: bool,
    /// CREATEROLE flag.
    pub create_role: bool,
    /// INHERIT flag.
    pub inherit: bool,
    /// LOGIN flag.
    pub login: bool,
    /// REPLICATION flag.
    pub replication: bool,
    /// BYPASSRLS flag.
    pub bypass_rls: bool,
    /// CONNECTION LIMIT, `None` for unlimited.
    pub connection_limit: Option<i32>,
    /// Per-role settings as a flat `[key, value, …]` list
    /// (`ALTER ROLE … SET key = value`).
    pub config: OptionList,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Role {
    /// Creates a role with default attributes (mirrors `CREATE ROLE`
    /// defaults: `INHERIT`, everything else off).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superuser: false,
            create_db: false,
            create_role: false,
            inherit: true,
            login: false,
            replication: false,
            bypass_rls: false,
            connection_limit: None,
            config: Vec::new(),
            comment: None,
        }
    }

    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::role(&self.name)
    }
}

/// Membership of one role in another.
///
/// Identity: `(role, member)`. Data: the admin option. A changed admin
/// option is handled by re-granting, so no separate alter form exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMembership {
    /// The role granted.
    pub role: String,
    /// The role receiving the membership.
    pub member: String,
    /// WITH ADMIN OPTION.
    pub admin: bool,
}

impl RoleMembership {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::membership(&self.role, &self.member)
    }
}

/// Command a policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyCommand {
    /// ALL (the default).
    All,
    /// SELECT.
    Select,
    /// INSERT.
    Insert,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
}

impl PolicyCommand {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// A row-level security policy.
///
/// Identity: `(schema, table, name)`. The permissive flag and the
/// command have no `ALTER POLICY` form; roles and both expressions do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Schema of the table the policy is on.
    pub schema: String,
    /// Table name.
    pub table: String,
    /// Policy name.
    pub name: String,
    /// PERMISSIVE (true) or RESTRICTIVE (false).
    pub permissive: bool,
    /// Command the policy applies to.
    pub command: PolicyCommand,
    /// Roles the policy applies to; empty means PUBLIC.
    pub roles: Vec<String>,
    /// USING expression.
    pub using_expr: Option<String>,
    /// WITH CHECK expression.
    pub check_expr: Option<String>,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl Policy {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::policy(&self.schema, &self.table, &self.name)
    }
}
