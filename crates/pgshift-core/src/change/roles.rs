//! Role and membership changes.

use serde::{Deserialize, Serialize};

use super::{push_role, Operation, Scope};
use crate::catalog::{Role, RoleMembership};
use crate::error::Result;
use crate::ident::{ObjectId, ObjectType};
use crate::render::{quote_ident, quote_literal, RenderOptions};

/// Minimal delta for `ALTER ROLE`. Only changed attributes are set;
/// per-role settings are handled by separate `SetConfig`/`ResetConfig`
/// changes so each statement stays minimal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleDelta {
    /// SUPERUSER / NOSUPERUSER.
    pub superuser: Option<bool>,
    /// CREATEDB / NOCREATEDB.
    pub create_db: Option<bool>,
    /// CREATEROLE / NOCREATEROLE.
    pub create_role: Option<bool>,
    /// INHERIT / NOINHERIT.
    pub inherit: Option<bool>,
    /// LOGIN / NOLOGIN.
    pub login: Option<bool>,
    /// REPLICATION / NOREPLICATION.
    pub replication: Option<bool>,
    /// BYPASSRLS / NOBYPASSRLS.
    pub bypass_rls: Option<bool>,
    /// CONNECTION LIMIT; inner `None` means -1 (unlimited).
    pub connection_limit: Option<Option<i32>>,
}

impl RoleDelta {
    /// True when no attribute changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn flags(&self, opts: &RenderOptions) -> Vec<String> {
        fn flag(out: &mut Vec<String>, opts: &RenderOptions, value: Option<bool>, word: &str) {
            if let Some(on) = value {
                if on {
                    out.push(opts.kw(word));
                } else {
                    out.push(opts.kw(&format!("NO{word}")));
                }
            }
        }

        let mut out = Vec::new();
        flag(&mut out, opts, self.superuser, "SUPERUSER");
        flag(&mut out, opts, self.create_db, "CREATEDB");
        flag(&mut out, opts, self.create_role, "CREATEROLE");
        flag(&mut out, opts, self.inherit, "INHERIT");
        flag(&mut out, opts, self.login, "LOGIN");
        flag(&mut out, opts, self.replication, "REPLICATION");
        flag(&mut out, opts, self.bypass_rls, "BYPASSRLS");
        if let Some(limit) = self.connection_limit {
            out.push(format!(
                "{} {}",
                opts.kw("CONNECTION LIMIT"),
                limit.unwrap_or(-1)
            ));
        }
        out
    }
}

/// Role and role-membership changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleChange {
    /// CREATE ROLE with all non-default attributes.
    Create(Role),
    /// ALTER ROLE with the changed attribute flags.
    Alter {
        /// Role name.
        name: String,
        /// Changed attributes.
        delta: RoleDelta,
    },
    /// ALTER ROLE … SET key = value.
    SetConfig {
        /// Role name.
        name: String,
        /// Setting key.
        key: String,
        /// Setting value.
        value: String,
    },
    /// ALTER ROLE … RESET key.
    ResetConfig {
        /// Role name.
        name: String,
        /// Setting key.
        key: String,
    },
    /// DROP ROLE.
    Drop(Role),
    /// GRANT role TO member.
    GrantMembership(RoleMembership),
    /// REVOKE role FROM member.
    RevokeMembership(RoleMembership),
}

impl RoleChange {
    pub(crate) fn object_type(&self) -> ObjectType {
        ObjectType::Role
    }

    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Create(_) | Self::GrantMembership(_) => Operation::Create,
            Self::Alter { .. } | Self::SetConfig { .. } | Self::ResetConfig { .. } => {
                Operation::Alter
            }
            Self::Drop(_) | Self::RevokeMembership(_) => Operation::Drop,
        }
    }

    pub(crate) fn scope(&self) -> Scope {
        match self {
            Self::GrantMembership(_) | Self::RevokeMembership(_) => Scope::Membership,
            _ => Scope::Object,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Create(role) | Self::Drop(role) => role.stable_id(),
            Self::Alter { name, .. }
            | Self::SetConfig { name, .. }
            | Self::ResetConfig { name, .. } => ObjectId::role(name),
            Self::GrantMembership(m) | Self::RevokeMembership(m) => m.stable_id(),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(role) => vec![role.stable_id()],
            Self::GrantMembership(m) => vec![m.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(role) => vec![role.stable_id()],
            Self::RevokeMembership(m) => vec![m.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(_) | Self::Drop(_) => Vec::new(),
            Self::Alter { name, .. }
            | Self::SetConfig { name, .. }
            | Self::ResetConfig { name, .. } => vec![ObjectId::role(name)],
            Self::GrantMembership(m) | Self::RevokeMembership(m) => {
                let mut ids = Vec::new();
                push_role(&mut ids, &m.role);
                push_role(&mut ids, &m.member);
                ids
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Create(role) => {
                let mut sql = format!("{} {}", opts.kw("CREATE ROLE"), quote_ident(&role.name));
                let defaults = Role::new(role.name.clone());
                let delta = RoleDelta {
                    superuser: (role.superuser != defaults.superuser).then_some(role.superuser),
                    create_db: (role.create_db != defaults.create_db).then_some(role.create_db),
                    create_role: (role.create_role != defaults.create_role)
                        .then_some(role.create_role),
                    inherit: (role.inherit != defaults.inherit).then_some(role.inherit),
                    login: (role.login != defaults.login).then_some(role.login),
                    replication: (role.replication != defaults.replication)
                        .then_some(role.replication),
                    bypass_rls: (role.bypass_rls != defaults.bypass_rls)
                        .then_some(role.bypass_rls),
                    connection_limit: (role.connection_limit != defaults.connection_limit)
                        .then_some(role.connection_limit),
                };
                let flags = delta.flags(opts);
                if !flags.is_empty() {
                    sql.push_str(&format!(" {} {}", opts.kw("WITH"), flags.join(" ")));
                }
                Ok(sql)
            }
            Self::Alter { name, delta } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER ROLE"),
                quote_ident(name),
                opts.kw("WITH"),
                delta.flags(opts).join(" ")
            )),
            Self::SetConfig { name, key, value } => Ok(format!(
                "{} {} {} {} = {}",
                opts.kw("ALTER ROLE"),
                quote_ident(name),
                opts.kw("SET"),
                quote_ident(key),
                quote_literal(value)
            )),
            Self::ResetConfig { name, key } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER ROLE"),
                quote_ident(name),
                opts.kw("RESET"),
                quote_ident(key)
            )),
            Self::Drop(role) => Ok(format!("{} {}", opts.kw("DROP ROLE"), quote_ident(&role.name))),
            Self::GrantMembership(m) => {
                let mut sql = format!(
                    "{} {} {} {}",
                    opts.kw("GRANT"),
                    quote_ident(&m.role),
                    opts.kw("TO"),
                    quote_ident(&m.member)
                );
                if m.admin {
                    sql.push_str(&format!(" {}", opts.kw("WITH ADMIN OPTION")));
                }
                Ok(sql)
            }
            Self::RevokeMembership(m) => Ok(format!(
                "{} {} {} {}",
                opts.kw("REVOKE"),
                quote_ident(&m.role),
                opts.kw("FROM"),
                quote_ident(&m.member)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_role_renders_non_default_flags() {
        let mut role = Role::new("app");
        role.login = true;
        role.connection_limit = Some(10);
        let sql = RoleChange::Create(role)
            .to_sql(&RenderOptions::default())
            .unwrap();
        assert_eq!(sql, "CREATE ROLE app WITH LOGIN CONNECTION LIMIT 10");
    }

    #[test]
    fn create_default_role_has_no_with_clause() {
        let sql = RoleChange::Create(Role::new("plain"))
            .to_sql(&RenderOptions::default())
            .unwrap();
        assert_eq!(sql, "CREATE ROLE plain");
    }

    #[test]
    fn membership_with_admin_option() {
        let change = RoleChange::GrantMembership(RoleMembership {
            role: "admins".into(),
            member: "alice".into(),
            admin: true,
        });
        let sql = change.to_sql(&RenderOptions::default()).unwrap();
        assert!(sql.ends_with("WITH ADMIN OPTION"));
        assert_eq!(sql, "GRANT admins TO alice WITH ADMIN OPTION");
    }

    #[test]
    fn alter_role_flags() {
        let change = RoleChange::Alter {
            name: "app".into(),
            delta: RoleDelta {
                login: Some(false),
                connection_limit: Some(None),
                ..RoleDelta::default()
            },
        };
        let sql = change.to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(sql, "ALTER ROLE app WITH NOLOGIN CONNECTION LIMIT -1");
    }
}
