//! GRANT/REVOKE and default-privilege changes.
//!
//! One statement can only carry a uniform grant option, so grants are
//! grouped by grantability at diff time; a mixed group reaching
//! `to_sql` is a construction bug and fails fast.

use serde::{Deserialize, Serialize};

use super::{push_role, Operation, Scope};
use crate::catalog::{AclTarget, DefaultAcl, Privilege, PrivilegeGrant};
use crate::error::{PlanError, Result};
use crate::ident::{ObjectId, ObjectType};
use crate::render::{quote_ident, RenderOptions};

/// Privilege changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeChange {
    /// GRANT … ON … TO grantee.
    Grant {
        /// Target object.
        target: AclTarget,
        /// Grantee role, or `PUBLIC`.
        grantee: String,
        /// Privileges to grant; grant option must be uniform.
        privileges: Vec<PrivilegeGrant>,
        /// Render `ALL` instead of the list (set when the list equals
        /// the full universe for the kind and server version).
        all: bool,
        /// Whether this grant brings the ACL entry into existence
        /// (false when extending an existing entry).
        creates_entry: bool,
    },
    /// REVOKE … ON … FROM grantee.
    Revoke {
        /// Target object.
        target: AclTarget,
        /// Grantee role, or `PUBLIC`.
        grantee: String,
        /// Privileges to revoke.
        privileges: Vec<Privilege>,
        /// Render `ALL` instead of the list.
        all: bool,
        /// Whether the ACL entry is gone after this revoke.
        drops_entry: bool,
    },
    /// ALTER DEFAULT PRIVILEGES … GRANT ….
    GrantDefault {
        /// The entry being established.
        acl: DefaultAcl,
        /// Render `ALL` instead of the list.
        all: bool,
    },
    /// ALTER DEFAULT PRIVILEGES … REVOKE ALL ….
    RevokeDefault {
        /// The entry being removed, as it existed in main.
        acl: DefaultAcl,
    },
}

impl PrivilegeChange {
    pub(crate) fn object_type(&self) -> ObjectType {
        match self {
            Self::Grant { target, .. } | Self::Revoke { target, .. } => target.object_type(),
            // Default privileges hang off the creating role.
            Self::GrantDefault { .. } | Self::RevokeDefault { .. } => ObjectType::Role,
        }
    }

    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Grant {
                creates_entry: true,
                ..
            }
            | Self::GrantDefault { .. } => Operation::Create,
            Self::Grant {
                creates_entry: false,
                ..
            } => Operation::Alter,
            Self::Revoke {
                drops_entry: true, ..
            }
            | Self::RevokeDefault { .. } => Operation::Drop,
            Self::Revoke {
                drops_entry: false, ..
            } => Operation::Alter,
        }
    }

    pub(crate) fn scope(&self) -> Scope {
        match self {
            Self::Grant { .. } | Self::Revoke { .. } => Scope::Privilege,
            Self::GrantDefault { .. } | Self::RevokeDefault { .. } => Scope::DefaultPrivilege,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Grant {
                target, grantee, ..
            }
            | Self::Revoke {
                target, grantee, ..
            } => ObjectId::acl_entry(&target.object_id(), grantee),
            Self::GrantDefault { acl, .. } | Self::RevokeDefault { acl } => acl.stable_id(),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Grant {
                creates_entry: true,
                ..
            } => vec![self.target_id()],
            Self::GrantDefault { acl, .. } => vec![acl.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Revoke {
                drops_entry: true, ..
            } => vec![self.target_id()],
            Self::RevokeDefault { acl } => vec![acl.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Grant {
                target, grantee, ..
            }
            | Self::Revoke {
                target, grantee, ..
            } => {
                let mut ids = vec![target.object_id()];
                push_role(&mut ids, grantee);
                ids
            }
            Self::GrantDefault { acl, .. } | Self::RevokeDefault { acl } => {
                let mut ids = Vec::new();
                push_role(&mut ids, &acl.owner);
                push_role(&mut ids, &acl.grantee);
                if let Some(schema) = &acl.schema {
                    ids.push(ObjectId::schema(schema));
                }
                ids
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Grant {
                target,
                grantee,
                privileges,
                all,
                ..
            } => {
                let grantable = uniform_grantability(privileges, &self.target_id())?;
                let list = if *all {
                    opts.kw("ALL")
                } else {
                    render_privileges(privileges.iter().map(|p| p.privilege), opts, &self.target_id())?
                };
                let mut sql = format!(
                    "{} {} {} {} {} {} {}",
                    opts.kw("GRANT"),
                    list,
                    opts.kw("ON"),
                    opts.kw(target.keyword()),
                    target_sql_name(target),
                    opts.kw("TO"),
                    render_grantee(grantee, opts)
                );
                if grantable {
                    sql.push_str(&format!(" {}", opts.kw("WITH GRANT OPTION")));
                }
                Ok(sql)
            }
            Self::Revoke {
                target,
                grantee,
                privileges,
                all,
                ..
            } => {
                let list = if *all {
                    opts.kw("ALL")
                } else {
                    render_privileges(privileges.iter().copied(), opts, &self.target_id())?
                };
                Ok(format!(
                    "{} {} {} {} {} {} {}",
                    opts.kw("REVOKE"),
                    list,
                    opts.kw("ON"),
                    opts.kw(target.keyword()),
                    target_sql_name(target),
                    opts.kw("FROM"),
                    render_grantee(grantee, opts)
                ))
            }
            Self::GrantDefault { acl, all } => {
                let grantable = uniform_grantability(&acl.privileges, &acl.stable_id())?;
                let list = if *all {
                    opts.kw("ALL")
                } else {
                    render_privileges(
                        acl.privileges.iter().map(|p| p.privilege),
                        opts,
                        &acl.stable_id(),
                    )?
                };
                let mut sql = default_privileges_head(acl, opts);
                sql.push_str(&format!(
                    " {} {} {} {} {} {}",
                    opts.kw("GRANT"),
                    list,
                    opts.kw("ON"),
                    opts.kw(acl.kind.keyword()),
                    opts.kw("TO"),
                    render_grantee(&acl.grantee, opts)
                ));
                if grantable {
                    sql.push_str(&format!(" {}", opts.kw("WITH GRANT OPTION")));
                }
                Ok(sql)
            }
            Self::RevokeDefault { acl } => {
                let mut sql = default_privileges_head(acl, opts);
                sql.push_str(&format!(
                    " {} {} {} {} {} {}",
                    opts.kw("REVOKE"),
                    opts.kw("ALL"),
                    opts.kw("ON"),
                    opts.kw(acl.kind.keyword()),
                    opts.kw("FROM"),
                    render_grantee(&acl.grantee, opts)
                ))
                ;
                Ok(sql)
            }
        }
    }
}

/// Checks the grant-option flag is uniform and returns it.
fn uniform_grantability(privileges: &[PrivilegeGrant], target: &ObjectId) -> Result<bool> {
    let mut iter = privileges.iter();
    let first = iter.next().ok_or_else(|| PlanError::EmptyPrivileges {
        object: target.to_string(),
    })?;
    if iter.any(|p| p.grantable != first.grantable) {
        return Err(PlanError::MixedGrantability {
            object: target.to_string(),
        });
    }
    Ok(first.grantable)
}

fn render_privileges(
    privileges: impl Iterator<Item = Privilege>,
    opts: &RenderOptions,
    target: &ObjectId,
) -> Result<String> {
    let rendered: Vec<String> = privileges.map(|p| opts.kw(p.as_sql())).collect();
    if rendered.is_empty() {
        return Err(PlanError::EmptyPrivileges {
            object: target.to_string(),
        });
    }
    Ok(rendered.join(", "))
}

fn render_grantee(grantee: &str, opts: &RenderOptions) -> String {
    if grantee.eq_ignore_ascii_case("public") {
        opts.kw("PUBLIC")
    } else {
        quote_ident(grantee)
    }
}

fn target_sql_name(target: &AclTarget) -> String {
    use crate::render::quote_qualified;
    match target {
        AclTarget::Table { schema, name }
        | AclTarget::View { schema, name }
        | AclTarget::MaterializedView { schema, name }
        | AclTarget::ForeignTable { schema, name }
        | AclTarget::Sequence { schema, name }
        | AclTarget::Type { schema, name } => quote_qualified(schema, name),
        AclTarget::Schema { name }
        | AclTarget::ForeignDataWrapper { name }
        | AclTarget::ForeignServer { name } => quote_ident(name),
        AclTarget::Function { schema, name, args } => {
            format!("{}({args})", quote_qualified(schema, name))
        }
    }
}

fn default_privileges_head(acl: &DefaultAcl, opts: &RenderOptions) -> String {
    let mut sql = format!(
        "{} {} {}",
        opts.kw("ALTER DEFAULT PRIVILEGES"),
        opts.kw("FOR ROLE"),
        quote_ident(&acl.owner)
    );
    if let Some(schema) = &acl.schema {
        sql.push_str(&format!(" {} {}", opts.kw("IN SCHEMA"), quote_ident(schema)));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DefaultAclKind;

    fn table_target() -> AclTarget {
        AclTarget::Table {
            schema: "public".into(),
            name: "t".into(),
        }
    }

    #[test]
    fn grant_select_insert() {
        let change = PrivilegeChange::Grant {
            target: table_target(),
            grantee: "app".into(),
            privileges: vec![
                PrivilegeGrant::plain(Privilege::Select),
                PrivilegeGrant::plain(Privilege::Insert),
            ],
            all: false,
            creates_entry: true,
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "GRANT SELECT, INSERT ON TABLE public.t TO app"
        );
    }

    #[test]
    fn grant_all_collapse() {
        let change = PrivilegeChange::Grant {
            target: table_target(),
            grantee: "app".into(),
            privileges: vec![PrivilegeGrant::plain(Privilege::Select)],
            all: true,
            creates_entry: true,
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "GRANT ALL ON TABLE public.t TO app"
        );
    }

    #[test]
    fn grant_with_grant_option() {
        let change = PrivilegeChange::Grant {
            target: table_target(),
            grantee: "app".into(),
            privileges: vec![PrivilegeGrant {
                privilege: Privilege::Select,
                grantable: true,
            }],
            all: false,
            creates_entry: true,
        };
        assert!(change
            .to_sql(&RenderOptions::default())
            .unwrap()
            .ends_with("WITH GRANT OPTION"));
    }

    #[test]
    fn mixed_grantability_is_rejected() {
        let change = PrivilegeChange::Grant {
            target: table_target(),
            grantee: "app".into(),
            privileges: vec![
                PrivilegeGrant {
                    privilege: Privilege::Select,
                    grantable: true,
                },
                PrivilegeGrant::plain(Privilege::Insert),
            ],
            all: false,
            creates_entry: true,
        };
        let err = change.to_sql(&RenderOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::MixedGrantability { .. }));
    }

    #[test]
    fn empty_privileges_are_rejected() {
        let change = PrivilegeChange::Grant {
            target: table_target(),
            grantee: "app".into(),
            privileges: Vec::new(),
            all: false,
            creates_entry: true,
        };
        let err = change.to_sql(&RenderOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::EmptyPrivileges { .. }));
    }

    #[test]
    fn default_privileges_grant() {
        let change = PrivilegeChange::GrantDefault {
            acl: DefaultAcl {
                owner: "owner".into(),
                schema: Some("public".into()),
                kind: DefaultAclKind::Tables,
                grantee: "app".into(),
                privileges: vec![PrivilegeGrant::plain(Privilege::Select)],
            },
            all: false,
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "ALTER DEFAULT PRIVILEGES FOR ROLE owner IN SCHEMA public GRANT SELECT ON TABLES TO app"
        );
    }

    #[test]
    fn default_privileges_revoke_renders_all() {
        let change = PrivilegeChange::RevokeDefault {
            acl: DefaultAcl {
                owner: "owner".into(),
                schema: None,
                kind: DefaultAclKind::Sequences,
                grantee: "app".into(),
                privileges: vec![PrivilegeGrant::plain(Privilege::Usage)],
            },
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "ALTER DEFAULT PRIVILEGES FOR ROLE owner REVOKE ALL ON SEQUENCES FROM app"
        );
    }
}
