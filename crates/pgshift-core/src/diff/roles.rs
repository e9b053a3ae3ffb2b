//! Role and membership diffing.

use super::{comment_change, partition, DiffContext};
use crate::change::{Change, ObjectRef, RoleChange, RoleDelta};
use crate::ident::ObjectId;

/// Roles have an `ALTER ROLE` form for every attribute, so altered
/// roles never produce a replace. Property-group order: attribute
/// flags, config sets, config resets, comment.
pub(crate) fn diff_roles(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.roles, &ctx.branch.roles);
    let mut changes = Vec::new();

    for role in parts.created {
        changes.push(Change::Role(RoleChange::Create(role.clone())));
        let config = crate::catalog::options_map(&role.config);
        for (key, value) in config {
            changes.push(Change::Role(RoleChange::SetConfig {
                name: role.name.clone(),
                key: key.to_string(),
                value: value.to_string(),
            }));
        }
        changes.extend(comment_change(
            ObjectRef::Role {
                name: role.name.clone(),
            },
            None,
            role.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        let delta = RoleDelta {
            superuser: (old.superuser != new.superuser).then_some(new.superuser),
            create_db: (old.create_db != new.create_db).then_some(new.create_db),
            create_role: (old.create_role != new.create_role).then_some(new.create_role),
            inherit: (old.inherit != new.inherit).then_some(new.inherit),
            login: (old.login != new.login).then_some(new.login),
            replication: (old.replication != new.replication).then_some(new.replication),
            bypass_rls: (old.bypass_rls != new.bypass_rls).then_some(new.bypass_rls),
            connection_limit: (old.connection_limit != new.connection_limit)
                .then_some(new.connection_limit),
        };
        if !delta.is_empty() {
            changes.push(Change::Role(RoleChange::Alter {
                name: new.name.clone(),
                delta,
            }));
        }

        let old_config = crate::catalog::options_map(&old.config);
        let new_config = crate::catalog::options_map(&new.config);
        for (key, value) in &new_config {
            if old_config.get(key) != Some(value) {
                changes.push(Change::Role(RoleChange::SetConfig {
                    name: new.name.clone(),
                    key: (*key).to_string(),
                    value: (*value).to_string(),
                }));
            }
        }
        for key in old_config.keys() {
            if !new_config.contains_key(key) {
                changes.push(Change::Role(RoleChange::ResetConfig {
                    name: new.name.clone(),
                    key: (*key).to_string(),
                }));
            }
        }

        changes.extend(comment_change(
            ObjectRef::Role {
                name: new.name.clone(),
            },
            old.comment.as_ref(),
            new.comment.as_ref(),
        ));
    }

    for role in parts.dropped {
        changes.push(Change::Role(RoleChange::Drop(role.clone())));
    }

    changes
}

/// Memberships have no alter form: a changed admin option is revoked
/// and re-granted. Revokes are skipped when either side of the
/// membership is itself dropped.
pub(crate) fn diff_memberships(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.memberships, &ctx.branch.memberships);
    let mut changes = Vec::new();

    for membership in parts.created {
        changes.push(Change::Role(RoleChange::GrantMembership(membership.clone())));
    }

    for (old, new) in parts.altered {
        changes.push(Change::Role(RoleChange::RevokeMembership(old.clone())));
        changes.push(Change::Role(RoleChange::GrantMembership(new.clone())));
    }

    for membership in parts.dropped {
        let role_survives = ctx
            .branch
            .roles
            .contains_key(&ObjectId::role(&membership.role));
        let member_survives = ctx
            .branch
            .roles
            .contains_key(&ObjectId::role(&membership.member));
        if role_survives && member_survives {
            changes.push(Change::Role(RoleChange::RevokeMembership(membership.clone())));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Role, RoleMembership, ServerVersion};

    fn ctx<'a>(main: &'a Catalog, branch: &'a Catalog) -> DiffContext<'a> {
        DiffContext {
            main,
            branch,
            version: ServerVersion::default(),
        }
    }

    #[test]
    fn new_role_with_config_and_comment() {
        let main = Catalog::new();
        let mut branch = Catalog::new();
        let mut role = Role::new("app");
        role.login = true;
        role.config = vec!["search_path".into(), "app, public".into()];
        role.comment = Some("application role".into());
        branch.add_role(role);

        let changes = diff_roles(&ctx(&main, &branch));
        assert_eq!(changes.len(), 3);
        assert!(matches!(
            &changes[0],
            Change::Role(RoleChange::Create(r)) if r.name == "app"
        ));
        assert!(matches!(
            &changes[1],
            Change::Role(RoleChange::SetConfig { key, .. }) if key == "search_path"
        ));
        assert!(matches!(&changes[2], Change::Comment(_)));
    }

    #[test]
    fn altered_flags_produce_single_alter() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_role(Role::new("app"));
        let mut changed = Role::new("app");
        changed.login = true;
        changed.create_db = true;
        branch.add_role(changed);

        let changes = diff_roles(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Role(RoleChange::Alter { delta, .. })
                if delta.login == Some(true) && delta.create_db == Some(true)
        ));
    }

    #[test]
    fn admin_change_regrants() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        for catalog in [&mut main, &mut branch] {
            catalog.add_role(Role::new("admins"));
            catalog.add_role(Role::new("alice"));
        }
        main.add_membership(RoleMembership {
            role: "admins".into(),
            member: "alice".into(),
            admin: false,
        });
        branch.add_membership(RoleMembership {
            role: "admins".into(),
            member: "alice".into(),
            admin: true,
        });

        let changes = diff_memberships(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(
            &changes[0],
            Change::Role(RoleChange::RevokeMembership(_))
        ));
        assert!(matches!(
            &changes[1],
            Change::Role(RoleChange::GrantMembership(m)) if m.admin
        ));
    }

    #[test]
    fn dropped_role_implies_membership_revoke() {
        let mut main = Catalog::new();
        let branch = Catalog::new();
        main.add_role(Role::new("gone"));
        main.add_role(Role::new("member"));
        main.add_membership(RoleMembership {
            role: "gone".into(),
            member: "member".into(),
            admin: false,
        });

        // Both roles dropped; membership revoke is implied.
        let changes = diff_memberships(&ctx(&main, &branch));
        assert!(changes.is_empty());
    }
}
