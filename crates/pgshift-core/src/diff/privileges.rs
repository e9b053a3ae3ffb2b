//! ACL and default-privilege diffing.
//!
//! Grants are grouped by grantability (one statement cannot mix grant
//! options), and a group collapses to `ALL` when its privilege set
//! equals the full universe for the object kind at the target server
//! version. Grants on objects that are dropped — or destroyed by a
//! replace — are either implied (drops) or re-issued (surviving
//! entries on replaced objects).

use std::collections::BTreeSet;

use super::relations::replaced_table_id;
use super::types::type_replaced_id;
use super::views::{function_replaced_id, matview_replaced_id, view_replaced_id};
use super::{partition, DiffContext};
use crate::catalog::{AclTarget, Catalog, Grant, Privilege, PrivilegeGrant};
use crate::change::{Change, PrivilegeChange};
use crate::ident::ObjectId;

fn target_exists(catalog: &Catalog, target: &AclTarget) -> bool {
    let id = target.object_id();
    match target {
        AclTarget::Table { .. } => catalog.tables.contains_key(&id),
        AclTarget::View { .. } => catalog.views.contains_key(&id),
        AclTarget::MaterializedView { .. } => catalog.materialized_views.contains_key(&id),
        AclTarget::ForeignTable { .. } => catalog.foreign_tables.contains_key(&id),
        AclTarget::Sequence { .. } => catalog.sequences.contains_key(&id),
        AclTarget::Schema { .. } => catalog.schemas.contains_key(&id),
        AclTarget::Function { .. } => catalog.functions.contains_key(&id),
        AclTarget::Type { .. } => catalog.types.contains_key(&id),
        AclTarget::ForeignDataWrapper { .. } => catalog.foreign_data_wrappers.contains_key(&id),
        AclTarget::ForeignServer { .. } => catalog.foreign_servers.contains_key(&id),
    }
}

fn target_replaced(ctx: &DiffContext<'_>, target: &AclTarget) -> bool {
    let id = target.object_id();
    match target {
        AclTarget::Table { .. } => replaced_table_id(ctx, &id),
        AclTarget::View { .. } => view_replaced_id(ctx, &id),
        AclTarget::MaterializedView { .. } => matview_replaced_id(ctx, &id),
        AclTarget::Function { .. } => function_replaced_id(ctx, &id),
        AclTarget::Type { .. } => type_replaced_id(ctx, &id),
        AclTarget::ForeignTable { .. } => {
            match (ctx.main.foreign_tables.get(&id), ctx.branch.foreign_tables.get(&id)) {
                (Some(old), Some(new)) => old.server != new.server,
                _ => false,
            }
        }
        AclTarget::Sequence { .. }
        | AclTarget::Schema { .. }
        | AclTarget::ForeignDataWrapper { .. }
        | AclTarget::ForeignServer { .. } => false,
    }
}

fn grantee_survives(ctx: &DiffContext<'_>, grantee: &str) -> bool {
    grantee.eq_ignore_ascii_case("public")
        || ctx.branch.roles.contains_key(&ObjectId::role(grantee))
}

fn collapses_to_all(
    ctx: &DiffContext<'_>,
    target: &AclTarget,
    privileges: &[PrivilegeGrant],
) -> bool {
    let held: BTreeSet<Privilege> = privileges.iter().map(|p| p.privilege).collect();
    let universe: BTreeSet<Privilege> = target.universe(ctx.version).into_iter().collect();
    held == universe
}

/// Emits one grant statement per grantability group. `creates_entry`
/// is set on the first group only, so the ACL identifier has a single
/// creator.
fn grant_groups(ctx: &DiffContext<'_>, grant: &Grant, creates_entry: bool) -> Vec<Change> {
    let mut groups: Vec<(bool, Vec<PrivilegeGrant>)> = Vec::new();
    for grantable in [false, true] {
        let group: Vec<PrivilegeGrant> = grant
            .privileges
            .iter()
            .copied()
            .filter(|p| p.grantable == grantable)
            .collect();
        if !group.is_empty() {
            groups.push((grantable, group));
        }
    }
    groups
        .into_iter()
        .enumerate()
        .map(|(i, (_, privileges))| {
            let all = collapses_to_all(ctx, &grant.target, &privileges);
            Change::Privilege(PrivilegeChange::Grant {
                target: grant.target.clone(),
                grantee: grant.grantee.clone(),
                privileges,
                all,
                creates_entry: creates_entry && i == 0,
            })
        })
        .collect()
}

/// ACL diff.
pub(crate) fn diff_grants(ctx: &DiffContext<'_>) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, new) in &ctx.branch.grants {
        match ctx.main.grants.get(id) {
            None => changes.extend(grant_groups(ctx, new, true)),
            Some(_) if target_replaced(ctx, &new.target) => {
                // The replace destroyed the entry; re-issue it whole.
                changes.extend(grant_groups(ctx, new, true));
            }
            Some(old) if old != new => {
                let old_set: BTreeSet<PrivilegeGrant> = old.privileges.iter().copied().collect();
                let new_set: BTreeSet<PrivilegeGrant> = new.privileges.iter().copied().collect();
                let new_privs: BTreeSet<Privilege> =
                    new.privileges.iter().map(|p| p.privilege).collect();

                // Privileges gone entirely, plus downgraded grant
                // options, are revoked first.
                let revoked: Vec<Privilege> = old_set
                    .iter()
                    .filter(|p| !new_privs.contains(&p.privilege) || !new_set.contains(p))
                    .map(|p| p.privilege)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                if !revoked.is_empty() {
                    let all = {
                        let universe: BTreeSet<Privilege> =
                            new.target.universe(ctx.version).into_iter().collect();
                        revoked.iter().copied().collect::<BTreeSet<_>>() == universe
                    };
                    changes.push(Change::Privilege(PrivilegeChange::Revoke {
                        target: new.target.clone(),
                        grantee: new.grantee.clone(),
                        privileges: revoked.clone(),
                        all,
                        drops_entry: false,
                    }));
                }

                // Then anything newly granted or re-granted with a
                // different grant option.
                let regrant: Vec<PrivilegeGrant> = new_set
                    .iter()
                    .copied()
                    .filter(|p| !old_set.contains(p) || revoked.contains(&p.privilege))
                    .collect();
                if !regrant.is_empty() {
                    let synthetic = Grant {
                        target: new.target.clone(),
                        grantee: new.grantee.clone(),
                        privileges: regrant,
                    };
                    changes.extend(grant_groups(ctx, &synthetic, false));
                }
            }
            Some(_) => {}
        }
    }

    for (id, old) in &ctx.main.grants {
        if ctx.branch.grants.contains_key(id) {
            continue;
        }
        if !target_exists(ctx.branch, &old.target)
            || target_replaced(ctx, &old.target)
            || !grantee_survives(ctx, &old.grantee)
        {
            continue;
        }
        let privileges: Vec<Privilege> = old
            .privileges
            .iter()
            .map(|p| p.privilege)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let all = {
            let universe: BTreeSet<Privilege> =
                old.target.universe(ctx.version).into_iter().collect();
            privileges.iter().copied().collect::<BTreeSet<_>>() == universe
        };
        changes.push(Change::Privilege(PrivilegeChange::Revoke {
            target: old.target.clone(),
            grantee: old.grantee.clone(),
            privileges,
            all,
            drops_entry: true,
        }));
    }

    changes
}

/// Default-privilege diff. A changed set is a replace: revoke the old
/// entry wholesale, then grant the new set (which renders its literal
/// privilege list unless it equals the universe).
pub(crate) fn diff_default_acls(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.default_acls, &ctx.branch.default_acls);
    let mut changes = Vec::new();

    for acl in parts.created {
        let all = {
            let held: BTreeSet<Privilege> = acl.privileges.iter().map(|p| p.privilege).collect();
            let universe: BTreeSet<Privilege> =
                acl.kind.universe(ctx.version).into_iter().collect();
            held == universe
        };
        changes.push(Change::Privilege(PrivilegeChange::GrantDefault {
            acl: acl.clone(),
            all,
        }));
    }

    for (old, new) in parts.altered {
        changes.push(Change::Privilege(PrivilegeChange::RevokeDefault {
            acl: old.clone(),
        }));
        let all = {
            let held: BTreeSet<Privilege> = new.privileges.iter().map(|p| p.privilege).collect();
            let universe: BTreeSet<Privilege> =
                new.kind.universe(ctx.version).into_iter().collect();
            held == universe
        };
        changes.push(Change::Privilege(PrivilegeChange::GrantDefault {
            acl: new.clone(),
            all,
        }));
    }

    for acl in parts.dropped {
        if grantee_survives(ctx, &acl.grantee)
            && ctx.branch.roles.contains_key(&ObjectId::role(&acl.owner))
        {
            changes.push(Change::Privilege(PrivilegeChange::RevokeDefault {
                acl: acl.clone(),
            }));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DefaultAcl, DefaultAclKind, Role, ServerVersion, Table};
    use crate::render::RenderOptions;

    fn ctx<'a>(main: &'a Catalog, branch: &'a Catalog) -> DiffContext<'a> {
        DiffContext {
            main,
            branch,
            version: ServerVersion::default(),
        }
    }

    fn table_grant(privileges: Vec<PrivilegeGrant>) -> Grant {
        Grant {
            target: AclTarget::Table {
                schema: "public".into(),
                name: "t".into(),
            },
            grantee: "app".into(),
            privileges,
        }
    }

    fn with_table(catalog: &mut Catalog) {
        catalog.add_role(Role::new("app"));
        catalog.add_table(Table::new("public", "t", "postgres"));
    }

    #[test]
    fn full_universe_collapses_to_all() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        with_table(&mut main);
        with_table(&mut branch);
        let universe = AclTarget::Table {
            schema: "public".into(),
            name: "t".into(),
        }
        .universe(ServerVersion(16));
        branch.add_grant(table_grant(
            universe.into_iter().map(PrivilegeGrant::plain).collect(),
        ));

        let changes = diff_grants(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        let sql = changes[0].to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(sql, "GRANT ALL ON TABLE public.t TO app");
    }

    #[test]
    fn maintain_breaks_collapse_on_17() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        with_table(&mut main);
        with_table(&mut branch);
        // The 16-privilege universe no longer covers 17's MAINTAIN.
        let universe = AclTarget::Table {
            schema: "public".into(),
            name: "t".into(),
        }
        .universe(ServerVersion(16));
        branch.add_grant(table_grant(
            universe.into_iter().map(PrivilegeGrant::plain).collect(),
        ));

        let ctx17 = DiffContext {
            main: &main,
            branch: &branch,
            version: ServerVersion(17),
        };
        let changes = diff_grants(&ctx17);
        let sql = changes[0].to_sql(&RenderOptions::default()).unwrap();
        assert!(!sql.contains("ALL"));
        assert!(sql.contains("SELECT"));
    }

    #[test]
    fn grantable_groups_split() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        with_table(&mut main);
        with_table(&mut branch);
        branch.add_grant(table_grant(vec![
            PrivilegeGrant::plain(Privilege::Select),
            PrivilegeGrant {
                privilege: Privilege::Update,
                grantable: true,
            },
        ]));

        let changes = diff_grants(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        let opts = RenderOptions::default();
        let first = changes[0].to_sql(&opts).unwrap();
        let second = changes[1].to_sql(&opts).unwrap();
        assert_eq!(first, "GRANT SELECT ON TABLE public.t TO app");
        assert_eq!(second, "GRANT UPDATE ON TABLE public.t TO app WITH GRANT OPTION");
    }

    #[test]
    fn narrowing_emits_minimal_revoke() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        with_table(&mut main);
        with_table(&mut branch);
        main.add_grant(table_grant(vec![
            PrivilegeGrant::plain(Privilege::Select),
            PrivilegeGrant::plain(Privilege::Insert),
        ]));
        branch.add_grant(table_grant(vec![PrivilegeGrant::plain(Privilege::Select)]));

        let changes = diff_grants(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        let sql = changes[0].to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(sql, "REVOKE INSERT ON TABLE public.t FROM app");
    }

    #[test]
    fn revoke_implied_by_table_drop() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        with_table(&mut main);
        branch.add_role(Role::new("app"));
        main.add_grant(table_grant(vec![PrivilegeGrant::plain(Privilege::Select)]));

        let changes = diff_grants(&ctx(&main, &branch));
        assert!(changes.is_empty());
    }

    #[test]
    fn default_acl_narrowing_renders_literal_list() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_role(Role::new("owner"));
        main.add_role(Role::new("app"));
        branch.add_role(Role::new("owner"));
        branch.add_role(Role::new("app"));
        let acl = DefaultAcl {
            owner: "owner".into(),
            schema: Some("public".into()),
            kind: DefaultAclKind::Tables,
            grantee: "app".into(),
            privileges: vec![
                PrivilegeGrant::plain(Privilege::Select),
                PrivilegeGrant::plain(Privilege::Insert),
            ],
        };
        main.add_default_acl(acl.clone());
        let mut narrowed = acl;
        narrowed.privileges = vec![PrivilegeGrant::plain(Privilege::Select)];
        branch.add_default_acl(narrowed);

        let changes = diff_default_acls(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        let opts = RenderOptions::default();
        let grant_sql = changes[1].to_sql(&opts).unwrap();
        assert!(grant_sql.contains("GRANT SELECT ON TABLES"));
        assert!(!grant_sql.contains("GRANT ALL"));
    }
}
