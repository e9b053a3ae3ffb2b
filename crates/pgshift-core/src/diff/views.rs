//! View, materialized-view, routine, trigger, rule, and policy
//! diffing.

use super::relations::{relation_replaced, replaced_table_id, table_survives};
use super::{comment_change, option_delta, owner_change, partition, DiffContext};
use crate::catalog::{Policy, Rule, Trigger};
use crate::change::{
    Change, ObjectRef, PolicyChange, RoutineChange, RuleChange, TriggerChange, ViewChange,
};
use crate::ident::ObjectId;

fn depends_on_replaced(ctx: &DiffContext<'_>, deps: &[ObjectId]) -> bool {
    deps.iter().any(|dep| replaced_table_id(ctx, dep))
}

/// True when the view exists on both sides but will be dropped and
/// re-created, destroying dependent ACL entries.
pub(crate) fn view_replaced_id(ctx: &DiffContext<'_>, id: &ObjectId) -> bool {
    match (ctx.main.views.get(id), ctx.branch.views.get(id)) {
        (Some(old), Some(new)) => {
            old.definition != new.definition || depends_on_replaced(ctx, &new.depends_on)
        }
        _ => false,
    }
}

/// Same check for materialized views.
pub(crate) fn matview_replaced_id(ctx: &DiffContext<'_>, id: &ObjectId) -> bool {
    match (
        ctx.main.materialized_views.get(id),
        ctx.branch.materialized_views.get(id),
    ) {
        (Some(old), Some(new)) => {
            old.definition != new.definition || depends_on_replaced(ctx, &new.depends_on)
        }
        _ => false,
    }
}

/// Same check for routines (a changed return type or routine kind).
pub(crate) fn function_replaced_id(ctx: &DiffContext<'_>, id: &ObjectId) -> bool {
    match (ctx.main.functions.get(id), ctx.branch.functions.get(id)) {
        (Some(old), Some(new)) => old.returns != new.returns || old.kind != new.kind,
        _ => false,
    }
}

/// View diff. The definition is non-alterable; a view reading from a
/// replaced table is destroyed with it and must be re-created even
/// when its own definition is unchanged.
pub(crate) fn diff_views(ctx: &DiffContext<'_>) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, new) in &ctx.branch.views {
        let target = ObjectRef::View {
            schema: new.schema.clone(),
            name: new.name.clone(),
        };
        match ctx.main.views.get(id) {
            None => {
                changes.push(Change::View(ViewChange::Create(new.clone())));
                changes.extend(comment_change(target, None, new.comment.as_ref()));
            }
            Some(old) => {
                let replaced =
                    old.definition != new.definition || depends_on_replaced(ctx, &new.depends_on);
                if replaced {
                    changes.push(Change::View(ViewChange::Drop(old.clone())));
                    changes.push(Change::View(ViewChange::Create(new.clone())));
                    changes.extend(comment_change(target, None, new.comment.as_ref()));
                    continue;
                }
                if old == new {
                    continue;
                }
                let delta = option_delta(&old.options, &new.options);
                if !delta.is_empty() {
                    changes.push(Change::View(ViewChange::SetOptions {
                        schema: new.schema.clone(),
                        name: new.name.clone(),
                        delta,
                    }));
                }
                changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
                changes.extend(comment_change(
                    target,
                    old.comment.as_ref(),
                    new.comment.as_ref(),
                ));
            }
        }
    }

    for (id, old) in &ctx.main.views {
        if !ctx.branch.views.contains_key(id) {
            changes.push(Change::View(ViewChange::Drop(old.clone())));
        }
    }

    changes
}

/// Materialized-view diff: same replace rules as views, plus
/// alterable storage parameters and tablespace.
pub(crate) fn diff_materialized_views(ctx: &DiffContext<'_>) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, new) in &ctx.branch.materialized_views {
        let target = ObjectRef::MaterializedView {
            schema: new.schema.clone(),
            name: new.name.clone(),
        };
        match ctx.main.materialized_views.get(id) {
            None => {
                changes.push(Change::View(ViewChange::CreateMaterialized(new.clone())));
                changes.extend(comment_change(target, None, new.comment.as_ref()));
            }
            Some(old) => {
                let replaced =
                    old.definition != new.definition || depends_on_replaced(ctx, &new.depends_on);
                if replaced {
                    changes.push(Change::View(ViewChange::DropMaterialized(old.clone())));
                    changes.push(Change::View(ViewChange::CreateMaterialized(new.clone())));
                    changes.extend(comment_change(target, None, new.comment.as_ref()));
                    continue;
                }
                if old == new {
                    continue;
                }
                let delta = option_delta(&old.options, &new.options);
                if !delta.is_empty() {
                    changes.push(Change::View(ViewChange::SetMaterializedOptions {
                        schema: new.schema.clone(),
                        name: new.name.clone(),
                        delta,
                    }));
                }
                if old.tablespace != new.tablespace {
                    changes.push(Change::View(ViewChange::SetMaterializedTablespace {
                        schema: new.schema.clone(),
                        name: new.name.clone(),
                        tablespace: new.tablespace.clone(),
                    }));
                }
                changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
                changes.extend(comment_change(
                    target,
                    old.comment.as_ref(),
                    new.comment.as_ref(),
                ));
            }
        }
    }

    for (id, old) in &ctx.main.materialized_views {
        if !ctx.branch.materialized_views.contains_key(id) {
            changes.push(Change::View(ViewChange::DropMaterialized(old.clone())));
        }
    }

    changes
}

/// Routine diff. Body, language, and header signature replace in
/// place via `CREATE OR REPLACE`; a changed return type or a
/// function/procedure flip forces a drop-and-create.
pub(crate) fn diff_functions(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.functions, &ctx.branch.functions);
    let mut changes = Vec::new();

    for function in parts.created {
        changes.push(Change::Routine(RoutineChange::Create {
            function: function.clone(),
            or_replace: false,
        }));
        changes.extend(comment_change(
            ObjectRef::routine(function.kind, &function.schema, &function.name, &function.arguments),
            None,
            function.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        let target = ObjectRef::routine(new.kind, &new.schema, &new.name, &new.arguments);
        if old.returns != new.returns || old.kind != new.kind {
            changes.push(Change::Routine(RoutineChange::Drop(old.clone())));
            changes.push(Change::Routine(RoutineChange::Create {
                function: new.clone(),
                or_replace: false,
            }));
            changes.extend(comment_change(target, None, new.comment.as_ref()));
            continue;
        }
        let body_changed = old.body != new.body
            || old.language != new.language
            || old.signature != new.signature;
        if body_changed {
            changes.push(Change::Routine(RoutineChange::Create {
                function: new.clone(),
                or_replace: true,
            }));
        }
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(
            target,
            old.comment.as_ref(),
            new.comment.as_ref(),
        ));
    }

    for function in parts.dropped {
        changes.push(Change::Routine(RoutineChange::Drop(function.clone())));
    }

    changes
}

fn trigger_definition_changed(old: &Trigger, new: &Trigger) -> bool {
    let mut normalized = old.clone();
    normalized.comment.clone_from(&new.comment);
    normalized != *new
}

/// Trigger diff. Nothing about the firing definition is alterable.
pub(crate) fn diff_triggers(ctx: &DiffContext<'_>) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, new) in &ctx.branch.triggers {
        let target = ObjectRef::Trigger {
            schema: new.schema.clone(),
            table: new.table.clone(),
            name: new.name.clone(),
        };
        let replaced_parent = relation_replaced(ctx, &new.schema, &new.table);
        match ctx.main.triggers.get(id) {
            None => {
                changes.push(Change::Trigger(TriggerChange::Create(new.clone())));
                changes.extend(comment_change(target, None, new.comment.as_ref()));
            }
            Some(_) if replaced_parent => {
                changes.push(Change::Trigger(TriggerChange::Create(new.clone())));
                changes.extend(comment_change(target, None, new.comment.as_ref()));
            }
            Some(old) if old != new => {
                if trigger_definition_changed(old, new) {
                    changes.push(Change::Trigger(TriggerChange::Drop(old.clone())));
                    changes.push(Change::Trigger(TriggerChange::Create(new.clone())));
                    changes.extend(comment_change(target, None, new.comment.as_ref()));
                } else {
                    changes.extend(comment_change(
                        target,
                        old.comment.as_ref(),
                        new.comment.as_ref(),
                    ));
                }
            }
            Some(_) => {}
        }
    }

    for (id, old) in &ctx.main.triggers {
        if !ctx.branch.triggers.contains_key(id) && table_survives(ctx, &old.schema, &old.table) {
            changes.push(Change::Trigger(TriggerChange::Drop(old.clone())));
        }
    }

    changes
}

fn rule_definition_changed(old: &Rule, new: &Rule) -> bool {
    old.definition != new.definition
}

/// Rewrite-rule diff: stored as full statements, replaced wholesale.
pub(crate) fn diff_rules(ctx: &DiffContext<'_>) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, new) in &ctx.branch.rules {
        let target = ObjectRef::Rule {
            schema: new.schema.clone(),
            table: new.table.clone(),
            name: new.name.clone(),
        };
        let replaced_parent = relation_replaced(ctx, &new.schema, &new.table);
        match ctx.main.rules.get(id) {
            None => {
                changes.push(Change::Rule(RuleChange::Create(new.clone())));
                changes.extend(comment_change(target, None, new.comment.as_ref()));
            }
            Some(_) if replaced_parent => {
                changes.push(Change::Rule(RuleChange::Create(new.clone())));
                changes.extend(comment_change(target, None, new.comment.as_ref()));
            }
            Some(old) if old != new => {
                if rule_definition_changed(old, new) {
                    changes.push(Change::Rule(RuleChange::Drop(old.clone())));
                    changes.push(Change::Rule(RuleChange::Create(new.clone())));
                    changes.extend(comment_change(target, None, new.comment.as_ref()));
                } else {
                    changes.extend(comment_change(
                        target,
                        old.comment.as_ref(),
                        new.comment.as_ref(),
                    ));
                }
            }
            Some(_) => {}
        }
    }

    for (id, old) in &ctx.main.rules {
        if !ctx.branch.rules.contains_key(id) && table_survives(ctx, &old.schema, &old.table) {
            changes.push(Change::Rule(RuleChange::Drop(old.clone())));
        }
    }

    changes
}

fn policy_forces_replace(old: &Policy, new: &Policy) -> bool {
    // ALTER POLICY can change an expression but not remove one.
    old.permissive != new.permissive
        || old.command != new.command
        || (old.using_expr.is_some() && new.using_expr.is_none())
        || (old.check_expr.is_some() && new.check_expr.is_none())
}

/// Policy diff. The permissive flag and the command are non-alterable;
/// roles and both expressions change in one `ALTER POLICY`.
pub(crate) fn diff_policies(ctx: &DiffContext<'_>) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, new) in &ctx.branch.policies {
        let target = ObjectRef::Policy {
            schema: new.schema.clone(),
            table: new.table.clone(),
            name: new.name.clone(),
        };
        let replaced_parent = relation_replaced(ctx, &new.schema, &new.table);
        match ctx.main.policies.get(id) {
            None => {
                changes.push(Change::Policy(PolicyChange::Create(new.clone())));
                changes.extend(comment_change(target, None, new.comment.as_ref()));
            }
            Some(_) if replaced_parent => {
                changes.push(Change::Policy(PolicyChange::Create(new.clone())));
                changes.extend(comment_change(target, None, new.comment.as_ref()));
            }
            Some(old) if old != new => {
                if policy_forces_replace(old, new) {
                    changes.push(Change::Policy(PolicyChange::Drop(old.clone())));
                    changes.push(Change::Policy(PolicyChange::Create(new.clone())));
                    changes.extend(comment_change(target, None, new.comment.as_ref()));
                    continue;
                }
                let roles = (old.roles != new.roles).then(|| new.roles.clone());
                let using_expr =
                    (old.using_expr != new.using_expr).then(|| new.using_expr.clone()).flatten();
                let check_expr =
                    (old.check_expr != new.check_expr).then(|| new.check_expr.clone()).flatten();
                if roles.is_some() || using_expr.is_some() || check_expr.is_some() {
                    changes.push(Change::Policy(PolicyChange::Alter {
                        schema: new.schema.clone(),
                        table: new.table.clone(),
                        name: new.name.clone(),
                        roles,
                        using_expr,
                        check_expr,
                    }));
                }
                changes.extend(comment_change(
                    target,
                    old.comment.as_ref(),
                    new.comment.as_ref(),
                ));
            }
            Some(_) => {}
        }
    }

    for (id, old) in &ctx.main.policies {
        if !ctx.branch.policies.contains_key(id) && table_survives(ctx, &old.schema, &old.table) {
            changes.push(Change::Policy(PolicyChange::Drop(old.clone())));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Column, PolicyCommand, ServerVersion, Table, View};

    fn ctx<'a>(main: &'a Catalog, branch: &'a Catalog) -> DiffContext<'a> {
        DiffContext {
            main,
            branch,
            version: ServerVersion::default(),
        }
    }

    fn view(definition: &str) -> View {
        View {
            schema: "public".into(),
            name: "v".into(),
            definition: definition.into(),
            options: Vec::new(),
            owner: "postgres".into(),
            depends_on: vec![ObjectId::table("public", "t")],
            comment: None,
        }
    }

    #[test]
    fn view_definition_change_replaces() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_view(view("SELECT 1"));
        branch.add_view(view("SELECT 2"));

        let changes = diff_views(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Change::View(ViewChange::Drop(_))));
        assert!(matches!(&changes[1], Change::View(ViewChange::Create(_))));
    }

    #[test]
    fn unchanged_view_recreated_when_dependency_replaced() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        let table = Table::new("public", "t", "postgres").column(Column::new("id", "integer"));
        main.add_table(table.clone());
        let mut partitioned = table;
        partitioned.partition_by = Some("RANGE (id)".into());
        branch.add_table(partitioned);
        main.add_view(view("SELECT id FROM public.t"));
        branch.add_view(view("SELECT id FROM public.t"));

        let changes = diff_views(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Change::View(ViewChange::Drop(_))));
        assert!(matches!(&changes[1], Change::View(ViewChange::Create(_))));
    }

    #[test]
    fn policy_roles_change_is_alter() {
        let base = Policy {
            schema: "public".into(),
            table: "docs".into(),
            name: "p".into(),
            permissive: true,
            command: PolicyCommand::All,
            roles: vec!["app".into()],
            using_expr: Some("true".into()),
            check_expr: None,
            comment: None,
        };
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        let table = Table::new("public", "docs", "postgres");
        main.add_table(table.clone());
        branch.add_table(table);
        main.add_policy(base.clone());
        let mut changed = base;
        changed.roles = vec!["app".into(), "reporting".into()];
        branch.add_policy(changed);

        let changes = diff_policies(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Policy(PolicyChange::Alter { roles: Some(r), .. }) if r.len() == 2
        ));
    }

    #[test]
    fn policy_command_change_replaces() {
        let base = Policy {
            schema: "public".into(),
            table: "docs".into(),
            name: "p".into(),
            permissive: true,
            command: PolicyCommand::Select,
            roles: Vec::new(),
            using_expr: None,
            check_expr: None,
            comment: None,
        };
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        let table = Table::new("public", "docs", "postgres");
        main.add_table(table.clone());
        branch.add_table(table);
        main.add_policy(base.clone());
        let mut changed = base;
        changed.command = PolicyCommand::All;
        branch.add_policy(changed);

        let changes = diff_policies(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Change::Policy(PolicyChange::Drop(_))));
        assert!(matches!(&changes[1], Change::Policy(PolicyChange::Create(_))));
    }

    #[test]
    fn function_body_change_is_replace_in_place() {
        use crate::catalog::{Function, RoutineKind};
        let base = Function {
            schema: "public".into(),
            name: "f".into(),
            arguments: "integer".into(),
            kind: RoutineKind::Function,
            returns: "integer".into(),
            language: "sql".into(),
            signature: "a integer".into(),
            body: "SELECT a".into(),
            owner: "postgres".into(),
            depends_on: Vec::new(),
            comment: None,
        };
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_function(base.clone());
        let mut changed = base;
        changed.body = "SELECT a + 1".into();
        branch.add_function(changed);

        let changes = diff_functions(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Routine(RoutineChange::Create {
                or_replace: true,
                ..
            })
        ));
    }

    #[test]
    fn function_return_type_change_replaces() {
        use crate::catalog::{Function, RoutineKind};
        let base = Function {
            schema: "public".into(),
            name: "f".into(),
            arguments: "".into(),
            kind: RoutineKind::Function,
            returns: "integer".into(),
            language: "sql".into(),
            signature: String::new(),
            body: "SELECT 1".into(),
            owner: "postgres".into(),
            depends_on: Vec::new(),
            comment: None,
        };
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_function(base.clone());
        let mut changed = base;
        changed.returns = "bigint".into();
        changed.body = "SELECT 1::bigint".into();
        branch.add_function(changed);

        let changes = diff_functions(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Change::Routine(RoutineChange::Drop(_))));
        assert!(matches!(
            &changes[1],
            Change::Routine(RoutineChange::Create {
                or_replace: false,
                ..
            })
        ));
    }
}
