//! Table, column, constraint, and index diffing.

use super::{comment_change, option_delta, owner_change, partition, DiffContext};
use crate::catalog::{Column, Constraint, Index, Table};
use crate::change::{
    Change, ColumnAction, ConstraintChange, IndexChange, ObjectRef, RelationChange, RelationRef,
    RowSecurityAction,
};
use crate::ident::ObjectId;

/// True when the table exists on both sides but a non-alterable field
/// forces a drop-and-create. Children of a replaced table (indexes,
/// constraints, triggers, rules, policies, grants) are destroyed with
/// it and must be re-created even when they did not change themselves.
pub(crate) fn relation_replaced(ctx: &DiffContext<'_>, schema: &str, table: &str) -> bool {
    replaced_table_id(ctx, &ObjectId::table(schema, table))
}

/// Same check, keyed by an already-built table identifier. Used by
/// dependent kinds (views, materialized views) whose `depends_on`
/// lists carry identifiers rather than names.
pub(crate) fn replaced_table_id(ctx: &DiffContext<'_>, id: &ObjectId) -> bool {
    match (ctx.main.tables.get(id), ctx.branch.tables.get(id)) {
        (Some(old), Some(new)) => table_forces_replace(old, new),
        _ => false,
    }
}

/// True when a drop of a child object on this table is still needed:
/// the table must survive into the branch unreplaced, otherwise the
/// bigger drop implies it.
pub(crate) fn table_survives(ctx: &DiffContext<'_>, schema: &str, table: &str) -> bool {
    ctx.branch
        .tables
        .contains_key(&ObjectId::table(schema, table))
        && !relation_replaced(ctx, schema, table)
}

fn table_forces_replace(old: &Table, new: &Table) -> bool {
    old.partition_by != new.partition_by
}

/// Referenced tables this table's foreign keys point at, for the drop
/// ordering edge: the implied FK drop must run while the target still
/// exists. Targets that are themselves gone from the branch are
/// excluded — those foreign keys get explicit drops (see
/// [`fk_drop_breaks_cycle`]), and keeping the edge would make two
/// mutually referencing table drops deadlock.
fn fk_targets(ctx: &DiffContext<'_>, table: &Table) -> Vec<ObjectId> {
    let own_id = table.stable_id();
    let mut targets: Vec<ObjectId> = ctx
        .main
        .constraints
        .values()
        .filter(|c| c.schema == table.schema && c.table == table.name)
        .filter_map(|c| match &c.kind {
            crate::catalog::ConstraintKind::ForeignKey {
                ref_schema,
                ref_table,
                ..
            } => Some(ObjectId::table(ref_schema, ref_table)),
            _ => None,
        })
        .filter(|id| id != &own_id && ctx.branch.tables.contains_key(id))
        .collect();
    targets.sort();
    targets.dedup();
    targets
}

/// A foreign key whose owning table AND referenced table are both
/// dropped still needs an explicit drop: relying on either implied
/// drop would leave the two table drops waiting on each other.
fn fk_drop_breaks_cycle(ctx: &DiffContext<'_>, constraint: &Constraint) -> bool {
    let crate::catalog::ConstraintKind::ForeignKey {
        ref_schema,
        ref_table,
        ..
    } = &constraint.kind
    else {
        return false;
    };
    let own_gone = !ctx
        .branch
        .tables
        .contains_key(&ObjectId::table(&constraint.schema, &constraint.table));
    let ref_gone = !ctx
        .branch
        .tables
        .contains_key(&ObjectId::table(ref_schema, ref_table));
    let self_reference = ref_schema == &constraint.schema && ref_table == &constraint.table;
    own_gone && ref_gone && !self_reference
}

/// True when the constraint is a foreign key into a table that is
/// being replaced; the replace destroys it even though its own table
/// survives.
fn fk_reference_replaced(ctx: &DiffContext<'_>, constraint: &Constraint) -> bool {
    match &constraint.kind {
        crate::catalog::ConstraintKind::ForeignKey {
            ref_schema,
            ref_table,
            ..
        } => relation_replaced(ctx, ref_schema, ref_table),
        _ => false,
    }
}

fn create_table_changes(ctx: &DiffContext<'_>, table: &Table) -> Vec<Change> {
    let mut changes = vec![Change::Relation(RelationChange::CreateTable {
        table: table.clone(),
        type_deps: ctx.column_type_deps(&table.columns),
    })];
    let relation = RelationRef::table(&table.schema, &table.name);
    if table.row_security {
        changes.push(Change::Relation(RelationChange::RowSecurity {
            schema: table.schema.clone(),
            name: table.name.clone(),
            action: RowSecurityAction::Enable,
        }));
    }
    if table.force_row_security {
        changes.push(Change::Relation(RelationChange::RowSecurity {
            schema: table.schema.clone(),
            name: table.name.clone(),
            action: RowSecurityAction::Force,
        }));
    }
    for column in &table.columns {
        changes.extend(column_followups(&relation, column));
        changes.extend(comment_change(
            column_ref(&table.schema, &table.name, &column.name),
            None,
            column.comment.as_ref(),
        ));
    }
    changes.extend(comment_change(
        ObjectRef::Table {
            schema: table.schema.clone(),
            name: table.name.clone(),
        },
        None,
        table.comment.as_ref(),
    ));
    changes
}

fn column_ref(schema: &str, table: &str, column: &str) -> ObjectRef {
    ObjectRef::Column {
        schema: schema.into(),
        table: table.into(),
        name: column.into(),
    }
}

/// Statistics targets and storage strategies are not part of the
/// column definition syntax, so fresh columns need follow-up ALTERs.
fn column_followups(relation: &RelationRef, column: &Column) -> Vec<Change> {
    let mut changes = Vec::new();
    if let Some(statistics) = column.statistics {
        changes.push(Change::Relation(RelationChange::AlterColumn {
            relation: relation.clone(),
            column: column.name.clone(),
            action: ColumnAction::SetStatistics(statistics),
            type_deps: Vec::new(),
        }));
    }
    if let Some(storage) = column.storage {
        changes.push(Change::Relation(RelationChange::AlterColumn {
            relation: relation.clone(),
            column: column.name.clone(),
            action: ColumnAction::SetStorage(storage),
            type_deps: Vec::new(),
        }));
    }
    changes
}

/// Column-level diff shared by tables and foreign tables. Property
/// order per column: type, nullability, default, identity,
/// statistics, storage, comment.
pub(crate) fn diff_columns(
    ctx: &DiffContext<'_>,
    relation: &RelationRef,
    old_columns: &[Column],
    new_columns: &[Column],
) -> Vec<Change> {
    let mut changes = Vec::new();

    for new in new_columns {
        let Some(old) = old_columns.iter().find(|c| c.name == new.name) else {
            changes.push(Change::Relation(RelationChange::AddColumn {
                relation: relation.clone(),
                column: new.clone(),
                type_deps: ctx.type_dep(&new.type_name).into_iter().collect(),
            }));
            changes.extend(column_followups(relation, new));
            changes.extend(comment_change(
                column_ref(&relation.schema, &relation.name, &new.name),
                None,
                new.comment.as_ref(),
            ));
            continue;
        };
        if old == new {
            continue;
        }

        // A changed generation expression has no ALTER form.
        if old.generated != new.generated {
            changes.push(Change::Relation(RelationChange::DropColumn {
                relation: relation.clone(),
                column: old.name.clone(),
            }));
            changes.push(Change::Relation(RelationChange::AddColumn {
                relation: relation.clone(),
                column: new.clone(),
                type_deps: ctx.type_dep(&new.type_name).into_iter().collect(),
            }));
            changes.extend(column_followups(relation, new));
            changes.extend(comment_change(
                column_ref(&relation.schema, &relation.name, &new.name),
                None,
                new.comment.as_ref(),
            ));
            continue;
        }

        let mut alter = |action: ColumnAction, type_deps: Vec<ObjectId>| {
            changes.push(Change::Relation(RelationChange::AlterColumn {
                relation: relation.clone(),
                column: new.name.clone(),
                action,
                type_deps,
            }));
        };

        if old.type_name != new.type_name || old.collation != new.collation {
            alter(
                ColumnAction::SetType {
                    type_name: new.type_name.clone(),
                    collation: new.collation.clone(),
                },
                ctx.type_dep(&new.type_name).into_iter().collect(),
            );
        }
        if old.not_null != new.not_null {
            alter(
                if new.not_null {
                    ColumnAction::SetNotNull
                } else {
                    ColumnAction::DropNotNull
                },
                Vec::new(),
            );
        }
        if old.default != new.default {
            alter(
                match &new.default {
                    Some(expr) => ColumnAction::SetDefault(expr.clone()),
                    None => ColumnAction::DropDefault,
                },
                Vec::new(),
            );
        }
        if old.identity != new.identity {
            alter(
                match (old.identity, new.identity) {
                    (None, Some(identity)) => ColumnAction::AddIdentity(identity),
                    (Some(_), Some(identity)) => ColumnAction::SetIdentity(identity),
                    (Some(_), None) | (None, None) => ColumnAction::DropIdentity,
                },
                Vec::new(),
            );
        }
        if old.statistics != new.statistics {
            alter(
                ColumnAction::SetStatistics(new.statistics.unwrap_or(-1)),
                Vec::new(),
            );
        }
        if old.storage != new.storage {
            if let Some(storage) = new.storage {
                alter(ColumnAction::SetStorage(storage), Vec::new());
            }
        }
        changes.extend(comment_change(
            column_ref(&relation.schema, &relation.name, &new.name),
            old.comment.as_ref(),
            new.comment.as_ref(),
        ));
    }

    for old in old_columns {
        if !new_columns.iter().any(|c| c.name == old.name) {
            changes.push(Change::Relation(RelationChange::DropColumn {
                relation: relation.clone(),
                column: old.name.clone(),
            }));
        }
    }

    changes
}

/// Table diff. Non-alterable: the partition strategy. Everything else
/// alters in place, in the fixed order columns, persistence, storage
/// parameters, tablespace, row security, owner, comment.
pub(crate) fn diff_tables(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.tables, &ctx.branch.tables);
    let mut changes = Vec::new();

    for table in parts.created {
        changes.extend(create_table_changes(ctx, table));
    }

    for (old, new) in parts.altered {
        if table_forces_replace(old, new) {
            changes.push(Change::Relation(RelationChange::DropTable {
                table: old.clone(),
                fk_targets: fk_targets(ctx, old),
            }));
            changes.extend(create_table_changes(ctx, new));
            continue;
        }

        let relation = RelationRef::table(&new.schema, &new.name);
        changes.extend(diff_columns(ctx, &relation, &old.columns, &new.columns));

        if old.persistence != new.persistence {
            changes.push(Change::Relation(RelationChange::SetLogged {
                schema: new.schema.clone(),
                name: new.name.clone(),
                persistence: new.persistence,
            }));
        }
        let delta = option_delta(&old.options, &new.options);
        if !delta.is_empty() {
            changes.push(Change::Relation(RelationChange::SetOptions {
                schema: new.schema.clone(),
                name: new.name.clone(),
                delta,
            }));
        }
        if old.tablespace != new.tablespace {
            changes.push(Change::Relation(RelationChange::SetTablespace {
                schema: new.schema.clone(),
                name: new.name.clone(),
                tablespace: new.tablespace.clone(),
            }));
        }
        if old.row_security != new.row_security {
            changes.push(Change::Relation(RelationChange::RowSecurity {
                schema: new.schema.clone(),
                name: new.name.clone(),
                action: if new.row_security {
                    RowSecurityAction::Enable
                } else {
                    RowSecurityAction::Disable
                },
            }));
        }
        if old.force_row_security != new.force_row_security {
            changes.push(Change::Relation(RelationChange::RowSecurity {
                schema: new.schema.clone(),
                name: new.name.clone(),
                action: if new.force_row_security {
                    RowSecurityAction::Force
                } else {
                    RowSecurityAction::NoForce
                },
            }));
        }
        let target = ObjectRef::Table {
            schema: new.schema.clone(),
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for table in parts.dropped {
        changes.push(Change::Relation(RelationChange::DropTable {
            table: table.clone(),
            fk_targets: fk_targets(ctx, table),
        }));
    }

    changes
}

fn add_constraint_changes(constraint: &Constraint) -> Vec<Change> {
    let mut changes = vec![Change::Constraint(ConstraintChange::Add(constraint.clone()))];
    changes.extend(comment_change(
        ObjectRef::Constraint {
            schema: constraint.schema.clone(),
            table: constraint.table.clone(),
            name: constraint.name.clone(),
        },
        None,
        constraint.comment.as_ref(),
    ));
    changes
}

/// Constraint diff. Only the validation state (NOT VALID → validated)
/// and the comment alter in place; everything else replaces. Drops on
/// non-surviving tables are implied by the table drop.
pub(crate) fn diff_constraints(ctx: &DiffContext<'_>) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, new) in &ctx.branch.constraints {
        let replaced_parent = relation_replaced(ctx, &new.schema, &new.table);
        match ctx.main.constraints.get(id) {
            None => changes.extend(add_constraint_changes(new)),
            Some(_) if replaced_parent => {
                // The table replace destroyed it; re-create regardless
                // of whether the constraint itself changed.
                changes.extend(add_constraint_changes(new));
            }
            Some(old) if fk_reference_replaced(ctx, new) => {
                // The referenced table's replace forces this FK out
                // and back even when the FK itself is unchanged.
                changes.push(Change::Constraint(ConstraintChange::Drop(old.clone())));
                changes.extend(add_constraint_changes(new));
            }
            Some(old) if old != new => {
                let only_validation_and_comment = {
                    let mut normalized = old.clone();
                    normalized.validated = new.validated;
                    normalized.comment.clone_from(&new.comment);
                    normalized == *new
                };
                if only_validation_and_comment && !old.validated && new.validated {
                    changes.push(Change::Constraint(ConstraintChange::Validate {
                        schema: new.schema.clone(),
                        table: new.table.clone(),
                        name: new.name.clone(),
                    }));
                    changes.extend(comment_change(
                        ObjectRef::Constraint {
                            schema: new.schema.clone(),
                            table: new.table.clone(),
                            name: new.name.clone(),
                        },
                        old.comment.as_ref(),
                        new.comment.as_ref(),
                    ));
                } else if only_validation_and_comment && old.validated == new.validated {
                    changes.extend(comment_change(
                        ObjectRef::Constraint {
                            schema: new.schema.clone(),
                            table: new.table.clone(),
                            name: new.name.clone(),
                        },
                        old.comment.as_ref(),
                        new.comment.as_ref(),
                    ));
                } else {
                    changes.push(Change::Constraint(ConstraintChange::Drop(old.clone())));
                    changes.extend(add_constraint_changes(new));
                }
            }
            Some(_) => {}
        }
    }

    for (id, old) in &ctx.main.constraints {
        if ctx.branch.constraints.contains_key(id) {
            continue;
        }
        if table_survives(ctx, &old.schema, &old.table) || fk_drop_breaks_cycle(ctx, old) {
            changes.push(Change::Constraint(ConstraintChange::Drop(old.clone())));
        }
    }

    changes
}

fn managed_elsewhere(index: &Index) -> bool {
    index.owned_by_constraint || index.is_partition_child
}

fn index_forces_replace(old: &Index, new: &Index) -> bool {
    old.method != new.method
        || old.unique != new.unique
        || old.columns != new.columns
        || old.include != new.include
        || old.predicate != new.predicate
        || old.table != new.table
}

fn create_index_changes(index: &Index) -> Vec<Change> {
    let mut changes = vec![Change::Index(IndexChange::Create(index.clone()))];
    changes.extend(comment_change(
        ObjectRef::Index {
            schema: index.schema.clone(),
            name: index.name.clone(),
        },
        None,
        index.comment.as_ref(),
    ));
    changes
}

/// Index diff. Indexes backing constraints and partition children are
/// managed by their owning object and skipped entirely. Alterable
/// properties, in order: storage parameters, tablespace, comment.
pub(crate) fn diff_indexes(ctx: &DiffContext<'_>) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, new) in &ctx.branch.indexes {
        if managed_elsewhere(new) {
            continue;
        }
        let replaced_parent = relation_replaced(ctx, &new.schema, &new.table);
        match ctx.main.indexes.get(id).filter(|old| !managed_elsewhere(old)) {
            None => changes.extend(create_index_changes(new)),
            Some(_) if replaced_parent => changes.extend(create_index_changes(new)),
            Some(old) if old != new => {
                if index_forces_replace(old, new) {
                    changes.push(Change::Index(IndexChange::Drop(old.clone())));
                    changes.extend(create_index_changes(new));
                    continue;
                }
                let delta = option_delta(&old.options, &new.options);
                if !delta.is_empty() {
                    changes.push(Change::Index(IndexChange::SetOptions {
                        schema: new.schema.clone(),
                        name: new.name.clone(),
                        delta,
                    }));
                }
                if old.tablespace != new.tablespace {
                    changes.push(Change::Index(IndexChange::SetTablespace {
                        schema: new.schema.clone(),
                        name: new.name.clone(),
                        tablespace: new.tablespace.clone(),
                    }));
                }
                changes.extend(comment_change(
                    ObjectRef::Index {
                        schema: new.schema.clone(),
                        name: new.name.clone(),
                    },
                    old.comment.as_ref(),
                    new.comment.as_ref(),
                ));
            }
            Some(_) => {}
        }
    }

    for (id, old) in &ctx.main.indexes {
        if managed_elsewhere(old) {
            continue;
        }
        if !ctx.branch.indexes.contains_key(id) && table_survives(ctx, &old.schema, &old.table) {
            changes.push(Change::Index(IndexChange::Drop(old.clone())));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ConstraintKind, IndexMethod, ServerVersion};

    fn ctx<'a>(main: &'a Catalog, branch: &'a Catalog) -> DiffContext<'a> {
        DiffContext {
            main,
            branch,
            version: ServerVersion::default(),
        }
    }

    fn users(columns: Vec<Column>) -> Table {
        let mut table = Table::new("public", "t", "postgres");
        table.columns = columns;
        table
    }

    #[test]
    fn added_column_is_one_change() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_table(users(vec![Column::new("id", "integer")]));
        branch.add_table(users(vec![
            Column::new("id", "integer"),
            Column::new("name", "text").not_null().default_expr("'x'"),
        ]));

        let changes = diff_tables(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Relation(RelationChange::AddColumn { column, .. }) if column.name == "name"
        ));
    }

    #[test]
    fn column_type_and_nullability_changes() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_table(users(vec![Column::new("score", "integer")]));
        branch.add_table(users(vec![Column::new("score", "bigint").not_null()]));

        let changes = diff_tables(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(
            &changes[0],
            Change::Relation(RelationChange::AlterColumn {
                action: ColumnAction::SetType { type_name, .. },
                ..
            }) if type_name == "bigint"
        ));
        assert!(matches!(
            &changes[1],
            Change::Relation(RelationChange::AlterColumn {
                action: ColumnAction::SetNotNull,
                ..
            })
        ));
    }

    #[test]
    fn generated_expression_change_replaces_column() {
        let mut generated = Column::new("total", "numeric");
        generated.generated = Some("price * qty".into());
        let mut main = Catalog::new();
        main.add_table(users(vec![generated.clone()]));

        let mut changed = generated;
        changed.generated = Some("price * qty * 2".into());
        let mut branch = Catalog::new();
        branch.add_table(users(vec![changed]));

        let changes = diff_tables(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(
            &changes[0],
            Change::Relation(RelationChange::DropColumn { .. })
        ));
        assert!(matches!(
            &changes[1],
            Change::Relation(RelationChange::AddColumn { .. })
        ));
    }

    #[test]
    fn partition_change_replaces_table() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_table(users(vec![Column::new("id", "integer")]));
        let mut partitioned = users(vec![Column::new("id", "integer")]);
        partitioned.partition_by = Some("RANGE (id)".into());
        branch.add_table(partitioned);

        let changes = diff_tables(&ctx(&main, &branch));
        assert!(matches!(
            &changes[0],
            Change::Relation(RelationChange::DropTable { .. })
        ));
        assert!(matches!(
            &changes[1],
            Change::Relation(RelationChange::CreateTable { .. })
        ));
    }

    #[test]
    fn index_method_change_is_drop_create() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        let table = users(vec![Column::new("body", "text")]);
        main.add_table(table.clone());
        branch.add_table(table);

        let btree = Index::new("public", "t_body_idx", "t", vec!["body".into()]);
        main.add_index(btree.clone());
        let mut gin = btree;
        gin.method = IndexMethod::Gin;
        branch.add_index(gin);

        let changes = diff_indexes(&ctx(&main, &branch));
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Change::Index(IndexChange::Drop(_))));
        assert!(matches!(&changes[1], Change::Index(IndexChange::Create(_))));
    }

    #[test]
    fn constraint_backed_index_is_skipped() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        let table = users(vec![Column::new("id", "integer")]);
        main.add_table(table.clone());
        branch.add_table(table);

        let mut pkey = Index::new("public", "t_pkey", "t", vec!["id".into()]);
        pkey.unique = true;
        pkey.owned_by_constraint = true;
        branch.add_index(pkey);

        let changes = diff_indexes(&ctx(&main, &branch));
        assert!(changes.is_empty());
    }

    #[test]
    fn dropped_index_implied_by_table_drop() {
        let mut main = Catalog::new();
        let branch = Catalog::new();
        main.add_table(users(vec![Column::new("id", "integer")]));
        main.add_index(Index::new("public", "t_id_idx", "t", vec!["id".into()]));

        let changes = diff_indexes(&ctx(&main, &branch));
        assert!(changes.is_empty());
    }

    #[test]
    fn constraint_validation_alters_in_place() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        let table = users(vec![Column::new("id", "integer")]);
        main.add_table(table.clone());
        branch.add_table(table);

        let mut not_valid = Constraint {
            schema: "public".into(),
            table: "t".into(),
            name: "t_check".into(),
            kind: ConstraintKind::Check {
                expression: "id > 0".into(),
                no_inherit: false,
            },
            deferrable: false,
            initially_deferred: false,
            validated: false,
            comment: None,
        };
        main.add_constraint(not_valid.clone());
        not_valid.validated = true;
        branch.add_constraint(not_valid);

        let changes = diff_constraints(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Constraint(ConstraintChange::Validate { .. })
        ));
    }

    #[test]
    fn unchanged_constraint_recreated_when_table_replaced() {
        let mut main = Catalog::new();
        let mut branch = Catalog::new();
        main.add_table(users(vec![Column::new("id", "integer")]));
        let mut partitioned = users(vec![Column::new("id", "integer")]);
        partitioned.partition_by = Some("RANGE (id)".into());
        branch.add_table(partitioned);

        let pk = Constraint {
            schema: "public".into(),
            table: "t".into(),
            name: "t_pkey".into(),
            kind: ConstraintKind::PrimaryKey {
                columns: vec!["id".into()],
            },
            deferrable: false,
            initially_deferred: false,
            validated: true,
            comment: None,
        };
        main.add_constraint(pk.clone());
        branch.add_constraint(pk);

        let changes = diff_constraints(&ctx(&main, &branch));
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::Constraint(ConstraintChange::Add(_))
        ));
    }
}
