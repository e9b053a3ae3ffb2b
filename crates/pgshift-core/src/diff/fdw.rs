//! Foreign-data diffing: wrappers, servers, user mappings, and
//! foreign tables.

use super::relations::diff_columns;
use super::{comment_change, option_actions, owner_change, partition, DiffContext};
use crate::change::{Change, FdwChange, ObjectRef, RelationRef};
use crate::ident::ObjectId;

/// Wrapper diff. Handler, validator, and options all alter in place,
/// in that order, followed by owner and comment.
pub(crate) fn diff_foreign_data_wrappers(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.foreign_data_wrappers, &ctx.branch.foreign_data_wrappers);
    let mut changes = Vec::new();

    for wrapper in parts.created {
        changes.push(Change::Fdw(FdwChange::CreateWrapper(wrapper.clone())));
        changes.extend(comment_change(
            ObjectRef::ForeignDataWrapper {
                name: wrapper.name.clone(),
            },
            None,
            wrapper.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        let handler = (old.handler != new.handler).then(|| new.handler.clone());
        let validator = (old.validator != new.validator).then(|| new.validator.clone());
        let options = option_actions(&old.options, &new.options);
        if handler.is_some() || validator.is_some() || !options.is_empty() {
            changes.push(Change::Fdw(FdwChange::AlterWrapper {
                name: new.name.clone(),
                handler,
                validator,
                options,
            }));
        }
        let target = ObjectRef::ForeignDataWrapper {
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for wrapper in parts.dropped {
        changes.push(Change::Fdw(FdwChange::DropWrapper(wrapper.clone())));
    }

    changes
}

/// Server diff. The wrapper and the server type are non-alterable and
/// force a replace; version and options alter in place.
pub(crate) fn diff_foreign_servers(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.foreign_servers, &ctx.branch.foreign_servers);
    let mut changes = Vec::new();

    for server in parts.created {
        changes.push(Change::Fdw(FdwChange::CreateServer(server.clone())));
        changes.extend(comment_change(
            ObjectRef::ForeignServer {
                name: server.name.clone(),
            },
            None,
            server.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        if old.wrapper != new.wrapper || old.server_type != new.server_type {
            changes.push(Change::Fdw(FdwChange::DropServer(old.clone())));
            changes.push(Change::Fdw(FdwChange::CreateServer(new.clone())));
            changes.extend(comment_change(
                ObjectRef::ForeignServer {
                    name: new.name.clone(),
                },
                None,
                new.comment.as_ref(),
            ));
            continue;
        }
        let version = (old.version != new.version).then(|| new.version.clone()).flatten();
        let options = option_actions(&old.options, &new.options);
        if version.is_some() || !options.is_empty() {
            changes.push(Change::Fdw(FdwChange::AlterServer {
                name: new.name.clone(),
                version,
                options,
            }));
        }
        let target = ObjectRef::ForeignServer {
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for server in parts.dropped {
        changes.push(Change::Fdw(FdwChange::DropServer(server.clone())));
    }

    changes
}

/// User-mapping diff. Only the options are data; a mapping on a
/// dropped server is removed with it.
pub(crate) fn diff_user_mappings(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.user_mappings, &ctx.branch.user_mappings);
    let mut changes = Vec::new();

    for mapping in parts.created {
        changes.push(Change::Fdw(FdwChange::CreateUserMapping(mapping.clone())));
    }

    for (old, new) in parts.altered {
        let options = option_actions(&old.options, &new.options);
        if !options.is_empty() {
            changes.push(Change::Fdw(FdwChange::AlterUserMapping {
                server: new.server.clone(),
                role: new.role.clone(),
                options,
            }));
        }
    }

    for mapping in parts.dropped {
        let server_survives = ctx
            .branch
            .foreign_servers
            .contains_key(&ObjectId::foreign_server(&mapping.server));
        let role_survives = mapping.role.eq_ignore_ascii_case("public")
            || ctx.branch.roles.contains_key(&ObjectId::role(&mapping.role));
        if server_survives && role_survives {
            changes.push(Change::Fdw(FdwChange::DropUserMapping(mapping.clone())));
        }
    }

    changes
}

/// Foreign-table diff. The server is non-alterable; columns follow
/// the shared column rules; table options use the `OPTIONS` syntax.
pub(crate) fn diff_foreign_tables(ctx: &DiffContext<'_>) -> Vec<Change> {
    let parts = partition(&ctx.main.foreign_tables, &ctx.branch.foreign_tables);
    let mut changes = Vec::new();

    for table in parts.created {
        changes.push(Change::Fdw(FdwChange::CreateForeignTable {
            table: table.clone(),
            type_deps: ctx.column_type_deps(&table.columns),
        }));
        let relation = RelationRef::foreign_table(&table.schema, &table.name);
        for column in &table.columns {
            changes.extend(comment_change(
                ObjectRef::Column {
                    schema: relation.schema.clone(),
                    table: relation.name.clone(),
                    name: column.name.clone(),
                },
                None,
                column.comment.as_ref(),
            ));
        }
        changes.extend(comment_change(
            ObjectRef::ForeignTable {
                schema: table.schema.clone(),
                name: table.name.clone(),
            },
            None,
            table.comment.as_ref(),
        ));
    }

    for (old, new) in parts.altered {
        if old.server != new.server {
            changes.push(Change::Fdw(FdwChange::DropForeignTable(old.clone())));
            changes.push(Change::Fdw(FdwChange::CreateForeignTable {
                table: new.clone(),
                type_deps: ctx.column_type_deps(&new.columns),
            }));
            changes.extend(comment_change(
                ObjectRef::ForeignTable {
                    schema: new.schema.clone(),
                    name: new.name.clone(),
                },
                None,
                new.comment.as_ref(),
            ));
            continue;
        }
        let relation = RelationRef::foreign_table(&new.schema, &new.name);
        changes.extend(diff_columns(ctx, &relation, &old.columns, &new.columns));
        let options = option_actions(&old.options, &new.options);
        if !options.is_empty() {
            changes.push(Change::Fdw(FdwChange::AlterForeignTableOptions {
                schema: new.schema.clone(),
                name: new.name.clone(),
                options,
            }));
        }
        let target = ObjectRef::ForeignTable {
            schema: new.schema.clone(),
            name: new.name.clone(),
        };
        changes.extend(owner_change(target.clone(), &old.owner, &new.owner));
        changes.extend(comment_change(target, old.comment.as_ref(), new.comment.as_ref()));
    }

    for table in parts.dropped {
        changes.push(Change::Fdw(FdwChange::DropForeignTable(table.clone())));
    }

    changes
}
