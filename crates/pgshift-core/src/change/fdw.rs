//! Foreign-data changes: wrappers, servers, user mappings, and
//! foreign tables.

use serde::{Deserialize, Serialize};

use super::relations::render_column_block;
use super::{push_role, qualified_function_id, Operation, OptionActions};
use crate::catalog::{ForeignDataWrapper, ForeignServer, ForeignTable, UserMapping};
use crate::error::Result;
use crate::ident::{ObjectId, ObjectType};
use crate::render::{quote_ident, quote_literal, quote_qualified, RenderOptions};

/// Foreign-data changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FdwChange {
    /// CREATE FOREIGN DATA WRAPPER.
    CreateWrapper(ForeignDataWrapper),
    /// ALTER FOREIGN DATA WRAPPER with the changed clauses.
    AlterWrapper {
        /// Wrapper name.
        name: String,
        /// New handler; inner `None` renders NO HANDLER.
        handler: Option<Option<String>>,
        /// New validator; inner `None` renders NO VALIDATOR.
        validator: Option<Option<String>>,
        /// Option delta.
        options: OptionActions,
    },
    /// DROP FOREIGN DATA WRAPPER.
    DropWrapper(ForeignDataWrapper),
    /// CREATE SERVER.
    CreateServer(ForeignServer),
    /// ALTER SERVER with the changed clauses.
    AlterServer {
        /// Server name.
        name: String,
        /// New version, if changed.
        version: Option<String>,
        /// Option delta.
        options: OptionActions,
    },
    /// DROP SERVER.
    DropServer(ForeignServer),
    /// CREATE USER MAPPING.
    CreateUserMapping(UserMapping),
    /// ALTER USER MAPPING … OPTIONS (…).
    AlterUserMapping {
        /// Server name.
        server: String,
        /// Mapped role.
        role: String,
        /// Option delta.
        options: OptionActions,
    },
    /// DROP USER MAPPING.
    DropUserMapping(UserMapping),
    /// CREATE FOREIGN TABLE.
    CreateForeignTable {
        /// The foreign table.
        table: ForeignTable,
        /// Types referenced by column definitions that are part of
        /// this change set.
        type_deps: Vec<ObjectId>,
    },
    /// ALTER FOREIGN TABLE … OPTIONS (…).
    AlterForeignTableOptions {
        /// Schema.
        schema: String,
        /// Foreign table name.
        name: String,
        /// Option delta.
        options: OptionActions,
    },
    /// DROP FOREIGN TABLE.
    DropForeignTable(ForeignTable),
}

impl FdwChange {
    pub(crate) fn object_type(&self) -> ObjectType {
        match self {
            Self::CreateWrapper(_) | Self::AlterWrapper { .. } | Self::DropWrapper(_) => {
                ObjectType::ForeignDataWrapper
            }
            Self::CreateServer(_) | Self::AlterServer { .. } | Self::DropServer(_) => {
                ObjectType::ForeignServer
            }
            Self::CreateUserMapping(_)
            | Self::AlterUserMapping { .. }
            | Self::DropUserMapping(_) => ObjectType::UserMapping,
            Self::CreateForeignTable { .. }
            | Self::AlterForeignTableOptions { .. }
            | Self::DropForeignTable(_) => ObjectType::ForeignTable,
        }
    }

    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::CreateWrapper(_)
            | Self::CreateServer(_)
            | Self::CreateUserMapping(_)
            | Self::CreateForeignTable { .. } => Operation::Create,
            Self::AlterWrapper { .. }
            | Self::AlterServer { .. }
            | Self::AlterUserMapping { .. }
            | Self::AlterForeignTableOptions { .. } => Operation::Alter,
            Self::DropWrapper(_)
            | Self::DropServer(_)
            | Self::DropUserMapping(_)
            | Self::DropForeignTable(_) => Operation::Drop,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::CreateWrapper(w) | Self::DropWrapper(w) => w.stable_id(),
            Self::AlterWrapper { name, .. } => ObjectId::foreign_data_wrapper(name),
            Self::CreateServer(s) | Self::DropServer(s) => s.stable_id(),
            Self::AlterServer { name, .. } => ObjectId::foreign_server(name),
            Self::CreateUserMapping(m) | Self::DropUserMapping(m) => m.stable_id(),
            Self::AlterUserMapping { server, role, .. } => ObjectId::user_mapping(server, role),
            Self::CreateForeignTable { table, .. } | Self::DropForeignTable(table) => {
                table.stable_id()
            }
            Self::AlterForeignTableOptions { schema, name, .. } => {
                ObjectId::foreign_table(schema, name)
            }
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::CreateWrapper(w) => vec![w.stable_id()],
            Self::CreateServer(s) => vec![s.stable_id()],
            Self::CreateUserMapping(m) => vec![m.stable_id()],
            Self::CreateForeignTable { table, .. } => {
                let mut ids = vec![table.stable_id()];
                ids.extend(table.column_ids());
                ids
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::DropWrapper(w) => vec![w.stable_id()],
            Self::DropServer(s) => vec![s.stable_id()],
            Self::DropUserMapping(m) => vec![m.stable_id()],
            Self::DropForeignTable(table) => {
                let mut ids = vec![table.stable_id()];
                ids.extend(table.column_ids());
                ids
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::CreateWrapper(w) | Self::DropWrapper(w) => {
                let mut ids = Vec::new();
                push_role(&mut ids, &w.owner);
                ids.extend(w.handler.as_deref().and_then(qualified_function_id));
                ids.extend(w.validator.as_deref().and_then(qualified_function_id));
                ids
            }
            Self::AlterWrapper {
                name,
                handler,
                validator,
                ..
            } => {
                let mut ids = vec![ObjectId::foreign_data_wrapper(name)];
                if let Some(Some(handler)) = handler {
                    ids.extend(qualified_function_id(handler));
                }
                if let Some(Some(validator)) = validator {
                    ids.extend(qualified_function_id(validator));
                }
                ids
            }
            Self::CreateServer(s) | Self::DropServer(s) => {
                let mut ids = vec![ObjectId::foreign_data_wrapper(&s.wrapper)];
                push_role(&mut ids, &s.owner);
                ids
            }
            Self::AlterServer { name, .. } => vec![ObjectId::foreign_server(name)],
            Self::CreateUserMapping(m) | Self::DropUserMapping(m) => {
                let mut ids = vec![ObjectId::foreign_server(&m.server)];
                push_role(&mut ids, &m.role);
                ids
            }
            Self::AlterUserMapping { server, role, .. } => {
                vec![
                    ObjectId::user_mapping(server, role),
                    ObjectId::foreign_server(server),
                ]
            }
            Self::CreateForeignTable { table, type_deps } => {
                let mut ids = vec![
                    ObjectId::schema(&table.schema),
                    ObjectId::foreign_server(&table.server),
                ];
                push_role(&mut ids, &table.owner);
                ids.extend(type_deps.iter().cloned());
                ids
            }
            Self::DropForeignTable(table) => {
                let mut ids = vec![
                    ObjectId::schema(&table.schema),
                    ObjectId::foreign_server(&table.server),
                ];
                push_role(&mut ids, &table.owner);
                for column in &table.columns {
                    ids.extend(super::qualified_type_id(&column.type_name));
                }
                ids
            }
            Self::AlterForeignTableOptions { schema, name, .. } => {
                vec![ObjectId::foreign_table(schema, name)]
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::CreateWrapper(w) => {
                let mut sql = format!(
                    "{} {}",
                    opts.kw("CREATE FOREIGN DATA WRAPPER"),
                    quote_ident(&w.name)
                );
                if let Some(handler) = &w.handler {
                    sql.push_str(&format!(" {} {handler}", opts.kw("HANDLER")));
                }
                if let Some(validator) = &w.validator {
                    sql.push_str(&format!(" {} {validator}", opts.kw("VALIDATOR")));
                }
                if !w.options.is_empty() {
                    sql.push_str(&format!(" {}", render_create_options(&w.options, opts)));
                }
                Ok(sql)
            }
            Self::AlterWrapper {
                name,
                handler,
                validator,
                options,
            } => {
                let mut sql = format!(
                    "{} {}",
                    opts.kw("ALTER FOREIGN DATA WRAPPER"),
                    quote_ident(name)
                );
                match handler {
                    Some(Some(handler)) => {
                        sql.push_str(&format!(" {} {handler}", opts.kw("HANDLER")));
                    }
                    Some(None) => sql.push_str(&format!(" {}", opts.kw("NO HANDLER"))),
                    None => {}
                }
                match validator {
                    Some(Some(validator)) => {
                        sql.push_str(&format!(" {} {validator}", opts.kw("VALIDATOR")));
                    }
                    Some(None) => sql.push_str(&format!(" {}", opts.kw("NO VALIDATOR"))),
                    None => {}
                }
                if !options.is_empty() {
                    sql.push_str(&format!(" {}", options.to_sql(opts)));
                }
                Ok(sql)
            }
            Self::DropWrapper(w) => Ok(format!(
                "{} {}",
                opts.kw("DROP FOREIGN DATA WRAPPER"),
                quote_ident(&w.name)
            )),
            Self::CreateServer(s) => {
                let mut sql = format!("{} {}", opts.kw("CREATE SERVER"), quote_ident(&s.name));
                if let Some(server_type) = &s.server_type {
                    sql.push_str(&format!(" {} {}", opts.kw("TYPE"), quote_literal(server_type)));
                }
                if let Some(version) = &s.version {
                    sql.push_str(&format!(" {} {}", opts.kw("VERSION"), quote_literal(version)));
                }
                sql.push_str(&format!(
                    " {} {}",
                    opts.kw("FOREIGN DATA WRAPPER"),
                    quote_ident(&s.wrapper)
                ));
                if !s.options.is_empty() {
                    sql.push_str(&format!(" {}", render_create_options(&s.options, opts)));
                }
                Ok(sql)
            }
            Self::AlterServer {
                name,
                version,
                options,
            } => {
                let mut sql = format!("{} {}", opts.kw("ALTER SERVER"), quote_ident(name));
                if let Some(version) = version {
                    sql.push_str(&format!(" {} {}", opts.kw("VERSION"), quote_literal(version)));
                }
                if !options.is_empty() {
                    sql.push_str(&format!(" {}", options.to_sql(opts)));
                }
                Ok(sql)
            }
            Self::DropServer(s) => {
                Ok(format!("{} {}", opts.kw("DROP SERVER"), quote_ident(&s.name)))
            }
            Self::CreateUserMapping(m) => {
                let mut sql = format!(
                    "{} {} {} {}",
                    opts.kw("CREATE USER MAPPING FOR"),
                    render_mapping_role(&m.role, opts),
                    opts.kw("SERVER"),
                    quote_ident(&m.server)
                );
                if !m.options.is_empty() {
                    sql.push_str(&format!(" {}", render_create_options(&m.options, opts)));
                }
                Ok(sql)
            }
            Self::AlterUserMapping {
                server,
                role,
                options,
            } => Ok(format!(
                "{} {} {} {} {}",
                opts.kw("ALTER USER MAPPING FOR"),
                render_mapping_role(role, opts),
                opts.kw("SERVER"),
                quote_ident(server),
                options.to_sql(opts)
            )),
            Self::DropUserMapping(m) => Ok(format!(
                "{} {} {} {}",
                opts.kw("DROP USER MAPPING FOR"),
                render_mapping_role(&m.role, opts),
                opts.kw("SERVER"),
                quote_ident(&m.server)
            )),
            Self::CreateForeignTable { table, .. } => {
                let mut sql = format!(
                    "{} {} {}",
                    opts.kw("CREATE FOREIGN TABLE"),
                    quote_qualified(&table.schema, &table.name),
                    render_column_block(&table.columns, opts)
                );
                sql.push_str(&format!(" {} {}", opts.kw("SERVER"), quote_ident(&table.server)));
                if !table.options.is_empty() {
                    sql.push_str(&format!(" {}", render_create_options(&table.options, opts)));
                }
                Ok(sql)
            }
            Self::AlterForeignTableOptions {
                schema,
                name,
                options,
            } => Ok(format!(
                "{} {} {}",
                opts.kw("ALTER FOREIGN TABLE"),
                quote_qualified(schema, name),
                options.to_sql(opts)
            )),
            Self::DropForeignTable(table) => Ok(format!(
                "{} {}",
                opts.kw("DROP FOREIGN TABLE"),
                quote_qualified(&table.schema, &table.name)
            )),
        }
    }
}

fn render_mapping_role(role: &str, opts: &RenderOptions) -> String {
    if role.eq_ignore_ascii_case("public") {
        opts.kw("PUBLIC")
    } else {
        quote_ident(role)
    }
}

/// Renders the `OPTIONS (key 'value', …)` clause of a CREATE
/// statement from a flat option list.
fn render_create_options(options: &[String], opts: &RenderOptions) -> String {
    let map = crate::catalog::options_map(options);
    let pairs: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("{key} {}", quote_literal(value)))
        .collect();
    format!("{} ({})", opts.kw("OPTIONS"), pairs.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ForeignServer {
        ForeignServer {
            name: "files".into(),
            wrapper: "file_fdw".into(),
            server_type: None,
            version: None,
            options: vec!["host".into(), "example.org".into()],
            owner: "postgres".into(),
            comment: None,
        }
    }

    #[test]
    fn create_server_sql() {
        let sql = FdwChange::CreateServer(server())
            .to_sql(&RenderOptions::default())
            .unwrap();
        assert_eq!(
            sql,
            "CREATE SERVER files FOREIGN DATA WRAPPER file_fdw OPTIONS (host 'example.org')"
        );
    }

    #[test]
    fn server_requires_wrapper() {
        let change = FdwChange::CreateServer(server());
        assert!(change
            .requires()
            .contains(&ObjectId::foreign_data_wrapper("file_fdw")));
    }

    #[test]
    fn alter_user_mapping_options() {
        let change = FdwChange::AlterUserMapping {
            server: "files".into(),
            role: "app".into(),
            options: OptionActions {
                add: Vec::new(),
                set: vec![("password".into(), "secret".into())],
                drop: vec!["user".into()],
            },
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "ALTER USER MAPPING FOR app SERVER files OPTIONS (SET password 'secret', DROP \"user\")"
        );
    }

    #[test]
    fn user_mapping_for_public() {
        let mapping = UserMapping {
            server: "files".into(),
            role: "PUBLIC".into(),
            options: Vec::new(),
        };
        let change = FdwChange::CreateUserMapping(mapping);
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "CREATE USER MAPPING FOR PUBLIC SERVER files"
        );
        // PUBLIC is a pseudo-role; no role edge is emitted.
        assert_eq!(change.requires(), vec![ObjectId::foreign_server("files")]);
    }
}
