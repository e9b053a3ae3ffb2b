//! Foreign data wrappers, servers, user mappings, and foreign tables.

use serde::{Deserialize, Serialize};

use super::relations::Column;
use super::OptionList;
use crate::ident::ObjectId;

/// A foreign data wrapper.
///
/// Identity: `name`. Handler, validator, and options all have
/// `ALTER FOREIGN DATA WRAPPER` forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignDataWrapper {
    /// Wrapper name.
    pub name: String,
    /// Handler function, if any (qualified name).
    pub handler: Option<String>,
    /// Validator function, if any (qualified name).
    pub validator: Option<String>,
    /// Wrapper options as a flat `[key, value, …]` list.
    pub options: OptionList,
    /// Owning role.
    pub owner: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl ForeignDataWrapper {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::foreign_data_wrapper(&self.name)
    }
}

/// A foreign server.
///
/// Identity: `name`. The wrapper and the server type are
/// non-alterable; version and options are alterable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignServer {
    /// Server name.
    pub name: String,
    /// Foreign data wrapper the server uses.
    pub wrapper: String,
    /// Server type, if any.
    pub server_type: Option<String>,
    /// Server version, if any.
    pub version: Option<String>,
    /// Server options as a flat `[key, value, …]` list.
    pub options: OptionList,
    /// Owning role.
    pub owner: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl ForeignServer {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::foreign_server(&self.name)
    }
}

/// A user mapping for a foreign server.
///
/// Identity: `(server, role)`. Only the options are data, and they are
/// alterable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMapping {
    /// Server name.
    pub server: String,
    /// Mapped role, or `PUBLIC`.
    pub role: String,
    /// Mapping options as a flat `[key, value, …]` list. Typically
    /// contains credentials; see the masking hook.
    pub options: OptionList,
}

impl UserMapping {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::user_mapping(&self.server, &self.role)
    }
}

/// A foreign table.
///
/// Identity: `(schema, name)`. The server is non-alterable; columns
/// and options follow the same rules as ordinary tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignTable {
    /// Schema.
    pub schema: String,
    /// Foreign table name.
    pub name: String,
    /// Foreign server.
    pub server: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Table options as a flat `[key, value, …]` list.
    pub options: OptionList,
    /// Owning role.
    pub owner: String,
    /// Comment, if any.
    pub comment: Option<String>,
}

impl ForeignTable {
    /// Stable identifier.
    #[must_use]
    pub fn stable_id(&self) -> ObjectId {
        ObjectId::foreign_table(&self.schema, &self.name)
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Stable identifiers of all columns.
    #[must_use]
    pub fn column_ids(&self) -> Vec<ObjectId> {
        self.columns
            .iter()
            .map(|c| ObjectId::column(&self.schema, &self.name, &c.name))
            .collect()
    }
}
