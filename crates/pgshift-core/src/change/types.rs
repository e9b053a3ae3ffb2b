//! Type and sequence changes.

use serde::{Deserialize, Serialize};

use super::{push_role, Operation};
use crate::catalog::{CompositeAttribute, Sequence, SequenceOwner, TypeDef, TypeKind};
use crate::error::Result;
use crate::ident::ObjectId;
use crate::render::{quote_ident, quote_literal, quote_qualified, RenderOptions};

/// In-place alteration of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainAction {
    /// SET DEFAULT / DROP DEFAULT.
    SetDefault(Option<String>),
    /// SET NOT NULL / DROP NOT NULL.
    SetNotNull(bool),
    /// ADD CONSTRAINT name CHECK (…).
    AddConstraint {
        /// Constraint name.
        name: String,
        /// Check expression.
        check: String,
    },
    /// DROP CONSTRAINT name.
    DropConstraint {
        /// Constraint name.
        name: String,
    },
}

/// Type changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeChange {
    /// CREATE TYPE (enum or composite) or CREATE DOMAIN.
    Create {
        /// The type to create.
        def: TypeDef,
        /// Types referenced by composite attributes or the domain base
        /// type that are themselves part of this change set.
        type_deps: Vec<ObjectId>,
    },
    /// ALTER TYPE … ADD VALUE for an appended enum label.
    AddEnumLabel {
        /// Schema.
        schema: String,
        /// Enum name.
        name: String,
        /// New label.
        label: String,
    },
    /// ALTER TYPE … ADD ATTRIBUTE.
    AddAttribute {
        /// Schema.
        schema: String,
        /// Composite name.
        name: String,
        /// The new attribute.
        attribute: CompositeAttribute,
        /// Dependency of the attribute type, if in this change set.
        type_dep: Option<ObjectId>,
    },
    /// ALTER TYPE … DROP ATTRIBUTE.
    DropAttribute {
        /// Schema.
        schema: String,
        /// Composite name.
        name: String,
        /// Attribute to drop.
        attribute: String,
    },
    /// ALTER DOMAIN ….
    AlterDomain {
        /// Schema.
        schema: String,
        /// Domain name.
        name: String,
        /// The alteration.
        action: DomainAction,
    },
    /// DROP TYPE or DROP DOMAIN.
    Drop(TypeDef),
}

impl TypeChange {
    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Create { .. } => Operation::Create,
            Self::Drop(_) => Operation::Drop,
            _ => Operation::Alter,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Create { def, .. } | Self::Drop(def) => def.stable_id(),
            Self::AddEnumLabel { schema, name, .. }
            | Self::AddAttribute { schema, name, .. }
            | Self::DropAttribute { schema, name, .. }
            | Self::AlterDomain { schema, name, .. } => ObjectId::type_(schema, name),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Create { def, .. } => vec![def.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(def) => vec![def.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Create { def, type_deps } => {
                let mut ids = vec![ObjectId::schema(&def.schema)];
                push_role(&mut ids, &def.owner);
                ids.extend(type_deps.iter().cloned());
                ids
            }
            Self::Drop(def) => {
                let mut ids = vec![ObjectId::schema(&def.schema)];
                push_role(&mut ids, &def.owner);
                match &def.kind {
                    TypeKind::Composite { attributes } => {
                        for attribute in attributes {
                            ids.extend(super::qualified_type_id(&attribute.type_name));
                        }
                    }
                    TypeKind::Domain { base_type, .. } => {
                        ids.extend(super::qualified_type_id(base_type));
                    }
                    TypeKind::Enum { .. } => {}
                }
                ids.retain(|id| id != &def.stable_id());
                ids
            }
            Self::AddEnumLabel { schema, name, .. }
            | Self::DropAttribute { schema, name, .. }
            | Self::AlterDomain { schema, name, .. } => vec![ObjectId::type_(schema, name)],
            Self::AddAttribute {
                schema,
                name,
                type_dep,
                ..
            } => {
                let mut ids = vec![ObjectId::type_(schema, name)];
                ids.extend(type_dep.iter().cloned());
                ids
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Create { def, .. } => Ok(render_create_type(def, opts)),
            Self::AddEnumLabel {
                schema,
                name,
                label,
            } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER TYPE"),
                quote_qualified(schema, name),
                opts.kw("ADD VALUE"),
                quote_literal(label)
            )),
            Self::AddAttribute {
                schema,
                name,
                attribute,
                ..
            } => {
                let mut sql = format!(
                    "{} {} {} {} {}",
                    opts.kw("ALTER TYPE"),
                    quote_qualified(schema, name),
                    opts.kw("ADD ATTRIBUTE"),
                    quote_ident(&attribute.name),
                    attribute.type_name
                );
                if let Some(collation) = &attribute.collation {
                    sql.push_str(&format!(" {} {}", opts.kw("COLLATE"), quote_ident(collation)));
                }
                Ok(sql)
            }
            Self::DropAttribute {
                schema,
                name,
                attribute,
            } => Ok(format!(
                "{} {} {} {}",
                opts.kw("ALTER TYPE"),
                quote_qualified(schema, name),
                opts.kw("DROP ATTRIBUTE"),
                quote_ident(attribute)
            )),
            Self::AlterDomain {
                schema,
                name,
                action,
            } => {
                let head = format!("{} {}", opts.kw("ALTER DOMAIN"), quote_qualified(schema, name));
                Ok(match action {
                    DomainAction::SetDefault(Some(expr)) => {
                        format!("{head} {} {expr}", opts.kw("SET DEFAULT"))
                    }
                    DomainAction::SetDefault(None) => {
                        format!("{head} {}", opts.kw("DROP DEFAULT"))
                    }
                    DomainAction::SetNotNull(true) => {
                        format!("{head} {}", opts.kw("SET NOT NULL"))
                    }
                    DomainAction::SetNotNull(false) => {
                        format!("{head} {}", opts.kw("DROP NOT NULL"))
                    }
                    DomainAction::AddConstraint { name, check } => format!(
                        "{head} {} {} {} ({check})",
                        opts.kw("ADD CONSTRAINT"),
                        quote_ident(name),
                        opts.kw("CHECK")
                    ),
                    DomainAction::DropConstraint { name } => {
                        format!("{head} {} {}", opts.kw("DROP CONSTRAINT"), quote_ident(name))
                    }
                })
            }
            Self::Drop(def) => {
                let keyword = match def.kind {
                    TypeKind::Domain { .. } => "DROP DOMAIN",
                    _ => "DROP TYPE",
                };
                Ok(format!(
                    "{} {}",
                    opts.kw(keyword),
                    quote_qualified(&def.schema, &def.name)
                ))
            }
        }
    }
}

fn render_create_type(def: &TypeDef, opts: &RenderOptions) -> String {
    let name = quote_qualified(&def.schema, &def.name);
    match &def.kind {
        TypeKind::Enum { labels } => {
            let labels: Vec<String> = labels.iter().map(|l| quote_literal(l)).collect();
            format!(
                "{} {} {} {} ({})",
                opts.kw("CREATE TYPE"),
                name,
                opts.kw("AS"),
                opts.kw("ENUM"),
                labels.join(", ")
            )
        }
        TypeKind::Composite { attributes } => {
            let attrs: Vec<String> = attributes
                .iter()
                .map(|a| {
                    let mut rendered = format!("{} {}", quote_ident(&a.name), a.type_name);
                    if let Some(collation) = &a.collation {
                        rendered
                            .push_str(&format!(" {} {}", opts.kw("COLLATE"), quote_ident(collation)));
                    }
                    rendered
                })
                .collect();
            format!(
                "{} {} {} {}",
                opts.kw("CREATE TYPE"),
                name,
                opts.kw("AS"),
                opts.block(&attrs)
            )
        }
        TypeKind::Domain {
            base_type,
            not_null,
            default,
            constraints,
        } => {
            let mut sql = format!("{} {} {} {base_type}", opts.kw("CREATE DOMAIN"), name, opts.kw("AS"));
            if let Some(expr) = default {
                sql.push_str(&format!(" {} {expr}", opts.kw("DEFAULT")));
            }
            if *not_null {
                sql.push_str(&format!(" {}", opts.kw("NOT NULL")));
            }
            for constraint in constraints {
                sql.push_str(&format!(
                    " {} {} {} ({})",
                    opts.kw("CONSTRAINT"),
                    quote_ident(&constraint.name),
                    opts.kw("CHECK"),
                    constraint.check
                ));
            }
            sql
        }
    }
}

/// Minimal delta for `ALTER SEQUENCE`. Rendered as a single statement
/// carrying only the changed clauses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceDelta {
    /// AS data_type.
    pub data_type: Option<String>,
    /// START WITH.
    pub start: Option<i64>,
    /// INCREMENT BY.
    pub increment: Option<i64>,
    /// MINVALUE; inner `None` renders NO MINVALUE.
    pub min_value: Option<Option<i64>>,
    /// MAXVALUE; inner `None` renders NO MAXVALUE.
    pub max_value: Option<Option<i64>>,
    /// CACHE.
    pub cache: Option<i64>,
    /// CYCLE / NO CYCLE.
    pub cycle: Option<bool>,
    /// OWNED BY column; inner `None` renders OWNED BY NONE.
    pub owned_by: Option<Option<SequenceOwner>>,
}

impl SequenceDelta {
    /// True when no property changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Sequence changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceChange {
    /// CREATE SEQUENCE.
    Create(Sequence),
    /// ALTER SEQUENCE with the changed clauses.
    Alter {
        /// Schema.
        schema: String,
        /// Sequence name.
        name: String,
        /// Changed clauses.
        delta: SequenceDelta,
    },
    /// DROP SEQUENCE.
    Drop(Sequence),
}

impl SequenceChange {
    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::Alter { .. } => Operation::Alter,
            Self::Drop(_) => Operation::Drop,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Create(s) | Self::Drop(s) => s.stable_id(),
            Self::Alter { schema, name, .. } => ObjectId::sequence(schema, name),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(s) => vec![s.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(s) => vec![s.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(s) | Self::Drop(s) => {
                let mut ids = vec![ObjectId::schema(&s.schema)];
                push_role(&mut ids, &s.owner);
                if let Some(owned) = &s.owned_by {
                    ids.push(ObjectId::column(&owned.schema, &owned.table, &owned.column));
                }
                ids
            }
            Self::Alter {
                schema,
                name,
                delta,
            } => {
                let mut ids = vec![ObjectId::sequence(schema, name)];
                if let Some(Some(owned)) = &delta.owned_by {
                    ids.push(ObjectId::column(&owned.schema, &owned.table, &owned.column));
                }
                ids
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Create(s) => {
                let mut sql = format!(
                    "{} {} {} {}",
                    opts.kw("CREATE SEQUENCE"),
                    quote_qualified(&s.schema, &s.name),
                    opts.kw("AS"),
                    s.data_type
                );
                sql.push_str(&format!(" {} {}", opts.kw("INCREMENT BY"), s.increment));
                match s.min_value {
                    Some(min) => sql.push_str(&format!(" {} {min}", opts.kw("MINVALUE"))),
                    None => sql.push_str(&format!(" {}", opts.kw("NO MINVALUE"))),
                }
                match s.max_value {
                    Some(max) => sql.push_str(&format!(" {} {max}", opts.kw("MAXVALUE"))),
                    None => sql.push_str(&format!(" {}", opts.kw("NO MAXVALUE"))),
                }
                sql.push_str(&format!(" {} {}", opts.kw("START WITH"), s.start));
                sql.push_str(&format!(" {} {}", opts.kw("CACHE"), s.cache));
                if s.cycle {
                    sql.push_str(&format!(" {}", opts.kw("CYCLE")));
                }
                if let Some(owned) = &s.owned_by {
                    sql.push_str(&format!(
                        " {} {}.{}",
                        opts.kw("OWNED BY"),
                        quote_qualified(&owned.schema, &owned.table),
                        quote_ident(&owned.column)
                    ));
                }
                Ok(sql)
            }
            Self::Alter {
                schema,
                name,
                delta,
            } => {
                let mut sql = format!(
                    "{} {}",
                    opts.kw("ALTER SEQUENCE"),
                    quote_qualified(schema, name)
                );
                if let Some(data_type) = &delta.data_type {
                    sql.push_str(&format!(" {} {data_type}", opts.kw("AS")));
                }
                if let Some(increment) = delta.increment {
                    sql.push_str(&format!(" {} {increment}", opts.kw("INCREMENT BY")));
                }
                match delta.min_value {
                    Some(Some(min)) => sql.push_str(&format!(" {} {min}", opts.kw("MINVALUE"))),
                    Some(None) => sql.push_str(&format!(" {}", opts.kw("NO MINVALUE"))),
                    None => {}
                }
                match delta.max_value {
                    Some(Some(max)) => sql.push_str(&format!(" {} {max}", opts.kw("MAXVALUE"))),
                    Some(None) => sql.push_str(&format!(" {}", opts.kw("NO MAXVALUE"))),
                    None => {}
                }
                if let Some(start) = delta.start {
                    sql.push_str(&format!(" {} {start}", opts.kw("START WITH")));
                }
                if let Some(cache) = delta.cache {
                    sql.push_str(&format!(" {} {cache}", opts.kw("CACHE")));
                }
                match delta.cycle {
                    Some(true) => sql.push_str(&format!(" {}", opts.kw("CYCLE"))),
                    Some(false) => sql.push_str(&format!(" {}", opts.kw("NO CYCLE"))),
                    None => {}
                }
                match &delta.owned_by {
                    Some(Some(owned)) => sql.push_str(&format!(
                        " {} {}.{}",
                        opts.kw("OWNED BY"),
                        quote_qualified(&owned.schema, &owned.table),
                        quote_ident(&owned.column)
                    )),
                    Some(None) => sql.push_str(&format!(" {} {}", opts.kw("OWNED BY"), opts.kw("NONE"))),
                    None => {}
                }
                Ok(sql)
            }
            Self::Drop(s) => Ok(format!(
                "{} {}",
                opts.kw("DROP SEQUENCE"),
                quote_qualified(&s.schema, &s.name)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_enum_type() {
        let change = TypeChange::Create {
            def: TypeDef {
                schema: "public".into(),
                name: "status".into(),
                owner: "postgres".into(),
                kind: TypeKind::Enum {
                    labels: vec!["open".into(), "closed".into()],
                },
                comment: None,
            },
            type_deps: Vec::new(),
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "CREATE TYPE public.status AS ENUM ('open', 'closed')"
        );
    }

    #[test]
    fn add_enum_label() {
        let change = TypeChange::AddEnumLabel {
            schema: "public".into(),
            name: "status".into(),
            label: "archived".into(),
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "ALTER TYPE public.status ADD VALUE 'archived'"
        );
    }

    #[test]
    fn create_domain() {
        let change = TypeChange::Create {
            def: TypeDef {
                schema: "public".into(),
                name: "email".into(),
                owner: "postgres".into(),
                kind: TypeKind::Domain {
                    base_type: "text".into(),
                    not_null: true,
                    default: None,
                    constraints: vec![crate::catalog::DomainConstraint {
                        name: "email_check".into(),
                        check: "VALUE ~ '@'".into(),
                    }],
                },
                comment: None,
            },
            type_deps: Vec::new(),
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "CREATE DOMAIN public.email AS text NOT NULL CONSTRAINT email_check CHECK (VALUE ~ '@')"
        );
    }

    #[test]
    fn alter_sequence_minimal_delta() {
        let change = SequenceChange::Alter {
            schema: "public".into(),
            name: "s".into(),
            delta: SequenceDelta {
                increment: Some(2),
                cycle: Some(false),
                ..SequenceDelta::default()
            },
        };
        assert_eq!(
            change.to_sql(&RenderOptions::default()).unwrap(),
            "ALTER SEQUENCE public.s INCREMENT BY 2 NO CYCLE"
        );
    }
}
