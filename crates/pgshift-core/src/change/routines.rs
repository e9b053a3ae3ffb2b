//! Function, trigger, rule, and policy changes.

use serde::{Deserialize, Serialize};

use super::{push_role, Operation};
use crate::catalog::{Function, Policy, Rule, RoutineKind, Trigger};
use crate::error::Result;
use crate::ident::ObjectId;
use crate::render::{quote_ident, quote_qualified, RenderOptions};

/// Function and procedure changes.
///
/// A changed body or language is replaced in place via
/// `CREATE OR REPLACE`; only a changed return type (part of the
/// non-alterable set) produces a drop-and-create pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineChange {
    /// CREATE [OR REPLACE] FUNCTION/PROCEDURE.
    Create {
        /// The routine.
        function: Function,
        /// Replace an existing routine instead of creating a new one.
        or_replace: bool,
    },
    /// DROP FUNCTION/PROCEDURE.
    Drop(Function),
}

impl RoutineChange {
    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Create {
                or_replace: false, ..
            } => Operation::Create,
            Self::Create {
                or_replace: true, ..
            } => Operation::Alter,
            Self::Drop(_) => Operation::Drop,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Create { function, .. } | Self::Drop(function) => function.stable_id(),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Create {
                function,
                or_replace: false,
            } => vec![function.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(function) => vec![function.stable_id()],
            Self::Create { .. } => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Create { function, .. } | Self::Drop(function) => {
                let mut ids = vec![ObjectId::schema(&function.schema)];
                push_role(&mut ids, &function.owner);
                ids.extend(function.depends_on.iter().cloned());
                if let Self::Create {
                    or_replace: true, ..
                } = self
                {
                    ids.push(function.stable_id());
                }
                ids
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Create {
                function,
                or_replace,
            } => {
                let keyword = match (function.kind, or_replace) {
                    (RoutineKind::Function, false) => "CREATE FUNCTION",
                    (RoutineKind::Function, true) => "CREATE OR REPLACE FUNCTION",
                    (RoutineKind::Procedure, false) => "CREATE PROCEDURE",
                    (RoutineKind::Procedure, true) => "CREATE OR REPLACE PROCEDURE",
                };
                let mut sql = format!(
                    "{} {}({})",
                    opts.kw(keyword),
                    quote_qualified(&function.schema, &function.name),
                    function.signature
                );
                if !function.returns.is_empty() {
                    sql.push_str(&format!(" {} {}", opts.kw("RETURNS"), function.returns));
                }
                sql.push_str(&format!(
                    " {} {}",
                    opts.kw("LANGUAGE"),
                    quote_ident(&function.language)
                ));
                sql.push_str(&format!(" {} $function$\n{}\n$function$", opts.kw("AS"), function.body));
                Ok(sql)
            }
            Self::Drop(function) => {
                let keyword = match function.kind {
                    RoutineKind::Function => "DROP FUNCTION",
                    RoutineKind::Procedure => "DROP PROCEDURE",
                };
                Ok(format!(
                    "{} {}({})",
                    opts.kw(keyword),
                    quote_qualified(&function.schema, &function.name),
                    function.arguments
                ))
            }
        }
    }
}

/// Trigger changes. Nothing about a trigger's firing definition is
/// alterable, so triggers only appear as create/drop pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerChange {
    /// CREATE TRIGGER.
    Create(Trigger),
    /// DROP TRIGGER.
    Drop(Trigger),
}

impl TriggerChange {
    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::Drop(_) => Operation::Drop,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Create(t) | Self::Drop(t) => t.stable_id(),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(t) => vec![t.stable_id()],
            Self::Drop(_) => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(t) => vec![t.stable_id()],
            Self::Create(_) => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(t) | Self::Drop(t) => {
                vec![ObjectId::table(&t.schema, &t.table), t.function_id()]
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Create(t) => {
                let mut sql = format!(
                    "{} {} {} {} {} {}",
                    opts.kw("CREATE TRIGGER"),
                    quote_ident(&t.name),
                    opts.kw(&t.timing),
                    t.events.join(&format!(" {} ", opts.kw("OR"))),
                    opts.kw("ON"),
                    quote_qualified(&t.schema, &t.table)
                );
                if t.for_each_row {
                    sql.push_str(&format!(" {}", opts.kw("FOR EACH ROW")));
                } else {
                    sql.push_str(&format!(" {}", opts.kw("FOR EACH STATEMENT")));
                }
                if let Some(when) = &t.when_clause {
                    sql.push_str(&format!(" {} ({when})", opts.kw("WHEN")));
                }
                sql.push_str(&format!(
                    " {} {}()",
                    opts.kw("EXECUTE FUNCTION"),
                    quote_qualified(&t.function_schema, &t.function_name)
                ));
                Ok(sql)
            }
            Self::Drop(t) => Ok(format!(
                "{} {} {} {}",
                opts.kw("DROP TRIGGER"),
                quote_ident(&t.name),
                opts.kw("ON"),
                quote_qualified(&t.schema, &t.table)
            )),
        }
    }
}

/// Rewrite-rule changes. Rules are stored as their full `CREATE RULE`
/// statement, so any difference is a drop-and-create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleChange {
    /// CREATE RULE (the stored statement, verbatim).
    Create(Rule),
    /// DROP RULE.
    Drop(Rule),
}

impl RuleChange {
    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::Drop(_) => Operation::Drop,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Create(r) | Self::Drop(r) => r.stable_id(),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(r) => vec![r.stable_id()],
            Self::Drop(_) => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(r) => vec![r.stable_id()],
            Self::Create(_) => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(r) | Self::Drop(r) => vec![ObjectId::table(&r.schema, &r.table)],
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Create(r) => Ok(r.definition.clone()),
            Self::Drop(r) => Ok(format!(
                "{} {} {} {}",
                opts.kw("DROP RULE"),
                quote_ident(&r.name),
                opts.kw("ON"),
                quote_qualified(&r.schema, &r.table)
            )),
        }
    }
}

/// Policy changes. The permissive flag and the command are
/// non-alterable; roles and both expressions can change in one
/// `ALTER POLICY` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyChange {
    /// CREATE POLICY.
    Create(Policy),
    /// ALTER POLICY with the changed clauses.
    Alter {
        /// Schema.
        schema: String,
        /// Owning table.
        table: String,
        /// Policy name.
        name: String,
        /// New role list, if changed.
        roles: Option<Vec<String>>,
        /// New USING expression, if changed.
        using_expr: Option<String>,
        /// New WITH CHECK expression, if changed.
        check_expr: Option<String>,
    },
    /// DROP POLICY.
    Drop(Policy),
}

impl PolicyChange {
    pub(crate) fn operation(&self) -> Operation {
        match self {
            Self::Create(_) => Operation::Create,
            Self::Alter { .. } => Operation::Alter,
            Self::Drop(_) => Operation::Drop,
        }
    }

    pub(crate) fn target_id(&self) -> ObjectId {
        match self {
            Self::Create(p) | Self::Drop(p) => p.stable_id(),
            Self::Alter {
                schema,
                table,
                name,
                ..
            } => ObjectId::policy(schema, table, name),
        }
    }

    pub(crate) fn creates(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(p) => vec![p.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn drops(&self) -> Vec<ObjectId> {
        match self {
            Self::Drop(p) => vec![p.stable_id()],
            _ => Vec::new(),
        }
    }

    pub(crate) fn requires(&self) -> Vec<ObjectId> {
        match self {
            Self::Create(p) | Self::Drop(p) => {
                let mut ids = vec![ObjectId::table(&p.schema, &p.table)];
                for role in &p.roles {
                    push_role(&mut ids, role);
                }
                ids
            }
            Self::Alter {
                schema,
                table,
                name,
                roles,
                ..
            } => {
                let mut ids = vec![
                    ObjectId::policy(schema, table, name),
                    ObjectId::table(schema, table),
                ];
                for role in roles.iter().flatten() {
                    push_role(&mut ids, role);
                }
                ids
            }
        }
    }

    pub(crate) fn to_sql(&self, opts: &RenderOptions) -> Result<String> {
        match self {
            Self::Create(p) => {
                let mut sql = format!(
                    "{} {} {} {}",
                    opts.kw("CREATE POLICY"),
                    quote_ident(&p.name),
                    opts.kw("ON"),
                    quote_qualified(&p.schema, &p.table)
                );
                if !p.permissive {
                    sql.push_str(&format!(" {} {}", opts.kw("AS"), opts.kw("RESTRICTIVE")));
                }
                sql.push_str(&format!(" {} {}", opts.kw("FOR"), opts.kw(p.command.as_sql())));
                if !p.roles.is_empty() {
                    let roles: Vec<String> = p.roles.iter().map(|r| quote_ident(r)).collect();
                    sql.push_str(&format!(" {} {}", opts.kw("TO"), roles.join(", ")));
                }
                if let Some(using) = &p.using_expr {
                    sql.push_str(&format!(" {} ({using})", opts.kw("USING")));
                }
                if let Some(check) = &p.check_expr {
                    sql.push_str(&format!(" {} ({check})", opts.kw("WITH CHECK")));
                }
                Ok(sql)
            }
            Self::Alter {
                schema,
                table,
                name,
                roles,
                using_expr,
                check_expr,
            } => {
                let mut sql = format!(
                    "{} {} {} {}",
                    opts.kw("ALTER POLICY"),
                    quote_ident(name),
                    opts.kw("ON"),
                    quote_qualified(schema, table)
                );
                if let Some(roles) = roles {
                    let rendered: Vec<String> = if roles.is_empty() {
                        vec![opts.kw("PUBLIC")]
                    } else {
                        roles.iter().map(|r| quote_ident(r)).collect()
                    };
                    sql.push_str(&format!(" {} {}", opts.kw("TO"), rendered.join(", ")));
                }
                if let Some(using) = using_expr {
                    sql.push_str(&format!(" {} ({using})", opts.kw("USING")));
                }
                if let Some(check) = check_expr {
                    sql.push_str(&format!(" {} ({check})", opts.kw("WITH CHECK")));
                }
                Ok(sql)
            }
            Self::Drop(p) => Ok(format!(
                "{} {} {} {}",
                opts.kw("DROP POLICY"),
                quote_ident(&p.name),
                opts.kw("ON"),
                quote_qualified(&p.schema, &p.table)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PolicyCommand;

    fn audit_trigger() -> Trigger {
        Trigger {
            schema: "public".into(),
            table: "users".into(),
            name: "users_audit".into(),
            timing: "AFTER".into(),
            events: vec!["INSERT".into(), "UPDATE".into()],
            for_each_row: true,
            when_clause: None,
            function_schema: "public".into(),
            function_name: "audit".into(),
            comment: None,
        }
    }

    #[test]
    fn create_trigger_sql() {
        let sql = TriggerChange::Create(audit_trigger())
            .to_sql(&RenderOptions::default())
            .unwrap();
        assert_eq!(
            sql,
            "CREATE TRIGGER users_audit AFTER INSERT OR UPDATE ON public.users \
             FOR EACH ROW EXECUTE FUNCTION public.audit()"
        );
    }

    #[test]
    fn trigger_requires_table_and_function() {
        let change = TriggerChange::Create(audit_trigger());
        assert_eq!(
            change.requires(),
            vec![
                ObjectId::table("public", "users"),
                ObjectId::function("public", "audit", ""),
            ]
        );
    }

    #[test]
    fn create_policy_sql() {
        let policy = Policy {
            schema: "public".into(),
            table: "docs".into(),
            name: "docs_owner".into(),
            permissive: true,
            command: PolicyCommand::Select,
            roles: vec!["app".into()],
            using_expr: Some("owner = current_user".into()),
            check_expr: None,
            comment: None,
        };
        let sql = PolicyChange::Create(policy).to_sql(&RenderOptions::default()).unwrap();
        assert_eq!(
            sql,
            "CREATE POLICY docs_owner ON public.docs FOR SELECT TO app USING (owner = current_user)"
        );
    }

    #[test]
    fn replace_function_keeps_identity() {
        let function = Function {
            schema: "public".into(),
            name: "add_one".into(),
            arguments: "integer".into(),
            kind: RoutineKind::Function,
            returns: "integer".into(),
            language: "sql".into(),
            signature: "a integer".into(),
            body: "SELECT a + 1".into(),
            owner: "postgres".into(),
            depends_on: Vec::new(),
            comment: None,
        };
        let change = RoutineChange::Create {
            function,
            or_replace: true,
        };
        // An in-place replacement neither creates nor drops the id.
        assert!(change.creates().is_empty());
        assert!(change.drops().is_empty());
        assert_eq!(change.operation(), Operation::Alter);
        let sql = change.to_sql(&RenderOptions::default()).unwrap();
        assert!(sql.starts_with("CREATE OR REPLACE FUNCTION public.add_one(a integer)"));
        assert!(sql.contains("RETURNS integer"));
    }
}
