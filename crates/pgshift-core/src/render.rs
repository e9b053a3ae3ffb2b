//! Rendering options and SQL text helpers.
//!
//! Layout concerns only: keyword casing, identifier quoting, literal
//! escaping, and column-list indentation. Nothing in this module may
//! change the meaning or ordering of a statement.

use serde::{Deserialize, Serialize};

/// Keyword casing for generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordCase {
    /// `CREATE TABLE`
    #[default]
    Upper,
    /// `create table`
    Lower,
}

/// Layout options passed through to every change's `to_sql`.
///
/// These affect text layout only, never statement content or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Keyword casing.
    pub keyword_case: KeywordCase,
    /// Indentation width for multi-line statements.
    pub indent_width: usize,
    /// Soft line-width target for wrapped lists.
    pub line_width: usize,
    /// Place commas at the start of continuation lines instead of the
    /// end of the previous line.
    pub leading_commas: bool,
    /// Align column type names in `CREATE TABLE` column lists.
    pub align_types: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            keyword_case: KeywordCase::Upper,
            indent_width: 4,
            line_width: 100,
            leading_commas: false,
            align_types: false,
        }
    }
}

impl RenderOptions {
    /// Applies the configured keyword case. Keywords are written
    /// uppercase at the call sites.
    #[must_use]
    pub fn kw(&self, keyword: &str) -> String {
        match self.keyword_case {
            KeywordCase::Upper => keyword.to_string(),
            KeywordCase::Lower => keyword.to_lowercase(),
        }
    }

    /// One level of indentation.
    #[must_use]
    pub fn indent(&self) -> String {
        " ".repeat(self.indent_width)
    }

    /// Joins pre-rendered list items into a parenthesized, one-per-line
    /// block honoring `leading_commas`.
    #[must_use]
    pub fn block(&self, items: &[String]) -> String {
        let indent = self.indent();
        let mut out = String::from("(\n");
        for (i, item) in items.iter().enumerate() {
            if self.leading_commas {
                let sep = if i == 0 { "  " } else { ", " };
                out.push_str(&format!("{indent}{sep}{item}\n"));
            } else {
                let sep = if i + 1 == items.len() { "" } else { "," };
                out.push_str(&format!("{indent}{item}{sep}\n"));
            }
        }
        out.push(')');
        out
    }
}

// Keywords that force quoting when used as bare identifiers. Not the
// full grammar list; the common collisions seen in real schemas.
const RESERVED: &[&str] = &[
    "all", "and", "any", "array", "as", "asc", "between", "both", "case", "cast", "check",
    "collate", "column", "constraint", "create", "cross", "current_date", "current_time",
    "current_timestamp", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "exists", "false", "for", "foreign", "from", "full", "grant", "group", "having",
    "in", "initially", "inner", "intersect", "into", "is", "join", "leading", "left", "like",
    "limit", "localtime", "localtimestamp", "natural", "not", "null", "offset", "on", "only",
    "or", "order", "outer", "primary", "references", "right", "select", "session_user", "some",
    "table", "then", "to", "trailing", "true", "union", "unique", "user", "using", "when",
    "where", "with",
];

/// Quotes an SQL identifier if needed.
///
/// Lower-case identifiers matching `[a-z_][a-z0-9_$]*` that are not
/// reserved words pass through unquoted; everything else is wrapped in
/// double quotes with embedded quotes doubled.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    let safe = !name.is_empty()
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
        && !RESERVED.contains(&name);
    if safe {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Quotes a schema-qualified name.
#[must_use]
pub fn quote_qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Quotes a string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifiers_stay_bare() {
        assert_eq!(quote_ident("users"), "users");
        assert_eq!(quote_ident("_private"), "_private");
        assert_eq!(quote_ident("t1$x"), "t1$x");
    }

    #[test]
    fn unsafe_identifiers_are_quoted() {
        assert_eq!(quote_ident("User"), "\"User\"");
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("has space"), "\"has space\"");
        assert_eq!(quote_ident("has\"quote"), "\"has\"\"quote\"");
        assert_eq!(quote_ident("1st"), "\"1st\"");
    }

    #[test]
    fn literal_escaping() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal("plain"), "'plain'");
    }

    #[test]
    fn keyword_casing() {
        let upper = RenderOptions::default();
        assert_eq!(upper.kw("CREATE TABLE"), "CREATE TABLE");

        let lower = RenderOptions {
            keyword_case: KeywordCase::Lower,
            ..RenderOptions::default()
        };
        assert_eq!(lower.kw("CREATE TABLE"), "create table");
    }

    #[test]
    fn block_trailing_commas() {
        let opts = RenderOptions::default();
        let block = opts.block(&["a integer".into(), "b text".into()]);
        assert_eq!(block, "(\n    a integer,\n    b text\n)");
    }

    #[test]
    fn block_leading_commas() {
        let opts = RenderOptions {
            leading_commas: true,
            indent_width: 2,
            ..RenderOptions::default()
        };
        let block = opts.block(&["a integer".into(), "b text".into()]);
        assert_eq!(block, "(\n    a integer\n  , b text\n)");
    }
}
