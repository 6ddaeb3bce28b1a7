//! Catalog metadata records and dialect identification.
//!
//! Records here are transient: a catalog reader produces them, the renderer
//! projects them into document cells, and they are dropped.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Catalog dialects schemadoc can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `information_schema` engines: MySQL, MariaDB, Apache Doris
    MySql,
    /// `pg_catalog` engines: PostgreSQL, Kingbase
    Postgres,
}

impl Dialect {
    /// All supported dialects in display order.
    pub const ALL: [Self; 2] = [Self::MySql, Self::Postgres];

    /// URL schemes recognized for this dialect, canonical scheme first.
    pub const fn schemes(self) -> &'static [&'static str] {
        match self {
            Self::MySql => &["mysql", "mariadb", "doris"],
            Self::Postgres => &["postgres", "postgresql", "kingbase", "kingbase8"],
        }
    }

    /// The scheme the sqlx driver for this dialect expects.
    pub const fn canonical_scheme(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Detects the dialect from a connection URL's scheme.
    ///
    /// A leading `jdbc:` prefix is ignored, so JDBC-style URLs such as
    /// `jdbc:kingbase8://host/db` are accepted.
    pub fn from_url(url: &str) -> Option<Self> {
        let url = url.strip_prefix("jdbc:").unwrap_or(url);
        let (scheme, _) = url.split_once("://")?;
        let scheme = scheme.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|dialect| dialect.schemes().contains(&scheme.as_str()))
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MySql => write!(f, "mysql"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for Dialect {
    type Err = crate::error::SchemaDocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|dialect| dialect.schemes().contains(&lower.as_str()))
            .ok_or_else(|| {
                crate::error::SchemaDocError::configuration(format!(
                    "Unknown dialect '{}': expected one of mysql, postgres",
                    s
                ))
            })
    }
}

/// One table in the target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    /// Table name as stored in the catalog
    pub name: String,
    /// Free-text table comment; empty when the catalog has none
    pub comment: String,
}

impl TableMeta {
    /// Creates a table record; a missing comment becomes the empty string.
    pub fn new(name: impl Into<String>, comment: Option<String>) -> Self {
        Self {
            name: name.into(),
            comment: comment.unwrap_or_default(),
        }
    }
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name
    pub name: String,
    /// Declared type as formatted by the catalog, e.g. `varchar(64)`
    pub type_decl: String,
    /// Column comment; empty when the catalog has none
    pub comment: String,
    /// 1-based position in the table definition
    pub ordinal_position: u32,
    /// Maximum character length for character types
    pub max_length: Option<i64>,
    /// Whether the column belongs to the table's primary key
    pub is_primary_key: bool,
}

/// Display name and purpose derived from a table comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableComment {
    /// Human-readable table name
    pub display_name: String,
    /// What the table is for
    pub purpose: String,
}

/// Labels an administrator may prefix each comment facet with.
const FACET_LABELS: [&str; 2] = ["表中文名称", "表用途"];

impl TableComment {
    /// Splits a raw table comment into display name and purpose.
    ///
    /// With a non-empty `delimiter` present in `raw`, the text before the
    /// first occurrence becomes the display name and the rest the purpose;
    /// each facet is trimmed and loses an optional `表中文名称：` / `表用途：`
    /// label. Otherwise both facets receive the raw comment unchanged.
    ///
    /// # Example
    /// ```rust
    /// use schemadoc_core::models::TableComment;
    ///
    /// let parsed = TableComment::parse("表中文名称：订单|表用途：记录订单", Some("|"));
    /// assert_eq!(parsed.display_name, "订单");
    /// assert_eq!(parsed.purpose, "记录订单");
    /// ```
    pub fn parse(raw: &str, delimiter: Option<&str>) -> Self {
        let split = delimiter
            .filter(|d| !d.is_empty())
            .and_then(|d| raw.split_once(d));

        match split {
            Some((name, purpose)) => Self {
                display_name: strip_facet_label(name),
                purpose: strip_facet_label(purpose),
            },
            None => Self {
                display_name: raw.to_string(),
                purpose: raw.to_string(),
            },
        }
    }
}

fn strip_facet_label(facet: &str) -> String {
    let facet = facet.trim();
    for label in FACET_LABELS {
        if let Some(rest) = facet.strip_prefix(label) {
            let rest = rest.trim_start();
            if let Some(value) = rest.strip_prefix('：').or_else(|| rest.strip_prefix(':')) {
                return value.trim().to_string();
            }
        }
    }
    facet.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(Dialect::from_url("mysql://h:9030/db"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_url("doris://h/db"), Some(Dialect::MySql));
        assert_eq!(
            Dialect::from_url("jdbc:mysql://h:3306/db"),
            Some(Dialect::MySql)
        );
        assert_eq!(
            Dialect::from_url("postgresql://h/db"),
            Some(Dialect::Postgres)
        );
        assert_eq!(
            Dialect::from_url("jdbc:kingbase8://h:54321/db?currentSchema=app"),
            Some(Dialect::Postgres)
        );
        assert_eq!(Dialect::from_url("sqlite://file.db"), None);
        assert_eq!(Dialect::from_url("localhost:3306"), None);
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("MySQL".parse::<Dialect>().ok(), Some(Dialect::MySql));
        assert_eq!("kingbase".parse::<Dialect>().ok(), Some(Dialect::Postgres));
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_dialect_serde_lowercase() {
        let json = serde_json::to_string(&Dialect::Postgres).unwrap();
        assert_eq!(json, "\"postgres\"");
        let parsed: Dialect = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(parsed, Dialect::MySql);
    }

    #[test]
    fn test_table_meta_missing_comment() {
        let table = TableMeta::new("orders", None);
        assert_eq!(table.comment, "");
    }

    #[test]
    fn test_comment_split_with_labels() {
        let parsed = TableComment::parse("表中文名称：用户 | 表用途: 保存账号信息", Some("|"));
        assert_eq!(parsed.display_name, "用户");
        assert_eq!(parsed.purpose, "保存账号信息");
    }

    #[test]
    fn test_comment_split_without_labels() {
        let parsed = TableComment::parse("Customer orders|One row per checkout", Some("|"));
        assert_eq!(parsed.display_name, "Customer orders");
        assert_eq!(parsed.purpose, "One row per checkout");
    }

    #[test]
    fn test_comment_split_on_first_delimiter_only() {
        let parsed = TableComment::parse("Audit|who|when", Some("|"));
        assert_eq!(parsed.display_name, "Audit");
        assert_eq!(parsed.purpose, "who|when");
    }

    #[test]
    fn test_comment_pass_through_without_delimiter() {
        let parsed = TableComment::parse("订单主表", Some("|"));
        assert_eq!(parsed.display_name, "订单主表");
        assert_eq!(parsed.purpose, "订单主表");
    }

    #[test]
    fn test_comment_pass_through_when_splitting_disabled() {
        for delimiter in [None, Some("")] {
            let parsed = TableComment::parse("a|b", delimiter);
            assert_eq!(parsed.display_name, "a|b");
            assert_eq!(parsed.purpose, "a|b");
        }
    }

    #[test]
    fn test_comment_empty() {
        let parsed = TableComment::parse("", Some("|"));
        assert_eq!(parsed.display_name, "");
        assert_eq!(parsed.purpose, "");
    }
}
