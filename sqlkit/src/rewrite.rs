//! SQL text rewriting: single-row normalization, COUNT synthesis and
//! named-parameter binding.
//!
//! These are pattern substitutions over the SQL text, not a parser. They
//! recognise the shapes produced by ordinary hand-written `SELECT` queries:
//!
//! - the first `LIMIT` keyword anywhere in the text is treated as *the*
//!   limit clause, even when it belongs to a subquery;
//! - the first `FROM` after `SELECT` is treated as the outer `FROM`, so
//!   projections containing subqueries are rewritten incorrectly;
//! - multi-statement text is rewritten as if it were one statement.
//!
//! Callers with SQL outside these shapes should hand-write the count or
//! single-row query instead.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::value::{NamedArgs, Value};

/// Everything before the limit clause, the limit expression (`n`, `n, m`,
/// `n OFFSET m`, or placeholders), and everything after it.
static LIMIT_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)^(.*?)\s+LIMIT\s+([^\s,;)]+(?:\s*,\s*[^\s,;)]+)?(?:\s+OFFSET\s+[^\s,;)]+)?)(.*)$",
    )
    .expect("limit pattern is valid")
});

static GROUP_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bGROUP\s+BY\b").expect("group by pattern is valid"));

static SELECT_FROM_ORDER_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*SELECT\s+.*?\s+FROM\s+(.*)\s+ORDER\s+BY\s+.*$")
        .expect("order by pattern is valid")
});

static SELECT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*SELECT\s+.*?\s+FROM\s+(.*)$").expect("select pattern is valid")
});

/// `@name`, where the name runs until whitespace, a comma or `)`.
static NAMED_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([^\s,)]+)").expect("named parameter pattern is valid"));

/// SQL rewritten from named to positional placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSql {
    /// SQL text with every `@name` replaced by `?`
    pub sql: String,
    /// Values in placeholder order
    pub values: Vec<Value>,
}

fn trim_statement(sql: &str) -> &str {
    sql.trim_end_matches(|c: char| c.is_whitespace() || c == ';')
}

/// Whether the text contains something that looks like a `LIMIT` clause.
pub fn has_limit(sql: &str) -> bool {
    LIMIT_CLAUSE.is_match(sql)
}

/// Normalize a query for a single-row fetch.
///
/// SQL that already carries a limit clause has that clause removed and is
/// otherwise left as is. SQL without one gets ` LIMIT 1` appended (after
/// dropping any trailing semicolon).
pub fn single_row_sql(sql: &str) -> String {
    single_row_query(sql, Vec::new()).0
}

/// [`single_row_sql`] plus the matching parameter list.
///
/// Placeholders inside a stripped limit (`LIMIT ?`, `LIMIT ?, ?`,
/// `LIMIT ? OFFSET ?`) take their values with them: the values at those
/// positions are removed so the rewritten SQL and its parameters still line
/// up. Positions are found by counting `?` in the text before the limit.
pub fn single_row_query(sql: &str, mut params: Vec<Value>) -> (String, Vec<Value>) {
    let Some(caps) = LIMIT_CLAUSE.captures(sql) else {
        return (format!("{} LIMIT 1", trim_statement(sql)), params);
    };

    let before = caps[1].matches('?').count();
    let in_limit = caps[2].matches('?').count();
    if in_limit > 0 && params.len() >= before + in_limit {
        params.drain(before..before + in_limit);
    }
    trace!(limit = &caps[2], dropped = in_limit, "stripped limit clause");
    (format!("{}{}", &caps[1], &caps[3]), params)
}

/// Turn a query into one that counts its rows.
///
/// Rules, first match wins:
/// 1. SQL with a `LIMIT` or `GROUP BY` clause is wrapped whole:
///    `SELECT COUNT(1) FROM (<sql>) AS tmp`.
/// 2. `SELECT <cols> FROM <rest> ORDER BY <order>` becomes
///    `SELECT COUNT(1) FROM <rest>`.
/// 3. `SELECT <cols> FROM <rest>` becomes `SELECT COUNT(1) FROM <rest>`.
///
/// Anything else is returned unchanged.
pub fn count_sql(sql: &str) -> String {
    let statement = trim_statement(sql);
    if LIMIT_CLAUSE.is_match(statement) || GROUP_BY.is_match(statement) {
        return format!("SELECT COUNT(1) FROM ({}) AS tmp", statement);
    }
    if let Some(caps) = SELECT_FROM_ORDER_BY.captures(statement) {
        return format!("SELECT COUNT(1) FROM {}", &caps[1]);
    }
    if let Some(caps) = SELECT_FROM.captures(statement) {
        return format!("SELECT COUNT(1) FROM {}", &caps[1]);
    }
    statement.to_string()
}

/// Replace `@name` placeholders with positional `?` placeholders.
///
/// Every occurrence must resolve against `args`; the first unresolved one
/// fails the whole call with [`Error::MissingParameter`] naming the token.
/// SQL without placeholders, or a call without `args`, comes back unchanged
/// with no values.
pub fn parse_named_sql(sql: &str, args: Option<&NamedArgs>) -> Result<NamedSql> {
    let unchanged = || NamedSql {
        sql: sql.to_string(),
        values: Vec::new(),
    };

    let Some(args) = args else {
        return Ok(unchanged());
    };

    let mut values = Vec::new();
    for caps in NAMED_PARAM.captures_iter(sql) {
        match args.get(&caps[1]) {
            Some(value) => values.push(value.clone()),
            None => return Err(Error::MissingParameter(caps[0].to_string())),
        }
    }

    if values.is_empty() {
        return Ok(unchanged());
    }

    Ok(NamedSql {
        sql: NAMED_PARAM.replace_all(sql, "?").into_owned(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::named_args;

    #[test]
    fn test_single_row_appends_limit() {
        assert_eq!(single_row_sql("SELECT * FROM t"), "SELECT * FROM t LIMIT 1");
        assert_eq!(
            single_row_sql("select id from t where a = ?;\n"),
            "select id from t where a = ? LIMIT 1"
        );
    }

    #[test]
    fn test_single_row_appends_exactly_once() {
        let out = single_row_sql("SELECT * FROM users ORDER BY id");
        assert_eq!(out.matches("LIMIT").count(), 1);
        assert!(out.ends_with(" LIMIT 1"));
    }

    #[test]
    fn test_single_row_strips_existing_limit() {
        assert_eq!(single_row_sql("SELECT * FROM t LIMIT 10"), "SELECT * FROM t");
        assert_eq!(
            single_row_sql("SELECT * FROM t limit 5, 10"),
            "SELECT * FROM t"
        );
        assert_eq!(
            single_row_sql("SELECT * FROM t LIMIT ? OFFSET ?"),
            "SELECT * FROM t"
        );
    }

    #[test]
    fn test_single_row_keeps_text_after_limit() {
        assert_eq!(
            single_row_sql("SELECT * FROM t LIMIT 10 FOR UPDATE"),
            "SELECT * FROM t FOR UPDATE"
        );
    }

    #[test]
    fn test_single_row_query_drops_limit_values() {
        let (sql, params) = single_row_query(
            "SELECT id FROM t WHERE id > ? ORDER BY id LIMIT ?",
            vec![Value::Int(0), Value::Int(2)],
        );
        assert_eq!(sql, "SELECT id FROM t WHERE id > ? ORDER BY id");
        assert_eq!(params, vec![Value::Int(0)]);

        let (sql, params) = single_row_query(
            "SELECT * FROM t WHERE a = ? LIMIT ?, ? FOR UPDATE",
            vec![Value::Int(1), Value::Int(5), Value::Int(10)],
        );
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? FOR UPDATE");
        assert_eq!(params, vec![Value::Int(1)]);

        let (_, params) = single_row_query(
            "SELECT * FROM t WHERE a = ? LIMIT ? OFFSET ?",
            vec![Value::Int(1), Value::Int(5), Value::Int(10)],
        );
        assert_eq!(params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_single_row_query_keeps_values_for_literal_limit() {
        let (sql, params) =
            single_row_query("SELECT * FROM t WHERE a = ? LIMIT 10", vec![Value::Int(1)]);
        assert_eq!(sql, "SELECT * FROM t WHERE a = ?");
        assert_eq!(params, vec![Value::Int(1)]);

        let (sql, params) = single_row_query("SELECT * FROM t WHERE a = ?", vec![Value::Int(1)]);
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? LIMIT 1");
        assert_eq!(params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_single_row_limit_in_subquery_is_unsupported() {
        // The first LIMIT wins even when it belongs to a subquery.
        assert_eq!(
            single_row_sql("SELECT * FROM (SELECT id FROM t LIMIT 5) x"),
            "SELECT * FROM (SELECT id FROM t) x"
        );
    }

    #[test]
    fn test_count_wraps_limit() {
        assert_eq!(
            count_sql("SELECT id FROM t LIMIT 10"),
            "SELECT COUNT(1) FROM (SELECT id FROM t LIMIT 10) AS tmp"
        );
    }

    #[test]
    fn test_count_wraps_group_by() {
        assert_eq!(
            count_sql("select dept, count(*) from emp group by dept"),
            "SELECT COUNT(1) FROM (select dept, count(*) from emp group by dept) AS tmp"
        );
    }

    #[test]
    fn test_count_group_by_with_order_by_wraps() {
        let sql = "SELECT dept FROM emp GROUP BY dept ORDER BY dept";
        assert_eq!(
            count_sql(sql),
            format!("SELECT COUNT(1) FROM ({}) AS tmp", sql)
        );
    }

    #[test]
    fn test_count_drops_order_by() {
        assert_eq!(
            count_sql("SELECT a,b FROM t ORDER BY a"),
            "SELECT COUNT(1) FROM t"
        );
        assert_eq!(
            count_sql("SELECT a FROM t WHERE b = ? ORDER BY a DESC, b"),
            "SELECT COUNT(1) FROM t WHERE b = ?"
        );
    }

    #[test]
    fn test_count_plain_select() {
        assert_eq!(
            count_sql("SELECT id, name FROM users WHERE active = 1"),
            "SELECT COUNT(1) FROM users WHERE active = 1"
        );
        assert_eq!(
            count_sql("SELECT *\nFROM users\nWHERE id > ?;"),
            "SELECT COUNT(1) FROM users\nWHERE id > ?"
        );
    }

    #[test]
    fn test_count_non_select_unchanged() {
        assert_eq!(count_sql("SHOW TABLES"), "SHOW TABLES");
    }

    #[test]
    fn test_count_subquery_in_projection_is_unsupported() {
        // The first FROM is taken as the outer one.
        assert_eq!(
            count_sql("SELECT a, (SELECT max(x) FROM y) AS m FROM t"),
            "SELECT COUNT(1) FROM y) AS m FROM t"
        );
    }

    #[test]
    fn test_count_multi_statement_is_unsupported() {
        // Both statements end up inside the count.
        assert_eq!(
            count_sql("SELECT a FROM t; SELECT b FROM u"),
            "SELECT COUNT(1) FROM t; SELECT b FROM u"
        );
    }

    #[test]
    fn test_parse_named_in_order() {
        let args = named_args! { "id" => 5, "name" => "x" };
        let parsed =
            parse_named_sql("SELECT * FROM t WHERE id=@id AND name=@name", Some(&args)).unwrap();
        assert_eq!(parsed.sql, "SELECT * FROM t WHERE id=? AND name=?");
        assert_eq!(parsed.values, vec![Value::Int(5), Value::Text("x".into())]);
    }

    #[test]
    fn test_parse_named_repeats_and_delimiters() {
        let args = named_args! { "a" => 1, "b" => 2 };
        let parsed = parse_named_sql("INSERT INTO t VALUES (@a,@b, @a)", Some(&args)).unwrap();
        assert_eq!(parsed.sql, "INSERT INTO t VALUES (?,?, ?)");
        assert_eq!(
            parsed.values,
            vec![Value::Int(1), Value::Int(2), Value::Int(1)]
        );
    }

    #[test]
    fn test_parse_named_missing_parameter() {
        let args = named_args! { "id" => 5 };
        let err = parse_named_sql("SELECT * FROM t WHERE id=@id AND name=@name", Some(&args))
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref t) if t == "@name"));
    }

    #[test]
    fn test_parse_named_without_placeholders_or_args() {
        let args = named_args! { "id" => 5 };
        let parsed = parse_named_sql("SELECT 1", Some(&args)).unwrap();
        assert_eq!(parsed.sql, "SELECT 1");
        assert!(parsed.values.is_empty());

        let parsed = parse_named_sql("SELECT * FROM t WHERE id=@id", None).unwrap();
        assert_eq!(parsed.sql, "SELECT * FROM t WHERE id=@id");
        assert!(parsed.values.is_empty());
    }

    #[test]
    fn test_has_limit() {
        assert!(has_limit("select * from t limit 3"));
        assert!(!has_limit("select unlimited from t"));
    }
}
