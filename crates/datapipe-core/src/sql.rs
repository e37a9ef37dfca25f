//! SQL execution against a DuckDB connection.

use base64::Engine;
use duckdb::Connection;
use serde::Serialize;

/// Upper bound on columns read from one row.
const MAX_COLUMNS: usize = 1024;

/// Result of running one SQL body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SqlOutcome {
    /// Row-returning statement.
    Rows {
        columns: Vec<String>,
        rows: Vec<serde_json::Value>,
    },
    /// Statement without a result set.
    Executed { affected_rows: usize },
}

impl SqlOutcome {
    pub fn row_count(&self) -> usize {
        match self {
            SqlOutcome::Rows { rows, .. } => rows.len(),
            SqlOutcome::Executed { affected_rows } => *affected_rows,
        }
    }

    pub fn rows(&self) -> &[serde_json::Value] {
        match self {
            SqlOutcome::Rows { rows, .. } => rows,
            SqlOutcome::Executed { .. } => &[],
        }
    }
}

/// Keywords that open a row-returning statement.
const ROW_KEYWORDS: [&str; 9] = [
    "SELECT", "WITH", "FROM", "VALUES", "SUMMARIZE", "DESCRIBE", "SHOW", "PRAGMA", "EXPLAIN",
];

/// Skip whitespace, `--` and `/* */` comments, and opening parentheses.
fn statement_head(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        rest = rest.trim_start().trim_start_matches('(');
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, tail)| tail);
        } else if rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
            continue;
        } else {
            return rest;
        }
    }
}

/// Returns true when the statement produces a result set.
pub fn returns_rows(sql: &str) -> bool {
    let head = statement_head(sql);
    ROW_KEYWORDS.iter().any(|kw| {
        head.get(..kw.len())
            .is_some_and(|word| word.eq_ignore_ascii_case(kw))
    })
}

/// Run `sql` with positional `params`.
///
/// Non-row statements without params go through `execute_batch`, so they may
/// contain several statements.
pub fn run_sql(
    conn: &Connection,
    sql: &str,
    params: &[serde_json::Value],
) -> duckdb::Result<SqlOutcome> {
    if !returns_rows(sql) && params.is_empty() {
        conn.execute_batch(sql)?;
        return Ok(SqlOutcome::Executed { affected_rows: 0 });
    }

    let duckdb_params: Vec<Box<dyn duckdb::ToSql>> =
        params.iter().map(json_to_duckdb_param).collect();
    let param_refs: Vec<&dyn duckdb::ToSql> = duckdb_params.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(sql)?;

    if !returns_rows(sql) {
        let affected = stmt.execute(param_refs.as_slice())?;
        return Ok(SqlOutcome::Executed {
            affected_rows: affected,
        });
    }

    let mapped = stmt.query_map(param_refs.as_slice(), |row| {
        let mut values = Vec::new();
        for idx in 0..MAX_COLUMNS {
            match row.get::<_, duckdb::types::Value>(idx) {
                Ok(v) => values.push(duckdb_value_to_json(&v)),
                Err(_) => break,
            }
        }
        Ok(values)
    })?;

    let mut raw_rows = Vec::new();
    for row in mapped {
        raw_rows.push(row?);
    }

    // Column metadata is only available once the statement has run.
    let columns: Vec<String> = (0..stmt.column_count())
        .map(|i| stmt.column_name(i).map(|v| v.to_string()).unwrap_or_default())
        .collect();

    let rows = raw_rows
        .into_iter()
        .map(|values| {
            let obj: serde_json::Map<String, serde_json::Value> = values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (columns.get(i).cloned().unwrap_or_default(), v))
                .collect();
            serde_json::Value::Object(obj)
        })
        .collect();

    Ok(SqlOutcome::Rows { columns, rows })
}

/// Bind one run-config value. Arrays and objects bind as their JSON text,
/// which DuckDB casts when the placeholder is typed `JSON`.
fn json_to_duckdb_param(value: &serde_json::Value) -> Box<dyn duckdb::ToSql> {
    use serde_json::Value;

    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Box::new(i),
            (None, Some(u), _) => Box::new(u),
            (None, None, Some(f)) => Box::new(f),
            (None, None, None) => Box::new(n.to_string()),
        },
        Value::String(s) => Box::new(s.clone()),
        Value::Array(_) | Value::Object(_) => Box::new(value.to_string()),
    }
}

/// Convert one result cell. Wide integers and decimals become strings, blobs
/// become base64, temporal values keep DuckDB's integer encoding.
fn duckdb_value_to_json(value: &duckdb::types::Value) -> serde_json::Value {
    use duckdb::types::Value;
    use serde_json::json;

    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => json!(*b),
        Value::TinyInt(n) => json!(*n),
        Value::SmallInt(n) => json!(*n),
        Value::Int(n) => json!(*n),
        Value::BigInt(n) => json!(*n),
        Value::HugeInt(n) => json!(n.to_string()),
        Value::UTinyInt(n) => json!(*n),
        Value::USmallInt(n) => json!(*n),
        Value::UInt(n) => json!(*n),
        Value::UBigInt(n) => json!(*n),
        Value::Float(f) => json!(*f),
        Value::Double(f) => json!(*f),
        Value::Decimal(d) => json!(d.to_string()),
        Value::Text(s) => json!(s),
        Value::Blob(b) => json!(base64::engine::general_purpose::STANDARD.encode(b)),
        Value::Timestamp(_, t) => json!(t),
        Value::Date32(d) => json!(*d),
        Value::Time64(_, t) => json!(*t),
        Value::Interval { months, days, nanos } => json!({
            "months": months,
            "days": days,
            "nanos": nanos
        }),
        Value::List(items) | Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(duckdb_value_to_json).collect())
        }
        Value::Enum(s) => json!(s),
        Value::Struct(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), duckdb_value_to_json(v)))
                .collect(),
        ),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (map_key(k), duckdb_value_to_json(v)))
                .collect(),
        ),
        Value::Union(inner) => duckdb_value_to_json(inner),
    }
}

fn map_key(key: &duckdb::types::Value) -> String {
    match duckdb_value_to_json(key) {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("  select 1"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!returns_rows("create table t (id integer)"));
        assert!(!returns_rows("insert into t values (1)"));
    }

    #[test]
    fn test_returns_rows_skips_comments_and_parens() {
        assert!(returns_rows("-- monthly totals\nselect 1"));
        assert!(returns_rows("/* header */ (select 1) union all (select 2)"));
        assert!(returns_rows("values (1), (2)"));
        assert!(returns_rows("pragma table_info('t')"));
        assert!(!returns_rows("-- seed\ncreate table t (id integer)"));
        assert!(!returns_rows("-- only a comment"));
        assert!(!returns_rows("sel"));
    }

    #[test]
    fn test_commented_select_returns_rows() {
        let outcome = run_sql(&conn(), "-- note\nselect 7 as n", &[]).unwrap();
        assert_eq!(outcome.rows()[0]["n"], 7);
    }

    #[test]
    fn test_simple_select() {
        let outcome = run_sql(&conn(), "select 1 as num, 'hello' as msg", &[]).unwrap();
        match &outcome {
            SqlOutcome::Rows { columns, rows } => {
                assert_eq!(columns, &vec!["num".to_string(), "msg".to_string()]);
                assert_eq!(rows[0]["num"], 1);
                assert_eq!(rows[0]["msg"], "hello");
            }
            other => panic!("expected rows, got {:?}", other),
        }
        assert_eq!(outcome.row_count(), 1);
    }

    #[test]
    fn test_select_with_params() {
        let params = vec![serde_json::json!(42), serde_json::json!("test")];
        let outcome = run_sql(&conn(), "select ? as num, ? as str", &params).unwrap();
        let rows = outcome.rows();
        assert_eq!(rows[0]["num"], 42);
        assert_eq!(rows[0]["str"], "test");
    }

    #[test]
    fn test_batch_then_query() {
        let conn = conn();
        run_sql(
            &conn,
            "create table t (id integer, name varchar); insert into t values (1, 'Alice'), (2, 'Bob');",
            &[],
        )
        .unwrap();

        let outcome = run_sql(&conn, "select name from t order by id", &[]).unwrap();
        assert_eq!(outcome.row_count(), 2);
        assert_eq!(outcome.rows()[1]["name"], "Bob");
    }

    #[test]
    fn test_parameterised_insert_reports_affected_rows() {
        let conn = conn();
        run_sql(&conn, "create table t (id integer)", &[]).unwrap();
        let outcome = run_sql(&conn, "insert into t values (?)", &[serde_json::json!(7)]).unwrap();
        assert_eq!(outcome, SqlOutcome::Executed { affected_rows: 1 });
    }

    #[test]
    fn test_null_param() {
        let outcome = run_sql(&conn(), "select ? is null as is_null", &[serde_json::Value::Null])
            .unwrap();
        assert_eq!(outcome.rows()[0]["is_null"], true);
    }

    #[test]
    fn test_invalid_sql_is_error() {
        assert!(run_sql(&conn(), "select * from no_such_table", &[]).is_err());
    }
}
