use chrono::NaiveDate;
use sqlparser::ast::{self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use thiserror::Error;
use ulid::Ulid;

use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertReservation(ReservationRequest),
    SelectReservations,
    SelectReservation {
        id: Ulid,
    },
    DeleteReservation {
        id: Ulid,
    },
    SelectFreeUmbrellas {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

/// Column order for `INSERT INTO reservations VALUES (...)` without a column list.
const POSITIONAL_COLUMNS: [&str; 5] = [
    "umbrella_id",
    "number_of_seats",
    "start_date",
    "end_date",
    "customer",
];

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    if table != "reservations" {
        return Err(SqlError::UnknownTable(table));
    }
    let values = extract_insert_values(insert)?;

    let columns: Vec<String> = if insert.columns.is_empty() {
        POSITIONAL_COLUMNS.iter().map(|c| c.to_string()).collect()
    } else {
        insert.columns.iter().map(|c| c.value.to_lowercase()).collect()
    };
    if values.len() > columns.len() || values.len() < 4 {
        return Err(SqlError::WrongArity("reservations", 4, values.len()));
    }

    let (mut umbrella_id, mut seats, mut start_date, mut end_date, mut customer) =
        (None, None, None, None, None);
    for (column, value) in columns.iter().zip(&values) {
        match column.as_str() {
            "umbrella_id" => umbrella_id = Some(parse_i64_expr(value)?),
            "number_of_seats" => seats = Some(parse_i64_expr(value)?),
            "start_date" => start_date = Some(parse_date_expr(value)?),
            "end_date" => end_date = Some(parse_date_expr(value)?),
            "customer" => customer = parse_string_or_null(value)?.map(CustomerId::new),
            other => return Err(SqlError::UnknownColumn(other.to_string())),
        }
    }

    Ok(Command::InsertReservation(ReservationRequest {
        customer,
        number_of_seats: seats.ok_or(SqlError::MissingColumn("number_of_seats"))?,
        start_date: start_date.ok_or(SqlError::MissingColumn("start_date"))?,
        end_date: end_date.ok_or(SqlError::MissingColumn("end_date"))?,
        umbrella_id: umbrella_id.ok_or(SqlError::MissingColumn("umbrella_id"))?,
    }))
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    if table != "reservations" {
        return Err(SqlError::UnknownTable(table));
    }
    let selection = delete.selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    let id = extract_where_id(selection)?;
    Ok(Command::DeleteReservation { id })
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    match table.as_str() {
        "reservations" => match &select.selection {
            None => Ok(Command::SelectReservations),
            Some(selection) => Ok(Command::SelectReservation {
                id: extract_where_id(selection)?,
            }),
        },
        "free_umbrellas" => {
            let (mut start_date, mut end_date) = (None, None);
            if let Some(selection) = &select.selection {
                extract_date_filters(selection, &mut start_date, &mut end_date)?;
            }
            Ok(Command::SelectFreeUmbrellas {
                start_date: start_date.ok_or(SqlError::MissingFilter("start_date"))?,
                end_date: end_date.ok_or(SqlError::MissingFilter("end_date"))?,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// Accepts `start_date = d` / `start_date >= d` and `end_date = d` / `end_date <= d`
/// joined by AND.
fn extract_date_filters(
    expr: &Expr,
    start_date: &mut Option<NaiveDate>,
    end_date: &mut Option<NaiveDate>,
) -> Result<(), SqlError> {
    if let Expr::BinaryOp { left, op, right } = expr {
        match op {
            ast::BinaryOperator::And => {
                extract_date_filters(left, start_date, end_date)?;
                extract_date_filters(right, start_date, end_date)?;
            }
            ast::BinaryOperator::Eq | ast::BinaryOperator::GtEq | ast::BinaryOperator::LtEq => {
                match (expr_column_name(left).as_deref(), op) {
                    (Some("start_date"), ast::BinaryOperator::Eq | ast::BinaryOperator::GtEq) => {
                        *start_date = Some(parse_date_expr(right)?);
                    }
                    (Some("end_date"), ast::BinaryOperator::Eq | ast::BinaryOperator::LtEq) => {
                        *end_date = Some(parse_date_expr(right)?);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row.clone()),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Expr) -> Result<Ulid, SqlError> {
    match selection {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } if expr_column_name(left).as_deref() == Some("id") => parse_ulid_expr(right),
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_ulid_expr(expr: &Expr) -> Result<Ulid, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => {
            Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
        }
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

fn parse_i64_expr(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) | Value::SingleQuotedString(s) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad integer {s}: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_i64_expr(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_date_expr(expr: &Expr) -> Result<NaiveDate, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| SqlError::BadDate(format!("{s}: {e}"))),
        Some(value) => Err(SqlError::BadDate(format!("expected 'YYYY-MM-DD', got {value}"))),
        None => Err(SqlError::BadDate(format!("expected 'YYYY-MM-DD', got {expr}"))),
    }
}

fn parse_string_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        Some(Value::SingleQuotedString(s) | Value::Number(s, _)) => Ok(Some(s.clone())),
        Some(value) => Err(SqlError::Parse(format!("expected string or NULL, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid date: {0}")]
    BadDate(String),
    #[error("empty query")]
    Empty,
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("missing column: {0}")]
    MissingColumn(&'static str),
    #[error("{0}: expected at least {1} values, got {2}")]
    WrongArity(&'static str, usize, usize),
    #[error("missing filter: {0}")]
    MissingFilter(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parse_insert_with_columns() {
        let sql = "INSERT INTO reservations (number_of_seats, start_date, end_date, umbrella_id) VALUES (2, '2030-07-01', '2030-07-03', 10)";
        let cmd = parse_sql(sql).unwrap();
        assert_eq!(
            cmd,
            Command::InsertReservation(ReservationRequest {
                customer: None,
                number_of_seats: 2,
                start_date: date("2030-07-01"),
                end_date: date("2030-07-03"),
                umbrella_id: 10,
            })
        );
    }

    #[test]
    fn parse_insert_positional_with_customer() {
        let sql = "INSERT INTO reservations VALUES (14, 3, '2030-07-01', '2030-07-01', 'bea')";
        match parse_sql(sql).unwrap() {
            Command::InsertReservation(req) => {
                assert_eq!(req.umbrella_id, 14);
                assert_eq!(req.number_of_seats, 3);
                assert_eq!(req.customer, Some(CustomerId::from("bea")));
            }
            cmd => panic!("expected InsertReservation, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_null_customer() {
        let sql = "INSERT INTO reservations (umbrella_id, number_of_seats, start_date, end_date, customer) VALUES (1, 2, '2030-07-01', '2030-07-01', NULL)";
        match parse_sql(sql).unwrap() {
            Command::InsertReservation(req) => assert_eq!(req.customer, None),
            cmd => panic!("expected InsertReservation, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_out_of_range_values_survive() {
        let sql = "INSERT INTO reservations (umbrella_id, number_of_seats, start_date, end_date) VALUES (-1, 0, '2030-07-01', '2030-07-01')";
        match parse_sql(sql).unwrap() {
            Command::InsertReservation(req) => {
                assert_eq!(req.umbrella_id, -1);
                assert_eq!(req.number_of_seats, 0);
            }
            cmd => panic!("expected InsertReservation, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_bad_date() {
        let sql = "INSERT INTO reservations VALUES (1, 2, '2030-13-01', '2030-07-01')";
        assert!(matches!(parse_sql(sql), Err(SqlError::BadDate(_))));
        let sql = "INSERT INTO reservations VALUES (1, 2, 20300701, '2030-07-01')";
        assert!(matches!(parse_sql(sql), Err(SqlError::BadDate(_))));
    }

    #[test]
    fn parse_insert_missing_and_unknown_columns() {
        let sql = "INSERT INTO reservations (umbrella_id, number_of_seats, start_date, customer) VALUES (1, 2, '2030-07-01', 'x')";
        assert!(matches!(parse_sql(sql), Err(SqlError::MissingColumn("end_date"))));
        let sql = "INSERT INTO reservations (umbrella_id, number_of_seats, start_date, price) VALUES (1, 2, '2030-07-01', 5)";
        assert!(matches!(parse_sql(sql), Err(SqlError::UnknownColumn(c)) if c == "price"));
        let sql = "INSERT INTO reservations VALUES (1, 2)";
        assert!(matches!(parse_sql(sql), Err(SqlError::WrongArity(_, 4, 2))));
    }

    #[test]
    fn parse_select_all_and_by_id() {
        assert_eq!(parse_sql("SELECT * FROM reservations").unwrap(), Command::SelectReservations);
        let cmd = parse_sql(&format!("SELECT * FROM reservations WHERE id = '{ID}'")).unwrap();
        assert_eq!(cmd, Command::SelectReservation { id: Ulid::from_string(ID).unwrap() });
    }

    #[test]
    fn parse_delete() {
        let cmd = parse_sql(&format!("DELETE FROM reservations WHERE id = '{ID}'")).unwrap();
        assert_eq!(cmd, Command::DeleteReservation { id: Ulid::from_string(ID).unwrap() });
        assert!(matches!(
            parse_sql("DELETE FROM reservations"),
            Err(SqlError::MissingFilter("id"))
        ));
    }

    #[test]
    fn parse_free_umbrellas() {
        let sql = "SELECT * FROM free_umbrellas WHERE start_date = '2030-12-20' AND end_date = '2030-12-21'";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::SelectFreeUmbrellas {
                start_date: date("2030-12-20"),
                end_date: date("2030-12-21"),
            }
        );
        let sql = "SELECT umbrella_id FROM free_umbrellas WHERE start_date >= '2030-12-20' AND end_date <= '2030-12-21'";
        assert!(matches!(parse_sql(sql), Ok(Command::SelectFreeUmbrellas { .. })));
    }

    #[test]
    fn parse_free_umbrellas_keeps_reversed_range_for_engine() {
        let sql = "SELECT * FROM free_umbrellas WHERE start_date = '2030-12-21' AND end_date = '2030-12-20'";
        assert!(matches!(parse_sql(sql), Ok(Command::SelectFreeUmbrellas { .. })));
    }

    #[test]
    fn parse_free_umbrellas_missing_filter() {
        let sql = "SELECT * FROM free_umbrellas WHERE start_date = '2030-12-20'";
        assert!(matches!(parse_sql(sql), Err(SqlError::MissingFilter("end_date"))));
        assert!(matches!(
            parse_sql("SELECT * FROM free_umbrellas"),
            Err(SqlError::MissingFilter("start_date"))
        ));
    }

    #[test]
    fn parse_free_umbrellas_malformed_date() {
        let sql = "SELECT * FROM free_umbrellas WHERE start_date = 'tomorrow' AND end_date = '2030-12-20'";
        assert!(matches!(parse_sql(sql), Err(SqlError::BadDate(_))));
    }

    #[test]
    fn parse_unknown_table_errors() {
        assert!(matches!(
            parse_sql("SELECT * FROM towels"),
            Err(SqlError::UnknownTable(t)) if t == "towels"
        ));
    }

    #[test]
    fn parse_empty_errors() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
    }
}
