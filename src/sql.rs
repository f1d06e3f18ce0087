use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlparser::ast::{self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertReservation {
        vendor: String,
        instant: NaiveDateTime,
    },
    DeleteReservation {
        vendor: String,
        instant: NaiveDateTime,
    },
    SelectReservations {
        vendor: Option<String>,
    },
    SelectSchedule,
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    let Some(stmt) = stmts.first() else {
        return Err(SqlError::Empty);
    };

    match stmt {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

/// Accepts `YYYY-MM-DD` with an optional `HH:MM` or `HH:MM:SS` time,
/// separated by a space or `T`. A bare date means midnight.
pub fn parse_instant(s: &str) -> Result<NaiveDateTime, SqlError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let s = s.trim();
    if let Some(t) = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Ok(t);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| SqlError::BadDate(s.to_string()))
}

#[derive(Clone, Copy, PartialEq)]
enum Column {
    Vendor,
    Date,
}

fn column(name: &str) -> Option<Column> {
    match name {
        "vendor" | "food_truck" => Some(Column::Vendor),
        "date" | "instant" => Some(Column::Date),
        _ => None,
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    if table != "reservations" {
        return Err(SqlError::UnknownTable(table));
    }
    let values = extract_insert_values(insert)?;

    let columns: Vec<Column> = if insert.columns.is_empty() {
        vec![Column::Vendor, Column::Date]
    } else {
        insert
            .columns
            .iter()
            .map(|ident| {
                let name = ident.value.to_lowercase();
                column(&name).ok_or_else(|| SqlError::Parse(format!("unknown column: {name}")))
            })
            .collect::<Result<_, _>>()?
    };
    if values.len() != columns.len() {
        return Err(SqlError::WrongArity("reservations", columns.len(), values.len()));
    }

    let (mut vendor, mut instant) = (None, None);
    for (col, value) in columns.iter().zip(values) {
        match col {
            Column::Vendor => vendor = Some(parse_string_expr(value)?),
            Column::Date => instant = Some(parse_instant_expr(value)?),
        }
    }

    Ok(Command::InsertReservation {
        vendor: vendor.ok_or(SqlError::MissingFilter("vendor"))?,
        instant: instant.ok_or(SqlError::MissingFilter("date"))?,
    })
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    if table != "reservations" {
        return Err(SqlError::UnknownTable(table));
    }

    let (mut vendor, mut instant) = (None, None);
    if let Some(selection) = &delete.selection {
        extract_filters(selection, &mut vendor, &mut instant)?;
    }

    Ok(Command::DeleteReservation {
        vendor: vendor.ok_or(SqlError::MissingFilter("vendor"))?,
        instant: instant.ok_or(SqlError::MissingFilter("date"))?,
    })
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    let Some(from) = select.from.first() else {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    };
    let table = table_factor_name(&from.relation)?;

    match table.as_str() {
        "schedule" => Ok(Command::SelectSchedule),
        "reservations" => {
            let (mut vendor, mut instant) = (None, None);
            if let Some(selection) = &select.selection {
                extract_filters(selection, &mut vendor, &mut instant)?;
            }
            if instant.is_some() {
                return Err(SqlError::Unsupported("filtering reservations by date".into()));
            }
            Ok(Command::SelectReservations { vendor })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// Walk an `a = x AND b = y` tree collecting vendor and date equalities.
fn extract_filters(
    expr: &Expr,
    vendor: &mut Option<String>,
    instant: &mut Option<NaiveDateTime>,
) -> Result<(), SqlError> {
    match expr {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::And,
            right,
        } => {
            extract_filters(left, vendor, instant)?;
            extract_filters(right, vendor, instant)?;
        }
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => match expr_column_name(left).as_deref().and_then(column) {
            Some(Column::Vendor) => *vendor = Some(parse_string_expr(right)?),
            Some(Column::Date) => *instant = Some(parse_instant_expr(right)?),
            None => {
                return Err(SqlError::Unsupported(format!("filter on {left}")));
            }
        },
        Expr::Nested(inner) => extract_filters(inner, vendor, instant)?,
        other => return Err(SqlError::Unsupported(format!("WHERE {other}"))),
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

fn extract_insert_values(insert: &ast::Insert) -> Result<&[Expr], SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
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

fn parse_string_expr(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => Ok(s.clone()),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

fn parse_instant_expr(expr: &Expr) -> Result<NaiveDateTime, SqlError> {
    parse_instant(&parse_string_expr(expr)?)
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
    BadDate(String),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::BadDate(s) => {
                write!(f, "bad date '{s}': expected YYYY-MM-DD[ HH:MM[:SS]]")
            }
        }
    }
}

impl std::error::Error for SqlError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 2, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn parse_insert_reservation() {
        let sql = "INSERT INTO reservations (vendor, date) VALUES ('FT1', '2021-02-02 10:00')";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::InsertReservation {
                vendor: "FT1".into(),
                instant: at(2, 10, 0),
            }
        );
    }

    #[test]
    fn parse_insert_food_truck_alias_any_order() {
        let sql = "INSERT INTO reservations (date, food_truck) VALUES ('2021-02-01', 'FT2')";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::InsertReservation {
                vendor: "FT2".into(),
                instant: at(1, 0, 0),
            }
        );
    }

    #[test]
    fn parse_insert_without_columns_is_positional() {
        let sql = "INSERT INTO reservations VALUES ('FT1', '2021-02-03T14:30:15')";
        match parse_sql(sql).unwrap() {
            Command::InsertReservation { vendor, instant } => {
                assert_eq!(vendor, "FT1");
                assert_eq!(instant, at(3, 14, 30) + chrono::Duration::seconds(15));
            }
            other => panic!("expected InsertReservation, got {other:?}"),
        }
    }

    #[test]
    fn parse_insert_wrong_arity() {
        let sql = "INSERT INTO reservations (vendor) VALUES ('FT1', '2021-02-01')";
        assert!(matches!(
            parse_sql(sql),
            Err(SqlError::WrongArity("reservations", 1, 2))
        ));
    }

    #[test]
    fn parse_insert_missing_date() {
        let sql = "INSERT INTO reservations (vendor) VALUES ('FT1')";
        assert!(matches!(parse_sql(sql), Err(SqlError::MissingFilter("date"))));
    }

    #[test]
    fn parse_insert_bad_date() {
        let sql = "INSERT INTO reservations (vendor, date) VALUES ('FT1', '2021-02-31')";
        assert!(matches!(parse_sql(sql), Err(SqlError::BadDate(_))));
    }

    #[test]
    fn parse_insert_multi_row_unsupported() {
        let sql = "INSERT INTO reservations VALUES ('FT1', '2021-02-01'), ('FT2', '2021-02-01')";
        assert!(matches!(parse_sql(sql), Err(SqlError::Unsupported(_))));
    }

    #[test]
    fn parse_delete_reservation() {
        let sql = "DELETE FROM reservations WHERE vendor = 'FT1' AND date = '2021-02-02 14:00'";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::DeleteReservation {
                vendor: "FT1".into(),
                instant: at(2, 14, 0),
            }
        );
    }

    #[test]
    fn parse_delete_requires_both_filters() {
        let sql = "DELETE FROM reservations WHERE vendor = 'FT1'";
        assert!(matches!(parse_sql(sql), Err(SqlError::MissingFilter("date"))));
        let sql = "DELETE FROM reservations";
        assert!(matches!(parse_sql(sql), Err(SqlError::MissingFilter("vendor"))));
    }

    #[test]
    fn parse_select_schedule() {
        assert_eq!(parse_sql("SELECT * FROM schedule").unwrap(), Command::SelectSchedule);
    }

    #[test]
    fn parse_select_reservations() {
        assert_eq!(
            parse_sql("SELECT * FROM reservations").unwrap(),
            Command::SelectReservations { vendor: None }
        );
        assert_eq!(
            parse_sql("SELECT * FROM reservations WHERE food_truck = 'FT3'").unwrap(),
            Command::SelectReservations {
                vendor: Some("FT3".into())
            }
        );
    }

    #[test]
    fn parse_instant_formats() {
        assert_eq!(parse_instant("2021-02-05").unwrap(), at(5, 0, 0));
        assert_eq!(parse_instant("2021-02-05 12:00").unwrap(), at(5, 12, 0));
        assert_eq!(parse_instant("2021-02-05T12:00").unwrap(), at(5, 12, 0));
        assert_eq!(parse_instant(" 2021-02-05 09:15:00 ").unwrap(), at(5, 9, 15));
        assert!(parse_instant("05/02/2021").is_err());
        assert!(parse_instant("2021-02-05 25:00").is_err());
    }

    #[test]
    fn parse_unknown_table_errors() {
        let sql = "INSERT INTO bookings (vendor, date) VALUES ('FT1', '2021-02-01')";
        assert!(matches!(parse_sql(sql), Err(SqlError::UnknownTable(t)) if t == "bookings"));
        assert!(matches!(
            parse_sql("SELECT * FROM trucks"),
            Err(SqlError::UnknownTable(_))
        ));
    }

    #[test]
    fn parse_unsupported_statement() {
        assert!(matches!(
            parse_sql("UPDATE reservations SET vendor = 'x'"),
            Err(SqlError::Unsupported(_))
        ));
    }

    #[test]
    fn parse_empty_errors() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
    }
}
