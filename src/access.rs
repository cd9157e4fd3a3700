//! The record access layer.
//!
//! Generic add / search / joined search / update / delete over the catalog.
//! Statements are assembled from catalog metadata; every value crosses the
//! store boundary as a parameter, passing through the field codec on the
//! way in and on the way out.
//!
//! The functions here work on a caller-supplied connection. `Store` wraps
//! each of them in a short-lived connection of its own.

use rusqlite::{params_from_iter, Connection};

use crate::error::ShopvaultError;
use crate::policy::{FieldCodec, Override};
use crate::predicate::{Predicate, Scope};
use crate::schema::{Table, TableSchema};
use crate::value::{FieldValue, Record};

/// Which fields a search returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every field, in schema order (chain order for joins).
    #[default]
    All,
    /// These fields, in this order.
    Fields(Vec<String>),
}

impl Selection {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(fields.into_iter().map(Into::into).collect())
    }
}

/// One step of a join chain: `table` joins the previous table on `on`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub table: Table,
    pub on: String,
}

impl Link {
    pub fn new(table: Table, on: impl Into<String>) -> Self {
        Self {
            table,
            on: on.into(),
        }
    }
}

/// A result column: the record key and the bare field for decoding.
struct OutputColumn {
    sql: String,
    key: String,
    field: &'static str,
}

fn primary_key_error(schema: &TableSchema) -> ShopvaultError {
    ShopvaultError::ImmutableField {
        table: schema.name.to_string(),
        field: schema.primary_key().to_string(),
    }
}

/// Check that `values` holds exactly the non-key fields of `table`, and
/// return them in schema order.
pub fn validate_new_record<'r>(
    table: Table,
    values: &'r Record,
) -> Result<Vec<(&'static str, &'r FieldValue)>, ShopvaultError> {
    let schema = table.schema();
    for name in values.field_names() {
        if name == schema.primary_key() {
            return Err(primary_key_error(schema));
        }
        if !schema.has_field(name) {
            return Err(schema.unknown(name));
        }
    }
    schema
        .non_key_fields()
        .map(|field| {
            values
                .get(field)
                .map(|value| (field, value))
                .ok_or_else(|| ShopvaultError::MissingField {
                    table: schema.name.to_string(),
                    field: field.to_string(),
                })
        })
        .collect()
}

/// Insert a new row. Returns the primary key the store assigned.
pub fn insert(
    conn: &Connection,
    codec: &FieldCodec<'_>,
    table: Table,
    values: &Record,
) -> Result<i64, ShopvaultError> {
    let ordered = validate_new_record(table, values)?;

    let mut names = Vec::with_capacity(ordered.len());
    let mut params = Vec::with_capacity(ordered.len());
    for (field, value) in ordered {
        names.push(field);
        params.push(codec.encode(field, value, Override::FollowStatus)?);
    }
    let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name(),
        names.join(", "),
        placeholders.join(", ")
    );

    tracing::debug!(table = %table, "{}", sql);
    conn.execute(&sql, params_from_iter(params.iter()))?;
    Ok(conn.last_insert_rowid())
}

/// Rows of `table` matching `predicate`, decoded.
pub fn select(
    conn: &Connection,
    codec: &FieldCodec<'_>,
    table: Table,
    selection: &Selection,
    predicate: &Predicate,
) -> Result<Vec<Record>, ShopvaultError> {
    select_joined(conn, codec, table, &[], selection, predicate)
}

/// Rows of the inner-join chain starting at `table`, decoded.
///
/// Each link joins the previous table in the chain on the shared field.
/// With an empty chain this is a plain single-table search.
pub fn select_joined(
    conn: &Connection,
    codec: &FieldCodec<'_>,
    table: Table,
    links: &[Link],
    selection: &Selection,
    predicate: &Predicate,
) -> Result<Vec<Record>, ShopvaultError> {
    let mut tables = Vec::with_capacity(links.len() + 1);
    tables.push(table);
    let mut from = table.name().to_string();

    for link in links {
        let previous = tables[tables.len() - 1];
        if tables.contains(&link.table) {
            return Err(ShopvaultError::InvalidJoin(format!(
                "{} appears more than once in the chain",
                link.table
            )));
        }
        if !previous.schema().has_field(&link.on) || !link.table.schema().has_field(&link.on) {
            return Err(ShopvaultError::InvalidJoin(format!(
                "{} and {} do not share {}",
                previous, link.table, link.on
            )));
        }
        from.push_str(&format!(
            " INNER JOIN {joined} ON {previous}.{on} = {joined}.{on}",
            joined = link.table.name(),
            previous = previous.name(),
            on = link.on
        ));
        tables.push(link.table);
    }

    let scope = Scope::new(&tables);
    let columns = output_columns(&scope, &tables, selection)?;

    let mut params = Vec::new();
    let filter = predicate.to_sql(&scope, codec, &mut params)?;

    let column_sql: Vec<&str> = columns.iter().map(|c| c.sql.as_str()).collect();
    let mut sql = format!("SELECT {} FROM {}", column_sql.join(", "), from);
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(&filter);
    }

    tracing::debug!(table = %table, links = links.len(), "{}", sql);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (i, column) in columns.iter().enumerate() {
            let raw: FieldValue = row.get(i)?;
            let value = codec.decode(column.field, raw, Override::FollowStatus)?;
            record.insert(column.key.clone(), value);
        }
        records.push(record);
    }
    Ok(records)
}

fn output_columns(
    scope: &Scope<'_>,
    tables: &[Table],
    selection: &Selection,
) -> Result<Vec<OutputColumn>, ShopvaultError> {
    let joined = tables.len() > 1;
    match selection {
        Selection::All => Ok(tables
            .iter()
            .flat_map(|t| {
                t.schema().field_names().map(move |field| OutputColumn {
                    sql: if joined {
                        format!("{}.{}", t.name(), field)
                    } else {
                        field.to_string()
                    },
                    key: field.to_string(),
                    field,
                })
            })
            .collect()),
        Selection::Fields(fields) => fields
            .iter()
            .map(|reference| {
                let column = scope.resolve(reference)?;
                Ok(OutputColumn {
                    sql: column.sql,
                    key: reference.clone(),
                    field: column.field,
                })
            })
            .collect(),
    }
}

/// Set `values` on every row matching `predicate`. Returns the number of
/// rows changed.
pub fn update(
    conn: &Connection,
    codec: &FieldCodec<'_>,
    table: Table,
    values: &Record,
    predicate: &Predicate,
    mode: Override,
) -> Result<usize, ShopvaultError> {
    let schema = table.schema();
    if values.is_empty() {
        return Err(ShopvaultError::EmptyUpdate(table.name().to_string()));
    }

    let mut params = Vec::with_capacity(values.len());
    let mut assignments = Vec::with_capacity(values.len());
    for (field, value) in values.iter() {
        if field == schema.primary_key() {
            return Err(primary_key_error(schema));
        }
        if !schema.has_field(field) {
            return Err(schema.unknown(field));
        }
        params.push(codec.encode(field, value, mode)?);
        assignments.push(format!("{} = ?{}", field, params.len()));
    }

    let tables = [table];
    let scope = Scope::new(&tables);
    let mut sql = format!("UPDATE {} SET {}", table.name(), assignments.join(", "));
    if let Some(filter) = predicate.to_sql(&scope, codec, &mut params)? {
        sql.push_str(" WHERE ");
        sql.push_str(&filter);
    }

    tracing::debug!(table = %table, "{}", sql);
    let changed = conn.execute(&sql, params_from_iter(params.iter()))?;
    Ok(changed)
}

/// Remove every row matching `predicate`. Dependent rows go with them
/// through the cascading foreign keys. Returns the number of rows removed
/// from `table` itself.
pub fn delete(
    conn: &Connection,
    codec: &FieldCodec<'_>,
    table: Table,
    predicate: &Predicate,
) -> Result<usize, ShopvaultError> {
    let tables = [table];
    let scope = Scope::new(&tables);
    let mut params = Vec::new();
    let mut sql = format!("DELETE FROM {}", table.name());
    if let Some(filter) = predicate.to_sql(&scope, codec, &mut params)? {
        sql.push_str(" WHERE ");
        sql.push_str(&filter);
    }

    tracing::debug!(table = %table, "{}", sql);
    let removed = conn.execute(&sql, params_from_iter(params.iter()))?;
    Ok(removed)
}
