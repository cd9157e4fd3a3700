//! Row predicates.
//!
//! A predicate is a tree of field comparisons joined with AND/OR. It is
//! rendered into a WHERE clause with positional parameters; values never
//! appear in statement text. Field names are checked against the tables
//! the statement touches, and comparison values on enciphered fields are
//! encoded the same way stored values are, so equality lookups on
//! enciphered text work. Ordering comparisons on enciphered fields are
//! refused.

use std::fmt::Write as _;

use crate::error::ShopvaultError;
use crate::policy::{FieldCodec, Override};
use crate::schema::Table;
use crate::value::FieldValue;

/// Comparison operator of a single field test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    /// Whether the comparison depends on value order rather than identity.
    pub fn is_ordering(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A boolean condition over fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Predicate {
    /// Every row.
    #[default]
    All,
    Compare {
        field: String,
        op: Comparison,
        value: FieldValue,
    },
    In {
        field: String,
        values: Vec<FieldValue>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: Comparison, value: impl Into<FieldValue>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Le, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, Comparison::Ge, value)
    }

    pub fn is_in<V: Into<FieldValue>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Conjunction. `All` is the identity.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::All, p) | (p, Self::All) => p,
            (Self::And(mut terms), p) => {
                terms.push(p);
                Self::And(terms)
            }
            (p, q) => Self::And(vec![p, q]),
        }
    }

    /// Disjunction.
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::Or(mut terms), p) => {
                terms.push(p);
                Self::Or(terms)
            }
            (p, q) => Self::Or(vec![p, q]),
        }
    }

    /// Render into a WHERE clause body, pushing parameters onto `params`.
    /// `None` means no restriction.
    pub(crate) fn to_sql(
        &self,
        scope: &Scope<'_>,
        codec: &FieldCodec<'_>,
        params: &mut Vec<FieldValue>,
    ) -> Result<Option<String>, ShopvaultError> {
        if *self == Self::All {
            return Ok(None);
        }
        let mut sql = String::new();
        self.render(scope, codec, params, &mut sql)?;
        Ok(Some(sql))
    }

    fn render(
        &self,
        scope: &Scope<'_>,
        codec: &FieldCodec<'_>,
        params: &mut Vec<FieldValue>,
        sql: &mut String,
    ) -> Result<(), ShopvaultError> {
        match self {
            Self::All => sql.push('1'),
            Self::Compare { field, op, value } => {
                let column = scope.resolve(field)?;
                if op.is_ordering() && codec.policy().should_transform(column.field, Override::FollowStatus) {
                    return Err(ShopvaultError::UnorderedField {
                        field: field.clone(),
                        op: op.sql(),
                    });
                }
                params.push(codec.encode(column.field, value, Override::FollowStatus)?);
                let _ = write!(sql, "{} {} ?{}", column.sql, op.sql(), params.len());
            }
            Self::In { field, values } => {
                let column = scope.resolve(field)?;
                if values.is_empty() {
                    sql.push('0');
                    return Ok(());
                }
                let mut placeholders = Vec::with_capacity(values.len());
                for value in values {
                    params.push(codec.encode(column.field, value, Override::FollowStatus)?);
                    placeholders.push(format!("?{}", params.len()));
                }
                let _ = write!(sql, "{} IN ({})", column.sql, placeholders.join(", "));
            }
            Self::And(terms) => render_joined(terms, " AND ", '1', scope, codec, params, sql)?,
            Self::Or(terms) => render_joined(terms, " OR ", '0', scope, codec, params, sql)?,
        }
        Ok(())
    }
}

fn render_joined(
    terms: &[Predicate],
    separator: &str,
    empty: char,
    scope: &Scope<'_>,
    codec: &FieldCodec<'_>,
    params: &mut Vec<FieldValue>,
    sql: &mut String,
) -> Result<(), ShopvaultError> {
    if terms.is_empty() {
        sql.push(empty);
        return Ok(());
    }
    sql.push('(');
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            sql.push_str(separator);
        }
        term.render(scope, codec, params, sql)?;
    }
    sql.push(')');
    Ok(())
}

/// A field reference resolved against a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Column {
    /// How the statement names it.
    pub sql: String,
    /// The bare field name, for the field policy.
    pub field: &'static str,
}

/// The tables a statement reads, in join order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'s> {
    tables: &'s [Table],
}

impl<'s> Scope<'s> {
    pub fn new(tables: &'s [Table]) -> Self {
        Self { tables }
    }

    fn joined(&self) -> bool {
        self.tables.len() > 1
    }

    fn unknown(&self, field: &str) -> ShopvaultError {
        let table = self
            .tables
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(" + ");
        ShopvaultError::UnknownField {
            table,
            field: field.to_string(),
        }
    }

    /// Resolve `reference`, either `field` or `Table.field`.
    ///
    /// In a join, an unqualified name found in several tables binds to the
    /// first of them in chain order.
    pub fn resolve(&self, reference: &str) -> Result<Column, ShopvaultError> {
        let (table, name) = match reference.split_once('.') {
            Some((table_name, name)) => {
                let table = self
                    .tables
                    .iter()
                    .copied()
                    .find(|t| t.name() == table_name)
                    .ok_or_else(|| self.unknown(reference))?;
                (table, name)
            }
            None => {
                let table = self
                    .tables
                    .iter()
                    .copied()
                    .find(|t| t.schema().has_field(reference))
                    .ok_or_else(|| self.unknown(reference))?;
                (table, reference)
            }
        };
        let field = table
            .schema()
            .field_names()
            .find(|f| *f == name)
            .ok_or_else(|| self.unknown(reference))?;
        let sql = if self.joined() || reference.contains('.') {
            format!("{}.{}", table.name(), field)
        } else {
            field.to_string()
        };
        Ok(Column { sql, field })
    }
}
