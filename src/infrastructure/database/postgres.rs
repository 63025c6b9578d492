//! PostgreSQL backend.
//!
//! SQL is assembled with [`QueryBuilder`]. Identifiers only ever come from a
//! static [`Schema`]; every operand is bound as a parameter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};

use super::backend::Backend;
use super::unit_of_work::UnitOfWork;
use crate::domain::query::{Condition, FindOptions, Predicate};
use crate::domain::value_objects::{FieldType, Record, Schema, Value, ID_FIELD, UPDATED_AT_FIELD};
use crate::shared::error::StorageError;

/// An open PostgreSQL transaction.
pub type PgTransaction = Transaction<'static, Postgres>;

/// PostgreSQL implementation of [`Backend`].
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Create a new backend over a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(
        &self,
        conn: Option<&mut PgTransaction>,
        mut builder: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<PgRow>, StorageError> {
        let query = builder.build();
        let rows = match conn {
            Some(conn) => query.fetch_all(&mut **conn).await,
            None => query.fetch_all(&self.pool).await,
        };
        rows.map_err(StorageError::from_sqlx)
    }

    async fn fetch_optional(
        &self,
        conn: Option<&mut PgTransaction>,
        mut builder: QueryBuilder<'_, Postgres>,
    ) -> Result<Option<PgRow>, StorageError> {
        let query = builder.build();
        let row = match conn {
            Some(conn) => query.fetch_optional(&mut **conn).await,
            None => query.fetch_optional(&self.pool).await,
        };
        row.map_err(StorageError::from_sqlx)
    }

    async fn fetch_count(
        &self,
        conn: Option<&mut PgTransaction>,
        mut builder: QueryBuilder<'_, Postgres>,
    ) -> Result<u64, StorageError> {
        let query = builder.build_query_scalar::<i64>();
        let count = match conn {
            Some(conn) => query.fetch_one(&mut **conn).await,
            None => query.fetch_one(&self.pool).await,
        };
        let count = count.map_err(StorageError::from_sqlx)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn execute(
        &self,
        conn: Option<&mut PgTransaction>,
        mut builder: QueryBuilder<'_, Postgres>,
    ) -> Result<u64, StorageError> {
        let query = builder.build();
        let result = match conn {
            Some(conn) => query.execute(&mut **conn).await,
            None => query.execute(&self.pool).await,
        };
        Ok(result.map_err(StorageError::from_sqlx)?.rows_affected())
    }
}

#[async_trait]
impl UnitOfWork for PgBackend {
    type Connection = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, StorageError> {
        self.pool.begin().await.map_err(StorageError::from_sqlx)
    }

    async fn commit(&self, connection: PgTransaction) -> Result<(), StorageError> {
        connection.commit().await.map_err(StorageError::from_sqlx)
    }

    async fn rollback(&self, connection: PgTransaction) -> Result<(), StorageError> {
        connection.rollback().await.map_err(StorageError::from_sqlx)
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn find(
        &self,
        conn: Option<&mut PgTransaction>,
        schema: &'static Schema,
        options: &FindOptions,
    ) -> Result<Vec<Record>, StorageError> {
        let builder = select_query(schema, options)?;
        let rows = self.fetch_all(conn, builder).await?;
        rows.iter().map(|row| decode_row(row, schema)).collect()
    }

    async fn count(
        &self,
        conn: Option<&mut PgTransaction>,
        schema: &'static Schema,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", schema.table));
        push_where(&mut builder, schema, predicates)?;
        self.fetch_count(conn, builder).await
    }

    async fn insert(
        &self,
        conn: Option<&mut PgTransaction>,
        schema: &'static Schema,
        values: Vec<(&'static str, Value)>,
    ) -> Result<Record, StorageError> {
        let builder = insert_query(schema, &values)?;
        let row = self
            .fetch_optional(conn, builder)
            .await?
            .ok_or_else(|| StorageError::Decode(format!("insert into {} returned no row", schema.table)))?;
        decode_row(&row, schema)
    }

    async fn update(
        &self,
        conn: Option<&mut PgTransaction>,
        schema: &'static Schema,
        id: i64,
        changes: Vec<(&'static str, Value)>,
    ) -> Result<Option<Record>, StorageError> {
        let builder = update_query(schema, id, &changes)?;
        self.fetch_optional(conn, builder)
            .await?
            .map(|row| decode_row(&row, schema))
            .transpose()
    }

    async fn delete(
        &self,
        conn: Option<&mut PgTransaction>,
        schema: &'static Schema,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError> {
        let mut builder = QueryBuilder::new(format!("DELETE FROM {}", schema.table));
        push_where(&mut builder, schema, predicates)?;
        self.execute(conn, builder).await
    }

    async fn increment(
        &self,
        conn: Option<&mut PgTransaction>,
        schema: &'static Schema,
        id: i64,
        field: &str,
        delta: i64,
    ) -> Result<(), StorageError> {
        let column = schema.require(field)?;
        if column.ty != FieldType::Integer {
            return Err(StorageError::Decode(format!(
                "field '{}' of {} is not an integer",
                field, schema.table
            )));
        }

        let mut builder = QueryBuilder::new(format!(
            "UPDATE {} SET {col} = {col} + ",
            schema.table,
            col = column.column
        ));
        builder.push_bind(delta);
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        match self.execute(conn, builder).await? {
            0 => Err(StorageError::RowNotFound {
                table: schema.table,
                id,
            }),
            _ => Ok(()),
        }
    }
}

fn select_list(schema: &Schema) -> String {
    schema
        .columns
        .iter()
        .map(|c| c.column)
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_query(
    schema: &Schema,
    options: &FindOptions,
) -> Result<QueryBuilder<'static, Postgres>, StorageError> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM {}",
        select_list(schema),
        schema.table
    ));
    push_where(&mut builder, schema, &options.predicates)?;

    for (i, order) in options.orderings.iter().enumerate() {
        builder.push(if i == 0 { " ORDER BY " } else { ", " });
        builder.push(schema.require(&order.field)?.column);
        builder.push(" ");
        builder.push(order.direction.as_sql());
    }
    if let Some(take) = options.take {
        builder.push(" LIMIT ");
        builder.push_bind(take as i64);
    }
    if let Some(skip) = options.skip {
        builder.push(" OFFSET ");
        builder.push_bind(skip as i64);
    }
    Ok(builder)
}

fn insert_query(
    schema: &Schema,
    values: &[(&'static str, Value)],
) -> Result<QueryBuilder<'static, Postgres>, StorageError> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO {}", schema.table));
    if values.is_empty() {
        builder.push(" DEFAULT VALUES");
    } else {
        builder.push(" (");
        for (i, (field, _)) in values.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(schema.require(field)?.column);
        }
        builder.push(") VALUES (");
        for (i, (_, value)) in values.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        builder.push(")");
    }
    builder.push(" RETURNING ");
    builder.push(select_list(schema));
    Ok(builder)
}

fn update_query(
    schema: &Schema,
    id: i64,
    changes: &[(&'static str, Value)],
) -> Result<QueryBuilder<'static, Postgres>, StorageError> {
    if changes.is_empty() {
        let options = FindOptions::new().filter(Predicate::equal(ID_FIELD, id));
        return select_query(schema, &options);
    }

    let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", schema.table));
    for (i, (field, value)) in changes.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(schema.require(field)?.column);
        builder.push(" = ");
        push_value(&mut builder, value);
    }
    if let Some(column) = schema.field(UPDATED_AT_FIELD) {
        builder.push(format!(", {} = NOW()", column.column));
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING ");
    builder.push(select_list(schema));
    Ok(builder)
}

fn push_where(
    builder: &mut QueryBuilder<'_, Postgres>,
    schema: &Schema,
    predicates: &[Predicate],
) -> Result<(), StorageError> {
    for (i, predicate) in predicates.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        let column = schema.require(&predicate.field)?.column;
        push_condition(builder, column, &predicate.condition);
    }
    Ok(())
}

fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, column: &str, condition: &Condition) {
    let (op, operand) = match condition {
        Condition::Equal(Value::Null) => {
            builder.push(column).push(" IS NULL");
            return;
        }
        Condition::NotEqual(Value::Null) => {
            builder.push(column).push(" IS NOT NULL");
            return;
        }
        Condition::Between(low, high) => {
            builder.push(column).push(" BETWEEN ");
            push_value(builder, low);
            builder.push(" AND ");
            push_value(builder, high);
            return;
        }
        Condition::Like(pattern) | Condition::ILike(pattern) => {
            let op = if matches!(condition, Condition::Like(_)) {
                " LIKE "
            } else {
                " ILIKE "
            };
            builder.push(column).push(op);
            builder.push_bind(like_pattern(pattern));
            return;
        }
        Condition::In(values) => {
            if values.is_empty() {
                builder.push("FALSE");
                return;
            }
            builder.push(column).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(builder, value);
            }
            builder.push(")");
            return;
        }
        Condition::Equal(v) => (" = ", v),
        Condition::NotEqual(v) => (" <> ", v),
        Condition::MoreThan(v) => (" > ", v),
        Condition::MoreThanOrEqual(v) => (" >= ", v),
        Condition::LessThan(v) => (" < ", v),
        Condition::LessThanOrEqual(v) => (" <= ", v),
    };
    builder.push(column).push(op);
    push_value(builder, operand);
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Int(v) => builder.push_bind(*v),
        Value::Text(v) => builder.push_bind(v.clone()),
        Value::Bool(v) => builder.push_bind(*v),
        Value::Timestamp(v) => builder.push_bind(*v),
        Value::Null => builder.push("NULL"),
    };
}

/// `%operand%` with LIKE wildcards in the operand escaped.
fn like_pattern(pattern: &Value) -> String {
    let raw = pattern.to_string();
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn decode_row(row: &PgRow, schema: &Schema) -> Result<Record, StorageError> {
    let mut record = Record::new();
    for column in schema.columns {
        let value = match column.ty {
            FieldType::Integer => row.try_get::<Option<i64>, _>(column.column)?.map(Value::Int),
            FieldType::Text => row.try_get::<Option<String>, _>(column.column)?.map(Value::Text),
            FieldType::Boolean => row.try_get::<Option<bool>, _>(column.column)?.map(Value::Bool),
            FieldType::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(column.column)?
                .map(Value::Timestamp),
        };
        record.insert(column.field, value.unwrap_or(Value::Null));
    }
    Ok(record)
}
