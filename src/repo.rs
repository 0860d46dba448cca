//! Generic CRUD over any [`Record`].
//!
//! Writes run in a single transaction: code assignment, validation and the
//! statement itself either all land or none do. Write transactions take the
//! database write lock up front and wait on the connection busy timeout.
//! Reads never return soft-deleted rows unless a list filter explicitly asks
//! for them.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::config::CodesConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::filters::{Comparison, ListFilter};
use crate::schema::{Record, SqlValue, BASE_COLUMNS};

/// One page of a listing plus the total number of matching rows.
#[derive(Debug, Clone, Serialize)]
pub struct Page<R> {
    pub count: i64,
    pub results: Vec<R>,
}

/// SQLite-backed store for every registry entity.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    codes: CodesConfig,
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: SqlValue) {
    match value {
        SqlValue::Null => qb.push_bind(None::<String>),
        SqlValue::Integer(i) => qb.push_bind(i),
        SqlValue::Text(s) => qb.push_bind(s),
    };
}

fn push_where<R: Record>(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ListFilter) {
    let mut joiner = " WHERE ";

    for condition in &filter.conditions {
        qb.push(joiner);
        joiner = " AND ";
        qb.push(format!("{} {} ", condition.column, condition.op.sql()));
        push_value(qb, condition.value.clone());
    }

    if let (Some(term), Some(field)) = (&filter.search, R::SEARCH_FIELD) {
        qb.push(joiner);
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        qb.push(format!("{} {} ", field, Comparison::Like.sql()));
        qb.push_bind(format!("%{}%", escaped));
        qb.push(" ESCAPE '\\'");
    }
}

impl Repository {
    pub fn new(pool: SqlitePool, codes: CodesConfig) -> Self {
        Self { pool, codes }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a transaction holding the write lock from its first statement.
    /// A deferred transaction that reads before writing cannot wait for a
    /// concurrent writer and fails with `SQLITE_BUSY` instead.
    async fn begin_write(&self) -> RegistryResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Inserts a new record, assigning its id, `updated` timestamp and any
    /// generated code. A caller-supplied `created` is kept.
    pub async fn insert<R: Record>(&self, mut record: R) -> RegistryResult<R> {
        {
            let base = record.base_mut();
            base.id = Uuid::new_v4().to_string();
            base.touch();
        }

        let mut tx = self.begin_write().await?;
        record.assign_code(&mut *tx, &self.codes).await?;
        record.validate()?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            R::TABLE,
            R::select_list()
        ));
        let values = record.base().values().into_iter().chain(record.values());
        for (i, value) in values.enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(")");
        qb.build().execute(&mut *tx).await?;
        tx.commit().await?;

        tracing::debug!(table = R::TABLE, id = %record.base().id, "created {}", R::LABEL);
        Ok(record)
    }

    /// Fetches a record that has not been soft-deleted.
    pub async fn get<R: Record>(&self, id: &str) -> RegistryResult<R> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ? AND deleted = 0",
            R::select_list(),
            R::TABLE
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RegistryError::not_found(R::LABEL, id))?;

        Ok(R::from_row(&row)?)
    }

    /// Lists records matching `filter`, newest first.
    pub async fn list<R: Record>(&self, filter: &ListFilter) -> RegistryResult<Page<R>> {
        let mut count_qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", R::TABLE));
        push_where::<R>(&mut count_qb, filter);
        let count: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM {}", R::select_list(), R::TABLE));
        push_where::<R>(&mut qb, filter);
        qb.push(" ORDER BY created DESC, rowid DESC LIMIT ");
        qb.push_bind(i64::from(filter.page_size));
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset());

        let rows = qb.build().fetch_all(&self.pool).await?;
        let results = rows
            .iter()
            .map(R::from_row)
            .collect::<sqlx::Result<Vec<R>>>()?;

        Ok(Page { count, results })
    }

    /// Merges `changes` over the stored record and writes it back.
    ///
    /// Keys absent from `changes` keep their stored values; `id` cannot be
    /// changed. Clearing a generated code makes a new one be assigned.
    pub async fn update<R: Record>(
        &self,
        id: &str,
        changes: Map<String, Value>,
    ) -> RegistryResult<R> {
        let existing: R = self.get(id).await?;

        let mut merged = serde_json::to_value(&existing)?;
        if let Value::Object(ref mut fields) = merged {
            for (key, value) in changes {
                if key != "id" {
                    fields.insert(key, value);
                }
            }
        }

        let mut record: R = serde_json::from_value(merged)?;
        {
            let base = record.base_mut();
            base.id = existing.base().id.clone();
            base.touch();
        }

        let mut tx = self.begin_write().await?;
        record.assign_code(&mut *tx, &self.codes).await?;
        record.validate()?;

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("UPDATE {} SET ", R::TABLE));
        let columns = BASE_COLUMNS.iter().chain(R::COLUMNS.iter()).skip(1);
        let values = record.base().values().into_iter().chain(record.values()).skip(1);
        for (i, (column, value)) in columns.zip(values).enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(format!("{} = ", column));
            push_value(&mut qb, value);
        }
        qb.push(" WHERE id = ");
        qb.push_bind(record.base().id.clone());
        qb.push(" AND deleted = 0");

        let result = qb.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found(R::LABEL, id));
        }
        tx.commit().await?;

        tracing::debug!(table = R::TABLE, id = %id, "updated {}", R::LABEL);
        Ok(record)
    }

    /// Marks a record deleted. The row stays in storage.
    pub async fn soft_delete<R: Record>(&self, id: &str) -> RegistryResult<()> {
        let sql = format!(
            "UPDATE {} SET deleted = 1, updated = ? WHERE id = ? AND deleted = 0",
            R::TABLE
        );
        let result = sqlx::query(&sql)
            .bind(Utc::now().timestamp_micros())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::not_found(R::LABEL, id));
        }

        tracing::debug!(table = R::TABLE, id = %id, "soft-deleted {}", R::LABEL);
        Ok(())
    }
}
