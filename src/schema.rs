//! Shared record base and the contract every registry entity implements.
//!
//! Entities are declared with the [`record!`] macro, which generates the
//! struct (with a flattened [`Base`]) and its [`Table`] mapping. The
//! hand-written [`Record`] impl next to each declaration supplies the
//! label, validation rules and code assignment.
//!
//! # Storage conventions
//!
//! | Rust type | SQLite column |
//! |-----------|---------------|
//! | `String` / `Option<String>` | `TEXT` |
//! | `i64` / `u32` / `Option<i64>` | `INTEGER` |
//! | `bool` | `INTEGER` (0/1) |
//! | `NaiveDate` | `TEXT` (`YYYY-MM-DD`) |
//! | `DateTime<Utc>` | `INTEGER` (microseconds since epoch) |

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::fmt;

use crate::config::CodesConfig;
use crate::error::{RegistryResult, ValidationError};

/// Columns every table carries, in storage order.
pub const BASE_COLUMNS: &[&str] = &["id", "created", "updated", "active", "deleted"];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Identity, timestamps and lifecycle flags shared by all entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Base {
    #[serde(default)]
    pub id: String,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub deleted: bool,
}

fn default_active() -> bool {
    true
}

impl Default for Base {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            created: now,
            updated: now,
            active: true,
            deleted: false,
        }
    }
}

impl Base {
    /// Sets `updated` to now, truncating both timestamps to the microsecond
    /// precision they are stored with.
    pub fn touch(&mut self) {
        self.created = self.created.trunc_subsecs(6);
        self.updated = Utc::now().trunc_subsecs(6);
    }

    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.to_sql(),
            self.created.to_sql(),
            self.updated.to_sql(),
            self.active.to_sql(),
            self.deleted.to_sql(),
        ]
    }

    pub fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: Column::read(row, "id")?,
            created: Column::read(row, "created")?,
            updated: Column::read(row, "updated")?,
            active: Column::read(row, "active")?,
            deleted: Column::read(row, "deleted")?,
        })
    }
}

/// A value ready to be bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

/// Conversion between a field type and its SQLite column.
pub trait Column: Sized {
    fn to_sql(&self) -> SqlValue;
    fn read(row: &SqliteRow, name: &str) -> sqlx::Result<Self>;
}

fn decode_error(column: &str, message: impl fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(format!("column {}: {}", column, message).into())
}

impl Column for String {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
    fn read(row: &SqliteRow, name: &str) -> sqlx::Result<Self> {
        row.try_get(name)
    }
}

impl Column for Option<String> {
    fn to_sql(&self) -> SqlValue {
        match self {
            Some(s) => SqlValue::Text(s.clone()),
            None => SqlValue::Null,
        }
    }
    fn read(row: &SqliteRow, name: &str) -> sqlx::Result<Self> {
        row.try_get(name)
    }
}

impl Column for i64 {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Integer(*self)
    }
    fn read(row: &SqliteRow, name: &str) -> sqlx::Result<Self> {
        row.try_get(name)
    }
}

impl Column for Option<i64> {
    fn to_sql(&self) -> SqlValue {
        match self {
            Some(v) => SqlValue::Integer(*v),
            None => SqlValue::Null,
        }
    }
    fn read(row: &SqliteRow, name: &str) -> sqlx::Result<Self> {
        row.try_get(name)
    }
}

impl Column for u32 {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Integer(i64::from(*self))
    }
    fn read(row: &SqliteRow, name: &str) -> sqlx::Result<Self> {
        let raw: i64 = row.try_get(name)?;
        u32::try_from(raw).map_err(|_| decode_error(name, format!("{} is not a u32", raw)))
    }
}

impl Column for bool {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Integer(i64::from(*self))
    }
    fn read(row: &SqliteRow, name: &str) -> sqlx::Result<Self> {
        let raw: i64 = row.try_get(name)?;
        Ok(raw != 0)
    }
}

impl Column for NaiveDate {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.format(DATE_FORMAT).to_string())
    }
    fn read(row: &SqliteRow, name: &str) -> sqlx::Result<Self> {
        let raw: String = row.try_get(name)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| decode_error(name, e))
    }
}

impl Column for DateTime<Utc> {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Integer(self.timestamp_micros())
    }
    fn read(row: &SqliteRow, name: &str) -> sqlx::Result<Self> {
        let raw: i64 = row.try_get(name)?;
        DateTime::from_timestamp_micros(raw)
            .ok_or_else(|| decode_error(name, format!("{} is out of range", raw)))
    }
}

/// Mapping between an entity struct and its table.
pub trait Table: Sized {
    const TABLE: &'static str;
    /// Entity-specific columns, in the order returned by [`Table::values`].
    const COLUMNS: &'static [&'static str];

    fn base(&self) -> &Base;
    fn base_mut(&mut self) -> &mut Base;
    fn values(&self) -> Vec<SqlValue>;
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self>;

    fn select_list() -> String {
        BASE_COLUMNS
            .iter()
            .chain(Self::COLUMNS.iter())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Behaviour layered over a [`Table`]: labels, validation and code
/// assignment at write time.
#[async_trait]
pub trait Record:
    Table + fmt::Display + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static
{
    /// Human-readable entity name used in errors and logs.
    const LABEL: &'static str;
    /// Column matched by the `search` list parameter, if any.
    const SEARCH_FIELD: Option<&'static str> = None;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Fills in generated codes. Runs inside the write transaction.
    async fn assign_code(
        &mut self,
        _conn: &mut SqliteConnection,
        _codes: &CodesConfig,
    ) -> RegistryResult<()> {
        Ok(())
    }
}

/// Declares an entity struct with a flattened [`Base`] and derives its
/// [`Table`] mapping. Column names equal field names.
macro_rules! record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident in $table:literal {
            $(
                $(#[$fmeta:meta])*
                pub $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $name {
            #[serde(flatten)]
            pub base: $crate::schema::Base,
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        impl $crate::schema::Table for $name {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn base(&self) -> &$crate::schema::Base {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::schema::Base {
                &mut self.base
            }

            fn values(&self) -> Vec<$crate::schema::SqlValue> {
                vec![$($crate::schema::Column::to_sql(&self.$field)),*]
            }

            fn from_row(row: &::sqlx::sqlite::SqliteRow) -> ::sqlx::Result<Self> {
                Ok(Self {
                    base: $crate::schema::Base::from_row(row)?,
                    $($field: $crate::schema::Column::read(row, stringify!($field))?,)*
                })
            }
        }
    };
}

pub(crate) use record;

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
