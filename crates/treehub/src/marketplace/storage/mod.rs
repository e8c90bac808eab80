//! SQLite persistence: the connection handle, schema bootstrap, and the column
//! codecs shared by the repositories.

pub(crate) mod rows;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, ErrorCode, Row, Transaction};

use super::domain::{
    AccountId, ApplicationId, ApplicationStatus, Availability, CompanyId, CompanySize,
    EquipmentCategory, EquipmentCondition, EquipmentId, JobId, JobStatus, JobType, Parking,
    PayType, ProfessionalId, Role, SkillLevel, SkillType, Slope, Urgency,
};
use super::error::MarketplaceError;

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite failure: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to encode column: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("credential hashing failed: {0}")]
    Hashing(String),
    #[error("session signing failed: {0}")]
    Signing(String),
    #[error("database connection lock poisoned")]
    Poisoned,
}

/// Shared handle to the marketplace database.
///
/// Every operation borrows the connection for exactly one closure; the guard
/// (and any open transaction) is released when the closure returns, on the
/// error path as well.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open a file-backed database (or `:memory:`) and apply the schema.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Self::bootstrap(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StorageError> {
        register_fold(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_conn<T, F>(&self, operation: F) -> Result<T, MarketplaceError>
    where
        F: FnOnce(&Connection) -> Result<T, MarketplaceError>,
    {
        let guard = self.lock()?;
        operation(&guard)
    }

    /// Run `operation` inside a transaction. Commits on `Ok`; dropping the
    /// transaction on `Err` rolls every write back.
    pub fn with_tx<T, F>(&self, operation: F) -> Result<T, MarketplaceError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, MarketplaceError>,
    {
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        let value = operation(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

/// `fold(text)`: Unicode lowercase, used for case-insensitive matching.
/// SQLite's own `lower()` only folds ASCII.
fn register_fold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|value| value.to_lowercase()))
        },
    )
}

/// True when the statement failed on a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => {
            inner.code == ErrorCode::ConstraintViolation
                && (inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Map a unique-constraint failure to `Conflict`, anything else to storage.
pub(crate) fn conflict_or_storage(err: rusqlite::Error, message: &str) -> MarketplaceError {
    if is_unique_violation(&err) {
        MarketplaceError::Conflict(message.to_string())
    } else {
        MarketplaceError::from(err)
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn timestamp_column(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(column)?;
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Integer,
            format!("timestamp {millis} out of range for column {column}").into(),
        )
    })
}

pub(crate) fn encode_list(values: &[String]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(values)?)
}

pub(crate) fn list_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(err)))
}

/// Accumulates `where` fragments and their positional text parameters.
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    clauses: Vec<String>,
    params: Vec<String>,
}

impl WhereClause {
    pub(crate) fn new(fixed: &str) -> Self {
        Self {
            clauses: vec![fixed.to_string()],
            params: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    /// Adds `clause(placeholders)` when `values` is non-empty; the values are
    /// OR-ed by the `in (...)` the clause builds.
    pub(crate) fn any_of<'a, I>(&mut self, values: I, clause: impl FnOnce(&str) -> String)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let values: Vec<String> = values.into_iter().map(str::to_string).collect();
        if values.is_empty() {
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.clauses.push(clause(&placeholders));
        self.params.extend(values);
    }

    /// Case-insensitive substring match against any of `columns`.
    pub(crate) fn contains_text(&mut self, needle: Option<&str>, columns: &[&str]) {
        let Some(needle) = needle.map(str::trim).filter(|needle| !needle.is_empty()) else {
            return;
        };
        let alternatives: Vec<String> = columns
            .iter()
            .map(|column| format!("instr(fold(coalesce({column}, '')), fold(?)) > 0"))
            .collect();
        self.clauses.push(format!("({})", alternatives.join(" or ")));
        self.params.extend(columns.iter().map(|_| needle.to_string()));
    }

    pub(crate) fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" where {}", self.clauses.join(" and "))
        }
    }

    pub(crate) fn params(&self) -> &[String] {
        &self.params
    }
}

macro_rules! text_column {
    ($($name:ty),+ $(,)?) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|err| FromSqlError::Other(Box::new(err)))
                }
            }
        )+
    };
}

macro_rules! id_column {
    ($($name:ident),+ $(,)?) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    String::column_result(value).map($name)
                }
            }
        )+
    };
}

text_column!(
    Role,
    Availability,
    CompanySize,
    SkillType,
    SkillLevel,
    JobType,
    Urgency,
    JobStatus,
    PayType,
    Slope,
    Parking,
    EquipmentCategory,
    EquipmentCondition,
    ApplicationStatus,
);

id_column!(
    AccountId,
    ProfessionalId,
    CompanyId,
    JobId,
    EquipmentId,
    ApplicationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_and_enforces_foreign_keys() {
        let db = Database::open_in_memory().expect("schema applies");
        let result = db.with_conn(|conn| {
            conn.execute(
                "insert into credentials (account_id, password_hash, created_at, updated_at)
                 values ('missing', 'hash', 0, 0)",
                [],
            )?;
            Ok(())
        });
        assert!(matches!(result, Err(MarketplaceError::Storage(_))));
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = Database::open_in_memory().expect("schema applies");
        let result: Result<(), MarketplaceError> = db.with_tx(|tx| {
            tx.execute(
                "insert into accounts (id, name, email, role, verified, created_at)
                 values ('a-1', 'Ada', 'ada@example.com', 'HOMEOWNER', 0, 0)",
                [],
            )?;
            Err(MarketplaceError::validation("abort"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("select count(*) from accounts", [], |row| row.get(0))?)
            })
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = Database::open_in_memory().expect("schema applies");
        let insert = |id: &str| {
            db.with_conn(|conn| {
                conn.execute(
                    "insert into accounts (id, name, email, role, verified, created_at)
                     values (?1, 'Ada', 'ada@example.com', 'HOMEOWNER', 0, 0)",
                    [id],
                )
                .map_err(|err| conflict_or_storage(err, "email taken"))?;
                Ok(())
            })
        };
        insert("a-1").expect("first insert");
        match insert("a-2") {
            Err(MarketplaceError::Conflict(message)) => assert_eq!(message, "email taken"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn where_clause_skips_empty_dimensions() {
        let mut clause = WhereClause::new("j.status = 'OPEN'");
        clause.contains_text(Some("  "), &["j.city"]);
        clause.any_of(std::iter::empty(), |slots| format!("j.urgency in ({slots})"));
        assert_eq!(clause.sql(), " where j.status = 'OPEN'");
        assert!(clause.params().is_empty());

        clause.contains_text(Some("tx"), &["j.city", "j.state"]);
        clause.any_of(["URGENT", "EMERGENCY"], |slots| format!("j.urgency in ({slots})"));
        assert_eq!(
            clause.sql(),
            " where j.status = 'OPEN' and (instr(fold(coalesce(j.city, '')), fold(?)) > 0 \
             or instr(fold(coalesce(j.state, '')), fold(?)) > 0) and j.urgency in (?, ?)"
        );
        assert_eq!(clause.params(), ["tx", "tx", "URGENT", "EMERGENCY"]);
    }

    #[test]
    fn fold_lowercases_beyond_ascii() {
        let db = Database::open_in_memory().expect("schema applies");
        let (folded, missing): (String, Option<String>) = db
            .with_conn(|conn| {
                Ok(conn.query_row("select fold('ÉVRY Straße'), fold(null)", [], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?)
            })
            .expect("fold runs");
        assert_eq!(folded, "évry straße");
        assert!(missing.is_none());
    }
}
