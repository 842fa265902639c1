pub mod chapter;
pub mod engagement;
pub mod error;
pub mod genre;
pub mod novel;
pub mod review;
pub mod user;

use std::{fmt::Display, str::FromStr as _, time::Duration};

pub use error::Error;
pub use sqlx::Error as SqlxError;
use sqlx::{
    Connection as _,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;
pub type ChosenConnection = sqlx::SqliteConnection;

pub const MAX_LIMIT: usize = 10_000;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    let in_memory = database_url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }
    // every connection to an in-memory database would see its own empty database
    let max_connections = if in_memory { 1 } else { 50 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Starts transaction holding the write lock from the beginning.
///
/// Deferred transaction which reads first and writes later cannot wait for the lock,
/// SQLite fails it with `SQLITE_BUSY` as soon as another connection writes.
pub(crate) async fn begin_write(
    conn: &mut ChosenConnection,
) -> Result<sqlx::Transaction<'_, ChosenDB>> {
    let tx = conn.begin_with("BEGIN IMMEDIATE").await?;
    Ok(tx)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Asc(String),
    Desc(String),
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Order::Asc(s) => write!(f, "{}", s),
            Order::Desc(s) => write!(f, "{} DESC", s),
        }
    }
}

impl AsRef<str> for Order {
    fn as_ref(&self) -> &str {
        match self {
            Order::Asc(s) => s.as_str(),
            Order::Desc(s) => s.as_str(),
        }
    }
}

/// Sortable field - name used in requests and the column it maps to
pub type SortField = (&'static str, &'static str);

#[derive(Debug, Clone)]
pub struct ListingParams {
    pub offset: i64,
    pub limit: i64,
    pub order: Option<Vec<Order>>,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: MAX_LIMIT as i64,
            order: None,
        }
    }
}

impl ListingParams {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset,
            limit,
            order: None,
        }
    }

    pub fn with_order(mut self, order: Vec<Order>) -> Self {
        self.order = Some(order);
        self
    }

    /// Builds ORDER BY clause from requested ordering, fields are checked against `valid_fields`.
    /// `tie_breaker` is always appended last, so paging is stable
    pub fn ordering(&self, valid_fields: &[SortField], tie_breaker: &str) -> Result<String> {
        let mut parts = self
            .order
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|o| {
                let column = valid_fields
                    .iter()
                    .find(|(name, _)| *name == o.as_ref())
                    .map(|(_, column)| *column)
                    .ok_or_else(|| Error::InvalidOrderByField(o.as_ref().to_string()))?;
                Ok(match o {
                    Order::Asc(_) => column.to_string(),
                    Order::Desc(_) => format!("{column} DESC"),
                })
            })
            .collect::<Result<Vec<String>>>()?;
        parts.push(tie_breaker.to_string());
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}

/// One page of rows together with total count of rows matching the same filter
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub offset: i64,
    pub limit: i64,
    pub rows: Vec<T>,
    pub total: u64,
}

impl<T> Batch<T> {
    pub fn new(params: &ListingParams, rows: Vec<T>, total: u64) -> Self {
        Self {
            offset: params.offset,
            limit: params.limit,
            rows,
            total,
        }
    }
}

/// Escapes LIKE wildcards, pattern must be used with `ESCAPE '\'`
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[SortField] = &[("title", "n.title"), ("viewsCount", "n.views_count")];

    #[test]
    fn test_ordering() {
        let params = ListingParams::default();
        assert_eq!(params.ordering(FIELDS, "n.id").unwrap(), "ORDER BY n.id");

        let params = ListingParams::default().with_order(vec![
            Order::Desc("viewsCount".into()),
            Order::Asc("title".into()),
        ]);
        assert_eq!(
            params.ordering(FIELDS, "n.id").unwrap(),
            "ORDER BY n.views_count DESC, n.title, n.id"
        );
    }

    #[test]
    fn test_ordering_rejects_unknown_field() {
        let params = ListingParams::default().with_order(vec![Order::Asc("password".into())]);
        assert!(matches!(
            params.ordering(FIELDS, "n.id"),
            Err(Error::InvalidOrderByField(f)) if f == "password"
        ));
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("dragon"), "%dragon%");
        assert_eq!(like_pattern("100%_x\\"), "%100\\%\\_x\\\\%");
    }
}
