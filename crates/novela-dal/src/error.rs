pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("User password error: {0}")]
    UserPasswordError(#[from] argon2::password_hash::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Inconsistent delete of novel {novel_id}: {remaining} chapters left")]
    InconsistentDelete { novel_id: i64, remaining: u64 },
}

impl Error {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Error::RecordNotFound(what.into())
    }

    /// Unique constraint violations become [`Error::Conflict`], everything else stays a database error
    pub(crate) fn on_unique(err: sqlx::Error, msg: impl Into<String>) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::Conflict(msg.into())
            }
            other => Error::DatabaseError(other),
        }
    }
}
