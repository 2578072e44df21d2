use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Car with ID '{0}' does not exist")]
    MissingCarReference(i64),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    /// Postgres reports a dangling `car_id` on insert/update as SQLSTATE 23503.
    pub fn check_foreign_key_violation(err: &sqlx::Error) -> bool {
        if let sqlx::Error::Database(db_err) = err {
            return db_err.code().as_deref() == Some("23503");
        }
        false
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
