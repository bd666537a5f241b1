use pagetree_core::error::CoreError;

/// Error returned by repository operations that enforce domain rules
/// (lock checks, slug uniqueness, ordering) inside a transaction.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    /// Flatten into a [`CoreError`], hiding database details behind
    /// [`CoreError::Internal`]. Used where each item's failure is reported
    /// individually rather than as an HTTP error.
    pub fn into_core(self) -> CoreError {
        match self {
            DbError::Core(err) => err,
            DbError::Sqlx(sqlx::Error::RowNotFound) => {
                CoreError::Internal("Row unexpectedly missing".into())
            }
            DbError::Sqlx(err) => {
                tracing::error!(error = %err, "Database error");
                CoreError::Internal("Database error".into())
            }
        }
    }
}
