use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed") => {
            RepoError::Duplicate {
                constraint: db
                    .constraint()
                    .map(str::to_string)
                    .or_else(|| {
                        db.message()
                            .split_once(": ")
                            .map(|(_, columns)| columns.to_string())
                    })
                    .unwrap_or_else(|| "unknown".to_string()),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("FOREIGN KEY constraint failed")
                || db.message().contains("datatype mismatch") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("constraint failed") => {
            RepoError::Integrity {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("database is locked")
                || db.message().contains("interrupted") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}
