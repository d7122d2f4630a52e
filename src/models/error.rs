use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to get database connection from pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database query failed for '{operation}': {cause}")]
    Query {
        operation: String,
        cause: rusqlite::Error,
    },

    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

impl ApiError {
    pub fn query(operation: &str, cause: rusqlite::Error) -> Self {
        ApiError::Query {
            operation: operation.to_string(),
            cause,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
