/// Errors produced while fetching dashboard data or building upsert statements.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Result set has neither a `location` nor a `county` column.
    #[error("None of the expected geographies were included in the insert table")]
    MissingGeography,

    /// County-level insert requested without a state FIPS code.
    #[error("County geography requires a state FIPS code")]
    MissingStateFips,

    /// Table, staging table or key column name is not a plain SQL identifier.
    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Server kept reporting `exceededTransferLimit` past the page budget.
    #[error("Pagination exceeded {pages} pages")]
    PaginationExceeded { pages: usize },

    #[error("Invalid epoch millisecond timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Body parsed as JSON but not in the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
