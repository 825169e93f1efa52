use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),
    #[error("rating must be an integer from 1 to 5, got '{0}'")]
    InvalidRating(String),
    #[error("id must be an integer, got '{0}'")]
    InvalidId(String),
    #[error("no updatable fields provided, expected one of: author, text, rating")]
    NoFields,
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("author '{0}' was created concurrently, retry the request")]
    AuthorConflict(String),
}

#[derive(Debug, Error)]
pub enum QuotesError {
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("persistence error: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl QuotesError {
    pub fn quote_not_found(id: i64) -> Self {
        QuotesError::NotFound(format!("Quote with id={id} not found"))
    }

    pub fn author_not_found(id: i64) -> Self {
        QuotesError::NotFound(format!("Author with id={id} not found"))
    }
}

pub type QuotesResult<T> = Result<T, QuotesError>;
