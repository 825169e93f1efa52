mod quote;
mod quotes_error;

pub use quote::{
    Author, AuthorId, FilterParams, Quote, QuoteChanges, QuoteFilter, QuoteId, QuotePatch,
    DEFAULT_RATING, MAX_RATING, MIN_RATING,
};
pub use quotes_error::{QuotesError, QuotesResult, ValidationError};
