use crate::{
    storage::Storage,
    types::{FilterParams, Quote, QuoteFilter, QuotesResult},
};

use super::QuoteService;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterOutcome {
    Matches(Vec<Quote>),
    /// Nothing matched. Not an error; the caller reports the filters used.
    NoMatches { filters_applied: QuoteFilter },
}

pub struct QueryService<'a, S> {
    quotes: &'a QuoteService<S>,
}

impl<'a, S: Storage> QueryService<'a, S> {
    pub fn new(quotes: &'a QuoteService<S>) -> Self {
        Self { quotes }
    }

    pub fn run(&self, params: &FilterParams) -> QuotesResult<FilterOutcome> {
        let result = self.quotes.filter(params)?;
        if result.quotes.is_empty() {
            log::info!("No quotes matched filters {:?}", result.applied);
            return Ok(FilterOutcome::NoMatches {
                filters_applied: result.applied,
            });
        }
        Ok(FilterOutcome::Matches(result.quotes))
    }
}
