use anyhow::Result;
use thiserror::Error;

use crate::types::{Author, AuthorId, Quote, QuoteChanges, QuoteFilter, QuoteId};

/// Raised by `insert_author` when another writer already holds the name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("author name already exists: {0}")]
pub struct DuplicateAuthor(pub String);

pub trait StorageRead {
    fn list_quotes(&self) -> Result<Vec<Quote>>;
    fn load_quote(&self, id: QuoteId) -> Result<Option<Quote>>;
    fn list_quotes_by_author(&self, author_id: AuthorId) -> Result<Vec<Quote>>;
    fn count_quotes(&self) -> Result<u64>;
    /// Quote at `offset` in id order.
    fn load_quote_at(&self, offset: u64) -> Result<Option<Quote>>;
    fn filter_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>>;
    fn load_author(&self, id: AuthorId) -> Result<Option<Author>>;
    fn find_author_by_name(&self, name: &str) -> Result<Option<Author>>;
}

pub trait StorageWrite {
    fn insert_author(&self, name: &str) -> Result<Author>;
    fn insert_quote(&self, author_id: AuthorId, text: &str, rating: u8) -> Result<QuoteId>;
    /// Returns false when no row has `id`.
    fn update_quote(&self, id: QuoteId, changes: &QuoteChanges) -> Result<bool>;
    /// Returns false when no row has `id`.
    fn delete_quote(&self, id: QuoteId) -> Result<bool>;
}

/// A write transaction. Dropping it without `commit` rolls everything back.
pub trait StorageTx: StorageRead + StorageWrite {
    fn commit(self) -> Result<()>;
}

pub trait Storage: StorageRead {
    type Tx: StorageTx;
    type ReadTx: StorageRead;

    fn begin_tx(&self) -> Result<Self::Tx>;
    /// Consistent read view that does not take the write lock. Ends on drop.
    fn begin_read(&self) -> Result<Self::ReadTx>;
}
