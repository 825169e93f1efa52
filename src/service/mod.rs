//! Quote operations on top of a [`Storage`] backend.
//!
//! Every write runs in a single storage transaction. Any error drops the
//! transaction before commit, so a failed create never leaves a freshly
//! inserted author behind.

pub mod query;

use rand::Rng;

use crate::{
    storage::{DuplicateAuthor, Storage, StorageRead, StorageTx, StorageWrite},
    types::{
        Author, AuthorId, FilterParams, Quote, QuoteChanges, QuoteFilter, QuoteId, QuotePatch,
        QuotesError, QuotesResult, ValidationError, DEFAULT_RATING,
    },
    validation::{parse_rating, validate_rating, validate_required_text, RatingMode},
};

#[derive(Clone)]
pub struct QuoteService<S> {
    storage: S,
}

/// Matches of a filter together with the constraints that were applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterResult {
    pub quotes: Vec<Quote>,
    pub applied: QuoteFilter,
}

impl<S: Storage> QuoteService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn get_all(&self) -> QuotesResult<Vec<Quote>> {
        Ok(self.storage.list_quotes()?)
    }

    pub fn get_by_id(&self, id: QuoteId) -> QuotesResult<Quote> {
        self.storage
            .load_quote(id)?
            .ok_or_else(|| QuotesError::quote_not_found(id))
    }

    pub fn get_by_author(&self, author_id: AuthorId) -> QuotesResult<Vec<Quote>> {
        if self.storage.load_author(author_id)?.is_none() {
            return Err(QuotesError::author_not_found(author_id));
        }
        Ok(self.storage.list_quotes_by_author(author_id)?)
    }

    pub fn count(&self) -> QuotesResult<u64> {
        Ok(self.storage.count_quotes()?)
    }

    /// Picks a quote uniformly at random.
    ///
    /// Count and lookup share one read snapshot so a concurrent delete cannot
    /// shift the chosen offset past the end.
    pub fn pick_random(&self) -> QuotesResult<Quote> {
        let tx = self.storage.begin_read()?;
        let count = tx.count_quotes()?;
        if count == 0 {
            return Err(QuotesError::NotFound("No quotes available".to_string()));
        }
        let offset = rand::thread_rng().gen_range(0..count);
        let quote = tx
            .load_quote_at(offset)?
            .ok_or_else(|| QuotesError::NotFound("No quotes available".to_string()))?;
        Ok(quote)
    }

    /// Looks up an author by exact name and inserts it when absent.
    ///
    /// Only atomic when `tx` is the same transaction that uses the result.
    pub fn find_or_create_author<T: StorageTx>(&self, tx: &T, name: &str) -> QuotesResult<Author> {
        if let Some(author) = tx.find_author_by_name(name)? {
            return Ok(author);
        }
        match tx.insert_author(name) {
            Ok(author) => {
                log::info!("Created author {} ({})", author.id, author.name);
                Ok(author)
            }
            Err(err) => match err.downcast_ref::<DuplicateAuthor>() {
                Some(dup) => {
                    log::warn!("Lost author insert race for '{}'", dup.0);
                    Err(ValidationError::AuthorConflict(dup.0.clone()).into())
                }
                None => Err(err.into()),
            },
        }
    }

    #[tracing::instrument(skip(self, text, rating))]
    pub fn create(&self, author: &str, text: &str, rating: Option<&str>) -> QuotesResult<Quote> {
        let author = validate_required_text(author, "author")?;
        let text = validate_required_text(text, "text")?;
        let rating = match rating {
            Some(raw) => validate_rating(raw, RatingMode::Create)?,
            None => DEFAULT_RATING,
        };

        let tx = self.storage.begin_tx()?;
        let author = self.find_or_create_author(&tx, &author)?;
        let id = tx.insert_quote(author.id, &text, rating)?;
        let quote = tx
            .load_quote(id)?
            .ok_or_else(|| anyhow::anyhow!("quote {id} vanished after insert"))?;
        tx.commit()?;

        log::info!("Created quote {} by {}", quote.id, quote.author_name);
        Ok(quote)
    }

    #[tracing::instrument(skip(self, patch))]
    pub fn update(&self, id: QuoteId, patch: &QuotePatch) -> QuotesResult<Quote> {
        if patch.is_empty() {
            return Err(ValidationError::NoFields.into());
        }

        let author = patch
            .author
            .as_deref()
            .map(|raw| validate_required_text(raw, "author"))
            .transpose()?;
        let text = patch
            .text
            .as_deref()
            .map(|raw| validate_required_text(raw, "text"))
            .transpose()?;
        let rating = patch
            .rating
            .as_deref()
            .map(|raw| validate_rating(raw, RatingMode::Update))
            .transpose()?;

        let tx = self.storage.begin_tx()?;
        if tx.load_quote(id)?.is_none() {
            return Err(QuotesError::quote_not_found(id));
        }

        let author_id = match author {
            Some(name) => Some(self.find_or_create_author(&tx, &name)?.id),
            None => None,
        };
        let changes = QuoteChanges {
            author_id,
            text,
            rating,
        };
        if !tx.update_quote(id, &changes)? {
            return Err(QuotesError::quote_not_found(id));
        }
        let quote = tx
            .load_quote(id)?
            .ok_or_else(|| QuotesError::quote_not_found(id))?;
        tx.commit()?;

        log::info!("Updated quote {}", id);
        Ok(quote)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&self, id: QuoteId) -> QuotesResult<()> {
        let tx = self.storage.begin_tx()?;
        if !tx.delete_quote(id)? {
            return Err(QuotesError::quote_not_found(id));
        }
        tx.commit()?;

        log::info!("Deleted quote {}", id);
        Ok(())
    }

    /// Coerces raw filter values and runs the resulting conjunction.
    ///
    /// An empty `text` value is dropped rather than rejected, unlike `author`.
    pub fn filter(&self, params: &FilterParams) -> QuotesResult<FilterResult> {
        let mut applied = QuoteFilter::default();

        if let Some(raw) = &params.id {
            let id = raw
                .trim()
                .parse::<QuoteId>()
                .map_err(|_| ValidationError::InvalidId(raw.clone()))?;
            applied.id = Some(id);
        }
        if let Some(raw) = &params.author {
            applied.author = Some(validate_required_text(raw, "author")?);
        }
        if let Some(raw) = &params.text {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                applied.text = Some(trimmed.to_string());
            }
        }
        if let Some(raw) = &params.rating {
            let rating =
                parse_rating(raw).ok_or_else(|| ValidationError::InvalidRating(raw.clone()))?;
            applied.rating = Some(rating);
        }

        if applied.is_empty() {
            log::debug!("No usable filters given, matching every quote");
        }
        let quotes = self.storage.filter_quotes(&applied)?;
        log::debug!("Filter {:?} matched {} quotes", applied, quotes.len());
        Ok(FilterResult { quotes, applied })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::{sqlite::SqliteTx, SqliteStorage};
    use tempfile::TempDir;

    pub(crate) fn temp_service() -> (TempDir, QuoteService<SqliteStorage>) {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(dir.path().join("quotes.sqlite"));
        storage.init().unwrap();
        (dir, QuoteService::new(storage))
    }

    /// Storage whose transactions never see committed authors, as if a
    /// concurrent writer inserted the name between lookup and insert.
    #[derive(Clone)]
    pub(crate) struct StaleAuthorLookup(pub(crate) SqliteStorage);

    pub(crate) struct StaleAuthorTx(SqliteTx);

    impl StorageRead for StaleAuthorLookup {
        fn list_quotes(&self) -> anyhow::Result<Vec<Quote>> {
            self.0.list_quotes()
        }
        fn load_quote(&self, id: QuoteId) -> anyhow::Result<Option<Quote>> {
            self.0.load_quote(id)
        }
        fn list_quotes_by_author(&self, author_id: AuthorId) -> anyhow::Result<Vec<Quote>> {
            self.0.list_quotes_by_author(author_id)
        }
        fn count_quotes(&self) -> anyhow::Result<u64> {
            self.0.count_quotes()
        }
        fn load_quote_at(&self, offset: u64) -> anyhow::Result<Option<Quote>> {
            self.0.load_quote_at(offset)
        }
        fn filter_quotes(&self, filter: &QuoteFilter) -> anyhow::Result<Vec<Quote>> {
            self.0.filter_quotes(filter)
        }
        fn load_author(&self, id: AuthorId) -> anyhow::Result<Option<Author>> {
            self.0.load_author(id)
        }
        fn find_author_by_name(&self, name: &str) -> anyhow::Result<Option<Author>> {
            self.0.find_author_by_name(name)
        }
    }

    impl Storage for StaleAuthorLookup {
        type Tx = StaleAuthorTx;
        type ReadTx = SqliteTx;

        fn begin_tx(&self) -> anyhow::Result<Self::Tx> {
            Ok(StaleAuthorTx(self.0.begin_tx()?))
        }

        fn begin_read(&self) -> anyhow::Result<Self::ReadTx> {
            self.0.begin_read()
        }
    }

    impl StorageRead for StaleAuthorTx {
        fn list_quotes(&self) -> anyhow::Result<Vec<Quote>> {
            self.0.list_quotes()
        }
        fn load_quote(&self, id: QuoteId) -> anyhow::Result<Option<Quote>> {
            self.0.load_quote(id)
        }
        fn list_quotes_by_author(&self, author_id: AuthorId) -> anyhow::Result<Vec<Quote>> {
            self.0.list_quotes_by_author(author_id)
        }
        fn count_quotes(&self) -> anyhow::Result<u64> {
            self.0.count_quotes()
        }
        fn load_quote_at(&self, offset: u64) -> anyhow::Result<Option<Quote>> {
            self.0.load_quote_at(offset)
        }
        fn filter_quotes(&self, filter: &QuoteFilter) -> anyhow::Result<Vec<Quote>> {
            self.0.filter_quotes(filter)
        }
        fn load_author(&self, id: AuthorId) -> anyhow::Result<Option<Author>> {
            self.0.load_author(id)
        }
        fn find_author_by_name(&self, _name: &str) -> anyhow::Result<Option<Author>> {
            Ok(None)
        }
    }

    impl StorageWrite for StaleAuthorTx {
        fn insert_author(&self, name: &str) -> anyhow::Result<Author> {
            self.0.insert_author(name)
        }
        fn insert_quote(&self, author_id: AuthorId, text: &str, rating: u8) -> anyhow::Result<QuoteId> {
            self.0.insert_quote(author_id, text, rating)
        }
        fn update_quote(&self, id: QuoteId, changes: &QuoteChanges) -> anyhow::Result<bool> {
            self.0.update_quote(id, changes)
        }
        fn delete_quote(&self, id: QuoteId) -> anyhow::Result<bool> {
            self.0.delete_quote(id)
        }
    }

    impl StorageTx for StaleAuthorTx {
        fn commit(self) -> anyhow::Result<()> {
            self.0.commit()
        }
    }

    fn author_count(service: &QuoteService<SqliteStorage>) -> i64 {
        let conn = rusqlite::Connection::open(&service.storage.path).unwrap();
        conn.query_row("SELECT COUNT(*) FROM authors", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn create_defaults_missing_or_invalid_rating() {
        let (_dir, service) = temp_service();

        let missing = service.create("Kant", "Act only...", None).unwrap();
        assert_eq!(missing.rating, 1);

        for raw in ["0", "6", "abc", ""] {
            let quote = service.create("Kant", "Act only...", Some(raw)).unwrap();
            assert_eq!(quote.rating, 1, "raw = {raw:?}");
        }
    }

    #[test]
    fn create_and_update_preserve_valid_ratings() {
        let (_dir, service) = temp_service();

        for r in 1..=5u8 {
            let created = service
                .create("Kant", "Act only...", Some(&r.to_string()))
                .unwrap();
            assert_eq!(created.rating, r);

            let patch = QuotePatch {
                rating: Some(r.to_string()),
                ..Default::default()
            };
            assert_eq!(service.update(created.id, &patch).unwrap().rating, r);
        }
    }

    #[test]
    fn create_rejects_blank_author_or_text() {
        let (_dir, service) = temp_service();

        let err = service.create("  ", "text", None).unwrap_err();
        assert!(matches!(
            err,
            QuotesError::Validation(ValidationError::EmptyField("author"))
        ));
        let err = service.create("Kant", "", None).unwrap_err();
        assert!(matches!(
            err,
            QuotesError::Validation(ValidationError::EmptyField("text"))
        ));
        assert_eq!(service.count().unwrap(), 0);
        assert_eq!(author_count(&service), 0);
    }

    #[test]
    fn create_trims_fields() {
        let (_dir, service) = temp_service();

        let quote = service.create(" Kant ", "  Act only...  ", Some(" 3 ")).unwrap();
        assert_eq!(quote.author_name, "Kant");
        assert_eq!(quote.text, "Act only...");
        assert_eq!(quote.rating, 3);
    }

    #[test]
    fn create_reuses_existing_author() {
        let (_dir, service) = temp_service();

        let first = service.create("Oscar Wilde", "Be yourself.", None).unwrap();
        let second = service
            .create("Oscar Wilde", "I can resist everything except temptation.", None)
            .unwrap();

        assert_eq!(first.author_id, second.author_id);
        assert_ne!(first.id, second.id);
        assert_eq!(author_count(&service), 1);
        assert_eq!(service.get_by_author(first.author_id).unwrap().len(), 2);
    }

    #[test]
    fn find_or_create_author_is_idempotent_within_tx() {
        let (_dir, service) = temp_service();

        let tx = service.storage.begin_tx().unwrap();
        let author = service.find_or_create_author(&tx, "Kant").unwrap();
        let again = service.find_or_create_author(&tx, "Kant").unwrap();
        assert_eq!(author, again);
        tx.commit().unwrap();

        assert_eq!(author_count(&service), 1);
    }

    #[test]
    fn lost_author_insert_race_is_a_retryable_validation_error() {
        let (_dir, service) = temp_service();
        service.create("Kant", "Act only...", None).unwrap();
        let racing = QuoteService::new(StaleAuthorLookup(service.storage.clone()));

        let tx = racing.storage.begin_tx().unwrap();
        let err = racing.find_or_create_author(&tx, "Kant").unwrap_err();
        assert!(matches!(
            err,
            QuotesError::Validation(ValidationError::AuthorConflict(ref name)) if name == "Kant"
        ));
        drop(tx);

        let err = racing.create("Kant", "Sapere aude.", None).unwrap_err();
        assert!(matches!(
            err,
            QuotesError::Validation(ValidationError::AuthorConflict(_))
        ));
        assert_eq!(service.count().unwrap(), 1);
        assert_eq!(author_count(&service), 1);
    }

    #[test]
    fn update_rejects_invalid_rating_without_changes() {
        let (_dir, service) = temp_service();
        let quote = service.create("Kant", "Act only...", Some("2")).unwrap();

        for raw in ["9", "0", "abc"] {
            let patch = QuotePatch {
                text: Some("changed".to_string()),
                rating: Some(raw.to_string()),
                ..Default::default()
            };
            let err = service.update(quote.id, &patch).unwrap_err();
            assert!(matches!(
                err,
                QuotesError::Validation(ValidationError::InvalidRating(_))
            ));
        }
        assert_eq!(service.get_by_id(quote.id).unwrap(), quote);
    }

    #[test]
    fn update_without_fields_fails_for_any_id() {
        let (_dir, service) = temp_service();
        let quote = service.create("Kant", "Act only...", None).unwrap();

        for id in [quote.id, quote.id + 100] {
            let err = service.update(id, &QuotePatch::default()).unwrap_err();
            assert!(matches!(
                err,
                QuotesError::Validation(ValidationError::NoFields)
            ));
        }
    }

    #[test]
    fn update_missing_quote_is_not_found() {
        let (_dir, service) = temp_service();
        let patch = QuotePatch {
            text: Some("text".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(404, &patch).unwrap_err(),
            QuotesError::NotFound(_)
        ));
    }

    #[test]
    fn update_applies_only_provided_fields() {
        let (_dir, service) = temp_service();
        let quote = service.create("Kant", "Act only...", Some("4")).unwrap();

        let patch = QuotePatch {
            author: Some("Immanuel Kant".to_string()),
            ..Default::default()
        };
        let updated = service.update(quote.id, &patch).unwrap();
        assert_eq!(updated.author_name, "Immanuel Kant");
        assert_eq!(updated.text, "Act only...");
        assert_eq!(updated.rating, 4);

        // the previous author stays behind with no quotes
        assert_eq!(author_count(&service), 2);
        assert!(service.get_by_author(quote.author_id).unwrap().is_empty());
    }

    #[test]
    fn update_rejects_blank_author() {
        let (_dir, service) = temp_service();
        let quote = service.create("Kant", "Act only...", None).unwrap();
        let patch = QuotePatch {
            author: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(quote.id, &patch).unwrap_err(),
            QuotesError::Validation(ValidationError::EmptyField("author"))
        ));
    }

    #[test]
    fn delete_keeps_author() {
        let (_dir, service) = temp_service();
        let quote = service.create("Kant", "Act only...", None).unwrap();

        service.delete(quote.id).unwrap();
        assert!(matches!(
            service.get_by_id(quote.id).unwrap_err(),
            QuotesError::NotFound(_)
        ));
        assert!(matches!(
            service.delete(quote.id).unwrap_err(),
            QuotesError::NotFound(_)
        ));
        assert!(service.get_by_author(quote.author_id).unwrap().is_empty());
        assert_eq!(author_count(&service), 1);
    }

    #[test]
    fn get_by_author_requires_existing_author() {
        let (_dir, service) = temp_service();
        assert!(matches!(
            service.get_by_author(1).unwrap_err(),
            QuotesError::NotFound(_)
        ));
    }

    #[test]
    fn pick_random_covers_store() {
        let (_dir, service) = temp_service();
        assert!(matches!(
            service.pick_random().unwrap_err(),
            QuotesError::NotFound(_)
        ));

        let ids: Vec<QuoteId> = (0..3)
            .map(|i| service.create("Kant", &format!("quote {i}"), None).unwrap().id)
            .collect();
        for _ in 0..20 {
            let picked = service.pick_random().unwrap();
            assert!(ids.contains(&picked.id));
        }
    }

    #[test]
    fn filter_validates_id_and_rating() {
        let (_dir, service) = temp_service();

        for raw in ["6", "0", "abc"] {
            let params = FilterParams {
                rating: Some(raw.to_string()),
                ..Default::default()
            };
            assert!(matches!(
                service.filter(&params).unwrap_err(),
                QuotesError::Validation(ValidationError::InvalidRating(_))
            ));
        }

        let params = FilterParams {
            id: Some("x1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.filter(&params).unwrap_err(),
            QuotesError::Validation(ValidationError::InvalidId(_))
        ));
    }

    #[test]
    fn filter_rejects_empty_author_but_ignores_empty_text() {
        let (_dir, service) = temp_service();
        service.create("Kant", "Act only...", None).unwrap();

        let params = FilterParams {
            author: Some("".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.filter(&params).unwrap_err(),
            QuotesError::Validation(ValidationError::EmptyField("author"))
        ));

        let params = FilterParams {
            text: Some("  ".to_string()),
            ..Default::default()
        };
        let result = service.filter(&params).unwrap();
        assert!(result.applied.is_empty());
        assert_eq!(result.quotes.len(), 1);
    }

    #[test]
    fn filter_reports_applied_constraints() {
        let (_dir, service) = temp_service();
        let quote = service.create("Kant", "Act only...", Some("5")).unwrap();
        service.create("Hume", "Reason is the slave of the passions.", Some("5")).unwrap();

        let params = FilterParams {
            id: Some(quote.id.to_string()),
            rating: Some("5".to_string()),
            ..Default::default()
        };
        let result = service.filter(&params).unwrap();
        assert_eq!(result.quotes, vec![quote.clone()]);
        assert_eq!(result.applied.id, Some(quote.id));
        assert_eq!(result.applied.rating, Some(5));

        let params = FilterParams {
            author: Some("Nobody".to_string()),
            ..Default::default()
        };
        let result = service.filter(&params).unwrap();
        assert!(result.quotes.is_empty());
        assert_eq!(result.applied.author.as_deref(), Some("Nobody"));
    }
}
