use anyhow::Result;
use rusqlite::{
    params, params_from_iter, types::Value, Connection, ErrorCode, OptionalExtension,
};
use std::path::Path;

use super::traits::{DuplicateAuthor, Storage, StorageRead, StorageTx, StorageWrite};
use crate::types::{Author, AuthorId, Quote, QuoteChanges, QuoteFilter, QuoteId};

const DB_SCHEMA_VERSION: i64 = 1;

const QUOTE_SELECT: &str = r#"
    SELECT q.id, q.author_id, a.name, q.text, q.rating
    FROM quotes q
    JOIN authors a ON a.id = q.author_id
"#;

#[derive(Clone)]
pub struct SqliteStorage {
    pub path: String,
}

pub struct SqliteTx {
    conn: Connection,
}

impl StorageTx for SqliteTx {
    fn commit(self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }
}

fn map_quote_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Quote> {
    Ok(Quote {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row.get(2)?,
        text: row.get(3)?,
        rating: row.get(4)?,
    })
}

fn map_author_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn db_list_quotes(conn: &Connection) -> rusqlite::Result<Vec<Quote>> {
    let mut stmt = conn.prepare(&format!("{QUOTE_SELECT} ORDER BY q.id"))?;
    let rows = stmt
        .query_map([], map_quote_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_load_quote(conn: &Connection, id: QuoteId) -> rusqlite::Result<Option<Quote>> {
    conn.query_row(
        &format!("{QUOTE_SELECT} WHERE q.id = ?1"),
        params![id],
        map_quote_row,
    )
    .optional()
}

fn db_list_quotes_by_author(
    conn: &Connection,
    author_id: AuthorId,
) -> rusqlite::Result<Vec<Quote>> {
    let mut stmt = conn.prepare(&format!("{QUOTE_SELECT} WHERE q.author_id = ?1 ORDER BY q.id"))?;
    let rows = stmt
        .query_map(params![author_id], map_quote_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_count_quotes(conn: &Connection) -> rusqlite::Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?;
    Ok(count as u64)
}

fn db_load_quote_at(conn: &Connection, offset: u64) -> rusqlite::Result<Option<Quote>> {
    conn.query_row(
        &format!("{QUOTE_SELECT} ORDER BY q.id LIMIT 1 OFFSET ?1"),
        params![offset as i64],
        map_quote_row,
    )
    .optional()
}

fn db_filter_quotes(conn: &Connection, filter: &QuoteFilter) -> rusqlite::Result<Vec<Quote>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(id) = filter.id {
        clauses.push("q.id = ?");
        values.push(Value::Integer(id));
    }
    if let Some(author) = &filter.author {
        clauses.push("a.name = ?");
        values.push(Value::Text(author.clone()));
    }
    if let Some(text) = &filter.text {
        clauses.push("q.text = ?");
        values.push(Value::Text(text.clone()));
    }
    if let Some(rating) = filter.rating {
        clauses.push("q.rating = ?");
        values.push(Value::Integer(rating as i64));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!("{QUOTE_SELECT} {where_clause} ORDER BY q.id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), map_quote_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_load_author(conn: &Connection, id: AuthorId) -> rusqlite::Result<Option<Author>> {
    conn.query_row(
        "SELECT id, name FROM authors WHERE id = ?1",
        params![id],
        map_author_row,
    )
    .optional()
}

fn db_find_author_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Author>> {
    conn.query_row(
        "SELECT id, name FROM authors WHERE name = ?1",
        params![name],
        map_author_row,
    )
    .optional()
}

fn db_insert_author(conn: &Connection, name: &str) -> Result<Author> {
    match conn.execute("INSERT INTO authors (name) VALUES (?1)", params![name]) {
        Ok(_) => Ok(Author {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        }),
        Err(err) if is_unique_violation(&err) => Err(DuplicateAuthor(name.to_string()).into()),
        Err(err) => Err(err.into()),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn db_insert_quote(
    conn: &Connection,
    author_id: AuthorId,
    text: &str,
    rating: u8,
) -> rusqlite::Result<QuoteId> {
    conn.execute(
        "INSERT INTO quotes (author_id, text, rating) VALUES (?1, ?2, ?3)",
        params![author_id, text, rating],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_update_quote(
    conn: &Connection,
    id: QuoteId,
    changes: &QuoteChanges,
) -> rusqlite::Result<bool> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(author_id) = changes.author_id {
        sets.push("author_id = ?");
        values.push(Value::Integer(author_id));
    }
    if let Some(text) = &changes.text {
        sets.push("text = ?");
        values.push(Value::Text(text.clone()));
    }
    if let Some(rating) = changes.rating {
        sets.push("rating = ?");
        values.push(Value::Integer(rating as i64));
    }

    if changes.is_empty() {
        let exists: Option<i64> = conn
            .query_row("SELECT 1 FROM quotes WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        return Ok(exists.is_some());
    }

    values.push(Value::Integer(id));
    let sql = format!("UPDATE quotes SET {} WHERE id = ?", sets.join(", "));
    let rows = conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(rows > 0)
}

fn db_delete_quote(conn: &Connection, id: QuoteId) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM quotes WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

fn open_connection(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(500))?;
    Ok(conn)
}

impl StorageRead for SqliteTx {
    fn list_quotes(&self) -> Result<Vec<Quote>> {
        Ok(db_list_quotes(&self.conn)?)
    }

    fn load_quote(&self, id: QuoteId) -> Result<Option<Quote>> {
        Ok(db_load_quote(&self.conn, id)?)
    }

    fn list_quotes_by_author(&self, author_id: AuthorId) -> Result<Vec<Quote>> {
        Ok(db_list_quotes_by_author(&self.conn, author_id)?)
    }

    fn count_quotes(&self) -> Result<u64> {
        Ok(db_count_quotes(&self.conn)?)
    }

    fn load_quote_at(&self, offset: u64) -> Result<Option<Quote>> {
        Ok(db_load_quote_at(&self.conn, offset)?)
    }

    fn filter_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>> {
        Ok(db_filter_quotes(&self.conn, filter)?)
    }

    fn load_author(&self, id: AuthorId) -> Result<Option<Author>> {
        Ok(db_load_author(&self.conn, id)?)
    }

    fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        Ok(db_find_author_by_name(&self.conn, name)?)
    }
}

impl StorageWrite for SqliteTx {
    fn insert_author(&self, name: &str) -> Result<Author> {
        db_insert_author(&self.conn, name)
    }

    fn insert_quote(&self, author_id: AuthorId, text: &str, rating: u8) -> Result<QuoteId> {
        Ok(db_insert_quote(&self.conn, author_id, text, rating)?)
    }

    fn update_quote(&self, id: QuoteId, changes: &QuoteChanges) -> Result<bool> {
        Ok(db_update_quote(&self.conn, id, changes)?)
    }

    fn delete_quote(&self, id: QuoteId) -> Result<bool> {
        Ok(db_delete_quote(&self.conn, id)?)
    }
}

impl Storage for SqliteStorage {
    type Tx = SqliteTx;
    type ReadTx = SqliteTx;

    fn begin_tx(&self) -> Result<Self::Tx> {
        let conn = open_connection(&self.path)?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        Ok(SqliteTx { conn })
    }

    // WAL readers pin their snapshot at the first SELECT and never wait on writers.
    fn begin_read(&self) -> Result<Self::ReadTx> {
        let conn = open_connection(&self.path)?;
        conn.execute("BEGIN DEFERRED", [])?;

        Ok(SqliteTx { conn })
    }
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    /// Deletes the database file along with its WAL side files.
    pub fn reset_all(&self) -> Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let path = format!("{}{}", self.path, suffix);
            if std::path::Path::new(&path).exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    pub fn init(&self) -> Result<()> {
        self.with_conn(|_conn| Ok(()))?;
        Ok(())
    }

    fn with_conn<F, T>(&self, f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = open_connection(&self.path)?;
        Self::migrate(&conn)?;
        f(&conn)
    }

    fn migrate(conn: &Connection) -> rusqlite::Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == DB_SCHEMA_VERSION {
            return Ok(());
        }

        if version == 0 {
            log::info!(
                "SQLite schema migration: {} -> {}",
                version,
                DB_SCHEMA_VERSION
            );
            conn.execute_batch(
                r#"
            CREATE TABLE authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE quotes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL REFERENCES authors(id),
                text TEXT NOT NULL,
                rating INTEGER NOT NULL DEFAULT 1 CHECK (rating BETWEEN 1 AND 5)
            );
            CREATE INDEX quotes_author_idx ON quotes(author_id);
            "#,
            )?;
            conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION)?;
            return Ok(());
        }

        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::ErrorCode::SchemaChanged as i32),
            Some("database schema version mismatch; please run with --reset option".to_string()),
        ))
    }
}

impl StorageRead for SqliteStorage {
    fn list_quotes(&self) -> Result<Vec<Quote>> {
        Ok(self.with_conn(db_list_quotes)?)
    }

    fn load_quote(&self, id: QuoteId) -> Result<Option<Quote>> {
        Ok(self.with_conn(|conn| db_load_quote(conn, id))?)
    }

    fn list_quotes_by_author(&self, author_id: AuthorId) -> Result<Vec<Quote>> {
        Ok(self.with_conn(|conn| db_list_quotes_by_author(conn, author_id))?)
    }

    fn count_quotes(&self) -> Result<u64> {
        Ok(self.with_conn(db_count_quotes)?)
    }

    fn load_quote_at(&self, offset: u64) -> Result<Option<Quote>> {
        Ok(self.with_conn(|conn| db_load_quote_at(conn, offset))?)
    }

    fn filter_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>> {
        Ok(self.with_conn(|conn| db_filter_quotes(conn, filter))?)
    }

    fn load_author(&self, id: AuthorId) -> Result<Option<Author>> {
        Ok(self.with_conn(|conn| db_load_author(conn, id))?)
    }

    fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        Ok(self.with_conn(|conn| db_find_author_by_name(conn, name))?)
    }
}
