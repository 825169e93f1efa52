use anyhow::Result;

use crate::{service::QuoteService, storage::Storage};

const STARTER_QUOTES: [(&str, &str); 3] = [
    (
        "Albert Einstein",
        "Logic will get you from A to B. Imagination will take you everywhere.",
    ),
    (
        "Mahatma Gandhi",
        "Be the change that you wish to see in the world.",
    ),
    ("Oscar Wilde", "Be yourself; everyone else is already taken."),
];

/// Inserts the starter quotes into an empty store. Returns how many were added.
pub fn seed<S: Storage>(quotes: &QuoteService<S>) -> Result<usize> {
    if quotes.count()? > 0 {
        log::info!("Store already has quotes, skipping seed");
        return Ok(0);
    }
    for (author, text) in STARTER_QUOTES {
        quotes.create(author, text, None)?;
    }
    Ok(STARTER_QUOTES.len())
}

pub fn run<S: Storage>(quotes: &QuoteService<S>) -> Result<()> {
    let added = seed(quotes)?;
    log::info!("🌱 Seeded {} quotes", added);
    Ok(())
}
