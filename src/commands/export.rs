use anyhow::{Context, Result};

use crate::{service::QuoteService, storage::Storage};

pub fn run<S: Storage>(quotes: &QuoteService<S>, pretty: bool) -> Result<()> {
    let all = quotes.get_all()?;
    let json = if pretty {
        serde_json::to_string_pretty(&all)
    } else {
        serde_json::to_string(&all)
    }
    .context("serializing quotes")?;
    println!("{json}");
    Ok(())
}
