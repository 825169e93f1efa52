use crate::cli::Command;
use crate::service::QuoteService;
use crate::storage::Storage;

pub mod export;
pub mod seed;

impl Command {
    pub fn run<S: Storage>(&self, quotes: &QuoteService<S>) -> anyhow::Result<()> {
        match self {
            Command::Seed => seed::run(quotes),
            Command::Export { pretty } => export::run(quotes, *pretty),
        }
    }
}
