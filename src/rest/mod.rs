use std::net::SocketAddr;

use axum::{routing::get, Router};

use crate::{service::QuoteService, storage::Storage};

mod handlers;
mod models;

use handlers::{
    count_quotes, create_quote, delete_quote, filter_quotes, get_quote, health, list_author_quotes,
    list_quotes, not_found, random_quote, update_quote,
};

#[derive(Clone)]
pub struct AppState<S: Storage> {
    pub quotes: QuoteService<S>,
    pub started_at: std::time::SystemTime,
}

pub fn router<S: Storage + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health::<S>))
        .route("/quotes", get(list_quotes::<S>).post(create_quote::<S>))
        .route("/quotes/count", get(count_quotes::<S>))
        .route("/quotes/random", get(random_quote::<S>))
        .route("/quotes/filters", get(filter_quotes::<S>))
        .route(
            "/quotes/:id",
            get(get_quote::<S>)
                .put(update_quote::<S>)
                .delete(delete_quote::<S>),
        )
        .route("/author/:id/quotes", get(list_author_quotes::<S>))
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve<S: Storage + Clone + Send + Sync + 'static>(
    addr: SocketAddr,
    storage: S,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    let state = AppState {
        quotes: QuoteService::new(storage),
        started_at: std::time::SystemTime::now(),
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("🌐 REST listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 REST shutdown requested");
        })
        .await?;
    log::info!("👋 REST server exited");
    Ok(())
}
