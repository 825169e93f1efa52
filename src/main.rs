mod app;
mod cli;
mod commands;
mod configuration;
mod context;
mod rest;
mod service;
mod storage;
mod tracing;
mod types;
mod validation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
