mod wiring;

use crate::{cli, context, rest, service::QuoteService, storage};
use anyhow::{Context as AnyhowContext, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub struct App {
    pub ctx: context::Context,
    pub storage: storage::SqliteStorage,
}

impl App {
    pub fn from_cli() -> Result<(Self, cli::Cli)> {
        crate::tracing::init();
        let cli = crate::cli::parse();
        let ctx = context::Context::from_cli(&cli);

        crate::tracing::set_log_file(ctx.config.log_file.as_deref().map(Path::new));
        log::info!("🚀 Starting quotes");
        log::info!("📂 Data dir: {}", ctx.config.data_dir);

        wiring::init_data_dir(&ctx).context("initializing data dir")?;
        let storage = wiring::init_storage(&ctx)?;
        log::info!("🗄️ Database: {}", ctx.db_path().display());

        Ok((Self { ctx, storage }, cli))
    }
}

pub async fn run_daemon(app: App) -> Result<()> {
    if let Some(path) = app.ctx.config.log_file.as_deref() {
        log::info!("📝 Log file: {}", path);
    }

    let shutdown = CancellationToken::new();

    let api_addr = app.ctx.config.api_listen;
    let rest_storage = app.storage.clone();
    let rest_shutdown = shutdown.clone();
    let mut rest_handle =
        tokio::spawn(async move { rest::serve(api_addr, rest_storage, rest_shutdown).await });

    let exited_early = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("🧨 Ctrl-C received, shutting down");
            None
        }
        res = &mut rest_handle => Some(res),
    };

    shutdown.cancel();
    let rest_result = match exited_early {
        Some(res) => res,
        None => rest_handle.await,
    };
    match rest_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            log::error!("REST server error: {:#}", e);
            return Err(e.context(format!("serving REST API on {}", api_addr)));
        }
        Err(e) => {
            log::error!("REST server task failed: {}", e);
            return Err(e.into());
        }
    }

    log::info!("✅ Shutdown complete");
    Ok(())
}

pub async fn run() -> Result<()> {
    let (app, cli) = App::from_cli()?;

    if let Some(cmd) = &cli.cmd {
        // one-shot command mode
        let quotes = QuoteService::new(app.storage.clone());
        cmd.run(&quotes)?;
        return Ok(());
    }

    run_daemon(app).await
}
