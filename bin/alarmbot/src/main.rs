use std::sync::Arc;

use anyhow::Context;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, Platform, PriceSource};
use engine::{AlarmChecker, AlarmScheduler, BinanceClient};
use store::AlarmStore;
use telegram_bot::{spawn_bot, BotDeps, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid configuration")?;
    info!(
        interval_mins = cfg.price_check_interval.as_secs() / 60,
        "AlarmBot starting"
    );

    // ── Database ──────────────────────────────────────────────────────────────
    let store = AlarmStore::connect(&cfg.database_url)
        .await
        .with_context(|| format!("failed to open alarm store at '{}'", cfg.database_url))?;

    // ── Price source ──────────────────────────────────────────────────────────
    let prices: Arc<dyn PriceSource> = Arc::new(
        BinanceClient::new(&cfg.binance_base_url, cfg.price_fetch_timeout)
            .context("failed to build Binance client")?,
    );

    // ── Notifier ──────────────────────────────────────────────────────────────
    let bot = teloxide::Bot::new(&cfg.telegram_token);
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));

    // ── Scheduler ─────────────────────────────────────────────────────────────
    let checker = AlarmChecker::new(store.clone(), prices.clone())
        .with_notifier(Platform::Telegram, notifier);
    let scheduler = AlarmScheduler::new(checker, cfg.price_check_interval);
    if let Err(e) = scheduler.start().await {
        warn!(error = %e, "Scheduler start skipped");
    }

    // ── Telegram front-end ────────────────────────────────────────────────────
    let bot_handle = spawn_bot(
        bot,
        BotDeps {
            store: store.clone(),
            prices,
            scheduler: scheduler.clone(),
            allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
        },
    );

    // ── Status API (optional) ─────────────────────────────────────────────────
    let (api_stop_tx, api_stop_rx) = oneshot::channel::<()>();
    let api_task = match (cfg.status_port, cfg.status_token.clone()) {
        (Some(port), Some(api_token)) => {
            let state = api::AppState {
                store: store.clone(),
                scheduler: scheduler.clone(),
                api_token,
            };
            Some(tokio::spawn(async move {
                let stop = async {
                    let _ = api_stop_rx.await;
                };
                if let Err(e) = api::serve(state, port, stop).await {
                    error!(port, error = %e, "Status API failed");
                }
            }))
        }
        _ => None,
    };

    // ── Shutdown ──────────────────────────────────────────────────────────────
    info!("All subsystems started. Waiting for shutdown signal.");
    shutdown_signal().await;
    info!("Shutdown signal received. Finishing current check.");

    scheduler.stop().await;
    bot_handle.shutdown().await;
    let _ = api_stop_tx.send(());
    if let Some(task) = api_task {
        let _ = task.await;
    }

    info!("AlarmBot shut down");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
