//! Serve mode — the REST API plus the schedule loop in one process.
//!
//! Both share a single `ScaleStore`, so every read-modify-write (votes and
//! scheduled base changes) goes through the same lock.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use smellscale_api::{ApiState, build_router};
use smellscale_core::ScaleConfig;
use smellscale_scheduler::BaseScheduler;
use smellscale_state::ScaleStore;

pub async fn run(
    port: u16,
    store: ScaleStore,
    config: ScaleConfig,
    schedule_poll_secs: u64,
    run_schedule: bool,
) -> anyhow::Result<()> {
    info!("Smell Scale daemon starting");

    // Create the default state up front rather than on the first request.
    let initial = store.load();
    info!(base = initial.base, votes = initial.votes.len(), "scale state ready");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background tasks ───────────────────────────────────────

    let schedule_handle = if run_schedule {
        let scheduler = BaseScheduler::local(store.clone(), config.schedule.clone());
        let poll = Duration::from_secs(schedule_poll_secs.max(1));
        Some(tokio::spawn(scheduler.run(poll, shutdown_rx)))
    } else {
        info!("daily schedule disabled");
        None
    };

    // ── API server ─────────────────────────────────────────────

    let state = ApiState::new(store).with_half_life(config.half_life_hours);
    let router = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Smell Scale backend listening");

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = schedule_handle {
        let _ = handle.await;
    }

    info!("Smell Scale daemon stopped");
    Ok(())
}
