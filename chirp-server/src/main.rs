//! Chirp server entry point.
//!
//! Exposes the live-control protocol over a WebSocket (`/ws`) plus the
//! `/devices` query, backed by one process-wide `SessionController`.

mod settings;
mod state;
mod ws;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tracing::{error, info, warn};

use chirp_core::audio::list_input_devices;
use chirp_core::inference::{stub::StubEngine, subprocess::SubprocessEngine};
use chirp_core::protocol::events::DevicesResponse;
use chirp_core::{CpalBackend, EngineHandle, SessionController};

use settings::{default_settings_path, load_settings};
use state::AppState;

async fn devices() -> Json<DevicesResponse> {
    Json(DevicesResponse {
        devices: list_input_devices(),
    })
}

#[tokio::main]
async fn main() {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_core=info,chirp_server=info".parse().unwrap()),
        )
        .init();

    info!("chirp server starting");

    let settings_path = default_settings_path();
    let server_settings = load_settings(&settings_path);
    info!(
        settings_path = ?settings_path,
        bind_addr = %server_settings.bind_addr,
        transcript_dir = ?server_settings.transcript_dir,
        overlap = server_settings.overlap,
        "runtime settings loaded"
    );

    // ── Engine setup ──────────────────────────────────────────────────────
    let engine = match &server_settings.engine_command {
        Some(command) => {
            info!(command = %command.display(), "using subprocess inference engine");
            EngineHandle::new(SubprocessEngine::new(
                command.clone(),
                server_settings.engine_args.clone(),
            ))
        }
        None => {
            warn!("no engine command configured — using StubEngine");
            EngineHandle::new(StubEngine::new())
        }
    };

    if let Err(e) = engine.0.lock().warm_up() {
        error!("engine warm-up failed: {e}");
        return;
    }

    let controller = Arc::new(SessionController::new(
        engine,
        Arc::new(CpalBackend),
        &server_settings.transcript_dir,
        &server_settings.temp_dir,
    ));

    let app_state = AppState {
        controller: Arc::clone(&controller),
        settings: Arc::new(server_settings.clone()),
    };

    // ── Serve ─────────────────────────────────────────────────────────────
    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/devices", get(devices))
        .with_state(app_state);

    let listener = match tokio::net::TcpListener::bind(&server_settings.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %server_settings.bind_addr, "failed to bind server: {e}");
            return;
        }
    };
    info!(addr = %server_settings.bind_addr, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
    {
        error!("server error: {e}");
    }

    // Flush any active session (final transcript write + sink notification)
    // before the process exits.
    let shutdown = tokio::task::spawn_blocking(move || controller.stop()).await;
    if matches!(shutdown, Ok(Ok(()))) {
        info!("active session stopped on shutdown");
    }
}
