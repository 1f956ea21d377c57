use vocab_quiz_backend::config::Config;
use vocab_quiz_backend::db::Database;
use vocab_quiz_backend::logging::init_tracing;
use vocab_quiz_backend::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _file_log_guard = init_tracing(&config);

    let db = match Database::connect(&config.database_path).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, path = %config.database_path.display(), "database init failed");
            std::process::exit(1);
        }
    };

    let addr = config.bind_addr();
    let app = vocab_quiz_backend::build_router(AppState::new(db.clone(), config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener failed");
    tracing::info!(%addr, "vocab-quiz backend listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, closing database");
    db.close().await;
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
