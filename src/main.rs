mod config;
mod error;
mod handlers;
mod logging;
mod middleware;
mod response;
mod router;
mod state;
mod storage;
mod utils;

use std::net::SocketAddr;
use std::process;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--help") {
        println!("filedrop-server");
        println!("A self-hosted file drop: upload, browse, download, rename and delete files.");
        println!();
        println!("USAGE:");
        println!("    filedrop-server [OPTIONS]");
        println!();
        println!("OPTIONS:");
        println!("    --addr=<ADDRESS>            Sets the server listening address. [env: ADDR] [default: 0.0.0.0:3000]");
        println!("    --upload-dir=<PATH>         Sets the upload directory. [env: UPLOAD_DIR] [default: ./uploads]");
        println!("    --max-file-size=<BYTES>     Sets the maximum upload size in bytes. [env: MAX_FILE_SIZE] [default: 1073741824]");
        println!("    --pin=<PIN>                 Requires this PIN on API requests. [env: PIN] [default: none]");
        println!("    --log-level=<LEVEL>         Sets the log level, overridden by RUST_LOG. [env: LOG_LEVEL] [default: info]");
        println!();
        println!("    --help                      Prints this help information.");
        println!();

        process::exit(0);
    }

    let config = config::Config::load();
    logging::init(&config.log_level);

    let root = match storage::UploadRoot::init(&config.upload_dir) {
        Ok(root) => root,
        Err(e) => {
            tracing::error!(path = %config.upload_dir.display(), error = %e, "Upload directory is not usable");
            process::exit(1);
        }
    };
    tracing::info!(
        upload_root = %root.path().display(),
        metadata = %root.metadata_dir().display(),
        max_file_size = config.max_file_size,
        "Upload root ready"
    );
    match config.masked_pin() {
        Some(masked) => tracing::info!(pin = %masked, "PIN protection enabled"),
        None => tracing::warn!("No PIN configured, API is open"),
    }

    let addr: SocketAddr = match config.addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(addr = %config.addr, error = %e, "Invalid listening address");
            process::exit(1);
        }
    };

    let state = state::AppState::new(config, root);
    let app = router::create_router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            process::exit(1);
        }
    };
    tracing::info!("Server running on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        process::exit(1);
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received, stopping server...");
}
