//! Server lifecycle: watcher startup, listener binding, graceful shutdown.

use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio_util::sync::CancellationToken;

use super::routes::create_router;
use super::state::AppState;
use crate::broadcast::Broadcaster;
use crate::config::Settings;
use crate::watcher::ChangeWatcher;

/// How long TLS connections may drain after shutdown is requested.
pub const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the server until `ct` is cancelled.
///
/// Starts the change watcher first when a pattern is configured; failing to
/// set up the watch root aborts before anything is bound.
pub async fn serve(settings: Settings, ct: CancellationToken) -> anyhow::Result<()> {
    let broadcaster = Broadcaster::new();

    let watcher_task = match settings.watch_config() {
        Some(watch) => {
            let watcher = ChangeWatcher::new(&watch, broadcaster.clone())
                .with_context(|| format!("failed to watch {}", watch.root.display()))?;
            Some(tokio::spawn(watcher.run(ct.child_token())))
        }
        None => {
            crate::log_event!("server", "watcher disabled", "no pattern configured");
            None
        }
    };

    if let Some(root) = &settings.root {
        crate::log_event!("server", "static files", "{}", root.display());
    }

    let state = AppState::new(broadcaster, ct.clone()).with_ping_interval(settings.ping_interval());
    let router = create_router(state, &settings);

    let result = if settings.has_tls() {
        serve_tls(router, &settings, ct.clone()).await
    } else {
        serve_plain(router, &settings.server.bind, ct.clone()).await
    };

    // Stop the watcher and any remaining connections whichever way we got here
    ct.cancel();
    if let Some(task) = watcher_task {
        if let Err(e) = task.await {
            tracing::warn!("[server] watcher task failed: {e}");
        }
    }

    crate::log_event!("server", "stopped");
    result
}

async fn serve_plain(router: Router, bind: &str, ct: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let addr = listener.local_addr().context("failed to read local address")?;

    crate::log_event!("server", "listening", "http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(ct.cancelled_owned())
        .await
        .context("HTTP server error")
}

#[cfg(feature = "https-server")]
async fn serve_tls(router: Router, settings: &Settings, ct: CancellationToken) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::net::SocketAddr;

    let (Some(cert), Some(key)) = (&settings.server.tls_cert, &settings.server.tls_key) else {
        anyhow::bail!("both tls_cert and tls_key must be set to enable TLS");
    };

    // Already installed is fine
    let _ = rustls::crypto::ring::default_provider().install_default();

    let tls_config = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| {
            format!(
                "failed to load TLS certificate {} and key {}",
                cert.display(),
                key.display()
            )
        })?;

    let bind = &settings.server.bind;
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("failed to parse bind address {bind}"))?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        ct.cancelled().await;
        shutdown.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
    });

    crate::log_event!("server", "listening", "https://{addr}");

    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .context("HTTPS server error")
}

#[cfg(not(feature = "https-server"))]
async fn serve_tls(
    _router: Router,
    _settings: &Settings,
    _ct: CancellationToken,
) -> anyhow::Result<()> {
    anyhow::bail!("TLS support is not compiled in; rebuild with --features https-server")
}

/// Cancel `ct` on Ctrl+C.
pub fn cancel_on_ctrl_c(ct: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => {
                    crate::log_event!("server", "shutdown requested");
                    ct.cancel();
                }
                Err(e) => tracing::warn!("[server] failed to listen for ctrl+c: {e}"),
            },
            _ = ct.cancelled() => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_watch_root_aborts() {
        let temp = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.root = Some(temp.path().join("missing"));
        settings.watch.pattern = Some(r"\.html$".to_string());
        settings.server.bind = "127.0.0.1:0".to_string();

        let result = serve(settings, CancellationToken::new()).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to watch"));
    }

    #[tokio::test]
    async fn test_stops_when_cancelled() {
        let temp = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.root = Some(temp.path().to_path_buf());
        settings.watch.pattern = Some(r"\.html$".to_string());
        settings.server.bind = "127.0.0.1:0".to_string();

        let ct = CancellationToken::new();
        let server = tokio::spawn(serve(settings, ct.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        ct.cancel();

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let mut settings = Settings::default();
        settings.server.bind = "not an address".to_string();

        let err = serve(settings, CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("failed to bind"));
    }
}
