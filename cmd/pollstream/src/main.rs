//! # pollstream
//!
//! The Authoritative Store: loads settings, picks a repository, and serves
//! the poll API until Ctrl-C.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use api_adapters::{router, AppState};
use configs::{LogFormat, LogSettings, Settings, StorageBackend};
use domains::{PollDocument, PollRepository};
use services::PollService;
use storage_adapters::InMemoryRepository;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = configs::load().context("loading settings")?;
    init_logging(&settings.log);

    let repo = build_repository(&settings).await?;
    let state = AppState::new(PollService::new(repo));
    let app = router(
        state,
        &settings.server.base_path,
        settings.server.cors_allow_any_origin,
    );

    let addr = settings.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, base_path = %settings.server.base_path, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("stopped");
    Ok(())
}

fn init_logging(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn build_repository(settings: &Settings) -> Result<Arc<dyn PollRepository>> {
    match settings.storage.backend {
        #[cfg(feature = "json-file")]
        StorageBackend::JsonFile => {
            let repo = storage_adapters::JsonFileRepository::new(settings.storage.path.clone());
            repo.ensure_store()
                .await
                .with_context(|| format!("preparing {}", repo.path().display()))?;
            tracing::info!(path = %repo.path().display(), "using json-file store");
            Ok(Arc::new(repo))
        }
        #[cfg(not(feature = "json-file"))]
        StorageBackend::JsonFile => {
            anyhow::bail!("built without the json-file feature; set storage.backend = \"memory\"")
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory store, polls are lost on restart");
            Ok(Arc::new(seeded_memory(&settings.storage.path).await?))
        }
    }
}

/// An existing document at `path` is loaded as the starting state.
async fn seeded_memory(path: &Path) -> Result<InMemoryRepository> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) if !raw.trim().is_empty() => {
            let doc: PollDocument = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            tracing::info!(path = %path.display(), polls = doc.polls.len(), "seeded from document");
            Ok(InMemoryRepository::from_document(doc))
        }
        Ok(_) => Ok(InMemoryRepository::new()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(InMemoryRepository::new()),
        Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown requested");
    }
}
