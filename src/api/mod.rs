pub mod error;
pub mod multipart;
pub mod routes;

use crate::config::Config;
use crate::db::Repository;
use crate::ingest::IngestPipeline;
use crate::ingest::staging::UploadStore;
use anyhow::{Context, Result};
use axum::Router;
use rust_embed::RustEmbed;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(RustEmbed)]
#[folder = "client/dist"]
struct ClientAssets;

pub fn build_state(config: Arc<Config>, repository: Arc<dyn Repository>) -> routes::ApiState {
    let store = Arc::new(UploadStore::from_config(&config));
    let ingest = IngestPipeline::new(Arc::clone(&repository), store);

    routes::ApiState {
        config,
        repository,
        ingest,
    }
}

pub async fn run_server(config: Arc<Config>, repository: Arc<dyn Repository>) -> Result<()> {
    let state = build_state(Arc::clone(&config), repository);
    state
        .ingest
        .store()
        .prepare()
        .await
        .context("Failed to prepare upload directories")?;
    let app: Router = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", config.api_host, config.api_port)
        .parse()
        .with_context(|| format!("Invalid API address: {}:{}", config.api_host, config.api_port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))?;

    info!(address = %addr, storage = config.storage.as_str(), "Folio API server started");

    axum::serve(listener, app)
        .await
        .context("API server failed")?;

    Ok(())
}

pub fn get_embedded_asset(path: &str) -> Option<(Vec<u8>, String)> {
    let normalized = path.trim_start_matches('/');
    let requested = if normalized.is_empty() {
        "index.html"
    } else {
        normalized
    };

    // Unknown paths get the client shell so client-side routes resolve.
    let (content, served) = match ClientAssets::get(requested) {
        Some(content) => (content, requested),
        None => (ClientAssets::get("index.html")?, "index.html"),
    };
    let mime = mime_guess::from_path(served)
        .first_or_octet_stream()
        .to_string();

    Some((content.data.into_owned(), mime))
}

#[cfg(test)]
mod tests {
    use super::get_embedded_asset;

    #[test]
    fn client_routes_fall_back_to_index() {
        let (_, root_mime) = get_embedded_asset("/").expect("index embedded");
        let (_, deep_mime) = get_embedded_asset("/posts/3").expect("fallback");

        assert_eq!(root_mime, "text/html");
        assert_eq!(deep_mime, "text/html");
    }
}
