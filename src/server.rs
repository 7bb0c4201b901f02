//! Minimal backend service stub.
//!
//! Serves a single liveness route and opens the state store on startup so a
//! broken database surfaces in the logs immediately. Store problems degrade
//! to a warning; the service keeps running without persistence.

use axum::{routing::get, Router};
use log::{error, info};

use crate::config::Config;
use crate::store::StoreManager;

pub fn router() -> Router {
    Router::new().route("/", get(root))
}

async fn root() -> &'static str {
    "tubelist API is up and running"
}

pub async fn run(config: &Config) -> Result<(), std::io::Error> {
    match StoreManager::new(config.store.path.clone()) {
        Ok(_) => info!("Server: state store opened"),
        Err(err) => error!("Server: state store unavailable: {}", err),
    }

    let listener = tokio::net::TcpListener::bind(&config.service.bind_addr).await?;
    info!("Server: listening on {}", config.service.bind_addr);
    axum::serve(listener, router()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_reports_liveness() {
        assert_eq!(root().await, "tubelist API is up and running");
    }
}
