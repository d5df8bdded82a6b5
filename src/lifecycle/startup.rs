//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the site store and compile the route table
//! - Start the metrics exporter when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, including a site that cannot
//!   be enumerated
//! - Routes are compiled before the listener binds (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ServerConfig, SiteConfig};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::resolve::{ResolvePolicy, Resolver};
use crate::routing::CompileError;
use crate::store::{DirStore, FileStore, StoreError};

/// Fatal errors before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot open site root {}: {source}", root.display())]
    Store { root: PathBuf, source: StoreError },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("invalid address {0:?}")]
    Address(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Open the configured site directory and compile its routes.
pub fn build_resolver(site: &SiteConfig) -> Result<Resolver, StartupError> {
    let store = DirStore::open(&site.root).map_err(|source| StartupError::Store {
        root: site.root.clone(),
        source,
    })?;
    let store: Arc<dyn FileStore> = Arc::new(store);

    let resolver = Resolver::build(Arc::clone(&store), site.policy)?
        .with_index_file(site.index_file.clone())
        .with_not_found_file(site.not_found_file.clone());

    tracing::info!(
        root = %site.root.display(),
        policy = %site.policy,
        routes = resolver.routes().len(),
        "Route table compiled"
    );
    for route in resolver.routes() {
        tracing::debug!(pattern = %route.pattern(), target = route.target_file(), "Route");
    }

    let fallback = match site.policy {
        ResolvePolicy::Directory => &site.index_file,
        ResolvePolicy::Canonical => &site.not_found_file,
    };
    if store.stat(fallback).is_err() {
        tracing::warn!(file = %fallback, "Fallback page is missing; unmatched paths will return 404");
    }

    Ok(resolver)
}

/// Build everything from `config` and serve until `shutdown` fires.
pub async fn run(config: ServerConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let resolver = Arc::new(build_resolver(&config.site)?);

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }
    // recorded after the exporter exists, otherwise the sample is dropped
    metrics::record_route_count(resolver.routes().len());

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let server = HttpServer::new(config, resolver);
    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}
