//! Shared fixtures for integration tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use static_export_server::config::ServerConfig;
use static_export_server::store::{DirStore, FileStore};
use static_export_server::{HttpServer, ResolvePolicy, Resolver};
use tempfile::TempDir;

/// Files of the example export, each containing its own name.
pub const EXAMPLE_SITE: &[(&str, &str)] = &[
    ("index.html", "index.html"),
    ("test.txt", "text.txt"),
    ("noarg.html", "noarg.html"),
    ("[arg3].html", "[arg3].html"),
    ("[arg1]/page.html", "[arg1]/page.html"),
    ("[arg1]/[arg2]/page.html", "[arg1]/[arg2]/page.html"),
];

/// Write `files` under a fresh temporary directory.
pub fn site_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, contents) in files {
        write_file(dir.path(), path, contents);
    }
    dir
}

pub fn write_file(root: &Path, path: &str, contents: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, contents).unwrap();
}

/// Config serving `root` under `policy` on an ephemeral local port.
pub fn config_for(root: &Path, policy: ResolvePolicy) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.site.root = root.to_path_buf();
    config.site.policy = policy;
    config
}

/// Build the fully layered router over a site directory.
#[allow(dead_code)]
pub fn router_for(root: &Path, policy: ResolvePolicy) -> Router {
    let store: Arc<dyn FileStore> = Arc::new(DirStore::open(root).unwrap());
    let resolver = Resolver::build(store, policy).unwrap();
    HttpServer::new(config_for(root, policy), Arc::new(resolver)).router()
}
