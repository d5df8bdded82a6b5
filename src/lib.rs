//! Static export server library.
//!
//! Serves a pre-built static site whose page files may carry `[name]` and
//! `[...name]` dynamic segments, resolving each request path to one file.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resolve;
pub mod routing;
pub mod store;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resolve::{ResolvePolicy, Resolution, Resolver};
pub use routing::RouteTable;
