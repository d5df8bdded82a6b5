//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     FileStore::walk()
//!     → keep `.html` files
//!     → pattern.rs (template → anchored regex)
//!     → table.rs (sort by first-marker position)
//!     → Freeze as immutable RouteTable
//!
//! Request (normalized path, no leading/trailing slash):
//!     → table.rs (scan in order)
//!     → route.rs (full-string match)
//!     → Return: first matching Route or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Marker translation is a pure function, no shared regex state
//! - Deterministic: same store always yields the same order
//! - First match wins

pub mod pattern;
pub mod route;
pub mod table;

pub use route::Route;
pub use table::{CompileError, RouteTable};
