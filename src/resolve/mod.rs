//! Request resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Decoded request path
//!     → policy.rs (Directory or Canonical)
//!     → resolver.rs
//!         1. `.html` redirect (Canonical only)
//!         2. empty path → index page
//!         3. exact store entry (file, or directory index for Directory)
//!         4. first matching route
//!         5. fallback page (index for Directory, 404 page for Canonical)
//!     → Resolution (Found / Fallback / Redirect / NotFound / Failed)
//! ```

pub mod policy;
pub mod resolver;

pub use policy::ResolvePolicy;
pub use resolver::{Origin, Resolution, ResolvedFile, Resolver};
