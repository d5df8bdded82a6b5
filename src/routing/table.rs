//! Route table compilation and lookup.
//!
//! # Responsibilities
//! - Walk the store once and build one route per `.html` page
//! - Order routes so that more specific templates are tried first
//! - Return the first route matching a normalized request path
//!
//! # Design Decisions
//! - Immutable after construction (shared across requests without locks)
//! - Specificity is approximated by the position of the first `[`:
//!   static templates first, then later markers before earlier ones
//! - The heuristic is textual; multi-marker layouts at different depths
//!   can still order surprisingly, and that is kept as is
//! - Any enumeration error aborts compilation; no partial tables

use std::cmp::Ordering;
use thiserror::Error;

use crate::routing::route::Route;
use crate::store::{FileStore, StoreError};

/// Errors raised while compiling the route table.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The store could not be enumerated.
    #[error("failed to enumerate site files: {0}")]
    Store(#[from] StoreError),

    /// A page template produced an invalid pattern.
    #[error("invalid route for {file:?}: {source}")]
    Pattern {
        file: String,
        #[source]
        source: regex::Error,
    },
}

/// Ordered, immutable list of page routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile the table from the store's current contents.
    pub fn compile(store: &dyn FileStore) -> Result<Self, CompileError> {
        let entries = store.walk()?;

        let routes = entries
            .iter()
            .filter(|entry| entry.kind.is_file())
            .filter_map(|entry| {
                Route::from_page(&entry.path)
                    .map_err(|source| CompileError::Pattern {
                        file: entry.path.clone(),
                        source,
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_routes(routes))
    }

    /// Order routes by specificity. The sort is stable, so templates of
    /// equal rank keep their enumeration order.
    pub fn from_routes(mut routes: Vec<Route>) -> Self {
        routes.sort_by(|a, b| by_specificity(a.first_dynamic_index(), b.first_dynamic_index()));
        Self { routes }
    }

    /// First route whose pattern matches `path`.
    pub fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

/// No marker sorts first; otherwise the later marker sorts first.
fn by_specificity(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => b.cmp(&a),
    }
}
