//! Resolution policies.

use serde::{Deserialize, Serialize};

/// How request paths map onto the exported site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolvePolicy {
    /// Pages addressed with or without `.html`; directories serve their
    /// index page; anything unmatched falls back to the index page so a
    /// client-side router can take over.
    #[default]
    Directory,
    /// Pages addressed without `.html` only (`.html` URLs redirect);
    /// anything unmatched is a genuine 404 served from the not-found page.
    Canonical,
}

impl ResolvePolicy {
    /// Whether `/page.html` is redirected to `/page`.
    pub fn redirects_page_suffix(self) -> bool {
        self == ResolvePolicy::Canonical
    }

    /// Whether a directory request serves `<dir>/index.html`.
    pub fn serves_directory_index(self) -> bool {
        self == ResolvePolicy::Directory
    }

    /// Whether the fallback page is answered with a not-found status.
    pub fn fallback_is_not_found(self) -> bool {
        self == ResolvePolicy::Canonical
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResolvePolicy::Directory => "directory",
            ResolvePolicy::Canonical => "canonical",
        }
    }
}

impl std::fmt::Display for ResolvePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
