//! Request path resolution.
//!
//! # Responsibilities
//! - Normalize the request path
//! - Prefer real files over page templates
//! - Scan the route table in order
//! - Pick the fallback page when nothing matches
//! - Open the chosen file exactly once
//!
//! # Design Decisions
//! - Stateless per request; no retries, no backtracking to later routes
//! - "Does not exist" is a miss; any other store error fails the request
//! - Raw store errors never leave this module except inside `Failed`

use std::fmt;
use std::io::{Seek, SeekFrom};
use std::sync::Arc;

use crate::resolve::policy::ResolvePolicy;
use crate::routing::route::PAGE_SUFFIX;
use crate::routing::{CompileError, RouteTable};
use crate::store::{EntryKind, FileHandle, FileStore, StoreError, StoreErrorKind};

pub const DEFAULT_INDEX_FILE: &str = "index.html";
pub const DEFAULT_NOT_FOUND_FILE: &str = "404.html";

/// How a served file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Root request served the index page.
    Index,
    /// Exact file in the store.
    Static,
    /// Directory request served its index page.
    DirectoryIndex,
    /// Page template matched.
    Route,
    /// Nothing matched.
    Fallback,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Index => "index",
            Origin::Static => "static",
            Origin::DirectoryIndex => "directory_index",
            Origin::Route => "route",
            Origin::Fallback => "fallback",
        }
    }
}

/// An opened file chosen for a request.
pub struct ResolvedFile {
    pub path: String,
    pub len: u64,
    pub origin: Origin,
    pub handle: Box<dyn FileHandle>,
}

impl fmt::Debug for ResolvedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedFile")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Outcome of resolving one request path.
#[derive(Debug)]
pub enum Resolution {
    /// Serve this file.
    Found(ResolvedFile),
    /// Serve the fallback page.
    Fallback(ResolvedFile),
    /// Permanent redirect to this path.
    Redirect(String),
    /// Nothing to serve.
    NotFound,
    /// The store failed; answered as an internal error.
    Failed(StoreError),
}

impl Resolution {
    /// Short label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Resolution::Found(file) => file.origin.as_str(),
            Resolution::Fallback(_) => Origin::Fallback.as_str(),
            Resolution::Redirect(_) => "redirect",
            Resolution::NotFound => "not_found",
            Resolution::Failed(_) => "error",
        }
    }
}

/// Static lookup result before route scanning.
enum Lookup {
    Hit(String, Origin),
    Miss,
    Failed(StoreError),
}

/// Resolves request paths against a store and its compiled routes.
#[derive(Debug)]
pub struct Resolver {
    store: Arc<dyn FileStore>,
    routes: RouteTable,
    policy: ResolvePolicy,
    index_file: String,
    not_found_file: String,
}

impl Resolver {
    pub fn new(store: Arc<dyn FileStore>, routes: RouteTable, policy: ResolvePolicy) -> Self {
        Self {
            store,
            routes,
            policy,
            index_file: DEFAULT_INDEX_FILE.to_string(),
            not_found_file: DEFAULT_NOT_FOUND_FILE.to_string(),
        }
    }

    /// Compile the route table from `store` and build a resolver over it.
    pub fn build(store: Arc<dyn FileStore>, policy: ResolvePolicy) -> Result<Self, CompileError> {
        let routes = RouteTable::compile(store.as_ref())?;
        Ok(Self::new(store, routes, policy))
    }

    pub fn with_index_file(mut self, name: impl Into<String>) -> Self {
        self.index_file = name.into();
        self
    }

    pub fn with_not_found_file(mut self, name: impl Into<String>) -> Self {
        self.not_found_file = name.into();
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    /// Resolve a decoded request path such as `/blog/hello`.
    pub fn resolve(&self, raw_path: &str) -> Resolution {
        if self.policy.redirects_page_suffix() {
            if let Some(stripped) = raw_path.strip_suffix(PAGE_SUFFIX) {
                // exactly one leading '/' keeps the target on this host
                return Resolution::Redirect(format!("/{}", normalize(stripped)));
            }
        }

        let path = normalize(raw_path);
        if path.is_empty() {
            return self.open(&self.index_file, Origin::Index);
        }

        match self.lookup_static(path) {
            Lookup::Hit(file, origin) => return self.open(&file, origin),
            Lookup::Failed(err) => return Resolution::Failed(err),
            Lookup::Miss => {}
        }

        if let Some(route) = self.routes.find(path) {
            tracing::trace!(path, template = route.template(), "Route matched");
            return self.open(route.target_file(), Origin::Route);
        }

        match self.open(self.fallback_file(), Origin::Fallback) {
            Resolution::Found(file) => Resolution::Fallback(file),
            other => other,
        }
    }

    fn fallback_file(&self) -> &str {
        if self.policy.fallback_is_not_found() {
            &self.not_found_file
        } else {
            &self.index_file
        }
    }

    fn lookup_static(&self, path: &str) -> Lookup {
        match self.store.stat(path) {
            Ok(EntryKind::File { .. }) => Lookup::Hit(path.to_string(), Origin::Static),
            Ok(EntryKind::Dir) if self.policy.serves_directory_index() => {
                let index = format!("{}/{}", path, self.index_file);
                match self.store.stat(&index) {
                    Ok(EntryKind::File { .. }) => Lookup::Hit(index, Origin::DirectoryIndex),
                    Ok(EntryKind::Dir) => Lookup::Miss,
                    Err(e) if e.is_miss() => Lookup::Miss,
                    Err(e) => Lookup::Failed(e),
                }
            }
            Ok(EntryKind::Dir) => Lookup::Miss,
            Err(e) if e.is_miss() => Lookup::Miss,
            Err(e) => Lookup::Failed(e),
        }
    }

    fn open(&self, path: &str, origin: Origin) -> Resolution {
        let mut handle = match self.store.open(path) {
            Ok(handle) => handle,
            Err(e) if e.kind == StoreErrorKind::NotFound => return Resolution::NotFound,
            Err(e) => return Resolution::Failed(e),
        };

        let len = match measure(handle.as_mut()) {
            Ok(len) => len,
            Err(e) => return Resolution::Failed(StoreError::io(e, path)),
        };

        Resolution::Found(ResolvedFile {
            path: path.to_string(),
            len,
            origin,
            handle,
        })
    }
}

/// Strip leading and trailing separators.
pub fn normalize(raw_path: &str) -> &str {
    raw_path.trim_matches('/')
}

fn measure(handle: &mut dyn FileHandle) -> std::io::Result<u64> {
    let len = handle.seek(SeekFrom::End(0))?;
    handle.seek(SeekFrom::Start(0))?;
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entry, MemoryStore};
    use std::io::Read;

    fn example_store() -> MemoryStore {
        MemoryStore::new()
            .with_file("index.html", "index.html")
            .with_file("test.txt", "text.txt")
            .with_file("noarg.html", "noarg.html")
            .with_file("[arg3].html", "[arg3].html")
            .with_file("[arg1]/page.html", "[arg1]/page.html")
            .with_file("[arg1]/[arg2]/page.html", "[arg1]/[arg2]/page.html")
    }

    fn resolver(store: MemoryStore, policy: ResolvePolicy) -> Resolver {
        Resolver::build(Arc::new(store), policy).unwrap()
    }

    fn served(resolution: Resolution) -> (String, Origin, String) {
        let mut file = match resolution {
            Resolution::Found(f) | Resolution::Fallback(f) => f,
            other => panic!("expected a file, got {:?}", other),
        };
        let mut body = String::new();
        file.handle.read_to_string(&mut body).unwrap();
        (file.path, file.origin, body)
    }

    #[test]
    fn test_directory_policy_scenarios() {
        let r = resolver(example_store(), ResolvePolicy::Directory);
        let cases = [
            ("/", "index.html", Origin::Index),
            ("/test.txt", "test.txt", Origin::Static),
            ("/not/found", "index.html", Origin::Fallback),
            ("/abc", "[arg3].html", Origin::Route),
            ("/noarg", "noarg.html", Origin::Route),
            ("/abc/notfound", "index.html", Origin::Fallback),
            ("/abc/page", "[arg1]/page.html", Origin::Route),
            ("/abc/abc/page", "[arg1]/[arg2]/page.html", Origin::Route),
        ];

        for (request, expected, origin) in cases {
            let (path, got_origin, body) = served(r.resolve(request));
            assert_eq!(path, expected, "request {}", request);
            assert_eq!(body, expected, "request {}", request);
            assert_eq!(got_origin, origin, "request {}", request);
        }
    }

    #[test]
    fn test_fallback_variant_for_unmatched() {
        let r = resolver(example_store(), ResolvePolicy::Directory);
        assert!(matches!(r.resolve("/not/found"), Resolution::Fallback(_)));
        assert!(matches!(r.resolve("/abc"), Resolution::Found(_)));
    }

    #[test]
    fn test_trailing_slashes_are_trimmed() {
        let r = resolver(example_store(), ResolvePolicy::Directory);
        let (path, _, _) = served(r.resolve("//abc/page//"));
        assert_eq!(path, "[arg1]/page.html");
    }

    #[test]
    fn test_static_file_beats_catch_all() {
        let store = MemoryStore::new()
            .with_file("index.html", "")
            .with_file("[...all].html", "")
            .with_file("images/logo.png", "png");
        let r = resolver(store, ResolvePolicy::Directory);
        let (path, origin, _) = served(r.resolve("/images/logo.png"));
        assert_eq!(path, "images/logo.png");
        assert_eq!(origin, Origin::Static);

        let (path, _, _) = served(r.resolve("/images/other.png"));
        assert_eq!(path, "[...all].html");
    }

    #[test]
    fn test_directory_index() {
        let store = MemoryStore::new()
            .with_file("index.html", "root")
            .with_file("docs/index.html", "docs")
            .with_file("assets/app.js", "");
        let r = resolver(store, ResolvePolicy::Directory);

        let (path, origin, _) = served(r.resolve("/docs/"));
        assert_eq!(path, "docs/index.html");
        assert_eq!(origin, Origin::DirectoryIndex);

        // Directory without an index page falls through to routes.
        let (path, origin, _) = served(r.resolve("/assets"));
        assert_eq!(path, "index.html");
        assert_eq!(origin, Origin::Fallback);
    }

    #[test]
    fn test_directory_policy_missing_index_is_not_found() {
        let store = MemoryStore::new().with_file("about.html", "");
        let r = resolver(store, ResolvePolicy::Directory);
        assert!(matches!(r.resolve("/"), Resolution::NotFound));
        assert!(matches!(r.resolve("/nowhere"), Resolution::NotFound));
    }

    #[test]
    fn test_traversal_is_a_miss() {
        let r = resolver(example_store(), ResolvePolicy::Directory);
        let (path, origin, _) = served(r.resolve("/../etc/passwd"));
        assert_eq!(path, "index.html");
        assert_eq!(origin, Origin::Fallback);
    }

    fn canonical_store() -> MemoryStore {
        example_store().with_file("404.html", "404.html").with_file("docs/index.html", "docs")
    }

    #[test]
    fn test_canonical_redirects_page_suffix() {
        let r = resolver(canonical_store(), ResolvePolicy::Canonical);
        assert!(matches!(r.resolve("/noarg.html"), Resolution::Redirect(ref l) if l == "/noarg"));
        assert!(matches!(r.resolve("/a/b.html"), Resolution::Redirect(ref l) if l == "/a/b"));
        assert!(matches!(r.resolve(".html"), Resolution::Redirect(ref l) if l == "/"));
        assert!(matches!(r.resolve("/a/.html"), Resolution::Redirect(ref l) if l == "/a"));
    }

    #[test]
    fn test_redirect_never_leaves_host() {
        let r = resolver(example_store(), ResolvePolicy::Canonical);
        for path in ["//evil.example/x.html", "///evil.example/x.html", "\\/evil.example/x.html"] {
            match r.resolve(path) {
                Resolution::Redirect(location) => {
                    assert!(location.starts_with('/'), "{path} -> {location}");
                    assert!(!location.starts_with("//"), "{path} -> {location}");
                }
                other => panic!("expected redirect for {path}, got {}", other.outcome()),
            }
        }
    }

    #[test]
    fn test_canonical_scenarios() {
        let r = resolver(canonical_store(), ResolvePolicy::Canonical);

        let (path, _, _) = served(r.resolve("/"));
        assert_eq!(path, "index.html");

        let (path, origin, _) = served(r.resolve("/test.txt"));
        assert_eq!((path.as_str(), origin), ("test.txt", Origin::Static));

        let (path, _, _) = served(r.resolve("/abc/page"));
        assert_eq!(path, "[arg1]/page.html");

        let (path, _, _) = served(r.resolve("/noarg"));
        assert_eq!(path, "noarg.html");
    }

    #[test]
    fn test_canonical_unmatched_serves_not_found_page() {
        let r = resolver(canonical_store(), ResolvePolicy::Canonical);
        match r.resolve("/not/found") {
            Resolution::Fallback(f) => assert_eq!(f.path, "404.html"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_canonical_directories_are_misses() {
        let r = resolver(canonical_store(), ResolvePolicy::Canonical);
        // `docs` is a directory: not served, and `[arg3]` claims the path.
        let (path, origin, _) = served(r.resolve("/docs"));
        assert_eq!(path, "[arg3].html");
        assert_eq!(origin, Origin::Route);
    }

    #[test]
    fn test_canonical_without_not_found_page() {
        let r = resolver(example_store(), ResolvePolicy::Canonical);
        assert!(matches!(r.resolve("/not/found"), Resolution::NotFound));
    }

    #[test]
    fn test_custom_fallback_names() {
        let store = MemoryStore::new()
            .with_file("home.html", "home")
            .with_file("missing.html", "missing");
        let r = Resolver::build(Arc::new(store.clone()), ResolvePolicy::Directory)
            .unwrap()
            .with_index_file("home.html");
        let (path, _, _) = served(r.resolve("/"));
        assert_eq!(path, "home.html");

        let r = Resolver::build(Arc::new(store), ResolvePolicy::Canonical)
            .unwrap()
            .with_not_found_file("missing.html");
        let (path, _, _) = served(r.resolve("/x/y"));
        assert_eq!(path, "missing.html");
    }

    #[test]
    fn test_resolved_length() {
        let r = resolver(example_store(), ResolvePolicy::Directory);
        match r.resolve("/test.txt") {
            Resolution::Found(f) => assert_eq!(f.len, "text.txt".len() as u64),
            other => panic!("unexpected {:?}", other),
        }
    }

    /// Wraps a store and fails every lookup of one path.
    #[derive(Debug)]
    struct FaultyStore {
        inner: MemoryStore,
        broken: &'static str,
        kind: StoreErrorKind,
    }

    impl FileStore for FaultyStore {
        fn walk(&self) -> Result<Vec<Entry>, StoreError> {
            self.inner.walk()
        }

        fn stat(&self, path: &str) -> Result<EntryKind, StoreError> {
            if path == self.broken {
                return Err(StoreError::new(self.kind, path));
            }
            self.inner.stat(path)
        }

        fn open(&self, path: &str) -> Result<Box<dyn FileHandle>, StoreError> {
            if path == self.broken {
                return Err(StoreError::new(self.kind, path));
            }
            self.inner.open(path)
        }
    }

    fn faulty(broken: &'static str, kind: StoreErrorKind, policy: ResolvePolicy) -> Resolver {
        let store = FaultyStore {
            inner: canonical_store(),
            broken,
            kind,
        };
        Resolver::build(Arc::new(store), policy).unwrap()
    }

    #[test]
    fn test_stat_failure_is_fatal() {
        for policy in [ResolvePolicy::Directory, ResolvePolicy::Canonical] {
            let r = faulty("secret", StoreErrorKind::PermissionDenied, policy);
            assert!(matches!(r.resolve("/secret"), Resolution::Failed(_)));
        }
    }

    #[test]
    fn test_target_open_failure_is_terminal() {
        let r = faulty("[arg3].html", StoreErrorKind::Other, ResolvePolicy::Canonical);
        assert!(matches!(r.resolve("/abc"), Resolution::Failed(_)));

        let r = faulty("[arg3].html", StoreErrorKind::NotFound, ResolvePolicy::Canonical);
        assert!(matches!(r.resolve("/abc"), Resolution::NotFound));
    }

    #[test]
    fn test_outcome_labels() {
        let r = resolver(canonical_store(), ResolvePolicy::Canonical);
        assert_eq!(r.resolve("/").outcome(), "index");
        assert_eq!(r.resolve("/abc").outcome(), "route");
        assert_eq!(r.resolve("/test.txt").outcome(), "static");
        assert_eq!(r.resolve("/a.html").outcome(), "redirect");
        assert_eq!(r.resolve("/x/y/z").outcome(), "fallback");
    }
}
