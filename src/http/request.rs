//! Request identification and path extraction.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) when the client sent none
//! - Percent-decode the request path before resolution
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The query string is ignored; only the path takes part in resolution
//! - Paths that do not decode to UTF-8 are rejected, not guessed at

use std::borrow::Cow;
use std::str::Utf8Error;

use axum::http::{HeaderMap, HeaderName, Request};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Characters escaped when a decoded path is put back into a header.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Generates `x-request-id` values as random UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// The request ID from headers, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Percent-decode a raw URI path.
pub fn decode_path(raw: &str) -> Result<Cow<'_, str>, Utf8Error> {
    percent_decode_str(raw).decode_utf8()
}

/// Re-encode a decoded path for use in a `Location` header.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ESCAPE).to_string()
}
