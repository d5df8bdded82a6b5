//! Response construction.
//!
//! # Responsibilities
//! - Turn a `Resolution` into exactly one HTTP response
//! - Serve opened files: content type, length, single byte ranges, HEAD
//! - Map failures to redirect / 404 / 500 without leaking store errors
//!
//! # Design Decisions
//! - Content type inferred from the served file's extension
//! - Multi-range requests are answered with the whole file
//! - Ranges only apply to 200 responses, never to fallback 404 pages
//! - Bodies are streamed in fixed-size chunks read on the blocking pool

use std::io::{self, Read, Seek, SeekFrom};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};

use futures_util::stream;
use tokio::sync::mpsc;

use crate::http::request::encode_path;
use crate::resolve::{Resolution, ResolvePolicy, ResolvedFile};

/// An inclusive byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Result of interpreting a `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// Serve the whole file.
    Full,
    /// Serve one slice with 206.
    Partial(ByteRange),
    /// Answer 416.
    Unsatisfiable,
}

/// Interpret a `Range` header value against a file of `len` bytes.
///
/// Anything other than a single well-formed `bytes=` range is ignored.
pub fn parse_range(value: &str, len: u64) -> RangeRequest {
    let Some(ranges) = value.trim().strip_prefix("bytes=") else {
        return RangeRequest::Full;
    };
    if ranges.contains(',') {
        return RangeRequest::Full;
    }
    let Some((start, end)) = ranges.trim().split_once('-') else {
        return RangeRequest::Full;
    };

    match (start.trim(), end.trim()) {
        ("", "") => RangeRequest::Full,
        ("", suffix) => match suffix.parse::<u64>() {
            Ok(0) => RangeRequest::Unsatisfiable,
            Ok(_) if len == 0 => RangeRequest::Unsatisfiable,
            Ok(n) => RangeRequest::Partial(ByteRange {
                start: len.saturating_sub(n),
                end: len - 1,
            }),
            Err(_) => RangeRequest::Full,
        },
        (start, end) => {
            let Ok(start) = start.parse::<u64>() else {
                return RangeRequest::Full;
            };
            let end = if end.is_empty() {
                None
            } else {
                match end.parse::<u64>() {
                    Ok(end) if end >= start => Some(end),
                    _ => return RangeRequest::Full,
                }
            };
            if start >= len {
                return RangeRequest::Unsatisfiable;
            }
            let last = len - 1;
            RangeRequest::Partial(ByteRange {
                start,
                end: end.map_or(last, |e| e.min(last)),
            })
        }
    }
}

/// Content type for a served path.
pub fn content_type(path: &str) -> HeaderValue {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let value = if mime.type_() == mime_guess::mime::TEXT && mime.get_param(mime_guess::mime::CHARSET).is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

/// Build the response for a resolution.
///
/// Seeks the opened file in place and hands body reads to the blocking
/// pool; call from within a tokio runtime, off the async workers.
pub fn into_response(
    resolution: Resolution,
    policy: ResolvePolicy,
    method: &Method,
    headers: &HeaderMap,
) -> Response {
    match resolution {
        Resolution::Found(file) => serve_file(file, StatusCode::OK, method, headers),
        Resolution::Fallback(file) => {
            let status = if policy.fallback_is_not_found() {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::OK
            };
            serve_file(file, status, method, headers)
        }
        Resolution::Redirect(location) => redirect(&location),
        Resolution::NotFound => not_found(),
        Resolution::Failed(err) => {
            tracing::error!(error = %err, "Store failure while resolving request");
            internal_error()
        }
    }
}

/// Serve an opened file with the given status.
pub fn serve_file(mut file: ResolvedFile, status: StatusCode, method: &Method, headers: &HeaderMap) -> Response {
    let range = match headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        Some(value) if status == StatusCode::OK => parse_range(value, file.len),
        _ => RangeRequest::Full,
    };

    let (status, slice) = match range {
        RangeRequest::Full => (status, None),
        RangeRequest::Partial(r) => (StatusCode::PARTIAL_CONTENT, Some(r)),
        RangeRequest::Unsatisfiable => {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{}", file.len))],
            )
                .into_response();
        }
    };

    let (offset, length) = match slice {
        Some(r) => (r.start, r.len()),
        None => (0, file.len),
    };

    if let Err(e) = file.handle.seek(SeekFrom::Start(offset)) {
        tracing::error!(path = %file.path, error = %e, "Failed to seek file");
        return internal_error();
    }

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type(&file.path))
        .header(header::CONTENT_LENGTH, length)
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(r) = slice {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", r.start, r.end, file.len),
        );
    }

    let body = if *method == Method::HEAD {
        Body::empty()
    } else {
        stream_body(file, length)
    };

    builder.body(body).unwrap_or_else(|_| internal_error())
}

/// Size of each body chunk read from a file.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Stream `length` bytes from the file's current position.
///
/// Reads happen on the blocking pool; at most two chunks are buffered ahead
/// of the client.
fn stream_body(mut file: ResolvedFile, length: u64) -> Body {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(2);

    tokio::task::spawn_blocking(move || {
        let mut remaining = length;
        while remaining > 0 {
            let want = remaining.min(CHUNK_SIZE as u64) as usize;
            let mut buf = vec![0; want];
            let chunk = match file.handle.read(&mut buf) {
                Ok(0) => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
                Ok(n) => {
                    buf.truncate(n);
                    remaining -= n as u64;
                    Ok(Bytes::from(buf))
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };

            let failed = chunk.is_err();
            if let Err(e) = &chunk {
                tracing::error!(path = %file.path, error = %e, "Failed to read file");
            }
            // receiver gone means the client disconnected
            if tx.blocking_send(chunk).is_err() || failed {
                return;
            }
        }
    });

    Body::from_stream(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }))
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(&encode_path(location)) {
        Ok(value) => (StatusCode::PERMANENT_REDIRECT, [(header::LOCATION, value)]).into_response(),
        Err(_) => internal_error(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

pub fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
