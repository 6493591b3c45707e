//! File server implementation

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures::TryStreamExt;
use http::header::{self, HeaderMap, HeaderValue};
use http::request::Parts;
use http::{Method, Response, StatusCode, Uri};
use http_body::Frame;
use http_body_util::{BodyExt, StreamBody};
use percent_encoding::percent_decode_str;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use crate::body::{self, Body};
use crate::mime::guess_mime_type;
use crate::responder::Responder;

const SERVER_NAME: &str = concat!("isoserve/", env!("CARGO_PKG_VERSION"));

/// Configuration for the file server
#[derive(Debug, Clone)]
pub struct FileServerConfig {
    /// Root directory to serve
    pub root: PathBuf,
    /// Index files to look for, in order
    pub index: Vec<String>,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: vec!["index.html".to_string(), "index.htm".to_string()],
        }
    }
}

/// Static file server
#[derive(Debug, Clone)]
pub struct FileServer {
    config: FileServerConfig,
}

impl FileServer {
    /// Create a new file server
    pub fn new(config: FileServerConfig) -> Self {
        Self { config }
    }

    /// Create a file server for a directory
    pub fn serve_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(FileServerConfig {
            root: root.into(),
            ..Default::default()
        })
    }

    /// Map a URL path onto the filesystem.
    ///
    /// The path is percent-decoded and rebuilt one segment at a time; `..`
    /// never climbs above the root, so the result always lies inside it.
    pub fn resolve(&self, url_path: &str) -> PathBuf {
        let decoded = percent_decode_str(url_path).decode_utf8_lossy();
        let mut resolved = self.config.root.clone();
        let mut depth = 0usize;

        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if depth > 0 {
                        resolved.pop();
                        depth -= 1;
                    }
                }
                _ => {
                    let mut components = Path::new(segment).components();
                    if let (Some(Component::Normal(name)), None) =
                        (components.next(), components.next())
                    {
                        resolved.push(name);
                        depth += 1;
                    }
                }
            }
        }

        resolved
    }

    /// Serve a file request
    pub async fn serve(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Response<Body> {
        let head = match *method {
            Method::GET => false,
            Method::HEAD => true,
            _ => return error_response(StatusCode::NOT_IMPLEMENTED, "Unsupported method", false),
        };

        let url_path = uri.path();
        let mut file_path = self.resolve(url_path);
        tracing::debug!("📁 Serving request: {} -> {:?}", url_path, file_path);

        let mut metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) => m,
            Err(e) => return io_error_response(&e, head),
        };

        if metadata.is_dir() {
            if !url_path.ends_with('/') {
                return redirect_to_dir(uri, head);
            }

            let mut index_found = false;
            for index in &self.config.index {
                let index_path = file_path.join(index);
                if let Ok(m) = tokio::fs::metadata(&index_path).await {
                    if m.is_file() {
                        file_path = index_path;
                        metadata = m;
                        index_found = true;
                        break;
                    }
                }
            }

            if !index_found {
                return error_response(StatusCode::NOT_FOUND, "File not found", head);
            }
        } else if url_path.ends_with('/') {
            return error_response(StatusCode::NOT_FOUND, "File not found", head);
        }

        let file = match tokio::fs::File::open(&file_path).await {
            Ok(f) => f,
            Err(e) => return io_error_response(&e, head),
        };
        // Length and mtime come from the open handle so they match what is streamed.
        if let Ok(m) = file.metadata().await {
            metadata = m;
        }

        let modified = metadata.modified().ok();
        if let Some(mtime) = modified {
            if not_modified_since(mtime, headers) {
                let mut response = Response::new(body::empty());
                *response.status_mut() = StatusCode::NOT_MODIFIED;
                response
                    .headers_mut()
                    .insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
                return response;
            }
        }

        let len = metadata.len();
        let content = if head {
            body::empty()
        } else {
            StreamBody::new(ReaderStream::new(file.take(len)).map_ok(Frame::data)).boxed_unsync()
        };

        let mut response = Response::new(content);
        let headers = response.headers_mut();
        headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(guess_mime_type(&file_path)),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        if let Some(value) = modified.and_then(|t| HeaderValue::from_str(&httpdate::fmt_http_date(t)).ok()) {
            headers.insert(header::LAST_MODIFIED, value);
        }
        response
    }
}

#[async_trait]
impl Responder for FileServer {
    async fn respond(&self, parts: &Parts) -> Response<Body> {
        self.serve(&parts.method, &parts.uri, &parts.headers).await
    }
}

/// `If-Modified-Since` check. Ignored when `If-None-Match` is present or the
/// date does not parse; compared at whole-second precision.
fn not_modified_since(mtime: SystemTime, headers: &HeaderMap) -> bool {
    if headers.contains_key(header::IF_NONE_MATCH) {
        return false;
    }

    let since = match headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
    {
        Some(t) => t,
        None => return false,
    };

    let secs = |t: SystemTime| t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    secs(mtime) <= secs(since)
}

fn redirect_to_dir(uri: &Uri, head: bool) -> Response<Body> {
    let location = match uri.query() {
        Some(q) => format!("{}/?{}", uri.path(), q),
        None => format!("{}/", uri.path()),
    };

    let value = match HeaderValue::from_str(&location) {
        Ok(v) => v,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Bad request path", head),
    };

    let mut response = Response::new(body::empty());
    *response.status_mut() = StatusCode::MOVED_PERMANENTLY;
    let headers = response.headers_mut();
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
    headers.insert(header::LOCATION, value);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
    response
}

fn io_error_response(err: &std::io::Error, head: bool) -> Response<Body> {
    match err.kind() {
        // InvalidInput: the decoded path holds a byte the OS rejects, such as NUL
        ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::InvalidInput => {
            error_response(StatusCode::NOT_FOUND, "File not found", head)
        }
        ErrorKind::PermissionDenied => error_response(StatusCode::FORBIDDEN, "Permission denied", head),
        _ => {
            tracing::warn!("File read failed: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", head)
        }
    }
}

/// Short HTML error page
fn error_response(status: StatusCode, message: &str, head: bool) -> Response<Body> {
    let page = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Error response</title></head>\n\
         <body><h1>Error response</h1><p>Error code: {}</p><p>Message: {}.</p></body></html>\n",
        status.as_u16(),
        message
    );

    let len = page.len() as u64;
    let mut response = Response::new(if head { body::empty() } else { body::full(page) });
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html;charset=utf-8"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    response
}
