//! Content classification by file extension

use std::path::Path;

/// Returned for anything the table does not know
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Extension (with leading dot) to media type.
///
/// The empty key is the catch-all, so every lookup resolves.
pub const EXTENSION_MAP: &[(&str, &str)] = &[
    ("", DEFAULT_MIME_TYPE),
    (".css", "text/css"),
    (".html", "text/html"),
    (".jpg", "image/jpg"),
    (".js", "application/x-javascript"),
    (".json", "application/json"),
    (".manifest", "text/cache-manifest"),
    (".png", "image/png"),
    (".wasm", "application/wasm"),
    (".xml", "application/xml"),
];

/// Get the MIME type for a path from its extension
pub fn guess_mime_type(path: impl AsRef<Path>) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    lookup(&ext)
        .or_else(|| lookup(&ext.to_ascii_lowercase()))
        .unwrap_or(DEFAULT_MIME_TYPE)
}

fn lookup(ext: &str) -> Option<&'static str> {
    EXTENSION_MAP
        .iter()
        .find(|(key, _)| *key == ext)
        .map(|(_, mime)| *mime)
}
