//! Content type ↔ file extension mapping

/// Known content types and the extension their records are stored under.
/// The first entry for an extension is the content type assumed on reload.
const EXTENSIONS: &[(&str, &str)] = &[
    ("application/json", "json"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/csv", "csv"),
    ("text/css", "css"),
    ("text/javascript", "js"),
    ("application/javascript", "js"),
    ("application/xml", "xml"),
    ("text/xml", "xml"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("application/gzip", "gz"),
    ("application/octet-stream", "bin"),
];

pub const JSON: &str = "application/json; charset=utf-8";
pub const TEXT: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Media type without parameters, lowercased: "Text/HTML; charset=x" → "text/html"
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// JSON or a `+json` structured syntax suffix
pub fn is_json(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence == "application/json" || essence.ends_with("+json")
}

/// Extension records of this content type are stored under, if any
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    if is_json(content_type) {
        return Some("json");
    }
    let essence = essence(content_type);
    EXTENSIONS
        .iter()
        .find(|(ct, _)| *ct == essence)
        .map(|(_, ext)| *ext)
}

/// Content type assumed for a file with this extension when no record
/// metadata says otherwise
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    match extension.as_str() {
        "json" => Some(JSON),
        "txt" => Some(TEXT),
        _ => EXTENSIONS
            .iter()
            .find(|(_, ext)| *ext == extension)
            .map(|(ct, _)| *ct),
    }
}
