//! Content types by file extension.

use std::path::Path;

use mime_guess::mime;

/// Returns the content type for `path`, judged by its extension alone.
///
/// Unknown extensions fall back to `application/octet-stream`; `text/*`
/// types are labelled UTF-8.
pub fn content_type_for(path: &Path) -> String {
    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    if guessed.type_() == mime::TEXT && guessed.get_param(mime::CHARSET).is_none() {
        format!("{}; charset=utf-8", guessed.essence_str())
    } else {
        guessed.to_string()
    }
}
