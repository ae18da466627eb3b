//! URL splitting helpers shared by the pipeline and the link extractor.
//!
//! Crawled URLs are plain `http://` URLs. The domain is the lower-cased host;
//! the path keeps its query string but loses the fragment.

/// Extract the lower-cased host from a URL.
///
/// `http://Example.com/foo?x=1#frag` yields `example.com`.
pub fn domain_of(url: &str) -> Option<String> {
    let rest = strip_scheme(url);
    if rest.is_empty() {
        return None;
    }

    let host = match rest.find('/') {
        Some(pos) => &rest[..pos],
        None => rest,
    };
    // Ports and credentials never appear in crawled URLs; a host containing
    // them is rejected upstream by domain validation.
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    Some(host.to_lowercase())
}

/// Extract the path (query preserved, fragment stripped) from a URL.
///
/// `http://host/rest?x#y` yields `/rest?x`; a bare host yields `/`.
pub fn path_of(url: &str) -> String {
    let rest = strip_scheme(url);

    let path = match rest.find('/') {
        Some(pos) => &rest[pos..],
        None => "/",
    };

    match path.find('#') {
        Some(pos) => path[..pos].to_string(),
        None => path.to_string(),
    }
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("http://").unwrap_or(url)
}
