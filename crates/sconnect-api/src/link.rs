// `Link` header parsing for cursor pagination.
//
// The dashboard API returns continuation targets as
// `<https://...&startingAfter=X>; rel=next, <https://...>; rel=first`.
// Only the `next` relation matters here; its URL already carries every
// query parameter the following request needs.

use reqwest::header::{HeaderMap, LINK};

/// Extract the `rel="next"` (or unquoted `rel=next`) target from a `Link`
/// header value.
///
/// Directives are comma-separated; the first one whose relation is `next`
/// and that contains a well-formed `<...>` wins. Returns `None` when there
/// is no such directive.
pub fn next_link(header: &str) -> Option<&str> {
    header
        .split(',')
        .map(str::trim)
        .filter(|directive| directive.contains("rel=\"next\"") || directive.contains("rel=next"))
        .find_map(|directive| {
            let start = directive.find('<')?;
            let end = directive.find('>')?;
            (end > start).then(|| &directive[start + 1..end])
        })
}

/// Convenience wrapper reading the `Link` header off a response.
///
/// A header that isn't valid visible ASCII is treated as absent.
pub fn next_link_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(LINK)?.to_str().ok()?;
    next_link(raw).map(str::to_owned)
}
