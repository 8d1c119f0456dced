//! Request metadata extraction.
//!
//! Builds the immutable [`RequestMeta`] the classifier consumes from the raw
//! axum request: the `X-Requested-With` header, the `embedded` /
//! `standalone` / `_standalone` / `lang` query fields, and the in-process
//! parent-shell sentinel.

use axum::http::{HeaderMap, Uri};

use storegate_engine::RequestMeta;

/// In-process marker a composing page inserts into request extensions when
/// it has already emitted the page header. Never client-controlled.
#[derive(Debug, Copy, Clone)]
pub struct ParentRenderedHeader;

/// Truthy per the admin panel's query conventions.
fn truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn falsy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

fn query_value<'a>(uri: &'a Uri, name: &str) -> Option<&'a str> {
    uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == name).then_some(value)
    })
}

/// Assemble the classifier's input from request parts.
///
/// `script_path` is the fragment's own mount path; it differs from the
/// request URI only when the fragment is being composed into another page.
pub fn request_meta(
    headers: &HeaderMap,
    uri: &Uri,
    script_path: &str,
    parent_rendered_header: bool,
) -> RequestMeta {
    let requested_with = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let standalone = query_value(uri, "standalone").and_then(|v| {
        if truthy(v) {
            Some(true)
        } else if falsy(v) || v.is_empty() {
            // A bare `?standalone` or `standalone=` is the legacy spelling
            // of the embed request.
            Some(false)
        } else {
            None
        }
    });

    RequestMeta {
        requested_with,
        embedded: query_value(uri, "embedded").is_some_and(|v| v.is_empty() || truthy(v)),
        standalone,
        force_standalone_marker: query_value(uri, "_standalone").is_some_and(truthy),
        entry_path: uri.path().to_owned(),
        script_path: script_path.to_owned(),
        parent_rendered_header,
        lang: query_value(uri, "lang")
            .filter(|v| !v.is_empty())
            .map(str::to_owned),
    }
}
