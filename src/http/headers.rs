//! Header filtering in both directions.
//!
//! Hop-by-hop headers never cross the proxy. Everything else is copied entry
//! by entry in the order it arrived, so repeated headers stay repeated.

use std::collections::HashSet;

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::{ForwardingConfig, TargetUri};
use crate::http::cookies::{self, CookiePolicy};
use crate::rewrite::{PublicBase, UrlRewriter};

/// Headers meaningful only to a single connection.
pub const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

const SET_COOKIE2: &str = "set-cookie2";

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Extra per-message hop-by-hop names listed in `Connection`.
fn connection_nominated(headers: &HeaderMap) -> HashSet<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Everything the filter needs to know about one forwarding cycle.
pub struct HeaderContext<'a> {
    pub target: &'a TargetUri,
    pub public: &'a PublicBase,
    pub settings: &'a ForwardingConfig,
    pub cookie_prefix: &'a str,
    pub rewriter: &'a dyn UrlRewriter,
}

impl HeaderContext<'_> {
    fn cookie_policy(&self) -> CookiePolicy<'_> {
        CookiePolicy {
            prefix: self.cookie_prefix,
            preserve_cookies: self.settings.preserve_cookies,
            preserve_cookie_path: self.settings.preserve_cookie_path,
        }
    }
}

/// Header filtering strategy used by the forwarder.
pub trait HeaderFilter: Send + Sync {
    /// Headers for the origin request, built from the caller's.
    fn request_headers(&self, inbound: &HeaderMap, ctx: &HeaderContext<'_>) -> HeaderMap {
        copy_request_headers(inbound, ctx)
    }

    /// Headers for the caller, built from the origin response's.
    fn response_headers(&self, origin: &HeaderMap, ctx: &HeaderContext<'_>) -> HeaderMap {
        copy_response_headers(origin, ctx)
    }
}

/// The stock filtering rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardHeaders;

impl HeaderFilter for StandardHeaders {}

/// Apply the outbound rules to every inbound header entry.
///
/// `Content-Length` is always dropped; the body relay sets it from the
/// stream. `Accept-Encoding` is dropped when the proxy handles compression.
/// `Host` and `Cookie` are rewritten unless preserved. Split `Cookie`
/// headers are merged into one.
pub fn copy_request_headers(inbound: &HeaderMap, ctx: &HeaderContext<'_>) -> HeaderMap {
    let nominated = connection_nominated(inbound);
    let mut outbound = HeaderMap::with_capacity(inbound.len());
    let mut cookie_pairs: Vec<String> = Vec::new();

    for (name, value) in inbound.iter() {
        if *name == header::CONTENT_LENGTH
            || is_hop_by_hop(name.as_str())
            || nominated.contains(name.as_str())
        {
            continue;
        }

        if *name == header::ACCEPT_ENCODING && ctx.settings.handle_compression {
            continue;
        }

        if *name == header::HOST && !ctx.settings.preserve_host {
            if let Ok(host) = HeaderValue::from_str(ctx.target.authority()) {
                outbound.append(header::HOST, host);
            }
            continue;
        }

        if *name == header::COOKIE {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            let pairs = if ctx.settings.preserve_cookies {
                raw.trim().to_string()
            } else {
                cookies::translate_outbound(raw, ctx.cookie_prefix)
            };
            if !pairs.is_empty() {
                cookie_pairs.push(pairs);
            }
            continue;
        }

        outbound.append(name.clone(), value.clone());
    }

    // An HTTP/1.1 origin accepts a single Cookie header.
    if !cookie_pairs.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&cookie_pairs.join("; ")) {
            outbound.insert(header::COOKIE, value);
        }
    }

    outbound
}

/// Apply the inbound rules to every origin response header entry.
///
/// `Set-Cookie`/`Set-Cookie2` values may expand into several cookies, each
/// added as its own `Set-Cookie` entry. `Location` is mapped back into the
/// public namespace.
pub fn copy_response_headers(origin: &HeaderMap, ctx: &HeaderContext<'_>) -> HeaderMap {
    let nominated = connection_nominated(origin);
    let policy = ctx.cookie_policy();
    let mut outbound = HeaderMap::with_capacity(origin.len());

    for (name, value) in origin.iter() {
        if is_hop_by_hop(name.as_str()) || nominated.contains(name.as_str()) {
            continue;
        }

        let version2 = name.as_str() == SET_COOKIE2;
        if *name == header::SET_COOKIE || version2 {
            let Ok(raw) = value.to_str() else {
                tracing::debug!(header = %name, "Dropping non-text cookie header");
                continue;
            };
            for cookie in cookies::parse_set_cookie(raw, version2) {
                let cookie = cookies::translate_inbound(cookie, &policy, ctx.public);
                match HeaderValue::from_str(&cookie.to_string()) {
                    Ok(value) => {
                        outbound.append(header::SET_COOKIE, value);
                    }
                    Err(_) => tracing::warn!(cookie = %cookie.name, "Dropping unrepresentable cookie"),
                }
            }
            continue;
        }

        if *name == header::LOCATION {
            if let Ok(location) = value.to_str() {
                let rewritten = ctx.rewriter.inbound_location(ctx.target, location, ctx.public);
                if let Ok(value) = HeaderValue::from_str(&rewritten) {
                    outbound.append(header::LOCATION, value);
                    continue;
                }
            }
        }

        outbound.append(name.clone(), value.clone());
    }

    outbound
}
