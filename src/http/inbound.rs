//! The caller's request as seen by the forwarder.
//!
//! # Responsibilities
//! - Strip the mount path to get the path-info, percent-decoded
//! - Keep the raw query string untouched
//! - Work out the public scheme and authority for URL and cookie rewriting
//!
//! Requests outside the mount path are not ours to forward. A path whose
//! escapes don't decode to UTF-8 is rejected rather than altered, since it
//! could not be re-encoded to the same bytes.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request};
use percent_encoding::percent_decode_str;

use crate::config::ListenerConfig;
use crate::error::{ProxyError, Result};
use crate::rewrite::PublicBase;

pub const X_REQUEST_ID: &str = "x-request-id";

/// A request received by the proxy, ready for forwarding.
pub struct InboundRequest {
    pub method: Method,
    /// Path below the mount point, percent-decoded. `None` when the request
    /// targets the mount point itself.
    pub path_info: Option<String>,
    /// Raw query string, never decoded.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Body,
    pub client_addr: SocketAddr,
    pub public: PublicBase,
    pub request_id: String,
}

impl InboundRequest {
    /// Adapt an axum request. `None` if it falls outside the mount path.
    pub fn from_request(
        request: Request<Body>,
        client_addr: SocketAddr,
        listener: &ListenerConfig,
    ) -> Result<Option<Self>> {
        let mount = listener.mount_path.trim_end_matches('/');
        let path_info = match path_below_mount(request.uri().path(), mount) {
            Some("") => None,
            Some(rest) => Some(decode_path(rest)?),
            None => return Ok(None),
        };

        let (parts, body) = request.into_parts();

        let scheme = parts
            .uri
            .scheme_str()
            .unwrap_or(listener.scheme.as_str())
            .to_string();
        let authority = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| listener.bind_address.clone());

        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(Some(Self {
            method: parts.method,
            path_info,
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
            client_addr,
            public: PublicBase::new(scheme, authority, mount),
            request_id,
        }))
    }

    /// The request as the caller addressed it, for logs.
    pub fn public_uri(&self) -> String {
        let mut uri = format!("{}://{}{}", self.public.scheme, self.public.authority, self.public.mount());
        if let Some(path) = &self.path_info {
            uri.push_str(path);
        }
        if let Some(query) = &self.query {
            uri.push('?');
            uri.push_str(query);
        }
        uri
    }
}

fn decode_path(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|path| path.into_owned())
        .map_err(|_| ProxyError::MalformedPath(raw.to_string()))
}

/// The part of `path` below `mount`, if `path` is at or under it.
fn path_below_mount<'a>(path: &'a str, mount: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(mount)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
