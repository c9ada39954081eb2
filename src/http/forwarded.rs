//! Client identity headers for the origin.

use std::net::IpAddr;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Append the client address to `X-Forwarded-For` and overwrite
/// `X-Forwarded-Proto` with the inbound scheme.
///
/// Existing `X-Forwarded-For` values on the inbound request (all of them, in
/// order) are kept ahead of the client address.
pub fn set_forwarded_headers(outbound: &mut HeaderMap, inbound: &HeaderMap, client: IpAddr, scheme: &str) {
    let existing: Vec<&str> = inbound
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    let forwarded_for = if existing.is_empty() {
        client.to_string()
    } else {
        format!("{}, {}", existing.join(", "), client)
    };

    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        outbound.insert(X_FORWARDED_FOR, value);
    }
    if let Ok(value) = HeaderValue::from_str(scheme) {
        outbound.insert(X_FORWARDED_PROTO, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> IpAddr {
        "5.6.7.8".parse().unwrap()
    }

    #[test]
    fn sets_client_address_when_absent() {
        let mut outbound = HeaderMap::new();
        set_forwarded_headers(&mut outbound, &HeaderMap::new(), client(), "http");
        assert_eq!(outbound[&X_FORWARDED_FOR], "5.6.7.8");
        assert_eq!(outbound[&X_FORWARDED_PROTO], "http");
    }

    #[test]
    fn appends_to_existing_chain() {
        let mut inbound = HeaderMap::new();
        inbound.insert(X_FORWARDED_FOR, HeaderValue::from_static("1.2.3.4"));
        inbound.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https"));

        // The generic copy loop already forwarded the caller's values verbatim.
        let mut outbound = inbound.clone();
        set_forwarded_headers(&mut outbound, &inbound, client(), "http");

        assert_eq!(outbound.get_all(&X_FORWARDED_FOR).iter().count(), 1);
        assert_eq!(outbound[&X_FORWARDED_FOR], "1.2.3.4, 5.6.7.8");
        assert_eq!(outbound[&X_FORWARDED_PROTO], "http");
    }

    #[test]
    fn joins_repeated_inbound_headers_in_order() {
        let mut inbound = HeaderMap::new();
        inbound.append(X_FORWARDED_FOR, HeaderValue::from_static("1.1.1.1"));
        inbound.append(X_FORWARDED_FOR, HeaderValue::from_static("2.2.2.2, 3.3.3.3"));

        let mut outbound = HeaderMap::new();
        set_forwarded_headers(&mut outbound, &inbound, "::1".parse().unwrap(), "https");
        assert_eq!(outbound[&X_FORWARDED_FOR], "1.1.1.1, 2.2.2.2, 3.3.3.3, ::1");
        assert_eq!(outbound[&X_FORWARDED_PROTO], "https");
    }
}
