//! Cookie namespacing across the proxy boundary.
//!
//! Cookies set by the origin are renamed with the `!Proxy!<name>` prefix so
//! they can't collide with cookies belonging to the proxy's own host. On the
//! way back only prefixed cookies are forwarded, with the prefix removed.

use std::fmt;

use crate::rewrite::PublicBase;

/// A cookie as set by the origin, and as re-issued to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub expires: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub version: Option<u32>,
    pub comment: Option<String>,
    pub same_site: Option<String>,
}

impl ProxyCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for ProxyCookie {
    /// Renders a `Set-Cookie` header value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(version) = self.version.filter(|v| *v > 0) {
            write!(f, "; Version={}", version)?;
        }
        if let Some(comment) = &self.comment {
            write!(f, "; Comment={}", comment)?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if let Some(expires) = &self.expires {
            write!(f, "; Expires={}", expires)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={}", path)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if let Some(same_site) = &self.same_site {
            write!(f, "; SameSite={}", same_site)?;
        }
        Ok(())
    }
}

/// Split on `sep`, ignoring separators inside double quotes.
fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn strip_header_prefix(value: &str) -> &str {
    for prefix in ["set-cookie2:", "set-cookie:"] {
        if value.len() >= prefix.len() && value[..prefix.len()].eq_ignore_ascii_case(prefix) {
            return &value[prefix.len()..];
        }
    }
    value
}

fn parse_one(raw: &str) -> Option<ProxyCookie> {
    let mut attrs = split_unquoted(raw, ';').into_iter().map(str::trim);
    let (name, value) = attrs.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = ProxyCookie::new(name, value.trim());
    for attr in attrs.filter(|a| !a.is_empty()) {
        let (key, val) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (attr, None),
        };
        match (key.to_ascii_lowercase().as_str(), val) {
            ("path", Some(v)) => cookie.path = Some(v.to_string()),
            ("domain", Some(v)) => cookie.domain = Some(v.to_string()),
            ("max-age", Some(v)) => cookie.max_age = v.parse().ok(),
            ("expires", Some(v)) => cookie.expires = Some(v.to_string()),
            ("version", Some(v)) => cookie.version = v.trim_matches('"').parse().ok(),
            ("comment", Some(v)) => cookie.comment = Some(v.to_string()),
            ("samesite", Some(v)) => cookie.same_site = Some(v.to_string()),
            ("secure", _) => cookie.secure = true,
            ("httponly", _) => cookie.http_only = true,
            _ => {}
        }
    }
    Some(cookie)
}

/// Parse an origin `Set-Cookie` / `Set-Cookie2` header value.
///
/// `Set-Cookie2` may carry several comma-separated cookies; plain
/// `Set-Cookie` carries one (its `Expires` dates contain commas).
/// Unparsable entries are skipped.
pub fn parse_set_cookie(value: &str, version2: bool) -> Vec<ProxyCookie> {
    let value = strip_header_prefix(value.trim());
    if version2 {
        split_unquoted(value, ',').into_iter().filter_map(parse_one).collect()
    } else {
        parse_one(value).into_iter().collect()
    }
}

/// Settings that decide how an origin cookie is re-issued.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy<'a> {
    pub prefix: &'a str,
    pub preserve_cookies: bool,
    pub preserve_cookie_path: bool,
}

/// Re-issue an origin cookie under the proxy's namespace.
///
/// Domain is always dropped. `Secure` only survives on a secure inbound
/// connection; the caller could never send it back otherwise.
pub fn translate_inbound(mut cookie: ProxyCookie, policy: &CookiePolicy<'_>, public: &PublicBase) -> ProxyCookie {
    if !policy.preserve_cookies {
        cookie.name = format!("{}{}", policy.prefix, cookie.name);
    }
    if !policy.preserve_cookie_path {
        cookie.path = Some(public.cookie_path().to_string());
    }
    cookie.domain = None;
    cookie.secure = cookie.secure && public.is_secure();
    cookie
}

/// Translate a caller `Cookie` header for the origin.
///
/// Keeps only pairs whose name carries `prefix`, strips it, and joins the
/// survivors with `"; "`. Pairs without an `=` are skipped; the value is
/// everything after the first `=`.
pub fn translate_outbound(header: &str, prefix: &str) -> String {
    header
        .split([';', ','])
        .filter_map(|pair| pair.trim().split_once('='))
        .filter_map(|(name, value)| {
            name.trim()
                .strip_prefix(prefix)
                .filter(|name| !name.is_empty())
                .map(|name| format!("{}={}", name, value.trim()))
        })
        .collect::<Vec<_>>()
        .join("; ")
}
