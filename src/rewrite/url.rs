//! Mapping between the public URL space and the origin's.

use std::borrow::Cow;

use crate::config::TargetUri;

/// The caller-visible root of the proxied namespace: `scheme://authority/mount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicBase {
    pub scheme: String,
    pub authority: String,
    pub mount_path: String,
}

impl PublicBase {
    pub fn new(
        scheme: impl Into<String>,
        authority: impl Into<String>,
        mount_path: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            authority: authority.into(),
            mount_path: mount_path.into(),
        }
    }

    /// Mount path without a trailing slash; empty when mounted at the root.
    pub fn mount(&self) -> &str {
        self.mount_path.trim_end_matches('/')
    }

    /// Path cookies set through the proxy are scoped to.
    pub fn cookie_path(&self) -> &str {
        match self.mount() {
            "" => "/",
            mount => mount,
        }
    }

    pub fn is_secure(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("https")
    }
}

/// Build the origin URI for an inbound request.
///
/// `path_info` has already been percent-decoded by the inbound layer, so it is
/// re-encoded with `%` escaped. The raw query was never decoded and keeps its
/// `%` sequences. Anything after the first `#` in the raw query is the
/// fragment; it is encoded on its own and only sent when `send_fragment` is set.
pub fn rewrite_outbound_url<F>(
    target: &TargetUri,
    path_info: Option<&str>,
    raw_query: Option<&str>,
    encode: F,
    send_fragment: bool,
) -> String
where
    F: Fn(&str, bool) -> Cow<'_, str>,
{
    let mut uri = String::with_capacity(target.as_str().len() + 64);

    match path_info.filter(|p| !p.is_empty()) {
        Some(path) => {
            uri.push_str(target.base());
            let encoded = encode(path, true);
            if !encoded.starts_with('/') {
                uri.push('/');
            }
            uri.push_str(&encoded);
        }
        None => uri.push_str(target.as_str()),
    }

    if let Some(raw) = raw_query {
        let (query, fragment) = match raw.split_once('#') {
            Some((query, fragment)) => (query, Some(fragment)),
            None => (raw, None),
        };

        if !query.is_empty() {
            uri.push('?');
            uri.push_str(&encode(query, false));
        }

        if let Some(fragment) = fragment.filter(|_| send_fragment) {
            uri.push('#');
            uri.push_str(&encode(fragment, false));
        }
    }

    uri
}

/// Map an origin `Location` back into the public namespace.
///
/// Values that don't point under the target base are returned untouched. The
/// suffix after the base is copied byte for byte, keeping whatever encoding
/// the origin chose.
pub fn rewrite_inbound_location<'a>(
    target: &TargetUri,
    location: &'a str,
    public: &PublicBase,
) -> Cow<'a, str> {
    let suffix = match location.strip_prefix(target.base()) {
        Some(suffix) => suffix,
        None => return Cow::Borrowed(location),
    };

    // "http://origin/basement" is not under "http://origin/base".
    if !(suffix.is_empty() || suffix.starts_with(['/', '?', '#'])) {
        return Cow::Borrowed(location);
    }

    let mount = public.mount();
    let mut rewritten = String::with_capacity(
        public.scheme.len() + public.authority.len() + mount.len() + suffix.len() + 4,
    );
    rewritten.push_str(&public.scheme);
    rewritten.push_str("://");
    rewritten.push_str(&public.authority);
    rewritten.push_str(mount);
    if mount.is_empty() && !suffix.starts_with('/') {
        rewritten.push('/');
    }
    rewritten.push_str(suffix);
    Cow::Owned(rewritten)
}
