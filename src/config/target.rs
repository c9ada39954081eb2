//! The origin every request is forwarded to.

use url::Url;

use crate::config::validation::ValidationError;

/// A parsed, absolute origin URI.
///
/// Keeps the configured text verbatim: URL rewriting is string substitution
/// against it, so normalising it here would change which `Location` values
/// are recognised as pointing back at the origin.
#[derive(Debug, Clone)]
pub struct TargetUri {
    raw: String,
    url: Url,
    authority: String,
}

impl TargetUri {
    /// Parse and check an origin URI. Only `http` and `https` with a host are accepted.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::MissingTarget);
        }

        let url = Url::parse(raw).map_err(|e| ValidationError::InvalidTarget {
            uri: raw.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidTarget {
                uri: raw.to_string(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }

        let host = url.host_str().ok_or_else(|| ValidationError::InvalidTarget {
            uri: raw.to_string(),
            reason: "missing host".to_string(),
        })?;

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            raw: raw.to_string(),
            url,
            authority,
        })
    }

    /// The URI exactly as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The configured URI without trailing slashes, used when joining paths.
    pub fn base(&self) -> &str {
        self.raw.trim_end_matches('/')
    }

    /// `host[:port]`, the value sent as `Host` unless the caller's is preserved.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }
}

impl std::fmt::Display for TargetUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
