//! URL rewriting between the public namespace and the origin's.
//!
//! # Data Flow
//! ```text
//! inbound path-info + raw query
//!     → url.rs (join onto target base)
//!     → encode.rs (escape illegal query/fragment characters)
//!     → origin URI
//!
//! origin Location header
//!     → url.rs (swap target base for public base)
//!     → caller-visible Location
//! ```

pub mod encode;
pub mod url;

use std::borrow::Cow;

use crate::config::TargetUri;

pub use encode::encode_uri_query;
pub use url::{rewrite_inbound_location, rewrite_outbound_url, PublicBase};

/// URL rewriting strategy used by the forwarder.
///
/// The default methods delegate to the functions in this module; implement
/// the trait to change how URLs map across the proxy.
pub trait UrlRewriter: Send + Sync {
    fn encode<'a>(&self, input: &'a str, encode_percent: bool) -> Cow<'a, str> {
        encode_uri_query(input, encode_percent)
    }

    fn outbound_url(
        &self,
        target: &TargetUri,
        path_info: Option<&str>,
        raw_query: Option<&str>,
        send_fragment: bool,
    ) -> String {
        rewrite_outbound_url(
            target,
            path_info,
            raw_query,
            |input, encode_percent| self.encode(input, encode_percent),
            send_fragment,
        )
    }

    fn inbound_location<'a>(
        &self,
        target: &TargetUri,
        location: &'a str,
        public: &PublicBase,
    ) -> Cow<'a, str> {
        rewrite_inbound_location(target, location, public)
    }
}

/// The stock rewriting rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRewriter;

impl UrlRewriter for DefaultRewriter {}
