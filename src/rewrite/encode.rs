//! Query/fragment escaping.
//!
//! Allowed unescaped: ASCII letters and digits, `_-!.~'()*`, `,;:$&+=`, and
//! `/@`. `%` passes through unless asked to escape it. Every other ASCII
//! character is escaped, and so is every non-ASCII character: one `%XX` per
//! UTF-8 byte, since `http::Uri` only accepts ASCII.

use std::borrow::Cow;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn passes(byte: u8, encode_percent: bool) -> bool {
    match byte {
        b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => true,
        b'_' | b'-' | b'!' | b'.' | b'~' | b'\'' | b'(' | b')' | b'*' => true,
        b',' | b';' | b':' | b'$' | b'&' | b'+' | b'=' => true,
        b'/' | b'@' => true,
        b'%' => !encode_percent,
        _ => false,
    }
}

/// Escape characters that may not appear in a URI query or fragment.
///
/// Returns the input borrowed when nothing needs escaping.
pub fn encode_uri_query(input: &str, encode_percent: bool) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let first = match bytes.iter().position(|&b| !passes(b, encode_percent)) {
        Some(i) => i,
        None => return Cow::Borrowed(input),
    };

    let mut out = String::with_capacity(input.len() + 16);
    out.push_str(&input[..first]);
    for &b in &bytes[first..] {
        if passes(b, encode_percent) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
    }
    Cow::Owned(out)
}
