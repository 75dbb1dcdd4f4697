//! Response framing and interpretation.
//!
//! The transport hands back one raw byte buffer per hop (the server closes
//! the connection after each response). Everything here is a pure function
//! over that buffer: status extraction at its fixed offset, the tolerant
//! `Location` scan, the UTF-8/single-byte decode that never fails, and the
//! heuristic that strips chunked-transfer framing off a JSON payload.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::cookie::{self, Cookie, CookieList};

/// A fully received response: status code plus the raw bytes of the whole
/// exchange (status line, headers and body).
#[derive(Debug, Clone)]
pub struct ConnectionResponse {
    pub status: u16,
    pub body: Option<Vec<u8>>,
}

/// Outcome of a 3xx response: the next hop (if one could be derived) and a
/// snapshot of the cookies accumulated so far.
#[derive(Debug, Clone)]
pub struct RedirectResult {
    pub url: Option<Url>,
    pub cookies: Option<CookieList>,
}

fn location_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Keyed on the suffix so both `Location:` and `location:` match.
    RE.get_or_init(|| Regex::new(r"ocation: ([^\r\n]*)\r\n").expect("static regex"))
}

fn embedded_json() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^}]*\}").expect("static regex"))
}

/// Extract the status code from its fixed position in the status line
/// (three digits starting at offset 9). Returns 0 when the response does
/// not carry a numeric code there.
#[must_use]
pub fn parse_status_line(response: &str) -> u16 {
    response
        .get(9..12)
        .and_then(|code| code.parse().ok())
        .unwrap_or(0)
}

/// Decode response bytes, attempting UTF-8 first and falling back to a
/// single-byte decoding. Never fails.
#[must_use]
pub fn decode(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => data.iter().map(|&byte| byte as char).collect(),
    }
}

/// Locate a `Location` header and resolve it into the next hop.
///
/// Literal spaces in the value are replaced with `+` (some upstreams
/// mis-encode query parameters). Host-relative targets are resolved against
/// the request URL. Cookies found in the same response are appended to the
/// accumulated set. Returns `None` when the request URL has no host, when
/// no `Location` line exists, or when the value does not parse as a URL.
pub fn parse_redirect(
    request_url: &Url,
    response: &str,
    cookies: Option<&[Cookie<'static>]>,
) -> Option<RedirectResult> {
    request_url.host_str()?;
    let captures = location_line().captures(response)?;
    let cleaned = captures[1].replace(' ', "+");
    if cleaned.is_empty() {
        return None;
    }

    let target = match Url::parse(&cleaned) {
        Ok(url) if url.host().is_some() => url,
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            match request_url.join(&cleaned) {
                Ok(url) => url,
                Err(err) => {
                    tracing::debug!(target: "snauth", "URL malformed {cleaned:?}: {err}");
                    return None;
                }
            }
        }
        Err(err) => {
            tracing::debug!(target: "snauth", "URL malformed {cleaned:?}: {err}");
            return None;
        }
    };

    Some(RedirectResult {
        url: Some(target),
        cookies: cookie::parse_set_cookie_lines(response, cookies),
    })
}

/// Strip transfer-chunking artifacts by isolating the substring between the
/// first `{` and the last `}`. Returns `None` when the bytes are not UTF-8
/// or contain no such pair.
#[must_use]
pub fn strip_chunked_artifacts(data: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(data).ok()?;
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start <= end).then(|| &text[start..=end])
}

/// Best-effort fallback: find the first embedded JSON object in freeform
/// trace text.
#[must_use]
pub fn embedded_json_object(trace: &str) -> Option<&str> {
    embedded_json().find(trace).map(|m| m.as_str())
}
