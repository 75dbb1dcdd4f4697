//! Cookie parsing and per-request filtering.
//!
//! The response scanner is intentionally tolerant: it keys on the `ookie: `
//! suffix so that `Set-Cookie`, `set-cookie` and even echoed `Cookie`
//! headers are all picked up, matching the wire behavior this client was
//! verified against.

use std::sync::OnceLock;

pub use cookie::Cookie;
use regex::Regex;

/// Cookies accumulated across the redirect hops of one logical request.
pub type CookieList = Vec<Cookie<'static>>;

fn cookie_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ookie: ([^\r\n]*)\r\n").expect("static regex"))
}

/// Scan raw response text for `Set-Cookie`-style lines and append every
/// parsed record to `existing`, preserving order (earlier hops first).
///
/// Returns `None` when the combined set is empty.
pub fn parse_set_cookie_lines(
    raw_response: &str,
    existing: Option<&[Cookie<'static>]>,
) -> Option<CookieList> {
    let mut cookies: CookieList = existing.map(<[_]>::to_vec).unwrap_or_default();
    for captures in cookie_line().captures_iter(raw_response) {
        let value = &captures[1];
        match Cookie::parse(value) {
            Ok(cookie) => cookies.push(cookie.into_owned()),
            Err(err) => {
                tracing::debug!(target: "snauth", "unparsable cookie line {value:?}: {err}");
            }
        }
    }
    (!cookies.is_empty()).then_some(cookies)
}

/// Whether a single cookie may be attached to a request against
/// `host`/`path`/`scheme`.
///
/// Eligibility: the secure flag implies a secure scheme, an empty domain
/// matches everything (otherwise the host must contain the domain), and an
/// empty path matches everything (otherwise the request path must start
/// with the cookie path).
fn eligible(cookie: &Cookie<'_>, host: &str, path: &str, scheme: &str) -> bool {
    if cookie.secure().unwrap_or(false) && scheme != "https" {
        return false;
    }
    let domain = cookie.domain().unwrap_or("").trim_start_matches('.');
    if !domain.is_empty() && !host.contains(domain) {
        return false;
    }
    let cookie_path = cookie.path().unwrap_or("");
    cookie_path.is_empty() || path.starts_with(cookie_path)
}

/// Filter `cookies` against the target and keep their original relative
/// order.
pub fn filter_for_request<'a>(
    cookies: &'a [Cookie<'static>],
    host: &str,
    path: &str,
    scheme: &str,
) -> Vec<&'a Cookie<'static>> {
    cookies
        .iter()
        .filter(|cookie| eligible(cookie, host, path, scheme))
        .collect()
}

/// Build the `Cookie` header value for a request, or `None` when no cookie
/// is eligible.
pub fn header_value(
    cookies: &[Cookie<'static>],
    host: &str,
    path: &str,
    scheme: &str,
) -> Option<String> {
    let eligible = filter_for_request(cookies, host, path, scheme);
    if eligible.is_empty() {
        return None;
    }
    Some(
        eligible
            .iter()
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
