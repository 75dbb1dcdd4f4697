//! HTTP command composition.
//!
//! The request is written by hand as literal HTTP/1.1 text; header order,
//! presence rules and even the historical trailing spaces after some header
//! values are part of the wire contract and covered byte-for-byte by tests.

use url::Url;

use crate::cookie::{self, Cookie};
use crate::trace::{DeviceInfo, SDK_VERSION};

/// Everything needed to compose one hop's request text.
#[derive(Debug, Default)]
pub struct CommandContext<'a> {
    pub access_token: Option<&'a str>,
    pub operators: Option<&'a str>,
    pub cookies: Option<&'a [Cookie<'static>]>,
    pub request_id: Option<&'a str>,
    /// Adds the sandbox marker header in a recognized dev environment.
    pub sandbox: bool,
}

/// Compose the raw request text for `url`.
///
/// Returns `None` when the URL lacks a host (a scheme-only or path-only
/// URL cannot be fetched). The path defaults to `/`, and a trailing slash
/// present in the source URL is preserved.
pub fn build_http_command(url: &Url, ctx: &CommandContext<'_>) -> Option<String> {
    let host = url.host_str()?;
    let scheme = url.scheme();
    if scheme.is_empty() || host.is_empty() {
        return None;
    }

    let mut path = url.path().to_string();
    if url.as_str().ends_with('/') && !path.ends_with('/') {
        path.push('/');
    }
    if path.is_empty() {
        path = "/".to_string();
    }

    let mut cmd = format!("GET {path}");
    if let Some(query) = url.query() {
        cmd.push('?');
        cmd.push_str(query);
    }

    cmd.push_str(&format!(" HTTP/1.1\r\nHost: {host}"));
    // `Url::port` is None for the scheme default, so this only appends
    // non-default ports.
    if let Some(port) = url.port() {
        cmd.push_str(&format!(":{port}"));
    }

    if let Some(token) = ctx.access_token {
        cmd.push_str(&format!("\r\nAuthorization: Bearer {token} "));
    }
    if let Some(request_id) = ctx.request_id {
        cmd.push_str(&format!("\r\nx-snauth-sdk-request: {request_id} "));
    }
    if let Some(operators) = ctx.operators {
        cmd.push_str(&format!("\r\nx-snauth-ops: {operators} "));
    }
    if ctx.sandbox {
        cmd.push_str("\r\nx-snauth-mode: sandbox");
    }
    if let Some(cookies) = ctx.cookies {
        if let Some(value) = cookie::header_value(cookies, host, &path, scheme) {
            cmd.push_str(&format!("\r\nCookie: {value}"));
        }
    }

    cmd.push_str(&format!("\r\nUser-Agent: {} ", DeviceInfo.user_agent(SDK_VERSION)));
    cmd.push_str("\r\nAccept: text/html,application/xhtml+xml,application/xml,*/*");
    cmd.push_str("\r\nConnection: close\r\n\r\n");
    Some(cmd)
}
