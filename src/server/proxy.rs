//! Reverse proxy rules for the dev server.

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::Method;
use std::io::Cursor;
use std::time::Duration;
use tiny_http::{Header, Request, Response, StatusCode};

use crate::config::ProxyRule;

/// Request headers not forwarded upstream.
const SKIPPED_REQUEST_HEADERS: &[&str] = &["host", "connection", "content-length", "transfer-encoding"];

/// Response headers not relayed back to the client.
const SKIPPED_RESPONSE_HEADERS: &[&str] =
    &["connection", "content-length", "transfer-encoding", "keep-alive"];

/// Forwards matching requests to upstream servers.
pub struct Proxy {
    rules: Vec<ProxyRule>,
    client: Client,
}

impl Proxy {
    pub fn new(rules: Vec<ProxyRule>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .redirect(Policy::none())
            .build()?;
        Ok(Self { rules, client })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule with the longest prefix matching `url`.
    ///
    /// A prefix matches whole path segments only: `/api` takes `/api`,
    /// `/api/users` and `/api?page=2` but not `/apiary`.
    pub fn rule_for(&self, url: &str) -> Option<&ProxyRule> {
        self.rules
            .iter()
            .filter(|rule| prefix_matches(&rule.prefix, url))
            .max_by_key(|rule| rule.prefix.len())
    }

    /// Forward a request and build the response to send back.
    ///
    /// Upstream error statuses are relayed as-is. Connection failures become
    /// `502 Bad Gateway`.
    pub fn forward(&self, rule: &ProxyRule, request: &mut Request) -> Response<Cursor<Vec<u8>>> {
        let url = upstream_url(&rule.target, request.url());

        let mut body = Vec::new();
        if let Err(e) = request.as_reader().read_to_end(&mut body) {
            log::warn!("proxy: failed to read request body: {}", e);
            return bad_gateway(&url, &e.to_string());
        }

        let method = match Method::from_bytes(request.method().as_str().as_bytes()) {
            Ok(method) => method,
            Err(e) => return bad_gateway(&url, &e.to_string()),
        };

        let mut upstream = self.client.request(method, &url);
        for header in request.headers() {
            let name = header.field.as_str().as_str();
            if SKIPPED_REQUEST_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
                continue;
            }
            upstream = upstream.header(name, header.value.as_str());
        }

        let response = match upstream.body(body).send() {
            Ok(response) => response,
            Err(e) => {
                log::warn!("proxy: {} failed: {}", url, e);
                return bad_gateway(&url, &e.to_string());
            }
        };

        log::debug!("proxy: {} {} -> {}", request.method(), url, response.status());
        relay(response, &url)
    }
}

/// Join a target base URL and a request path without doubling slashes.
pub fn upstream_url(target: &str, path: &str) -> String {
    match (target.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", target, &path[1..]),
        (false, false) => format!("{}/{}", target, path),
        _ => format!("{}{}", target, path),
    }
}

fn relay(response: reqwest::blocking::Response, url: &str) -> Response<Cursor<Vec<u8>>> {
    let status = response.status().as_u16();
    let headers: Vec<Header> = response
        .headers()
        .iter()
        .filter(|(name, _)| {
            !SKIPPED_RESPONSE_HEADERS.iter().any(|h| name.as_str().eq_ignore_ascii_case(h))
        })
        .filter_map(|(name, value)| Header::from_bytes(name.as_str(), value.as_bytes()).ok())
        .collect();

    let body = match response.bytes() {
        Ok(body) => body.to_vec(),
        Err(e) => return bad_gateway(url, &e.to_string()),
    };

    let mut out = Response::from_data(body).with_status_code(StatusCode(status));
    for header in headers {
        out.add_header(header);
    }
    out
}

fn bad_gateway(url: &str, message: &str) -> Response<Cursor<Vec<u8>>> {
    Response::from_data(format!("Bad Gateway: {}: {}", url, message).into_bytes())
        .with_status_code(StatusCode(502))
}

fn prefix_matches(prefix: &str, url: &str) -> bool {
    match url.strip_prefix(prefix) {
        Some(rest) => prefix.ends_with('/') || rest.is_empty() || rest.starts_with(['/', '?']),
        None => false,
    }
}
