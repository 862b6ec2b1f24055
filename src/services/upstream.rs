//! Forwarding of admitted requests to the backend service.
//!
//! Responsibility:
//! - Map the inbound path/query onto `UPSTREAM_URL`
//! - Relay method, end-to-end headers and body; relay the response back
//! - Keep the gate marker (`secret`) on the upstream leg only
//!
//! Bodies are buffered in both directions, each capped at `body_limit`.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, Request, Response, Uri, header},
};
use thiserror::Error;
use url::Url;

use crate::services::gate::MARKER_HEADER;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request body could not be read: {0}")]
    Body(#[source] axum::Error),
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("upstream response exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },
    #[error("upstream client could not be built: {0}")]
    Build(#[source] reqwest::Error),
}

// RFC 9110 §7.6.1 connection-specific fields, plus `host` which reqwest derives from the URL.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

#[derive(Clone, Debug)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: Url,
    body_limit: usize,
}

impl Upstream {
    pub fn new(base_url: Url, timeout: Duration, body_limit: usize) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(UpstreamError::Build)?;

        Ok(Self {
            client,
            base_url,
            body_limit,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn forward(&self, req: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let (parts, body) = req.into_parts();
        let target = target_url(&self.base_url, &parts.uri);

        let body: Bytes = axum::body::to_bytes(body, self.body_limit)
            .await
            .map_err(UpstreamError::Body)?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);

        tracing::debug!(method = %parts.method, %target, "forwarding upstream");

        let mut resp = self
            .client
            .request(parts.method, target)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = resp.status();
        let mut resp_headers = resp.headers().clone();
        strip_hop_by_hop(&mut resp_headers);
        resp_headers.remove(MARKER_HEADER);
        resp_headers.remove(header::CONTENT_LENGTH);

        let bytes = read_limited(&mut resp, self.body_limit).await?;

        let mut out = Response::new(Body::from(bytes));
        *out.status_mut() = status;
        *out.headers_mut() = resp_headers;
        Ok(out)
    }
}

async fn read_limited(resp: &mut reqwest::Response, limit: usize) -> Result<Bytes, UpstreamError> {
    let too_large = UpstreamError::ResponseTooLarge { limit };

    if resp.content_length().is_some_and(|len| len > limit as u64) {
        return Err(too_large);
    }

    let mut buf = Vec::new();
    while let Some(chunk) = resp.chunk().await.map_err(map_send_error)? {
        if buf.len() + chunk.len() > limit {
            return Err(too_large);
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}

fn map_send_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Transport(err)
    }
}

/// `base` path prefix + inbound path, inbound query.
pub fn target_url(base: &Url, uri: &Uri) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{}{}", prefix, uri.path()));
    url.set_query(uri.query());
    url
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Fields named by `Connection` are connection-specific as well.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}
