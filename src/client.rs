// src/client.rs

//! HTTP status fetcher.
//!
//! This is the fetch function the CLI hands to the poller: one GET per call,
//! decoded into the poller's envelope. It deliberately does no retrying; a
//! failed request ends the poll session.

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::polling::{Envelope, StatusPayload};

pub struct StatusClient {
    http: reqwest::Client,
    headers: HeaderMap,
    timeout: Duration,
}

impl StatusClient {
    pub fn new(token: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            headers: status_headers(token)?,
            timeout,
        })
    }

    /// GET `url` and decode the status body.
    pub async fn fetch(&self, url: &str) -> Result<Envelope<StatusPayload>> {
        let resp = self
            .http
            .get(url)
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to call status endpoint {}", url))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("Failed to read status response body")?;

        if !status.is_success() {
            bail!("Status endpoint returned {}: {}", status, text);
        }

        decode_status_body(&text)
    }
}

fn status_headers(token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Access token contains characters not allowed in a header")?;
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// Decode a status response body.
///
/// Accepts both `{ "status": ... }` and `{ "data": { "status": ... } }`.
pub fn decode_status_body(text: &str) -> Result<Envelope<StatusPayload>> {
    let body: JsonValue =
        serde_json::from_str(text).context("Status endpoint returned invalid JSON")?;

    let inner = match body.get("data") {
        Some(data) if data.get("status").is_some() => data.clone(),
        _ => body,
    };

    let payload: StatusPayload = serde_json::from_value(inner)
        .context("Status response has no string 'status' field")?;

    Ok(Envelope::new(payload))
}
