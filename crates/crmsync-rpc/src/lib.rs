//! HTTP adapter for the remote RPC bridge.
//!
//! Each call is one `POST` of `{ action, metaInfo?, payload }` to the configured endpoint.
//! The broker answers with an envelope `{ status, data, errorMessage }`; bodies without a
//! `status` are taken as the response itself.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crmsync_core::{
    errors::Error,
    ports::RpcBridge,
    rpc::{RpcAction, RpcRequest, RpcResponse},
    Result,
};

#[derive(Clone, Debug)]
pub struct HttpRpcBridge {
    url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl HttpRpcBridge {
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("crmsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            url: url.into(),
            token,
            http,
        })
    }
}

#[async_trait]
impl RpcBridge for HttpRpcBridge {
    async fn call(&self, req: RpcRequest) -> Result<RpcResponse> {
        let action = req.action;
        debug!(action = %action, "rpc call");

        let mut builder = self.http.post(&self.url).json(&req);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::remote(action.as_str(), format!("request error: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::remote(action.as_str(), format!("read error: {e}")))?;

        if !status.is_success() {
            return Err(Error::remote(
                action.as_str(),
                format!("{status} {}", body.chars().take(200).collect::<String>()),
            ));
        }

        decode_envelope(action, &body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    status: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
    error_message: Option<String>,
}

/// Unwrap the broker envelope around a response body.
pub fn decode_envelope(action: RpcAction, body: &str) -> Result<RpcResponse> {
    let raw: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::remote(action.as_str(), format!("invalid json response: {e}")))?;

    if raw.get("status").is_none() {
        return Ok(RpcResponse::new(raw));
    }

    let env: Envelope = serde_json::from_value(raw)
        .map_err(|e| Error::remote(action.as_str(), format!("invalid envelope: {e}")))?;
    match env.status.as_deref() {
        Some("success") => Ok(RpcResponse::new(env.data)),
        _ => Err(Error::remote(
            action.as_str(),
            env.error_message
                .unwrap_or_else(|| "remote returned an error".to_string()),
        )),
    }
}
