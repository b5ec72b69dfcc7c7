//! Remote RPC contract: action names, payload shapes and the response accessor.
//!
//! Payloads travel as JSON *strings* inside the request (the broker forwards them opaquely).

use serde::{Deserialize, Serialize};

use crate::{domain::RemoteId, records::Attachment, Error, Result};

/// Meta info telling the remote side to replace message content instead of appending.
pub const REPLACE_CONTENT: &str = "replaceContent";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcAction {
    #[serde(rename = "get-create-update-customer")]
    GetCreateUpdateCustomer,
    #[serde(rename = "create-or-update-conversation")]
    CreateOrUpdateConversation,
    #[serde(rename = "create-conversation-message")]
    CreateConversationMessage,
}

impl RpcAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RpcAction::GetCreateUpdateCustomer => "get-create-update-customer",
            RpcAction::CreateOrUpdateConversation => "create-or-update-conversation",
            RpcAction::CreateConversationMessage => "create-conversation-message",
        }
    }
}

impl std::fmt::Display for RpcAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub action: RpcAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_info: Option<String>,
    pub payload: String,
}

impl RpcRequest {
    pub fn new<P: Serialize>(action: RpcAction, payload: &P) -> Result<Self> {
        Ok(Self {
            action,
            meta_info: None,
            payload: serde_json::to_string(payload)?,
        })
    }

    pub fn with_meta_info(mut self, meta: impl Into<String>) -> Self {
        self.meta_info = Some(meta.into());
        self
    }

    /// Decode the payload back into JSON (handy for adapters and tests).
    pub fn payload_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Parsed response of a remote call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RpcResponse {
    pub raw: serde_json::Value,
}

impl RpcResponse {
    pub fn new(raw: serde_json::Value) -> Self {
        Self { raw }
    }

    pub fn remote_id(&self) -> Option<RemoteId> {
        match self.raw.get("_id")? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(RemoteId(s.clone())),
            serde_json::Value::Number(n) => Some(RemoteId(n.to_string())),
            _ => None,
        }
    }

    /// The `_id` an action must return; its absence counts as a failed sync.
    pub fn require_remote_id(&self, action: RpcAction) -> Result<RemoteId> {
        self.remote_id()
            .ok_or_else(|| Error::remote(action.as_str(), "response has no _id"))
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload<'a> {
    pub integration_id: &'a RemoteId,
    pub first_name: &'a str,
    pub phones: [&'a str; 1],
    pub primary_phone: &'a str,
    pub is_user: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPayload<'a> {
    pub customer_id: Option<&'a RemoteId>,
    pub integration_id: &'a RemoteId,
    pub content: &'a str,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload<'a> {
    pub content: &'a str,
    pub attachments: &'a [Attachment],
    pub conversation_id: Option<&'a RemoteId>,
    pub customer_id: Option<&'a RemoteId>,
}
