//! Inbound channel events, in the shape the chat-api webhook delivers them.

use serde::{Deserialize, Serialize};

use crate::domain::{InstanceId, NativeMessageId};

/// Message type the channel uses for plain text.
pub const TEXT_MESSAGE_TYPE: &str = "chat";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub id: NativeMessageId,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub sender_name: String,
    /// Absent `type` is read as plain text, so the body is never sent as an attachment url.
    #[serde(rename = "type", default = "default_message_type")]
    pub kind: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub quoted_msg_body: Option<String>,
}

fn default_message_type() -> String {
    TEXT_MESSAGE_TYPE.to_string()
}

impl InboundMessage {
    pub fn is_text(&self) -> bool {
        self.kind == TEXT_MESSAGE_TYPE
    }

    /// Phone number of the remote party: the `chatId` user part (`15551234@c.us` → `15551234`).
    pub fn sender_phone(&self) -> Option<&str> {
        let user = self.chat_id.split('@').next().unwrap_or("").trim();
        if user.is_empty() {
            None
        } else {
            Some(user)
        }
    }
}

/// One webhook delivery: a batch of messages seen by a single channel instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub instance_id: InstanceId,
    /// `null` entries are kept as `None`; the conversation resolver treats them as absent.
    #[serde(default)]
    pub messages: Vec<Option<InboundMessage>>,
}

impl InboundEvent {
    pub fn parse(line: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}
