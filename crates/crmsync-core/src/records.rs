//! Locally stored records.
//!
//! Every synced record carries an optional `remote_id`: `None` while the record only exists
//! locally, `Some` once the remote API acknowledged it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ChannelKind, ConversationRef, CustomerRef, InstanceId, IntegrationRef, LocalId, NativeMessageId,
    RemoteId,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: LocalId,
    pub kind: ChannelKind,
    pub instance_id: InstanceId,
    pub remote_id: RemoteId,
}

impl Integration {
    pub fn to_ref(&self) -> IntegrationRef {
        IntegrationRef {
            id: self.id.clone(),
            remote_id: self.remote_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: LocalId,
    pub phone_number: String,
    pub name: String,
    pub integration_id: LocalId,
    pub remote_id: Option<RemoteId>,
}

impl Customer {
    pub fn to_ref(&self) -> CustomerRef {
        CustomerRef {
            id: self.id.clone(),
            remote_id: self.remote_id.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewCustomer {
    pub phone_number: String,
    pub name: String,
    pub integration_id: LocalId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: LocalId,
    pub timestamp: DateTime<Utc>,
    pub sender_id: LocalId,
    pub recipient_id: String,
    pub content: String,
    pub integration_id: LocalId,
    pub instance_id: InstanceId,
    pub remote_id: Option<RemoteId>,
}

impl Conversation {
    /// Address this conversation for message sync on behalf of `customer`.
    pub fn to_ref(&self, customer: &CustomerRef) -> ConversationRef {
        ConversationRef {
            id: self.id.clone(),
            remote_id: self.remote_id.clone(),
            customer_remote_id: customer.remote_id.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewConversation {
    pub timestamp: DateTime<Utc>,
    pub sender_id: LocalId,
    pub recipient_id: String,
    pub content: String,
    pub integration_id: LocalId,
    pub instance_id: InstanceId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: LocalId,
    pub conversation_id: LocalId,
    pub mid: NativeMessageId,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Clone, Debug)]
pub struct NewConversationMessage {
    pub conversation_id: LocalId,
    pub mid: NativeMessageId,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub attachments: Vec<Attachment>,
}
