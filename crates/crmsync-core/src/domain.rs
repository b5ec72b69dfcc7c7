use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Locally assigned record id (customers, conversations, messages, integrations).
    LocalId
);
string_id!(
    /// Id assigned by the remote CRM API (`_id` in its responses).
    RemoteId
);
string_id!(
    /// Channel instance (one configured WhatsApp account/session).
    InstanceId
);
string_id!(
    /// Message id assigned by the source channel. Dedupe key for stored messages.
    NativeMessageId
);

/// Channel kind used when resolving an integration for an instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelKind(pub String);

impl ChannelKind {
    pub fn whatsapp() -> Self {
        Self("whatsapp".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChannelKind {
    fn default() -> Self {
        Self::whatsapp()
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local + remote ids of a resolved customer, as handed to the conversation resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerRef {
    pub id: LocalId,
    pub remote_id: Option<RemoteId>,
}

/// Local + remote ids of the integration an instance belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrationRef {
    pub id: LocalId,
    pub remote_id: RemoteId,
}

/// Everything the message resolver needs to address a conversation remotely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationRef {
    pub id: LocalId,
    pub remote_id: Option<RemoteId>,
    pub customer_remote_id: Option<RemoteId>,
}
