use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::{InstanceId, LocalId, NativeMessageId},
    errors::Error,
    ports::{ConversationStore, CustomerStore, MessageStore},
    records::{
        Conversation, ConversationMessage, Customer, NewConversation, NewConversationMessage,
        NewCustomer,
    },
    Result,
};

/// In-process store for customers, conversations and messages.
///
/// Enforces the natural unique keys at create time (phone number, sender+instance,
/// native message id) and fails with `Error::Conflict` on duplicates. The whole state can
/// be round-tripped through a JSON snapshot file.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    customers: HashMap<LocalId, Customer>,
    #[serde(default)]
    conversations: HashMap<LocalId, Conversation>,
    #[serde(default)]
    messages: HashMap<LocalId, ConversationMessage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`MemoryStore::save_snapshot`].
    ///
    /// A missing or empty file yields an empty store.
    pub async fn load_snapshot(path: &Path) -> Result<Self> {
        let txt = match tokio::fs::read_to_string(path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(Error::Io(e)),
        };
        if txt.trim().is_empty() {
            return Ok(Self::new());
        }
        let state: StoreState = serde_json::from_str(&txt)?;
        Ok(Self {
            state: Mutex::new(state),
        })
    }

    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let txt = {
            let state = self.state.lock().await;
            serde_json::to_string_pretty(&*state)?
        };
        tokio::fs::write(path, txt).await?;
        Ok(())
    }

    pub async fn customers(&self) -> Vec<Customer> {
        self.state.lock().await.customers.values().cloned().collect()
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state
            .lock()
            .await
            .conversations
            .values()
            .cloned()
            .collect()
    }

    pub async fn messages(&self) -> Vec<ConversationMessage> {
        self.state.lock().await.messages.values().cloned().collect()
    }
}

fn new_id() -> LocalId {
    LocalId(uuid::Uuid::new_v4().to_string())
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Customer>> {
        let state = self.state.lock().await;
        Ok(state
            .customers
            .values()
            .find(|c| c.phone_number == phone_number)
            .cloned())
    }

    async fn create(&self, new: NewCustomer) -> Result<Customer> {
        let mut state = self.state.lock().await;
        if state
            .customers
            .values()
            .any(|c| c.phone_number == new.phone_number)
        {
            return Err(Error::Conflict(format!(
                "customer with phone {}",
                new.phone_number
            )));
        }

        let customer = Customer {
            id: new_id(),
            phone_number: new.phone_number,
            name: new.name,
            integration_id: new.integration_id,
            remote_id: None,
        };
        state.customers.insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn save(&self, customer: &Customer) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(slot) = state.customers.get_mut(&customer.id) else {
            return Err(Error::Storage(format!("customer {} does not exist", customer.id)));
        };
        *slot = customer.clone();
        Ok(())
    }

    async fn delete(&self, id: &LocalId) -> Result<()> {
        self.state.lock().await.customers.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_open(
        &self,
        sender_id: &LocalId,
        instance: &InstanceId,
    ) -> Result<Option<Conversation>> {
        let state = self.state.lock().await;
        Ok(state
            .conversations
            .values()
            .find(|c| &c.sender_id == sender_id && &c.instance_id == instance)
            .cloned())
    }

    async fn create(&self, new: NewConversation) -> Result<Conversation> {
        let mut state = self.state.lock().await;
        if state
            .conversations
            .values()
            .any(|c| c.sender_id == new.sender_id && c.instance_id == new.instance_id)
        {
            return Err(Error::Conflict(format!(
                "conversation for sender {} on instance {}",
                new.sender_id, new.instance_id
            )));
        }

        let conversation = Conversation {
            id: new_id(),
            timestamp: new.timestamp,
            sender_id: new.sender_id,
            recipient_id: new.recipient_id,
            content: new.content,
            integration_id: new.integration_id,
            instance_id: new.instance_id,
            remote_id: None,
        };
        state
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(slot) = state.conversations.get_mut(&conversation.id) else {
            return Err(Error::Storage(format!(
                "conversation {} does not exist",
                conversation.id
            )));
        };
        *slot = conversation.clone();
        Ok(())
    }

    async fn delete(&self, id: &LocalId) -> Result<()> {
        self.state.lock().await.conversations.remove(id);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn find_by_mid(&self, mid: &NativeMessageId) -> Result<Option<ConversationMessage>> {
        let state = self.state.lock().await;
        Ok(state.messages.values().find(|m| &m.mid == mid).cloned())
    }

    async fn create(&self, new: NewConversationMessage) -> Result<ConversationMessage> {
        let mut state = self.state.lock().await;
        if state.messages.values().any(|m| m.mid == new.mid) {
            return Err(Error::Conflict(format!("message {}", new.mid)));
        }

        let message = ConversationMessage {
            id: new_id(),
            conversation_id: new.conversation_id,
            mid: new.mid,
            timestamp: new.timestamp,
            content: new.content,
            attachments: new.attachments,
        };
        state.messages.insert(message.id.clone(), message.clone());
        Ok(message)
    }

    async fn delete_by_mid(&self, mid: &NativeMessageId) -> Result<()> {
        self.state.lock().await.messages.retain(|_, m| &m.mid != mid);
        Ok(())
    }
}
