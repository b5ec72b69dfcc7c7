//! Hexagonal ports for everything the reconciler does not own.
//!
//! Storage, integration lookup and the remote RPC bridge are injected as `Arc<dyn _>`;
//! `store::MemoryStore`, `integrations::IntegrationRegistry` and the `crmsync-rpc` crate
//! provide the stock implementations.

use async_trait::async_trait;

use crate::{
    domain::{ChannelKind, InstanceId, LocalId, NativeMessageId},
    records::{
        Conversation, ConversationMessage, Customer, Integration, NewConversation,
        NewConversationMessage, NewCustomer,
    },
    rpc::{RpcRequest, RpcResponse},
    Result,
};

/// Resolves the CRM integration configured for a channel instance.
#[async_trait]
pub trait IntegrationLookup: Send + Sync {
    /// Fails with `Error::NotFound` when no integration matches.
    async fn find_integration(&self, instance: &InstanceId, kind: &ChannelKind)
        -> Result<Integration>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Customer>>;
    async fn create(&self, new: NewCustomer) -> Result<Customer>;
    async fn save(&self, customer: &Customer) -> Result<()>;
    async fn delete(&self, id: &LocalId) -> Result<()>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The (single) conversation for a sender on an instance.
    async fn find_open(
        &self,
        sender_id: &LocalId,
        instance: &InstanceId,
    ) -> Result<Option<Conversation>>;
    async fn create(&self, new: NewConversation) -> Result<Conversation>;
    async fn save(&self, conversation: &Conversation) -> Result<()>;
    async fn delete(&self, id: &LocalId) -> Result<()>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn find_by_mid(&self, mid: &NativeMessageId) -> Result<Option<ConversationMessage>>;
    async fn create(&self, new: NewConversationMessage) -> Result<ConversationMessage>;
    async fn delete_by_mid(&self, mid: &NativeMessageId) -> Result<()>;
}

/// Request/response bridge to the remote CRM API.
#[async_trait]
pub trait RpcBridge: Send + Sync {
    async fn call(&self, req: RpcRequest) -> Result<RpcResponse>;
}
