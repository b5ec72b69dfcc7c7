//! Idempotent find-or-create reconciliation of customers, conversations and messages.
//!
//! Every entity follows the same lifecycle:
//!
//! ```text
//! absent ──create──▶ local-only ──remote ok──▶ linked
//!                        │
//!                        └──remote failed──▶ deleted (error propagated)
//! ```
//!
//! There are no retries: a failed remote call is terminal for the invocation, and the
//! compensating delete runs before the error reaches the caller.

mod conversation;
mod customer;
mod locks;
mod message;

use std::{future::Future, str::FromStr, sync::Arc};

use tokio::sync::OwnedMutexGuard;
use tracing::{error, warn};

pub use conversation::ConversationOutcome;
pub use locks::KeyedLocks;
pub use message::derive_remote_content;

use crate::{
    domain::{ChannelKind, RemoteId},
    errors::Error,
    ports::{ConversationStore, CustomerStore, IntegrationLookup, MessageStore, RpcBridge},
    rpc::{RpcRequest, RpcResponse},
    Result,
};

/// How much of an inbound batch `resolve_conversation` processes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Historical webhook behavior: an absent or self-sent message abandons the rest of the
    /// batch, and recording a message against an already-known conversation ends the batch.
    /// In practice at most one message (two when the conversation is new) is recorded.
    #[default]
    Truncating,
    /// Record every message in order, skipping absent and self-sent ones.
    WholeBatch,
}

impl FromStr for BatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "truncating" => Ok(BatchPolicy::Truncating),
            "whole-batch" | "whole_batch" => Ok(BatchPolicy::WholeBatch),
            other => Err(Error::Config(format!("unknown batch policy: {other}"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReconcileOptions {
    pub channel_kind: ChannelKind,
    pub batch_policy: BatchPolicy,
    /// Hold a per-key lock across each lookup → create → link sequence.
    pub serialize_by_key: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            channel_kind: ChannelKind::whatsapp(),
            batch_policy: BatchPolicy::default(),
            serialize_by_key: true,
        }
    }
}

/// Collaborators the reconciler talks to.
#[derive(Clone)]
pub struct ReconcilerDeps {
    pub integrations: Arc<dyn IntegrationLookup>,
    pub customers: Arc<dyn CustomerStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub rpc: Arc<dyn RpcBridge>,
}

pub struct Reconciler {
    deps: ReconcilerDeps,
    opts: ReconcileOptions,
    locks: KeyedLocks,
}

impl Reconciler {
    pub fn new(deps: ReconcilerDeps, opts: ReconcileOptions) -> Self {
        Self {
            deps,
            opts,
            locks: KeyedLocks::default(),
        }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.opts
    }

    pub fn deps(&self) -> &ReconcilerDeps {
        &self.deps
    }

    async fn lock_key(&self, key: String) -> Option<OwnedMutexGuard<()>> {
        if !self.opts.serialize_by_key {
            return None;
        }
        Some(self.locks.lock(key).await)
    }

    async fn call(&self, req: RpcRequest) -> Result<RpcResponse> {
        self.deps.rpc.call(req).await
    }

    /// Call an action whose response must carry the new record's `_id`.
    async fn call_for_id(&self, req: RpcRequest) -> Result<RemoteId> {
        let action = req.action;
        self.call(req).await?.require_remote_id(action)
    }
}

/// Run the compensating delete for a record whose remote sync failed.
///
/// A failing delete is logged and swallowed: the caller must see the remote error.
async fn compensate<F>(entity: &'static str, key: &str, cause: &Error, delete: F)
where
    F: Future<Output = Result<()>>,
{
    match delete.await {
        Ok(()) => warn!(entity, key, error = %cause, "remote sync failed; local record removed"),
        Err(e) => error!(
            entity,
            key,
            error = %cause,
            delete_error = %e,
            "remote sync failed and compensating delete failed; local record may be orphaned"
        ),
    }
}

#[cfg(test)]
pub(crate) mod testing;
