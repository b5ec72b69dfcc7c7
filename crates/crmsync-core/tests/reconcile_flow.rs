//! End-to-end reconciliation scenarios against the in-memory store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crmsync_core::{
    domain::{ChannelKind, InstanceId, LocalId, RemoteId},
    inbound::InboundEvent,
    integrations::IntegrationRegistry,
    pipeline::{InboundHandler, InboundOutcome},
    ports::RpcBridge,
    reconciler::{BatchPolicy, ReconcileOptions, Reconciler, ReconcilerDeps},
    records::Integration,
    rpc::{RpcAction, RpcRequest, RpcResponse},
    store::MemoryStore,
    Error, Result,
};

#[derive(Default)]
struct RecordingRpc {
    calls: Mutex<Vec<RpcRequest>>,
    fail_customer: Mutex<bool>,
}

impl RecordingRpc {
    fn calls(&self) -> Vec<RpcRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RpcBridge for RecordingRpc {
    async fn call(&self, req: RpcRequest) -> Result<RpcResponse> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(req.clone());
            calls.len()
        };
        if req.action == RpcAction::GetCreateUpdateCustomer && *self.fail_customer.lock().unwrap() {
            return Err(Error::remote(req.action.as_str(), "timeout"));
        }
        Ok(RpcResponse::new(json!({ "_id": format!("remote-{n}") })))
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    rpc: Arc<RecordingRpc>,
    reconciler: Arc<Reconciler>,
}

fn harness(policy: BatchPolicy) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let rpc = Arc::new(RecordingRpc::default());
    let integrations = IntegrationRegistry::new(vec![Integration {
        id: LocalId::from("int1"),
        kind: ChannelKind::whatsapp(),
        instance_id: InstanceId::from("inst1"),
        remote_id: RemoteId::from("api-int-1"),
    }]);
    let reconciler = Arc::new(Reconciler::new(
        ReconcilerDeps {
            integrations: Arc::new(integrations),
            customers: store.clone(),
            conversations: store.clone(),
            messages: store.clone(),
            rpc: rpc.clone(),
        },
        ReconcileOptions {
            batch_policy: policy,
            ..ReconcileOptions::default()
        },
    ));
    Harness {
        store,
        rpc,
        reconciler,
    }
}

#[tokio::test]
async fn ana_is_created_once_and_then_reused() {
    let h = harness(BatchPolicy::Truncating);
    let inst = InstanceId::from("inst1");

    let first = h
        .reconciler
        .resolve_customer("+1555", "Ana", &inst)
        .await
        .unwrap();
    assert_eq!(first.remote_id, Some(RemoteId::from("remote-1")));
    assert_eq!(first.integration_id, LocalId::from("int1"));
    assert_eq!(h.rpc.calls().len(), 1);

    let second = h
        .reconciler
        .resolve_customer("+1555", "Ana", &inst)
        .await
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(h.rpc.calls().len(), 1);
}

#[tokio::test]
async fn failed_customer_registration_leaves_storage_clean() {
    let h = harness(BatchPolicy::Truncating);
    *h.rpc.fail_customer.lock().unwrap() = true;

    let err = h
        .reconciler
        .resolve_customer("+1555", "Ana", &InstanceId::from("inst1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RemoteSync { .. }));
    assert!(h.store.customers().await.is_empty());
}

#[tokio::test]
async fn webhook_events_flow_through_to_remote_calls() {
    let h = harness(BatchPolicy::Truncating);
    let handler = InboundHandler::new(h.reconciler.clone());

    let ev = InboundEvent::parse(
        r#"{"instanceId":"inst1","messages":[
            {"id":"A1","body":"https://cdn/voice.ogg","type":"ptt","fromMe":false,
             "chatId":"1555@c.us","senderName":"Ana"}
        ]}"#,
    )
    .unwrap();

    let out = handler.handle(&ev).await.unwrap();
    assert!(matches!(out, InboundOutcome::Reconciled { .. }));

    let actions: Vec<_> = h.rpc.calls().iter().map(|c| c.action).collect();
    assert_eq!(
        actions,
        vec![
            RpcAction::GetCreateUpdateCustomer,
            RpcAction::CreateOrUpdateConversation,
            RpcAction::CreateConversationMessage,
        ]
    );

    let msg = h.rpc.calls()[2].payload_json().unwrap();
    assert_eq!(
        msg,
        json!({
            "content": "",
            "attachments": [{"type": "ptt", "url": "https://cdn/voice.ogg"}],
            "conversationId": "remote-2",
            "customerId": "remote-1"
        })
    );

    // Redelivery of the same webhook is a no-op.
    handler.handle(&ev).await.unwrap();
    assert_eq!(h.rpc.calls().len(), 3);
    assert_eq!(h.store.messages().await.len(), 1);
}

#[tokio::test]
async fn self_sent_lead_message_drops_the_batch_before_any_write() {
    let h = harness(BatchPolicy::Truncating);
    let handler = InboundHandler::new(h.reconciler.clone());

    let ev = InboundEvent::parse(
        r#"{"instanceId":"inst1","messages":[
            {"id":"A1","body":"ours","fromMe":true,"chatId":"1555@c.us","senderName":"Ana"},
            {"id":"A2","body":"theirs","chatId":"1555@c.us","senderName":"Ana"}
        ]}"#,
    )
    .unwrap();

    assert_eq!(handler.handle(&ev).await.unwrap(), InboundOutcome::Ignored);
    assert!(h.store.customers().await.is_empty());
    assert!(h.store.conversations().await.is_empty());
    assert!(h.rpc.calls().is_empty());
}

#[tokio::test]
async fn whole_batch_policy_keeps_going_past_self_sent_messages() {
    let h = harness(BatchPolicy::WholeBatch);
    let handler = InboundHandler::new(h.reconciler.clone());

    let ev = InboundEvent::parse(
        r#"{"instanceId":"inst1","messages":[
            {"id":"A1","body":"ours","fromMe":true,"chatId":"1555@c.us","senderName":"Ana"},
            {"id":"A2","body":"one","chatId":"1555@c.us","senderName":"Ana"},
            {"id":"A3","body":"two","chatId":"1555@c.us","senderName":"Ana"},
            {"id":"A4","body":"three","chatId":"1555@c.us","senderName":"Ana"}
        ]}"#,
    )
    .unwrap();

    handler.handle(&ev).await.unwrap();
    assert_eq!(h.store.messages().await.len(), 3);
    assert_eq!(h.store.conversations().await.len(), 1);
}
