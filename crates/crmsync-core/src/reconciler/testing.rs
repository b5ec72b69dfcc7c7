//! Fakes shared by the reconciler unit tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::json;

use super::{ReconcileOptions, Reconciler, ReconcilerDeps};
use crate::{
    domain::{ChannelKind, InstanceId, LocalId, NativeMessageId, RemoteId},
    errors::Error,
    inbound::{InboundMessage, TEXT_MESSAGE_TYPE},
    integrations::IntegrationRegistry,
    ports::{CustomerStore, RpcBridge},
    records::{Customer, Integration, NewCustomer},
    rpc::{RpcAction, RpcRequest, RpcResponse},
    store::MemoryStore,
    Result,
};

#[derive(Default)]
pub(crate) struct FakeRpc {
    calls: Mutex<Vec<RpcRequest>>,
    failing: Mutex<HashSet<RpcAction>>,
    without_id: Mutex<HashSet<RpcAction>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeRpc {
    pub(crate) fn fail(&self, action: RpcAction) {
        self.failing.lock().unwrap().insert(action);
    }

    pub(crate) fn heal(&self, action: RpcAction) {
        self.failing.lock().unwrap().remove(&action);
    }

    pub(crate) fn omit_id(&self, action: RpcAction) {
        self.without_id.lock().unwrap().insert(action);
    }

    pub(crate) fn set_delay(&self, d: Duration) {
        *self.delay.lock().unwrap() = Some(d);
    }

    pub(crate) fn calls(&self) -> Vec<RpcRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, action: RpcAction) -> Vec<RpcRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.action == action)
            .collect()
    }
}

#[async_trait]
impl RpcBridge for FakeRpc {
    async fn call(&self, req: RpcRequest) -> Result<RpcResponse> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(req.clone());
            calls.len()
        };

        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        if self.failing.lock().unwrap().contains(&req.action) {
            return Err(Error::remote(req.action.as_str(), "broker unavailable"));
        }
        if self.without_id.lock().unwrap().contains(&req.action) {
            return Ok(RpcResponse::new(json!({ "status": "ok" })));
        }
        Ok(RpcResponse::new(
            json!({ "_id": format!("api-{}-{n}", req.action.as_str()) }),
        ))
    }
}

/// Customer store whose deletes always fail.
pub(crate) struct UndeletableCustomers {
    pub(crate) inner: Arc<MemoryStore>,
}

#[async_trait]
impl CustomerStore for UndeletableCustomers {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Customer>> {
        self.inner.find_by_phone(phone_number).await
    }

    async fn create(&self, new: NewCustomer) -> Result<Customer> {
        CustomerStore::create(self.inner.as_ref(), new).await
    }

    async fn save(&self, customer: &Customer) -> Result<()> {
        CustomerStore::save(self.inner.as_ref(), customer).await
    }

    async fn delete(&self, _id: &LocalId) -> Result<()> {
        Err(Error::Storage("delete refused".to_string()))
    }
}

pub(crate) struct Fixture {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) rpc: Arc<FakeRpc>,
    pub(crate) reconciler: Arc<Reconciler>,
}

pub(crate) fn integration() -> Integration {
    Integration {
        id: LocalId::from("int1"),
        kind: ChannelKind::whatsapp(),
        instance_id: InstanceId::from("inst1"),
        remote_id: RemoteId::from("api-int-1"),
    }
}

pub(crate) fn fixture(opts: ReconcileOptions) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let rpc = Arc::new(FakeRpc::default());
    let deps = ReconcilerDeps {
        integrations: Arc::new(IntegrationRegistry::new(vec![integration()])),
        customers: store.clone(),
        conversations: store.clone(),
        messages: store.clone(),
        rpc: rpc.clone(),
    };
    Fixture {
        store,
        rpc,
        reconciler: Arc::new(Reconciler::new(deps, opts)),
    }
}

pub(crate) fn text(id: &str, body: &str) -> InboundMessage {
    InboundMessage {
        id: NativeMessageId::from(id),
        body: body.to_string(),
        from_me: false,
        chat_id: "1555@c.us".to_string(),
        sender_name: "Ana".to_string(),
        kind: TEXT_MESSAGE_TYPE.to_string(),
        caption: None,
        quoted_msg_body: None,
    }
}
