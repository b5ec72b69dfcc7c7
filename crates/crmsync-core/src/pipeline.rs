//! Drives one inbound webhook event through the reconciler.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    inbound::InboundEvent,
    reconciler::{BatchPolicy, ConversationOutcome, Reconciler},
    records::Customer,
    Result,
};

/// Result of handling one inbound event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundOutcome {
    /// The event had no usable inbound message (empty batch, only `null`/self-sent
    /// messages where the policy allows none, or no phone number).
    Ignored,
    Reconciled {
        customer: Customer,
        conversation: ConversationOutcome,
    },
}

#[derive(Clone)]
pub struct InboundHandler {
    reconciler: Arc<Reconciler>,
}

impl InboundHandler {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self { reconciler }
    }

    /// Integration lookup → customer → conversation (and its messages).
    ///
    /// The customer is the remote party of the first message that is present and not
    /// self-sent. Under `BatchPolicy::Truncating` a batch that does not *start* with such a
    /// message would be abandoned by the conversation resolver anyway, so it is ignored
    /// before anything is written.
    pub async fn handle(&self, event: &InboundEvent) -> Result<InboundOutcome> {
        let policy = self.reconciler.options().batch_policy;
        let mut inbound = event.messages.iter().map(|slot| slot.as_ref().filter(|m| !m.from_me));
        let lead = match policy {
            BatchPolicy::Truncating => inbound.next().flatten(),
            BatchPolicy::WholeBatch => inbound.flatten().next(),
        };

        let Some(lead) = lead else {
            debug!(
                instance_id = %event.instance_id,
                batch_policy = ?policy,
                "event has no usable inbound message"
            );
            return Ok(InboundOutcome::Ignored);
        };
        let Some(phone_number) = lead.sender_phone() else {
            debug!(instance_id = %event.instance_id, mid = %lead.id, "message has no chat id");
            return Ok(InboundOutcome::Ignored);
        };

        let integration = self
            .reconciler
            .deps()
            .integrations
            .find_integration(&event.instance_id, &self.reconciler.options().channel_kind)
            .await?;

        let customer = self
            .reconciler
            .resolve_customer_for(&integration, phone_number, &lead.sender_name)
            .await?;

        let conversation = self
            .reconciler
            .resolve_conversation(
                &event.messages,
                &event.instance_id,
                &customer.to_ref(),
                &integration.to_ref(),
            )
            .await?;

        info!(
            instance_id = %event.instance_id,
            customer_id = %customer.id,
            recorded = conversation.messages.len(),
            abandoned = conversation.abandoned,
            "inbound event reconciled"
        );
        Ok(InboundOutcome::Reconciled {
            customer,
            conversation,
        })
    }
}
