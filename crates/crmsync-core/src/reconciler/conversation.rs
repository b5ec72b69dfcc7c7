use chrono::Utc;
use tracing::{debug, error, info};

use super::{compensate, BatchPolicy, Reconciler};
use crate::{
    domain::{CustomerRef, InstanceId, IntegrationRef},
    inbound::InboundMessage,
    records::{Conversation, ConversationMessage, NewConversation},
    rpc::{ConversationPayload, RpcAction, RpcRequest},
    Result,
};

/// What `resolve_conversation` did with a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationOutcome {
    /// The conversation for (customer, instance), if one exists by now.
    pub conversation: Option<Conversation>,
    /// Messages recorded during this call (including already-known ones that were deduped).
    pub messages: Vec<ConversationMessage>,
    /// The batch hit an absent or self-sent message and the remainder was dropped.
    pub abandoned: bool,
}

impl Reconciler {
    /// Record an inbound batch against the conversation for (`customer`, `instance`),
    /// creating and registering the conversation on first contact.
    pub async fn resolve_conversation(
        &self,
        messages: &[Option<InboundMessage>],
        instance: &InstanceId,
        customer: &CustomerRef,
        integration: &IntegrationRef,
    ) -> Result<ConversationOutcome> {
        let _guard = self
            .lock_key(format!("conversation:{}:{instance}", customer.id))
            .await;
        let policy = self.opts.batch_policy;

        let mut out = ConversationOutcome {
            conversation: self
                .deps
                .conversations
                .find_open(&customer.id, instance)
                .await?,
            ..ConversationOutcome::default()
        };

        for (idx, slot) in messages.iter().enumerate() {
            let Some(message) = slot.as_ref().filter(|m| !m.from_me) else {
                if policy == BatchPolicy::Truncating {
                    info!(
                        instance_id = %instance,
                        skipped = messages.len() - idx,
                        "absent or self-sent message; abandoning batch"
                    );
                    out.abandoned = true;
                    return Ok(out);
                }
                debug!(instance_id = %instance, index = idx, "skipping absent or self-sent message");
                continue;
            };

            if let Some(conversation) = &out.conversation {
                let stored = self
                    .resolve_message(message, &conversation.to_ref(customer))
                    .await?;
                out.messages.push(stored);
                if policy == BatchPolicy::Truncating {
                    return Ok(out);
                }
                continue;
            }

            let conversation = self
                .create_conversation(message, instance, customer, integration)
                .await?;
            let stored = self
                .resolve_message(message, &conversation.to_ref(customer))
                .await?;
            out.conversation = Some(conversation);
            out.messages.push(stored);
        }

        Ok(out)
    }

    async fn create_conversation(
        &self,
        message: &InboundMessage,
        instance: &InstanceId,
        customer: &CustomerRef,
        integration: &IntegrationRef,
    ) -> Result<Conversation> {
        let mut conversation = self
            .deps
            .conversations
            .create(NewConversation {
                timestamp: Utc::now(),
                sender_id: customer.id.clone(),
                recipient_id: message.chat_id.clone(),
                content: message.body.clone(),
                integration_id: integration.id.clone(),
                instance_id: instance.clone(),
            })
            .await?;
        debug!(conversation_id = %conversation.id, instance_id = %instance, "created local conversation");

        let linked = async {
            let req = RpcRequest::new(
                RpcAction::CreateOrUpdateConversation,
                &ConversationPayload {
                    customer_id: customer.remote_id.as_ref(),
                    integration_id: &integration.remote_id,
                    content: &message.body,
                },
            )?;
            conversation.remote_id = Some(self.call_for_id(req).await?);
            self.deps.conversations.save(&conversation).await
        }
        .await;

        if let Err(e) = linked {
            error!(
                conversation_id = %conversation.id,
                error = %e,
                "error occurred while trying to create or update conversation"
            );
            compensate(
                "conversation",
                conversation.id.as_str(),
                &e,
                self.deps.conversations.delete(&conversation.id),
            )
            .await;
            return Err(e);
        }

        info!(
            conversation_id = %conversation.id,
            remote_id = ?conversation.remote_id,
            instance_id = %instance,
            "conversation linked"
        );
        Ok(conversation)
    }
}
