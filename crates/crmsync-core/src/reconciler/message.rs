use chrono::Utc;
use tracing::{debug, info};

use super::{compensate, Reconciler};
use crate::{
    domain::ConversationRef,
    errors::Error,
    inbound::InboundMessage,
    records::{Attachment, ConversationMessage, NewConversationMessage},
    rpc::{MessagePayload, RpcAction, RpcRequest, REPLACE_CONTENT},
    Result,
};

/// Content and attachments to send upstream for an inbound message.
///
/// Applied in a fixed order: a non-text message becomes a single attachment of its type
/// (the body is its url) with empty content; then a caption replaces the content; then a
/// quoted body replaces it again.
pub fn derive_remote_content(message: &InboundMessage) -> (String, Vec<Attachment>) {
    let mut content = message.body.clone();
    let mut attachments = Vec::new();

    if !message.is_text() {
        attachments.push(Attachment {
            kind: message.kind.clone(),
            url: message.body.clone(),
        });
        content.clear();
    }
    if let Some(caption) = message.caption.as_deref().filter(|s| !s.is_empty()) {
        content = caption.to_string();
    }
    if let Some(quoted) = message.quoted_msg_body.as_deref().filter(|s| !s.is_empty()) {
        content = quoted.to_string();
    }

    (content, attachments)
}

impl Reconciler {
    /// Store `message` under `conversation` once per native message id and sync it upstream.
    ///
    /// Remote failures are wrapped in `Error::MessageSync` after the local copy is removed.
    pub async fn resolve_message(
        &self,
        message: &InboundMessage,
        conversation: &ConversationRef,
    ) -> Result<ConversationMessage> {
        let _guard = self.lock_key(format!("message:{}", message.id)).await;

        if let Some(existing) = self.deps.messages.find_by_mid(&message.id).await? {
            debug!(mid = %message.id, "message already recorded");
            return Ok(existing);
        }

        let (content, attachments) = derive_remote_content(message);

        let stored = self
            .deps
            .messages
            .create(NewConversationMessage {
                conversation_id: conversation.id.clone(),
                mid: message.id.clone(),
                timestamp: Utc::now(),
                content: message.body.clone(),
                attachments: attachments.clone(),
            })
            .await?;

        let synced = async {
            let req = RpcRequest::new(
                RpcAction::CreateConversationMessage,
                &MessagePayload {
                    content: &content,
                    attachments: &attachments,
                    conversation_id: conversation.remote_id.as_ref(),
                    customer_id: conversation.customer_remote_id.as_ref(),
                },
            )?
            .with_meta_info(REPLACE_CONTENT);
            self.call(req).await.map(|_| ())
        }
        .await;

        if let Err(e) = synced {
            compensate(
                "message",
                message.id.as_str(),
                &e,
                self.deps.messages.delete_by_mid(&message.id),
            )
            .await;
            return Err(Error::MessageSync {
                mid: message.id.to_string(),
                source: Box::new(e),
            });
        }

        info!(
            mid = %message.id,
            conversation_id = %conversation.id,
            attachments = attachments.len(),
            "message recorded"
        );
        Ok(stored)
    }
}
