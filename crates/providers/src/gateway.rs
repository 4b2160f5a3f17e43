//! AI Gateway: the one place that talks to the generative service.
//!
//! Every operation returns a result value. Remote failures are logged with
//! full detail and surfaced to callers only as short user-facing messages.

use crate::error::ProviderError;
use crate::persona;
use async_trait::async_trait;
use shared::agent_api::{ChatMessage, ChatReply, ImageReply, Sender, StreamChunk};
use shared::media::{AspectRatio, InlineImage};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};

/// Returned when the service rejects the key; callers branch on it.
pub const API_KEY_ERROR: &str =
    "There's a problem with your API key. Please select a valid API key and try again.";
pub const CHAT_FALLBACK: &str =
    "Sorry, I'm having a little trouble connecting right now. Please try again in a moment.";
pub const IMAGE_EDIT_FAILED: &str =
    "Something went wrong while editing your image. Please try again.";
pub const IMAGE_GENERATION_FAILED: &str =
    "Something went wrong while generating your image. Please try again.";
pub const NO_IMAGE_RETURNED: &str = "The model didn't return an image. Try a different prompt.";
pub const EMPTY_PROMPT: &str = "Please enter a prompt first.";

/// Conversation role as the remote service understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// Fully shaped chat request handed to a backend.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub history: Vec<ChatTurn>,
    pub message: String,
}

/// Remote capability behind the gateway.
///
/// Contract for `stream_chat`: a failure before any fragment is produced is
/// returned as `Err`. Once streaming starts, failures are sent as
/// `StreamChunk::Error` and the call returns `Ok(())`.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<(), ProviderError>;

    async fn edit_image(
        &self,
        image: &InlineImage,
        prompt: &str,
    ) -> Result<Option<InlineImage>, ProviderError>;

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<InlineImage>, ProviderError>;
}

/// Host interaction that lets the user pick another API key.
#[async_trait]
pub trait CredentialReselector: Send + Sync {
    async fn request_reselection(&self) -> anyhow::Result<()>;
}

/// Reselector for hosts without any key picker.
pub struct LogOnlyReselector;

#[async_trait]
impl CredentialReselector for LogOnlyReselector {
    async fn request_reselection(&self) -> anyhow::Result<()> {
        tracing::warn!("API key rejected and no key picker is available");
        Ok(())
    }
}

pub struct AiGateway {
    backend: Arc<dyn GenerativeBackend>,
    reselector: Arc<dyn CredentialReselector>,
    system_instruction: String,
}

impl AiGateway {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        reselector: Arc<dyn CredentialReselector>,
    ) -> Self {
        Self {
            backend,
            reselector,
            system_instruction: persona::SYSTEM_INSTRUCTION.to_string(),
        }
    }

    /// Send one chat turn and collect the streamed answer into a single string.
    pub async fn send_chat_turn(
        &self,
        message: &str,
        prior_turns: &[ChatMessage],
        display_name: &str,
    ) -> ChatReply {
        let request = ChatRequest {
            system_instruction: self.system_instruction.clone(),
            history: to_history(prior_turns),
            message: outgoing_message(message, display_name),
        };
        tracing::debug!(history = request.history.len(), "sending chat turn");

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Err(e) = self.backend.stream_chat(request, tx).await {
            return ChatReply::error(self.reconcile(e, CHAT_FALLBACK, "chat").await);
        }

        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            match chunk {
                StreamChunk::Text(fragment) => text.push_str(&fragment),
                StreamChunk::Done => break,
                StreamChunk::Error(detail) => {
                    tracing::warn!(%detail, "chat stream failed midway");
                    return ChatReply::error(CHAT_FALLBACK);
                }
            }
        }
        ChatReply::text(text)
    }

    pub async fn edit_image(&self, image: &InlineImage, prompt: &str) -> ImageReply {
        match self.backend.edit_image(image, prompt.trim()).await {
            Ok(Some(edited)) => ImageReply::image(edited.to_data_uri()),
            Ok(None) => {
                tracing::warn!("image edit response carried no image part");
                ImageReply::error(NO_IMAGE_RETURNED)
            }
            Err(e) => ImageReply::error(self.reconcile(e, IMAGE_EDIT_FAILED, "image edit").await),
        }
    }

    pub async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> ImageReply {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return ImageReply::error(EMPTY_PROMPT);
        }
        match self.backend.generate_image(prompt, aspect_ratio).await {
            Ok(Some(image)) => ImageReply::image(image.to_data_uri()),
            Ok(None) => {
                tracing::warn!("image generation response carried no image bytes");
                ImageReply::error(NO_IMAGE_RETURNED)
            }
            Err(e) => ImageReply::error(
                self.reconcile(e, IMAGE_GENERATION_FAILED, "image generation")
                    .await,
            ),
        }
    }

    /// Log the failure and pick the message the user gets to see.
    async fn reconcile(&self, err: ProviderError, generic: &str, operation: &str) -> String {
        if err.is_credential_problem() {
            tracing::warn!(error = %err, operation, "credential rejected, asking host to reselect");
            if let Err(e) = self.reselector.request_reselection().await {
                tracing::warn!(error = %e, "credential reselection failed");
            }
            return API_KEY_ERROR.to_string();
        }
        tracing::warn!(error = %err, operation, "remote call failed");
        generic.to_string()
    }
}

/// Map transcript turns onto remote roles.
///
/// Leading assistant turns (the local greeting) are skipped so the remote
/// conversation always opens with the user.
pub fn to_history(prior_turns: &[ChatMessage]) -> Vec<ChatTurn> {
    prior_turns
        .iter()
        .skip_while(|m| m.sender == Sender::Assistant)
        .map(|m| ChatTurn {
            role: match m.sender {
                Sender::User => Role::User,
                Sender::Assistant => Role::Model,
            },
            text: m.text.clone(),
        })
        .collect()
}

/// Prefix the message with the user's name as a hint to the model.
pub fn outgoing_message(message: &str, display_name: &str) -> String {
    let name = display_name.trim();
    if name.is_empty() {
        message.to_string()
    } else {
        format!("{} says: {}", name, message)
    }
}
