//! Chat session: the transcript and the request lifecycle around it.
//!
//! Each turn runs `Idle -> Sending -> Idle`. The user's message is appended
//! as soon as the turn begins; whatever comes back (answer, gateway error
//! text, or a fixed fallback line) is appended as the assistant's reply, so
//! every accepted submission adds exactly two entries.

use crate::error::SessionError;
use crate::preferences::PreferenceStore;
use providers::persona;
use providers::AiGateway;
use shared::agent_api::{ChatMessage, ChatReply};
use shared::preferences::UserPreferences;

/// Shown when the reply never arrived or came back empty.
pub const FALLBACK_REPLY: &str =
    "Oops! Something went wrong on my end and I lost my train of thought. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
}

/// Everything the gateway needs for the turn started by `begin_turn`.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub message: String,
    pub prior_turns: Vec<ChatMessage>,
    pub display_name: String,
}

pub struct SessionController {
    transcript: Vec<ChatMessage>,
    name: String,
    remember_me: bool,
    state: SessionState,
    store: PreferenceStore,
}

impl SessionController {
    /// Restore whatever was remembered and greet if there is no conversation yet.
    pub fn start(store: PreferenceStore) -> Self {
        let prefs = store.load().unwrap_or_default();
        let mut session = Self {
            transcript: prefs.last_chat,
            name: prefs.name,
            remember_me: prefs.remember_me,
            state: SessionState::Idle,
            store,
        };
        if session.transcript.is_empty() {
            let greeting = persona::greeting(&session.name);
            session.append(ChatMessage::assistant(greeting));
        }
        tracing::info!(
            turns = session.transcript.len(),
            remembered = session.remember_me,
            "chat session started"
        );
        session
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn remember_me(&self) -> bool {
        self.remember_me
    }

    pub fn set_name(&mut self, name: &str) {
        let name = name.trim();
        if self.name != name {
            self.name = name.to_string();
            self.persist();
        }
    }

    /// Turning this off forgets everything stored, immediately.
    pub fn set_remember_me(&mut self, remember: bool) {
        if self.remember_me == remember {
            return;
        }
        self.remember_me = remember;
        if remember {
            self.persist();
        } else if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "could not forget stored preferences");
        }
    }

    /// Start a new conversation. No greeting is added.
    pub fn clear_transcript(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Sending {
            return Err(SessionError::Busy);
        }
        self.transcript.clear();
        self.persist();
        Ok(())
    }

    /// Validate and append the user's message, entering `Sending`.
    pub fn begin_turn(&mut self, text: &str) -> Result<PendingTurn, SessionError> {
        let message = text.trim();
        if message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.state == SessionState::Sending {
            return Err(SessionError::Busy);
        }

        let pending = PendingTurn {
            message: message.to_string(),
            prior_turns: self.transcript.clone(),
            display_name: self.name.clone(),
        };
        self.append(ChatMessage::user(message));
        self.state = SessionState::Sending;
        Ok(pending)
    }

    /// Append the reply for the in-flight turn and return to `Idle`.
    ///
    /// `Err` means the request itself never completed (e.g. its task died).
    pub fn finish_turn(
        &mut self,
        outcome: anyhow::Result<ChatReply>,
    ) -> Result<&ChatMessage, SessionError> {
        if self.state != SessionState::Sending {
            return Err(SessionError::NotSending);
        }

        let text = match outcome {
            Ok(ChatReply {
                error: Some(error), ..
            }) => error,
            Ok(reply) if !reply.text.is_empty() => reply.text,
            Ok(_) => {
                tracing::warn!("chat reply had neither text nor error");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat request did not complete");
                FALLBACK_REPLY.to_string()
            }
        };
        self.append(ChatMessage::assistant(text));
        self.state = SessionState::Idle;
        Ok(&self.transcript[self.transcript.len() - 1])
    }

    /// Run a whole turn against the gateway.
    pub async fn submit(
        &mut self,
        gateway: &AiGateway,
        text: &str,
    ) -> Result<&ChatMessage, SessionError> {
        let pending = self.begin_turn(text)?;
        let reply = gateway
            .send_chat_turn(&pending.message, &pending.prior_turns, &pending.display_name)
            .await;
        self.finish_turn(Ok(reply))
    }

    fn append(&mut self, message: ChatMessage) {
        self.transcript.push(message);
        self.persist();
    }

    fn persist(&self) {
        if !self.remember_me {
            return;
        }
        let prefs = UserPreferences {
            name: self.name.clone(),
            remember_me: true,
            last_chat: self.transcript.clone(),
        };
        if let Err(e) = self.store.save(&prefs) {
            tracing::warn!(error = %e, "could not save preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use providers::error::ProviderError;
    use providers::gateway::{
        ChatRequest, CredentialReselector, GenerativeBackend, LogOnlyReselector, CHAT_FALLBACK,
    };
    use shared::agent_api::{Sender, StreamChunk};
    use shared::media::{AspectRatio, InlineImage};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedSender;

    /// Replies with a fixed text, or fails when `reply` is `None`.
    struct EchoBackend {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl GenerativeBackend for EchoBackend {
        async fn stream_chat(
            &self,
            _request: ChatRequest,
            tx: UnboundedSender<StreamChunk>,
        ) -> Result<(), ProviderError> {
            match self.reply {
                Some(text) => {
                    let _ = tx.send(StreamChunk::Text(text.to_string()));
                    let _ = tx.send(StreamChunk::Done);
                    Ok(())
                }
                None => Err(ProviderError::MissingCredential),
            }
        }

        async fn edit_image(
            &self,
            _image: &InlineImage,
            _prompt: &str,
        ) -> Result<Option<InlineImage>, ProviderError> {
            Ok(None)
        }

        async fn generate_image(
            &self,
            _prompt: &str,
            _aspect_ratio: AspectRatio,
        ) -> Result<Option<InlineImage>, ProviderError> {
            Ok(None)
        }
    }

    fn gateway(reply: Option<&'static str>) -> AiGateway {
        let reselector: Arc<dyn CredentialReselector> = Arc::new(LogOnlyReselector);
        AiGateway::new(Arc::new(EchoBackend { reply }), reselector)
    }

    fn remembered(dir: &TempDir, name: &str) -> PreferenceStore {
        let store = PreferenceStore::in_dir(dir.path());
        store
            .save(&UserPreferences {
                name: name.into(),
                remember_me: true,
                last_chat: vec![],
            })
            .unwrap();
        store
    }

    #[test]
    fn test_fresh_session_gets_one_default_greeting() {
        let dir = TempDir::new().unwrap();
        let session = SessionController::start(PreferenceStore::in_dir(dir.path()));
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].sender, Sender::Assistant);
        assert_eq!(session.transcript()[0].text, persona::DEFAULT_GREETING);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_greeting_uses_remembered_name() {
        let dir = TempDir::new().unwrap();
        let session = SessionController::start(remembered(&dir, "Ada"));
        assert_eq!(session.name(), "Ada");
        assert!(session.remember_me());
        assert!(session.transcript()[0].text.contains("Ada"));
    }

    #[test]
    fn test_restored_transcript_is_not_greeted_again() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path());
        let earlier = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        store
            .save(&UserPreferences {
                name: String::new(),
                remember_me: true,
                last_chat: earlier.clone(),
            })
            .unwrap();

        let session = SessionController::start(store);
        assert_eq!(session.transcript(), earlier.as_slice());
    }

    #[tokio::test]
    async fn test_each_submission_adds_two_turns() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(PreferenceStore::in_dir(dir.path()));
        let ok = gateway(Some("Sure thing!"));
        let failing = gateway(None);

        let mut expected = session.transcript().len();
        for (gw, text) in [(&ok, "one"), (&failing, "two"), (&ok, "three")] {
            session.submit(gw, text).await.unwrap();
            expected += 2;
            assert_eq!(session.transcript().len(), expected);
            assert_eq!(session.state(), SessionState::Idle);
        }

        let t = session.transcript();
        assert_eq!(t[1].sender, Sender::User);
        assert_eq!(t[2].text, "Sure thing!");
        assert_eq!(t[3].text, "two");
        assert_ne!(t[4].text, CHAT_FALLBACK);
        assert!(t[4].text.contains("API key"));
    }

    #[tokio::test]
    async fn test_empty_submission_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(PreferenceStore::in_dir(dir.path()));
        let err = session.submit(&gateway(Some("x")), "   ").await.unwrap_err();
        assert_eq!(err, SessionError::EmptyMessage);
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn test_second_submission_while_sending_is_busy() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(PreferenceStore::in_dir(dir.path()));

        let pending = session.begin_turn("first").unwrap();
        assert_eq!(pending.prior_turns.len(), 1);
        assert_eq!(session.state(), SessionState::Sending);
        assert_eq!(session.begin_turn("second").unwrap_err(), SessionError::Busy);
        assert_eq!(session.clear_transcript(), Err(SessionError::Busy));

        session.finish_turn(Ok(ChatReply::text("done"))).unwrap();
        assert_eq!(session.transcript().len(), 3);
        assert!(session.begin_turn("second").is_ok());
    }

    #[test]
    fn test_failed_request_appends_fallback_line() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(PreferenceStore::in_dir(dir.path()));

        session.begin_turn("hello?").unwrap();
        let reply = session
            .finish_turn(Err(anyhow::anyhow!("task panicked")))
            .unwrap();
        assert_eq!(reply.text, FALLBACK_REPLY);

        session.begin_turn("again?").unwrap();
        let reply = session.finish_turn(Ok(ChatReply::default())).unwrap();
        assert_eq!(reply.text, FALLBACK_REPLY);
    }

    #[test]
    fn test_finish_without_begin_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(PreferenceStore::in_dir(dir.path()));
        assert_eq!(
            session.finish_turn(Ok(ChatReply::text("stray"))).unwrap_err(),
            SessionError::NotSending
        );
    }

    #[tokio::test]
    async fn test_remembered_transcript_is_saved_on_every_turn() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(remembered(&dir, "Ada"));
        session.submit(&gateway(Some("hi Ada")), "hello").await.unwrap();

        let stored = PreferenceStore::in_dir(dir.path()).load().unwrap();
        assert_eq!(stored.last_chat, session.transcript());
        assert_eq!(stored.name, "Ada");
    }

    #[test]
    fn test_nothing_is_stored_without_remember_me() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(PreferenceStore::in_dir(dir.path()));
        session.set_name("Grace");
        session.begin_turn("hi").unwrap();
        assert!(PreferenceStore::in_dir(dir.path()).load().is_none());
    }

    #[test]
    fn test_turning_remember_me_off_forgets_immediately() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(remembered(&dir, "Ada"));
        assert!(PreferenceStore::in_dir(dir.path()).path().exists());

        session.set_remember_me(false);
        assert!(!PreferenceStore::in_dir(dir.path()).path().exists());

        session.set_remember_me(true);
        let stored = PreferenceStore::in_dir(dir.path()).load().unwrap();
        assert_eq!(stored.last_chat.len(), session.transcript().len());
    }

    #[test]
    fn test_name_change_is_persisted() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(remembered(&dir, "Ada"));
        session.set_name("  Grace ");
        assert_eq!(session.name(), "Grace");
        let stored = PreferenceStore::in_dir(dir.path()).load().unwrap();
        assert_eq!(stored.name, "Grace");
    }

    #[test]
    fn test_clear_transcript_does_not_regreet() {
        let dir = TempDir::new().unwrap();
        let mut session = SessionController::start(PreferenceStore::in_dir(dir.path()));
        session.clear_transcript().unwrap();
        assert!(session.transcript().is_empty());
    }
}
