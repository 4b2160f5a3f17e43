pub mod media;
pub mod preferences;

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_api_base() -> String {
        "https://generativelanguage.googleapis.com/v1beta".into()
    }

    fn default_chat_model() -> String {
        "gemini-2.5-flash".into()
    }

    fn default_image_edit_model() -> String {
        "gemini-2.5-flash-image-preview".into()
    }

    fn default_image_model() -> String {
        "imagen-4.0-generate-001".into()
    }

    fn default_timeout_secs() -> u64 {
        120
    }

    fn default_slide_duration_ms() -> u64 {
        3000
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct ProviderAuth {
        /// Takes precedence over the environment when set.
        #[serde(default)]
        pub api_key: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct GeminiSettings {
        #[serde(default = "default_api_base")]
        pub api_base: String,
        #[serde(default = "default_chat_model")]
        pub chat_model: String, // e.g., "gemini-2.5-flash"
        #[serde(default = "default_image_edit_model")]
        pub image_edit_model: String,
        #[serde(default = "default_image_model")]
        pub image_model: String, // Imagen, served through `:predict`
        #[serde(default = "default_timeout_secs")]
        pub request_timeout_secs: u64,
        #[serde(default)]
        pub auth: ProviderAuth,
    }

    /// Playback settings for the slideshow feature
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SlideshowSettings {
        #[serde(default = "default_slide_duration_ms")]
        pub slide_duration_ms: u64,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct AppSettings {
        #[serde(default)]
        pub gemini: GeminiSettings,
        #[serde(default)]
        pub slideshow: SlideshowSettings,
    }

    impl Default for GeminiSettings {
        fn default() -> Self {
            Self {
                api_base: default_api_base(),
                chat_model: default_chat_model(),
                image_edit_model: default_image_edit_model(),
                image_model: default_image_model(),
                request_timeout_secs: default_timeout_secs(),
                auth: ProviderAuth::default(),
            }
        }
    }

    impl Default for SlideshowSettings {
        fn default() -> Self {
            Self {
                slide_duration_ms: default_slide_duration_ms(),
            }
        }
    }
}

pub mod agent_api {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Sender {
        User,
        Assistant,
    }

    /// One turn of the chat transcript. Never mutated after creation.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub id: String,
        pub sender: Sender,
        pub text: String,
        pub timestamp: DateTime<Utc>,
    }

    impl ChatMessage {
        pub fn new(sender: Sender, text: impl Into<String>) -> Self {
            Self {
                id: Uuid::new_v4().to_string(),
                sender,
                text: text.into(),
                timestamp: Utc::now(),
            }
        }

        pub fn user(text: impl Into<String>) -> Self {
            Self::new(Sender::User, text)
        }

        pub fn assistant(text: impl Into<String>) -> Self {
            Self::new(Sender::Assistant, text)
        }
    }

    /// Incremental piece of a streamed chat response.
    #[derive(Debug, Clone, PartialEq)]
    pub enum StreamChunk {
        Text(String),
        Done,
        Error(String),
    }

    /// Result of a chat turn. `text` is empty whenever `error` is set.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ChatReply {
        pub text: String,
        pub error: Option<String>,
    }

    impl ChatReply {
        pub fn text(text: impl Into<String>) -> Self {
            Self {
                text: text.into(),
                error: None,
            }
        }

        pub fn error(message: impl Into<String>) -> Self {
            Self {
                text: String::new(),
                error: Some(message.into()),
            }
        }
    }

    /// Result of an image edit or generation; `image_url` is a `data:` URI.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct ImageReply {
        pub image_url: Option<String>,
        pub error: Option<String>,
    }

    impl ImageReply {
        pub fn image(url: impl Into<String>) -> Self {
            Self {
                image_url: Some(url.into()),
                error: None,
            }
        }

        pub fn error(message: impl Into<String>) -> Self {
            Self {
                image_url: None,
                error: Some(message.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::agent_api::*;
    use super::settings::AppSettings;

    #[test]
    fn test_settings_fill_missing_fields() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"gemini":{"chat_model":"gemini-pro"}}"#).unwrap();
        assert_eq!(settings.gemini.chat_model, "gemini-pro");
        assert_eq!(settings.gemini.image_model, "imagen-4.0-generate-001");
        assert_eq!(settings.gemini.request_timeout_secs, 120);
        assert!(settings.gemini.auth.api_key.is_none());
        assert_eq!(settings.slideshow.slide_duration_ms, 3000);
    }

    #[test]
    fn test_sender_wire_names() {
        assert_eq!(serde_json::to_string(&Sender::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Sender::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = ChatMessage::user("hi");
        let b = ChatMessage::user("hi");
        assert_ne!(a.id, b.id);
        assert_eq!(a.sender, Sender::User);
    }
}
