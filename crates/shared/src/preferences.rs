//! Persisted user preferences.

use crate::agent_api::ChatMessage;
use serde::{Deserialize, Serialize};

/// What survives between sessions when "remember me" is on.
///
/// Serialized as `{name, rememberMe, lastChat: [{id, sender, text, timestamp}]}`
/// with timestamps as RFC 3339 text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub name: String,
    pub remember_me: bool,
    pub last_chat: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_api::Sender;

    #[test]
    fn test_wire_format() {
        let json = r#"{
            "name": "Ada",
            "rememberMe": true,
            "lastChat": [
                {"id": "1", "sender": "assistant", "text": "Hi Ada!", "timestamp": "2024-05-01T10:00:00.123Z"}
            ]
        }"#;
        let prefs: UserPreferences = serde_json::from_str(json).unwrap();
        assert_eq!(prefs.name, "Ada");
        assert!(prefs.remember_me);
        assert_eq!(prefs.last_chat[0].sender, Sender::Assistant);
        assert_eq!(prefs.last_chat[0].timestamp.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_bad_timestamp_rejects_whole_record() {
        let json = r#"{"name":"Ada","rememberMe":true,"lastChat":[
            {"id":"1","sender":"user","text":"hi","timestamp":"yesterday"}]}"#;
        assert!(serde_json::from_str::<UserPreferences>(json).is_err());
    }
}
