//! Wire types for the chat-room backend.
//!
//! Field names follow the server's camelCase JSON. Everything the server may
//! omit is optional or defaulted, so older and newer servers both parse.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::moderator::format_moderator_message;

/// Sender value the server uses for entries typed by the user.
pub const SENDER_USER: &str = "user";
/// Sender value the server uses for moderator decisions.
pub const SENDER_MODERATOR: &str = "moderator";

/// A persisted conversation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Authoritative flag: a round is executing for this room.
    #[serde(default, alias = "processing")]
    pub is_processing: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Room {
    /// Title for display; rooms created without one show a placeholder.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("세션")
    }
}

/// One message in a room's append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    pub sender: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
}

impl HistoryEntry {
    pub fn is_moderator(&self) -> bool {
        self.sender == SENDER_MODERATOR
    }

    pub fn is_user(&self) -> bool {
        self.sender == SENDER_USER
    }

    /// Message text for display: moderator decisions are rendered as readable
    /// text, everything else is shown as sent.
    pub fn display_text(&self) -> String {
        if self.is_moderator() {
            format_moderator_message(&self.message)
        } else {
            self.message.clone()
        }
    }
}

/// Aggregate counters for a room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub total_tokens_used: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// role key → number of replies
    #[serde(default)]
    pub role_participation_count: HashMap<String, u64>,
}

/// Body of `POST /gpt/question`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    /// Absent ⇒ the server creates a new room.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_room_id: Option<u64>,
    pub question: String,
    pub prompt_keys: Vec<String>,
    pub conversation_rounds: u32,
}

/// Success body of `POST /gpt/question` and `GET /gpt/summarize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl QuestionResponse {
    /// Note content carried by the response: `answer`, else `message`.
    pub fn note_content(&self) -> Option<&str> {
        self.answer
            .as_deref()
            .or(self.message.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Error envelope returned with non-2xx statuses.
///
/// The server uses `{"error": "..."}` for most endpoints and
/// `{"answer": "..."}` for the question endpoint; `code` is the
/// machine-readable classification when the server provides one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl ErrorBody {
    /// All human-readable texts in the envelope.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        [&self.error, &self.message, &self.answer]
            .into_iter()
            .filter_map(|t| t.as_deref())
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NoteUpdate<'a> {
    pub note: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TitleUpdate<'a> {
    pub title: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateRoom<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_parses_server_shape() {
        let json = r#"{
            "id": 7, "title": "전략 회의", "note": "draft",
            "isProcessing": true,
            "createdAt": "2025-01-02T03:04:05", "updatedAt": "2025-01-02T03:05:00",
            "roleParticipationCount": {"critic": 2}, "totalTokensUsed": 120
        }"#;
        let room: Room = serde_json::from_str(json).unwrap();
        assert_eq!(room.id, 7);
        assert!(room.is_processing);
        assert_eq!(room.note.as_deref(), Some("draft"));
    }

    #[test]
    fn room_missing_flag_defaults_false() {
        let room: Room = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(!room.is_processing);
        assert_eq!(room.display_title(), "세션");
    }

    #[test]
    fn room_accepts_processing_alias() {
        let room: Room = serde_json::from_str(r#"{"id": 1, "processing": true}"#).unwrap();
        assert!(room.is_processing);
    }

    #[test]
    fn history_entry_moderator_display_is_decoded() {
        let entry = HistoryEntry {
            id: 3,
            sender: SENDER_MODERATOR.to_string(),
            message: r#"{"shouldEnd": true}"#.to_string(),
            timestamp: None,
            tokens_used: None,
        };
        assert!(entry.is_moderator());
        assert!(entry.display_text().starts_with('✅'));
    }

    #[test]
    fn history_entry_other_senders_shown_raw() {
        let entry = HistoryEntry {
            id: 4,
            sender: "critic".to_string(),
            message: r#"{"shouldEnd": true}"#.to_string(),
            timestamp: None,
            tokens_used: None,
        };
        assert_eq!(entry.display_text(), r#"{"shouldEnd": true}"#);
    }

    #[test]
    fn conversation_request_omits_missing_room() {
        let req = ConversationRequest {
            chat_room_id: None,
            question: "q".to_string(),
            prompt_keys: vec!["creator".to_string()],
            conversation_rounds: 2,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("chatRoomId").is_none());
        assert_eq!(v["promptKeys"][0], "creator");
        assert_eq!(v["conversationRounds"], 2);
    }

    #[test]
    fn conversation_request_includes_room_id() {
        let req = ConversationRequest {
            chat_room_id: Some(12),
            question: "q".to_string(),
            prompt_keys: vec![],
            conversation_rounds: 1,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["chatRoomId"], 12);
    }

    #[test]
    fn question_response_note_prefers_answer() {
        let r = QuestionResponse {
            message: Some("started".to_string()),
            answer: Some("# Summary".to_string()),
        };
        assert_eq!(r.note_content(), Some("# Summary"));
        let r = QuestionResponse {
            message: Some("started".to_string()),
            answer: None,
        };
        assert_eq!(r.note_content(), Some("started"));
        assert_eq!(QuestionResponse::default().note_content(), None);
    }

    #[test]
    fn statistics_parse_with_missing_fields() {
        let s: Statistics = serde_json::from_str(r#"{"totalMessages": 5}"#).unwrap();
        assert_eq!(s.total_messages, 5);
        assert_eq!(s.total_tokens_used, 0);
        assert!(s.role_participation_count.is_empty());
    }

    #[test]
    fn error_body_texts_skip_missing() {
        let b = ErrorBody {
            error: Some("a".to_string()),
            answer: Some("b".to_string()),
            ..Default::default()
        };
        let texts: Vec<&str> = b.texts().collect();
        assert_eq!(texts, vec!["a", "b"]);
    }
}
