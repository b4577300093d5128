//! # Moderator payload decoder
//!
//! The moderator persona answers with a structured decision record, usually
//! JSON, sometimes wrapped in a fenced code block:
//!
//! ~~~text
//! ```json
//! {"shouldEnd": false, "request": [{"roleKey": "critic", "messages": "..."}]}
//! ```
//! ~~~
//!
//! [`format_moderator_message`] turns such a record into readable status text
//! and leaves everything else alone. It is total: any input that is not a
//! decision record comes back byte-for-byte unchanged, so feeding its own
//! output back in is a fixed point.
//!
//! | Record                              | Rendered as                           |
//! |-------------------------------------|---------------------------------------|
//! | `shouldEnd: true`                   | fixed two-line "ending" message       |
//! | non-empty `request` list            | one numbered block per entry          |
//! | `request` empty/absent, no end flag | fixed "continuing discussion" message |
//! | anything else                       | input returned unchanged              |

use serde_json::{Map, Value};

use crate::roles::{display_name, RESEARCHER};

/// Rendered when the moderator decides the round is over.
pub const ENDING_MESSAGE: &str =
    "✅ 대화를 종료합니다.\n\n충분히 논의가 완료되어 요약자에게 요청합니다.";

/// Rendered when the record is a decision but names nobody to speak next.
pub const CONTINUING_MESSAGE: &str = "대화를 계속 진행합니다.";

/// Header above the numbered request blocks.
pub const REQUEST_HEADER: &str = "📋 다음 역할들에게 질문을 보냅니다:";

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Why a string did not decode into a [`ModeratorDecision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The (possibly fenced) text is not valid JSON.
    NotJson,
    /// Valid JSON, but not an object with `request` or `shouldEnd`.
    NotADecision,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::NotJson => write!(f, "not a JSON document"),
            DecodeError::NotADecision => write!(f, "JSON is not a moderator decision"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// One entry of the moderator's `request` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRequest {
    pub role_key: String,
    /// Sub-question, or search query for the researcher. `None` when absent
    /// or empty.
    pub messages: Option<String>,
}

/// A decoded moderator decision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModeratorDecision {
    /// `Some(true)` only for an exact JSON `true`.
    pub should_end: Option<bool>,
    /// `None` when the key was absent or not a list.
    pub request: Option<Vec<RoleRequest>>,
}

impl ModeratorDecision {
    /// Deterministic display text for this decision.
    ///
    /// The end flag takes precedence over any request entries.
    pub fn render(&self) -> String {
        if self.should_end == Some(true) {
            return ENDING_MESSAGE.to_string();
        }

        let requests = match &self.request {
            Some(list) if !list.is_empty() => list,
            _ => return CONTINUING_MESSAGE.to_string(),
        };

        let mut out = String::new();
        out.push_str(REQUEST_HEADER);
        out.push_str("\n\n");
        for (i, req) in requests.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, display_name(&req.role_key)));
            if let Some(text) = &req.messages {
                if req.role_key == RESEARCHER {
                    out.push_str(&format!("   🔍 검색어: \"{text}\"\n"));
                } else {
                    out.push_str(&format!("   💬 질문: {text}\n"));
                }
            }
            out.push('\n');
        }
        out.trim().to_string()
    }

    /// Whether the moderator asked for the round to end.
    pub fn ends_round(&self) -> bool {
        self.should_end == Some(true)
    }
}

/// Return the interior of the first fenced block in `text`, or `text` itself
/// when there is no fence.
///
/// The interior runs from the end of the first opening marker (a `json`-tagged
/// marker is preferred) to the start of the last marker. A lone marker yields
/// an empty interior.
pub fn extract_fenced(text: &str) -> &str {
    let (open, marker_len) = if let Some(pos) = text.find(JSON_FENCE) {
        (pos, JSON_FENCE.len())
    } else if let Some(pos) = text.find(FENCE) {
        (pos, FENCE.len())
    } else {
        return text;
    };

    let start = open + marker_len;
    match text.rfind(FENCE) {
        Some(end) if end >= start => text[start..end].trim(),
        _ => "",
    }
}

/// Decode `raw` into a [`ModeratorDecision`].
///
/// # Errors
/// [`DecodeError::NotJson`] when the extracted text does not parse, and
/// [`DecodeError::NotADecision`] when it parses to something other than an
/// object carrying `request` or `shouldEnd`, or when a `request` entry is not
/// an object with a string `roleKey`.
pub fn decode_decision(raw: &str) -> Result<ModeratorDecision, DecodeError> {
    let body = extract_fenced(raw.trim());
    let value: Value = serde_json::from_str(body).map_err(|_| DecodeError::NotJson)?;
    let obj = value.as_object().ok_or(DecodeError::NotADecision)?;
    if !obj.contains_key("request") && !obj.contains_key("shouldEnd") {
        return Err(DecodeError::NotADecision);
    }
    decision_from_object(obj)
}

/// Render a moderator message for display, or return it unchanged when it is
/// not a decision record.
///
/// # Panics
/// This function never panics.
pub fn format_moderator_message(raw: &str) -> String {
    match decode_decision(raw) {
        Ok(decision) => decision.render(),
        Err(_) => raw.to_string(),
    }
}

fn decision_from_object(obj: &Map<String, Value>) -> Result<ModeratorDecision, DecodeError> {
    let should_end = obj.get("shouldEnd").and_then(Value::as_bool);
    let request = match obj.get("request").and_then(Value::as_array) {
        Some(items) => match items.iter().map(role_request_from_value).collect() {
            Ok(requests) => Some(requests),
            // An end decision renders without its entries.
            Err(_) if should_end == Some(true) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };
    Ok(ModeratorDecision { should_end, request })
}

/// Each entry must be an object with a string `roleKey`. `messages` is shown
/// only when present and non-empty: `null`, `false`, `""` and `0` are omitted.
fn role_request_from_value(item: &Value) -> Result<RoleRequest, DecodeError> {
    let role_key = item
        .as_object()
        .and_then(|entry| entry.get("roleKey"))
        .and_then(Value::as_str)
        .ok_or(DecodeError::NotADecision)?
        .to_string();
    let messages = match item.get("messages") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        None | Some(Value::Null) | Some(Value::String(_)) | Some(Value::Bool(false)) => None,
        Some(other) => Some(other.to_string()),
    };
    Ok(RoleRequest { role_key, messages })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
