//! # API
//!
//! The HTTP contract with the chat-room backend.
//!
//! ## Endpoints
//!
//! | Call                 | Method + path                          |
//! |----------------------|----------------------------------------|
//! | `list_rooms`         | `GET /chat-rooms`                      |
//! | `create_room`        | `POST /chat-rooms`                     |
//! | `get_room`           | `GET /chat-rooms/{id}`                 |
//! | `get_history`        | `GET /chat-rooms/{id}/history`         |
//! | `get_statistics`     | `GET /chat-rooms/{id}/statistics`      |
//! | `update_note`        | `PUT /chat-rooms/{id}/note`            |
//! | `update_title`       | `PUT /chat-rooms/{id}/title`           |
//! | `delete_room`        | `DELETE /chat-rooms/{id}`              |
//! | `send_question`      | `POST /gpt/question`                   |
//! | `summarize`          | `GET /gpt/summarize?chatRoomId={id}`   |
//!
//! [`ChatApi`] is the seam the coordinator talks through; [`HttpChatApi`] is
//! the `reqwest` implementation.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::RoundtableError;

pub use client::{HttpChatApi, HttpChatApiBuilder};
pub use types::{
    ConversationRequest, ErrorBody, HistoryEntry, QuestionResponse, Room, Statistics,
    SENDER_MODERATOR, SENDER_USER,
};

/// Operations the backend exposes to a client.
///
/// Implementations must be cheap to share: coordinators for different rooms
/// hold the same `Arc<dyn ChatApi>`.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_rooms(&self) -> Result<Vec<Room>, RoundtableError>;

    async fn create_room(&self, title: Option<&str>) -> Result<Room, RoundtableError>;

    async fn get_room(&self, room_id: u64) -> Result<Room, RoundtableError>;

    async fn get_history(&self, room_id: u64) -> Result<Vec<HistoryEntry>, RoundtableError>;

    async fn get_statistics(&self, room_id: u64) -> Result<Statistics, RoundtableError>;

    async fn update_note(&self, room_id: u64, note: &str) -> Result<Room, RoundtableError>;

    async fn update_title(&self, room_id: u64, title: &str) -> Result<Room, RoundtableError>;

    async fn delete_room(&self, room_id: u64) -> Result<(), RoundtableError>;

    /// Start a round. Returns once the server has accepted (or finished) it;
    /// completion is observed through the room's processing flag.
    async fn send_question(
        &self,
        request: &ConversationRequest,
    ) -> Result<QuestionResponse, RoundtableError>;

    async fn summarize(&self, room_id: u64) -> Result<QuestionResponse, RoundtableError>;
}
