//! `reqwest` implementation of [`ChatApi`].

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{
    ConversationRequest, CreateRoom, ErrorBody, HistoryEntry, NoteUpdate, QuestionResponse, Room,
    Statistics, TitleUpdate,
};
use super::ChatApi;
use crate::config::ClientConfig;
use crate::error::RoundtableError;

/// HTTP client for the chat-room backend.
///
/// Use [`HttpChatApiBuilder`] (or [`HttpChatApi::from_config`]) for
/// construction.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    base_url: String,
    token: Option<String>,
    question_timeout: Duration,
    client: reqwest::Client,
}

impl HttpChatApi {
    /// Start building a client aimed at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> HttpChatApiBuilder {
        HttpChatApiBuilder::new(base_url)
    }

    /// Build a client from the relevant fields of `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = HttpChatApiBuilder::new(config.base_url.clone())
            .connect_timeout(config.connect_timeout)
            .request_timeout(config.request_timeout)
            .question_timeout(config.question_timeout);
        if let Some(token) = &config.token {
            builder = builder.token(token.clone());
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send `req` and map transport failures and non-2xx statuses.
    ///
    /// # Returns
    /// - `Ok(Response)`: on a 2xx status.
    /// - `Err(RoundtableError::Connect)`: when the request could not be sent.
    /// - `Err(RoundtableError::Timeout)`: when it was sent but no response
    ///   arrived in time.
    /// - `Err(RoundtableError::Api)`: on any other status; the body is parsed
    ///   as an [`ErrorBody`] when possible.
    async fn send(&self, req: RequestBuilder, url: &str) -> Result<Response, RoundtableError> {
        let resp = req.send().await.map_err(|e| {
            // A connect timeout means nothing reached the server.
            if e.is_timeout() && !e.is_connect() {
                RoundtableError::Timeout {
                    url: url.to_string(),
                }
            } else {
                RoundtableError::Connect {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let bytes = resp.bytes().await.unwrap_or_default();
        let body = serde_json::from_slice::<ErrorBody>(&bytes).ok();
        if body.is_none() && !bytes.is_empty() {
            debug!(url, status = status.as_u16(), "non-JSON error body");
        }
        Err(RoundtableError::Api {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        url: &str,
    ) -> Result<T, RoundtableError> {
        let resp = self.send(req, url).await?;
        let bytes = resp.bytes().await.map_err(|e| RoundtableError::Json {
            context: url.to_string(),
            detail: e.to_string(),
        })?;
        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            warn!(url, error = %e, "unexpected response shape");
            RoundtableError::Json {
                context: url.to_string(),
                detail: e.to_string(),
            }
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RoundtableError> {
        let url = self.url(path);
        self.send_json(self.request(Method::GET, &url), &url).await
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_rooms(&self) -> Result<Vec<Room>, RoundtableError> {
        self.get_json("/chat-rooms").await
    }

    async fn create_room(&self, title: Option<&str>) -> Result<Room, RoundtableError> {
        let url = self.url("/chat-rooms");
        let req = self.request(Method::POST, &url).json(&CreateRoom { title });
        self.send_json(req, &url).await
    }

    async fn get_room(&self, room_id: u64) -> Result<Room, RoundtableError> {
        self.get_json(&format!("/chat-rooms/{room_id}")).await
    }

    async fn get_history(&self, room_id: u64) -> Result<Vec<HistoryEntry>, RoundtableError> {
        self.get_json(&format!("/chat-rooms/{room_id}/history")).await
    }

    async fn get_statistics(&self, room_id: u64) -> Result<Statistics, RoundtableError> {
        self.get_json(&format!("/chat-rooms/{room_id}/statistics")).await
    }

    async fn update_note(&self, room_id: u64, note: &str) -> Result<Room, RoundtableError> {
        let url = self.url(&format!("/chat-rooms/{room_id}/note"));
        let req = self.request(Method::PUT, &url).json(&NoteUpdate { note });
        self.send_json(req, &url).await
    }

    async fn update_title(&self, room_id: u64, title: &str) -> Result<Room, RoundtableError> {
        let url = self.url(&format!("/chat-rooms/{room_id}/title"));
        let req = self.request(Method::PUT, &url).json(&TitleUpdate { title });
        self.send_json(req, &url).await
    }

    async fn delete_room(&self, room_id: u64) -> Result<(), RoundtableError> {
        let url = self.url(&format!("/chat-rooms/{room_id}"));
        self.send(self.request(Method::DELETE, &url), &url).await?;
        Ok(())
    }

    async fn send_question(
        &self,
        request: &ConversationRequest,
    ) -> Result<QuestionResponse, RoundtableError> {
        let url = self.url("/gpt/question");
        debug!(
            room_id = ?request.chat_room_id,
            roles = ?request.prompt_keys,
            rounds = request.conversation_rounds,
            "sending question"
        );
        let req = self
            .request(Method::POST, &url)
            .timeout(self.question_timeout)
            .json(request);
        self.send_json(req, &url).await
    }

    async fn summarize(&self, room_id: u64) -> Result<QuestionResponse, RoundtableError> {
        let url = self.url("/gpt/summarize");
        let req = self
            .request(Method::GET, &url)
            .query(&[("chatRoomId", room_id)]);
        self.send_json(req, &url).await
    }
}

/// Builder for [`HttpChatApi`].
///
/// # Example
/// ```rust,ignore
/// let api = HttpChatApi::builder("http://localhost:8080/api")
///     .token(token)
///     .request_timeout(Duration::from_secs(60))
///     .build();
/// ```
pub struct HttpChatApiBuilder {
    base_url: String,
    token: Option<String>,
    connect_timeout: Duration,
    request_timeout: Duration,
    question_timeout: Duration,
    system_proxy: bool,
}

impl HttpChatApiBuilder {
    /// Create a builder targeting `base_url`, with the timeouts of
    /// [`ClientConfig::default`].
    pub fn new(base_url: impl Into<String>) -> Self {
        let defaults = ClientConfig::default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            connect_timeout: defaults.connect_timeout,
            request_timeout: defaults.request_timeout,
            question_timeout: defaults.question_timeout,
            system_proxy: true,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Timeout for question submission only; it overrides `request_timeout`
    /// on that call.
    pub fn question_timeout(mut self, timeout: Duration) -> Self {
        self.question_timeout = timeout;
        self
    }

    /// Ignore `HTTP_PROXY` and friends; connect to `base_url` directly.
    pub fn no_proxy(mut self) -> Self {
        self.system_proxy = false;
        self
    }

    /// Consume the builder.
    ///
    /// # Panics
    /// This function never panics.
    pub fn build(self) -> HttpChatApi {
        // reqwest::Client::builder() can fail in extreme environments, but
        // unwrap_or_default() falls back to a default client instead of panicking.
        let mut client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout);
        if !self.system_proxy {
            client = client.no_proxy();
        }
        let client = client
            .build()
            .unwrap_or_default();

        HttpChatApi {
            base_url: self.base_url,
            token: self.token,
            question_timeout: self.question_timeout,
            client,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
