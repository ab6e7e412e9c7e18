//! Support inbox for admins.
//!
//! Admins can read and answer any chat, not only those assigned to them.
//! Posting into a closed chat is allowed here; only the customer side
//! rejects it.

use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event, Sse},
    routing::{get, patch},
};
use futures::Stream;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::{ChatId, ChatStatus, MessageType};

use crate::error::Result;
use crate::middleware::{ClientId, RequireAdmin};
use crate::models::{Chat, ChatSummary, MessageView};
use crate::routes::{ApiResponse, Done, JsonBody, stream};
use crate::state::AppState;

/// Build the admin chat router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chats", get(list_chats))
        .route("/chats/{id}", get(get_chat).delete(delete_chat))
        .route("/chats/{id}/messages", get(list_messages).post(send_message))
        .route("/chats/{id}/status", patch(set_status))
        .route("/chats/{id}/stream", get(stream_chat))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Inbox filter. Empty or `all` means no filter.
#[derive(Debug, Default, Deserialize)]
pub struct ChatListQuery {
    pub status: Option<String>,
}

impl ChatListQuery {
    fn status(&self) -> Result<Option<ChatStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("" | "all") => Ok(None),
            Some(raw) => Ok(Some(raw.parse()?)),
        }
    }
}

/// Admin reply.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

/// Status change.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ChatStatus,
}

#[derive(Debug, Serialize)]
pub struct ChatListResponse {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Serialize)]
pub struct ChatDetailResponse {
    pub chat: Chat,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub chat: Chat,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: MessageView,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /api/admin/chats?status=
async fn list_chats(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<ChatListQuery>,
) -> Result<ApiResponse<ChatListResponse>> {
    let chats = state
        .chats()
        .list_summaries(admin.id, query.status()?)
        .await?;
    Ok(ApiResponse(ChatListResponse { chats }))
}

/// GET /api/admin/chats/{id}
async fn get_chat(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ChatId>,
) -> Result<ApiResponse<ChatDetailResponse>> {
    let service = state.chats();
    let chat = service.get_chat(id).await?;
    let messages = service.load_messages(id).await?;
    Ok(ApiResponse(ChatDetailResponse { chat, messages }))
}

/// DELETE /api/admin/chats/{id}
async fn delete_chat(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ChatId>,
) -> Result<ApiResponse<Done>> {
    state.chats().delete_chat(id).await?;
    Ok(ApiResponse::done("chat deleted"))
}

/// GET /api/admin/chats/{id}/messages
async fn list_messages(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ChatId>,
) -> Result<ApiResponse<MessagesResponse>> {
    let service = state.chats();
    service.get_chat(id).await?;
    let messages = service.load_messages(id).await?;
    Ok(ApiResponse(MessagesResponse { messages }))
}

/// POST /api/admin/chats/{id}/messages
async fn send_message(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    client: ClientId,
    Path(id): Path<ChatId>,
    JsonBody(request): JsonBody<SendMessageRequest>,
) -> Result<ApiResponse<MessageResponse>> {
    let message = state
        .chats()
        .send_message(
            id,
            admin.id,
            &request.content,
            request.message_type,
            client.as_deref(),
        )
        .await?;
    Ok(ApiResponse(MessageResponse { message }))
}

/// PATCH /api/admin/chats/{id}/status
async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ChatId>,
    JsonBody(request): JsonBody<StatusRequest>,
) -> Result<ApiResponse<ChatResponse>> {
    let chat = state
        .chats()
        .set_status(id, request.status, admin.id)
        .await?;
    Ok(ApiResponse(ChatResponse { chat }))
}

/// GET /api/admin/chats/{id}/stream
async fn stream_chat(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    client: ClientId,
    Path(id): Path<ChatId>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    state.chats().get_chat(id).await?;
    Ok(stream::chat_stream(state, id, client.0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(status: Option<&str>) -> ChatListQuery {
        ChatListQuery {
            status: status.map(String::from),
        }
    }

    #[test]
    fn test_status_filter_parsing() {
        assert_eq!(query(None).status().unwrap(), None);
        assert_eq!(query(Some("all")).status().unwrap(), None);
        assert_eq!(query(Some("")).status().unwrap(), None);
        assert_eq!(
            query(Some("closed")).status().unwrap(),
            Some(ChatStatus::Closed)
        );
        assert!(query(Some("archived")).status().is_err());
    }
}
