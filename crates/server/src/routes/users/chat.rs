//! Customer side of the support chat.
//!
//! The caller's identity always comes from the session. Requests may name
//! a `chat_id`; without one the caller's resolved support chat is used.

use std::convert::Infallible;

use axum::{
    Router,
    extract::{Query, State},
    response::sse::{Event, Sse},
    routing::{get, post},
};
use futures::Stream;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::{ChatId, ChatStatus, MessageId, MessageType, ProfileId};

use crate::error::Result;
use crate::middleware::{ClientId, RequireUser};
use crate::models::{Chat, MessageView};
use crate::routes::{ApiResponse, JsonBody, stream};
use crate::services::{ChatError, ChatService};
use crate::state::AppState;

/// Build the customer chat router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/chat/conversations",
            get(list_conversations).post(resolve_conversation),
        )
        .route(
            "/chat/messages",
            get(list_messages).post(send_message).put(edit_message),
        )
        .route("/chat/mark-seen", post(mark_seen))
        .route("/chat/stream", get(stream_chat))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Optional chat selector.
#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    pub chat_id: Option<ChatId>,
}

/// Customer message.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub chat_id: Option<ChatId>,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

/// Edit of the caller's own message.
#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub message_id: MessageId,
    pub content: String,
}

/// Messages to mark as seen.
#[derive(Debug, Deserialize)]
pub struct MarkSeenRequest {
    pub message_ids: Vec<MessageId>,
}

#[derive(Debug, Serialize)]
pub struct ChatsResponse {
    pub chats: Vec<Chat>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub chat: Chat,
}

#[derive(Debug, Serialize)]
pub struct ChatMessagesResponse {
    pub chat: Chat,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: MessageView,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageView>,
}

/// The named chat if the caller participates, else the resolved one.
async fn target_chat(
    service: &ChatService<'_>,
    caller: ProfileId,
    chat_id: Option<ChatId>,
) -> std::result::Result<Chat, ChatError> {
    match chat_id {
        Some(id) => service.chat_for_participant(id, caller).await,
        None => service.resolve_chat(caller).await,
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /api/users/chat/conversations
async fn list_conversations(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<ApiResponse<ChatsResponse>> {
    let chats = state.chats().list_for_user(current.id).await?;
    Ok(ApiResponse(ChatsResponse { chats }))
}

/// POST /api/users/chat/conversations
async fn resolve_conversation(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<ApiResponse<ChatResponse>> {
    let chat = state.chats().resolve_chat(current.id).await?;
    Ok(ApiResponse(ChatResponse { chat }))
}

/// GET /api/users/chat/messages?chat_id=
async fn list_messages(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Query(query): Query<ChatQuery>,
) -> Result<ApiResponse<ChatMessagesResponse>> {
    let service = state.chats();
    let chat = target_chat(&service, current.id, query.chat_id).await?;
    let messages = service.load_messages(chat.id).await?;
    Ok(ApiResponse(ChatMessagesResponse { chat, messages }))
}

/// POST /api/users/chat/messages
async fn send_message(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    client: ClientId,
    JsonBody(request): JsonBody<SendMessageRequest>,
) -> Result<ApiResponse<MessageResponse>> {
    if request.content.trim().is_empty() {
        return Err(ChatError::EmptyMessage.into());
    }

    let service = state.chats();
    let chat = target_chat(&service, current.id, request.chat_id).await?;
    if chat.status == ChatStatus::Closed {
        return Err(ChatError::ChatClosed.into());
    }

    let message = service
        .send_message(
            chat.id,
            current.id,
            &request.content,
            request.message_type,
            client.as_deref(),
        )
        .await?;
    Ok(ApiResponse(MessageResponse { message }))
}

/// PUT /api/users/chat/messages
async fn edit_message(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    client: ClientId,
    JsonBody(request): JsonBody<EditMessageRequest>,
) -> Result<ApiResponse<MessageResponse>> {
    let message = state
        .chats()
        .edit_message(
            request.message_id,
            current.id,
            &request.content,
            client.as_deref(),
        )
        .await?;
    Ok(ApiResponse(MessageResponse { message }))
}

/// POST /api/users/chat/mark-seen
async fn mark_seen(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    client: ClientId,
    JsonBody(request): JsonBody<MarkSeenRequest>,
) -> Result<ApiResponse<MessagesResponse>> {
    let messages = state
        .chats()
        .mark_seen(&request.message_ids, current.id, client.as_deref())
        .await?;
    Ok(ApiResponse(MessagesResponse { messages }))
}

/// GET /api/users/chat/stream?chat_id=
async fn stream_chat(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    client: ClientId,
    Query(query): Query<ChatQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let chat = target_chat(&state.chats(), current.id, query.chat_id).await?;
    Ok(stream::chat_stream(state, chat.id, client.0))
}
