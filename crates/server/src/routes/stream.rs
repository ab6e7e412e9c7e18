//! Server-sent event streams for live chat updates.
//!
//! A stream subscribes before loading anything, then sends:
//!
//! - `snapshot` with every message of the chat, first and after any lag
//! - `message` for each new message
//! - `message_updated` for edits and seen-state changes
//!
//! Change events only carry IDs, so each one is re-fetched with sender
//! fields before it is sent. Closing the connection drops the subscription.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Serialize;

use ledgerdesk_core::ChatId;

use crate::models::MessageView;
use crate::realtime::{ChangeEvent, ChangeKind, SubscriptionEvent};
use crate::state::AppState;

/// SSE event name for the full message list.
pub const SNAPSHOT_EVENT: &str = "snapshot";
/// SSE event name for an inserted message.
pub const MESSAGE_EVENT: &str = "message";
/// SSE event name for an updated message.
pub const MESSAGE_UPDATED_EVENT: &str = "message_updated";

#[derive(Serialize)]
struct Snapshot<'a> {
    chat_id: ChatId,
    messages: &'a [MessageView],
}

/// Open a live stream for a chat the caller has already been authorized for.
pub fn chat_stream(
    state: AppState,
    chat_id: ChatId,
    client_id: Option<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.notifier().subscribe(chat_id, client_id);

    let stream = async_stream::stream! {
        if let Some(event) = snapshot(&state, chat_id).await {
            yield Ok(event);
        }

        while let Some(item) = subscription.recv().await {
            let event = match item {
                SubscriptionEvent::Resync => snapshot(&state, chat_id).await,
                SubscriptionEvent::Change(change) => change_event(&state, &change).await,
            };
            if let Some(event) = event {
                yield Ok(event);
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn snapshot(state: &AppState, chat_id: ChatId) -> Option<Event> {
    let messages = match state.chats().load_messages(chat_id).await {
        Ok(messages) => messages,
        Err(e) => {
            tracing::error!(%chat_id, error = %e, "Snapshot load failed");
            return None;
        }
    };

    encode(
        SNAPSHOT_EVENT,
        &Snapshot {
            chat_id,
            messages: &messages,
        },
    )
}

async fn change_event(state: &AppState, change: &ChangeEvent) -> Option<Event> {
    let view = match state.chats().message_view(change.message_id).await {
        Ok(Some(view)) => view,
        Ok(None) => return None,
        Err(e) => {
            tracing::error!(message_id = %change.message_id, error = %e, "Message refetch failed");
            return None;
        }
    };

    let name = match change.kind {
        ChangeKind::Insert => MESSAGE_EVENT,
        ChangeKind::Update => MESSAGE_UPDATED_EVENT,
    };
    encode(name, &view)
}

fn encode<T: Serialize>(name: &'static str, payload: &T) -> Option<Event> {
    Event::default()
        .event(name)
        .json_data(payload)
        .inspect_err(|e| tracing::error!(event = name, error = %e, "SSE encode failed"))
        .ok()
}
