//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::Repositories;
use crate::realtime::ChatNotifier;
use crate::services::{AvatarStore, ChatService, DashboardService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Production builds it over the `PostgreSQL`
/// repositories; tests build it over [`Repositories::in_memory`].
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    repos: Repositories,
    notifier: ChatNotifier,
    avatars: AvatarStore,
}

impl AppState {
    /// Create a new application state with a fresh notifier.
    #[must_use]
    pub fn new(repos: Repositories, avatars: AvatarStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                repos,
                notifier: ChatNotifier::new(),
                avatars,
            }),
        }
    }

    /// Get the repository set.
    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    /// Get the chat change notifier.
    #[must_use]
    pub fn notifier(&self) -> &ChatNotifier {
        &self.inner.notifier
    }

    /// Get the avatar file store.
    #[must_use]
    pub fn avatars(&self) -> &AvatarStore {
        &self.inner.avatars
    }

    /// Chat service over this state's repositories and notifier.
    #[must_use]
    pub fn chats(&self) -> ChatService<'_> {
        ChatService::new(&self.inner.repos, &self.inner.notifier)
    }

    /// Dashboard service over this state's repositories.
    #[must_use]
    pub fn dashboard(&self) -> DashboardService<'_> {
        DashboardService::new(&self.inner.repos)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("repos", &self.inner.repos)
            .field("avatars", &self.inner.avatars)
            .finish_non_exhaustive()
    }
}
