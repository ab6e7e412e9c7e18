//! Avatar upload.

use axum::extract::{Multipart, State};
use serde::Serialize;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::routes::ApiResponse;
use crate::services::StorageError;
use crate::state::AppState;

/// Multipart field holding the image.
pub const AVATAR_FIELD: &str = "avatar";

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// POST /api/users/upload-avatar
pub async fn upload_avatar(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    mut multipart: Multipart,
) -> Result<ApiResponse<AvatarResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        let avatar_url = state
            .avatars()
            .store_avatar(current.id, &content_type, &bytes)
            .await?;
        state
            .repos()
            .profiles
            .set_avatar_url(current.id, &avatar_url)
            .await?;

        return Ok(ApiResponse(AvatarResponse { avatar_url }));
    }

    Err(StorageError::MissingFile.into())
}
