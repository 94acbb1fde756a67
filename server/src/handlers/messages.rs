//! Messaging and upload handlers

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::messages::SendMessageRequest;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, Message, PaginationParams};
use crate::uploads::{StoredUpload, UploadError};
use crate::websocket::RoomEvent;

/// Messages in a conversation, oldest first
pub async fn list_messages(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    ApiPath(conversation_id): ApiPath<String>,
    ApiQuery(page): ApiQuery<PaginationParams>,
) -> ApiResult<Json<ApiResponse<Vec<Message>>>> {
    let messages = app_state
        .message_service
        .list(&conversation_id, page.limit(), page.offset())
        .await?;
    Ok(Json(ApiResponse::ok(messages)))
}

/// Store a message, push it to the conversation room and notify the recipient
pub async fn send_message(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Message>>)> {
    let message = app_state
        .message_service
        .send(user.user_id, &request)
        .await?;

    app_state
        .ws_state
        .broadcast_event(RoomEvent::message_received(&message.conversation_id, &message))
        .await;

    if let Some(recipient) = request.recipient_user_id.filter(|id| *id != user.user_id) {
        app_state
            .notification_service
            .notify_quietly(recipient, "New message", "You have a new message.")
            .await;
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message))))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub conversation_id: Option<String>,
}

/// Multipart upload with a `file` part and a `conversation_id` field or query parameter
pub async fn upload_file(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    ApiQuery(query): ApiQuery<UploadQuery>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<StoredUpload>>)> {
    let mut conversation_id = query.conversation_id;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                file = Some((name, data.to_vec()));
            }
            Some("conversation_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                if !value.trim().is_empty() {
                    conversation_id = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let (name, data) = file.ok_or(UploadError::NoFile)?;
    let conversation_id = conversation_id.ok_or(UploadError::MissingConversation)?;
    let stored = app_state
        .upload_service
        .store(&conversation_id, &name, &data)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(stored))))
}
