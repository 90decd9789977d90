use axum::{debug_handler, extract::{Path, State}, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{auth::Principal, AppError, AppResult, JsonBody, AppState};

use super::transcript::{self, Message};

/// `{ "data": { "role": ..., "msg": ... } }`, shared with the AI turn.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageBody {
    data: Option<Value>,
}

impl MessageBody {
    pub(crate) fn into_message(self) -> AppResult<Message> {
        self.data
            .and_then(|data| serde_json::from_value::<Message>(data).ok())
            .filter(|m| !m.msg.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input("Invalid chat message format."))
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_msg(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
    Path(chat_id): Path<String>,
    JsonBody(body): JsonBody<MessageBody>,
) -> AppResult<impl IntoResponse> {
    let message = body.into_message()?;

    transcript::ensure_owner(&db_pool, &chat_id, &principal.id).await?;
    transcript::append(&db_pool, &chat_id, message).await?;

    Ok((StatusCode::CREATED, Json(json!({ "message": "Chat data added" }))))
}
