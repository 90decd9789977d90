use axum::{debug_handler, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::Principal, AppResult, JsonBody, AppState};

use super::transcript;

#[derive(Debug, Deserialize)]
pub(crate) struct NewChatRequest {
    #[serde(default)]
    subject: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_chat(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
    JsonBody(NewChatRequest { subject }): JsonBody<NewChatRequest>,
) -> AppResult<impl IntoResponse> {
    let chat_id = Uuid::now_v7().to_string();
    transcript::create(&db_pool, &chat_id, &principal.id, subject.trim()).await?;

    Ok((StatusCode::CREATED, Json(json!({ "chat_id": chat_id }))))
}
