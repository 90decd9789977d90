use axum::{debug_handler, extract::{Path, State}, response::IntoResponse, Json};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{auth::Principal, AppResult, AppState};

use super::transcript;

#[debug_handler(state = AppState)]
pub(crate) async fn list_chats(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(transcript::list_for_user(&db_pool, &principal.id).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn chat(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
    Path(chat_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    transcript::ensure_owner(&db_pool, &chat_id, &principal.id).await?;
    Ok(Json(transcript::load(&db_pool, &chat_id).await?))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_chat(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
    Path(chat_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    transcript::ensure_owner(&db_pool, &chat_id, &principal.id).await?;
    transcript::delete(&db_pool, &chat_id).await?;

    Ok(Json(json!({ "message": "Chat deleted" })))
}
