use axum::{debug_handler, extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::{types::Json as SqlJson, SqlitePool};

use crate::{db::User, AppError, AppResult, JsonBody, AppState};

use super::{verify_password, Principal, TokenKeys};

#[derive(Debug, Deserialize)]
pub(crate) struct SigninRequest {
    email: String,
    password: String,
    device_token: Option<String>,
}

/// Adds `token` to `user`'s device list unless it is already there.
/// Returns whether anything changed.
pub(crate) async fn remember_device(db_pool: &SqlitePool, user: &mut User, token: &str) -> AppResult<bool> {
    if user.device_tokens.0.iter().any(|known| known == token) {
        return Ok(false);
    }
    user.device_tokens.0.push(token.to_owned());

    sqlx::query("UPDATE users SET device_tokens=?, updated_at=CURRENT_TIMESTAMP WHERE id=?")
        .bind(SqlJson(&user.device_tokens.0))
        .bind(&user.id)
        .execute(db_pool)
        .await?;
    Ok(true)
}

#[debug_handler(state = AppState)]
pub(crate) async fn signin(
    State(db_pool): State<SqlitePool>,
    State(keys): State<TokenKeys>,
    JsonBody(SigninRequest { email, password, device_token }): JsonBody<SigninRequest>,
) -> AppResult<impl IntoResponse> {
    let Some(mut user) = User::by_email(&db_pool, &email.trim().to_lowercase()).await? else {
        return Err(AppError::invalid_input("User not found"));
    };

    if !verify_password(&password, &user.password)? {
        return Err(AppError::invalid_input("Incorrect password"));
    }

    if let Some(device_token) = device_token.filter(|t| !t.is_empty()) {
        remember_device(&db_pool, &mut user, &device_token).await?;
    }

    let token = keys.issue(&Principal::from(&user))?;
    tracing::info!(user_id = %user.id, "user signed in");

    Ok(Json(json!({
        "message": "Signed in",
        "token": token,
        "user": user,
    })))
}
