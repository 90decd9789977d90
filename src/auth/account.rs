use axum::{debug_handler, extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{db::User, AppError, AppResult, JsonBody, AppState};

use super::{signin::remember_device, Principal};

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateUserRequest {
    phone_number: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    weight: Option<f64>,
    height: Option<f64>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceTokenRequest {
    device_token: Option<String>,
}

/// Fields left out of the request keep their current value.
#[debug_handler(state = AppState)]
pub(crate) async fn update_user(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let result = sqlx::query(
        "UPDATE users SET phone_number=COALESCE(?,phone_number), first_name=COALESCE(?,first_name), last_name=COALESCE(?,last_name), weight=COALESCE(?,weight), height=COALESCE(?,height), email=COALESCE(?,email), updated_at=CURRENT_TIMESTAMP WHERE id=?",
    )
    .bind(request.phone_number)
    .bind(request.first_name.filter(|n| !n.trim().is_empty()))
    .bind(request.last_name)
    .bind(request.weight)
    .bind(request.height)
    .bind(request.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()))
    .bind(&principal.id)
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User"));
    }
    Ok(Json(json!({ "message": "User updated" })))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_device_token(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
    JsonBody(DeviceTokenRequest { device_token }): JsonBody<DeviceTokenRequest>,
) -> AppResult<impl IntoResponse> {
    let Some(device_token) = device_token.filter(|t| !t.is_empty()) else {
        return Err(AppError::invalid_input("Device token is required."));
    };
    let Some(mut user) = User::by_id(&db_pool, &principal.id).await? else {
        return Err(AppError::not_found("User"));
    };

    let message = if remember_device(&db_pool, &mut user, &device_token).await? {
        "Device token updated."
    } else {
        "Device token already exists."
    };
    Ok(Json(json!({ "message": message })))
}

/// Removes the caller's account; chats and emergency contacts go with it.
#[debug_handler(state = AppState)]
pub async fn delete_user(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
) -> AppResult<impl IntoResponse> {
    let result = sqlx::query("DELETE FROM users WHERE id=?")
        .bind(&principal.id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User"));
    }
    tracing::info!(user_id = %principal.id, "user deleted");
    Ok(Json(json!({ "message": "User deleted" })))
}
