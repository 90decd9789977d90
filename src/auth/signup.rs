use axum::{debug_handler, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::{types::Json as SqlJson, SqlitePool};
use uuid::Uuid;

use crate::{AppError, AppResult, JsonBody};

use super::hash_password;

#[derive(Debug, Deserialize)]
pub(crate) struct SignupRequest {
    email: Option<String>,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    phone_number: Option<String>,
    weight: Option<f64>,
    height: Option<f64>,
    #[serde(default)]
    device_tokens: Vec<String>,
}

fn required(value: Option<String>, name: &str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::invalid_input(format!("{name} is required.")))
}

#[debug_handler]
pub(crate) async fn signup(
    State(db_pool): State<SqlitePool>,
    JsonBody(request): JsonBody<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    let email = required(request.email, "Email")?.to_lowercase();
    let password = required(request.password, "Password")?;
    let first_name = required(request.first_name, "First name")?;

    let id = Uuid::now_v7().to_string();
    sqlx::query("INSERT INTO users (id,email,phone_number,first_name,last_name,weight,height,password,device_tokens) VALUES (?,?,?,?,?,?,?,?,?)")
        .bind(&id)
        .bind(&email)
        .bind(&request.phone_number)
        .bind(&first_name)
        .bind(&request.last_name)
        .bind(request.weight)
        .bind(request.height)
        .bind(hash_password(&password)?)
        .bind(SqlJson(&request.device_tokens))
        .execute(&db_pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Email or phone number already registered.".to_owned()),
            other => other,
        })?;

    tracing::info!(user_id = %id, "user signed up");
    Ok((StatusCode::CREATED, Json(json!({ "message": "User created" }))))
}
