use axum::{debug_handler, extract::{Path, State}, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::Principal, db::EmergencyContact, AppError, AppResult, JsonBody, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct ContactRequest {
    id: Option<String>,
    name: Option<String>,
    relationship: Option<String>,
    phone_number: Option<String>,
    email: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl ContactRequest {
    fn into_contact(self, user_id: &str, id: String) -> AppResult<EmergencyContact> {
        let (Some(name), Some(relationship), Some(phone_number)) =
            (present(self.name), present(self.relationship), present(self.phone_number))
        else {
            return Err(AppError::invalid_input("Name, relationship, and phone number are required."));
        };

        Ok(EmergencyContact {
            id,
            user_id: user_id.to_owned(),
            name,
            relationship,
            phone_number,
            email: present(self.email),
        })
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn create_contact(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
    JsonBody(request): JsonBody<ContactRequest>,
) -> AppResult<impl IntoResponse> {
    let contact = request.into_contact(&principal.id, Uuid::now_v7().to_string())?;

    sqlx::query("INSERT INTO emergency_contacts (id,user_id,name,relationship,phone_number,email) VALUES (?,?,?,?,?,?)")
        .bind(&contact.id)
        .bind(&contact.user_id)
        .bind(&contact.name)
        .bind(&contact.relationship)
        .bind(&contact.phone_number)
        .bind(&contact.email)
        .execute(&db_pool)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Emergency contact created successfully.", "contact": contact })),
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_contacts(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
) -> AppResult<impl IntoResponse> {
    let contacts = EmergencyContact::for_user(&db_pool, &principal.id).await?;
    Ok(Json(json!({ "contacts": contacts })))
}

/// Only the owner's rows are touched, so someone else's id reads as missing.
#[debug_handler(state = AppState)]
pub(crate) async fn update_contact(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
    JsonBody(mut request): JsonBody<ContactRequest>,
) -> AppResult<impl IntoResponse> {
    let Some(id) = present(request.id.take()) else {
        return Err(AppError::invalid_input("ID, name, relationship, and phone number are required."));
    };
    let contact = request.into_contact(&principal.id, id)?;

    let result = sqlx::query("UPDATE emergency_contacts SET name=?, relationship=?, phone_number=?, email=?, updated_at=CURRENT_TIMESTAMP WHERE id=? AND user_id=?")
        .bind(&contact.name)
        .bind(&contact.relationship)
        .bind(&contact.phone_number)
        .bind(&contact.email)
        .bind(&contact.id)
        .bind(&contact.user_id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Emergency contact"));
    }
    Ok(Json(json!({ "message": "Emergency contact updated successfully.", "contact": contact })))
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_contact(
    principal: Principal,
    State(db_pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let result = sqlx::query("DELETE FROM emergency_contacts WHERE id=? AND user_id=?")
        .bind(&id)
        .bind(&principal.id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Emergency contact"));
    }
    Ok(Json(json!({ "message": "Emergency contact deleted successfully." })))
}
