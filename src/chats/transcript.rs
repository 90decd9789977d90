//! Persisted, bounded message history of one chat.
//!
//! The whole transcript lives in the `data` column as a JSON array. Appends
//! are a read-modify-write of that column and are not serialized between
//! concurrent writers of the same chat: the last write wins.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::{AppError, AppResult};

pub const TRANSCRIPT_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    #[serde(alias = "ai")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub msg: String,
}

impl Message {
    pub fn new(role: Role, msg: impl Into<String>) -> Self {
        Message { role, msg: msg.into() }
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct ChatSummary {
    pub chat_id: String,
    pub subject: String,
    pub created_at: String,
}

fn decode(data: Option<String>) -> Vec<Message> {
    data.and_then(|data| serde_json::from_str(&data).ok())
        .unwrap_or_default()
}

/// Keeps the newest `TRANSCRIPT_CAP` messages, in order.
fn cap(messages: &mut Vec<Message>) {
    if messages.len() > TRANSCRIPT_CAP {
        messages.drain(..messages.len() - TRANSCRIPT_CAP);
    }
}

pub async fn create(db_pool: &SqlitePool, chat_id: &str, owner_id: &str, subject: &str) -> AppResult<()> {
    sqlx::query("INSERT INTO chats (chat_id,user_id,subject,data) VALUES (?,?,?,'[]')")
        .bind(chat_id)
        .bind(owner_id)
        .bind(subject)
        .execute(db_pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!("chat {chat_id} already exists")),
            other => other,
        })?;

    tracing::debug!(chat_id, owner_id, "created chat");
    Ok(())
}

pub async fn load(db_pool: &SqlitePool, chat_id: &str) -> AppResult<Vec<Message>> {
    let Some((data,)): Option<(Option<String>,)> = sqlx::query_as("SELECT data FROM chats WHERE chat_id=?")
        .bind(chat_id)
        .fetch_optional(db_pool)
        .await?
    else {
        return Err(AppError::not_found("Chat"));
    };

    Ok(decode(data))
}

pub async fn append(db_pool: &SqlitePool, chat_id: &str, message: Message) -> AppResult<()> {
    let mut messages = load(db_pool, chat_id).await?;
    messages.push(message);
    cap(&mut messages);

    sqlx::query("UPDATE chats SET data=?, updated_at=CURRENT_TIMESTAMP WHERE chat_id=?")
        .bind(serde_json::to_string(&messages)?)
        .bind(chat_id)
        .execute(db_pool)
        .await?;

    Ok(())
}

pub async fn owner(db_pool: &SqlitePool, chat_id: &str) -> AppResult<String> {
    let (user_id,): (String,) = sqlx::query_as("SELECT user_id FROM chats WHERE chat_id=?")
        .bind(chat_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or(AppError::not_found("Chat"))?;

    Ok(user_id)
}

/// Fails with `NotFound` for a missing chat and `AccessDenied` for someone else's.
pub async fn ensure_owner(db_pool: &SqlitePool, chat_id: &str, user_id: &str) -> AppResult<()> {
    if owner(db_pool, chat_id).await? != user_id {
        return Err(AppError::access_denied());
    }
    Ok(())
}

pub async fn list_for_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<ChatSummary>> {
    Ok(sqlx::query_as("SELECT chat_id,subject,created_at FROM chats WHERE user_id=? ORDER BY created_at,chat_id")
        .bind(user_id)
        .fetch_all(db_pool)
        .await?)
}

pub async fn delete(db_pool: &SqlitePool, chat_id: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM chats WHERE chat_id=?")
        .bind(chat_id)
        .execute(db_pool)
        .await?;
    Ok(())
}
