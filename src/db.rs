use std::str::FromStr;

use serde::Serialize;
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, types::Json, FromRow, SqlitePool};

use crate::AppResult;

pub async fn connect(database_url: &str) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // every connection to an in-memory database is its own database
    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(16)
    };

    let db_pool = pool_options.connect_with(options).await?;

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .map_err(anyhow::Error::from)?;

    Ok(db_pool)
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    #[serde(skip_serializing)]
    pub password: String,
    pub device_tokens: Json<Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub async fn by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE email=?")
            .bind(email)
            .fetch_optional(db_pool)
            .await?)
    }

    pub async fn by_id(db_pool: &SqlitePool, id: &str) -> AppResult<Option<User>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id=?")
            .bind(id)
            .fetch_optional(db_pool)
            .await?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct EmergencyContact {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub relationship: String,
    pub phone_number: String,
    pub email: Option<String>,
}

impl EmergencyContact {
    pub async fn for_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<EmergencyContact>> {
        Ok(sqlx::query_as(
            "SELECT id,user_id,name,relationship,phone_number,email FROM emergency_contacts WHERE user_id=? ORDER BY created_at,id",
        )
        .bind(user_id)
        .fetch_all(db_pool)
        .await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::SqlitePool;

    pub(crate) async fn pool() -> SqlitePool {
        super::connect("sqlite::memory:").await.expect("in-memory pool")
    }

    pub(crate) async fn insert_user(db_pool: &SqlitePool, id: &str, first_name: &str) {
        sqlx::query("INSERT INTO users (id,email,first_name,password) VALUES (?,?,?,?)")
            .bind(id)
            .bind(format!("{id}@example.com"))
            .bind(first_name)
            .bind("not-a-hash")
            .execute(db_pool)
            .await
            .expect("insert user");
    }

    pub(crate) async fn insert_contact(db_pool: &SqlitePool, id: &str, user_id: &str, phone_number: &str) {
        sqlx::query("INSERT INTO emergency_contacts (id,user_id,name,relationship,phone_number) VALUES (?,?,?,?,?)")
            .bind(id)
            .bind(user_id)
            .bind(format!("Contact {id}"))
            .bind("sibling")
            .bind(phone_number)
            .execute(db_pool)
            .await
            .expect("insert contact");
    }
}
