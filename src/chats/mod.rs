mod ai;
mod chat;
mod msg;
mod new;
pub mod transcript;

use axum::{routing::{get, post}, Router};

use crate::{auth, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chats", get(chat::list_chats))
        .route("/chat", post(new::new_chat))
        .route("/chat/{chat_id}", get(chat::chat).post(msg::add_msg).delete(chat::delete_chat))
        .route("/user", axum::routing::delete(auth::delete_user))
        .route("/ai", post(ai::ai_turn))
}
