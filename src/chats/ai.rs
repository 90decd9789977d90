use axum::{debug_handler, extract::{Query, State}, http::HeaderMap, response::{IntoResponse, Response}, Json};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::Principal,
    hospitals::location_from_headers,
    triage::{build_window, classify, Triage},
    AppError, AppResult, AppState, JsonBody,
};

use super::{msg::MessageBody, transcript::{self, Message, Role}};

#[derive(Debug, Deserialize)]
pub(crate) struct AiQuery {
    id: Option<String>,
}

/// One triage turn: the caller's message goes to the model together with the
/// recent transcript, both sides are stored, and an emergency reply escalates.
#[debug_handler]
pub(crate) async fn ai_turn(
    principal: Principal,
    State(state): State<AppState>,
    Query(AiQuery { id }): Query<AiQuery>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<MessageBody>,
) -> AppResult<Response> {
    let Some(chat_id) = id.filter(|id| !id.trim().is_empty()) else {
        return Err(AppError::invalid_input("Invalid request parameters."));
    };
    let message = body.into_message()?;
    let location = location_from_headers(&headers)?;

    transcript::ensure_owner(&state.db_pool, &chat_id, &principal.id).await?;
    let history = transcript::load(&state.db_pool, &chat_id).await?;

    let window = build_window(history, message.clone());
    let reply = state.llm.complete(&window).await?;

    transcript::append(&state.db_pool, &chat_id, message).await?;
    transcript::append(&state.db_pool, &chat_id, Message::new(Role::Assistant, reply.clone())).await?;

    match classify(&reply) {
        Triage::Normal => Ok(Json(json!({ "aiResponse": reply })).into_response()),
        Triage::Emergency => {
            let event = state.escalation()
                .escalate(&principal, &reply, location)
                .await?;
            Ok(Json(event).into_response())
        }
    }
}
