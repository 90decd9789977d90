use axum::{debug_handler, extract::State, http::HeaderMap, response::IntoResponse, Json};

use crate::{auth::Principal, hospitals::location_from_headers, AppResult, AppState};

pub const MANUAL_TRIGGER: &str = "Emergency alert raised manually by the user.";

/// Runs the escalation without a model reply, e.g. from a panic button.
#[debug_handler]
pub(crate) async fn manual_emergency(
    principal: Principal,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let location = location_from_headers(&headers)?;
    let event = state.escalation()
        .escalate(&principal, MANUAL_TRIGGER, location)
        .await?;

    Ok(Json(event))
}
