mod contact;
mod emergency;

use axum::{routing::{delete, get}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(contact::list_contacts).post(contact::create_contact).put(contact::update_contact))
        .route("/emergency", get(emergency::manual_emergency))
        .route("/{id}", delete(contact::delete_contact))
}
