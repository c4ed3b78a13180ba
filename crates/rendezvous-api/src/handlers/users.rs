//! /get_users: identities currently registered.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiState;

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<String>,
}

pub async fn handle_get_users(State(state): State<ApiState>) -> Json<UsersResponse> {
    Json(UsersResponse {
        users: state.registry.identities(),
    })
}
