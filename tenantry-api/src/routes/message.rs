/// `GET /message/languages`

use axum::extract::State;
use serde::Serialize;

use crate::{app::AppState, response::ApiResponse};

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub language: Vec<String>,
}

pub async fn languages(State(state): State<AppState>) -> ApiResponse<LanguagesResponse> {
    ApiResponse::ok(
        "message.languages",
        LanguagesResponse {
            language: state.messages.available_languages().to_vec(),
        },
    )
}
