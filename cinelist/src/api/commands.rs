//! Chat command handlers
//!
//! POST /add, POST /choice

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::{AddOutcome, ChoiceOutcome, SessionKey},
    services::messages,
    AppState,
};

/// POST /add request
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub chat_id: i64,
    pub user_id: i64,
    /// Everything after `/add`
    #[serde(default)]
    pub args: String,
    /// Sender's client language, e.g. "en-US"
    pub language_code: Option<String>,
}

/// POST /add response
#[derive(Debug, Serialize)]
pub struct AddResponse {
    #[serde(flatten)]
    pub outcome: AddOutcome,
    /// Reply to show in the chat
    pub text: String,
}

/// POST /choice request
#[derive(Debug, Deserialize)]
pub struct ChoiceRequest {
    pub chat_id: i64,
    pub user_id: i64,
    /// Prompt message the button belongs to
    pub message_id: i64,
    /// Callback payload: `ADD_PICK:<id>`, `ADD_TOP1` or `ADD_CANCEL`
    pub data: String,
}

/// POST /choice response
///
/// The user-visible result travels as a `ChoiceRetracted` event on the
/// prompt itself, so only the outcome is returned here.
#[derive(Debug, Serialize)]
pub struct ChoiceResponse {
    #[serde(flatten)]
    pub outcome: ChoiceOutcome,
}

/// POST /add
pub async fn add_command(
    State(state): State<AppState>,
    Json(request): Json<AddRequest>,
) -> ApiResult<Json<AddResponse>> {
    if request.args.len() > 512 {
        return Err(ApiError::BadRequest("args too long".to_string()));
    }

    let language_code = request.language_code.as_deref();
    let outcome = state
        .service
        .handle_add_command(&request.args, request.chat_id, request.user_id, language_code)
        .await;

    let lang = state.service.language_for(language_code);
    let text = messages::add_outcome_text(&lang, &outcome, state.service.primary_locale());

    Ok(Json(AddResponse { outcome, text }))
}

/// POST /choice
pub async fn choice_event(
    State(state): State<AppState>,
    Json(request): Json<ChoiceRequest>,
) -> Json<ChoiceResponse> {
    let key = SessionKey::new(request.chat_id, request.user_id, request.message_id);
    let outcome = state.service.handle_choice_data(key, &request.data).await;
    Json(ChoiceResponse { outcome })
}

/// Build command routes
pub fn command_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_command))
        .route("/choice", post(choice_event))
}
