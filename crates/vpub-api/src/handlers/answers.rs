//! Answer lookup handler.

use axum::extract::{Path, State};
use axum::Json;
use vpub_models::{Answer, AnswerId};
use vpub_publish::AnswerRepository;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /api/answers/:answer_id`
pub async fn get_answer(
    State(state): State<AppState>,
    Path(answer_id): Path<String>,
) -> ApiResult<Json<Answer>> {
    let id = AnswerId::from_string(answer_id);
    state
        .publisher
        .repository()
        .load_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("answer {}", id)))
}
