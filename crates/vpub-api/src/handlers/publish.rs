//! Publish action handler.

use axum::extract::{Path, State};
use axum::Json;
use tracing::error;
use vpub_models::{AnswerId, PublishedAnswer};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `POST /api/publish-video/:answer_id`
///
/// Answers with the terminal outcome. The attempt runs on its own task, so a
/// client that disconnects does not cut it short before the final status write.
pub async fn publish_video(
    State(state): State<AppState>,
    Path(answer_id): Path<String>,
) -> ApiResult<Json<PublishedAnswer>> {
    let id = AnswerId::from_string(answer_id);
    let publisher = state.publisher.clone();

    let published = tokio::spawn(async move { publisher.publish(&id).await })
        .await
        .map_err(|e| {
            error!("Publish task failed: {}", e);
            ApiError::internal(format!("publish task failed: {}", e))
        })??;

    Ok(Json(published))
}
