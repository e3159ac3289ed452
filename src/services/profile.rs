//! Profile services - Public profile of a chat participant

use crate::core::{AppError, AppState};
use crate::dtos::ProfileDTO;
use crate::entities::Role;
use axum::extract::{Json, Path, State};
use std::sync::Arc;
use tracing::{instrument, warn};

/// `GET /chats/profile/{participant_id}/{role}`
#[instrument(skip(state))]
pub async fn get_participant_profile(
    State(state): State<Arc<AppState>>,
    Path((participant_id, role)): Path<(String, Role)>,
) -> Result<Json<ProfileDTO>, AppError> {
    let profile = state
        .profiles
        .find(role, &participant_id)
        .await?
        .ok_or_else(|| {
            warn!("Participant profile not found");
            AppError::not_found("Participant not found")
        })?;

    Ok(Json(ProfileDTO::from(profile)))
}
