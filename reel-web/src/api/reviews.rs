//! Review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use reel_common::{MovieId, Review, ReviewId, UserId};
use reel_reviews::SubjectReviews;
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::identity::Caller;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReview {
    pub text: String,
    pub rating: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReview {
    pub text: String,
}

fn parse_review_id(raw: &str) -> ApiResult<ReviewId> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid review id: {}", raw)))
}

/// GET /api/movies/:id/reviews
pub async fn list_for_movie(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list_by_subject(MovieId(id)).await?))
}

/// POST /api/movies/:id/reviews
pub async fn create(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<u64>,
    Json(body): Json<CreateReview>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let review = state
        .reviews
        .create(&actor, MovieId(id), &body.text, body.rating)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// PATCH /api/reviews/:id
pub async fn update(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
    Json(body): Json<UpdateReview>,
) -> ApiResult<Json<Review>> {
    let id = parse_review_id(&id)?;
    Ok(Json(state.reviews.update(&actor, id, &body.text).await?))
}

/// DELETE /api/reviews/:id
pub async fn delete(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_review_id(&id)?;
    state.reviews.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/:uid/reviews
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<Vec<SubjectReviews>>> {
    Ok(Json(state.reviews.list_by_author(&UserId::new(uid)).await?))
}

/// GET /api/admin/reviews
pub async fn moderation_list(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(state.reviews.list_all_for_moderation(&actor).await?))
}
