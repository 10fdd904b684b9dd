//! Routes for the Rating Aggregation bounded context.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use storerate_core::model::RatingValue;
use tracing::{info, instrument};
use uuid::Uuid;

use storerate_ratings::application::query_handlers::{self, RatingView, UserRatingView};
use storerate_ratings::application::command_handlers;
use storerate_ratings::domain::commands;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::routes::MessageResponse;
use crate::state::AppState;

/// Request body for POST /ratings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingRequest {
    /// The store to rate.
    pub store_id: Uuid,
    /// The rating, an integer from 1 to 5.
    pub rating: serde_json::Number,
}

/// Request body for PUT /ratings/{id}.
#[derive(Debug, Deserialize)]
pub struct UpdateRatingRequest {
    /// The new rating, an integer from 1 to 5.
    pub rating: serde_json::Number,
}

fn rating_value(raw: &serde_json::Number) -> Result<i64, ApiError> {
    Ok(i64::from(RatingValue::from_json(raw)?.get()))
}

/// POST /ratings
#[instrument(
    skip(state, principal, request),
    fields(user_id = %principal.user_id, store_id = %request.store_id)
)]
async fn submit_rating(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiJson(request): ApiJson<SubmitRatingRequest>,
) -> Result<(StatusCode, Json<RatingView>), ApiError> {
    let command = commands::SubmitRating {
        correlation_id: Uuid::new_v4(),
        user_id: principal.user_id,
        store_id: request.store_id,
        value: rating_value(&request.rating)?,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_rating command");

    let written = command_handlers::handle_submit_rating(
        &command,
        state.clock.as_ref(),
        &*state.entities,
        &state.retry,
    )
    .await?;

    let status = if written.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(RatingView::from(&written.rating))))
}

/// GET /ratings/user
#[instrument(skip(state, principal), fields(user_id = %principal.user_id))]
async fn list_user_ratings(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<Vec<UserRatingView>>, ApiError> {
    let ratings = query_handlers::list_user_ratings(principal.user_id, &*state.entities).await?;
    Ok(Json(ratings))
}

/// GET /ratings/store/{store_id}
#[instrument(skip(state, principal), fields(user_id = %principal.user_id))]
async fn get_user_rating_for_store(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(store_id): ApiPath<Uuid>,
) -> Result<Json<RatingView>, ApiError> {
    let rating =
        query_handlers::get_user_rating_for_store(principal.user_id, store_id, &*state.entities)
            .await?;
    Ok(Json(rating))
}

/// PUT /ratings/{id}
#[instrument(skip(state, principal, request), fields(user_id = %principal.user_id))]
async fn update_rating(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(rating_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateRatingRequest>,
) -> Result<Json<RatingView>, ApiError> {
    let command = commands::UpdateRating {
        correlation_id: Uuid::new_v4(),
        rating_id,
        requester_id: principal.user_id,
        value: rating_value(&request.rating)?,
    };

    info!(correlation_id = %command.correlation_id, "handling update_rating command");

    let written =
        command_handlers::handle_update_rating(&command, state.clock.as_ref(), &*state.entities)
            .await?;

    Ok(Json(RatingView::from(&written.rating)))
}

/// DELETE /ratings/{id}
#[instrument(skip(state, principal), fields(user_id = %principal.user_id))]
async fn delete_rating(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    ApiPath(rating_id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let command = commands::DeleteRating {
        correlation_id: Uuid::new_v4(),
        rating_id,
        requester_id: principal.user_id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_rating command");

    command_handlers::handle_delete_rating(&command, &*state.entities).await?;

    Ok(Json(MessageResponse::new("rating removed")))
}

/// Returns the router for rating endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_rating))
        .route("/user", get(list_user_ratings))
        .route("/store/{store_id}", get(get_user_rating_for_store))
        .route("/{id}", put(update_rating).delete(delete_rating))
}
